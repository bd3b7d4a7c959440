//! 彩色立方体 + 自由相机
//!
//! WASD 移动，R/F 升降，按住左键拖动旋转视角，滚轮调节移动速度。
//!
//! ```bash
//! cargo run --example mesh
//! ```

use minigl::app::{App, AppContext, Application};
use minigl::component::Camera;
use minigl::core::{log, Config, Result};
use minigl::geometry::{Mesh, Vertex};
use minigl::gfx::{DataUsage, Gpu, Primitive};
use minigl::math::{self, Color, Vector3};
use minigl::renderer::{RenderCommand, ShaderProgram};

struct MeshApp {
    camera: Camera,
    mesh: Mesh,
    shader: ShaderProgram,
}

fn cube() -> (Vec<Vertex>, Vec<u32>) {
    let corner = |x: f32, y: f32, z: f32, color: Color| Vertex::with_color([x, y, z], [0.0; 3], [0.0; 2], color);
    let vertices = vec![
        corner(-0.5, -0.5, -0.5, Color::RED),
        corner(0.5, -0.5, -0.5, Color::GREEN),
        corner(0.5, -0.5, 0.5, Color::BLUE),
        corner(-0.5, -0.5, 0.5, Color::WHITE),
        corner(-0.5, 0.5, -0.5, Color::RED),
        corner(0.5, 0.5, -0.5, Color::rgb(0.0, 1.0, 1.0)),
        corner(0.5, 0.5, 0.5, Color::BLUE),
        corner(-0.5, 0.5, 0.5, Color::WHITE),
    ];

    #[rustfmt::skip]
    let indices = vec![
        0, 1, 2,  2, 3, 0, // 底面
        4, 0, 1,  1, 5, 4, // 背面
        5, 1, 2,  2, 6, 5, // 右面
        3, 2, 6,  6, 7, 3, // 前面
        4, 5, 6,  6, 7, 4, // 顶面
        0, 4, 7,  7, 3, 0, // 左面
    ];
    (vertices, indices)
}

impl Application for MeshApp {
    fn init(gpu: &Gpu, ctx: &AppContext) -> Result<Self> {
        let mut camera = Camera::from_config(&ctx.config.camera, ctx.aspect_ratio());
        camera.set_position(Vector3::new(0.0, 0.0, 3.0));

        let (vertices, indices) = cube();
        let mesh = Mesh::new(gpu, vertices, indices, DataUsage::Static)?;
        let shader = ShaderProgram::from_file(gpu, "demos/res/mesh.glsl")?;

        Ok(Self { camera, mesh, shader })
    }

    fn render(&mut self, gpu: &Gpu, ctx: &AppContext) -> Result<()> {
        let model = math::rotate(&Vector3::y(), ctx.time * 0.5);

        self.shader.bind();
        self.shader.upload("u_viewProj", self.camera.view_proj());
        self.shader.upload("u_model", model);

        self.mesh.bind();
        RenderCommand::draw_indexed(gpu, &self.mesh.vertex_array, Primitive::Triangles);
        Ok(())
    }

    fn camera_mut(&mut self) -> Option<&mut Camera> {
        Some(&mut self.camera)
    }
}

fn main() -> anyhow::Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.window.title = "minigl - mesh".to_string();
    config.apply_args(std::env::args());
    config.validate()?;

    log::init_logger(config.logging.level, false, None);
    App::run::<MeshApp>(config)?;
    Ok(())
}
