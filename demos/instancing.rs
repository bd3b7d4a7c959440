//! 实例化绘制
//!
//! 同一个网格绘制 N×N×N 个实例。相机矩阵放在 UBO 中，
//! 绘制参数来自间接绘制缓冲区；按 I 键切换到直接的 draw_instanced。
//!
//! ```bash
//! cargo run --example instancing
//! ```

use bytemuck::{Pod, Zeroable};
use winit::keyboard::KeyCode;

use minigl::app::{App, AppContext, Application};
use minigl::component::Camera;
use minigl::core::{log, Config, Result};
use minigl::geometry::Mesh;
use minigl::gfx::{DataUsage, Gpu, Primitive};
use minigl::math::Vector3;
use minigl::renderer::{
    DrawElementsIndirectCommand, IndirectBuffer, RenderCommand, ShaderProgram, UniformBuffer,
};

const N: u32 = 5;

/// std140 布局的相机块
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CameraBlock {
    view_proj: [[f32; 4]; 4],
    spacing: f32,
    grid: u32,
    _pad: [f32; 2],
}

struct InstancesApp {
    camera: Camera,
    mesh: Mesh,
    shader: ShaderProgram,
    camera_ubo: UniformBuffer<CameraBlock>,
    commands: IndirectBuffer,
    indirect: bool,
    toggle_held: bool,
}

impl InstancesApp {
    fn camera_block(&self) -> CameraBlock {
        CameraBlock {
            view_proj: (*self.camera.view_proj()).into(),
            spacing: 2.5,
            grid: N,
            _pad: [0.0; 2],
        }
    }
}

impl Application for InstancesApp {
    fn init(gpu: &Gpu, ctx: &AppContext) -> Result<Self> {
        let mesh = Mesh::from_file(gpu, "demos/res/cube.obj", DataUsage::Static)?;
        let shader = ShaderProgram::from_file(gpu, "demos/res/instances.glsl")?;

        let mut camera = Camera::from_config(&ctx.config.camera, ctx.aspect_ratio());
        camera.set_position(Vector3::new(5.0, 5.0, 20.0));
        camera.look_at(Vector3::new(5.0, 5.0, 5.0));

        let camera_ubo = UniformBuffer::new(gpu, &[CameraBlock::zeroed()], 0, DataUsage::Dynamic)?;
        let command = DrawElementsIndirectCommand {
            count: mesh.index_count(),
            instance_count: N * N * N,
            ..Default::default()
        };
        let commands = IndirectBuffer::new(gpu, &[command], DataUsage::Static)?;

        Ok(Self { camera, mesh, shader, camera_ubo, commands, indirect: true, toggle_held: false })
    }

    fn on_update(&mut self, ctx: &AppContext, _dt: f32) {
        let pressed = ctx.input.is_key_pressed(KeyCode::KeyI);
        if pressed && !self.toggle_held {
            self.indirect = !self.indirect;
            minigl::app_info!(indirect = self.indirect, "Draw path switched");
        }
        self.toggle_held = pressed;
    }

    fn render(&mut self, gpu: &Gpu, _ctx: &AppContext) -> Result<()> {
        self.camera_ubo.update(0, &[self.camera_block()])?;

        self.shader.bind();
        self.camera_ubo.bind();
        self.mesh.bind();

        if self.indirect {
            self.commands.bind();
            RenderCommand::draw_indirect(gpu, &self.commands, Primitive::Triangles);
            self.commands.unbind();
        } else {
            RenderCommand::draw_instanced(gpu, &self.mesh.vertex_array, N * N * N, Primitive::Triangles);
        }
        Ok(())
    }

    fn camera_mut(&mut self) -> Option<&mut Camera> {
        Some(&mut self.camera)
    }
}

fn main() -> anyhow::Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.window.title = "minigl - instancing".to_string();
    config.apply_args(std::env::args());
    config.validate()?;

    log::init_logger(config.logging.level, false, None);
    App::run::<InstancesApp>(config)?;
    Ok(())
}
