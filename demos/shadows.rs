//! 方向光阴影贴图
//!
//! 第一遍从光源（正交相机）渲染深度到 1024x1024 的深度纹理，
//! 第二遍正常渲染场景，并用深度纹理判断片元是否处于阴影中。
//!
//! ```bash
//! cargo run --example shadows
//! ```

use minigl::app::{App, AppContext, Application};
use minigl::component::Camera;
use minigl::core::{log, Config, Result};
use minigl::geometry::{Mesh, Vertex};
use minigl::gfx::{BufferBit, DataUsage, Gpu, Primitive, TextureFormat};
use minigl::math::{self, Vector3};
use minigl::renderer::{FrameBuffer, RenderCommand, ShaderProgram, Texture};

const SHADOW_SIZE: u32 = 1024;

struct ShadowsApp {
    camera: Camera,
    light: Camera,

    scene_shader: ShaderProgram,
    depth_shader: ShaderProgram,
    shadow_map: FrameBuffer,

    ground: Mesh,
    cube: Mesh,
}

impl ShadowsApp {
    fn render_objects(&self, gpu: &Gpu, shader: &ShaderProgram, time: f32) {
        shader.upload("u_model", math::Matrix4::identity());
        self.ground.bind();
        RenderCommand::draw_indexed(gpu, &self.ground.vertex_array, Primitive::Triangles);

        let model = math::rotate(&Vector3::y(), time * 0.3) * math::scale_uniform(0.8);
        shader.upload("u_model", model);
        self.cube.bind();
        RenderCommand::draw_indexed(gpu, &self.cube.vertex_array, Primitive::Triangles);
    }
}

impl Application for ShadowsApp {
    fn init(gpu: &Gpu, ctx: &AppContext) -> Result<Self> {
        let up = [0.0, 1.0, 0.0];
        let vertices = vec![
            Vertex::new([-10.0, -1.5, -10.0], up, [0.0, 0.0]),
            Vertex::new([10.0, -1.5, -10.0], up, [1.0, 0.0]),
            Vertex::new([10.0, -1.5, 10.0], up, [1.0, 1.0]),
            Vertex::new([-10.0, -1.5, 10.0], up, [0.0, 1.0]),
        ];
        let ground = Mesh::new(gpu, vertices, vec![0, 1, 2, 2, 3, 0], DataUsage::Static)?;
        let cube = Mesh::from_file(gpu, "demos/res/cube.obj", DataUsage::Static)?;

        let depth_map = Texture::new(gpu, SHADOW_SIZE, SHADOW_SIZE, TextureFormat::Depth)?;
        let mut shadow_map = FrameBuffer::new(gpu)?;
        shadow_map.attach_depth_texture(depth_map);
        shadow_map.check_status()?;

        let scene_shader = ShaderProgram::from_file(gpu, "demos/res/shadows.glsl")?;
        let depth_shader = ShaderProgram::from_file(gpu, "demos/res/depth.glsl")?;

        // 用正交相机模拟方向光
        let mut light = Camera::orthographic(-10.0, 10.0, -10.0, 10.0, 0.1, 100.0);
        light.set_position(Vector3::new(4.0, 10.0, 6.0));
        light.look_at(Vector3::zeros());

        let mut camera = Camera::from_config(&ctx.config.camera, ctx.aspect_ratio());
        camera.set_position(Vector3::new(0.0, 1.0, 5.0));

        Ok(Self { camera, light, scene_shader, depth_shader, shadow_map, ground, cube })
    }

    fn render(&mut self, gpu: &Gpu, ctx: &AppContext) -> Result<()> {
        // 第一遍：深度
        self.depth_shader.bind();
        self.depth_shader.upload("u_lightSpace", self.light.view_proj());

        RenderCommand::set_viewport(gpu, 0, 0, SHADOW_SIZE, SHADOW_SIZE);
        self.shadow_map.bind();
        RenderCommand::clear(gpu, BufferBit::DEPTH);
        self.render_objects(gpu, &self.depth_shader, ctx.time);
        self.shadow_map.unbind();

        // 第二遍：场景
        RenderCommand::set_viewport(gpu, 0, 0, ctx.size.0, ctx.size.1);
        RenderCommand::clear_all(gpu);

        self.scene_shader.bind();
        self.scene_shader.upload("u_viewProj", self.camera.view_proj());
        self.scene_shader.upload("u_lightSpace", self.light.view_proj());
        self.scene_shader.upload("u_lightPos", self.light.position());
        if let Some(depth_map) = self.shadow_map.depth_attachment() {
            self.scene_shader.texture("u_shadowMap", depth_map, 0);
        }
        self.render_objects(gpu, &self.scene_shader, ctx.time);
        self.scene_shader.unbind();
        Ok(())
    }

    fn camera_mut(&mut self) -> Option<&mut Camera> {
        Some(&mut self.camera)
    }
}

fn main() -> anyhow::Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.window.title = "minigl - shadows".to_string();
    config.apply_args(std::env::args());
    config.validate()?;

    log::init_logger(config.logging.level, false, None);
    App::run::<ShadowsApp>(config)?;
    Ok(())
}
