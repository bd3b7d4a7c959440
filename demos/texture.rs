//! 纹理四边形
//!
//! 从 PNG 加载纹理（上下翻转后上传），绑定到采样单元 0 后绘制。
//!
//! ```bash
//! cargo run --example texture
//! ```

use minigl::app::{App, AppContext, Application};
use minigl::core::{log, Config, Result};
use minigl::geometry::{Mesh, Vertex};
use minigl::gfx::{DataUsage, Gpu, Primitive};
use minigl::math::Color;
use minigl::renderer::{RenderCommand, ShaderProgram, Texture};

struct TextureApp {
    quad: Mesh,
    texture: Texture,
    shader: ShaderProgram,
}

impl Application for TextureApp {
    fn init(gpu: &Gpu, _ctx: &AppContext) -> Result<Self> {
        let normal = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([-0.5, -0.75, 0.0], normal, [0.0, 0.0]),
            Vertex::new([0.5, -0.75, 0.0], normal, [1.0, 0.0]),
            Vertex::new([0.5, 0.75, 0.0], normal, [1.0, 1.0]),
            Vertex::new([-0.5, 0.75, 0.0], normal, [0.0, 1.0]),
        ];
        let indices = vec![0, 1, 2, 2, 3, 0];
        let quad = Mesh::new(gpu, vertices, indices, DataUsage::Static)?;

        let texture = Texture::from_file(gpu, "demos/res/texture.png")?;
        let shader = ShaderProgram::from_file(gpu, "demos/res/texture.glsl")?;
        shader.bind();
        shader.texture("u_texture", &texture, 0);
        shader.upload("u_tint", Color::WHITE);

        Ok(Self { quad, texture, shader })
    }

    fn render(&mut self, gpu: &Gpu, _ctx: &AppContext) -> Result<()> {
        self.shader.bind();
        self.texture.bind(0);
        self.quad.bind();
        RenderCommand::draw_indexed(gpu, &self.quad.vertex_array, Primitive::Triangles);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.window.title = "minigl - texture".to_string();
    config.apply_args(std::env::args());
    config.validate()?;

    log::init_logger(config.logging.level, false, None);
    App::run::<TextureApp>(config)?;
    Ok(())
}
