//! 三角形
//!
//! 最小的绘制流程：顶点缓冲区 + 布局 → 顶点数组 → 着色器 → draw_indexed。
//!
//! ```bash
//! cargo run --example triangle
//! ```

use minigl::app::{App, AppContext, Application};
use minigl::core::{log, Config, Result};
use minigl::gfx::{DataUsage, Gpu, Primitive};
use minigl::math::Color;
use minigl::renderer::{
    BufferElement, BufferLayout, DataType, IndexBuffer, RenderCommand, ShaderProgram, VertexArray, VertexBuffer,
};

struct Triangle {
    vertex_array: VertexArray,
    shader: ShaderProgram,
}

impl Application for Triangle {
    fn init(gpu: &Gpu, _ctx: &AppContext) -> Result<Self> {
        let vertices: [f32; 9] = [
            -0.5, -0.5, 0.0,
             0.5, -0.5, 0.0,
             0.0,  0.5, 0.0,
        ];
        let layout = BufferLayout::new([BufferElement::new(DataType::Float3, "a_position")]);
        let vb = VertexBuffer::new(gpu, &vertices, layout, DataUsage::Static)?;
        let ib = IndexBuffer::new(gpu, &[0, 1, 2])?;
        let vertex_array = VertexArray::with_buffers(gpu, vb, ib)?;

        let shader = ShaderProgram::from_file(gpu, "demos/res/triangle.glsl")?;
        shader.bind();
        shader.upload("u_color", Color::RED);

        Ok(Self { vertex_array, shader })
    }

    fn render(&mut self, gpu: &Gpu, _ctx: &AppContext) -> Result<()> {
        self.shader.bind();
        self.vertex_array.bind();
        RenderCommand::draw_indexed(gpu, &self.vertex_array, Primitive::Triangles);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.window.title = "minigl - triangle".to_string();
    config.apply_args(std::env::args());
    config.validate()?;

    log::init_logger(config.logging.level, false, None);
    App::run::<Triangle>(config)?;
    Ok(())
}
