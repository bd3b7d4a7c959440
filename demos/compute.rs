//! 计算着色器写纹理
//!
//! 计算着色器把图案写入 512x512 的 RGBA8 image，内存屏障之后
//! 再用一个全屏四边形把它画出来。启动时打印工作组上限。
//!
//! ```bash
//! cargo run --example compute
//! ```

use minigl::app::{App, AppContext, Application};
use minigl::core::{log, Config, Result};
use minigl::gfx::{Barrier, DataUsage, Gpu, GraphicsDevice, ImageAccess, Primitive, TextureFormat};
use minigl::renderer::{
    BufferElement, BufferLayout, DataType, IndexBuffer, RenderCommand, ShaderProgram, Texture, VertexArray,
    VertexBuffer,
};
use minigl::app_info;

const IMAGE_SIZE: u32 = 512;
const LOCAL_SIZE: u32 = 16;

struct Compute {
    compute_shader: ShaderProgram,
    quad_shader: ShaderProgram,
    quad: VertexArray,
    image: Texture,
}

fn print_workgroup_capabilities(gpu: &Gpu) {
    let limits = gpu.compute_limits();
    app_info!(
        count = ?limits.work_group_count,
        size = ?limits.work_group_size,
        invocations = limits.work_group_invocations,
        "Workgroup capabilities"
    );
}

impl Application for Compute {
    fn init(gpu: &Gpu, _ctx: &AppContext) -> Result<Self> {
        print_workgroup_capabilities(gpu);

        #[rustfmt::skip]
        let vertices: [f32; 20] = [
            -1.0, -1.0, 0.0, 0.0, 0.0,
             1.0, -1.0, 0.0, 1.0, 0.0,
             1.0,  1.0, 0.0, 1.0, 1.0,
            -1.0,  1.0, 0.0, 0.0, 1.0,
        ];
        let layout = BufferLayout::new([
            BufferElement::new(DataType::Float3, "a_pos"),
            BufferElement::new(DataType::Float2, "a_tex"),
        ]);
        let vb = VertexBuffer::new(gpu, &vertices, layout, DataUsage::Static)?;
        let ib = IndexBuffer::new(gpu, &[0, 1, 2, 2, 3, 0])?;
        let quad = VertexArray::with_buffers(gpu, vb, ib)?;

        let quad_shader = ShaderProgram::from_file(gpu, "demos/res/quad.glsl")?;
        let compute_shader = ShaderProgram::from_file(gpu, "demos/res/compute.glsl")?;

        let image = Texture::new(gpu, IMAGE_SIZE, IMAGE_SIZE, TextureFormat::Rgba8)?;
        image.bind_image(0, ImageAccess::ReadWrite)?;

        Ok(Self { compute_shader, quad_shader, quad, image })
    }

    fn render(&mut self, gpu: &Gpu, ctx: &AppContext) -> Result<()> {
        self.compute_shader.bind();
        self.compute_shader.upload("u_time", ctx.time);
        RenderCommand::dispatch_compute(gpu, IMAGE_SIZE / LOCAL_SIZE, IMAGE_SIZE / LOCAL_SIZE, 1);
        RenderCommand::memory_barrier(gpu, Barrier::SHADER_IMAGE_ACCESS | Barrier::TEXTURE_FETCH);

        self.quad_shader.bind();
        self.quad_shader.texture("u_image", &self.image, 0);
        self.quad.bind();
        RenderCommand::draw_indexed(gpu, &self.quad, Primitive::Triangles);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.window.title = "minigl - compute".to_string();
    config.apply_args(std::env::args());
    config.validate()?;

    log::init_logger(config.logging.level, false, None);
    App::run::<Compute>(config)?;
    Ok(())
}
