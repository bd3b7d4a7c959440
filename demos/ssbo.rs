//! SSBO 驱动的计算着色器
//!
//! 每帧通过持久映射的 SSBO 把随时间变化的颜色交给计算着色器，
//! 计算着色器填充帧缓冲的颜色附件，再整体 blit 到窗口。
//! 每帧结束前用 Fence 等待 GPU 用完本帧的 SSBO 内容，再覆写它。
//!
//! ```bash
//! cargo run --example ssbo
//! ```

use bytemuck::{Pod, Zeroable};
use minigl::app::{App, AppContext, Application};
use minigl::core::{log, Config, Result};
use minigl::gfx::{Barrier, BufferBit, DataUsage, Gpu, ImageAccess, TextureFormat};
use minigl::math::Color;
use minigl::renderer::{Fence, FrameBuffer, RenderCommand, ShaderProgram, ShaderStorageBuffer, Texture};

const LOCAL_SIZE: u32 = 16;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ColorBlock {
    color: Color,
}

struct SsboApp {
    compute_shader: ShaderProgram,
    ssbo: ShaderStorageBuffer<ColorBlock>,
    framebuffer: FrameBuffer,
    fence: Fence,
}

impl Application for SsboApp {
    fn init(gpu: &Gpu, ctx: &AppContext) -> Result<Self> {
        let compute_shader = ShaderProgram::from_file(gpu, "demos/res/ssbo.glsl")?;

        let (width, height) = ctx.size;
        let image = Texture::new(gpu, width, height, TextureFormat::Rgba8)?;
        image.bind_image(0, ImageAccess::WriteOnly)?;

        let mut framebuffer = FrameBuffer::new(gpu)?;
        framebuffer.set_color_attachments(vec![image]);
        framebuffer.check_status()?;

        let ssbo = ShaderStorageBuffer::new(gpu, &[ColorBlock { color: Color::GREEN }], 0, DataUsage::MapWrite)?;

        Ok(Self { compute_shader, ssbo, framebuffer, fence: Fence::new(gpu) })
    }

    fn render(&mut self, gpu: &Gpu, ctx: &AppContext) -> Result<()> {
        // 上一帧的计算完成前不能覆写映射内存
        self.fence.wait()?;

        let color = Color::new(0.5 * ctx.time.sin() + 0.5, 0.5 * ctx.time.cos() + 0.5, 0.0, 1.0);
        self.ssbo.write(0, &ColorBlock { color })?;
        self.ssbo.flush()?;

        self.compute_shader.bind();
        let (width, height) = self.framebuffer.size();
        RenderCommand::dispatch_compute(gpu, width.div_ceil(LOCAL_SIZE), height.div_ceil(LOCAL_SIZE), 1);
        RenderCommand::memory_barrier(gpu, Barrier::SHADER_IMAGE_ACCESS | Barrier::FRAMEBUFFER);
        self.fence.reset()?;

        self.framebuffer.blit_to_default(BufferBit::COLOR, ctx.size.0, ctx.size.1);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.window.title = "minigl - ssbo".to_string();
    config.window.resizable = false;
    config.apply_args(std::env::args());
    config.validate()?;

    log::init_logger(config.logging.level, false, None);
    App::run::<SsboApp>(config)?;
    Ok(())
}
