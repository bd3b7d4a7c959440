//! minigl - 最小应用
//!
//! 打开一个窗口并每帧用配置中的颜色清屏，用来确认 GL 上下文、
//! 配置和日志系统工作正常。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run
//!
//! # 命令行覆盖
//! cargo run -- --width 1280 --height 720 --no-vsync
//!
//! # 无窗口运行几帧（CI）
//! cargo run -- --headless
//! ```

use anyhow::Context;
use minigl::app::{App, AppContext, Application};
use minigl::core::{log, Config, Result};
use minigl::gfx::Gpu;
use tracing::{error, info};

/// 只清屏的应用；清屏由帧循环完成
struct ClearScreen;

impl Application for ClearScreen {
    fn init(_gpu: &Gpu, ctx: &AppContext) -> Result<Self> {
        info!(width = ctx.size.0, height = ctx.size.1, "Clear screen app initialized");
        Ok(ClearScreen)
    }

    fn render(&mut self, _gpu: &Gpu, _ctx: &AppContext) -> Result<()> {
        Ok(())
    }
}

fn run() -> anyhow::Result<()> {
    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("config.toml");

    // 2. 应用命令行参数
    config.apply_args(std::env::args());

    // 3. 验证配置
    config.validate().context("invalid configuration")?;

    // 4. 初始化日志系统
    let log_file = config.logging.file_output.then_some(config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!(version = env!("CARGO_PKG_VERSION"), "minigl starting...");
    info!(
        width = config.window.width,
        height = config.window.height,
        gl = %format!("{}.{}", config.graphics.gl_major, config.graphics.gl_minor),
        "Window configuration"
    );

    // 5. 运行帧循环
    App::run::<ClearScreen>(config).context("application failed")?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
