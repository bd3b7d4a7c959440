//! 窗口与 OpenGL 上下文
//!
//! 用 winit 创建窗口，用 glutin 在其上创建 OpenGL core profile 上下文和
//! 窗口表面，再通过 glow 加载函数指针，得到渲染器使用的 `GlDevice`。

use std::num::NonZeroU32;

use glutin::config::{Config as GlutinConfig, ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference, GlDisplay};
use glutin::surface::{GlSurface, Surface, SwapInterval, WindowSurface};
use glutin_winit::GlWindow;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawWindowHandle};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;

use crate::core::error::{GraphicsError, MiniGlError, Result};
use crate::core::Config;
use crate::gfx::{GlDevice, GraphicsDevice};
use crate::{engine_info, engine_warn};

fn init_error(what: &str, e: impl std::fmt::Display) -> MiniGlError {
    MiniGlError::Initialization(format!("{}: {}", what, e))
}

#[cfg(target_os = "windows")]
fn display_preference(window: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Wgl(Some(window))
}

#[cfg(target_os = "macos")]
fn display_preference(_window: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Cgl
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn display_preference(_window: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Egl
}

/// 在匹配模板的配置中选多重采样最多的一个
fn pick_config(configs: impl Iterator<Item = GlutinConfig>) -> Result<GlutinConfig> {
    configs.max_by_key(|c| c.num_samples()).ok_or_else(|| {
        GraphicsError::ResourceCreation("no OpenGL framebuffer config matches the template".to_string()).into()
    })
}

/// 带 OpenGL 上下文的窗口
///
/// 字段顺序即析构顺序：表面和上下文必须先于窗口销毁。
pub struct Window {
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: winit::window::Window,
}

impl Window {
    /// 创建窗口和当前上下文，返回窗口与包装好的设备
    pub fn new(event_loop: &ActiveEventLoop, config: &Config) -> Result<(Self, GlDevice)> {
        let window_attributes = winit::window::Window::default_attributes()
            .with_title(config.window.title.clone())
            .with_inner_size(PhysicalSize::new(config.window.width, config.window.height))
            .with_resizable(config.window.resizable);

        let window = event_loop
            .create_window(window_attributes)
            .map_err(|e| init_error("failed to create window", e))?;

        let raw_handle = window
            .window_handle()
            .map_err(|e| init_error("window handle unavailable", e))?
            .as_raw();
        let raw_display = event_loop
            .display_handle()
            .map_err(|e| init_error("display handle unavailable", e))?
            .as_raw();

        let gl_display = unsafe { Display::new(raw_display, display_preference(raw_handle)) }
            .map_err(|e| GraphicsError::ResourceCreation(format!("failed to open GL display: {}", e)))?;

        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(8)
            .with_depth_size(24)
            .compatible_with_native_window(raw_handle)
            .build();
        let configs = unsafe { gl_display.find_configs(template) }
            .map_err(|e| GraphicsError::ResourceCreation(format!("failed to query GL configs: {}", e)))?;
        let gl_config = pick_config(configs)?;

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(
                config.graphics.gl_major,
                config.graphics.gl_minor,
            ))))
            .with_profile(GlProfile::Core)
            .with_debug(config.graphics.debug_output)
            .build(Some(raw_handle));

        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .map_err(|e| init_error("failed to create OpenGL context", e))?;

        let surface_attributes = window
            .build_surface_attributes(Default::default())
            .map_err(|e| init_error("failed to describe window surface", e))?;
        let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes) }
            .map_err(|e| init_error("failed to create window surface", e))?;

        let context = not_current
            .make_current(&surface)
            .map_err(|e| init_error("failed to make context current", e))?;

        let interval = if config.window.vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(e) = surface.set_swap_interval(&context, interval) {
            engine_warn!("failed to set swap interval: {}", e);
        }

        let gl = unsafe { glow::Context::from_loader_function_cstr(|name| gl_display.get_proc_address(name)) };
        let device = GlDevice::new(gl, config.graphics.debug_output);

        let info = device.info();
        engine_info!(vendor = %info.vendor, renderer = %info.renderer, version = %info.version, "OpenGL context created");

        Ok((Self { surface, context, window }, device))
    }

    /// 帧缓冲的像素尺寸
    pub fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// 窗口尺寸变化后调整表面；零尺寸（最小化）被忽略
    pub fn resize(&self, width: u32, height: u32) {
        if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            self.surface.resize(&self.context, w, h);
        }
    }

    pub fn swap_buffers(&self) -> Result<()> {
        self.surface
            .swap_buffers(&self.context)
            .map_err(|e| MiniGlError::Runtime(format!("swap buffers failed: {}", e)))
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn winit(&self) -> &winit::window::Window {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_list_is_an_error() {
        let err = pick_config(std::iter::empty()).err().unwrap();
        assert!(matches!(err, MiniGlError::Graphics(GraphicsError::ResourceCreation(_))));
    }
}
