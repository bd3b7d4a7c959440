//! 应用程序框架
//!
//! `App` 负责窗口、GL 上下文和帧循环；用户代码实现 `Application` trait，
//! 只关心资源创建、逻辑更新和绘制。
//!
//! # 帧循环
//!
//! ```text
//! 处理事件 → 计算 dt → clear → 相机更新 → on_update(dt) → render() → swap
//! ```
//!
//! 窗口最小化（尺寸为零）时跳过 clear/update/render，事件照常处理。
//! 实现了 `camera_mut` 的应用（3D 应用）由框架把输入喂给相机，
//! 并在窗口尺寸变化时同步相机的宽高比。
//!
//! # 使用示例
//!
//! ```no_run
//! use minigl::app::{App, AppContext, Application};
//! use minigl::core::{Config, Result};
//! use minigl::gfx::Gpu;
//!
//! struct Empty;
//!
//! impl Application for Empty {
//!     fn init(_gpu: &Gpu, _ctx: &AppContext) -> Result<Self> {
//!         Ok(Empty)
//!     }
//!
//!     fn render(&mut self, _gpu: &Gpu, _ctx: &AppContext) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! App::run::<Empty>(Config::default())?;
//! # Ok::<(), minigl::core::MiniGlError>(())
//! ```

pub mod window;

use std::rc::Rc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::WindowId;

use crate::component::Camera;
use crate::core::error::{MiniGlError, Result};
use crate::core::{Config, Input};
use crate::gfx::{Gpu, HeadlessDevice};
use crate::renderer::RenderCommand;
use crate::{engine_error, engine_info, engine_trace};

pub use window::Window;

/// 无头运行时每帧的固定时间步长（秒）
pub const HEADLESS_FRAME_TIME: f32 = 1.0 / 60.0;

/// `--headless` 启动时默认运行的帧数
pub const DEFAULT_HEADLESS_FRAMES: u32 = 3;

/// 每帧传给应用的只读上下文
#[derive(Debug, Clone)]
pub struct AppContext {
    /// 自启动以来的总时间（秒）
    pub time: f32,
    /// 上一帧的耗时（秒）
    pub dt: f32,
    /// 已运行的帧数
    pub frame: u64,
    pub input: Input,
    /// 帧缓冲像素尺寸
    pub size: (u32, u32),
    pub config: Config,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self {
            time: 0.0,
            dt: 0.0,
            frame: 0,
            input: Input::new(),
            size: (config.window.width, config.window.height),
            config,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.size.1 == 0 {
            1.0
        } else {
            self.size.0 as f32 / self.size.1 as f32
        }
    }

    pub fn is_minimized(&self) -> bool {
        self.size.0 == 0 || self.size.1 == 0
    }
}

/// 用户应用
pub trait Application: Sized {
    /// 在 GL 上下文就绪后调用一次，创建所有 GPU 资源
    fn init(gpu: &Gpu, ctx: &AppContext) -> Result<Self>;

    /// 每帧逻辑更新
    fn on_update(&mut self, _ctx: &AppContext, _dt: f32) {}

    /// 每帧绘制；返回的错误会终止帧循环
    fn render(&mut self, gpu: &Gpu, ctx: &AppContext) -> Result<()>;

    /// 由框架驱动的相机
    fn camera_mut(&mut self) -> Option<&mut Camera> {
        None
    }
}

/// 窗口与无头两种运行方式共享的帧逻辑
struct FrameLoop<A> {
    gpu: Gpu,
    ctx: AppContext,
    app: A,
}

impl<A: Application> FrameLoop<A> {
    fn start(gpu: Gpu, ctx: AppContext) -> Result<Self> {
        RenderCommand::set_depth_test(&gpu, ctx.config.graphics.depth_test);
        RenderCommand::set_depth_clamp(&gpu, ctx.config.graphics.depth_clamp);
        RenderCommand::set_clear_color(&gpu, ctx.config.graphics.clear_color.into());
        if !ctx.is_minimized() {
            RenderCommand::set_viewport(&gpu, 0, 0, ctx.size.0, ctx.size.1);
        }

        let mut app = A::init(&gpu, &ctx)?;
        if let Some(camera) = app.camera_mut() {
            camera.set_aspect(ctx.aspect_ratio());
        }
        Ok(Self { gpu, ctx, app })
    }

    /// 运行一帧；返回是否实际绘制了（最小化时不绘制）
    fn frame(&mut self, dt: f32) -> Result<bool> {
        self.ctx.dt = dt;
        self.ctx.time += dt;
        self.ctx.frame += 1;

        if self.ctx.is_minimized() {
            return Ok(false);
        }

        RenderCommand::clear_all(&self.gpu);
        if let Some(camera) = self.app.camera_mut() {
            camera.on_update(&self.ctx.input, dt);
        }
        self.app.on_update(&self.ctx, dt);
        self.app.render(&self.gpu, &self.ctx)?;
        Ok(true)
    }

    fn end_frame(&mut self) {
        self.ctx.input.end_frame();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.ctx.size = (width, height);
        if self.ctx.is_minimized() {
            return;
        }
        RenderCommand::set_viewport(&self.gpu, 0, 0, width, height);
        let aspect = self.ctx.aspect_ratio();
        if let Some(camera) = self.app.camera_mut() {
            camera.set_aspect(aspect);
        }
    }

    fn handle_input(&mut self, event: &WindowEvent) {
        let input = &mut self.ctx.input;
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    input.on_keyboard_input(code, event.state);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => input.on_mouse_button(*button, *state),
            WindowEvent::CursorMoved { position, .. } => input.on_mouse_move(position.x as f32, position.y as f32),
            WindowEvent::MouseWheel { delta, .. } => input.on_mouse_wheel(*delta),
            WindowEvent::Focused(false) => input.reset(),
            _ => {}
        }
    }
}

/// winit 事件处理器
///
/// 字段顺序保证 GPU 资源（`frame_loop`）先于 GL 上下文（`window`）销毁。
struct Runner<A> {
    config: Config,
    frame_loop: Option<FrameLoop<A>>,
    window: Option<Window>,
    error: Option<MiniGlError>,
    last_frame: Instant,
}

impl<A: Application> Runner<A> {
    fn new(config: Config) -> Self {
        Self {
            config,
            frame_loop: None,
            window: None,
            error: None,
            last_frame: Instant::now(),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: MiniGlError) {
        engine_error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn create(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (window, device) = Window::new(event_loop, &self.config)?;
        let gpu: Gpu = Rc::new(device);

        let mut ctx = AppContext::new(self.config.clone());
        ctx.size = window.size();

        let frame_loop = FrameLoop::<A>::start(gpu, ctx)?;
        window.request_redraw();

        self.window = Some(window);
        self.frame_loop = Some(frame_loop);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(window), Some(frame_loop)) = (&self.window, &mut self.frame_loop) else {
            return Ok(());
        };

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if frame_loop.frame(dt)? {
            window.swap_buffers()?;
        }
        frame_loop.end_frame();
        Ok(())
    }
}

impl<A: Application> ApplicationHandler for Runner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let Some(frame_loop) = &mut self.frame_loop {
            frame_loop.handle_input(&event);
        }

        match event {
            WindowEvent::CloseRequested => {
                engine_info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                engine_trace!(width = size.width, height = size.height, "Window resized");
                if let Some(window) = &self.window {
                    window.resize(size.width, size.height);
                }
                if let Some(frame_loop) = &mut self.frame_loop {
                    frame_loop.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // 上下文仍然有效时释放 GPU 资源
        self.frame_loop = None;
    }
}

/// 帧循环入口
pub struct App;

impl App {
    /// 打开窗口并运行帧循环，直到窗口关闭
    ///
    /// `config.window.headless` 为真时改为在无头设备上运行
    /// `DEFAULT_HEADLESS_FRAMES` 帧。初始化或帧内的错误会被记录并返回。
    pub fn run<A: Application>(config: Config) -> Result<()> {
        if config.window.headless {
            engine_info!(frames = DEFAULT_HEADLESS_FRAMES, "Running headless");
            return Self::run_headless::<A>(config, DEFAULT_HEADLESS_FRAMES).map(|_| ());
        }

        let event_loop =
            EventLoop::new().map_err(|e| MiniGlError::Initialization(format!("failed to create event loop: {}", e)))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut runner = Runner::<A>::new(config);
        event_loop
            .run_app(&mut runner)
            .map_err(|e| MiniGlError::Runtime(format!("event loop error: {}", e)))?;

        match runner.error.take() {
            Some(e) => Err(e),
            None => {
                engine_info!("Application exited");
                Ok(())
            }
        }
    }

    /// 在新建的无头设备上运行 `frames` 帧，返回应用以便检查其状态
    pub fn run_headless<A: Application>(config: Config, frames: u32) -> Result<A> {
        Self::run_on::<A>(Rc::new(HeadlessDevice::new()), config, frames)
    }

    /// 在给定设备上以固定步长运行 `frames` 帧
    pub fn run_on<A: Application>(gpu: Gpu, config: Config, frames: u32) -> Result<A> {
        let mut frame_loop = FrameLoop::<A>::start(gpu, AppContext::new(config)).inspect_err(|e| {
            engine_error!("{}", e);
        })?;

        for _ in 0..frames {
            if let Err(e) = frame_loop.frame(HEADLESS_FRAME_TIME) {
                engine_error!(frame = frame_loop.ctx.frame, "{}", e);
                return Err(e);
            }
            frame_loop.end_frame();
        }
        Ok(frame_loop.app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GraphicsError;
    use crate::gfx::{BufferBit, Capability, DeviceCall, PolygonMode};
    use approx::assert_relative_eq;

    fn setup() -> (Rc<HeadlessDevice>, Gpu) {
        let device = Rc::new(HeadlessDevice::new());
        let gpu: Gpu = device.clone();
        (device, gpu)
    }

    #[derive(Default)]
    struct Recorder {
        updates: Vec<f32>,
        renders: u32,
    }

    impl Application for Recorder {
        fn init(_gpu: &Gpu, _ctx: &AppContext) -> Result<Self> {
            Ok(Self::default())
        }

        fn on_update(&mut self, _ctx: &AppContext, dt: f32) {
            self.updates.push(dt);
        }

        fn render(&mut self, gpu: &Gpu, _ctx: &AppContext) -> Result<()> {
            self.renders += 1;
            RenderCommand::wireframe(gpu, false);
            Ok(())
        }
    }

    struct Failing;

    impl Application for Failing {
        fn init(_gpu: &Gpu, _ctx: &AppContext) -> Result<Self> {
            Err(GraphicsError::ShaderCompilation("bad shader".into()).into())
        }

        fn render(&mut self, _gpu: &Gpu, _ctx: &AppContext) -> Result<()> {
            Ok(())
        }
    }

    struct WithCamera {
        camera: Camera,
    }

    impl Application for WithCamera {
        fn init(_gpu: &Gpu, _ctx: &AppContext) -> Result<Self> {
            Ok(Self { camera: Camera::perspective(60.0, 1.0, 0.1, 100.0) })
        }

        fn render(&mut self, _gpu: &Gpu, _ctx: &AppContext) -> Result<()> {
            Ok(())
        }

        fn camera_mut(&mut self) -> Option<&mut Camera> {
            Some(&mut self.camera)
        }
    }

    #[test]
    fn test_startup_state() {
        let (device, gpu) = setup();
        App::run_on::<Recorder>(gpu, Config::default(), 0).unwrap();

        let calls = device.take_calls();
        assert!(calls.contains(&DeviceCall::Capability { capability: Capability::DepthTest, enabled: true }));
        assert!(calls.contains(&DeviceCall::Capability { capability: Capability::DepthClamp, enabled: true }));
        assert!(calls.contains(&DeviceCall::ClearColor([0.2, 0.2, 0.2, 1.0].into())));
    }

    #[test]
    fn test_frame_order() {
        let (device, gpu) = setup();
        let app = App::run_on::<Recorder>(gpu, Config::default(), 3).unwrap();
        assert_eq!(app.renders, 3);
        assert_eq!(app.updates.len(), 3);
        assert_relative_eq!(app.updates[0], HEADLESS_FRAME_TIME);

        // 每帧都是 clear 在前、render 的绘制命令在后
        let frame_calls: Vec<_> = device
            .take_calls()
            .into_iter()
            .filter(|c| matches!(c, DeviceCall::Clear(_) | DeviceCall::PolygonMode(_)))
            .collect();
        let expected: Vec<_> = (0..3)
            .flat_map(|_| {
                [
                    DeviceCall::Clear(BufferBit::COLOR | BufferBit::DEPTH),
                    DeviceCall::PolygonMode(PolygonMode::Fill),
                ]
            })
            .collect();
        assert_eq!(frame_calls, expected);
    }

    #[test]
    fn test_init_error_propagates() {
        let result = App::run_headless::<Failing>(Config::default(), 1);
        assert!(matches!(
            result,
            Err(MiniGlError::Graphics(GraphicsError::ShaderCompilation(_)))
        ));
    }

    #[test]
    fn test_minimized_skips_frame() {
        let (device, gpu) = setup();
        let mut frame_loop = FrameLoop::<Recorder>::start(gpu, AppContext::new(Config::default())).unwrap();
        frame_loop.resize(0, 0);
        device.take_calls();

        assert!(!frame_loop.frame(0.1).unwrap());
        assert!(device.take_calls().is_empty());
        assert_eq!(frame_loop.app.renders, 0);

        frame_loop.resize(400, 200);
        assert!(frame_loop.frame(0.1).unwrap());
        assert_eq!(frame_loop.app.renders, 1);
    }

    #[test]
    fn test_resize_updates_viewport_and_camera() {
        let (device, gpu) = setup();
        let mut frame_loop = FrameLoop::<WithCamera>::start(gpu, AppContext::new(Config::default())).unwrap();
        device.take_calls();

        frame_loop.resize(800, 400);
        assert_eq!(
            device.take_calls(),
            vec![DeviceCall::Viewport { x: 0, y: 0, width: 800, height: 400 }]
        );
        match frame_loop.app.camera.kind() {
            crate::component::CameraKind::Perspective { aspect, .. } => assert_relative_eq!(*aspect, 2.0),
            other => panic!("unexpected camera kind {:?}", other),
        }
    }
}
