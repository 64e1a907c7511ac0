//! Application event loop.
//!
//! [`App`] is the winit application: it creates the window (bound to the
//! page canvas on the web), builds the GPU [`Context`], performs the eager
//! resize, starts the asset loads and then renders one frame per
//! `RedrawRequested`, requesting the next redraw after each frame.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window and the context (asynchronously on wasm,
//!    delivered back as [`AppEvent::Initialized`])
//! 2. the stage is built, resized to the window and the loads are spawned
//! 3. window events feed both orbit controllers and the resize handler
//! 4. loaded assets arrive as [`AppEvent::Asset`] and are applied in place
//! 5. each redraw runs the frame steps, presents and schedules the next one

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    audio::AudioSink,
    config::SceneConfig,
    context::Context,
    render::{GpuFrame, RenderLoop, SceneRenderer},
    resources::loader::{AssetEvent, spawn_load},
    viewport::{Stage, ViewportSize},
};

pub enum AppEvent {
    /// The context finished building (wasm only, where it cannot block).
    #[allow(dead_code)]
    Initialized(anyhow::Result<Box<Context>>),
    Asset(AssetEvent),
}

impl std::fmt::Debug for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(Ok(_)) => f.write_str("Initialized(Ok)"),
            Self::Initialized(Err(e)) => f.debug_tuple("Initialized").field(e).finish(),
            Self::Asset(event) => f.debug_tuple("Asset").field(&event.target).finish(),
        }
    }
}

/// Everything that exists once the GPU is ready.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    renderer: SceneRenderer,
    stage: Stage,
}

impl AppState {
    fn new(ctx: Context, config: &SceneConfig) -> Self {
        let stage = Stage::new(config, ctx.size);
        let renderer = SceneRenderer::new(&ctx);
        let mut state = Self {
            ctx,
            renderer,
            stage,
        };
        // eager resize, so both aspects are right before the first event
        if let Some(window) = state.ctx.window().cloned() {
            state.resize(ViewportSize::from_physical(
                window.inner_size(),
                window.scale_factor(),
            ));
        }
        state
    }

    fn resize(&mut self, size: ViewportSize) {
        self.ctx.resize(size);
        self.stage.resize(size);
    }

    fn request_redraw(&self) {
        if let Some(window) = self.ctx.window() {
            window.request_redraw();
        }
    }

    /// Renders one frame to the surface. Returns whether to keep going.
    fn render(&mut self, render_loop: &mut RenderLoop) -> Result<bool, wgpu::CurrentSurfaceTexture> {
        if !self.ctx.is_surface_configured() {
            return Ok(true);
        }
        let Some(surface) = &self.ctx.surface else {
            return Ok(false);
        };
        let output = match surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture)
            | wgpu::CurrentSurfaceTexture::Suboptimal(texture) => texture,
            other => return Err(other),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut frame = GpuFrame::new(&self.ctx, &mut self.renderer, &mut self.stage, &view);
        let keep_going = match render_loop.tick(&mut frame) {
            Ok(keep_going) => keep_going,
            Err(e) => {
                log::error!("Frame failed: {e}");
                true
            }
        };
        frame.submit();
        output.present();
        Ok(keep_going)
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<AppEvent>,
    config: SceneConfig,
    state: Option<AppState>,
    audio: Box<dyn AudioSink>,
    render_loop: RenderLoop,
}

impl App {
    pub fn new(
        event_loop: &EventLoop<AppEvent>,
        config: SceneConfig,
        audio: Box<dyn AudioSink>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            audio,
            render_loop: RenderLoop::new(),
        })
    }

    fn initialized(&mut self, event_loop: &ActiveEventLoop, ctx: anyhow::Result<Context>) {
        let ctx = match ctx {
            Ok(ctx) => ctx,
            Err(e) => {
                log::error!("Cannot create the main context: {e:#}");
                event_loop.exit();
                return;
            }
        };
        let state = AppState::new(ctx, &self.config);

        for request in state.stage.asset_requests() {
            let proxy = self.proxy.clone();
            let deliver = move |event: AssetEvent| {
                if proxy.send_event(AppEvent::Asset(event)).is_err() {
                    log::warn!("Event loop closed before an asset arrived");
                }
            };
            #[cfg(not(target_arch = "wasm32"))]
            spawn_load(&self.async_runtime, request, deliver);
            #[cfg(target_arch = "wasm32")]
            spawn_load(request, deliver);
        }

        state.request_redraw();
        self.state = Some(state);
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("starfield");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(crate::config::CANVAS_ID))
                .and_then(|canvas| canvas.dyn_into::<web_sys::HtmlCanvasElement>().ok());
            window_attributes = window_attributes.with_canvas(canvas);
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let ctx = self.async_runtime.block_on(Context::new(window));
            self.initialized(event_loop, ctx);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let ctx = Context::new(window).await.map(Box::new);
                if proxy.send_event(AppEvent::Initialized(ctx)).is_err() {
                    log::error!("Event loop closed during initialization");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Initialized(ctx) => self.initialized(event_loop, ctx.map(|ctx| *ctx)),
            AppEvent::Asset(asset) => {
                if let Some(state) = &mut self.state {
                    state.stage.apply_asset(asset, self.audio.as_mut());
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.stage.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let scale_factor = state
                    .ctx
                    .window()
                    .map(|window| window.scale_factor())
                    .unwrap_or(1.0);
                state.resize(ViewportSize::from_physical(size, scale_factor));
            }
            WindowEvent::RedrawRequested => match state.render(&mut self.render_loop) {
                Ok(keep_going) => {
                    state.stage.sync_audio(self.audio.as_mut());
                    if keep_going {
                        state.request_redraw();
                    }
                }
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated) => {
                    let size = state.ctx.size;
                    state.resize(size);
                    state.request_redraw();
                }
                Err(e) => {
                    log::error!("Unable to render {e:?}");
                    state.request_redraw();
                }
            },
            _ => {}
        }
    }
}

pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {e}");
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {e}").into());
        }
    }
}

/// Opens a window and runs the demo until it is closed.
#[cfg(not(target_arch = "wasm32"))]
pub fn run() -> anyhow::Result<()> {
    init_logging();

    let event_loop: EventLoop<AppEvent> = EventLoop::with_user_event().build()?;
    let audio = Box::new(crate::audio::LogSink::default());
    let mut app = App::new(&event_loop, SceneConfig::default(), audio)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}

/// Waits for the play button, then hands the canvas to the event loop.
#[cfg(target_arch = "wasm32")]
pub fn start() -> anyhow::Result<()> {
    init_logging();

    let control = crate::bootstrap::DomStartControl::find()?;
    control.install(|| {
        if let Err(e) = launch() {
            log::error!("Could not launch: {e:#}");
        }
    })
}

#[cfg(target_arch = "wasm32")]
fn launch() -> anyhow::Result<()> {
    use winit::platform::web::EventLoopExtWebSys;

    let event_loop: EventLoop<AppEvent> = EventLoop::with_user_event().build()?;
    // created inside the click handler, otherwise the browser keeps it muted
    let audio: Box<dyn AudioSink> = match crate::audio::WebAudioSink::new() {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            log::warn!("No Web Audio, continuing silently: {e}");
            Box::new(crate::audio::LogSink::default())
        }
    };
    let app = App::new(&event_loop, SceneConfig::default(), audio)?;
    event_loop.spawn_app(app);
    Ok(())
}
