use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{data_structures::texture::Texture, pipelines::Layouts, viewport::ViewportSize};

/// GPU state shared by everything that draws: device, queue, the surface
/// the frames go to, and the depth buffer both layers render with.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Option<Arc<Window>>,
    pub(crate) depth_texture: Texture,
    pub surface: Option<wgpu::Surface<'static>>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub layouts: Layouts,
    pub clear_colour: wgpu::Color,
    pub size: ViewportSize,
    is_surface_configured: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = ViewportSize::from_physical(window.inner_size(), window.scale_factor());

        log::info!("WGPU setup");
        // Only the GL backend is compiled in on wasm, so the default picks WebGL2.
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("Could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable graphics adapter")?;
        let (device, queue) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders output linear colour and rely on an sRGB surface for
        // the conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("The surface reports no formats")?;
        let (width, height) = size.physical();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");
        let layouts = Layouts::new(&device);

        Ok(Self {
            window: Some(window),
            depth_texture,
            surface: Some(surface),
            device,
            queue,
            config,
            layouts,
            clear_colour: wgpu::Color::BLACK,
            size,
            is_surface_configured: false,
        })
    }

    /// A context without window or surface; frames go to an offscreen
    /// texture of `config.format`.
    #[cfg(all(feature = "integration-tests", not(target_arch = "wasm32")))]
    pub async fn headless(size: ViewportSize) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .context("No suitable graphics adapter")?;
        let (device, queue) = request_device(&adapter).await?;

        let (width, height) = size.physical();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");
        let layouts = Layouts::new(&device);

        Ok(Self {
            window: None,
            depth_texture,
            surface: None,
            device,
            queue,
            config,
            layouts,
            clear_colour: wgpu::Color::BLACK,
            size,
            is_surface_configured: true,
        })
    }

    /// Reconfigures the surface and depth buffer for `size`, scaled by its
    /// pixel ratio. Zero-sized requests are ignored.
    pub fn resize(&mut self, size: ViewportSize) {
        if size.is_empty() {
            return;
        }
        let (width, height) = size.physical();
        self.size = size;
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
            self.is_surface_configured = true;
        }
        self.depth_texture = Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
    }

    pub fn is_surface_configured(&self) -> bool {
        self.is_surface_configured
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_texture.view
    }

    /// Largest texture edge the device accepts.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

async fn request_device(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            // WebGL doesn't support all of wgpu's features, so if
            // we're building for the web we'll have to disable some.
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
            } else {
                wgpu::Limits::default()
            },
            memory_hints: Default::default(),
            ..Default::default()
        })
        .await?;
    Ok((device, queue))
}
