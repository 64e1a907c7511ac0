#[cfg(feature = "integration-tests")]
use cgmath::Point3;
#[cfg(feature = "integration-tests")]
use starfield_ngin::{
    camera::Camera,
    config::SceneConfig,
    context::Context,
    render::{GpuFrame, RenderLoop, SceneRenderer, read_texture},
    viewport::{Stage, ViewportSize},
};

#[cfg(feature = "integration-tests")]
async fn render_once(ctx: &Context, stage: &mut Stage) -> anyhow::Result<image::RgbaImage> {
    let target = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("golden target"),
        size: wgpu::Extent3d {
            width: ctx.config.width,
            height: ctx.config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ctx.config.format,
        usage: ctx.config.usage,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    let mut renderer = SceneRenderer::new(ctx);
    let mut render_loop = RenderLoop::new();

    let mut frame = GpuFrame::new(ctx, &mut renderer, stage, &view);
    assert!(render_loop.tick(&mut frame)?);
    frame.submit();

    read_texture(ctx, &target).await
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_clear_to_black_before_assets_arrive() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let size = ViewportSize::new(64, 64, 1.0);
        let ctx = Context::headless(size).await.unwrap();
        let mut stage = Stage::new(&SceneConfig::default(), size);
        // above the axes helper, looking up into the sky, which is not
        // created until its texture loads
        stage.background.camera = Camera::new(
            Point3::new(1_000.0, 30_000.0, 1_000.0),
            Point3::new(1_000.0, 31_000.0, 1_001.0),
        );
        stage.background.controller.target = stage.background.camera.look_at;
        stage.foreground.camera = stage.background.camera.clone();
        stage.foreground.controller.target = stage.background.camera.look_at;

        let image = render_once(&ctx, &mut stage).await.unwrap();

        for pixel in image.pixels() {
            assert_eq!(pixel.0, [0, 0, 0, 255]);
        }
    });
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_draw_foreground_box_over_background() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let size = ViewportSize::new(64, 64, 1.0);
        let ctx = Context::headless(size).await.unwrap();
        let mut stage = Stage::new(&SceneConfig::default(), size);
        // the box sits at (100, 10, 100); view it from 25 units away
        let box_centre = Point3::new(100.0, 10.0, 100.0);
        stage.foreground.camera = Camera::new(Point3::new(100.0, 10.0, 125.0), box_centre);
        stage.foreground.controller.target = box_centre;

        let image = render_once(&ctx, &mut stage).await.unwrap();

        // white box, barely touched by the fog at this distance
        let centre = image.get_pixel(32, 32).0;
        assert!(centre[..3].iter().all(|c| *c > 240), "centre pixel {centre:?}");
        // top corner looks into the sky, still unloaded
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 255]);
    });
}
