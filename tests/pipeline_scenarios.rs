use std::sync::{Arc, Mutex};

use postercard::layout::panel::DARK_TEXT;
use postercard::{
    Canvas, Direction, MarkdownRasterizer, PaletteEntry, PaletteTable, PosterError, PosterJob,
    PosterRenderer, PosterResult, RasterRequest, RenderConfig, Rgb, TextLayer,
};

/// Records every request and returns a solid layer, `line_height` rows per markdown line.
#[derive(Default)]
struct RecordingRasterizer {
    line_height: u32,
    seen: Mutex<Vec<RasterRequest>>,
}

impl MarkdownRasterizer for RecordingRasterizer {
    fn rasterize(&self, req: &RasterRequest) -> PosterResult<TextLayer> {
        self.seen.lock().unwrap().push(req.clone());
        let lines = req.markdown.lines().count().max(1) as u32;
        let image = image::RgbaImage::from_pixel(
            req.width,
            lines * self.line_height,
            image::Rgba(req.text_color.to_rgba(255)),
        );
        Ok(TextLayer { image })
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn black_to_white() -> PaletteEntry {
    PaletteEntry {
        id: 1,
        name: "墨白".to_string(),
        colors: vec!["#000000".to_string(), "#FFFFFF".to_string()],
    }
}

fn renderer(cfg: RenderConfig, raster: Arc<RecordingRasterizer>) -> PosterRenderer {
    PosterRenderer::new(Arc::new(cfg), raster)
}

fn decode(png: &[u8]) -> image::RgbImage {
    image::load_from_memory(png).unwrap().into_rgb8()
}

#[test]
fn vertical_black_to_white_without_text() {
    let raster = Arc::new(RecordingRasterizer {
        line_height: 10,
        ..Default::default()
    });
    let r = renderer(RenderConfig::default(), raster.clone());
    let job =
        PosterJob::from_request(&black_to_white(), "", Some("#FFFFFF"), Some("vertical")).unwrap();
    let poster = r.render(&job).unwrap();
    let img = decode(&poster.png);

    assert_eq!(img.dimensions(), (1080, 1920));
    assert!(raster.seen.lock().unwrap().is_empty(), "no text, no rasterization");

    assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
    assert_eq!(img.get_pixel(0, 1919).0, [255, 255, 255]);
    let mid = img.get_pixel(0, 960).0[0];
    assert!((126..=128).contains(&mid), "mid gray was {mid}");
    assert_eq!(img.get_pixel(0, 960).0, img.get_pixel(1079, 960).0);

    // Provisional 80% panel, centered.
    let panel = poster.layout.panel.rect;
    assert_eq!((panel.x, panel.y, panel.width, panel.height), (108, 192, 864, 1536));
    assert_eq!(img.get_pixel(540, 960).0, [255, 255, 255]);
    assert_eq!(img.get_pixel(540, 200).0, [255, 255, 255]);
    // White glow lightens the gradient just outside the panel.
    assert!(img.get_pixel(100, 960).0[0] > mid);
}

#[test]
fn light_panel_measures_text_and_uses_dark_ink() {
    let raster = Arc::new(RecordingRasterizer {
        line_height: 100,
        ..Default::default()
    });
    let r = renderer(RenderConfig::default(), raster.clone());
    let job = PosterJob::from_request(&black_to_white(), "# Hello", Some("#FFFFFF"), None).unwrap();
    let poster = r.render(&job).unwrap();

    let seen = raster.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].text_color, DARK_TEXT);
    assert_eq!(seen[0].background, Rgb::WHITE);
    assert_eq!(seen[0].width, 864 - 2 * 50);

    let panel = poster.layout.panel.rect;
    assert_eq!(panel.height, 100 + 2 * 50);
    assert_eq!(panel.y, (1920 - 200) / 2);
    assert_eq!(panel.x, 108);
    let glow = poster.layout.glow.rect;
    assert_eq!(glow.height, panel.height + 20);
    assert_eq!(glow.center_x2(), panel.center_x2());

    let img = decode(&poster.png);
    let content = poster.layout.content_box();
    assert_eq!(
        img.get_pixel(content.x as u32 + 5, content.y as u32 + 5).0,
        [0x33, 0x33, 0x33]
    );
}

#[test]
fn dark_panel_uses_white_ink() {
    let raster = Arc::new(RecordingRasterizer {
        line_height: 20,
        ..Default::default()
    });
    let mut cfg = RenderConfig::with_canvas(Canvas {
        width: 240,
        height: 320,
    });
    cfg.corner_radius = 12;
    cfg.glow_blur_sigma = 2.0;
    let r = renderer(cfg, raster.clone());
    let job = PosterJob::from_request(&black_to_white(), "a\nb", Some("#202020"), Some("corner"))
        .unwrap();
    assert_eq!(job.direction, Direction::BottomRight);
    let poster = r.render(&job).unwrap();

    assert_eq!(raster.seen.lock().unwrap()[0].text_color, Rgb::WHITE);
    assert_eq!(poster.layout.panel.rect.height, 40 + 24);
    assert!(!poster.theme.is_light());
}

#[test]
fn invalid_background_fails_before_rendering() {
    let err = PosterJob::from_request(&black_to_white(), "# Hi", Some("red"), None).unwrap_err();
    assert!(matches!(err, PosterError::Config(_)), "{err}");
}

#[test]
fn unknown_palette_id_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let palette = dir.path().join("palette.json");
    std::fs::write(
        &palette,
        serde_json::to_string(&vec![black_to_white()]).unwrap(),
    )
    .unwrap();
    let out_dir = dir.path().join("out");

    let table = PaletteTable::load(&palette).unwrap();
    let err = table.find(404).unwrap_err();
    assert!(matches!(err, PosterError::Lookup(404)));
    assert!(!out_dir.exists());
}

#[test]
fn identical_jobs_render_identical_pngs() {
    let raster = Arc::new(RecordingRasterizer {
        line_height: 30,
        ..Default::default()
    });
    let mut cfg = RenderConfig::with_canvas(Canvas {
        width: 180,
        height: 240,
    });
    cfg.corner_radius = 8;
    cfg.glow_blur_sigma = 1.5;
    let r = renderer(cfg, raster);
    let entry = PaletteEntry {
        id: 3,
        name: "三色".into(),
        colors: vec!["#FF0000".into(), "#00FF00".into(), "#0000FF".into()],
    };
    let job = PosterJob::from_request(&entry, "x", Some("#fafafa"), Some("diagonal")).unwrap();
    let a = r.render(&job).unwrap();
    let b = r.render(&job).unwrap();
    assert_eq!(a.png, b.png);
}
