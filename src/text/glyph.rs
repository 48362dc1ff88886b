use std::borrow::Cow;

use image::RgbaImage;
use parley::style::{FontStack, StyleProperty};

use crate::foundation::core::Rgb;
use crate::foundation::error::{PosterError, PosterResult};
use crate::text::fonts::FontSet;
use crate::text::markdown::{
    self, Block, BlockKind, CONTENT_PADDING, LINK_ACCENT, LIST_INDENT, LIST_MARGIN, MARKER_GAP,
    TextTier,
};
use crate::text::{MarkdownRasterizer, RasterRequest, TextLayer};

/// Parley brush carrying straight RGBA8.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TextBrush {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

impl From<Rgb> for TextBrush {
    fn from(c: Rgb) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: 255,
        }
    }
}

/// In-process rasterizer: parley shapes and breaks lines, vello_cpu fills the glyphs.
///
/// Every face of the [`FontSet`] is registered, so characters missing from the first face fall
/// through to the next one that covers them.
#[derive(Debug)]
pub struct GlyphRasterizer {
    fonts: FontSet,
}

impl GlyphRasterizer {
    /// With an empty set every non-empty document fails to rasterize.
    pub fn new(fonts: FontSet) -> Self {
        Self { fonts }
    }

    fn layout_document(&self, req: &RasterRequest) -> PosterResult<DocumentLayout> {
        let width = u16::try_from(req.width)
            .map_err(|_| PosterError::rasterization("text layer wider than 65535 px"))?;
        let inner_width = (f32::from(width) - 2.0 * CONTENT_PADDING).max(1.0);

        let mut engine = LayoutEngine::new(&self.fonts)?;
        let blocks = markdown::parse_blocks(&req.markdown);
        let mut placed = Vec::new();
        let mut y = CONTENT_PADDING;
        let mut last_margin = 0.0f32;

        for block in &blocks {
            let tier = block.tier();
            let (depth, marker, ends_list) = match &block.kind {
                BlockKind::ListItem {
                    marker,
                    depth,
                    ends_list,
                } => (Some(*depth), marker.as_deref(), *ends_list),
                _ => (None, None, false),
            };
            let indent = depth.map_or(0.0, |d| (d + 1) as f32 * LIST_INDENT);
            let x = CONTENT_PADDING + indent;
            let max_width = (inner_width - indent).max(1.0);
            let layout = engine.layout_block(block, req.text_color, max_width)?;

            if let Some(marker) = marker {
                let marker_layout = engine.layout_spans(
                    &[(marker, TextBrush::from(req.text_color))],
                    tier.font_size(),
                    None,
                )?;
                let mx = (x - MARKER_GAP - marker_layout.width()).max(0.0);
                placed.push(PlacedLayout {
                    layout: marker_layout,
                    x: mx,
                    y,
                });
            }

            let top = y;
            y += layout.height();
            placed.push(PlacedLayout { layout, x, y: top });

            last_margin = tier.margin_bottom();
            if ends_list {
                last_margin += LIST_MARGIN;
            }
            y += last_margin;
        }

        let content_height = (y - last_margin + CONTENT_PADDING).ceil();
        let height = if content_height > f32::from(u16::MAX) {
            tracing::warn!(content_height, "text layer taller than 65535 px, cropping");
            u16::MAX
        } else {
            (content_height as u16).max(1)
        };
        tracing::debug!(blocks = blocks.len(), height, "glyph layout done");

        Ok(DocumentLayout {
            placed,
            width,
            height,
        })
    }
}

struct PlacedLayout {
    layout: parley::Layout<TextBrush>,
    x: f32,
    y: f32,
}

struct DocumentLayout {
    placed: Vec<PlacedLayout>,
    width: u16,
    height: u16,
}

impl MarkdownRasterizer for GlyphRasterizer {
    #[tracing::instrument(skip(self, req), fields(width = req.width))]
    fn rasterize(&self, req: &RasterRequest) -> PosterResult<TextLayer> {
        if self.fonts.is_empty() {
            return Err(PosterError::rasterization(
                "no font available for text rendering",
            ));
        }
        let doc = self.layout_document(req)?;
        let image = paint(&self.fonts, &doc, req.background)?;
        Ok(TextLayer { image })
    }

    fn name(&self) -> &'static str {
        "glyph"
    }
}

/// vello_cpu handle for the face parley picked for a run, matched by shared buffer.
struct FaceCache<'a> {
    fonts: &'a FontSet,
    loaded: Vec<((usize, u32), vello_cpu::peniko::FontData)>,
}

impl FaceCache<'_> {
    fn get(&mut self, bytes: &[u8], index: u32) -> Option<&vello_cpu::peniko::FontData> {
        let key = (bytes.as_ptr() as usize, index);
        if let Some(pos) = self.loaded.iter().position(|(k, _)| *k == key) {
            return Some(&self.loaded[pos].1);
        }
        let source = self
            .fonts
            .faces()
            .iter()
            .find(|f| f.bytes.as_ptr() as usize == key.0)?;
        let data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::new(source.bytes.clone()),
            index,
        );
        self.loaded.push((key, data));
        self.loaded.last().map(|(_, d)| d)
    }
}

fn paint(fonts: &FontSet, doc: &DocumentLayout, background: Rgb) -> PosterResult<RgbaImage> {
    let DocumentLayout {
        placed,
        width,
        height,
    } = doc;
    let (width, height) = (*width, *height);
    let mut faces = FaceCache {
        fonts,
        loaded: Vec::new(),
    };

    let mut ctx = vello_cpu::RenderContext::new(width, height);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        background.r,
        background.g,
        background.b,
        255,
    ));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(width),
        f64::from(height),
    ));

    for p in placed {
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            f64::from(p.x),
            f64::from(p.y),
        )));
        for line in p.layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let face = run.run().font();
                let Some(font) = faces.get(face.data.data(), face.index) else {
                    tracing::warn!("glyph run uses an unregistered face, skipping");
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }

    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);

    RgbaImage::from_raw(
        u32::from(width),
        u32::from(height),
        pixmap.data_as_u8_slice().to_vec(),
    )
    .ok_or_else(|| PosterError::rasterization("pixmap size does not match layer size"))
}

/// Per-call parley contexts with every poster face registered.
struct LayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    /// CSS `font-family` list in fallback order.
    families: String,
}

impl LayoutEngine {
    fn new(fonts: &FontSet) -> PosterResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let mut names: Vec<String> = Vec::new();
        for face in fonts.faces() {
            let registered = font_ctx
                .collection
                .register_fonts(parley::fontique::Blob::new(face.bytes.clone()), None);
            for (family_id, _) in registered {
                let Some(name) = font_ctx.collection.family_name(family_id) else {
                    continue;
                };
                let name = name.replace('"', "");
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        if names.is_empty() {
            return Err(PosterError::rasterization("font files contain no usable face"));
        }
        let families = names
            .iter()
            .map(|n| format!("\"{n}\""))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            families,
        })
    }

    fn layout_block(
        &mut self,
        block: &Block,
        text_color: Rgb,
        max_width: f32,
    ) -> PosterResult<parley::Layout<TextBrush>> {
        let base = TextBrush::from(text_color);
        let link = TextBrush::from(LINK_ACCENT);
        let spans: Vec<(&str, TextBrush)> = block
            .spans
            .iter()
            .map(|s| (s.text.as_str(), if s.link { link } else { base }))
            .collect();
        let size = match block.kind {
            BlockKind::Heading(tier) => tier.font_size(),
            _ => TextTier::Body.font_size(),
        };
        self.layout_spans(&spans, size, Some(max_width))
    }

    fn layout_spans(
        &mut self,
        spans: &[(&str, TextBrush)],
        size_px: f32,
        max_width: Option<f32>,
    ) -> PosterResult<parley::Layout<TextBrush>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(PosterError::rasterization("font size must be finite and > 0"));
        }
        let text: String = spans.iter().map(|(s, _)| *s).collect();
        let default_brush = spans.first().map(|(_, b)| *b).unwrap_or_default();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, &text, 1.0, true);
        builder.push_default(StyleProperty::FontStack(FontStack::Source(Cow::Owned(
            self.families.clone(),
        ))));
        builder.push_default(StyleProperty::FontSize(size_px));
        builder.push_default(StyleProperty::Brush(default_brush));
        let mut start = 0;
        for (s, brush) in spans {
            let end = start + s.len();
            if *brush != default_brush {
                builder.push(StyleProperty::Brush(*brush), start..end);
            }
            start = end;
        }

        let mut layout = builder.build(&text);
        layout.break_all_lines(max_width);
        layout.align(
            max_width,
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
        Ok(layout)
    }
}
