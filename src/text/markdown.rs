//! Markdown preprocessing and block model shared by both rasterizers.

use pulldown_cmark::{CowStr, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd};

use crate::foundation::core::Rgb;

/// Inner padding of the content box on every side.
pub const CONTENT_PADDING: f32 = 20.0;
/// Horizontal indent per list nesting level.
pub const LIST_INDENT: f32 = 40.0;
/// Gap between a list marker and the item text.
pub const MARKER_GAP: f32 = 10.0;
/// Extra space after a whole list, on top of the last item's margin.
pub const LIST_MARGIN: f32 = 10.0;
/// Inline link color.
pub const LINK_ACCENT: Rgb = Rgb::new(0x00, 0x66, 0xCC);

/// Font size tier of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextTier {
    /// `h1`
    Title,
    /// `h2` through `h6`
    Subtitle,
    Body,
}

impl TextTier {
    pub fn font_size(self) -> f32 {
        match self {
            TextTier::Title => 72.0,
            TextTier::Subtitle => 54.0,
            TextTier::Body => 36.0,
        }
    }

    /// Space left below a block of this tier.
    pub fn margin_bottom(self) -> f32 {
        match self {
            TextTier::Title => 20.0,
            TextTier::Subtitle => 15.0,
            TextTier::Body => 10.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub link: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Heading(TextTier),
    Paragraph,
    /// `marker` is `None` for continuation paragraphs of a loose item.
    ListItem {
        marker: Option<String>,
        depth: u32,
        /// Last block of its outermost list.
        ends_list: bool,
    },
    Code,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub spans: Vec<Span>,
}

impl Block {
    pub fn tier(&self) -> TextTier {
        match self.kind {
            BlockKind::Heading(tier) => tier,
            _ => TextTier::Body,
        }
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Turn escaped `\n` sequences into newlines and make every newline a hard break.
pub fn normalize_source(src: &str) -> String {
    src.replace("\\n", "\n")
        .replace("\r\n", "\n")
        .replace('\n', "  \n")
}

/// Parser events with bare URLs in plain text rewritten as links.
pub fn events(normalized: &str) -> Vec<Event<'_>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut out = Vec::new();
    let mut link_depth = 0usize;
    let mut code_block = false;
    for event in Parser::new_ext(normalized, options) {
        match event {
            Event::Start(Tag::Link { .. }) => {
                link_depth += 1;
                out.push(event);
            }
            Event::End(TagEnd::Link) => {
                link_depth = link_depth.saturating_sub(1);
                out.push(event);
            }
            Event::Start(Tag::CodeBlock(_)) => {
                code_block = true;
                out.push(event);
            }
            Event::End(TagEnd::CodeBlock) => {
                code_block = false;
                out.push(event);
            }
            Event::Text(text) if link_depth == 0 && !code_block => {
                for (piece, is_url) in split_urls(&text) {
                    if is_url {
                        out.push(Event::Start(Tag::Link {
                            link_type: LinkType::Inline,
                            dest_url: CowStr::from(piece.to_owned()),
                            title: CowStr::from(""),
                            id: CowStr::from(""),
                        }));
                        out.push(Event::Text(CowStr::from(piece.to_owned())));
                        out.push(Event::End(TagEnd::Link));
                    } else {
                        out.push(Event::Text(CowStr::from(piece.to_owned())));
                    }
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Split `text` into runs, flagging `http://`, `https://` and `www.` URLs.
pub fn split_urls(text: &str) -> Vec<(&str, bool)> {
    const PREFIXES: [&str; 3] = ["https://", "http://", "www."];

    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let start = PREFIXES.iter().filter_map(|p| rest.find(p)).min();
        let Some(start) = start else {
            out.push((rest, false));
            break;
        };
        let end = rest[start..]
            .char_indices()
            .find(|&(_, c)| c.is_whitespace() || matches!(c, '<' | '>' | '"'))
            .map_or(rest.len(), |(i, _)| start + i);
        if start > 0 {
            out.push((&rest[..start], false));
        }
        out.push((&rest[start..end], true));
        rest = &rest[end..];
    }
    out
}

/// Flatten markdown into drawable blocks in document order.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let normalized = normalize_source(markdown);
    let mut builder = BlockBuilder::default();
    for event in events(&normalized) {
        builder.event(event);
    }
    builder.finish()
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    current: Option<Block>,
    /// Next ordinal per open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    pending_marker: Option<String>,
    link_depth: usize,
}

impl BlockBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush();
                let tier = if level == HeadingLevel::H1 {
                    TextTier::Title
                } else {
                    TextTier::Subtitle
                };
                self.current = Some(Block {
                    kind: BlockKind::Heading(tier),
                    spans: Vec::new(),
                });
            }
            Event::Start(Tag::Paragraph) => {
                self.flush();
                self.open_text_block();
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.current = Some(Block {
                    kind: BlockKind::Code,
                    spans: Vec::new(),
                });
            }
            Event::Start(Tag::List(start)) => {
                self.flush();
                self.lists.push(start);
            }
            Event::Start(Tag::Item) => {
                self.flush();
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}.");
                        *n += 1;
                        marker
                    }
                    _ => "\u{2022}".to_owned(),
                };
                self.pending_marker = Some(marker);
            }
            Event::Start(Tag::Link { .. }) => self.link_depth += 1,
            Event::End(TagEnd::Link) => self.link_depth = self.link_depth.saturating_sub(1),
            Event::End(TagEnd::List(_)) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.mark_list_end();
                }
            }
            Event::End(
                TagEnd::Heading(_) | TagEnd::Paragraph | TagEnd::CodeBlock | TagEnd::Item,
            ) => self.flush(),
            Event::Text(text) | Event::Code(text) => {
                let link = self.link_depth > 0;
                self.push_text(&text, link);
            }
            Event::SoftBreak => self.push_text(" ", false),
            Event::HardBreak => self.push_text("\n", false),
            Event::Rule => self.flush(),
            _ => {}
        }
    }

    fn open_text_block(&mut self) {
        let kind = if self.lists.is_empty() {
            BlockKind::Paragraph
        } else {
            BlockKind::ListItem {
                marker: self.pending_marker.take(),
                depth: (self.lists.len() - 1) as u32,
                ends_list: false,
            }
        };
        self.current = Some(Block {
            kind,
            spans: Vec::new(),
        });
    }

    fn push_text(&mut self, text: &str, link: bool) {
        if self.current.is_none() {
            self.open_text_block();
        }
        let Some(block) = self.current.as_mut() else {
            return;
        };
        match block.spans.last_mut() {
            Some(last) if last.link == link => last.text.push_str(text),
            _ => block.spans.push(Span {
                text: text.to_owned(),
                link,
            }),
        }
    }

    fn flush(&mut self) {
        let Some(mut block) = self.current.take() else {
            return;
        };
        while let Some(last) = block.spans.last_mut() {
            let trimmed = last.text.trim_end_matches(['\n', ' ']).len();
            last.text.truncate(trimmed);
            if last.text.is_empty() {
                block.spans.pop();
            } else {
                break;
            }
        }
        if !block.spans.is_empty() {
            self.blocks.push(block);
        }
    }

    fn mark_list_end(&mut self) {
        if let Some(Block {
            kind: BlockKind::ListItem { ends_list, .. },
            ..
        }) = self.blocks.last_mut()
        {
            *ends_list = true;
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

/// Standalone HTML page for the browser rasterizer; block metrics mirror [`TextTier`].
pub fn html_document(
    markdown: &str,
    width: u32,
    text_color: Rgb,
    background: Rgb,
    font_url: Option<&str>,
) -> String {
    let normalized = normalize_source(markdown);
    let mut body = String::new();
    pulldown_cmark::html::push_html(&mut body, events(&normalized).into_iter());

    let font_face = font_url
        .map(|url| {
            format!(
                "@font-face {{ font-family: 'PosterFont'; src: url('{url}') format('truetype'); }}"
            )
        })
        .unwrap_or_default();
    let text = text_color.to_hex();
    let bg = background.to_hex();
    let link = LINK_ACCENT.to_hex();
    let pad = CONTENT_PADDING;
    let (t, s, b) = (TextTier::Title, TextTier::Subtitle, TextTier::Body);
    let (t_size, t_mb) = (t.font_size(), t.margin_bottom());
    let (s_size, s_mb) = (s.font_size(), s.margin_bottom());
    let (b_size, b_mb) = (b.font_size(), b.margin_bottom());

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<style>
{font_face}
body {{ margin: 0; padding: 0; width: {width}px; background-color: transparent; color: {text};
  font-family: 'PosterFont', -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif; }}
.content {{ padding: {pad}px; box-sizing: border-box; width: 100%; background-color: {bg}; }}
.content > :last-child {{ margin-bottom: 0; }}
h1 {{ font-size: {t_size}px; margin: 0 0 {t_mb}px 0; }}
h2, h3, h4, h5, h6 {{ font-size: {s_size}px; margin: 0 0 {s_mb}px 0; }}
p, pre {{ font-size: {b_size}px; margin: 0 0 {b_mb}px 0; white-space: pre-wrap; }}
ul, ol {{ font-size: {b_size}px; margin: 0 0 {LIST_MARGIN}px 0; padding-left: {LIST_INDENT}px; }}
li {{ margin-bottom: {b_mb}px; }}
a {{ color: {link}; text-decoration: none; }}
</style>
</head>
<body>
<div class="content">
{body}
</div>
</body>
</html>
"#
    )
}
