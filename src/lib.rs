#![forbid(unsafe_code)]

//! Gradient poster cards: a palette gradient, a glowing rounded panel and markdown text on top.
//!
//! [`PosterRenderer`] runs the measure-then-render pipeline; [`service`] exposes it over HTTP.

pub mod assets;
pub mod config;
pub mod effects;
pub mod foundation;
pub mod layout;
pub mod paint;
pub mod render;
pub mod service;
pub mod text;

pub use assets::{PaletteEntry, PaletteTable};
pub use config::{RasterizerConfig, RasterizerKind, RenderConfig, ServiceConfig};
pub use foundation::core::{Canvas, PixelRect, Rgb};
pub use foundation::error::{PosterError, PosterResult};
pub use layout::panel::{PanelLayout, PanelTheme};
pub use paint::color::{Stops, interpolate, parse_hex_color, parse_palette};
pub use paint::gradient::{Direction, GradientSpec, render_gradient};
pub use render::{Poster, PosterJob, PosterRenderer};
pub use text::{MarkdownRasterizer, RasterRequest, TextLayer, create_rasterizer};
