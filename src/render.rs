pub mod output;
pub mod pipeline;

pub use pipeline::{Poster, PosterJob, PosterRenderer};
