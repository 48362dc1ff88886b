pub mod palette;

pub use palette::{PaletteEntry, PaletteTable};
