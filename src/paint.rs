pub mod color;
pub mod gradient;
