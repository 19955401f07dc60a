pub mod color_conversion;
pub mod resize;
