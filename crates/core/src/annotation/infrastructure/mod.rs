pub mod box_annotator;
pub mod text_overlay;
