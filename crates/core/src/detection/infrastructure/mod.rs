pub mod cascade;
pub mod cascade_loader;
pub mod haar_cascade_detector;
pub mod integral_image;
