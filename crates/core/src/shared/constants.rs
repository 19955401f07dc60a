pub const CLASSIFIER_FILE_NAME: &str = "haarcascade_russian_plate_number.xml";
pub const CLASSIFIER_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_russian_plate_number.xml";

/// Resize factor and pyramid step used by the capture app the detector was tuned in.
pub const DEFAULT_SCALE_FACTOR: f64 = 1.05;

/// Overlapping raw hits a cluster needs beyond this count to be reported.
pub const DEFAULT_MIN_NEIGHBORS: u32 = 7;

/// Relative tolerance for clustering raw cascade hits.
pub const GROUPING_EPS: f64 = 0.2;

/// Largest frame, in pixels, the resize step will produce.
pub const MAX_FRAME_PIXELS: u64 = 1 << 26;

pub const PLATE_LABEL: &str = "Number plate detected";
pub const LABEL_OFFSET: (i32, i32) = (-20, -10);
pub const ANNOTATION_COLOR: [u8; 3] = [255, 255, 0];
pub const ANNOTATION_THICKNESS: u32 = 2;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
pub const RAW_YUV_EXTENSIONS: &[&str] = &["yuv", "nv21", "raw"];
