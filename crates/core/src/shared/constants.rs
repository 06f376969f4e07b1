pub const CASCADE_MODEL_NAME: &str = "haarcascade_frontalface_alt2.xml";
pub const CASCADE_MODEL_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_frontalface_alt2.xml";

pub const DEFAULT_VIDEO: &str = "sub101_15fps.mp4";

pub const DEFAULT_SCALE_FACTOR: f64 = 1.2;
pub const DEFAULT_MIN_NEIGHBORS: u32 = 2;
pub const DEFAULT_MIN_FACE: u32 = 72;
/// 0 means no upper bound (the whole image).
pub const DEFAULT_MAX_FACE: u32 = 0;

/// Similarity tolerance used when grouping raw hits.
pub const GROUP_EPS: f64 = 0.2;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
