pub const EMOTION_MODEL_NAME: &str = "emotion_detection_model.onnx";

pub const CASCADE_MODEL_NAME: &str = "haarcascade_frontalface_default.xml";
pub const CASCADE_MODEL_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_frontalface_default.xml";

/// Image pyramid step between detection scales.
pub const DETECT_SCALE_FACTOR: f64 = 1.3;

/// Overlapping candidates a detection needs to be reported.
pub const DETECT_MIN_NEIGHBORS: i32 = 5;

/// Largest accepted width or height of a decoded image.
pub const MAX_IMAGE_DIMENSION: u32 = 4096;

/// Fraction of the face width trimmed from every side before classification.
pub const FACE_INSET_RATIO: f64 = 0.1;

/// Side length of the square patch fed to the classifier.
pub const PATCH_SIZE: usize = 48;

pub const NUM_EMOTIONS: usize = 7;

pub const NO_FACE_LABEL: &str = "No Face";
pub const ERROR_LABEL: &str = "Error";
