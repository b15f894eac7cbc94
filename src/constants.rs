pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";
pub const ANALYSIS_MAX_TOKENS: u32 = 1200;

pub const STREAM_CURSOR: &str = "▌";
pub const ACCEPTED_IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
pub const CAMERA_FILE_STEM: &str = "camera-capture";

pub const APP_TITLE: &str = "Image Analyzer";
pub const ANALYZE_BUTTON_LABEL: &str = "Analyse the Scientific Image";
pub const BUSY_MESSAGE: &str = "Analysing the image ...";

pub const RENDER_EVENT: &str = "analysis://render";
pub const STATE_EVENT: &str = "analysis://state";
