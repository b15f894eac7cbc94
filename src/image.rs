use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use llmapi::utils::{data_url, encode_byte_to_base64};
use serde::{Deserialize, Serialize};

use crate::constants::{ACCEPTED_IMAGE_EXTENSIONS, CAMERA_FILE_STEM};
use crate::error::{AnalysisError, Result};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xff, 0xd8, 0xff];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match mime_type.trim().to_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }

    /// Extension filter for uploads: png, jpg, jpeg in any letter case.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_lowercase();

        if !ACCEPTED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return None;
        }

        mime_guess::from_ext(&extension)
            .first_raw()
            .and_then(Self::from_mime)
    }

    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PNG_SIGNATURE) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(JPEG_SIGNATURE) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    #[default]
    File,
    Camera,
}

impl ImageSource {
    pub fn caption(self) -> &'static str {
        match self {
            ImageSource::File => "Upload image from file.",
            ImageSource::Camera => "Take picture from camera.",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    bytes: Vec<u8>,
    file_name: String,
    format: ImageFormat,
}

impl ImageInput {
    pub fn from_upload(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let format = ImageFormat::from_file_name(&file_name).ok_or_else(|| {
            AnalysisError::UnsupportedImage {
                file_name: file_name.clone(),
            }
        })?;

        Ok(Self {
            bytes,
            file_name,
            format,
        })
    }

    /// Camera widgets report a MIME type; fall back to the file signature
    /// when they do not.
    pub fn from_camera(bytes: Vec<u8>, mime_hint: Option<&str>) -> Result<Self> {
        let format = mime_hint
            .and_then(ImageFormat::from_mime)
            .or_else(|| ImageFormat::sniff(&bytes))
            .ok_or_else(|| AnalysisError::UnsupportedImage {
                file_name: CAMERA_FILE_STEM.to_string(),
            })?;

        Ok(Self {
            bytes,
            file_name: format!("{CAMERA_FILE_STEM}.{}", format.extension()),
            format,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        encode_byte_to_base64(&self.bytes)
    }

    pub fn data_uri(&self) -> String {
        data_url(self.mime_type(), &self.to_base64())
    }
}

impl std::fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageInput")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Holds whatever the upload and camera controls currently contain; only the
/// selected source's image counts. Lives in the app's managed state between
/// commands.
#[derive(Debug, Default)]
pub struct ImageAcquirer {
    source: ImageSource,
    uploaded: Option<ImageInput>,
    captured: Option<ImageInput>,
}

pub type SharedAcquirer = Mutex<ImageAcquirer>;

/// A panicked command cannot leave the acquirer half-written, so a poisoned
/// lock is still safe to use.
pub fn lock_acquirer(shared: &SharedAcquirer) -> MutexGuard<'_, ImageAcquirer> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ImageAcquirer {
    pub fn select_source(&mut self, source: ImageSource) {
        self.source = source;
    }

    pub fn upload(&mut self, file_name: impl Into<String>, bytes: Vec<u8>) -> Result<&ImageInput> {
        let image = ImageInput::from_upload(file_name, bytes)?;
        Ok(self.uploaded.insert(image))
    }

    pub fn capture(&mut self, bytes: Vec<u8>, mime_hint: Option<&str>) -> Result<&ImageInput> {
        let image = ImageInput::from_camera(bytes, mime_hint)?;
        Ok(self.captured.insert(image))
    }

    pub fn clear(&mut self) {
        match self.source {
            ImageSource::File => self.uploaded = None,
            ImageSource::Camera => self.captured = None,
        }
    }

    pub fn get_image(&self) -> Option<&ImageInput> {
        match self.source {
            ImageSource::File => self.uploaded.as_ref(),
            ImageSource::Camera => self.captured.as_ref(),
        }
    }

    pub fn preview(&self) -> Option<ImagePreview> {
        self.get_image().map(ImagePreview::from)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePreview {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    pub data_uri: String,
}

impl From<&ImageInput> for ImagePreview {
    fn from(image: &ImageInput) -> Self {
        Self {
            file_name: image.file_name().to_string(),
            mime_type: image.mime_type().to_string(),
            size: image.len() as u64,
            data_uri: image.data_uri(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn png_bytes() -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(b"rest-of-image");
        bytes
    }

    #[test]
    fn upload_accepts_only_png_and_jpeg_extensions() {
        assert_eq!(
            ImageInput::from_upload("cells.PNG", vec![1]).unwrap().format(),
            ImageFormat::Png
        );
        assert_eq!(
            ImageInput::from_upload("slide.jpeg", vec![1]).unwrap().mime_type(),
            "image/jpeg"
        );
        assert_eq!(
            ImageInput::from_upload("slide.jpg", vec![1]).unwrap().mime_type(),
            "image/jpeg"
        );

        for rejected in ["scan.gif", "scan.webp", "scan", "archive.png.zip"] {
            assert!(
                matches!(
                    ImageInput::from_upload(rejected, vec![1]),
                    Err(AnalysisError::UnsupportedImage { .. })
                ),
                "{rejected} should be rejected"
            );
        }
    }

    #[test]
    fn upload_does_not_inspect_content() {
        let image = ImageInput::from_upload("not-really.png", b"garbage".to_vec()).unwrap();
        assert_eq!(image.bytes(), b"garbage");
    }

    #[test]
    fn camera_prefers_hint_then_signature() {
        let hinted = ImageInput::from_camera(png_bytes(), Some("image/jpeg")).unwrap();
        assert_eq!(hinted.format(), ImageFormat::Jpeg);
        assert_eq!(hinted.file_name(), "camera-capture.jpg");

        let sniffed = ImageInput::from_camera(png_bytes(), None).unwrap();
        assert_eq!(sniffed.format(), ImageFormat::Png);
        assert_eq!(sniffed.file_name(), "camera-capture.png");

        assert!(ImageInput::from_camera(b"????".to_vec(), Some("image/webp")).is_err());
    }

    #[test]
    fn data_uri_uses_detected_mime_type() {
        let image = ImageInput::from_upload("tiny.png", b"hello".to_vec()).unwrap();
        assert_eq!(image.data_uri(), "data:image/png;base64,aGVsbG8=");

        let jpeg = ImageInput::from_upload("tiny.jpg", b"hello".to_vec()).unwrap();
        assert_eq!(jpeg.data_uri(), "data:image/jpeg;base64,aGVsbG8=");
    }

    #[test]
    fn acquirer_exposes_only_the_selected_source() {
        let mut acquirer = ImageAcquirer::default();
        assert!(acquirer.get_image().is_none());

        acquirer.upload("first.png", vec![1, 2]).unwrap();
        acquirer.capture(png_bytes(), None).unwrap();
        assert_eq!(acquirer.get_image().unwrap().file_name(), "first.png");

        acquirer.select_source(ImageSource::Camera);
        assert_eq!(
            acquirer.get_image().unwrap().file_name(),
            "camera-capture.png"
        );
        assert_eq!(acquirer.preview().unwrap().mime_type, "image/png");

        acquirer.clear();
        assert!(acquirer.get_image().is_none());
        assert!(acquirer.preview().is_none());

        acquirer.select_source(ImageSource::File);
        acquirer.upload("second.jpg", vec![3]).unwrap();
        assert_eq!(acquirer.get_image().unwrap().file_name(), "second.jpg");
    }

    #[test]
    fn poisoned_lock_still_hands_out_the_acquirer() {
        let shared = SharedAcquirer::default();
        lock_acquirer(&shared).upload("kept.png", vec![1]).unwrap();

        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = lock_acquirer(&shared);
                    panic!("command panicked while holding the image");
                })
                .join()
        });

        assert!(shared.is_poisoned());
        assert_eq!(lock_acquirer(&shared).get_image().unwrap().file_name(), "kept.png");
    }

    #[test]
    fn rejected_upload_keeps_previous_image() {
        let mut acquirer = ImageAcquirer::default();
        acquirer.upload("kept.png", vec![1]).unwrap();
        assert!(acquirer.upload("dropped.gif", vec![2]).is_err());
        assert_eq!(acquirer.get_image().unwrap().file_name(), "kept.png");
    }

    #[test]
    fn preview_reports_size_and_uri() {
        let image = ImageInput::from_upload("p.png", b"hello".to_vec()).unwrap();
        let preview = ImagePreview::from(&image);
        assert_eq!(preview.size, 5);
        assert_eq!(preview.mime_type, "image/png");
        assert_eq!(preview.data_uri, "data:image/png;base64,aGVsbG8=");
    }
}
