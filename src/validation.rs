//! Upload checks: declared type, sniffed format and size cap.

use image::ImageFormat;

use crate::error::{DetectorError, Result};

/// A file received for one analysis, dropped once the request finishes.
#[derive(Debug, Clone, Default)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    /// Declared MIME type, `None` when the client did not send one.
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn format(self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
        }
    }
}

/// Reject uploads that have grown past `limit` bytes.
pub fn check_size(size: usize, limit: usize) -> Result<()> {
    if size > limit {
        return Err(DetectorError::TooLarge { size, limit });
    }
    Ok(())
}

/// Reject declared types other than JPEG/PNG before reading the body.
/// `application/octet-stream` counts as undeclared.
pub fn check_declared_type(content_type: Option<&str>) -> Result<Option<ImageKind>> {
    let Some(declared) = content_type else {
        return Ok(None);
    };
    let essence = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "" | "application/octet-stream" => Ok(None),
        "image/jpeg" | "image/jpg" => Ok(Some(ImageKind::Jpeg)),
        "image/png" => Ok(Some(ImageKind::Png)),
        _ => Err(DetectorError::UnsupportedType(essence)),
    }
}

/// Full check of a received upload. Returns the sniffed format.
pub fn validate(upload: &UploadedImage, limit: usize) -> Result<ImageKind> {
    if upload.is_empty() {
        return Err(DetectorError::EmptyUpload);
    }
    check_size(upload.len(), limit)?;
    let declared = check_declared_type(upload.content_type.as_deref())?;

    let sniffed = match image::guess_format(&upload.bytes) {
        Ok(ImageFormat::Jpeg) => ImageKind::Jpeg,
        Ok(ImageFormat::Png) => ImageKind::Png,
        Ok(other) => {
            return Err(DetectorError::UnsupportedType(format!("{other:?}").to_lowercase()));
        }
        Err(_) => {
            return Err(DetectorError::UnsupportedType(
                "unrecognised image data".to_string(),
            ));
        }
    };

    match declared {
        Some(kind) if kind != sniffed => Err(DetectorError::UnsupportedType(format!(
            "declared {kind:?} but content is {sniffed:?}"
        ))),
        _ => Ok(sniffed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";
    const LIMIT: usize = 10 * 1024 * 1024;

    #[test]
    fn accepts_png_and_jpeg() {
        let png = UploadedImage::new(PNG_MAGIC.to_vec()).with_content_type("image/png");
        assert_eq!(validate(&png, LIMIT).unwrap(), ImageKind::Png);

        let jpeg = UploadedImage::new(JPEG_MAGIC.to_vec()).with_content_type("image/jpeg");
        assert_eq!(validate(&jpeg, LIMIT).unwrap(), ImageKind::Jpeg);
    }

    #[test]
    fn undeclared_type_relies_on_sniffing() {
        let upload = UploadedImage::new(PNG_MAGIC.to_vec())
            .with_content_type("application/octet-stream");
        assert_eq!(validate(&upload, LIMIT).unwrap(), ImageKind::Png);
    }

    #[test]
    fn rejects_empty_upload() {
        let err = validate(&UploadedImage::default(), LIMIT).unwrap_err();
        assert!(matches!(err, DetectorError::EmptyUpload));
    }

    #[test]
    fn rejects_non_image() {
        let text = UploadedImage::new(b"hello world".to_vec()).with_content_type("text/plain");
        assert!(matches!(
            validate(&text, LIMIT),
            Err(DetectorError::UnsupportedType(t)) if t == "text/plain"
        ));

        let undeclared = UploadedImage::new(b"%PDF-1.7".to_vec())
            .with_content_type("application/octet-stream");
        let err = validate(&undeclared, LIMIT).unwrap_err();
        assert!(matches!(err, DetectorError::UnsupportedType(_)));
        assert!(err.to_string().contains("unrecognised image data"));
        assert!(!err.to_string().contains("octet-stream"));
    }

    #[test]
    fn rejects_mismatched_declaration() {
        let upload = UploadedImage::new(PNG_MAGIC.to_vec()).with_content_type("image/jpeg");
        assert!(matches!(
            validate(&upload, LIMIT),
            Err(DetectorError::UnsupportedType(_))
        ));
    }

    #[test]
    fn rejects_oversized() {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(LIMIT + 1, 0);
        let upload = UploadedImage::new(bytes).with_content_type("image/png");
        assert!(matches!(
            validate(&upload, LIMIT),
            Err(DetectorError::TooLarge { size, limit }) if size == LIMIT + 1 && limit == LIMIT
        ));
        assert!(check_size(LIMIT, LIMIT).is_ok());
    }

    #[test]
    fn declared_type_parameters_are_ignored() {
        assert_eq!(
            check_declared_type(Some("image/PNG; charset=binary")).unwrap(),
            Some(ImageKind::Png)
        );
        assert_eq!(check_declared_type(None).unwrap(), None);
    }
}
