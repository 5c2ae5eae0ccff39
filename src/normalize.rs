/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! HEIC normalization. Tesseract cannot read HEIC, so camera shots are
//! converted to JPEG through an external converter before recognition;
//! everything else passes through untouched.

use crate::error::ExtractError;
use crate::model::PendingImage;

/// Content type that needs conversion before recognition.
pub const CAMERA_MIME: &str = "image/heic";
/// Conversion target and its quality on a 0–1 scale.
pub const TARGET_MIME: &str = "image/jpeg";
pub const JPEG_QUALITY: f32 = 0.9;

const CAMERA_SUFFIX: &str = ".heic";

/// External format-conversion capability (heic2any in the browser build).
#[allow(async_fn_in_trait)]
pub trait ImageConverter {
    async fn convert(
        &self,
        bytes: &[u8],
        source_mime: &str,
        target_mime: &str,
        quality: f32,
    ) -> Result<Vec<u8>, String>;
}

/// True when either the declared type or the filename extension
/// (case-insensitive) marks the file as HEIC. The type check wins: a
/// `.jpg` name with a declared `image/heic` type is still converted.
pub fn needs_conversion(mime: &str, filename: &str) -> bool {
    mime.eq_ignore_ascii_case(CAMERA_MIME)
        || filename.to_ascii_lowercase().ends_with(CAMERA_SUFFIX)
}

fn converted_filename(name: &str) -> String {
    format!("{name}.jpg")
}

pub struct FormatNormalizer<C: ImageConverter> {
    converter: C,
}

impl<C: ImageConverter> FormatNormalizer<C> {
    pub fn new(converter: C) -> Self {
        Self { converter }
    }

    /// Convert a HEIC image to JPEG, renaming and retagging it; return any
    /// other image unchanged. Converter rejections propagate to the caller,
    /// which owns per-file recovery.
    pub async fn normalize(&self, image: PendingImage) -> Result<PendingImage, ExtractError> {
        if !needs_conversion(&image.mime, &image.filename) {
            return Ok(image);
        }
        let bytes = self
            .converter
            .convert(&image.bytes, CAMERA_MIME, TARGET_MIME, JPEG_QUALITY)
            .await
            .map_err(ExtractError::Conversion)?;
        Ok(PendingImage {
            filename: converted_filename(&image.filename),
            mime: TARGET_MIME.into(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::sync::Mutex;

    /// Records every call; hands back fixed JPEG bytes.
    struct RecordingConverter {
        calls: Mutex<Vec<(String, String, f32)>>,
    }

    impl RecordingConverter {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ImageConverter for RecordingConverter {
        async fn convert(
            &self,
            _bytes: &[u8],
            source_mime: &str,
            target_mime: &str,
            quality: f32,
        ) -> Result<Vec<u8>, String> {
            self.calls
                .lock()
                .unwrap()
                .push((source_mime.into(), target_mime.into(), quality));
            Ok(b"jpeg-bytes".to_vec())
        }
    }

    struct FailingConverter;

    impl ImageConverter for FailingConverter {
        async fn convert(
            &self,
            _bytes: &[u8],
            _source_mime: &str,
            _target_mime: &str,
            _quality: f32,
        ) -> Result<Vec<u8>, String> {
            Err("unsupported brand".into())
        }
    }

    fn img(filename: &str, mime: &str) -> PendingImage {
        PendingImage {
            filename: filename.into(),
            mime: mime.into(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn detects_heic_extension_without_declared_type() {
        assert!(needs_conversion("", "photo.HEIC"));
        assert!(needs_conversion("", "photo.heic"));
        assert!(!needs_conversion("", "photo.jpg"));
    }

    #[test]
    fn declared_type_overrides_filename() {
        assert!(needs_conversion("image/heic", "photo.jpg"));
        assert!(needs_conversion("IMAGE/HEIC", "photo.jpg"));
        assert!(!needs_conversion("image/jpeg", "photo.jpg"));
    }

    #[test]
    fn passthrough_is_stable() {
        let normalizer = FormatNormalizer::new(RecordingConverter::new());
        let original = img("scan.png", "image/png");
        let once = block_on(normalizer.normalize(original.clone())).unwrap();
        let twice = block_on(normalizer.normalize(once.clone())).unwrap();
        assert_eq!(once, original);
        assert_eq!(twice, once);
        assert!(normalizer.converter.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn heic_is_renamed_retagged_and_rewritten() {
        let normalizer = FormatNormalizer::new(RecordingConverter::new());
        let converted = block_on(normalizer.normalize(img("IMG_0001.heic", ""))).unwrap();
        assert_eq!(converted.filename, "IMG_0001.heic.jpg");
        assert_eq!(converted.mime, "image/jpeg");
        assert_eq!(converted.bytes, b"jpeg-bytes");
    }

    #[test]
    fn converter_receives_fixed_target_and_quality() {
        let normalizer = FormatNormalizer::new(RecordingConverter::new());
        block_on(normalizer.normalize(img("a.heic", "image/heic"))).unwrap();
        let calls = normalizer.converter.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[("image/heic".into(), "image/jpeg".into(), 0.9)]
        );
    }

    #[test]
    fn converter_rejection_propagates_as_conversion_error() {
        let normalizer = FormatNormalizer::new(FailingConverter);
        let err = block_on(normalizer.normalize(img("a.heic", ""))).unwrap_err();
        assert!(matches!(err, ExtractError::Conversion(_)));
        assert_eq!(err.to_string(), "conversion failed: unsupported brand");
    }
}
