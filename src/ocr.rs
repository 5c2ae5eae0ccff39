/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Browser-side capabilities via wasm-bindgen: file picker, heic2any
//! conversion and Tesseract.js recognition (js/ocr_bridge.js).

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::batch::{OCR_LANGUAGE, ProgressFn, TextRecognizer};
use crate::error::ExtractError;
use crate::model::PendingImage;
use crate::normalize::ImageConverter;

#[wasm_bindgen(module = "/js/ocr_bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn open_file_picker() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn convert_image(
        bytes: &[u8],
        source_type: &str,
        target_type: &str,
        quality: f32,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn ocr_recognize(
        image_bytes: &[u8],
        mime_type: &str,
        lang: &str,
        on_event: &js_sys::Function,
    ) -> Result<JsValue, JsValue>;
}

/// Open the native picker and return the selected images. An empty vec
/// means the user cancelled.
pub async fn pick_files() -> Result<Vec<PendingImage>, String> {
    let result = open_file_picker()
        .await
        .map_err(|e| format!("File picker error: {e:?}"))?;

    let array: js_sys::Array = result
        .dyn_into()
        .map_err(|_| "Expected array from file picker".to_string())?;

    let mut files = Vec::new();
    for i in 0..array.length() {
        let obj = array.get(i);
        let filename = js_sys::Reflect::get(&obj, &"name".into())
            .map_err(|_| "Missing name field".to_string())?
            .as_string()
            .unwrap_or_default();
        let mime = js_sys::Reflect::get(&obj, &"type".into())
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        let bytes_js = js_sys::Reflect::get(&obj, &"bytes".into())
            .map_err(|_| "Missing bytes field".to_string())?;
        let uint8: js_sys::Uint8Array = bytes_js
            .dyn_into()
            .map_err(|_| "Expected Uint8Array for bytes".to_string())?;
        files.push(PendingImage {
            filename,
            mime,
            bytes: uint8.to_vec(),
        });
    }
    Ok(files)
}

/// heic2any behind the converter seam.
pub struct WebConverter;

impl ImageConverter for WebConverter {
    async fn convert(
        &self,
        bytes: &[u8],
        source_mime: &str,
        target_mime: &str,
        quality: f32,
    ) -> Result<Vec<u8>, String> {
        let result = convert_image(bytes, source_mime, target_mime, quality)
            .await
            .map_err(|e| format!("{e:?}"))?;
        let uint8: js_sys::Uint8Array = result
            .dyn_into()
            .map_err(|_| "Converter returned non-bytes result".to_string())?;
        Ok(uint8.to_vec())
    }
}

/// Tesseract.js behind the recognizer seam. Forwards only the defined
/// fractions of "recognizing text" logger events; everything else the
/// library logs is dropped.
pub struct WebRecognizer;

impl TextRecognizer for WebRecognizer {
    async fn recognize(
        &self,
        image: &PendingImage,
        on_progress: ProgressFn,
    ) -> Result<String, ExtractError> {
        let on_event = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            let status = js_sys::Reflect::get(&event, &"status".into())
                .ok()
                .and_then(|v| v.as_string());
            if status.as_deref() != Some("recognizing text") {
                return;
            }
            if let Some(progress) = js_sys::Reflect::get(&event, &"progress".into())
                .ok()
                .and_then(|v| v.as_f64())
            {
                on_progress(progress as f32);
            }
        });

        let result = ocr_recognize(
            &image.bytes,
            &image.mime,
            OCR_LANGUAGE,
            on_event.as_ref().unchecked_ref(),
        )
        .await
        .map_err(|e| ExtractError::Recognition(format!("{e:?}")))?;

        let text = result
            .as_string()
            .ok_or_else(|| ExtractError::Recognition("OCR returned non-string result".into()))?;
        Ok(text.trim().to_string())
    }
}
