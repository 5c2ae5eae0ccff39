/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Batch image to text extraction: pick or drop a set of images, convert
//! HEIC shots to JPEG, run each through Tesseract.js, and edit/copy the
//! combined text. The UI is eframe/egui; OCR and format conversion live in
//! the browser and are reached over a wasm-bindgen bridge.

pub mod app;
pub mod batch;
pub mod error;
pub mod model;
pub mod normalize;

#[cfg(target_arch = "wasm32")]
pub mod ocr;
