/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Sequential batch orchestration: normalize then recognize each file in
//! selection order, accumulate the text, and report progress through an
//! event sink. One bad file never aborts the batch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::model::PendingImage;
use crate::normalize::{FormatNormalizer, ImageConverter};

/// Recognition language, fixed for the whole app.
pub const OCR_LANGUAGE: &str = "eng";

/// Callback fed with recognition fractions in `[0, 1]` for one file.
pub type ProgressFn = Box<dyn Fn(f32)>;

/// External OCR capability behind the per-file adapter: recognizes one
/// (already normalized) image and streams progress fractions while at it.
#[allow(async_fn_in_trait)]
pub trait TextRecognizer {
    async fn recognize(
        &self,
        image: &PendingImage,
        on_progress: ProgressFn,
    ) -> Result<String, ExtractError>;
}

/// What a failed file leaves behind in the combined text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Append a visible `[Error extracting text from <name>]` marker.
    #[default]
    InlineMarker,
    /// Contribute nothing; the failure is only logged and listed.
    SilentSkip,
}

/// Progress reporting payloads. `index` is 1-based batch position.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ProgressEvent {
    BatchStarted {
        total: usize,
    },
    FileStarted {
        index: usize,
        total: usize,
        filename: String,
    },
    FileProgress {
        index: usize,
        fraction: f32,
    },
    FileCompleted {
        index: usize,
        filename: String,
    },
    FileFailed {
        index: usize,
        filename: String,
        error: String,
    },
    BatchFinished {
        text: String,
        recognized: usize,
        failed: usize,
    },
}

/// Receiver for [`ProgressEvent`]s, implemented by the UI feed in the app
/// and by plain recorders in tests.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchOutcome {
    /// Combined recognized text, trimmed of surrounding whitespace.
    pub text: String,
    /// One `"<filename>: <error>"` entry per failed file, in batch order.
    pub failures: Vec<String>,
}

/// Process `files` strictly in order: normalize, recognize, append
/// `trimmed + "\n\n"` per success, apply `policy` per failure, and trim the
/// final accumulation. Progress and the final text are also delivered
/// through `sink`, so a fire-and-forget task needs nothing but the events.
pub async fn run_batch<C, R>(
    files: Vec<PendingImage>,
    normalizer: &FormatNormalizer<C>,
    recognizer: &R,
    policy: FailurePolicy,
    sink: Arc<dyn ProgressSink>,
) -> BatchOutcome
where
    C: ImageConverter,
    R: TextRecognizer,
{
    let total = files.len();
    sink.on_event(ProgressEvent::BatchStarted { total });

    let mut combined = String::new();
    let mut failures = Vec::new();
    let mut recognized = 0usize;

    for (i, image) in files.into_iter().enumerate() {
        let index = i + 1;
        let filename = image.filename.clone();
        sink.on_event(ProgressEvent::FileStarted {
            index,
            total,
            filename: filename.clone(),
        });

        let progress_sink = Arc::clone(&sink);
        let on_progress: ProgressFn = Box::new(move |fraction| {
            progress_sink.on_event(ProgressEvent::FileProgress { index, fraction });
        });

        let result = match normalizer.normalize(image).await {
            Ok(ready) => recognizer.recognize(&ready, on_progress).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => {
                combined.push_str(text.trim());
                combined.push_str("\n\n");
                recognized += 1;
                sink.on_event(ProgressEvent::FileCompleted { index, filename });
            }
            Err(e) => {
                log::error!("text extraction failed for {filename}: {e}");
                if policy == FailurePolicy::InlineMarker {
                    combined.push_str(&format!("[Error extracting text from {filename}]\n\n"));
                }
                failures.push(format!("{filename}: {e}"));
                sink.on_event(ProgressEvent::FileFailed {
                    index,
                    filename,
                    error: e.to_string(),
                });
            }
        }
    }

    let text = combined.trim().to_string();
    sink.on_event(ProgressEvent::BatchFinished {
        text: text.clone(),
        recognized,
        failed: failures.len(),
    });
    BatchOutcome { text, failures }
}
