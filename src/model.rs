/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Application state: one owned record holding the extracted text, the
//! busy flag and the batch progress counters. The UI thread is the only
//! writer; background tasks reach it exclusively through drained
//! [`ProgressEvent`]s.

use serde::{Deserialize, Serialize};

use crate::batch::{FailurePolicy, ProgressEvent};

/// How long the "Copied!" indicator stays visible after a copy action.
pub const COPY_FLASH_SECS: f64 = 1.5;

/// An image waiting for, or moving through, the extraction pipeline.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PendingImage {
    pub filename: String,
    /// Declared content type. May be empty; HEIC files often carry no type.
    pub mime: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Progress of the file currently being recognized.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileProgress {
    /// 1-based position in the batch.
    pub index: usize,
    pub filename: String,
    /// Recognition progress in `[0, 1]`.
    pub fraction: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub failure_policy: FailurePolicy,
}

pub struct AppState {
    /// Combined recognized text. Owned by the user once a batch finishes.
    pub result_text: String,
    /// True strictly while a batch is being processed.
    pub busy: bool,
    pub batch_size: usize,
    /// Files fully handled so far (recognized or failed).
    pub completed: usize,
    pub current: Option<FileProgress>,
    pub status_message: String,
    pub error_messages: Vec<String>,
    pub settings: Settings,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            result_text: String::new(),
            busy: false,
            batch_size: 0,
            completed: 0,
            current: None,
            status_message: "Drop images here or click 'Upload Images'".into(),
            error_messages: Vec::new(),
            settings: Settings::default(),
        }
    }

    /// The result text may only be edited while no batch is in flight.
    pub fn editing_enabled(&self) -> bool {
        !self.busy
    }

    pub fn begin_batch(&mut self, total: usize) {
        self.busy = true;
        self.result_text.clear();
        self.batch_size = total;
        self.completed = 0;
        self.current = None;
        self.error_messages.clear();
        self.status_message = format!("Extracting text from {total} image(s)…");
    }

    /// Weighted 0–100 completion: each file owns an equal share of the bar,
    /// the in-flight file contributes its fraction of that share.
    pub fn aggregate_percent(&self) -> f32 {
        if self.batch_size == 0 {
            return 0.0;
        }
        let share = 100.0 / self.batch_size as f32;
        let fraction = self.current.as_ref().map_or(0.0, |c| c.fraction);
        (self.completed as f32 * share + fraction * share).min(100.0)
    }

    /// Fold one orchestrator event into the state.
    pub fn apply_event(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::BatchStarted { total } => self.begin_batch(total),
            ProgressEvent::FileStarted {
                index,
                total,
                filename,
            } => {
                self.batch_size = total;
                self.status_message = format!("Extracting text from images… ({index}/{total})");
                self.current = Some(FileProgress {
                    index,
                    filename,
                    fraction: 0.0,
                });
            }
            ProgressEvent::FileProgress { index, fraction } => {
                if !fraction.is_finite() {
                    return;
                }
                if let Some(current) = &mut self.current {
                    if current.index == index {
                        current.fraction = fraction.clamp(0.0, 1.0);
                    }
                }
            }
            ProgressEvent::FileCompleted { .. } => {
                self.completed += 1;
                self.current = None;
            }
            ProgressEvent::FileFailed {
                filename, error, ..
            } => {
                self.completed += 1;
                self.current = None;
                self.error_messages.push(format!("{filename}: {error}"));
            }
            ProgressEvent::BatchFinished {
                text,
                recognized,
                failed,
            } => self.finish_batch(text, recognized, failed),
        }
    }

    pub fn finish_batch(&mut self, text: String, recognized: usize, failed: usize) {
        self.result_text = text;
        self.busy = false;
        self.current = None;
        self.status_message = if recognized == 0 && failed == 0 {
            "No images processed".into()
        } else if failed == 0 {
            format!("Done — text extracted from {recognized} image(s)")
        } else {
            format!("Done — {recognized} extracted, {failed} failed")
        };
    }
}

/// Whether the transient copy indicator should still be shown at `now`
/// (both values in seconds on the same clock).
pub fn copy_flash_visible(copied_at: Option<f64>, now: f64) -> bool {
    copied_at.is_some_and(|t| now - t < COPY_FLASH_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_started(index: usize, total: usize) -> ProgressEvent {
        ProgressEvent::FileStarted {
            index,
            total,
            filename: format!("img{index}.png"),
        }
    }

    #[test]
    fn aggregate_weighs_completed_files_and_current_fraction() {
        let mut state = AppState::new();
        state.begin_batch(4);
        state.completed = 2;
        state.current = Some(FileProgress {
            index: 3,
            filename: "c.png".into(),
            fraction: 0.5,
        });
        assert!((state.aggregate_percent() - 62.5).abs() < 1e-4);
    }

    #[test]
    fn aggregate_is_zero_outside_a_batch() {
        let state = AppState::new();
        assert_eq!(state.aggregate_percent(), 0.0);
    }

    #[test]
    fn aggregate_reaches_100_at_the_end() {
        let mut state = AppState::new();
        state.begin_batch(3);
        for i in 1..=3 {
            state.apply_event(file_started(i, 3));
            state.apply_event(ProgressEvent::FileProgress {
                index: i,
                fraction: 1.0,
            });
            state.apply_event(ProgressEvent::FileCompleted {
                index: i,
                filename: format!("img{i}.png"),
            });
        }
        assert!((state.aggregate_percent() - 100.0).abs() < 1e-4);
    }

    #[test]
    fn aggregate_is_monotonic_across_event_stream() {
        let mut state = AppState::new();
        state.begin_batch(2);
        let events = [
            file_started(1, 2),
            ProgressEvent::FileProgress {
                index: 1,
                fraction: 0.3,
            },
            ProgressEvent::FileProgress {
                index: 1,
                fraction: 0.9,
            },
            ProgressEvent::FileCompleted {
                index: 1,
                filename: "img1.png".into(),
            },
            file_started(2, 2),
            ProgressEvent::FileProgress {
                index: 2,
                fraction: 0.4,
            },
            ProgressEvent::FileFailed {
                index: 2,
                filename: "img2.png".into(),
                error: "recognition failed: boom".into(),
            },
        ];
        let mut last = state.aggregate_percent();
        for event in events {
            state.apply_event(event);
            let now = state.aggregate_percent();
            assert!(now >= last, "aggregate went backwards: {last} -> {now}");
            last = now;
        }
    }

    #[test]
    fn fraction_is_clamped_and_nan_ignored() {
        let mut state = AppState::new();
        state.begin_batch(1);
        state.apply_event(file_started(1, 1));
        state.apply_event(ProgressEvent::FileProgress {
            index: 1,
            fraction: 1.7,
        });
        assert_eq!(state.current.as_ref().unwrap().fraction, 1.0);
        state.apply_event(ProgressEvent::FileProgress {
            index: 1,
            fraction: f32::NAN,
        });
        assert_eq!(state.current.as_ref().unwrap().fraction, 1.0);
    }

    #[test]
    fn stale_fraction_for_another_file_is_dropped() {
        let mut state = AppState::new();
        state.begin_batch(2);
        state.apply_event(file_started(2, 2));
        state.apply_event(ProgressEvent::FileProgress {
            index: 1,
            fraction: 0.8,
        });
        assert_eq!(state.current.as_ref().unwrap().fraction, 0.0);
    }

    #[test]
    fn begin_batch_clears_previous_results() {
        let mut state = AppState::new();
        state.result_text = "old text".into();
        state.error_messages.push("old failure".into());
        state.begin_batch(1);
        assert!(state.busy);
        assert!(state.result_text.is_empty());
        assert!(state.error_messages.is_empty());
        assert!(!state.editing_enabled());
    }

    #[test]
    fn finish_batch_hands_text_back_and_clears_progress() {
        let mut state = AppState::new();
        state.begin_batch(2);
        state.current = Some(FileProgress {
            index: 2,
            filename: "b.png".into(),
            fraction: 0.7,
        });
        state.finish_batch("Hello".into(), 2, 0);
        assert!(!state.busy);
        assert!(state.current.is_none());
        assert_eq!(state.result_text, "Hello");
        assert!(state.editing_enabled());
    }

    #[test]
    fn copy_flash_expires_after_configured_window() {
        assert!(!copy_flash_visible(None, 10.0));
        assert!(copy_flash_visible(Some(10.0), 10.0));
        assert!(copy_flash_visible(Some(10.0), 11.4));
        assert!(!copy_flash_visible(Some(10.0), 11.5));
        assert!(!copy_flash_visible(Some(10.0), 20.0));
    }
}
