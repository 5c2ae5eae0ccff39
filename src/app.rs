/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Main eframe::App implementation: intake queue + progress-event feed
//! drained once per frame, busy/idle surface swap, clipboard copy.

use std::sync::{Arc, Mutex};

use eframe::egui;

use crate::batch::{FailurePolicy, ProgressEvent};
use crate::model::{AppState, PendingImage, copy_flash_visible};

#[cfg(target_arch = "wasm32")]
use crate::batch::{ProgressSink, run_batch};
#[cfg(target_arch = "wasm32")]
use crate::normalize::FormatNormalizer;
#[cfg(target_arch = "wasm32")]
use crate::ocr;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen_futures::spawn_local;

const THUMBNAIL_MAX_PX: u32 = 256;
const THUMBNAIL_HEIGHT: f32 = 72.0;

/// Pushes orchestrator events into the feed the UI drains each frame.
#[cfg(target_arch = "wasm32")]
struct UiSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
    ctx: egui::Context,
}

#[cfg(target_arch = "wasm32")]
impl ProgressSink for UiSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
        self.ctx.request_repaint();
    }
}

pub struct OcrExtractorApp {
    state: AppState,
    /// File picker (and drops) push new selections here.
    file_queue: Arc<Mutex<Vec<PendingImage>>>,
    /// The in-flight batch task pushes progress events here.
    event_feed: Arc<Mutex<Vec<ProgressEvent>>>,
    /// Decoded previews of the current batch, in batch order.
    thumbnails: Vec<(String, Option<egui::TextureHandle>)>,
    /// Clock reading of the last copy action, for the transient indicator.
    copied_at: Option<f64>,
}

impl OcrExtractorApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            state: AppState::new(),
            file_queue: Arc::new(Mutex::new(Vec::new())),
            event_feed: Arc::new(Mutex::new(Vec::new())),
            thumbnails: Vec::new(),
            copied_at: None,
        }
    }

    /// Drain progress events (called each frame).
    fn poll_events(&mut self) {
        let drained: Vec<ProgressEvent> = {
            let mut feed = self.event_feed.lock().unwrap();
            feed.drain(..).collect()
        };
        for event in drained {
            self.state.apply_event(event);
        }
    }

    /// Collect newly picked and newly dropped files into one selection.
    fn poll_intake(&mut self, ctx: &egui::Context) {
        let mut files: Vec<PendingImage> = {
            let mut queue = self.file_queue.lock().unwrap();
            queue.drain(..).collect()
        };

        ctx.input(|i| {
            for file in &i.raw.dropped_files {
                if let Some(bytes) = &file.bytes {
                    files.push(PendingImage {
                        filename: file.name.clone(),
                        mime: file.mime.clone(),
                        bytes: bytes.to_vec(),
                    });
                    continue;
                }
                // Native drops arrive as paths, not bytes.
                #[cfg(not(target_arch = "wasm32"))]
                if let Some(path) = &file.path {
                    if let Ok(bytes) = std::fs::read(path) {
                        let filename = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        files.push(PendingImage {
                            filename,
                            mime: file.mime.clone(),
                            bytes,
                        });
                    }
                }
            }
        });

        files.retain(|f| is_image_file(&f.mime, &f.filename));
        if files.is_empty() {
            return;
        }
        if self.state.busy {
            // One batch at a time; a selection made mid-batch is dropped.
            log::warn!(
                "ignoring {} file(s) selected while a batch is in flight",
                files.len()
            );
            return;
        }
        self.start_batch(ctx, files);
    }

    fn start_batch(&mut self, ctx: &egui::Context, files: Vec<PendingImage>) {
        log::info!("starting batch of {} file(s)", files.len());
        self.copied_at = None;
        self.thumbnails = files
            .iter()
            .map(|f| (f.filename.clone(), decode_thumbnail(ctx, f)))
            .collect();
        self.state.begin_batch(files.len());

        #[cfg(target_arch = "wasm32")]
        {
            let sink = Arc::new(UiSink {
                events: Arc::clone(&self.event_feed),
                ctx: ctx.clone(),
            });
            let policy = self.state.settings.failure_policy;
            spawn_local(async move {
                let normalizer = FormatNormalizer::new(ocr::WebConverter);
                let _ = run_batch(files, &normalizer, &ocr::WebRecognizer, policy, sink).await;
            });
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            log::warn!("recognition requires the browser build; batch dropped");
            self.state.finish_batch(String::new(), 0, 0);
            self.state.status_message = "Recognition runs in the browser build".into();
        }
    }

    fn show_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.heading("Multi Image OCR Extractor");
            ui.add_space(2.0);

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!self.state.busy, egui::Button::new("Upload Images"))
                    .clicked()
                {
                    self.open_picker(ctx);
                }

                let mut marker =
                    self.state.settings.failure_policy == FailurePolicy::InlineMarker;
                if ui
                    .add_enabled(
                        !self.state.busy,
                        egui::Checkbox::new(&mut marker, "Mark failed files in the text"),
                    )
                    .changed()
                {
                    self.state.settings.failure_policy = if marker {
                        FailurePolicy::InlineMarker
                    } else {
                        FailurePolicy::SilentSkip
                    };
                }
            });

            ui.horizontal(|ui| {
                if self.state.busy {
                    ui.spinner();
                }
                ui.label(&self.state.status_message);
            });
            ui.add_space(2.0);
        });
    }

    #[cfg(target_arch = "wasm32")]
    fn open_picker(&mut self, ctx: &egui::Context) {
        let file_queue = Arc::clone(&self.file_queue);
        let ctx = ctx.clone();
        spawn_local(async move {
            match ocr::pick_files().await {
                Ok(files) => {
                    file_queue.lock().unwrap().extend(files);
                    ctx.request_repaint();
                }
                Err(e) => log::error!("file picker error: {e}"),
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn open_picker(&mut self, _ctx: &egui::Context) {
        log::warn!("file picking requires the browser build");
        self.state.status_message = "Recognition runs in the browser build".into();
    }

    fn show_progress_surface(&self, ui: &mut egui::Ui) {
        ui.add_space(8.0);
        let percent = self.state.aggregate_percent();
        ui.add(
            egui::ProgressBar::new(percent / 100.0)
                .show_percentage()
                .animate(true),
        );
        if let Some(current) = &self.state.current {
            ui.add_space(4.0);
            ui.label(format!(
                "File {}/{} — {} ({:.0}%)",
                current.index,
                self.state.batch_size,
                current.filename,
                current.fraction * 100.0
            ));
        }

        ui.add_space(8.0);
        egui::ScrollArea::horizontal().show(ui, |ui| {
            ui.horizontal(|ui| {
                for (name, texture) in &self.thumbnails {
                    match texture {
                        Some(texture) => {
                            let [w, h] = texture.size();
                            let scale = THUMBNAIL_HEIGHT / h as f32;
                            ui.image(egui::load::SizedTexture::new(
                                texture.id(),
                                egui::vec2(w as f32 * scale, THUMBNAIL_HEIGHT),
                            ))
                            .on_hover_text(name);
                        }
                        None => {
                            ui.group(|ui| {
                                ui.set_min_size(egui::vec2(54.0, THUMBNAIL_HEIGHT));
                                ui.centered_and_justified(|ui| {
                                    ui.label(
                                        egui::RichText::new("no preview")
                                            .small()
                                            .color(egui::Color32::GRAY),
                                    );
                                });
                            })
                            .response
                            .on_hover_text(name);
                        }
                    }
                }
            });
        });
    }

    fn show_result_surface(&mut self, ui: &mut egui::Ui) {
        let now = ui.ctx().input(|i| i.time);
        ui.horizontal(|ui| {
            if ui.button("Copy to clipboard").clicked() {
                ui.ctx().copy_text(self.state.result_text.clone());
                self.copied_at = Some(now);
            }
            if copy_flash_visible(self.copied_at, now) {
                ui.colored_label(egui::Color32::from_rgb(100, 200, 100), "Copied!");
                ui.ctx()
                    .request_repaint_after(std::time::Duration::from_millis(100));
            } else {
                self.copied_at = None;
            }
        });
        ui.add_space(4.0);

        let editing_enabled = self.state.editing_enabled();
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.add(
                egui::TextEdit::multiline(&mut self.state.result_text)
                    .desired_width(f32::INFINITY)
                    .desired_rows(16)
                    .interactive(editing_enabled),
            );
        });
    }
}

impl eframe::App for OcrExtractorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events();
        self.poll_intake(ctx);

        // Keep repainting while a batch is running
        if self.state.busy {
            ctx.request_repaint();
        }

        self.show_top_panel(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.state.busy {
                self.show_progress_surface(ui);
            } else if !self.state.result_text.is_empty() {
                self.show_result_surface(ui);
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        egui::RichText::new(
                            "Drag images here\nor click 'Upload Images' above",
                        )
                        .size(18.0)
                        .color(egui::Color32::GRAY),
                    );
                });
            }

            if !self.state.error_messages.is_empty() {
                ui.separator();
                ui.collapsing("Failed files", |ui| {
                    for msg in &self.state.error_messages {
                        ui.colored_label(egui::Color32::from_rgb(255, 100, 100), msg);
                    }
                });
            }
        });
    }
}

fn is_image_file(mime: &str, name: &str) -> bool {
    if mime.starts_with("image/") {
        return true;
    }
    let lower = name.to_lowercase();
    lower.ends_with(".jpg")
        || lower.ends_with(".jpeg")
        || lower.ends_with(".png")
        || lower.ends_with(".heic")
}

fn decode_thumbnail(ctx: &egui::Context, file: &PendingImage) -> Option<egui::TextureHandle> {
    if file.bytes.is_empty() {
        return None;
    }
    // HEIC (and anything else the image crate can't read) gets a placeholder.
    let img = image::load_from_memory(&file.bytes).ok()?;
    let img = if img.width() > THUMBNAIL_MAX_PX || img.height() > THUMBNAIL_MAX_PX {
        img.resize(
            THUMBNAIL_MAX_PX,
            THUMBNAIL_MAX_PX,
            image::imageops::FilterType::Triangle,
        )
    } else {
        img
    };
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.into_raw();
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &pixels);
    Some(ctx.load_texture(file.filename.clone(), color_image, egui::TextureOptions::LINEAR))
}
