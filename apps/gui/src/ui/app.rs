use std::{collections::HashMap, path::PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use client_core::is_image_filename;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use eframe::egui;
use shared::{domain::ConfidenceLevel, protocol::AnalysisRecord};

use crate::backend_bridge::commands::{BackendCommand, UiEvent};

const RESULT_IMAGE_MAX_EDGE: u32 = 480;
const THUMBNAIL_MAX_EDGE: u32 = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Upload,
    Result,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Error,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

pub struct PicognizeApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    active_tab: Tab,
    selected_path: Option<PathBuf>,
    analyzing: bool,

    current: Option<AnalysisRecord>,
    current_texture: Option<egui::TextureHandle>,

    history: Vec<AnalysisRecord>,
    thumbnails: HashMap<String, Option<egui::TextureHandle>>,

    status: String,
    status_banner: Option<StatusBanner>,
}

impl PicognizeApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        queue_command(&cmd_tx, BackendCommand::CheckService);
        queue_command(&cmd_tx, BackendCommand::RefreshHistory);
        Self {
            cmd_tx,
            ui_rx,
            active_tab: Tab::Upload,
            selected_path: None,
            analyzing: false,
            current: None,
            current_texture: None,
            history: Vec::new(),
            thumbnails: HashMap::new(),
            status: "Connecting to server...".to_string(),
            status_banner: None,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::AnalysisComplete(record) => {
                    self.analyzing = false;
                    self.selected_path = None;
                    self.status = format!("Analyzed {}", record.filename);
                    self.status_banner = None;
                    self.current_texture = None;
                    self.current = Some(record);
                    self.active_tab = Tab::Result;
                }
                UiEvent::AnalysisLoaded(record) => {
                    self.current_texture = None;
                    self.current = Some(record);
                    self.active_tab = Tab::Result;
                }
                UiEvent::AnalysisDeleted { id, message } => {
                    self.status = message;
                    self.history.retain(|record| record.id.to_string() != id);
                    self.thumbnails.remove(&id);
                    if self
                        .current
                        .as_ref()
                        .is_some_and(|record| record.id.to_string() == id)
                    {
                        self.current = None;
                        self.current_texture = None;
                        if self.active_tab == Tab::Result {
                            self.active_tab = Tab::History;
                        }
                    }
                }
                UiEvent::HistoryLoaded(records) => {
                    self.thumbnails
                        .retain(|id, _| records.iter().any(|r| r.id.to_string() == *id));
                    self.history = records;
                }
                UiEvent::Error(message) => {
                    self.analyzing = false;
                    self.status = message.clone();
                    self.status_banner = Some(StatusBanner {
                        severity: StatusBannerSeverity::Error,
                        message,
                    });
                }
            }
        }
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            let (fill, stroke) = match banner.severity {
                StatusBannerSeverity::Error => (
                    egui::Color32::from_rgb(111, 53, 53),
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
                ),
            };

            egui::Frame::none()
                .fill(fill)
                .stroke(stroke)
                .rounding(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
            ui.add_space(6.0);
        }
    }

    fn show_tab_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui
                .selectable_label(self.active_tab == Tab::Upload, "Upload")
                .clicked()
            {
                self.active_tab = Tab::Upload;
            }
            if ui
                .selectable_label(self.active_tab == Tab::Result, "Result")
                .clicked()
            {
                self.active_tab = Tab::Result;
            }
            if ui
                .selectable_label(self.active_tab == Tab::History, "History")
                .clicked()
            {
                self.active_tab = Tab::History;
                self.request_history();
            }
        });
        ui.separator();
    }

    fn request_history(&mut self) {
        queue_command(&self.cmd_tx, BackendCommand::RefreshHistory);
    }

    fn show_upload_tab(&mut self, ui: &mut egui::Ui) {
        ui.heading("Analyze an image");
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            if ui.button("Choose image...").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "bmp"])
                    .pick_file()
                {
                    self.selected_path = Some(path);
                    self.status_banner = None;
                }
            }
            match &self.selected_path {
                Some(path) => {
                    ui.label(
                        path.file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                            .unwrap_or_else(|| path.display().to_string()),
                    );
                }
                None => {
                    ui.weak("No file selected");
                }
            }
        });
        ui.add_space(8.0);

        let can_analyze = self.selected_path.is_some() && !self.analyzing;
        if ui
            .add_enabled(can_analyze, egui::Button::new("Analyze"))
            .clicked()
        {
            self.try_analyze();
        }
        if self.analyzing {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Analyzing image...");
            });
        }
    }

    fn try_analyze(&mut self) {
        // Analyze is a no-op without a selection; the button is disabled
        // in that state but events can still race a cleared path.
        let Some(path) = self.selected_path.clone() else {
            return;
        };
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_image_filename(&filename) {
            self.status = format!("'{filename}' is not an image file");
            self.status_banner = Some(StatusBanner {
                severity: StatusBannerSeverity::Error,
                message: "Please choose an image file (png, jpg, gif, webp, bmp).".to_string(),
            });
            return;
        }

        self.analyzing = true;
        self.status = format!("Analyzing {filename}...");
        self.status_banner = None;
        queue_command(&self.cmd_tx, BackendCommand::AnalyzeImage { path });
    }

    fn show_result_tab(&mut self, ui: &mut egui::Ui) {
        let Some(record) = self.current.clone() else {
            ui.weak("No analysis selected. Upload an image or pick one from History.");
            return;
        };

        if self.current_texture.is_none() {
            self.current_texture = texture_from_base64(
                ui.ctx(),
                &format!("analysis:{}", record.id),
                &record.image_base64,
                RESULT_IMAGE_MAX_EDGE,
            );
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.heading(&record.filename);
            ui.weak(record.timestamp.format("%Y-%m-%d %H:%M UTC").to_string());
            ui.add_space(8.0);

            if let Some(texture) = &self.current_texture {
                ui.image((texture.id(), texture.size_vec2()));
                ui.add_space(8.0);
            }

            ui.label(egui::RichText::new(record.description()).size(15.0));
            ui.add_space(10.0);

            if !record.objects_detected.is_empty() {
                ui.strong("Objects");
                ui.horizontal_wrapped(|ui| {
                    for object in &record.objects_detected {
                        ui.label(egui::RichText::new(object).background_color(
                            ui.visuals().faint_bg_color,
                        ));
                    }
                });
                ui.add_space(6.0);
            }

            if record.has_text_found() {
                ui.strong("Text found");
                ui.label(&record.text_found);
                ui.add_space(6.0);
            }

            if !record.emotions.is_empty() {
                ui.strong("Emotions");
                ui.label(record.emotions.join(", "));
                ui.add_space(6.0);
            }

            if !record.scene_description.is_empty() {
                ui.strong("Scene");
                ui.label(&record.scene_description);
                ui.add_space(6.0);
            }

            if !record.confidence.is_empty() {
                ui.strong("Confidence");
                let color = match ConfidenceLevel::from_label(&record.confidence) {
                    Some(ConfidenceLevel::High) => egui::Color32::from_rgb(87, 171, 90),
                    Some(ConfidenceLevel::Medium) => egui::Color32::from_rgb(212, 172, 77),
                    Some(ConfidenceLevel::Low) => egui::Color32::from_rgb(201, 93, 93),
                    None => ui.visuals().text_color(),
                };
                ui.label(egui::RichText::new(&record.confidence).color(color));
                ui.add_space(6.0);
            }

            ui.separator();
            if ui.button("Delete this analysis").clicked() {
                queue_command(
                    &self.cmd_tx,
                    BackendCommand::DeleteAnalysis {
                        id: record.id.to_string(),
                    },
                );
            }
        });
    }

    fn show_history_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("History");
            if ui.button("Refresh").clicked() {
                self.request_history();
            }
        });
        ui.add_space(6.0);

        if self.history.is_empty() {
            ui.weak("No analyses yet. Upload an image to get started.");
            return;
        }

        let mut view_id: Option<String> = None;
        let mut delete_id: Option<String> = None;

        egui::ScrollArea::vertical().show(ui, |ui| {
            for record in &self.history {
                let id = record.id.to_string();
                let texture = self
                    .thumbnails
                    .entry(id.clone())
                    .or_insert_with(|| {
                        texture_from_base64(
                            ui.ctx(),
                            &format!("thumb:{id}"),
                            &record.image_base64,
                            THUMBNAIL_MAX_EDGE,
                        )
                    })
                    .clone();

                ui.horizontal(|ui| {
                    if let Some(texture) = &texture {
                        ui.image((texture.id(), texture.size_vec2()));
                    }
                    ui.vertical(|ui| {
                        ui.strong(&record.filename);
                        ui.weak(record.timestamp.format("%Y-%m-%d %H:%M UTC").to_string());
                        ui.label(truncate(record.description(), 120));
                        ui.horizontal(|ui| {
                            if ui.button("View").clicked() {
                                view_id = Some(id.clone());
                            }
                            if ui.button("Delete").clicked() {
                                delete_id = Some(id.clone());
                            }
                        });
                    });
                });
                ui.separator();
            }
        });

        if let Some(id) = view_id {
            queue_command(&self.cmd_tx, BackendCommand::ViewAnalysis { id });
        }
        if let Some(id) = delete_id {
            queue_command(&self.cmd_tx, BackendCommand::DeleteAnalysis { id });
        }
    }
}

impl eframe::App for PicognizeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(&self.status);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_status_banner(ui);
            self.show_tab_bar(ui);
            match self.active_tab {
                Tab::Upload => self.show_upload_tab(ui),
                Tab::Result => self.show_result_tab(ui),
                Tab::History => self.show_history_tab(ui),
            }
        });

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

fn queue_command(cmd_tx: &Sender<BackendCommand>, cmd: BackendCommand) {
    if let Err(TrySendError::Full(_)) = cmd_tx.try_send(cmd) {
        tracing::warn!("backend command queue is full; dropping command");
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}

fn texture_from_base64(
    ctx: &egui::Context,
    texture_name: &str,
    image_base64: &str,
    max_edge: u32,
) -> Option<egui::TextureHandle> {
    let bytes = STANDARD.decode(image_base64).ok()?;
    let decoded = image::load_from_memory(&bytes).ok()?;
    let (orig_w, orig_h) = (decoded.width(), decoded.height());
    let resized = if orig_w.max(orig_h) > max_edge {
        let scale = max_edge as f32 / orig_w.max(orig_h) as f32;
        decoded.resize(
            (orig_w as f32 * scale).max(1.0) as u32,
            (orig_h as f32 * scale).max(1.0) as u32,
            image::imageops::FilterType::Triangle,
        )
    } else {
        decoded
    };
    let rgba = resized.to_rgba8();
    let [w, h] = [rgba.width() as usize, rgba.height() as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied([w, h], rgba.as_raw());
    Some(ctx.load_texture(texture_name, color_image, egui::TextureOptions::LINEAR))
}
