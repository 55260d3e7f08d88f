use super::BatchProgress;
use super::DocumentUploader;
use crate::notify::NotificationKind;
use crate::upload::{EntryId, EntryStatus};
use crate::utils::color::{file_icon_color, ColorExt, ACCENT_HEX, ERROR_HEX, SUCCESS_HEX};
use crate::utils::file_size::FileSizeUtils;
use egui::{Align2, Color32, RichText, Stroke};
use std::time::Instant;

impl DocumentUploader {
    pub fn render(&mut self, ctx: &egui::Context) {
        let accent = Color32::from_hex_or_grey(ACCENT_HEX);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(20.0);
                ui.vertical_centered(|ui| {
                    ui.heading("Upload Documents");
                    ui.add_space(5.0);
                    ui.label(
                        RichText::new("Upload PDF, DOCX, or PPT files to make them searchable with AI.")
                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                    );
                });

                ui.add_space(20.0);
                self.render_drop_zone(ui, accent);

                let entries = self.coordinator.snapshot();
                if !entries.is_empty() {
                    ui.add_space(20.0);
                    ui.label(RichText::new("Files to upload").strong());
                    ui.add_space(8.0);

                    let mut to_remove: Vec<EntryId> = Vec::new();
                    for entry in &entries {
                        ui.group(|ui| {
                            ui.horizontal(|ui| {
                                ui.colored_label(file_icon_color(entry.kind), "📄");
                                ui.vertical(|ui| {
                                    ui.label(RichText::new(&entry.name).strong());
                                    ui.label(
                                        RichText::new(FileSizeUtils::format_megabytes(entry.size_bytes))
                                            .small()
                                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                                    );
                                });

                                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                    if ui.small_button("✖").clicked() {
                                        to_remove.push(entry.id);
                                    }
                                    match entry.status {
                                        EntryStatus::InProgress => {
                                            ui.add(
                                                egui::ProgressBar::new(entry.progress as f32 / 100.0)
                                                    .desired_width(64.0)
                                                    .fill(accent),
                                            );
                                        }
                                        EntryStatus::Complete => {
                                            ui.colored_label(accent, "Complete");
                                        }
                                        EntryStatus::Pending => {}
                                    }
                                });
                            });
                        });
                    }
                    for id in to_remove {
                        self.remove_file(id);
                    }

                    ui.add_space(10.0);
                    ui.vertical_centered(|ui| {
                        let label = if self.state.is_uploading {
                            "⏳ Uploading...".to_string()
                        } else {
                            format!(
                                "📤 Upload {} file{} ({})",
                                entries.len(),
                                if entries.len() > 1 { "s" } else { "" },
                                FileSizeUtils::total_megabytes(entries.iter().map(|e| e.size_bytes))
                            )
                        };

                        ui.add_enabled_ui(!self.state.is_uploading, |ui| {
                            let button = egui::Button::new(label).min_size(egui::vec2(200.0, 40.0));
                            if ui.add(button).clicked() {
                                self.start_upload();
                            }
                        });
                    });
                }

                let progress = BatchProgress::compute(
                    &entries,
                    self.state.is_uploading,
                    self.state.last_outcome.as_ref(),
                );
                if progress != BatchProgress::Idle {
                    ui.add_space(20.0);
                    ui.group(|ui| {
                        ui.add(
                            egui::ProgressBar::new(progress.fraction())
                                .show_percentage()
                                .animate(self.state.is_uploading)
                                .fill(accent),
                        );
                        ui.label(progress.status_text());
                    });
                }

                self.render_details(ui);

                if let Some(error) = &self.state.error_message {
                    ui.add_space(10.0);
                    ui.vertical_centered(|ui| {
                        ui.colored_label(Color32::from_hex_or_grey(ERROR_HEX), error);
                    });
                }

                if !self.state.is_uploading && self.state.last_outcome.is_some() {
                    ui.add_space(10.0);
                    ui.vertical_centered(|ui| {
                        if ui.button("🗑 Clear All").clicked() {
                            self.reset();
                        }
                    });
                }

                ui.add_space(20.0);
            });
        });

        self.render_toasts(ctx);
    }

    fn render_drop_zone(&mut self, ui: &mut egui::Ui, accent: Color32) {
        let (stroke, fill) = if self.state.is_dragging {
            (Stroke::new(2.0, accent), accent.gamma_multiply(0.1))
        } else {
            (
                Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color),
                Color32::TRANSPARENT,
            )
        };

        egui::Frame::group(ui.style())
            .stroke(stroke)
            .fill(fill)
            .inner_margin(24.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.vertical_centered(|ui| {
                    ui.label(RichText::new("Drag and drop your files here").heading());
                    ui.add_space(4.0);
                    ui.label(
                        RichText::new("or click to browse your files")
                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                    );
                    ui.add_space(12.0);
                    ui.horizontal(|ui| {
                        if ui.button("➕ Select Files").clicked() {
                            self.pick_files();
                        }
                        if ui.button("📁 Select Folder").clicked() {
                            self.pick_folder();
                        }
                    });
                    ui.add_space(4.0);
                    ui.label(
                        RichText::new("Folder uploads skip files listed in .gitignore")
                            .small()
                            .color(ui.visuals().text_color().gamma_multiply(0.5)),
                    );
                });
            });
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        let failures = self.state.failure_lines();
        if failures.is_empty() {
            return;
        }

        ui.add_space(10.0);
        if ui
            .button(if self.state.show_details {
                "Hide Details"
            } else {
                "Show Details"
            })
            .clicked()
        {
            self.state.show_details = !self.state.show_details;
        }

        if self.state.show_details {
            egui::Frame::none()
                .fill(ui.style().visuals.extreme_bg_color)
                .show(ui, |ui| {
                    ui.add_space(8.0);
                    for line in &failures {
                        ui.horizontal(|ui| {
                            ui.label("❌");
                            ui.colored_label(Color32::from_hex_or_grey(ERROR_HEX), line);
                        });
                        ui.add_space(4.0);
                    }
                    ui.add_space(8.0);
                });
        }
    }

    fn render_toasts(&mut self, ctx: &egui::Context) {
        let toasts = self.toasts.active(Instant::now());
        if toasts.is_empty() {
            return;
        }

        let mut dismissed = None;
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
            .show(ctx, |ui| {
                for (index, toast) in toasts.iter().enumerate() {
                    let color = match toast.notification.kind {
                        NotificationKind::Success => Color32::from_hex_or_grey(SUCCESS_HEX),
                        NotificationKind::Error => Color32::from_hex_or_grey(ERROR_HEX),
                    };
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.set_max_width(280.0);
                        ui.horizontal(|ui| {
                            ui.colored_label(color, RichText::new(&toast.notification.title).strong());
                            if ui.small_button("✖").clicked() {
                                dismissed = Some(index);
                            }
                        });
                        ui.label(&toast.notification.detail);
                    });
                    ui.add_space(6.0);
                }
            });

        if let Some(index) = dismissed {
            self.toasts.dismiss(index);
        }
    }
}
