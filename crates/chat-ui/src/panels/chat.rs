//! Chat panel — transcript, error banner, and input field.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};

use chat_types::message::{Message, Sender};

use crate::state::UiState;
use crate::theme::*;

/// Render the chat panel. Returns Some(text) when the user submits input.
pub fn chat_panel(ui: &mut egui::Ui, state: &mut UiState) -> Option<String> {
    let mut submitted = None;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                // Header
                ui.horizontal(|ui| {
                    ui.heading(RichText::new("AI Chat").color(TEXT_PRIMARY).strong());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if state.is_loading {
                            ui.spinner();
                            ui.label(RichText::new("Working...").color(TEXT_SECONDARY).small());
                        }
                    });
                });

                ui.separator();

                if let Some(error) = state.error.clone() {
                    error_banner(ui, state, &error);
                    ui.add_space(4.0);
                }

                // Transcript
                let available_height = ui.available_height() - 60.0;
                ScrollArea::vertical()
                    .max_height(available_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for message in &state.messages {
                            render_message(ui, message);
                            ui.add_space(4.0);
                        }
                    });

                ui.add_space(8.0);

                // Input area
                ui.horizontal(|ui| {
                    let input = egui::TextEdit::singleline(&mut state.input_text)
                        .hint_text("Type a message, or /image <prompt>...")
                        .desired_width(ui.available_width() - 70.0)
                        .font(egui::FontId::proportional(14.0));

                    let response = ui.add_enabled(state.config_error.is_none(), input);

                    let send_enabled = state.can_send();
                    let send_btn = ui.add_enabled(
                        send_enabled,
                        egui::Button::new(RichText::new("Send").color(TEXT_PRIMARY))
                            .fill(if send_enabled { ACCENT } else { BG_SURFACE })
                            .corner_radius(PANEL_ROUNDING)
                            .min_size(Vec2::new(60.0, 0.0)),
                    );

                    // Submit on Enter or button click
                    if (response.lost_focus()
                        && ui.input(|i| i.key_pressed(egui::Key::Enter))
                        && state.can_send())
                        || send_btn.clicked()
                    {
                        submitted = Some(state.input_text.trim().to_string());
                        state.input_text.clear();
                        response.request_focus();
                    }
                });
            });
        });

    submitted
}

fn error_banner(ui: &mut egui::Ui, state: &mut UiState, error: &str) {
    egui::Frame::default()
        .fill(ERROR_BG)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(error).color(ERROR));
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.small_button("✕").clicked() {
                        state.error = None;
                    }
                });
            });
        });
}

fn render_message(ui: &mut egui::Ui, message: &Message) {
    let (label, label_color, bg) = match message.sender {
        Sender::User => ("You", TEXT_PRIMARY, ACCENT),
        Sender::Ai => ("AI", SUCCESS, BG_SURFACE),
        Sender::System => ("System", ERROR, ERROR_BG),
    };

    egui::Frame::default()
        .fill(bg)
        .corner_radius(BUBBLE_ROUNDING)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.label(RichText::new(label).color(label_color).strong().small());

            if message.is_thinking_phase {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(RichText::new("Thinking...").color(TEXT_SECONDARY).italics());
                });
                return;
            }

            if message.is_generating_image {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(RichText::new(&message.text).color(TEXT_SECONDARY).italics());
                });
                return;
            }

            if !message.text.is_empty() {
                ui.label(RichText::new(&message.text).color(TEXT_PRIMARY));
            }

            // Image loaders are installed by the app at startup
            if let Some(url) = &message.image_url {
                ui.add(
                    egui::Image::from_uri(url.clone())
                        .max_width(320.0)
                        .corner_radius(PANEL_ROUNDING),
                );
                if let Some(prompt) = &message.image_prompt {
                    ui.label(
                        RichText::new(format!("“{prompt}”"))
                            .color(TEXT_SECONDARY)
                            .small()
                            .italics(),
                    );
                }
            }
        });
}
