//! Session sidebar — list, create, switch, and delete sessions.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};

use crate::state::UiState;
use crate::theme::*;

/// What the caller should do after rendering the sidebar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarAction {
    None,
    NewSession,
    LoadSession(String),
    DeleteSession(String),
}

/// Render the session sidebar. Returns an action for the caller to handle.
pub fn sidebar_panel(ui: &mut egui::Ui, state: &mut UiState) -> SidebarAction {
    let mut action = SidebarAction::None;

    egui::Frame::default()
        .fill(BG_SIDEBAR)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                let new_btn = ui.add_sized(
                    Vec2::new(ui.available_width(), 28.0),
                    egui::Button::new(RichText::new("+ New Chat").color(TEXT_PRIMARY))
                        .fill(ACCENT)
                        .corner_radius(PANEL_ROUNDING),
                );
                if new_btn.clicked() {
                    action = SidebarAction::NewSession;
                }

                ui.add_space(8.0);
                ui.separator();

                ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .max_height(ui.available_height() - 40.0)
                    .show(ui, |ui| {
                        let active = state.active_session_id.clone();
                        for session in state.sorted_sessions() {
                            let is_active = active.as_deref() == Some(session.id.as_str());
                            let fill = if is_active { BG_SURFACE } else { BG_SIDEBAR };

                            egui::Frame::default()
                                .fill(fill)
                                .corner_radius(PANEL_ROUNDING)
                                .inner_margin(6.0)
                                .show(ui, |ui| {
                                    ui.horizontal(|ui| {
                                        let name_color = if is_active {
                                            TEXT_PRIMARY
                                        } else {
                                            TEXT_SECONDARY
                                        };
                                        let label = ui.add(
                                            egui::Label::new(
                                                RichText::new(&session.name).color(name_color),
                                            )
                                            .truncate()
                                            .sense(egui::Sense::click()),
                                        );
                                        if label.clicked() && !is_active {
                                            action =
                                                SidebarAction::LoadSession(session.id.clone());
                                        }

                                        ui.with_layout(
                                            Layout::right_to_left(Align::Center),
                                            |ui| {
                                                if ui.small_button("🗑").clicked() {
                                                    action = SidebarAction::DeleteSession(
                                                        session.id.clone(),
                                                    );
                                                }
                                            },
                                        );
                                    });
                                    ui.label(
                                        RichText::new(format!(
                                            "{} messages",
                                            session.message_count
                                        ))
                                        .color(TEXT_SECONDARY)
                                        .small(),
                                    );
                                });
                            ui.add_space(2.0);
                        }
                    });

                ui.separator();
                if ui
                    .add_sized(
                        Vec2::new(ui.available_width(), 24.0),
                        egui::Button::new(
                            RichText::new("Settings").color(TEXT_SECONDARY).small(),
                        )
                        .fill(BG_SIDEBAR)
                        .corner_radius(PANEL_ROUNDING),
                    )
                    .clicked()
                {
                    state.show_settings = !state.show_settings;
                }
            });
        });

    action
}
