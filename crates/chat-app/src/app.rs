//! Main egui application — composes all panels and owns the session
//! controller.
//!
//! The controller is built asynchronously (opening IndexedDB is async),
//! so it lives in a shared slot that the boot task fills; until then the
//! UI renders a loading notice. Dispatch clones the controller handle out
//! of the slot and runs the call on `spawn_local`, so no borrow of the
//! slot outlives a frame and session actions still go through while a
//! turn streams. The controller's own loading flag is what gates sends.

use std::cell::RefCell;
use std::rc::Rc;

use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};

use chat_core::controller::SessionController;
use chat_core::event_bus::EventBus;
use chat_platform::config_store;
use chat_platform::gateway::GeminiGateway;
use chat_platform::session_store::LocalSessionStore;
use chat_platform::storage::{open_kv, KvStore};
use chat_types::config::{AppConfig, StorageBackendType};
use chat_ui::panels::settings::{self, SaveFeedback, SettingsAction};
use chat_ui::panels::{chat, sidebar};
use chat_ui::state::UiState;
use chat_ui::theme;

type ControllerSlot = Rc<RefCell<Option<Rc<SessionController>>>>;

/// The main application state
pub struct ChatApp {
    ui_state: UiState,
    config: AppConfig,
    event_bus: EventBus,
    controller: ControllerSlot,
    kv: Rc<RefCell<Option<Rc<dyn KvStore>>>>,
    /// Config restored by the boot task, picked up next frame
    restored_config: Rc<RefCell<Option<AppConfig>>>,
    /// Feedback from the async settings save, picked up next frame
    pending_feedback: Rc<RefCell<Option<SaveFeedback>>>,
    save_feedback: Option<SaveFeedback>,
    first_frame: bool,
}

impl ChatApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let event_bus = EventBus::new();
        let controller: ControllerSlot = Rc::new(RefCell::new(None));
        let kv = Rc::new(RefCell::new(None));
        let restored_config = Rc::new(RefCell::new(None));

        Self::boot(
            cc.egui_ctx.clone(),
            event_bus.clone(),
            controller.clone(),
            kv.clone(),
            restored_config.clone(),
        );

        Self {
            ui_state: UiState::new(),
            config: AppConfig::default(),
            event_bus,
            controller,
            kv,
            restored_config,
            pending_feedback: Rc::new(RefCell::new(None)),
            save_feedback: None,
            first_frame: true,
        }
    }

    /// Open storage, restore config, build the controller, initialize.
    /// Runs once at startup; the slots are filled when it finishes.
    fn boot(
        ctx: egui::Context,
        event_bus: EventBus,
        controller_slot: ControllerSlot,
        kv_slot: Rc<RefCell<Option<Rc<dyn KvStore>>>>,
        config_slot: Rc<RefCell<Option<AppConfig>>>,
    ) {
        wasm_bindgen_futures::spawn_local(async move {
            // The config lives in storage, so storage opens first with
            // auto-detection; an explicit preference in the restored
            // config triggers a reopen.
            let mut kv: Rc<dyn KvStore> = match open_kv(StorageBackendType::Auto).await {
                Ok(kv) => kv,
                Err(e) => {
                    log::error!("storage auto-detection failed: {e}");
                    Rc::new(chat_platform::storage::MemoryKv::new())
                }
            };
            let config = config_store::load_config(kv.as_ref()).await;

            let preferred = match config.storage.backend {
                StorageBackendType::Auto => None,
                StorageBackendType::Memory => Some("memory"),
                StorageBackendType::IndexedDb => Some("indexeddb"),
            };
            if preferred.is_some_and(|name| name != kv.backend_name()) {
                match open_kv(config.storage.backend.clone()).await {
                    Ok(preferred_kv) => kv = preferred_kv,
                    Err(e) => log::warn!("preferred storage backend unavailable: {e}"),
                }
            }
            log::info!("Storage backend: {}", kv.backend_name());

            *kv_slot.borrow_mut() = Some(kv.clone());
            *config_slot.borrow_mut() = Some(config.clone());

            let gateway = Rc::new(GeminiGateway::new(config.gateway));
            let store = Rc::new(LocalSessionStore::new(kv));
            let controller = Rc::new(SessionController::new(gateway, store, event_bus));
            if let Err(e) = controller.initialize().await {
                // A config error was already emitted; the blocking notice
                // takes over until settings are fixed.
                log::warn!("initialization halted: {e}");
            }
            *controller_slot.borrow_mut() = Some(controller);
            ctx.request_repaint();
        });
    }

    /// Persist the edited config, swap the gateway, and re-initialize.
    fn apply_settings(&mut self, ctx: &egui::Context) {
        self.save_feedback = None;
        let config = self.config.clone();
        let controller = self.controller.clone();
        let kv = self.kv.borrow().clone();
        let feedback_slot = self.pending_feedback.clone();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            let feedback = match &kv {
                Some(kv) => match config_store::save_config(kv.as_ref(), &config).await {
                    Ok(()) => SaveFeedback {
                        message: "Settings saved".to_string(),
                        success: true,
                    },
                    Err(e) => SaveFeedback {
                        message: format!("Save failed: {e}"),
                        success: false,
                    },
                },
                None => SaveFeedback {
                    message: "Storage is still starting".to_string(),
                    success: false,
                },
            };
            *feedback_slot.borrow_mut() = Some(feedback);

            let controller = controller.borrow().clone();
            if let Some(controller) = controller {
                controller.replace_gateway(Rc::new(GeminiGateway::new(config.gateway.clone())));
                if let Err(e) = controller.initialize().await {
                    log::warn!("re-initialization halted: {e}");
                }
            }
            ctx.request_repaint();
        });
    }

    fn dispatch_send(&self, text: String, ctx: &egui::Context) {
        let Some(controller) = self.controller.borrow().clone() else {
            return;
        };
        let ctx = ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = controller.send_message(&text).await {
                log::error!("send failed: {e}");
            }
            ctx.request_repaint();
        });
    }

    fn dispatch_sidebar(&self, action: sidebar::SidebarAction, ctx: &egui::Context) {
        let Some(controller) = self.controller.borrow().clone() else {
            return;
        };
        let ctx = ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = match &action {
                sidebar::SidebarAction::NewSession => controller.start_new_session().await,
                sidebar::SidebarAction::LoadSession(id) => controller.load_session(id).await,
                sidebar::SidebarAction::DeleteSession(id) => controller.delete_session(id).await,
                sidebar::SidebarAction::None => Ok(()),
            };
            if let Err(e) = result {
                log::error!("session action failed: {e}");
            }
            ctx.request_repaint();
        });
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            egui_extras::install_image_loaders(ctx);
            self.first_frame = false;
        }

        // Pick up async results from the boot and save tasks
        if let Some(config) = self.restored_config.borrow_mut().take() {
            self.config = config;
        }
        if let Some(feedback) = self.pending_feedback.borrow_mut().take() {
            self.save_feedback = Some(feedback);
        }

        // Drain controller events into the view state
        let events = self.event_bus.drain();
        if !events.is_empty() {
            self.ui_state.process_events(events);
            ctx.request_repaint();
        }
        // Keep frames coming while a turn streams in
        if self.ui_state.is_loading {
            ctx.request_repaint();
        }

        // ── Top bar ──────────────────────────────────────────
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("☰").clicked() {
                    self.ui_state.show_sidebar = !self.ui_state.show_sidebar;
                }
                ui.label(RichText::new("Luma").strong().color(theme::ACCENT).size(16.0));
                ui.separator();
                ui.label(
                    RichText::new(&self.config.gateway.model)
                        .color(theme::TEXT_SECONDARY)
                        .small(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .selectable_label(self.ui_state.show_settings, "Settings")
                        .clicked()
                    {
                        self.ui_state.show_settings = !self.ui_state.show_settings;
                    }
                });
            });
        });

        // ── Blocking configuration notice ────────────────────
        if let Some(error) = self.ui_state.config_error.clone() {
            CentralPanel::default().show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    ui.heading(RichText::new("Configuration Required").color(theme::ERROR));
                    ui.add_space(8.0);
                    ui.label(RichText::new(&error).color(theme::TEXT_PRIMARY));
                    ui.add_space(16.0);
                });
                ui.vertical_centered(|ui| {
                    ui.set_max_width(400.0);
                    if let SettingsAction::SaveClicked = settings::settings_panel(
                        ui,
                        &mut self.config,
                        self.save_feedback.as_ref(),
                    ) {
                        self.apply_settings(ctx);
                    }
                });
            });
            return;
        }

        // ── Settings side panel ──────────────────────────────
        if self.ui_state.show_settings {
            SidePanel::right("settings_panel")
                .min_width(280.0)
                .max_width(350.0)
                .show(ctx, |ui| {
                    if let SettingsAction::SaveClicked = settings::settings_panel(
                        ui,
                        &mut self.config,
                        self.save_feedback.as_ref(),
                    ) {
                        self.apply_settings(ctx);
                    }
                });
        }

        // ── Session sidebar ──────────────────────────────────
        if self.ui_state.show_sidebar {
            SidePanel::left("sessions_panel")
                .min_width(180.0)
                .max_width(260.0)
                .show(ctx, |ui| {
                    let action = sidebar::sidebar_panel(ui, &mut self.ui_state);
                    if action != sidebar::SidebarAction::None {
                        self.dispatch_sidebar(action, ctx);
                    }
                });
        }

        // ── Chat ─────────────────────────────────────────────
        CentralPanel::default().show(ctx, |ui| {
            if self.controller.borrow().is_none() {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    ui.spinner();
                    ui.label(RichText::new("Starting up...").color(theme::TEXT_SECONDARY));
                });
                return;
            }
            if let Some(text) = chat::chat_panel(ui, &mut self.ui_state) {
                self.dispatch_send(text, ctx);
            }
        });
    }
}
