use eframe::egui;
use parking_lot::Mutex;
use services::{FavoritesStore, FileStore};
use shared::favorites::tree;
use shared::settings::{AppSettings, ExecutionBackend};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

mod favorites;
mod modals;
mod state;
mod widgets;

use modals::Modal;
use state::AppState;

fn config_path() -> Option<std::path::PathBuf> {
    if let Some(proj) = directories::ProjectDirs::from("com.local", "TechSupport", "TechSupport") {
        let p = proj.config_dir().join("settings.json");
        let _ = fs::create_dir_all(proj.config_dir());
        Some(p)
    } else {
        None
    }
}

fn load_settings_or_default() -> AppSettings {
    let mut settings = config_path()
        .filter(|path| path.exists())
        .and_then(|path| match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<AppSettings>(&bytes) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!("Ignoring malformed {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        })
        .unwrap_or_default();
    settings.apply_env_overrides(|key| std::env::var(key).ok());
    settings
}

/// Save settings to disk
fn save_settings(settings: &AppSettings) {
    if let Some(path) = config_path() {
        match serde_json::to_vec_pretty(settings) {
            Ok(bytes) => {
                if let Err(e) = fs::write(&path, bytes) {
                    warn!("Failed to save settings: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize settings: {}", e),
        }
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings_or_default();
    let channel = agent_host::channel_for(&settings.execution);
    let store = FavoritesStore::new(Arc::new(FileStore::default_location()));
    let mut state = AppState::new(settings, store, channel);
    state.check_backend();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([720.0, 480.0]),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native(
        "TechSupport",
        options,
        Box::new(|_cc| {
            Box::new(TechSupportApp {
                state: Arc::new(Mutex::new(state)),
            })
        }),
    )
}

struct TechSupportApp {
    state: Arc<Mutex<AppState>>,
}

impl Drop for TechSupportApp {
    fn drop(&mut self) {
        self.state.lock().shutdown();
    }
}

impl eframe::App for TechSupportApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut guard = self.state.lock();
        let s = &mut *guard;

        // Poll for streamed output (non-blocking)
        s.poll_exec_events();
        let waiting = s.poll_background();
        if s.is_executing() || waiting {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        let dark = s.settings.dark_mode;
        let mut style = (*ctx.style()).clone();
        style.visuals = if dark {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        style.visuals.window_rounding = egui::Rounding::same(12.0);
        ctx.set_style(style);

        render_header(s, ctx);
        render_status_bar(s, ctx);

        if s.settings.show_favorites {
            egui::SidePanel::right("favorites")
                .resizable(true)
                .default_width(360.0)
                .min_width(260.0)
                .show(ctx, |ui| render_favorites_panel(s, ui, dark));
        }

        egui::CentralPanel::default().show(ctx, |ui| render_main_panel(s, ui, dark));

        if s.dialog.is_open() && s.dialog.update(ctx) {
            if let Some(draft) = s.dialog.take_result().take_value() {
                s.submit_draft(draft);
            }
        }
    }
}

fn render_header(s: &mut AppState, ctx: &egui::Context) {
    egui::TopBottomPanel::top("header").show(ctx, |ui| {
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new("TechSupport").size(22.0));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let theme = if s.settings.dark_mode { "☀" } else { "🌙" };
                if ui.button(theme).on_hover_text("Toggle theme").clicked() {
                    s.settings.dark_mode = !s.settings.dark_mode;
                    save_settings(&s.settings);
                }
                let label = if s.settings.show_favorites {
                    "⭐ Hide favorites"
                } else {
                    "⭐ Favorites"
                };
                if ui.button(label).clicked() {
                    s.settings.show_favorites = !s.settings.show_favorites;
                    save_settings(&s.settings);
                }
            });
        });
        ui.add_space(6.0);
    });
}

fn render_status_bar(s: &mut AppState, ctx: &egui::Context) {
    egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
        ui.horizontal(|ui| {
            let backend = match s.settings.execution.backend {
                ExecutionBackend::Local => "Running commands on this machine".to_string(),
                ExecutionBackend::Remote => {
                    format!("Running commands via {}", s.settings.execution.server_url)
                }
            };
            ui.label(egui::RichText::new(backend).small().weak());
            let (dot, color, hint) = match s.backend_online {
                Some(true) => ("●", egui::Color32::from_rgb(90, 180, 90), "Ready"),
                Some(false) => ("●", egui::Color32::from_rgb(220, 80, 80), "Unreachable"),
                None => ("○", egui::Color32::GRAY, "Checking…"),
            };
            if ui
                .add(
                    egui::Label::new(egui::RichText::new(dot).small().color(color))
                        .sense(egui::Sense::click()),
                )
                .on_hover_text(format!("{} (click to check again)", hint))
                .clicked()
            {
                s.check_backend();
            }
            if let Some(status) = &s.status {
                ui.separator();
                ui.label(egui::RichText::new(status).small());
            }
        });
    });
}

fn render_favorites_panel(s: &mut AppState, ui: &mut egui::Ui, dark: bool) {
    ui.add_space(8.0);
    ui.horizontal(|ui| {
        ui.heading("⭐ Favorites");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("📁+").on_hover_text("New folder").clicked() {
                s.apply_action(favorites::FavoriteAction::AddFolder { parent: None });
            }
            if ui.button("+").on_hover_text("Add command").clicked() {
                s.apply_action(favorites::FavoriteAction::OpenAddCommand { parent: None });
            }
        });
    });
    ui.horizontal(|ui| {
        if ui.small_button("⬇ Import").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .set_title("Import favorites")
                .add_filter("JSON", &["json"])
                .pick_file()
            {
                s.import_favorites(&path);
            }
        }
        if ui.small_button("⬆ Export").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .set_title("Export favorites")
                .set_file_name("favorites.json")
                .add_filter("JSON", &["json"])
                .save_file()
            {
                s.export_favorites(&path);
            }
        }
        ui.label(
            egui::RichText::new(format!("{} items", tree::count(&s.favorites)))
                .small()
                .weak(),
        );
    });
    ui.separator();

    let executing = s.executing_id().map(str::to_owned);
    let actions = egui::ScrollArea::vertical()
        .id_source("favorites-tree")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            favorites::show_tree(
                ui,
                &s.favorites,
                executing.as_deref(),
                &mut s.rename,
                dark,
            )
        })
        .inner;
    for action in actions {
        s.apply_action(action);
    }
}

fn render_main_panel(s: &mut AppState, ui: &mut egui::Ui, dark: bool) {
    ui.add_space(8.0);
    ui.heading("Working directory");
    ui.horizontal(|ui| {
        let shown = s
            .settings
            .working_dir
            .clone()
            .unwrap_or_else(|| "(current directory)".to_string());
        ui.label(egui::RichText::new(shown).monospace());
        if ui.button("📂 Choose…").clicked() {
            let mut dialog = rfd::FileDialog::new().set_title("Working directory for commands");
            if let Some(dir) = s.working_dir() {
                dialog = dialog.set_directory(dir);
            }
            if let Some(path) = dialog.pick_folder() {
                s.settings.working_dir = Some(path.to_string_lossy().to_string());
                save_settings(&s.settings);
            }
        }
        if s.settings.working_dir.is_some() && ui.button("Reset").clicked() {
            s.settings.working_dir = None;
            save_settings(&s.settings);
        }
    });

    ui.add_space(12.0);
    ui.heading("Run commands on");
    render_backend_settings(s, ui);

    ui.add_space(16.0);
    ui.heading("Save a command");
    egui::Grid::new("quick-add").num_columns(2).show(ui, |ui| {
        ui.label("Command:");
        ui.add(
            egui::TextEdit::singleline(&mut s.quick_command)
                .code_editor()
                .desired_width(360.0)
                .hint_text("e.g. df -h"),
        );
        ui.end_row();
        ui.label("Label:");
        let label = ui.add(
            egui::TextEdit::singleline(&mut s.quick_label)
                .desired_width(360.0)
                .hint_text("Optional"),
        );
        ui.end_row();
        if label.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            s.submit_quick_add();
        }
    });
    ui.horizontal(|ui| {
        let has_command = !s.quick_command.trim().is_empty();
        if ui
            .add_enabled(has_command, egui::Button::new("⭐ Add to favorites"))
            .clicked()
        {
            s.submit_quick_add();
        }
        if ui
            .add_enabled(has_command && !s.is_trying(), egui::Button::new("▶ Try it"))
            .on_hover_text("Run once without saving")
            .clicked()
        {
            s.try_quick_command();
        }
        if s.is_trying() {
            ui.add(egui::Spinner::new());
        }
    });
    let trial_output = s.trial.as_ref().map(|result| match result {
        Ok(outcome) => outcome.output.clone(),
        Err(e) => format!("Error: {}", e),
    });
    if let Some(output) = trial_output {
        let command = s.quick_command.clone();
        ui.push_id("trial", |ui| render_command_output(ui, dark, &command, &output));
        if ui.small_button("Dismiss").clicked() {
            s.trial = None;
        }
    }

    let running = s
        .executing_id()
        .and_then(|id| tree::find(&s.favorites, id))
        .and_then(|item| item.as_command())
        .map(|cmd| (cmd.command.clone(), cmd.output.clone().unwrap_or_default()));
    if let Some((command, output)) = running {
        ui.add_space(16.0);
        ui.horizontal(|ui| {
            ui.heading("Running");
            ui.add(egui::Spinner::new());
        });
        render_command_output(ui, dark, &command, &output);
        if ui.button("⏹ Stop").clicked() {
            s.cancel_execution("Stopped by user");
        }
    }
}

fn render_backend_settings(s: &mut AppState, ui: &mut egui::Ui) {
    let before = s.settings.execution.clone();
    ui.horizontal(|ui| {
        ui.radio_value(
            &mut s.settings.execution.backend,
            ExecutionBackend::Local,
            "This machine",
        );
        ui.radio_value(
            &mut s.settings.execution.backend,
            ExecutionBackend::Remote,
            "Command server",
        );
        if s.settings.execution.backend == ExecutionBackend::Remote {
            ui.add(
                egui::TextEdit::singleline(&mut s.settings.execution.server_url)
                    .desired_width(220.0)
                    .hint_text("http://localhost:8509"),
            );
        }
    });

    let changed = before.backend != s.settings.execution.backend
        || before.server_url != s.settings.execution.server_url;
    if changed {
        s.set_channel(agent_host::channel_for(&s.settings.execution));
        save_settings(&s.settings);
    }
}

/// Render command output in the main panel
fn render_command_output(ui: &mut egui::Ui, dark: bool, cmd: &str, output: &str) {
    let bg_color = if dark {
        egui::Color32::from_rgb(20, 20, 25)
    } else {
        egui::Color32::from_rgb(245, 245, 250)
    };
    let text_color = if dark {
        egui::Color32::from_rgb(200, 220, 200)
    } else {
        egui::Color32::from_rgb(40, 60, 40)
    };

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        ui.label(
            egui::RichText::new("$")
                .size(14.0)
                .color(egui::Color32::from_rgb(100, 200, 100))
                .strong(),
        );
        ui.label(egui::RichText::new(cmd).size(13.0).color(text_color).monospace());
    });
    ui.add_space(8.0);

    egui::Frame::none()
        .fill(bg_color)
        .rounding(egui::Rounding::same(6.0))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            egui::ScrollArea::both()
                .id_source("running-output")
                .max_height((ui.available_height() - 60.0).max(120.0))
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    ui.label(
                        egui::RichText::new(output)
                            .size(12.0)
                            .color(text_color)
                            .monospace(),
                    );
                });
        });
}
