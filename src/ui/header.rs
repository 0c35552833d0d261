//! Header panel UI rendering
//!
//! Page tabs, configuration import and the appearance toggle.

use eframe::egui;
use egui::Color32;
use std::path::PathBuf;

use crate::app::AppState;

/// Result of user interaction with the header panel
pub enum HeaderInteraction {
    /// User picked another page tab
    PageSelected(usize),
    /// User chose a page configuration file
    ImportConfigRequested(PathBuf),
    /// User asked to reload the current page
    RefreshRequested,
}

/// Renders the application header
///
/// # Returns
/// * `Option<HeaderInteraction>` - User interaction result
pub fn render_header(ui: &mut egui::Ui, state: &mut AppState) -> Option<HeaderInteraction> {
    let mut interaction = None;

    ui.horizontal(|ui| {
        ui.strong(&state.config.title);
        ui.separator();

        let active = state.active_index();
        for (index, page) in state.pages.iter().enumerate() {
            let mut label = page.config.title.clone();
            if page.session.is_searching() || page.loading_count() > 0 {
                label.push_str(" …");
            }
            if ui.selectable_label(index == active, label).clicked() && index != active {
                interaction = Some(HeaderInteraction::PageSelected(index));
            }
        }

        ui.separator();

        if ui.button("⟳ Refresh").clicked() {
            interaction = Some(HeaderInteraction::RefreshRequested);
        }

        if ui.button("📁 Import Config").clicked() {
            let mut dialog = rfd::FileDialog::new().add_filter("Panel configuration", &["json"]);

            if let Ok(cwd) = std::env::current_dir() {
                dialog = dialog.set_directory(cwd);
            }

            if let Some(path) = dialog.pick_file() {
                interaction = Some(HeaderInteraction::ImportConfigRequested(path));
            }
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.checkbox(&mut state.dark_mode, "Dark mode").changed() {
                ui.ctx().request_repaint();
            }
        });
    });

    if let Some(err) = &state.error_message {
        ui.colored_label(Color32::RED, err);
    }

    interaction
}
