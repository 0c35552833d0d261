//! Panel orchestration and layout management.
//!
//! Coordinates all UI panels (header, search, table, transfer, details,
//! status) and records the sizes the user gives them.

use std::path::PathBuf;

use rpanel::PanelEvent;

use crate::app::AppState;
use crate::ui::{details_panel, header, search_panel, status_bar, transfer_panel, tree_panel};

/// Result of panel interactions that need to be handled by the application coordinator.
pub enum PanelInteraction {
    /// A panel reported a user interaction
    Event(PanelEvent),
    /// User picked another page tab
    SwitchPage(usize),
    /// User chose a page configuration file
    ImportConfig(PathBuf),
    /// User asked to rerun the current search
    Refresh,
}

/// Manages the layout and rendering of all UI panels.
pub struct PanelManager;

impl PanelManager {
    /// Renders all panels in the application window.
    ///
    /// This is the main entry point for rendering the entire UI, called from
    /// the eframe::App::update() implementation.
    pub fn render_all_panels(ctx: &egui::Context, state: &mut AppState) -> Option<PanelInteraction> {
        let mut interaction: Option<PanelInteraction> = None;

        // Header panel at the top
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            if let Some(header_interaction) = header::render_header(ui, state) {
                interaction = Some(match header_interaction {
                    header::HeaderInteraction::PageSelected(index) => PanelInteraction::SwitchPage(index),
                    header::HeaderInteraction::ImportConfigRequested(path) => {
                        PanelInteraction::ImportConfig(path)
                    }
                    header::HeaderInteraction::RefreshRequested => PanelInteraction::Refresh,
                });
            }
        });

        // Status panel at the very bottom
        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            status_bar::render_status_bar(ui, state);
        });

        let total_height = ctx.content_rect().height();
        let total_width = ctx.content_rect().width();
        let index = state.active_index();
        let layout = &mut state.layout;
        let Some(page) = state.pages.get_mut(index) else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.label("No pages configured");
            });
            return interaction;
        };

        // Details panel above status panel
        let details = egui::TopBottomPanel::bottom("details_panel")
            .default_height(total_height * (1.0 - layout.split_ratio()))
            .resizable(true)
            .show(ctx, |ui| {
                egui::Frame::default().inner_margin(4.0).show(ui, |ui| {
                    details_panel::render_details_panel(ui, page);
                });
            });
        layout.set_split_from_heights(details.response.rect.height(), total_height);

        // Right panel: assignments of the selected node
        if page.config.transfer.is_some() {
            let transfer_frame = egui::Frame::default()
                .inner_margin(egui::Margin::same(4))
                .fill(ctx.style().visuals.panel_fill);

            let transfer = egui::SidePanel::right("transfer_panel")
                .default_width(layout.transfer_width().min(total_width * 0.5))
                .resizable(true)
                .frame(transfer_frame)
                .show(ctx, |ui| transfer_panel::render_transfer_panel(ui, page));
            layout.set_transfer_width(transfer.response.rect.width());
            if let Some(event) = transfer.inner {
                interaction = Some(PanelInteraction::Event(event));
            }
        }

        // Central panel: search form and records
        let table_frame = egui::Frame::default()
            .inner_margin(egui::Margin::same(4))
            .fill(ctx.style().visuals.panel_fill);

        egui::CentralPanel::default().frame(table_frame).show(ctx, |ui| {
            if let Some(event) = search_panel::render_search_panel(ui, page) {
                interaction = Some(PanelInteraction::Event(event));
            }
            ui.separator();
            if let Some(event) = tree_panel::render_tree_panel(ui, page, layout) {
                interaction = Some(PanelInteraction::Event(event));
            }
        });

        interaction
    }
}
