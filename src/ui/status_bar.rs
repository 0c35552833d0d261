//! Status bar UI rendering
//!
//! Memory usage plus counters of the active page.

use eframe::egui;
use egui::RichText;

use crate::app::AppState;
use crate::utils::{format_count, format_memory_mb, get_current_memory_mb};

/// Renders the status panel at the bottom of the window
pub fn render_status_bar(ui: &mut egui::Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        // Always show memory usage first
        let memory_text = format_memory_mb(get_current_memory_mb());
        ui.label(RichText::new(&memory_text).strong());

        let Some(page) = state.active_page_mut() else {
            ui.label(RichText::new("| No pages configured").strong());
            return;
        };

        ui.label(RichText::new("|").strong());
        let roots = page.session.forest().roots().len();
        let rows = page.rows().len();
        ui.label(
            RichText::new(format!(
                "{} | Roots: {} of {} | Rows: {}",
                page.config.collection.label(),
                format_count(roots as u64),
                format_count(page.session.total()),
                format_count(rows as u64),
            ))
            .strong(),
        )
        .on_hover_text(format!(
            "Row rebuilds: {} | Cached cells: {} nodes",
            page.row_cache.rebuild_seq,
            page.row_cache.cached_cell_keys()
        ));

        let loading = page.loading_count();
        if loading > 0 || page.session.is_searching() {
            ui.label(RichText::new("|").strong());
            ui.spinner();
            let text = if page.session.is_searching() {
                "Searching".to_owned()
            } else {
                format!("Loading {loading} branch(es)")
            };
            ui.label(RichText::new(text).color(egui::Color32::YELLOW));
        }
    });
}
