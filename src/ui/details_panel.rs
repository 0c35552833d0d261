//! Details panel UI rendering
//!
//! Shows every attribute of the selected node, sorted by name.

use eframe::egui;
use egui::{Color32, RichText, ScrollArea};

use crate::state::PageState;
use crate::utils::format_value;

/// Renders the details of the selected node of `page`
///
/// # Arguments
/// * `ui` - The egui UI context for drawing
/// * `page` - Page whose selection is shown
pub fn render_details_panel(ui: &mut egui::Ui, page: &PageState) {
    let Some(node) = page.selected_node() else {
        ui.colored_label(Color32::GRAY, "Select a row to see its details");
        return;
    };

    ui.label(RichText::new(format!("Details for {}", node.key())).strong());
    ui.separator();

    let key_color = ui.visuals().hyperlink_color;
    let available_height = ui.available_height();

    ScrollArea::vertical()
        .id_salt(("details_scroll_area", page.id().to_owned()))
        .max_height(available_height)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            egui::Grid::new("details_grid")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    ui.colored_label(key_color, "id");
                    ui.label(node.key());
                    ui.end_row();

                    if let Some(parent) = node.parent_key() {
                        ui.colored_label(key_color, "parent");
                        ui.label(parent);
                        ui.end_row();
                    }

                    let mut attrs: Vec<_> = node.payload().iter().collect();
                    attrs.sort_by(|a, b| a.0.cmp(b.0));
                    for (name, value) in attrs {
                        ui.colored_label(key_color, name);
                        ui.label(format_value(value));
                        ui.end_row();
                    }
                });

            if node.payload().is_empty() {
                ui.colored_label(Color32::GRAY, "(no data)");
            }
        });
}
