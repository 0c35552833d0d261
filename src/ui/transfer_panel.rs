//! Transfer panel UI rendering
//!
//! Two filterable lists for editing the assignments of the selected node.
//! Items are marked by clicking and moved with the arrow buttons.

use eframe::egui;
use egui::{RichText, ScrollArea};
use rpanel::{PanelEvent, Side};

use crate::state::{PageState, TransferState};

/// Renders the transfer panel of `page`, if one is open.
pub fn render_transfer_panel(ui: &mut egui::Ui, page: &mut PageState) -> Option<PanelEvent> {
    let config = page.config.transfer.clone()?;
    ui.heading(&config.title);
    ui.separator();

    let Some(transfer) = page.transfer.as_mut() else {
        ui.label("Select a row to edit its assignments");
        return None;
    };
    ui.label(RichText::new(format!("Editing {}", transfer.owner)).strong());

    let list_height = ((ui.available_height() - 80.0) / 2.0).max(80.0);
    let mut event = None;

    render_list(ui, transfer, Side::Source, &config.source_title, list_height);

    ui.horizontal(|ui| {
        let to_target = transfer.list.marked_count(Side::Source) > 0;
        if ui.add_enabled(to_target, egui::Button::new("▼ Assign")).clicked() {
            let keys = transfer.list.move_marked(Side::Target);
            event = Some(PanelEvent::TransferMove { keys, to_target: true });
        }
        let to_source = transfer.list.marked_count(Side::Target) > 0;
        if ui.add_enabled(to_source, egui::Button::new("▲ Remove")).clicked() {
            let keys = transfer.list.move_marked(Side::Source);
            event = Some(PanelEvent::TransferMove { keys, to_target: false });
        }
    });

    render_list(ui, transfer, Side::Target, &config.target_title, list_height);

    event
}

/// One side of the transfer: title with counts, search box and item list.
fn render_list(ui: &mut egui::Ui, transfer: &mut TransferState, side: Side, title: &str, height: f32) {
    let query = match side {
        Side::Source => &mut transfer.source_query,
        Side::Target => &mut transfer.target_query,
    };

    let total = transfer.list.items(side, "").count();
    ui.label(RichText::new(format!("{title} ({total})")).strong());
    ui.add(egui::TextEdit::singleline(query).hint_text("Filter…"));

    let mut clicked = None;
    ScrollArea::vertical()
        .id_salt(("transfer_list", side == Side::Source))
        .max_height(height)
        .auto_shrink([false, true])
        .show(ui, |ui| {
            for item in transfer.list.items(side, query) {
                let marked = transfer.list.is_marked(&item.key);
                if ui.selectable_label(marked, &item.label).clicked() {
                    clicked = Some(item.key.clone());
                }
            }
        });

    if let Some(key) = clicked {
        transfer.list.toggle_mark(&key);
    }
}
