//! Tree panel UI rendering
//!
//! Shows the forest of the active page as a table with an optional tree
//! column. Only the rows inside the scroll viewport are laid out.

use egui::ScrollArea;
use rpanel::{ColumnSpec, PanelEvent};

use crate::rendering::tree_renderer::{self, TreeNodeInteraction};
use crate::state::{LayoutState, PageState};
use crate::ui::table_header;
use crate::ui::virtual_scrolling::ROW_HEIGHT;

/// Renders the table header, the visible rows and the pagination footer.
pub fn render_tree_panel(
    ui: &mut egui::Ui,
    page: &mut PageState,
    layout: &mut LayoutState,
) -> Option<PanelEvent> {
    let mut event = None;

    ui.horizontal(|ui| {
        ui.heading(&page.config.title);
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if let Some(menu_event) = table_header::render_column_menu(ui, page) {
                event = Some(menu_event);
            }
        });
    });
    ui.separator();

    if page.session.forest().is_empty() {
        if page.session.is_searching() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading…");
            });
        } else {
            ui.label("No records match the current search");
        }
        return event;
    }

    let expand_width = if page.is_tree() { layout.expand_width() } else { 0.0 };
    if let Some(header_event) = table_header::render_table_header(ui, page, layout, expand_width) {
        event = Some(header_event);
    }
    ui.separator();

    // Header may have been resized this frame
    let expand_width = if page.is_tree() { layout.expand_width() } else { 0.0 };
    let columns = page.visible_columns();
    let column_refs: Vec<(&ColumnSpec, f32)> = columns.iter().map(|(spec, width)| (spec, *width)).collect();
    let rows = page.rows();
    let footer_height = ui.spacing().interact_size.y + 8.0;

    ScrollArea::vertical()
        .id_salt(("tree_scroll_area", page.id().to_owned()))
        .max_height((ui.available_height() - footer_height).max(ROW_HEIGHT))
        .auto_shrink([false, false])
        .show_rows(ui, ROW_HEIGHT, rows.len(), |ui, row_range| {
            for row in &rows[row_range] {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|(spec, _)| page.row_cache.cell(&row.node, &spec.key))
                    .collect();
                let interaction = tree_renderer::render_tree_row(
                    ui,
                    row,
                    expand_width,
                    &column_refs,
                    &cells,
                    page.selection.selected_key(),
                );
                match interaction {
                    Some(TreeNodeInteraction::Selected { key }) => {
                        event = Some(PanelEvent::NodeSelect { key });
                    }
                    Some(TreeNodeInteraction::ExpandToggled { key, will_expand }) => {
                        event = Some(PanelEvent::ExpandToggle { key, will_expand });
                    }
                    None => {}
                }
            }
        });

    ui.separator();
    if let Some(page_event) = render_pagination(ui, page) {
        event = Some(page_event);
    }

    event
}

/// Previous/next controls for the root page.
fn render_pagination(ui: &mut egui::Ui, page: &PageState) -> Option<PanelEvent> {
    let mut event = None;
    let request = page.session.page();
    let page_count = request.page_count(page.session.total());
    let searching = page.session.is_searching();

    ui.horizontal(|ui| {
        let can_go_back = request.index > 0 && !searching;
        if ui.add_enabled(can_go_back, egui::Button::new("◀ Prev")).clicked() {
            event = Some(PanelEvent::PageChange { index: request.index - 1 });
        }
        ui.label(format!("Page {} of {}", request.index + 1, page_count));
        let can_go_forward = request.index + 1 < page_count && !searching;
        if ui.add_enabled(can_go_forward, egui::Button::new("Next ▶")).clicked() {
            event = Some(PanelEvent::PageChange { index: request.index + 1 });
        }
        if searching {
            ui.spinner();
        }
    });

    event
}
