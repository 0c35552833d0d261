//! Table header component rendering
//!
//! Draws the column headers of a page with drag handles for resizing, plus the
//! column chooser menu.

use eframe::egui;
use egui::Color32;
use rpanel::PanelEvent;

use crate::rendering::text_utils::truncate_text_to_fit;
use crate::state::{LayoutState, PageState};
use crate::ui::virtual_scrolling::HEADER_HEIGHT;

const HANDLE_WIDTH: f32 = 8.0;

/// Renders the resizable column headers of `page`.
///
/// Widths follow the drag live; the resize event is emitted once the drag
/// ends so the layout is persisted a single time.
///
/// # Arguments
/// * `ui` - The egui UI context for drawing
/// * `page` - Page whose column layout is shown
/// * `layout` - Layout state holding the width of the tree column
/// * `expand_width` - Width of the tree column, zero for flat tables
pub fn render_table_header(
    ui: &mut egui::Ui,
    page: &mut PageState,
    layout: &mut LayoutState,
    expand_width: f32,
) -> Option<PanelEvent> {
    let mut event = None;
    let start_pos = ui.cursor().min;

    // Reserve space for the entire header row
    ui.allocate_exact_size(
        egui::vec2(ui.available_width(), HEADER_HEIGHT),
        egui::Sense::hover(),
    );

    let font_id = egui::FontId::proportional(14.0);
    let header_color = ui.visuals().strong_text_color();
    let mut x_offset = 0.0;

    if expand_width > 0.0 {
        let label_rect = egui::Rect::from_min_size(start_pos, egui::vec2(expand_width, HEADER_HEIGHT));
        ui.painter().text(
            label_rect.left_center() + egui::vec2(4.0, 0.0),
            egui::Align2::LEFT_CENTER,
            "Tree",
            font_id.clone(),
            header_color,
        );
        x_offset += expand_width;

        let response = resize_handle(ui, start_pos, x_offset, "header_resize_expand");
        if response.dragged() {
            layout.set_expand_width(expand_width + response.drag_delta().x);
        }
    }

    for (spec, width) in page.visible_columns() {
        let label_rect = egui::Rect::from_min_size(
            egui::pos2(start_pos.x + x_offset, start_pos.y),
            egui::vec2(width, HEADER_HEIGHT),
        );
        let truncated_title = truncate_text_to_fit(&spec.title, width, &font_id, ui.painter());
        ui.painter().text(
            label_rect.left_center() + egui::vec2(4.0, 0.0),
            egui::Align2::LEFT_CENTER,
            &truncated_title,
            font_id.clone(),
            header_color,
        );
        x_offset += width;

        let response = resize_handle(ui, start_pos, x_offset, &spec.key);
        if response.dragged() {
            let new_width = spec.clamp(width + response.drag_delta().x);
            page.columns.set_width(&spec.key, new_width);
        }
        if response.drag_stopped() {
            event = Some(PanelEvent::ColumnResize {
                column_key: spec.key.clone(),
                width: page.columns.width(&spec.key).unwrap_or(width),
            });
        }
    }

    event
}

/// Drag handle on the right edge of a column.
fn resize_handle(ui: &egui::Ui, start_pos: egui::Pos2, x: f32, salt: &str) -> egui::Response {
    let handle_rect = egui::Rect::from_center_size(
        egui::pos2(start_pos.x + x, start_pos.y + HEADER_HEIGHT / 2.0),
        egui::vec2(HANDLE_WIDTH, HEADER_HEIGHT),
    );
    let handle_id = ui.id().with(("header_resize", salt));
    let response = ui.interact(handle_rect, handle_id, egui::Sense::drag());

    let color = if response.hovered() || response.dragged() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
        Color32::from_rgb(100, 150, 255)
    } else {
        ui.visuals().widgets.noninteractive.bg_stroke.color.gamma_multiply(0.5)
    };
    ui.painter().rect_filled(handle_rect.shrink(2.0), 0.0, color);
    response
}

/// "Columns" menu with one checkbox per column and a reset entry.
pub fn render_column_menu(ui: &mut egui::Ui, page: &PageState) -> Option<PanelEvent> {
    let mut event = None;
    ui.menu_button("Columns", |ui| {
        for spec in &page.config.table.columns {
            let mut visible = page.columns.is_visible(&spec.key);
            if ui.checkbox(&mut visible, &spec.title).changed() {
                event = Some(PanelEvent::ColumnVisibilityChange {
                    column_key: spec.key.clone(),
                    visible,
                });
            }
        }
        ui.separator();
        if ui.button("Reset layout").clicked() {
            event = Some(PanelEvent::ColumnReset);
        }
    });
    event
}
