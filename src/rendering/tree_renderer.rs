//! Tree row rendering logic
//!
//! Handles the visual rendering of individual rows in the hierarchical table.
//! Uses egui's painter API for custom drawing with column layout support.

use eframe::egui;
use rpanel::{Affordance, ColumnSpec, RecordKey, VisibleRow};

use crate::rendering::text_utils::truncate_text_to_fit;
use crate::ui::virtual_scrolling::{INDENT_WIDTH, ROW_HEIGHT};

/// Result of user interaction with a tree row
pub enum TreeNodeInteraction {
    /// Row was clicked to select it
    Selected { key: RecordKey },
    /// Expand/collapse button was clicked
    ExpandToggled { key: RecordKey, will_expand: bool },
}

/// Renders a single tree row with expand/collapse control and column cells
///
/// # Arguments
/// * `ui` - The egui UI context for drawing
/// * `row` - The flattened row to draw
/// * `expand_width` - Width reserved for branch lines and the expand control
/// * `columns` - Visible columns with their current widths
/// * `cells` - Display text for each visible column, in the same order
/// * `selected_key` - Currently selected node key (if any)
pub fn render_tree_row(
    ui: &mut egui::Ui,
    row: &VisibleRow,
    expand_width: f32,
    columns: &[(&ColumnSpec, f32)],
    cells: &[String],
    selected_key: Option<&str>,
) -> Option<TreeNodeInteraction> {
    let key = row.key();
    let start_pos = ui.cursor().min;

    let (row_rect, row_response) = ui.allocate_exact_size(
        egui::vec2(ui.available_width(), ROW_HEIGHT),
        egui::Sense::click(),
    );

    let mut interaction = None;
    if row_response.clicked() {
        interaction = Some(TreeNodeInteraction::Selected { key: key.to_owned() });
    }

    if selected_key == Some(key) {
        ui.painter().rect_filled(row_rect, 0.0, ui.visuals().selection.bg_fill);
    } else if row_response.hovered() {
        ui.painter().rect_filled(row_rect, 0.0, ui.visuals().widgets.hovered.weak_bg_fill);
    }

    draw_branch_lines(ui, start_pos, row);

    // Expand control sits right after the indent
    let button_rect = egui::Rect::from_center_size(
        egui::pos2(
            start_pos.x + row.depth as f32 * INDENT_WIDTH + INDENT_WIDTH / 2.0,
            start_pos.y + ROW_HEIGHT / 2.0,
        ),
        egui::vec2(16.0, 16.0),
    );
    match row.affordance {
        Affordance::Leaf => {}
        Affordance::Loading => {
            egui::Spinner::new().size(12.0).paint_at(ui, button_rect);
        }
        Affordance::Collapsed | Affordance::Expanded => {
            let is_expanded = row.affordance == Affordance::Expanded;
            let button_id = ui.id().with(("expand", key));
            let button_response = ui.interact(button_rect, button_id, egui::Sense::click());
            if button_response.clicked() {
                interaction = Some(TreeNodeInteraction::ExpandToggled {
                    key: key.to_owned(),
                    will_expand: !is_expanded,
                });
            }
            ui.painter().text(
                button_rect.center(),
                egui::Align2::CENTER_CENTER,
                if is_expanded { "▼" } else { "▶" },
                egui::FontId::proportional(12.0),
                ui.visuals().text_color(),
            );
        }
    }

    let font_id = egui::FontId::proportional(13.0);
    let painter = ui.painter();
    let text_color = ui.visuals().text_color();
    let mut x_offset = expand_width;

    for ((_, width), text) in columns.iter().zip(cells) {
        let cell_rect = egui::Rect::from_min_size(
            egui::pos2(start_pos.x + x_offset, start_pos.y),
            egui::vec2(*width, ROW_HEIGHT),
        );
        let truncated = truncate_text_to_fit(text, *width, &font_id, painter);
        painter.text(
            cell_rect.left_center() + egui::vec2(4.0, 0.0),
            egui::Align2::LEFT_CENTER,
            &truncated,
            font_id.clone(),
            text_color,
        );
        x_offset += width;
    }

    interaction
}

/// Draws the │ continuation lines of ancestors and the └/├ connector of this row.
fn draw_branch_lines(ui: &egui::Ui, start_pos: egui::Pos2, row: &VisibleRow) {
    let stroke = egui::Stroke::new(1.0, ui.visuals().text_color().gamma_multiply(0.5));
    let painter = ui.painter();

    // Level 0 is the roots' own context and has no line.
    for (level, &has_continuation) in row.branch_context.iter().enumerate().skip(1) {
        if has_continuation {
            let x = start_pos.x + (level - 1) as f32 * INDENT_WIDTH + INDENT_WIDTH / 2.0;
            painter.line_segment(
                [egui::pos2(x, start_pos.y), egui::pos2(x, start_pos.y + ROW_HEIGHT)],
                stroke,
            );
        }
    }

    if row.depth > 0 {
        let x = start_pos.x + (row.depth - 1) as f32 * INDENT_WIDTH + INDENT_WIDTH / 2.0;
        let y = start_pos.y + ROW_HEIGHT / 2.0;
        let bottom = if row.is_last_child { y } else { start_pos.y + ROW_HEIGHT };
        painter.line_segment([egui::pos2(x, start_pos.y), egui::pos2(x, bottom)], stroke);
        painter.line_segment([egui::pos2(x, y), egui::pos2(x + INDENT_WIDTH / 2.0, y)], stroke);
    }
}
