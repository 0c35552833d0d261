//! Search form rendering
//!
//! One row of inputs built from the page's field list. Submitting turns the
//! form into a filter; empty fields are left out.

use eframe::egui;
use rpanel::panel_config::{FieldKind, FieldSpec, SearchForm};
use rpanel::PanelEvent;

use crate::state::PageState;

const FIELD_WIDTH: f32 = 140.0;

/// Renders the search form of `page`.
///
/// Returns a `SearchSubmit` event when the user presses Search, Reset, or
/// Enter inside a text field.
pub fn render_search_panel(ui: &mut egui::Ui, page: &mut PageState) -> Option<PanelEvent> {
    if page.config.search.fields.is_empty() {
        return None;
    }

    let mut submit = false;
    let fields = page.config.search.fields.clone();
    let page_id = page.id().to_owned();

    ui.horizontal_wrapped(|ui| {
        for spec in &fields {
            ui.label(&spec.label);
            submit |= render_field(ui, &page_id, spec, &mut page.search_form);
            ui.add_space(8.0);
        }

        if ui.button("🔍 Search").clicked() {
            submit = true;
        }
        if ui.button("Reset").clicked() {
            page.search_form.clear();
            submit = true;
        }
    });

    submit.then(|| PanelEvent::SearchSubmit {
        filter: page.search_form.to_filter(&page.config.search),
    })
}

/// Draws one field. Returns true when Enter was pressed inside it.
fn render_field(ui: &mut egui::Ui, page_id: &str, spec: &FieldSpec, form: &mut SearchForm) -> bool {
    match spec.kind {
        FieldKind::Input => {
            let response = ui.add(egui::TextEdit::singleline(form.value_mut(&spec.field)).desired_width(FIELD_WIDTH));
            entered(ui, &response)
        }
        FieldKind::Select => {
            let value = form.value_mut(&spec.field);
            let selected = spec
                .options
                .iter()
                .find(|option| option.value == *value)
                .map(|option| option.label.as_str())
                .unwrap_or("Any");
            egui::ComboBox::from_id_salt((page_id, &spec.field))
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    ui.selectable_value(value, String::new(), "Any");
                    for option in &spec.options {
                        ui.selectable_value(value, option.value.clone(), &option.label);
                    }
                });
            false
        }
        FieldKind::DateRange => {
            let (from, to) = form.range_mut(&spec.field);
            let from_response = ui.add(
                egui::TextEdit::singleline(from)
                    .hint_text("YYYY-MM-DD")
                    .desired_width(FIELD_WIDTH / 1.5),
            );
            ui.label("–");
            let to_response = ui.add(
                egui::TextEdit::singleline(to)
                    .hint_text("YYYY-MM-DD")
                    .desired_width(FIELD_WIDTH / 1.5),
            );
            entered(ui, &from_response) || entered(ui, &to_response)
        }
    }
}

fn entered(ui: &egui::Ui, response: &egui::Response) -> bool {
    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter))
}
