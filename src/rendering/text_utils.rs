//! Text rendering utilities
//!
//! Shared utilities for text measurement and truncation.

use eframe::egui;

const ELLIPSIS: &str = "..";

/// Horizontal padding inside a cell (4.0 on each side)
pub const CELL_PADDING: f32 = 8.0;

/// Truncates text to fit within a given width, adding ".." if truncated
///
/// # Arguments
/// * `text` - The text to potentially truncate
/// * `available_width` - Maximum width available for the text
/// * `font_id` - Font to use for measuring text
/// * `painter` - Painter for text measurement
pub fn truncate_text_to_fit(
    text: &str,
    available_width: f32,
    font_id: &egui::FontId,
    painter: &egui::Painter,
) -> String {
    truncate_with(text, available_width - CELL_PADDING, |candidate| {
        painter
            .layout_no_wrap(candidate.to_owned(), font_id.clone(), egui::Color32::WHITE)
            .size()
            .x
    })
}

/// Longest prefix of `text` that fits `max_width` under `measure`, with an
/// ellipsis appended when anything was cut.
pub fn truncate_with(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> String {
    if max_width <= 0.0 {
        return String::new();
    }
    if measure(text) <= max_width {
        return text.to_owned();
    }

    let available_for_text = max_width - measure(ELLIPSIS);
    if available_for_text <= 0.0 {
        return String::new();
    }

    // Binary search over the number of kept chars
    let chars: Vec<char> = text.chars().collect();
    let (mut low, mut high) = (0, chars.len());
    while low < high {
        let mid = (low + high + 1) / 2;
        let candidate: String = chars[..mid].iter().collect();
        if measure(&candidate) <= available_for_text {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    let mut result: String = chars[..low].iter().collect();
    result.push_str(ELLIPSIS);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    // Every char is 10 units wide
    fn fixed(text: &str) -> f32 {
        text.chars().count() as f32 * 10.0
    }

    #[test]
    fn test_fits_unchanged() {
        assert_eq!(truncate_with("abc", 30.0, fixed), "abc");
    }

    #[test]
    fn test_truncates_with_ellipsis() {
        assert_eq!(truncate_with("abcdefgh", 60.0, fixed), "abcd..");
    }

    #[test]
    fn test_too_narrow() {
        assert_eq!(truncate_with("abcdef", 15.0, fixed), "");
        assert_eq!(truncate_with("abcdef", -1.0, fixed), "");
    }

    #[test]
    fn test_multibyte_chars() {
        assert_eq!(truncate_with("ééééé", 40.0, fixed), "éé..");
    }
}
