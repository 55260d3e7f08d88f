use crate::upload::DocumentKind;
use egui::Color32;

pub const ACCENT_HEX: &str = "#a159e1";
pub const ERROR_HEX: &str = "#dc3232";
pub const SUCCESS_HEX: &str = "#00b400";
const NEUTRAL_HEX: &str = "#6b7280";

pub trait ColorExt {
    fn from_hex(hex: &str) -> Option<Self>
    where
        Self: Sized;

    /// Like `from_hex`, but falls back to grey for malformed input.
    fn from_hex_or_grey(hex: &str) -> Self
    where
        Self: Sized;
}

impl ColorExt for Color32 {
    fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

        Some(Color32::from_rgb(r, g, b))
    }

    fn from_hex_or_grey(hex: &str) -> Self {
        Self::from_hex(hex).unwrap_or(Color32::GRAY)
    }
}

/// Icon tint for a queued document.
pub fn file_icon_color(kind: Option<DocumentKind>) -> Color32 {
    let hex = match kind {
        Some(DocumentKind::Pdf) => "#ef4444",
        Some(DocumentKind::Docx) => "#3b82f6",
        Some(DocumentKind::Pptx) => "#f97316",
        None => NEUTRAL_HEX,
    };
    Color32::from_hex_or_grey(hex)
}
