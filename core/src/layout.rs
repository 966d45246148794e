//! Fixed certificate layout on a logical canvas.
//!
//! Pure: the same certificate and config always produce the same
//! element list. Rasterizing it is the render surface's job.

use crate::{certificate::Certificate, config::CertificateConfig};
use serde::Serialize;

const MARGIN: f32 = 16.0;
const FOOTER_INSET: f32 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    HeaderMark,
    Title,
    Subtitle,
    Caption,
    RecipientName,
    TierLine,
    CountPhrase,
    Icon,
    FooterDate,
    FooterId,
    Watermark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Center,
    Right,
}

/// One positioned text run. `(x, y)` is the anchor given by `align`,
/// measured from the canvas top-left.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutElement {
    pub kind: ElementKind,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub weight: u16,
    pub color: &'static str,
    pub align: Align,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificateLayout {
    pub width: u32,
    pub height: u32,
    pub background: &'static str,
    pub border: &'static str,
    pub elements: Vec<LayoutElement>,
}

/// Typography and anchor shared by a group of text runs.
#[derive(Clone, Copy)]
struct TextStyle {
    font_size: f32,
    weight: u16,
    color: &'static str,
    align: Align,
}

const fn style(font_size: f32, weight: u16, color: &'static str, align: Align) -> TextStyle {
    TextStyle { font_size, weight, color, align }
}

const MARK_LEFT: TextStyle = style(14.0, 500, "#333333", Align::Left);
const MARK_RIGHT: TextStyle = style(14.0, 500, "#333333", Align::Right);
const TITLE: TextStyle = style(44.0, 800, "#0277bd", Align::Center);
const SUBTITLE: TextStyle = style(16.0, 400, "#455a64", Align::Center);
const CAPTION: TextStyle = style(20.0, 400, "#607d8b", Align::Center);
const RECIPIENT: TextStyle = style(56.0, 700, "#263238", Align::Center);
const TIER_LINE: TextStyle = style(24.0, 400, "#37474f", Align::Center);
const BODY: TextStyle = style(16.0, 400, "#546e7a", Align::Center);
const ICON: TextStyle = style(72.0, 400, "#000000", Align::Center);
const FOOTER_LEFT: TextStyle = style(14.0, 400, "#546e7a", Align::Left);
const FOOTER_RIGHT: TextStyle = style(14.0, 400, "#546e7a", Align::Right);
const WATERMARK: TextStyle = style(64.0, 700, "#9e9e9e", Align::Center);

fn text(kind: ElementKind, text: String, x: f32, y: f32, style: TextStyle) -> LayoutElement {
    LayoutElement {
        kind,
        text,
        x,
        y,
        font_size: style.font_size,
        weight: style.weight,
        color: style.color,
        align: style.align,
        opacity: 1.0,
    }
}

impl CertificateLayout {
    pub fn build(cert: &Certificate, config: &CertificateConfig) -> Self {
        use ElementKind::*;

        let w = config.canvas_width as f32;
        let h = config.canvas_height as f32;
        let cx = w / 2.0;
        let footer_y = h - 24.0;

        let left = config.left_mark.clone();
        let right = config.right_mark.clone();
        let title = config.title.clone();
        let presented_by = config.presented_by.clone();
        let caption = "This certificate is proudly awarded to".to_string();
        let recipient = cert.recipient_name.clone();
        let tier_line = format!("For achieving the {} Badge", cert.tier.tier_name);
        let icon = cert.tier.icon.clone();
        let date = format!("Date: {}", cert.display_date());
        let id = format!("Certificate ID: {}", cert.certificate_id);

        let mut elements = vec![
            text(HeaderMark, left.clone(), MARGIN, MARGIN, MARK_LEFT),
            text(HeaderMark, right, w - MARGIN, MARGIN, MARK_RIGHT),
            text(Title, title, cx, 96.0, TITLE),
            text(Subtitle, presented_by, cx, 150.0, SUBTITLE),
            text(Caption, caption, cx, 214.0, CAPTION),
            text(RecipientName, recipient, cx, 252.0, RECIPIENT),
            text(TierLine, tier_line, cx, 340.0, TIER_LINE),
            text(CountPhrase, cert.count_phrase(), cx, 378.0, BODY),
            text(Icon, icon, cx, 420.0, ICON),
            text(FooterDate, date, FOOTER_INSET, footer_y, FOOTER_LEFT),
            text(FooterId, id, w - FOOTER_INSET, footer_y, FOOTER_RIGHT),
        ];

        let mut watermark = text(Watermark, left, cx, h / 2.0, WATERMARK);
        watermark.opacity = 0.06;
        elements.push(watermark);

        Self {
            width: config.canvas_width,
            height: config.canvas_height,
            background: "#ffffff",
            border: "#b3e5fc",
            elements,
        }
    }

    pub fn find(&self, kind: ElementKind) -> Option<&LayoutElement> {
        self.elements.iter().find(|e| e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::ThresholdDef;
    use chrono::{TimeZone, Utc};

    fn layout() -> CertificateLayout {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let cert = Certificate::new(
            &CertificateConfig::default(),
            "Asha",
            &ThresholdDef::new(50, "Diamond", "💎"),
            at,
        );
        CertificateLayout::build(&cert, &CertificateConfig::default())
    }

    #[test]
    fn carries_recipient_tier_and_id() {
        let l = layout();
        assert_eq!(l.find(ElementKind::RecipientName).unwrap().text, "Asha");
        assert_eq!(l.find(ElementKind::TierLine).unwrap().text, "For achieving the Diamond Badge");
        assert!(l.find(ElementKind::CountPhrase).unwrap().text.contains("50+ civic reports"));
        assert_eq!(l.find(ElementKind::Icon).unwrap().text, "💎");
        assert!(l.find(ElementKind::FooterId).unwrap().text.ends_with(&format!(
            "CCAI-DIAMOND-{}",
            Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap().timestamp_millis()
        )));
    }

    #[test]
    fn watermark_is_faint_and_everything_fits_the_canvas() {
        let l = layout();
        assert!(l.find(ElementKind::Watermark).unwrap().opacity < 0.1);
        for e in &l.elements {
            assert!(e.x >= 0.0 && e.x <= l.width as f32, "{:?} x out of canvas", e.kind);
            assert!(e.y >= 0.0 && e.y <= l.height as f32, "{:?} y out of canvas", e.kind);
        }
    }

    #[test]
    fn build_is_deterministic() {
        assert_eq!(layout(), layout());
    }
}
