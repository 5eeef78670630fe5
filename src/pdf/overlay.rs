//! Overlay page building
//!
//! An [`OverlayLayer`] is an in-memory list of content operations (text runs,
//! "X" marks, grid strokes, signature images) for one z-tier of one page. A
//! [`PageOverlay`] pairs the two tiers a page can carry. Coordinates are PDF
//! points with the origin at the bottom-left.
//!
//! Text is drawn literally at its position; there is no auto-fit.

use super::signature::{prepare_signature, SignatureImage};
use crate::fields::SignaturePayload;
use crate::warning::{Warning, Warnings};
use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

/// Placeholder drawn when a signature image cannot be embedded
pub const SIGNATURE_FALLBACK_TEXT: &str = "[Signature processing failed]";

/// Which side of the template content a layer is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// Underneath the template, so printed rules stay visible over it
    Behind,
    /// Above the template
    Front,
}

impl Layer {
    fn tag(self) -> &'static str {
        match self {
            Layer::Behind => "B",
            Layer::Front => "F",
        }
    }
}

/// The base-14 fonts used by overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    TimesRoman,
}

impl StandardFont {
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::TimesRoman => "Times-Roman",
        }
    }

    /// Name the font is registered under in page resources
    pub fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "OvF1",
            StandardFont::HelveticaBold => "OvF2",
            StandardFont::TimesRoman => "OvF3",
        }
    }
}

/// Where a signature goes and where its placeholder goes if it fails
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureBox {
    pub x: f32,
    pub y: f32,
    pub max_width: f32,
    pub max_height: f32,
    pub fallback_x: f32,
    pub fallback_y: f32,
}

/// Map a char to its WinAnsiEncoding byte.
fn win_ansi(c: char) -> Option<u8> {
    let code = match c {
        '\u{20}'..='\u{7E}' => c as u32,
        '\u{A0}'..='\u{FF}' => c as u32,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    u8::try_from(code).ok()
}

/// Encode text for a WinAnsi font. Returns the bytes and how many
/// characters had to be replaced with `?`.
pub fn encode_win_ansi(text: &str) -> (Vec<u8>, usize) {
    let mut replaced = 0;
    let bytes = text
        .chars()
        .map(|c| {
            win_ansi(c).unwrap_or_else(|| {
                replaced += 1;
                b'?'
            })
        })
        .collect();
    (bytes, replaced)
}

/// Operations, fonts and images for one z-tier of one page
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    page: usize,
    layer: Layer,
    font: StandardFont,
    size: f32,
    operations: Vec<Operation>,
    fonts: Vec<StandardFont>,
    images: Vec<(String, SignatureImage)>,
    warnings: Warnings,
}

impl OverlayLayer {
    pub fn new(layer: Layer, font: StandardFont, size: f32) -> Self {
        Self {
            page: 0,
            layer,
            font,
            size,
            operations: Vec::new(),
            fonts: Vec::new(),
            images: Vec::new(),
            warnings: Warnings::new(),
        }
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn set_font(&mut self, font: StandardFont, size: f32) {
        self.font = font;
        self.size = size;
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Draw one text run at `(x, y)`. Empty text draws nothing.
    pub fn draw_text(&mut self, x: f32, y: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        let (bytes, replaced) = encode_win_ansi(text);
        if replaced > 0 {
            self.warnings.push(Warning::UnmappableText {
                location: format!("page {} at ({}, {})", self.page + 1, x, y),
                replaced,
            });
        }
        if !self.fonts.contains(&self.font) {
            self.fonts.push(self.font);
        }
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(self.font.resource_name().as_bytes().to_vec()),
                    self.size.into(),
                ],
            ),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::String(bytes, StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Draw a checkbox mark.
    pub fn draw_mark(&mut self, x: f32, y: f32) {
        self.draw_text(x, y, "X");
    }

    /// Draw a mark only when `selected`.
    pub fn draw_mark_if(&mut self, selected: bool, x: f32, y: f32) {
        if selected {
            self.draw_mark(x, y);
        }
    }

    /// Draw lines top-down starting at `y`, `leading` points apart.
    pub fn draw_lines<S: AsRef<str>>(&mut self, x: f32, y: f32, leading: f32, lines: &[S]) {
        for (i, line) in lines.iter().enumerate() {
            self.draw_text(x, y - leading * i as f32, line.as_ref());
        }
    }

    pub fn set_stroke_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.operations
            .push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
    }

    pub fn set_fill_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.operations
            .push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.operations.push(Operation::new("w", vec![width.into()]));
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.operations.extend([
            Operation::new("m", vec![x1.into(), y1.into()]),
            Operation::new("l", vec![x2.into(), y2.into()]),
            Operation::new("S", vec![]),
        ]);
    }

    /// Filled circle approximated by four Bézier arcs.
    pub fn filled_circle(&mut self, cx: f32, cy: f32, r: f32) {
        let k = 0.552_284_8 * r;
        let curve = |x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32| {
            Operation::new(
                "c",
                vec![
                    x1.into(),
                    y1.into(),
                    x2.into(),
                    y2.into(),
                    x3.into(),
                    y3.into(),
                ],
            )
        };
        self.operations.extend([
            Operation::new("m", vec![(cx + r).into(), cy.into()]),
            curve(cx + r, cy + k, cx + k, cy + r, cx, cy + r),
            curve(cx - k, cy + r, cx - r, cy + k, cx - r, cy),
            curve(cx - r, cy - k, cx - k, cy - r, cx, cy - r),
            curve(cx + k, cy - r, cx + r, cy - k, cx + r, cy),
            Operation::new("f", vec![]),
        ]);
    }

    /// Place a prepared image at `(x, y)`, one point per pixel.
    pub fn draw_image(&mut self, x: f32, y: f32, image: SignatureImage) {
        let name = format!("OvIm{}{}", self.layer.tag(), self.images.len() + 1);
        let (w, h) = (image.width() as f32, image.height() as f32);
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    w.into(),
                    0f32.into(),
                    0f32.into(),
                    h.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        self.images.push((name, image));
    }

    /// Draw a signature scaled into `target`, or the placeholder text if
    /// the payload cannot be decoded. No payload draws nothing.
    pub fn draw_signature(&mut self, payload: Option<&SignaturePayload>, target: SignatureBox) {
        let Some(payload) = payload else {
            return;
        };
        let prepared = payload
            .resolve()
            .and_then(|bytes| prepare_signature(&bytes, target.max_width, target.max_height));
        match prepared {
            Ok(image) => self.draw_image(target.x, target.y, image),
            Err(e) => {
                self.warnings.push(Warning::SignatureFallback {
                    reason: e.to_string(),
                });
                self.draw_text(target.fallback_x, target.fallback_y, SIGNATURE_FALLBACK_TEXT);
            }
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Every text run as `(x, y, text)`, in drawing order
    pub fn text_runs(&self) -> Vec<(f32, f32, String)> {
        let mut runs = Vec::new();
        let mut pos = (0.0, 0.0);
        for op in &self.operations {
            match op.operator.as_str() {
                "Td" => {
                    let coord = |i: usize| op.operands.get(i).and_then(|o| o.as_float().ok());
                    pos = (coord(0).unwrap_or(0.0), coord(1).unwrap_or(0.0));
                }
                "Tj" => {
                    if let Some(Ok(bytes)) = op.operands.first().map(Object::as_str) {
                        let text = bytes.iter().map(|b| char::from(*b)).collect();
                        runs.push((pos.0, pos.1, text));
                    }
                }
                _ => {}
            }
        }
        runs
    }

    pub fn fonts(&self) -> &[StandardFont] {
        &self.fonts
    }

    pub fn images(&self) -> &[(String, SignatureImage)] {
        &self.images
    }

    pub(crate) fn take_warnings(&mut self) -> Warnings {
        std::mem::take(&mut self.warnings)
    }
}

/// Overlay content for one destination page, split by z-tier
#[derive(Debug, Clone)]
pub struct PageOverlay {
    pub page: usize,
    behind: OverlayLayer,
    front: OverlayLayer,
}

impl PageOverlay {
    pub fn new(page: usize, font: StandardFont, size: f32) -> Self {
        let mut behind = OverlayLayer::new(Layer::Behind, font, size);
        let mut front = OverlayLayer::new(Layer::Front, font, size);
        behind.page = page;
        front.page = page;
        Self {
            page,
            behind,
            front,
        }
    }

    pub fn layer(&mut self, layer: Layer) -> &mut OverlayLayer {
        match layer {
            Layer::Behind => &mut self.behind,
            Layer::Front => &mut self.front,
        }
    }

    pub fn behind(&mut self) -> &mut OverlayLayer {
        &mut self.behind
    }

    pub fn front(&mut self) -> &mut OverlayLayer {
        &mut self.front
    }

    pub fn set_font(&mut self, font: StandardFont, size: f32) {
        self.behind.set_font(font, size);
        self.front.set_font(font, size);
    }

    pub fn is_empty(&self) -> bool {
        self.behind.is_empty() && self.front.is_empty()
    }

    pub fn into_layers(self) -> (OverlayLayer, OverlayLayer) {
        (self.behind, self.front)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Zoë"), (vec![b'Z', b'o', 0xEB], 0));
        assert_eq!(encode_win_ansi("• a"), (vec![0x95, b' ', b'a'], 0));
        assert_eq!(encode_win_ansi("日本"), (vec![b'?', b'?'], 2));
    }

    #[test]
    fn test_draw_text_ops() {
        let mut layer = OverlayLayer::new(Layer::Front, StandardFont::Helvetica, 12.0);
        layer.draw_text(25.0, 644.0, "John Smith");
        let ops: Vec<&str> = layer.operations().iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(ops, vec!["BT", "Tf", "Td", "Tj", "ET"]);
        assert_eq!(layer.fonts(), &[StandardFont::Helvetica]);
    }

    #[test]
    fn test_empty_text_draws_nothing() {
        let mut layer = OverlayLayer::new(Layer::Front, StandardFont::Helvetica, 12.0);
        layer.draw_text(0.0, 0.0, "");
        layer.draw_mark_if(false, 27.0, 375.0);
        assert!(layer.is_empty());
    }

    #[test]
    fn test_unmappable_text_warns_without_echoing_it() {
        let mut page = PageOverlay::new(2, StandardFont::TimesRoman, 11.0);
        let layer = page.front();
        layer.draw_text(10.0, 20.5, "Đặng");
        let warnings = layer.take_warnings().into_vec();
        assert_eq!(
            warnings,
            vec![Warning::UnmappableText {
                location: "page 3 at (10, 20.5)".to_string(),
                replaced: 2,
            }]
        );
        assert!(!warnings[0].to_string().contains('Đ'));
        assert!(!layer.is_empty());
    }

    #[test]
    fn test_draw_lines_steps_down() {
        let mut layer = OverlayLayer::new(Layer::Front, StandardFont::Helvetica, 9.0);
        layer.draw_lines(20.0, 288.0, 12.0, &["one", "two"]);
        let ys: Vec<f32> = layer
            .operations()
            .iter()
            .filter(|o| o.operator == "Td")
            .filter_map(|o| o.operands[1].as_float().ok())
            .collect();
        assert_eq!(ys, vec![288.0, 276.0]);
    }

    #[test]
    fn test_undecodable_signature_falls_back() {
        let mut layer = OverlayLayer::new(Layer::Behind, StandardFont::Helvetica, 10.0);
        let payload = SignaturePayload::Raw(b"definitely not an image".to_vec());
        layer.draw_signature(
            Some(&payload),
            SignatureBox {
                x: 103.0,
                y: 33.0,
                max_width: 150.0,
                max_height: 50.0,
                fallback_x: 100.0,
                fallback_y: 155.0,
            },
        );
        assert!(layer.images().is_empty());
        let warnings = layer.take_warnings().into_vec();
        assert!(matches!(warnings[0], Warning::SignatureFallback { .. }));
        let text = layer
            .operations()
            .iter()
            .find(|o| o.operator == "Tj")
            .and_then(|o| o.operands[0].as_str().ok())
            .unwrap();
        assert_eq!(text, SIGNATURE_FALLBACK_TEXT.as_bytes());
    }

    #[test]
    fn test_page_overlay_layers() {
        let mut page = PageOverlay::new(0, StandardFont::Helvetica, 10.0);
        assert!(page.is_empty());
        page.layer(Layer::Front).draw_mark(22.0, 518.0);
        let (behind, front) = page.into_layers();
        assert!(behind.is_empty());
        assert_eq!(front.layer(), Layer::Front);
    }
}
