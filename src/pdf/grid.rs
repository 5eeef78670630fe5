//! Coordinate reference grid
//!
//! Overlays a labelled 50-point grid on every page of a template so new
//! field placements can be read straight off a printout.

use super::compose::Compositor;
use super::overlay::{PageOverlay, StandardFont};
use super::template::FormTemplate;
use crate::error::Result;
use crate::warning::Warnings;

const GRID_STEP: usize = 50;
const CORNER_RADIUS: f32 = 10.0;

const INSTRUCTIONS: [&str; 4] = [
    "Grid lines every 50 units",
    "Red circles mark corners",
    "Numbers show X,Y coordinates",
    "Use these coordinates in your generator files",
];

fn grid_overlay(page: usize, media_box: [f32; 4]) -> PageOverlay {
    let width = media_box[2] - media_box[0];
    let height = media_box[3] - media_box[1];
    let mut overlay = PageOverlay::new(page, StandardFont::Helvetica, 8.0);
    let layer = overlay.front();

    layer.set_line_width(0.5);
    layer.set_stroke_rgb(0.8, 0.8, 0.8);
    layer.set_fill_rgb(0.0, 0.0, 0.0);

    for x in (0..width.max(0.0) as usize).step_by(GRID_STEP) {
        let xf = x as f32;
        layer.line(xf, 0.0, xf, height);
        layer.draw_text(xf + 2.0, height - 15.0, &x.to_string());
        if x > 0 {
            layer.draw_text(xf + 2.0, 20.0, &x.to_string());
        }
    }

    for y in (0..height.max(0.0) as usize).step_by(GRID_STEP) {
        let yf = y as f32;
        layer.line(0.0, yf, width, yf);
        layer.draw_text(5.0, yf + 2.0, &y.to_string());
        if yf < height - 30.0 {
            layer.draw_text(width - 30.0, yf + 2.0, &y.to_string());
        }
    }

    layer.set_fill_rgb(1.0, 0.0, 0.0);
    layer.set_font(StandardFont::HelveticaBold, 10.0);
    let (w, h) = (width.round(), height.round());
    let corners = [
        (0.0, 0.0, "0,0".to_string()),
        (width, 0.0, format!("{w},0")),
        (0.0, height, format!("0,{h}")),
        (width, height, format!("{w},{h}")),
    ];
    for (x, y, label) in corners {
        layer.filled_circle(x, y, CORNER_RADIUS);
        let label_x = if x < width / 2.0 { x + 15.0 } else { x - 50.0 };
        let label_y = if y < height / 2.0 { y + 15.0 } else { y - 20.0 };
        layer.draw_text(label_x, label_y, &label);
    }

    layer.set_fill_rgb(0.0, 0.0, 0.0);
    layer.set_font(StandardFont::HelveticaBold, 12.0);
    layer.draw_text(width / 2.0 - 100.0, height - 30.0, "COORDINATE REFERENCE GRID");

    layer.set_font(StandardFont::Helvetica, 10.0);
    for (i, line) in INSTRUCTIONS.iter().enumerate() {
        layer.draw_text(50.0, height - 60.0 - 15.0 * i as f32, &format!("• {line}"));
    }

    overlay
}

/// Return `template` with a coordinate grid drawn over every page.
pub fn coordinate_grid(template: &[u8]) -> Result<Vec<u8>> {
    let mut template = FormTemplate::from_bytes(template)?;
    let mut warnings = Warnings::new();
    let pages = template.page_count();

    let overlays = (0..pages)
        .map(|page| -> Result<PageOverlay> {
            Ok(grid_overlay(page, template.media_box(page)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut compositor = Compositor::new(&mut template);
    for overlay in overlays {
        compositor.compose(overlay, &mut warnings)?;
    }

    tracing::info!(pages, "coordinate grid rendered");
    template.save_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::template::testing::blank_template;
    use lopdf::content::Content;

    #[test]
    fn test_grid_covers_every_page() {
        let out = coordinate_grid(&blank_template(2)).unwrap();
        let template = FormTemplate::from_bytes(&out).unwrap();
        assert_eq!(template.page_count(), 2);

        for page in 0..2 {
            let id = template.page_id(page).unwrap();
            let content = template.document().get_page_content(id).unwrap();
            let ops = Content::decode(&content).unwrap().operations;
            let labels: Vec<Vec<u8>> = ops
                .iter()
                .filter(|o| o.operator == "Tj")
                .filter_map(|o| o.operands[0].as_str().ok().map(<[u8]>::to_vec))
                .collect();
            assert!(labels.contains(&b"COORDINATE REFERENCE GRID".to_vec()));
            assert!(labels.contains(&b"600".to_vec()));
            assert!(labels.contains(&b"612,792".to_vec()));
        }
    }

    #[test]
    fn test_grid_rejects_non_pdf() {
        assert!(coordinate_grid(b"nope").is_err());
    }
}
