//! PDF processing layer
//!
//! Template loading, overlay drawing, signature images and page composition,
//! all on top of lopdf.

mod compose;
mod grid;
mod overlay;
mod signature;
mod template;

pub use compose::Compositor;
pub use grid::coordinate_grid;
pub use overlay::{
    encode_win_ansi, Layer, OverlayLayer, PageOverlay, SignatureBox, StandardFont,
    SIGNATURE_FALLBACK_TEXT,
};
pub use signature::{fit_scale, prepare_signature, SignatureImage};
pub use template::{media_box, FormTemplate, LETTER};

#[cfg(test)]
pub(crate) use signature::testing::signature_png;
#[cfg(test)]
pub(crate) use template::testing::blank_template;
