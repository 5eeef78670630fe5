//! EN-11A provider authorization
//!
//! Name and case ID come from the client record, so a malformed record name
//! fails the form. Each provider template has its own coordinate set.

use super::{FileSubject, FormPlan, LayoutContext, PageSet};
use crate::error::Result;
use crate::pdf::StandardFont;

const FONT_SIZE: f32 = 12.0;

struct Placements {
    name: (f32, f32),
    case_id: (f32, f32),
    date: (f32, f32),
}

const KALCICH: Placements = Placements {
    name: (180.0, 690.0),
    case_id: (180.0, 705.0),
    date: (400.0, 320.0),
};

const LEWIS: Placements = Placements {
    name: (178.0, 681.0),
    case_id: (178.0, 696.0),
    date: (400.0, 333.0),
};

/// Provider selections that use the Kalcich template
pub(super) fn is_kalcich(provider: &str) -> bool {
    matches!(provider.trim(), "Dr. Kalcich" | "Kalcich" | "La Plata")
}

pub(super) fn layout(ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
    let client = ctx.record().name()?;
    let placements = if is_kalcich(&ctx.request.provider()) {
        &KALCICH
    } else {
        &LEWIS
    };

    let mut pages = PageSet::new(StandardFont::Helvetica, FONT_SIZE);
    let front = pages.page(0).front();
    front.draw_text(placements.name.0, placements.name.1, &client.name.display());
    front.draw_text(
        placements.case_id.0,
        placements.case_id.1,
        &ctx.record().case_id(),
    );
    front.draw_text(placements.date.0, placements.date.1, &ctx.today_us());

    Ok(FormPlan {
        overlays: pages.into_overlays(),
        subject: FileSubject::Person(client.name),
    })
}
