//! EN-16 claimant authorization: name and case ID on the first page, the
//! signing date on the last. Pages in between pass through untouched.

use super::{FileSubject, FormPlan, LayoutContext, PageSet};
use crate::error::Result;
use crate::pdf::StandardFont;

const FONT_SIZE: f32 = 12.0;

pub(super) fn layout(ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
    let client = ctx.record().name()?;
    let last = ctx.last_page();

    let mut pages = PageSet::new(StandardFont::Helvetica, FONT_SIZE);
    {
        let first = pages.page(0).front();
        first.draw_text(355.0, 695.0, &client.name.display());
        first.draw_text(355.0, 710.0, &ctx.record().case_id());
    }
    pages.page(last).front().draw_text(250.0, 227.0, &ctx.today_us());

    Ok(FormPlan {
        overlays: pages.into_overlays(),
        subject: FileSubject::Person(client.name),
    })
}
