//! Desert Pulmonary referral: cover page plus a patient details page.

use super::{FileSubject, FormPlan, LayoutContext, PageSet};
use crate::error::Result;
use crate::fields::{normalize_date, US_DATE};
use crate::pdf::StandardFont;

const FONT_SIZE: f32 = 10.0;

pub(super) fn layout(ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
    let patient = ctx.text("patient_name");
    let case_id = match ctx.text("case_id") {
        c if c.is_empty() => ctx.record().case_id(),
        c => c,
    };
    let phone = match ctx.text("phone_number") {
        p if p.is_empty() => ctx.record().phone(),
        p => p,
    };
    let dob = normalize_date(ctx.data().date("dob"), US_DATE);
    let address = ctx.data().address_over(&ctx.record().address());
    let today = ctx.today_us();

    let mut pages = PageSet::new(StandardFont::Helvetica, FONT_SIZE);
    {
        let cover = pages.page(0).front();
        cover.draw_text(100.0, 599.0, &today);
        cover.draw_text(135.0, 563.0, &patient);
        cover.draw_text(92.0, 126.0, &ctx.text("dx_code"));
    }

    if ctx.page_count > 1 {
        let details = pages.page(1).front();
        details.draw_text(105.0, 675.0, &patient);
        details.draw_text(150.0, 639.0, &phone);
        details.draw_text(100.0, 603.0, &dob);
        details.draw_text(118.0, 567.0, &case_id);
        details.draw_text(118.0, 531.0, &address.one_line());
        details.draw_text(127.0, 409.0, &patient);
        details.draw_text(475.0, 385.0, &case_id);
        details.draw_text(450.0, 220.0, &today);
    } else {
        tracing::debug!("referral template has no details page");
    }

    Ok(FormPlan {
        overlays: pages.into_overlays(),
        subject: FileSubject::FullName(patient),
    })
}
