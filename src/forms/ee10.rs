//! EE-10 impairment / wage-loss claim
//!
//! Single page, everything drawn on top. The La Plata and Lewis templates
//! share one coordinate set.

use super::{FileSubject, FormPlan, LayoutContext, PageSet};
use crate::error::Result;
use crate::fields::{normalize_phone, PersonName};
use crate::pdf::StandardFont;

const FONT_SIZE: f32 = 12.0;

const INITIAL_CLAIM: &str = "Initial Impairment Claim";
const REPEAT_CLAIM: &str = "Repeat Impairment Claim";

/// Name from form data, else the parsed client record.
fn subject(ctx: &LayoutContext<'_>, name: &str) -> FileSubject {
    let from_form = PersonName::from_full(name);
    if from_form.is_complete() {
        return FileSubject::Person(from_form);
    }
    match ctx.record().name() {
        Ok(parsed) => FileSubject::Person(parsed.name),
        Err(e) => {
            tracing::debug!(error = %e, "no usable client name for filename");
            FileSubject::Unknown
        }
    }
}

pub(super) fn layout(ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
    let name = ctx.text("name");
    let case_id = match ctx.text("case_id") {
        c if c.is_empty() => ctx.record().case_id(),
        c => c,
    };
    let address = ctx.data().address_over(&ctx.record().address());
    let phone_raw = match ctx.text("phone") {
        p if p.is_empty() => ctx.record().phone(),
        p => p,
    };
    let phone = normalize_phone(&phone_raw);

    let mut pages = PageSet::new(StandardFont::Helvetica, FONT_SIZE);
    let front = pages.page(0).front();

    front.draw_text(25.0, 644.0, &name);
    front.draw_text(460.0, 644.0, &case_id);

    front.draw_text(25.0, 587.0, &address.street);
    front.draw_text(25.0, 555.0, &address.city);
    front.draw_text(220.0, 555.0, &address.state);
    front.draw_text(255.0, 555.0, &address.zip);

    front.draw_text(355.0, 612.0, &phone.area);
    front.draw_text(390.0, 612.0, &phone.prefix);
    front.draw_text(425.0, 612.0, &phone.line);

    match ctx.text("claim_type").as_str() {
        INITIAL_CLAIM => front.draw_mark(27.0, 487.0),
        REPEAT_CLAIM => front.draw_mark(27.0, 375.0),
        other if !other.is_empty() => {
            tracing::debug!(claim_type = other, "unrecognized claim type, no box marked");
        }
        _ => {}
    }

    front.draw_text(412.0, 70.0, &ctx.today_us());

    let subject = subject(ctx, &name);
    Ok(FormPlan {
        overlays: pages.into_overlays(),
        subject,
    })
}
