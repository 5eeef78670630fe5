//! Letters: IR notice, withdrawal, address change and the RD acceptance
//! waiver. Letter dates are spelled out (`March 05, 2024`).

use super::{FileSubject, FormPlan, LayoutContext, PageSet};
use crate::error::Result;
use crate::fields::{normalize_date, Address, PersonName, LETTER_DATE, US_DATE};
use crate::pdf::{OverlayLayer, StandardFont};

const LETTER_FONT_SIZE: f32 = 11.0;
const DEFAULT_IR_PROVIDER: &str = "La Plata Medical";

/// First non-empty form-data key, else the client record's case ID.
fn case_number(ctx: &LayoutContext<'_>, keys: &[&str]) -> String {
    match ctx.data().text_any(keys) {
        c if c.is_empty() => ctx.record().case_id(),
        c => c,
    }
}

/// Letters cannot be addressed without the addressee's name.
fn addressee(ctx: &LayoutContext<'_>, key: &str) -> Result<String> {
    match ctx.text(key) {
        name if name.is_empty() => Err(ctx.missing(key)),
        name => Ok(name),
    }
}

/// Repeat the same header on every template page.
fn every_page(
    ctx: &LayoutContext<'_>,
    font: StandardFont,
    draw: impl Fn(&mut OverlayLayer),
) -> PageSet {
    let mut pages = PageSet::new(font, LETTER_FONT_SIZE);
    for index in 0..ctx.page_count.max(1) {
        draw(pages.page(index).front());
    }
    pages
}

pub(super) fn ir_notice(ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
    let client = addressee(ctx, "client_name")?;
    let file_number = case_number(ctx, &["file_number", "case_id"]);
    let provider = match ctx.text("provider_name") {
        p if p.is_empty() => DEFAULT_IR_PROVIDER.to_string(),
        p => p,
    };
    let appointment = normalize_date(ctx.data().date("appointment_date"), LETTER_DATE);

    let mut pages = PageSet::new(StandardFont::TimesRoman, LETTER_FONT_SIZE);
    let front = pages.page(0).front();
    front.draw_text(114.0, 711.0, &client);
    front.draw_text(107.0, 698.0, &file_number);
    front.draw_text(69.0, 685.0, &ctx.today_long());
    front.draw_text(387.0, 555.0, &provider);
    if !appointment.is_empty() {
        front.draw_text(85.0, 525.0, &format!("{}.", appointment));
    }

    Ok(FormPlan {
        overlays: pages.into_overlays(),
        subject: FileSubject::FullName(client),
    })
}

pub(super) fn withdrawal(ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
    let claimant = addressee(ctx, "claimant_name")?;
    let case_id = case_number(ctx, &["case_id"]);
    let date = match normalize_date(ctx.data().date("letter_date"), LETTER_DATE) {
        d if d.is_empty() => ctx.today_long(),
        d => d,
    };
    let condition = ctx.text("claimed_condition");

    let pages = every_page(ctx, StandardFont::TimesRoman, |page| {
        page.draw_text(119.0, 709.0, &claimant);
        page.draw_text(113.0, 696.0, &case_id);
        page.draw_text(74.0, 684.0, &date);
        if !condition.is_empty() {
            page.draw_text(260.0, 537.0, &format!("{}.", condition));
        }
    });

    Ok(FormPlan {
        overlays: pages.into_overlays(),
        subject: FileSubject::FullName(claimant),
    })
}

pub(super) fn address_change(ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
    let claimant = addressee(ctx, "claimant_name")?;
    let case_id = case_number(ctx, &["case_id"]);
    let address = Address::new(
        &ctx.text("street_address"),
        &ctx.text("city"),
        &ctx.text("state"),
        &ctx.text("zip_code"),
    );
    let address = if address.is_empty() {
        ctx.record().address()
    } else {
        address
    };
    let salutation = claimant.split_whitespace().next().unwrap_or_default().to_string();
    let today = ctx.today_long();

    let pages = every_page(ctx, StandardFont::TimesRoman, |page| {
        page.draw_text(116.0, 721.0, &claimant);
        page.draw_text(110.0, 708.0, &case_id);
        page.draw_text(72.0, 695.0, &today);
        page.draw_text(112.0, 540.0, &address.street);
        page.draw_text(112.0, 525.0, &address.city_state_zip());
        page.draw_text(620.0, 453.0, &salutation);
    });

    Ok(FormPlan {
        overlays: pages.into_overlays(),
        subject: FileSubject::FullName(claimant),
    })
}

pub(super) fn rd_accept_waiver(ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
    let claimant = ctx.text("claimant");
    let employee = ctx.text("employee");
    let case_id = case_number(ctx, &["case_id"]);
    let decision_date = normalize_date(ctx.data().date("rd_decision_date"), US_DATE);
    let signed = match normalize_date(ctx.data().date("current_date"), US_DATE) {
        d if d.is_empty() => ctx.today_us(),
        d => d,
    };

    let mut pages = PageSet::new(StandardFont::Helvetica, LETTER_FONT_SIZE);
    let front = pages.page(0).front();
    front.draw_text(410.0, 675.0, &claimant);
    front.draw_text(378.0, 662.0, &employee);
    front.draw_text(374.0, 647.0, &case_id);
    front.draw_text(410.0, 634.0, &decision_date);
    front.draw_text(83.0, 247.0, &claimant);
    front.draw_text(315.0, 178.0, &signed);

    Ok(FormPlan {
        overlays: pages.into_overlays(),
        subject: FileSubject::Person(PersonName::from_outer_words(&claimant)),
    })
}
