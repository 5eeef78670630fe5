//! EE-3 employment history
//!
//! Header on page 1, up to three employer sections (one on page 1, two on
//! page 2), and a date stamp on pages 2 and 3.

use super::{FileSubject, FormPlan, LayoutContext, PageSet};
use crate::error::Result;
use crate::fields::{city_state, date_parts, display_ssn, wrap, EmploymentEntry, PersonName};
use crate::layout::{assign_entries, CoordinateDeltaTable, EntrySlot};
use crate::pdf::{OverlayLayer, StandardFont};
use crate::warning::Warning;

const FONT_SIZE: f32 = 9.0;
const WRAP_CHARS: usize = 140;
const WRAP_LINES: usize = 4;
const LEADING: f32 = 12.0;

const EXPOSURES_TEXT: &str = "Claimant stated they were exposed to radiation, silica dust, and \
                              other chemicals, solvents and contaminants during the course of \
                              their employment.";

const PAGE1: CoordinateDeltaTable = CoordinateDeltaTable::new(&[
    ("dates", 0.0),
    ("facility", -42.0),
    ("contractor", -87.0),
    ("position", -119.0),
    ("facility_checkbox", -70.0),
    ("union_checkbox", -420.0),
    ("dosimetry_checkbox", -114.0),
    ("duties", -180.0),
    ("exposures", -286.0),
]);

const PAGE2_SECOND: CoordinateDeltaTable = CoordinateDeltaTable::new(&[
    ("dates", 0.0),
    ("facility", -38.0),
    ("contractor", -79.0),
    ("position", -108.0),
    ("duties", -160.0),
    ("exposures", -212.0),
    ("facility_checkbox", -65.0),
    ("union_checkbox", -282.0),
    ("dosimetry_checkbox", -107.0),
]);

const PAGE2_THIRD: CoordinateDeltaTable = CoordinateDeltaTable::new(&[
    ("dates", 0.0),
    ("facility", -37.0),
    ("contractor", -80.0),
    ("position", -110.0),
    ("duties", -163.0),
    ("exposures", -213.0),
    ("facility_checkbox", -66.0),
    ("union_checkbox", -286.0),
    ("dosimetry_checkbox", -109.0),
]);

pub(crate) static EMPLOYER_SLOTS: [EntrySlot; 3] = [
    EntrySlot::new(0, 468.0, PAGE1),
    EntrySlot::new(1, 761.0, PAGE2_SECOND),
    EntrySlot::new(1, 460.0, PAGE2_THIRD),
];

/// Month/day/year at three x positions; nothing if the date does not parse.
fn draw_date_boxes(
    layer: &mut OverlayLayer,
    y: f32,
    xs: [f32; 3],
    date: &crate::fields::DateInput,
) {
    if let Some(parts) = date_parts(date) {
        layer.draw_text(xs[0], y, &parts.month);
        layer.draw_text(xs[1], y, &parts.day);
        layer.draw_text(xs[2], y, &parts.year);
    }
}

fn draw_wrapped(
    ctx: &mut LayoutContext<'_>,
    layer: &mut OverlayLayer,
    y: f32,
    field: &str,
    text: &str,
) {
    let wrapped = wrap(text, WRAP_CHARS, WRAP_LINES);
    if wrapped.truncated {
        ctx.warnings.push(Warning::TextTruncated {
            field: field.to_string(),
            max_lines: WRAP_LINES,
        });
    }
    layer.draw_lines(20.0, y, LEADING, &wrapped.lines);
}

fn draw_employer(
    ctx: &mut LayoutContext<'_>,
    layer: &mut OverlayLayer,
    slot: &EntrySlot,
    index: usize,
    job: &EmploymentEntry,
) {
    if let Some(y) = slot.y("dates") {
        draw_date_boxes(layer, y, [175.0, 205.0, 230.0], &job.start_date);
        draw_date_boxes(layer, y, [360.0, 390.0, 415.0], &job.end_date);
    }

    if let Some(y) = slot.y("facility") {
        layer.draw_text(30.0, y, &job.facility_name);
        layer.draw_text(265.0, y, &job.specific_location);
        layer.draw_text(435.0, y, &city_state(&job.city, &job.state));
    }
    if let Some(y) = slot.y("contractor") {
        layer.draw_text(30.0, y, &job.contractor);
    }
    if let Some(y) = slot.y("position") {
        layer.draw_text(30.0, y, &job.position_title);
    }

    if let Some(y) = slot.y("union_checkbox") {
        layer.draw_mark_if(job.union_member, 204.0, y);
    }
    if let Some(y) = slot.y("dosimetry_checkbox") {
        layer.draw_mark_if(job.dosimetry_worn, 442.0, y);
    }
    // every listed employer is a DOE facility
    if let Some(y) = slot.y("facility_checkbox") {
        layer.draw_mark(238.0, y);
    }

    if let Some(y) = slot.y("duties") {
        let field = format!("employment_history[{}].work_duties", index);
        draw_wrapped(ctx, layer, y, &field, &job.work_duties);
    }
    if let Some(y) = slot.y("exposures") {
        let field = format!("employment_history[{}].exposures", index);
        draw_wrapped(ctx, layer, y, &field, EXPOSURES_TEXT);
    }
}

pub(super) fn layout(ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
    let name = PersonName::new(&ctx.text("first_name"), &ctx.text("last_name"));
    let jobs: Vec<EmploymentEntry> = ctx.list("employment_history");
    let mut pages = PageSet::new(StandardFont::Helvetica, FONT_SIZE);

    {
        let header = pages.page(0).front();
        header.draw_text(30.0, 640.0, &name.last);
        header.draw_text(150.0, 640.0, &name.first);
        header.draw_text(250.0, 640.0, &ctx.text("former_name"));
        header.draw_text(440.0, 640.0, &display_ssn(&ctx.text("ssn")));
    }

    let assigned = assign_entries(&jobs, &EMPLOYER_SLOTS, "employment_history", ctx.warnings);
    for (index, (slot, job)) in assigned.into_iter().enumerate() {
        if job.is_blank() {
            continue;
        }
        draw_employer(ctx, pages.page(slot.page).front(), slot, index, job);
    }

    let today = ctx.today_us();
    if ctx.page_count > 1 {
        pages.page(1).front().draw_text(385.0, 60.0, &today);
    }
    if ctx.page_count > 2 {
        pages.page(2).front().draw_text(500.0, 50.0, &today);
    }

    Ok(FormPlan {
        overlays: pages.into_overlays(),
        subject: FileSubject::Person(name),
    })
}
