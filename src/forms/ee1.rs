//! EE-1 employee claim
//!
//! Data text and the signature go behind the template so its ruled lines stay
//! visible; checkbox marks go on top.

use super::{FileSubject, FormPlan, LayoutContext, PageSet};
use crate::error::Result;
use crate::fields::{
    normalize_phone, spaced_date, CategoryDiagnosis, DiagnosisCategory, PersonName,
};
use crate::layout::{assign_entries, CoordinateDeltaTable, EntrySlot};
use crate::pdf::{OverlayLayer, SignatureBox, StandardFont};
use crate::warning::Warnings;
use serde_json::Value;

const FONT_SIZE: f32 = 10.0;
const DATE_GAP: usize = 7;
const DOB_GAP: usize = 6;
const MARK_X: f32 = 22.0;
const DIAGNOSIS_X: f32 = 55.0;
const DATE_X: f32 = 507.0;

const LINE: CoordinateDeltaTable = CoordinateDeltaTable::new(&[("text", 0.0), ("date", 0.0)]);

static CANCER_LINES: [EntrySlot; 3] = [
    EntrySlot::new(0, 495.0, LINE),
    EntrySlot::new(0, 478.0, LINE),
    EntrySlot::new(0, 459.0, LINE),
];

static OTHER_LINES: [EntrySlot; 3] = [
    EntrySlot::new(0, 370.0, LINE),
    EntrySlot::new(0, 352.0, LINE),
    EntrySlot::new(0, 335.0, LINE),
];

/// Single-date categories: key, checkbox y, date y
const DATED_CATEGORIES: [(&str, f32, f32); 3] = [
    ("beryllium_sensitivity", 443.0, 441.0),
    ("chronic_beryllium_disease", 425.0, 423.0),
    ("chronic_silicosis", 407.0, 405.0),
];

const SIGNATURE: SignatureBox = SignatureBox {
    x: 103.0,
    y: 33.0,
    max_width: 150.0,
    max_height: 50.0,
    fallback_x: 100.0,
    fallback_y: 155.0,
};

fn section(key: &str) -> String {
    format!("diagnosis_categories.{}", key)
}

/// One category out of `diagnosis_categories`
fn category(categories: Option<&Value>, key: &str, warnings: &mut Warnings) -> DiagnosisCategory {
    DiagnosisCategory::from_json(categories.and_then(|c| c.get(key)), &section(key), warnings)
}

/// Lettered diagnoses under a category, positional. Trailing blank lines are
/// not counted against capacity.
fn draw_diagnoses(
    behind: &mut OverlayLayer,
    section: &str,
    diagnoses: &[CategoryDiagnosis],
    slots: &[EntrySlot],
    warnings: &mut Warnings,
) {
    let used = diagnoses
        .iter()
        .rposition(|d| !d.text.is_empty())
        .map_or(0, |last| last + 1);
    for (slot, diagnosis) in assign_entries(&diagnoses[..used], slots, section, warnings) {
        if diagnosis.text.is_empty() {
            continue;
        }
        if let Some(y) = slot.y("text") {
            behind.draw_text(DIAGNOSIS_X, y, &diagnosis.text);
        }
        if let Some(y) = slot.y("date") {
            behind.draw_text(DATE_X, y, &spaced_date(&diagnosis.date, DATE_GAP));
        }
    }
}

pub(super) fn layout(ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
    let name = PersonName::new(&ctx.text("first_name"), &ctx.text("last_name"));
    let address = ctx.data().address_over(&ctx.record().address());
    let phone = normalize_phone(&ctx.text("phone"));
    let signature = ctx.signature();
    let today = ctx.today_us();

    let categories = ctx.data().get("diagnosis_categories").cloned();
    let categories = categories.as_ref();

    let mut pages = PageSet::new(StandardFont::Helvetica, FONT_SIZE);
    let page = pages.page(0);

    {
        let behind = page.behind();
        behind.draw_text(25.0, 645.0, &name.last);
        behind.draw_text(185.0, 645.0, &name.first);
        behind.draw_text(400.0, 645.0, &ctx.text("ssn"));
        behind.draw_text(95.0, 627.0, &spaced_date(&ctx.data().date("dob"), DOB_GAP));

        behind.draw_text(25.0, 585.0, &address.street);
        behind.draw_text(25.0, 555.0, &address.city);
        behind.draw_text(215.0, 555.0, &address.state);
        behind.draw_text(255.0, 555.0, &address.zip);

        behind.draw_text(355.0, 585.0, &phone.area);
        behind.draw_text(390.0, 585.0, &phone.prefix);
        behind.draw_text(428.0, 585.0, &phone.line);
    }

    match ctx.text("sex").as_str() {
        "" => {}
        "Male" => page.front().draw_mark(203.0, 615.0),
        _ => page.front().draw_mark(247.0, 615.0),
    }

    let cancer = category(categories, "cancer", ctx.warnings);
    if cancer.selected {
        page.front().draw_mark(MARK_X, 518.0);
        draw_diagnoses(
            page.behind(),
            &section("cancer"),
            &cancer.diagnoses,
            &CANCER_LINES,
            ctx.warnings,
        );
    }

    for (key, mark_y, date_y) in DATED_CATEGORIES {
        let dated = category(categories, key, ctx.warnings);
        if dated.selected {
            page.front().draw_mark(MARK_X, mark_y);
            page.behind()
                .draw_text(DATE_X, date_y, &spaced_date(&dated.date, DATE_GAP));
        }
    }

    let other = category(categories, "other", ctx.warnings);
    if other.selected {
        page.front().draw_mark(MARK_X, 388.0);
        draw_diagnoses(
            page.behind(),
            &section("other"),
            &other.diagnoses,
            &OTHER_LINES,
            ctx.warnings,
        );
    }

    page.behind().draw_signature(signature.as_ref(), SIGNATURE);
    page.behind().draw_text(390.0, 42.0, &today);

    Ok(FormPlan {
        overlays: pages.into_overlays(),
        subject: FileSubject::Person(name),
    })
}

#[cfg(test)]
mod tests {
    use crate::forms::testing::{run_layout, runs};
    use crate::forms::FormKind;
    use crate::pdf::Layer;
    use crate::warning::Warning;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn texts_at(runs: &[(f32, f32, String)], x: f32, y: f32) -> Vec<String> {
        runs.iter()
            .filter(|(rx, ry, _)| *rx == x && *ry == y)
            .map(|(_, _, t)| t.clone())
            .collect()
    }

    #[test]
    fn test_text_behind_marks_on_top() {
        let data = json!({
            "first_name": "John",
            "last_name": "Smith",
            "dob": "1950-07-04",
            "sex": "Male",
            "phone": "5551234567",
            "diagnosis_categories": {
                "cancer": {
                    "selected": true,
                    "diagnoses": [{ "text": "Lung cancer", "date": "2020-01-02" }],
                },
                "chronic_silicosis": { "selected": true, "date": "03/04/2019" },
            },
        });
        let (plan, warnings) = run_layout(FormKind::Ee1, data, json!({}), 1);
        assert!(warnings.is_empty());

        let behind = runs(&plan, 0, Layer::Behind);
        let front = runs(&plan, 0, Layer::Front);

        assert_eq!(texts_at(&behind, 25.0, 645.0), vec!["Smith"]);
        assert_eq!(texts_at(&behind, 95.0, 627.0), vec!["07      04      1950"]);
        assert_eq!(texts_at(&behind, 428.0, 585.0), vec!["4567"]);
        assert_eq!(texts_at(&behind, 55.0, 495.0), vec!["Lung cancer"]);
        assert_eq!(texts_at(&behind, 507.0, 495.0), vec!["01       02       2020"]);
        assert_eq!(texts_at(&behind, 507.0, 405.0), vec!["03       04       2019"]);
        assert_eq!(texts_at(&behind, 390.0, 42.0), vec!["03/05/2024"]);

        assert_eq!(texts_at(&front, 203.0, 615.0), vec!["X"]);
        assert_eq!(texts_at(&front, 22.0, 518.0), vec!["X"]);
        assert_eq!(texts_at(&front, 22.0, 407.0), vec!["X"]);
        assert!(texts_at(&front, 22.0, 443.0).is_empty());
        assert!(front.iter().all(|(_, _, t)| t == "X"));
    }

    #[test]
    fn test_extra_cancer_diagnoses_dropped() {
        let diagnoses: Vec<_> = (1..=5)
            .map(|n| json!({ "text": format!("Dx {}", n) }))
            .collect();
        let data = json!({
            "diagnosis_categories": { "cancer": { "selected": true, "diagnoses": diagnoses } },
        });
        let (plan, warnings) = run_layout(FormKind::Ee1, data, json!({}), 1);
        assert_eq!(
            warnings,
            vec![Warning::EntriesDropped {
                section: "diagnosis_categories.cancer".to_string(),
                capacity: 3,
                dropped: 2,
            }]
        );
        let behind = runs(&plan, 0, Layer::Behind);
        assert_eq!(texts_at(&behind, 55.0, 459.0), vec!["Dx 3"]);
        assert!(!behind.iter().any(|(_, _, t)| t == "Dx 4"));
    }

    #[test]
    fn test_padded_blank_diagnoses_not_warned() {
        let data = json!({
            "diagnosis_categories": {
                "other": {
                    "selected": true,
                    "diagnoses": [
                        { "text": "Asbestosis" },
                        { "text": "" },
                        { "text": "" },
                        { "text": "" },
                    ],
                },
            },
        });
        let (plan, warnings) = run_layout(FormKind::Ee1, data, json!({}), 1);
        assert!(warnings.is_empty());
        let behind = runs(&plan, 0, Layer::Behind);
        assert_eq!(texts_at(&behind, 55.0, 370.0), vec!["Asbestosis"]);
    }

    #[test]
    fn test_undecodable_signature_falls_back() {
        let data = json!({ "signature_file": { "data": "bm90IGFuIGltYWdl" } });
        let (plan, warnings) = run_layout(FormKind::Ee1, data, json!({}), 1);
        assert!(matches!(warnings.as_slice(), [Warning::SignatureFallback { .. }]));
        let behind = runs(&plan, 0, Layer::Behind);
        assert_eq!(
            texts_at(&behind, 100.0, 155.0),
            vec![crate::pdf::SIGNATURE_FALLBACK_TEXT]
        );
    }

    #[test]
    fn test_unreadable_cancer_row_keeps_mark_and_other_rows() {
        let data = json!({
            "diagnosis_categories": {
                "cancer": {
                    "selected": true,
                    "diagnoses": [{ "text": "Lung cancer" }, null, { "text": "Skin cancer" }],
                },
            },
        });
        let (plan, warnings) = run_layout(FormKind::Ee1, data, json!({}), 1);
        assert_eq!(
            warnings,
            vec![Warning::MalformedEntry {
                section: "diagnosis_categories.cancer".to_string(),
                index: 1,
            }]
        );
        let behind = runs(&plan, 0, Layer::Behind);
        assert_eq!(texts_at(&runs(&plan, 0, Layer::Front), 22.0, 518.0), vec!["X"]);
        assert_eq!(texts_at(&behind, 55.0, 495.0), vec!["Lung cancer"]);
        assert!(texts_at(&behind, 55.0, 478.0).is_empty());
        assert_eq!(texts_at(&behind, 55.0, 459.0), vec!["Skin cancer"]);
    }

    #[test]
    fn test_trailing_unreadable_row_still_warns() {
        let data = json!({
            "diagnosis_categories": {
                "cancer": { "selected": true, "diagnoses": [{ "text": "Lung cancer" }, null] },
            },
        });
        let (plan, warnings) = run_layout(FormKind::Ee1, data, json!({}), 1);
        assert!(matches!(warnings.as_slice(), [Warning::MalformedEntry { index: 1, .. }]));
        assert_eq!(texts_at(&runs(&plan, 0, Layer::Front), 22.0, 518.0), vec!["X"]);
        assert_eq!(
            texts_at(&runs(&plan, 0, Layer::Behind), 55.0, 495.0),
            vec!["Lung cancer"]
        );
    }

    #[test]
    fn test_no_sex_no_mark() {
        let (plan, _) = run_layout(FormKind::Ee1, json!({}), json!({}), 1);
        assert!(runs(&plan, 0, Layer::Front).is_empty());
    }
}
