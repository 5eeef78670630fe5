//! EE-1a additional diagnoses. Everything is drawn behind the template.

use super::{FileSubject, FormPlan, LayoutContext, PageSet};
use crate::error::Result;
use crate::fields::{date_parts, normalize_phone, DiagnosisEntry, PersonName};
use crate::layout::{assign_entries, CoordinateDeltaTable, EntrySlot};
use crate::pdf::{SignatureBox, StandardFont};

const FONT_SIZE: f32 = 10.0;

const LINE: CoordinateDeltaTable = CoordinateDeltaTable::new(&[("diagnosis", 0.0), ("date", 0.0)]);

/// Lines a through e
pub(crate) static DIAGNOSIS_LINES: [EntrySlot; 5] = [
    EntrySlot::new(0, 496.0, LINE),
    EntrySlot::new(0, 479.0, LINE),
    EntrySlot::new(0, 461.0, LINE),
    EntrySlot::new(0, 443.0, LINE),
    EntrySlot::new(0, 426.0, LINE),
];

const SIGNATURE: SignatureBox = SignatureBox {
    x: 108.0,
    y: 165.0,
    max_width: 200.0,
    max_height: 60.0,
    fallback_x: 85.0,
    fallback_y: 185.0,
};

pub(super) fn layout(ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
    let name = PersonName::new(&ctx.text("first_name"), &ctx.text("last_name"));
    let case_id = match ctx.text("case_id") {
        c if c.is_empty() => ctx.record().case_id(),
        c => c,
    };
    let address = ctx.data().address_over(&ctx.record().address());
    let phone = normalize_phone(&ctx.text("phone"));
    let diagnoses: Vec<DiagnosisEntry> = ctx.list("diagnoses");
    let signature = ctx.signature();
    let today = ctx.today_us();

    let mut pages = PageSet::new(StandardFont::Helvetica, FONT_SIZE);
    let behind = pages.page(0).behind();

    behind.draw_text(25.0, 615.0, &name.last);
    behind.draw_text(185.0, 615.0, &name.first);
    behind.draw_text(400.0, 615.0, &case_id);

    behind.draw_text(25.0, 582.0, &address.street);
    behind.draw_text(25.0, 555.0, &address.city);
    behind.draw_text(215.0, 555.0, &address.state);
    behind.draw_text(255.0, 555.0, &address.zip);

    behind.draw_text(355.0, 583.0, &phone.area);
    behind.draw_text(390.0, 583.0, &phone.prefix);
    behind.draw_text(428.0, 583.0, &phone.line);

    for (slot, diagnosis) in assign_entries(&diagnoses, &DIAGNOSIS_LINES, "diagnoses", ctx.warnings)
    {
        if let Some(y) = slot.y("diagnosis") {
            behind.draw_text(33.0, y, &diagnosis.diagnosis);
        }
        if let (Some(y), Some(parts)) = (slot.y("date"), date_parts(&diagnosis.date)) {
            behind.draw_text(510.0, y, &parts.month);
            behind.draw_text(543.0, y, &parts.day);
            behind.draw_text(568.0, y, &parts.year);
        }
    }

    behind.draw_signature(signature.as_ref(), SIGNATURE);
    behind.draw_text(385.0, 175.0, &today);

    Ok(FormPlan {
        overlays: pages.into_overlays(),
        subject: FileSubject::Person(name),
    })
}

#[cfg(test)]
mod tests {
    use crate::forms::testing::{run_layout, runs};
    use crate::forms::FormKind;
    use crate::pdf::{signature_png, Layer};
    use crate::warning::Warning;
    use base64::Engine;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_diagnoses_both_key_styles() {
        let data = json!({
            "first_name": "Ana",
            "last_name": "Lopez",
            "diagnoses": [
                { "diagnosis_text": "COPD", "diagnosis_date": "2021-06-09" },
                { "diagnosis": "Emphysema", "date": "11/30/2022" },
            ],
        });
        let (plan, warnings) = run_layout(FormKind::Ee1a, data, json!({ "Case ID": "500" }), 1);
        assert!(warnings.is_empty());
        assert!(runs(&plan, 0, Layer::Front).is_empty());

        let behind = runs(&plan, 0, Layer::Behind);
        for run in [
            (400.0, 615.0, "500"),
            (33.0, 496.0, "COPD"),
            (510.0, 496.0, "06"),
            (543.0, 496.0, "09"),
            (568.0, 496.0, "2021"),
            (33.0, 479.0, "Emphysema"),
            (568.0, 479.0, "2022"),
            (385.0, 175.0, "03/05/2024"),
        ] {
            assert!(
                behind.contains(&(run.0, run.1, run.2.to_string())),
                "missing {:?}",
                run
            );
        }
    }

    #[test]
    fn test_mixed_key_rows_keep_their_lines() {
        let data = json!({
            "diagnoses": [
                { "diagnosis": "A" },
                { "diagnosis": "", "diagnosis_text": "B", "date": "", "diagnosis_date": "2021-06-09" },
                { "diagnosis": "C" },
            ],
        });
        let (plan, warnings) = run_layout(FormKind::Ee1a, data, json!({}), 1);
        assert!(warnings.is_empty());

        let drawn: Vec<(f32, f32, String)> = runs(&plan, 0, Layer::Behind)
            .into_iter()
            .filter(|(x, _, _)| *x == 33.0)
            .collect();
        assert_eq!(
            drawn,
            vec![
                (33.0, 496.0, "A".to_string()),
                (33.0, 479.0, "B".to_string()),
                (33.0, 461.0, "C".to_string()),
            ]
        );
        assert!(runs(&plan, 0, Layer::Behind).contains(&(568.0, 479.0, "2021".to_string())));
    }

    #[test]
    fn test_unreadable_row_leaves_its_line_blank() {
        let data = json!({ "diagnoses": [{ "diagnosis": "A" }, 42, { "diagnosis": "C" }] });
        let (plan, warnings) = run_layout(FormKind::Ee1a, data, json!({}), 1);
        assert_eq!(
            warnings,
            vec![Warning::MalformedEntry {
                section: "diagnoses".to_string(),
                index: 1,
            }]
        );
        let behind = runs(&plan, 0, Layer::Behind);
        assert!(behind.contains(&(33.0, 461.0, "C".to_string())));
        assert!(!behind.iter().any(|(x, y, _)| *x == 33.0 && *y == 479.0));
    }

    #[test]
    fn test_sixth_diagnosis_dropped() {
        let diagnoses: Vec<_> = (1..=6)
            .map(|n| json!({ "diagnosis": format!("Dx {}", n) }))
            .collect();
        let (plan, warnings) =
            run_layout(FormKind::Ee1a, json!({ "diagnoses": diagnoses }), json!({}), 1);
        assert_eq!(
            warnings,
            vec![Warning::EntriesDropped {
                section: "diagnoses".to_string(),
                capacity: 5,
                dropped: 1,
            }]
        );
        let behind = runs(&plan, 0, Layer::Behind);
        assert!(behind.contains(&(33.0, 426.0, "Dx 5".to_string())));
        assert!(!behind.iter().any(|(_, _, t)| t == "Dx 6"));
    }

    #[test]
    fn test_signature_embedded_behind() {
        let png = signature_png(400, 120);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
        let data = json!({ "signature_file": { "data": encoded } });
        let (plan, warnings) = run_layout(FormKind::Ee1a, data, json!({}), 1);
        assert!(warnings.is_empty());

        let (behind, front) = plan.overlays[0].clone().into_layers();
        assert!(front.images().is_empty());
        let (_, image) = &behind.images()[0];
        // 400x120 into 200x60 halves both sides
        assert_eq!((image.width(), image.height()), (200, 60));
    }
}
