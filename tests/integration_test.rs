//! Integration tests for the claim form generator
//!
//! Templates are synthesized with lopdf into a temp directory; generated
//! documents are reloaded and inspected through their content operations.

use base64::Engine;
use chrono::NaiveDate;
use claim_forms_mcp::fields::{ClientRecord, FormData, SignaturePayload};
use claim_forms_mcp::pdf::SIGNATURE_FALLBACK_TEXT;
use claim_forms_mcp::{
    Error, FormGenerator, FormKind, FormRequest, GeneratedForm, GeneratorConfig, Warning,
};
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{json, Value};
use std::io::Cursor;
use tempfile::TempDir;

const TEMPLATE_RULE: &[u8] = b"20 100 m 592 100 l S";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
}

/// A US-Letter template whose pages each draw one horizontal rule.
fn template(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, TEMPLATE_RULE.to_vec()));
            Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            }))
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {},
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn setup(files: &[(&str, usize)]) -> (TempDir, FormGenerator) {
    let dir = tempfile::tempdir().unwrap();
    for (name, pages) in files {
        std::fs::write(dir.path().join(name), template(*pages)).unwrap();
    }
    let generator = FormGenerator::new(GeneratorConfig {
        template_dir: dir.path().to_path_buf(),
    });
    (dir, generator)
}

fn request(record: Value, data: Value) -> FormRequest {
    let record: ClientRecord = serde_json::from_value(json!({ "fields": record })).unwrap();
    FormRequest::new(record, FormData::from(data))
}

fn signature_png(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for x in 0..width {
        img.put_pixel(x, height / 2, Rgba([0, 0, 0, 255]));
    }
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn number(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r,
        other => panic!("not a number: {:?}", other),
    }
}

fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// `(x, y, text)` for every text run in a content stream
fn runs_in(bytes: &[u8]) -> Vec<(f32, f32, String)> {
    let content = Content::decode(bytes).unwrap();
    let mut runs = Vec::new();
    let mut pos = (0.0, 0.0);
    for op in content.operations {
        match op.operator.as_str() {
            "Td" => pos = (number(&op.operands[0]), number(&op.operands[1])),
            "Tj" => {
                if let Object::String(bytes, _) = &op.operands[0] {
                    let text = bytes.iter().map(|b| char::from(*b)).collect();
                    runs.push((pos.0, pos.1, text));
                }
            }
            _ => {}
        }
    }
    runs
}

fn page_runs(doc: &Document, page: usize) -> Vec<(f32, f32, String)> {
    let content = doc.get_page_content(page_ids(doc)[page]).unwrap();
    runs_in(&content)
}

fn texts(form: &GeneratedForm) -> Vec<String> {
    let doc = Document::load_mem(&form.pdf).unwrap();
    (0..doc.get_pages().len())
        .flat_map(|p| page_runs(&doc, p))
        .map(|(_, _, t)| t)
        .collect()
}

/// Content streams of a page, decoded, in paint order
fn content_streams(doc: &Document, page: usize) -> Vec<Vec<u8>> {
    doc.get_page_contents(page_ids(doc)[page])
        .into_iter()
        .map(|id| {
            let stream = doc.get_object(id).unwrap().as_stream().unwrap();
            stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone())
        })
        .collect()
}

fn ee10_request() -> FormRequest {
    request(
        json!({ "Name": "Smith, John - 1234" }),
        json!({
            "name": "John Smith",
            "case_id": "1234",
            "phone": "555-123-4567",
            "claim_type": "Initial Impairment Claim",
        }),
    )
    .with_doctor("La Plata")
}

#[test]
fn test_ee10_happy_path() {
    let (_dir, generator) = setup(&[("EE-10_la_plata.pdf", 1)]);
    let form = generator
        .generate_on(FormKind::Ee10, &ee10_request(), today())
        .unwrap();

    assert_eq!(form.filename, "EE10_J.Smith_03.05.24.pdf");
    assert_eq!(form.page_count, 1);
    assert!(form.warnings.is_empty());

    let doc = Document::load_mem(&form.pdf).unwrap();
    let runs = page_runs(&doc, 0);
    for expected in [
        (355.0, 612.0, "555"),
        (390.0, 612.0, "123"),
        (425.0, 612.0, "4567"),
        (27.0, 487.0, "X"),
    ] {
        assert!(
            runs.contains(&(expected.0, expected.1, expected.2.to_string())),
            "missing {:?}",
            expected
        );
    }
    assert!(!runs.iter().any(|(x, y, _)| *x == 27.0 && *y == 375.0));
}

#[test]
fn test_ee10_uses_lewis_template_by_default() {
    let (_dir, generator) = setup(&[("EE-10_lewis.pdf", 1)]);
    let mut req = ee10_request();
    req.doctor = None;
    assert!(generator.generate_on(FormKind::Ee10, &req, today()).is_ok());

    let err = generator
        .generate_on(FormKind::Ee10, &ee10_request(), today())
        .unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound { .. }));
}

#[test]
fn test_generation_is_idempotent() {
    let (_dir, generator) = setup(&[("EE-10_la_plata.pdf", 1)]);
    let first = generator
        .generate_on(FormKind::Ee10, &ee10_request(), today())
        .unwrap();
    let second = generator
        .generate_on(FormKind::Ee10, &ee10_request(), today())
        .unwrap();
    assert_eq!(first.pdf, second.pdf);
    assert_eq!(first.filename, second.filename);

    let later = generator
        .generate_on(
            FormKind::Ee10,
            &ee10_request(),
            NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
        )
        .unwrap();
    assert_ne!(first.pdf, later.pdf);
    assert_eq!(later.filename, "EE10_J.Smith_03.06.24.pdf");
}

#[test]
fn test_ee3_capacity_truncation() {
    let (_dir, generator) = setup(&[("EE-3.pdf", 4)]);
    let history: Vec<Value> = (1..=5)
        .map(|n| json!({ "facility_name": format!("Facility {}", n), "start_date": "1990-01-01" }))
        .collect();
    let req = request(
        json!({}),
        json!({
            "first_name": "John",
            "last_name": "Smith",
            "employment_history": history,
        }),
    );
    let form = generator.generate_on(FormKind::Ee3, &req, today()).unwrap();

    assert_eq!(form.page_count, 3);
    assert_eq!(form.filename, "EE3_J.Smith_03.05.24.pdf");
    assert_eq!(
        form.warnings,
        vec![Warning::EntriesDropped {
            section: "employment_history".to_string(),
            capacity: 3,
            dropped: 2,
        }]
    );

    let all = texts(&form);
    for n in 1..=3 {
        assert!(all.contains(&format!("Facility {}", n)));
    }
    assert!(!all.contains(&"Facility 4".to_string()));
    assert!(!all.contains(&"Facility 5".to_string()));

    // every page past the first carries the date stamp
    let doc = Document::load_mem(&form.pdf).unwrap();
    assert!(page_runs(&doc, 1).contains(&(385.0, 60.0, "03/05/2024".to_string())));
    assert!(page_runs(&doc, 2).contains(&(500.0, 50.0, "03/05/2024".to_string())));
}

#[test]
fn test_undecodable_signature_degrades() {
    let (_dir, generator) = setup(&[("EE-1.pdf", 1)]);
    let req = request(
        json!({}),
        json!({
            "first_name": "John",
            "last_name": "Smith",
            "signature_file": [1, 2, 3, 4],
        }),
    );
    let form = generator.generate_on(FormKind::Ee1, &req, today()).unwrap();

    assert!(matches!(
        form.warnings.as_slice(),
        [Warning::SignatureFallback { .. }]
    ));
    let doc = Document::load_mem(&form.pdf).unwrap();
    let runs = page_runs(&doc, 0);
    assert!(runs.contains(&(100.0, 155.0, SIGNATURE_FALLBACK_TEXT.to_string())));
    assert!(runs.contains(&(25.0, 645.0, "Smith".to_string())));
    assert!(runs.contains(&(185.0, 645.0, "John".to_string())));
}

#[test]
fn test_signature_scaled_and_flattened() {
    let (_dir, generator) = setup(&[("EE-1.pdf", 1)]);
    let mut data = FormData::default();
    data.insert("last_name", "Smith");
    let req = FormRequest::new(ClientRecord::default(), data)
        .with_signature(SignaturePayload::Raw(signature_png(600, 100)));
    let form = generator.generate_on(FormKind::Ee1, &req, today()).unwrap();
    assert!(form.warnings.is_empty());

    let doc = Document::load_mem(&form.pdf).unwrap();
    let page = doc.get_dictionary(page_ids(&doc)[0]).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    assert_eq!(xobjects.len(), 1);

    let (_, reference) = xobjects.iter().next().unwrap();
    let image = doc
        .get_object(reference.as_reference().unwrap())
        .unwrap()
        .as_stream()
        .unwrap();
    // 600x100 into 150x50: width binds at a quarter
    assert_eq!(number(image.dict.get(b"Width").unwrap()), 150.0);
    assert_eq!(number(image.dict.get(b"Height").unwrap()), 25.0);
    assert_eq!(
        image.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
        b"DeviceRGB"
    );
}

#[test]
fn test_base64_and_raw_signatures_match() {
    let (_dir, generator) = setup(&[("EE-1a.pdf", 1)]);
    let png = signature_png(80, 30);

    let raw = FormRequest::default().with_signature(SignaturePayload::Raw(png.clone()));
    let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
    let wrapped = request(json!({}), json!({ "signature_file": { "data": encoded } }));

    let a = generator.generate_on(FormKind::Ee1a, &raw, today()).unwrap();
    let b = generator.generate_on(FormKind::Ee1a, &wrapped, today()).unwrap();
    assert_eq!(a.pdf, b.pdf);
}

#[rstest]
#[case(FormKind::En16, "en-16.pdf")]
#[case(FormKind::En11a, "en11a_lewis.pdf")]
fn test_malformed_client_name_is_fatal(#[case] kind: FormKind, #[case] file: &str) {
    let (_dir, generator) = setup(&[(file, 2)]);
    let req = request(json!({ "Name": "John Smith 1234" }), json!({}));
    let err = generator.generate_on(kind, &req, today()).unwrap_err();
    assert!(matches!(err, Error::MalformedClientName { .. }));
    assert!(err.client_message().contains("Last, First"));
}

#[test]
fn test_missing_template_is_fatal() {
    let (_dir, generator) = setup(&[]);
    for kind in FormKind::ALL {
        let err = generator
            .generate_on(kind, &FormRequest::default(), today())
            .unwrap_err();
        assert!(
            matches!(err, Error::TemplateNotFound { .. } | Error::MalformedClientName { .. }),
            "{}: {:?}",
            kind,
            err
        );
    }
}

#[test]
fn test_en16_middle_pages_untouched() {
    let (_dir, generator) = setup(&[("en-16.pdf", 4)]);
    let req = request(json!({ "Name": "Smith, John - 1234", "Case ID": "C-1" }), json!({}));
    let form = generator.generate_on(FormKind::En16, &req, today()).unwrap();
    assert_eq!(form.filename, "EN16_J.Smith_03.05.24.pdf");
    assert_eq!(form.page_count, 4);

    let doc = Document::load_mem(&form.pdf).unwrap();
    for middle in [1, 2] {
        assert_eq!(content_streams(&doc, middle), vec![TEMPLATE_RULE.to_vec()]);
    }
    assert!(page_runs(&doc, 0).contains(&(355.0, 695.0, "John Smith".to_string())));
    assert_eq!(
        page_runs(&doc, 3),
        vec![(250.0, 227.0, "03/05/2024".to_string())]
    );
}

#[test]
fn test_behind_and_front_z_order() {
    let (_dir, generator) = setup(&[("EE-1.pdf", 1)]);
    let req = request(
        json!({}),
        json!({ "first_name": "John", "last_name": "Smith", "sex": "Female" }),
    );
    let form = generator.generate_on(FormKind::Ee1, &req, today()).unwrap();
    let doc = Document::load_mem(&form.pdf).unwrap();

    let streams = content_streams(&doc, 0);
    let template_at = streams
        .iter()
        .position(|s| s.as_slice() == TEMPLATE_RULE)
        .unwrap();

    let behind = runs_in(&streams[0]);
    assert!(behind.contains(&(25.0, 645.0, "Smith".to_string())));
    assert!(template_at > 0);

    let front = runs_in(streams.last().unwrap());
    assert_eq!(front, vec![(247.0, 615.0, "X".to_string())]);
    assert!(template_at < streams.len() - 1);
}

#[test]
fn test_overlay_fonts_registered_on_page() {
    let (_dir, generator) = setup(&[("withdraw_letter.pdf", 1)]);
    let req = request(json!({}), json!({ "claimant_name": "Jane Doe" }));
    let form = generator
        .generate_on(FormKind::WithdrawalLetter, &req, today())
        .unwrap();
    assert_eq!(form.filename, "Withdrawal_Letter_Jane_Doe_03.05.24.pdf");

    let doc = Document::load_mem(&form.pdf).unwrap();
    let page = doc.get_dictionary(page_ids(&doc)[0]).unwrap();
    let fonts = page
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap()
        .get(b"Font")
        .unwrap()
        .as_dict()
        .unwrap();
    let font = doc
        .get_dictionary(fonts.get(b"OvF3").unwrap().as_reference().unwrap())
        .unwrap();
    assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Times-Roman");
    assert_eq!(
        font.get(b"Encoding").unwrap().as_name().unwrap(),
        b"WinAnsiEncoding"
    );
}

#[test]
fn test_legacy_and_split_addresses_match() {
    let (_dir, generator) = setup(&[("EE-10_lewis.pdf", 1)]);
    let split = request(
        json!({
            "Street Address": "123 Main St",
            "City": "Springfield",
            "State": "Illinois",
            "ZIP Code": "62701",
        }),
        json!({}),
    );
    let legacy = request(json!({ "Address": "123 Main St, Springfield, IL 62701" }), json!({}));

    let a = generator.generate_on(FormKind::Ee10, &split, today()).unwrap();
    let b = generator.generate_on(FormKind::Ee10, &legacy, today()).unwrap();
    assert_eq!(a.pdf, b.pdf);
    assert!(texts(&a).contains(&"IL".to_string()));
}

#[test]
fn test_unmappable_text_warns() {
    let (_dir, generator) = setup(&[("EE-10_lewis.pdf", 1)]);
    let req = request(json!({}), json!({ "name": "Zoë 日本" }));
    let form = generator.generate_on(FormKind::Ee10, &req, today()).unwrap();
    assert_eq!(
        form.warnings,
        vec![Warning::UnmappableText {
            location: "page 1 at (25, 644)".to_string(),
            replaced: 2,
        }]
    );
    assert!(texts(&form).contains(&"Zoë ??".to_string()));
}
