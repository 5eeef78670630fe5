//! Request bundles: client record, form data and the typed repeating entries
//! pulled out of them.

use super::normalize::{parse_client_name, Address, ClientName, DateInput};
use crate::error::Result;
use crate::warning::{Warning, Warnings};
use base64::Engine;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Render a scalar JSON value the way an operator typed it.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn value_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "x" | "1" | "on"
        ),
        _ => false,
    }
}

/// Record from the external client store: `{"fields": {"Name": ..., ...}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientRecord {
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl ClientRecord {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Field text, `""` when absent
    pub fn field(&self, key: &str) -> String {
        self.fields.get(key).map(value_text).unwrap_or_default()
    }

    pub fn raw_name(&self) -> String {
        self.field("Name")
    }

    /// Parse `Name` with the canonical `"Last, First - ####"` rule.
    pub fn name(&self) -> Result<ClientName> {
        parse_client_name(&self.raw_name())
    }

    pub fn case_id(&self) -> String {
        self.field("Case ID")
    }

    pub fn phone(&self) -> String {
        self.field("Phone")
    }

    /// Address from the split fields, falling back to the legacy single
    /// `Address` string when none of them are set.
    pub fn address(&self) -> Address {
        let split = Address::new(
            &self.field("Street Address"),
            &self.field("City"),
            &self.field("State"),
            &self.field("ZIP Code"),
        );
        if !split.is_empty() {
            return split;
        }
        Address::parse_legacy(&self.field("Address"))
    }
}

/// Operator-entered values for one submission
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FormData(pub Map<String, Value>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn text(&self, key: &str) -> String {
        self.get(key).map(value_text).unwrap_or_default()
    }

    /// First non-empty text among `keys`
    pub fn text_any(&self, keys: &[&str]) -> String {
        keys.iter()
            .map(|k| self.text(k))
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }

    pub fn date(&self, key: &str) -> DateInput {
        DateInput::from_json(self.get(key))
    }

    /// Repeating entries under `key`; see [`entry_list`].
    pub fn list<T>(&self, key: &str, warnings: &mut Warnings) -> Vec<T>
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        entry_list(self.get(key), key, warnings)
    }

    /// Address from `address_*` fields; any empty part is filled from `fallback`.
    pub fn address_over(&self, fallback: &Address) -> Address {
        let pick = |key: &str, fb: &str| {
            let v = self.text(key);
            if v.is_empty() {
                fb.to_string()
            } else {
                v
            }
        };
        Address::new(
            &pick("address_main", &fallback.street),
            &pick("address_city", &fallback.city),
            &pick("address_state", &fallback.state),
            &pick("address_zip", &fallback.zip),
        )
    }

    /// `signature_file` as either raw bytes (a JSON byte array) or a
    /// `{"data": "<base64>"}` payload.
    pub fn signature(&self) -> Option<SignaturePayload> {
        match self.get("signature_file")? {
            Value::Object(obj) => obj
                .get("data")
                .and_then(Value::as_str)
                .map(|s| SignaturePayload::Base64(s.to_string())),
            Value::String(s) if !s.trim().is_empty() => Some(SignaturePayload::Base64(s.clone())),
            Value::Array(items) => Some(SignaturePayload::Raw(
                items
                    .iter()
                    .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()).unwrap_or(0))
                    .collect(),
            )),
            _ => None,
        }
    }
}

impl From<Value> for FormData {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => FormData(map),
            _ => FormData::default(),
        }
    }
}

/// Deserialize repeating entries one element at a time. A missing or
/// non-array value is an empty list. An element that cannot be read keeps its
/// position as a blank entry and is reported as [`Warning::MalformedEntry`], so
/// later entries stay in their slots.
pub fn entry_list<T>(value: Option<&Value>, section: &str, warnings: &mut Warnings) -> Vec<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            T::deserialize(item).unwrap_or_else(|e| {
                tracing::debug!(section, index, error = %e, "unreadable entry");
                warnings.push(Warning::MalformedEntry {
                    section: section.to_string(),
                    index,
                });
                T::default()
            })
        })
        .collect()
}

/// Signature image input in either accepted shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignaturePayload {
    Raw(Vec<u8>),
    Base64(String),
}

impl SignaturePayload {
    /// Resolve to raw image bytes. A `data:image/...;base64,` prefix is
    /// accepted on the base64 form.
    pub fn resolve(&self) -> Result<Vec<u8>> {
        match self {
            SignaturePayload::Raw(bytes) => Ok(bytes.clone()),
            SignaturePayload::Base64(data) => {
                let data = data.trim();
                let data = match data.split_once(";base64,") {
                    Some((prefix, rest)) if prefix.starts_with("data:") => rest,
                    _ => data,
                };
                Ok(base64::engine::general_purpose::STANDARD.decode(data)?)
            }
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().map(value_text).unwrap_or_default())
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().is_some_and(value_flag))
}

fn lenient_date<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<DateInput, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(DateInput::from_json(value.as_ref()))
}

/// One employer on EE-3
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmploymentEntry {
    #[serde(default, deserialize_with = "lenient_date")]
    pub start_date: DateInput,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end_date: DateInput,
    #[serde(default, deserialize_with = "lenient_string")]
    pub facility_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub specific_location: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub contractor: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub position_title: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub union_member: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub dosimetry_worn: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub work_duties: String,
}

impl EmploymentEntry {
    /// Nothing was entered for this employer.
    pub fn is_blank(&self) -> bool {
        [
            &self.facility_name,
            &self.specific_location,
            &self.city,
            &self.state,
            &self.contractor,
            &self.position_title,
            &self.work_duties,
        ]
        .iter()
        .all(|s| s.is_empty())
            && self.start_date.is_missing()
            && self.end_date.is_missing()
            && !self.union_member
            && !self.dosimetry_worn
    }
}

/// Both spellings of a diagnosis row as submitted
#[derive(Deserialize)]
struct DiagnosisRow {
    #[serde(default, deserialize_with = "lenient_string")]
    diagnosis_text: String,
    #[serde(default, deserialize_with = "lenient_string")]
    diagnosis: String,
    #[serde(default, deserialize_with = "lenient_date")]
    diagnosis_date: DateInput,
    #[serde(default, deserialize_with = "lenient_date")]
    date: DateInput,
}

/// One diagnosis line on EE-1a. `diagnosis_text` and `diagnosis_date` win
/// over the older `diagnosis` and `date` keys unless they are empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "DiagnosisRow")]
pub struct DiagnosisEntry {
    pub diagnosis: String,
    pub date: DateInput,
}

impl From<DiagnosisRow> for DiagnosisEntry {
    fn from(row: DiagnosisRow) -> Self {
        let diagnosis = if row.diagnosis_text.is_empty() {
            row.diagnosis
        } else {
            row.diagnosis_text
        };
        let date = if row.diagnosis_date.is_missing() {
            row.date
        } else {
            row.diagnosis_date
        };
        Self { diagnosis, date }
    }
}

/// Lettered sub-diagnosis under an EE-1 category
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryDiagnosis {
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: DateInput,
}

/// One EE-1 diagnosis category checkbox with its date(s)
#[derive(Debug, Clone, Default)]
pub struct DiagnosisCategory {
    pub selected: bool,
    pub date: DateInput,
    pub diagnoses: Vec<CategoryDiagnosis>,
}

impl DiagnosisCategory {
    /// Read a category field by field, so one unreadable diagnosis row
    /// costs only that row. A non-object value is an unselected category.
    pub fn from_json(value: Option<&Value>, section: &str, warnings: &mut Warnings) -> Self {
        let Some(Value::Object(obj)) = value else {
            return Self::default();
        };
        Self {
            selected: obj.get("selected").is_some_and(value_flag),
            date: DateInput::from_json(obj.get("date")),
            diagnoses: entry_list(obj.get("diagnoses"), section, warnings),
        }
    }
}
