//! Form registry and per-form layouts
//!
//! Every supported form is a [`FormKind`]. A kind knows its code, filename
//! prefix, template file(s) and how to lay its fields out; the
//! [`FormGenerator`] facade does the rest the same way for all of them.

mod ee1;
mod ee10;
mod ee1a;
mod ee3;
mod en11a;
mod en16;
pub mod filename;
mod generator;
mod letters;
mod referral;

pub use filename::{suggested_filename, FileSubject};
pub use generator::{FormGenerator, FormRequest, GeneratedForm, GeneratorConfig};

use crate::error::{Error, Result};
use crate::fields::{
    normalize::format_date, ClientRecord, FormData, SignaturePayload, LETTER_DATE, US_DATE,
};
use crate::pdf::{PageOverlay, StandardFont};
use crate::warning::Warnings;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A supported form or letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FormKind {
    Ee1,
    Ee1a,
    Ee3,
    Ee10,
    En11a,
    En16,
    DesertPulmReferral,
    IrNotice,
    WithdrawalLetter,
    AddressChange,
    RdAcceptWaiver,
}

impl FormKind {
    pub const ALL: [FormKind; 11] = [
        FormKind::Ee1,
        FormKind::Ee1a,
        FormKind::Ee3,
        FormKind::Ee10,
        FormKind::En11a,
        FormKind::En16,
        FormKind::DesertPulmReferral,
        FormKind::IrNotice,
        FormKind::WithdrawalLetter,
        FormKind::AddressChange,
        FormKind::RdAcceptWaiver,
    ];

    pub fn code(self) -> &'static str {
        match self {
            FormKind::Ee1 => "EE-1",
            FormKind::Ee1a => "EE-1a",
            FormKind::Ee3 => "EE-3",
            FormKind::Ee10 => "EE-10",
            FormKind::En11a => "EN-11A",
            FormKind::En16 => "EN-16",
            FormKind::DesertPulmReferral => "DESERT-PULM-REFERRAL",
            FormKind::IrNotice => "IR-NOTICE",
            FormKind::WithdrawalLetter => "WITHDRAWAL-LETTER",
            FormKind::AddressChange => "ADDRESS-CHANGE",
            FormKind::RdAcceptWaiver => "RD-ACCEPT-WAIVER",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FormKind::Ee1 => "Claim for employee benefits (cancer, beryllium, silicosis, other conditions)",
            FormKind::Ee1a => "Claim for additional diagnosed conditions",
            FormKind::Ee3 => "Employment history (up to 3 employers)",
            FormKind::Ee10 => "Impairment or wage-loss claim, provider-specific template",
            FormKind::En11a => "Medical provider authorization, provider-specific template",
            FormKind::En16 => "Claimant authorization with signature date on the last page",
            FormKind::DesertPulmReferral => "Two-page pulmonology referral",
            FormKind::IrNotice => "Impairment rating appointment notice letter",
            FormKind::WithdrawalLetter => "Claim withdrawal letter",
            FormKind::AddressChange => "Address change notification letter",
            FormKind::RdAcceptWaiver => "Recommended decision acceptance waiver",
        }
    }

    pub fn filename_prefix(self) -> &'static str {
        match self {
            FormKind::Ee1 => "EE1",
            FormKind::Ee1a => "EE1a",
            FormKind::Ee3 => "EE3",
            FormKind::Ee10 => "EE10",
            FormKind::En11a => "EN11A",
            FormKind::En16 => "EN16",
            FormKind::DesertPulmReferral => "Desert_Pulm_Referral",
            FormKind::IrNotice => "IR_Notice",
            FormKind::WithdrawalLetter => "Withdrawal_Letter",
            FormKind::AddressChange => "Address_Change",
            FormKind::RdAcceptWaiver => "RD_accept_waiver",
        }
    }

    /// Every template file this kind can draw on, default variant first
    pub fn templates(self) -> &'static [&'static str] {
        match self {
            FormKind::Ee1 => &["EE-1.pdf"],
            FormKind::Ee1a => &["EE-1a.pdf"],
            FormKind::Ee3 => &["EE-3.pdf"],
            FormKind::Ee10 => &["EE-10_lewis.pdf", "EE-10_la_plata.pdf"],
            FormKind::En11a => &["en11a_lewis.pdf", "en11a_kalcich.pdf"],
            FormKind::En16 => &["en-16.pdf"],
            FormKind::DesertPulmReferral => &["desert_pulm_la_plata_ref.pdf"],
            FormKind::IrNotice => &["ir_notice_la_plata.pdf"],
            FormKind::WithdrawalLetter => &["withdraw_letter.pdf"],
            FormKind::AddressChange => &["Address Change Template.pdf"],
            FormKind::RdAcceptWaiver => &["rd_accept_waiver.pdf"],
        }
    }

    /// Template file for a provider selection.
    pub fn template_for(self, provider: &str) -> &'static str {
        let provider = provider.trim();
        match self {
            FormKind::Ee10 if provider == "La Plata" => "EE-10_la_plata.pdf",
            FormKind::En11a if en11a::is_kalcich(provider) => "en11a_kalcich.pdf",
            _ => self.templates()[0],
        }
    }

    /// Output page cap; pages past it are dropped from the template.
    pub fn max_pages(self) -> Option<usize> {
        match self {
            FormKind::Ee3 => Some(3),
            _ => None,
        }
    }

    pub(crate) fn layout(self, ctx: &mut LayoutContext<'_>) -> Result<FormPlan> {
        match self {
            FormKind::Ee1 => ee1::layout(ctx),
            FormKind::Ee1a => ee1a::layout(ctx),
            FormKind::Ee3 => ee3::layout(ctx),
            FormKind::Ee10 => ee10::layout(ctx),
            FormKind::En11a => en11a::layout(ctx),
            FormKind::En16 => en16::layout(ctx),
            FormKind::DesertPulmReferral => referral::layout(ctx),
            FormKind::IrNotice => letters::ir_notice(ctx),
            FormKind::WithdrawalLetter => letters::withdrawal(ctx),
            FormKind::AddressChange => letters::address_change(ctx),
            FormKind::RdAcceptWaiver => letters::rd_accept_waiver(ctx),
        }
    }
}

fn code_key(code: &str) -> String {
    code.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for FormKind {
    type Err = Error;

    /// Codes match case-insensitively, ignoring hyphens, underscores and spaces.
    fn from_str(s: &str) -> Result<Self> {
        let key = code_key(s);
        FormKind::ALL
            .into_iter()
            .find(|kind| code_key(kind.code()) == key)
            .ok_or_else(|| Error::UnknownForm {
                code: s.to_string(),
            })
    }
}

impl TryFrom<String> for FormKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FormKind> for String {
    fn from(kind: FormKind) -> Self {
        kind.code().to_string()
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Everything a layout needs for one generation run
pub(crate) struct LayoutContext<'a> {
    pub kind: FormKind,
    pub request: &'a FormRequest,
    pub today: NaiveDate,
    pub page_count: usize,
    pub warnings: &'a mut Warnings,
}

impl LayoutContext<'_> {
    pub fn data(&self) -> &FormData {
        &self.request.form_data
    }

    pub fn record(&self) -> &ClientRecord {
        &self.request.client_record
    }

    pub fn text(&self, key: &str) -> String {
        self.request.form_data.text(key)
    }

    /// Repeating entries from the form data; unreadable rows become warnings.
    pub fn list<T>(&mut self, key: &str) -> Vec<T>
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        self.request.form_data.list(key, self.warnings)
    }

    pub fn signature(&self) -> Option<SignaturePayload> {
        self.request.signature()
    }

    /// Today as `MM/DD/YYYY`
    pub fn today_us(&self) -> String {
        format_date(self.today, US_DATE).unwrap_or_default()
    }

    /// Today as `Month DD, YYYY`
    pub fn today_long(&self) -> String {
        format_date(self.today, LETTER_DATE).unwrap_or_default()
    }

    pub fn last_page(&self) -> usize {
        self.page_count.saturating_sub(1)
    }

    pub fn missing(&self, field: &str) -> Error {
        Error::MissingField {
            form: self.kind.code().to_string(),
            field: field.to_string(),
        }
    }
}

/// One overlay per touched page, created on first use
pub(crate) struct PageSet {
    font: StandardFont,
    size: f32,
    pages: BTreeMap<usize, PageOverlay>,
}

impl PageSet {
    pub fn new(font: StandardFont, size: f32) -> Self {
        Self {
            font,
            size,
            pages: BTreeMap::new(),
        }
    }

    pub fn page(&mut self, index: usize) -> &mut PageOverlay {
        let (font, size) = (self.font, self.size);
        self.pages
            .entry(index)
            .or_insert_with(|| PageOverlay::new(index, font, size))
    }

    pub fn into_overlays(self) -> Vec<PageOverlay> {
        self.pages.into_values().collect()
    }
}

/// What a layout produces: per-page overlays plus the filename subject
pub(crate) struct FormPlan {
    pub overlays: Vec<PageOverlay>,
    pub subject: FileSubject,
}
