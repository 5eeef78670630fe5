//! Input normalization: dates, phones, SSNs, names, addresses, text wrapping
//! and the request bundles they come from.

pub mod input;
pub mod normalize;
pub mod wrap;

pub use input::{
    CategoryDiagnosis, ClientRecord, DiagnosisCategory, DiagnosisEntry, EmploymentEntry,
    FormData, SignaturePayload,
};
pub use normalize::{
    city_state, date_parts, display_ssn, normalize_date, normalize_phone, normalize_ssn,
    parse_client_name, parse_date, spaced_date, state_abbreviation, Address, ClientName,
    DateInput, DateParts, PersonName, PhoneParts, SsnParts, FILENAME_DATE, LETTER_DATE, US_DATE,
};
pub use wrap::{wrap, Wrapped};
