//! Field normalization
//!
//! Turns heterogeneous operator input (dates in several spellings, free-form
//! phone numbers and SSNs, client-record name strings, split or legacy
//! addresses) into the display strings and component tuples the form layouts
//! place on the page. Everything here is best-effort: apart from
//! [`parse_client_name`], no function returns an error.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::fmt::Write;

/// `03/05/2024`
pub const US_DATE: &str = "%m/%d/%Y";
/// `03.05.24`, used in suggested filenames
pub const FILENAME_DATE: &str = "%m.%d.%y";
/// `March 05, 2024`, used in letters
pub const LETTER_DATE: &str = "%B %d, %Y";

/// A date-like input value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DateInput {
    #[default]
    Missing,
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl DateInput {
    /// Interpret a JSON form value as a date input.
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) | Some(Value::Bool(false)) => DateInput::Missing,
            Some(Value::String(s)) if s.trim().is_empty() => DateInput::Missing,
            Some(Value::String(s)) => DateInput::Text(s.clone()),
            Some(other) => DateInput::Text(other.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            DateInput::Missing => true,
            DateInput::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

impl From<String> for DateInput {
    fn from(s: String) -> Self {
        DateInput::Text(s)
    }
}

impl From<NaiveDate> for DateInput {
    fn from(d: NaiveDate) -> Self {
        DateInput::Date(d)
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(dt: NaiveDateTime) -> Self {
        DateInput::DateTime(dt)
    }
}

impl<T: Into<DateInput>> From<Option<T>> for DateInput {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DateInput::Missing)
    }
}

/// Parse a date input, trying `YYYY-MM-DD`, then `MM/DD/YYYY`, then ISO-8601
/// timestamps (with or without an offset).
pub fn parse_date(input: &DateInput) -> Option<NaiveDate> {
    match input {
        DateInput::Missing => None,
        DateInput::Date(d) => Some(*d),
        DateInput::DateTime(dt) => Some(dt.date()),
        DateInput::Text(raw) => {
            let s = raw.trim();
            if s.is_empty() {
                return None;
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
                .ok()
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|dt| dt.date())
                })
        }
    }
}

/// Format a date with a strftime pattern without panicking on a bad pattern.
pub fn format_date(date: NaiveDate, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(format)).ok()?;
    Some(out)
}

/// Normalize a date-like value into `format`.
///
/// Returns `""` for absent input and the original text when nothing parses.
pub fn normalize_date(input: impl Into<DateInput>, format: &str) -> String {
    let input = input.into();
    if input.is_missing() {
        return String::new();
    }
    if let Some(formatted) = parse_date(&input).and_then(|d| format_date(d, format)) {
        return formatted;
    }
    match input {
        DateInput::Text(s) => s,
        DateInput::Date(d) => d.to_string(),
        DateInput::DateTime(dt) => dt.to_string(),
        DateInput::Missing => String::new(),
    }
}

/// Month / day / year components of a date, zero-padded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParts {
    pub month: String,
    pub day: String,
    pub year: String,
}

pub fn date_parts(input: &DateInput) -> Option<DateParts> {
    let date = parse_date(input)?;
    Some(DateParts {
        month: format_date(date, "%m")?,
        day: format_date(date, "%d")?,
        year: format_date(date, "%Y")?,
    })
}

/// Render `MM<gap>DD<gap>YYYY` for forms whose date boxes are one field with
/// printed separators. Returns `""` when the input does not parse.
pub fn spaced_date(input: &DateInput, gap: usize) -> String {
    match date_parts(input) {
        Some(parts) => {
            let sep = " ".repeat(gap);
            format!("{}{sep}{}{sep}{}", parts.month, parts.day, parts.year)
        }
        None => String::new(),
    }
}

/// Area code / prefix / line number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneParts {
    pub area: String,
    pub prefix: String,
    pub line: String,
}

impl PhoneParts {
    pub fn is_empty(&self) -> bool {
        self.area.is_empty() && self.prefix.is_empty() && self.line.is_empty()
    }

    /// `(555) 123-4567`, or `""` when empty
    pub fn display(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!("({}) {}-{}", self.area, self.prefix, self.line)
    }
}

fn digits_of(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Split a phone number into its three parts.
///
/// Anything that is not exactly ten digits after stripping yields the empty
/// triple; completeness checks belong to the caller.
pub fn normalize_phone(raw: &str) -> PhoneParts {
    let digits = digits_of(raw);
    if digits.len() != 10 {
        return PhoneParts::default();
    }
    PhoneParts {
        area: digits[..3].to_string(),
        prefix: digits[3..6].to_string(),
        line: digits[6..].to_string(),
    }
}

/// Area / group / serial of a social security number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsnParts {
    pub area: String,
    pub group: String,
    pub serial: String,
}

impl SsnParts {
    pub fn is_empty(&self) -> bool {
        self.area.is_empty()
    }

    pub fn display(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!("{}-{}-{}", self.area, self.group, self.serial)
    }
}

/// Same strip-and-slice rule as [`normalize_phone`], for nine digits.
pub fn normalize_ssn(raw: &str) -> SsnParts {
    let digits = digits_of(raw);
    if digits.len() != 9 {
        return SsnParts::default();
    }
    SsnParts {
        area: digits[..3].to_string(),
        group: digits[3..5].to_string(),
        serial: digits[5..].to_string(),
    }
}

/// SSN as printed on a form: canonical `123-45-6789` when complete, otherwise
/// whatever the operator typed (e.g. a last-four fragment).
pub fn display_ssn(raw: &str) -> String {
    let parts = normalize_ssn(raw);
    if parts.is_empty() {
        raw.trim().to_string()
    } else {
        parts.display()
    }
}

/// A person's first and last name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

impl PersonName {
    pub fn new(first: &str, last: &str) -> Self {
        Self {
            first: first.trim().to_string(),
            last: last.trim().to_string(),
        }
    }

    /// Split a free-form `"First Last"` string at the first whitespace.
    pub fn from_full(full: &str) -> Self {
        let full = full.trim();
        match full.split_once(char::is_whitespace) {
            Some((first, last)) => Self::new(first, last),
            None => Self::new(full, ""),
        }
    }

    /// First and last word of a free-form name; middle names are dropped.
    pub fn from_outer_words(full: &str) -> Self {
        let mut words = full.split_whitespace();
        let first = words.next().unwrap_or_default();
        let last = words.next_back().unwrap_or_default();
        Self::new(first, last)
    }

    pub fn is_complete(&self) -> bool {
        !self.first.is_empty() && !self.last.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.last.is_empty()
    }

    pub fn initial(&self) -> Option<char> {
        self.first.chars().next()
    }

    /// `First Last`
    pub fn display(&self) -> String {
        format!("{} {}", self.first, self.last).trim().to_string()
    }

    /// `Last, First`, or `""` unless both parts are present
    pub fn last_first(&self) -> String {
        if self.is_complete() {
            format!("{}, {}", self.last, self.first)
        } else {
            String::new()
        }
    }
}

/// A client-record name of the form `"Last, First - 1234"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientName {
    pub name: PersonName,
    /// Whatever followed the hyphen, typically the last four of the SSN
    pub suffix: Option<String>,
}

fn malformed(raw: &str, reason: &str) -> Error {
    Error::MalformedClientName {
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a client-record name.
///
/// Splits on the first comma; the remainder is split at the first `" - "` if
/// present, otherwise at the first `-`.
pub fn parse_client_name(raw: &str) -> Result<ClientName> {
    let (last, rest) = raw
        .split_once(',')
        .ok_or_else(|| malformed(raw, "missing ',' between last and first name"))?;

    let (first, suffix) = match rest.split_once(" - ").or_else(|| rest.split_once('-')) {
        Some((first, suffix)) => (first, Some(suffix.trim().to_string())),
        None => (rest, None),
    };

    let name = PersonName::new(first, last);
    if name.last.is_empty() {
        return Err(malformed(raw, "empty last name"));
    }
    if name.first.is_empty() {
        return Err(malformed(raw, "empty first name"));
    }

    Ok(ClientName {
        name,
        suffix: suffix.filter(|s| !s.is_empty()),
    })
}

/// A postal address split into the parts forms print separately
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

fn looks_like_zip(token: &str) -> bool {
    let digits = token.chars().filter(char::is_ascii_digit).count();
    digits >= 5 && token.chars().all(|c| c.is_ascii_digit() || c == '-')
}

impl Address {
    pub fn new(street: &str, city: &str, state: &str, zip: &str) -> Self {
        Self {
            street: street.trim().to_string(),
            city: city.trim().to_string(),
            state: state_abbreviation(state),
            zip: zip.trim().to_string(),
        }
    }

    /// Parse a legacy one-line address such as
    /// `"123 Main St, Springfield, IL 62701"` or `"123 Main St, Springfield IL 62701"`.
    pub fn parse_legacy(raw: &str) -> Self {
        let parts: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        let Some((&street, rest)) = parts.split_first() else {
            return Self::default();
        };
        let Some((&tail, middle)) = rest.split_last() else {
            return Self::new(street, "", "", "");
        };

        let mut tokens: Vec<&str> = tail.split_whitespace().collect();
        let zip = match tokens.last() {
            Some(t) if looks_like_zip(t) => tokens.pop().unwrap_or_default(),
            _ => "",
        };

        let (city, state) = if middle.is_empty() {
            // "Springfield IL" shares one segment
            match tokens.split_last() {
                Some((last, city_tokens))
                    if last.len() == 2 && last.chars().all(|c| c.is_ascii_alphabetic()) =>
                {
                    (city_tokens.join(" "), last.to_string())
                }
                _ => (tokens.join(" "), String::new()),
            }
        } else {
            (middle.join(", "), tokens.join(" "))
        };

        Self::new(street, &city, &state, zip)
    }

    pub fn is_empty(&self) -> bool {
        self.street.is_empty() && self.city.is_empty() && self.state.is_empty() && self.zip.is_empty()
    }

    /// `City, ST 12345`, omitting absent parts
    pub fn city_state_zip(&self) -> String {
        let state_zip = format!("{} {}", self.state, self.zip).trim().to_string();
        match (self.city.is_empty(), state_zip.is_empty()) {
            (false, false) => format!("{}, {}", self.city, state_zip),
            (false, true) => self.city.clone(),
            (true, _) => state_zip,
        }
    }

    /// `123 Main St, City, ST 12345`
    pub fn one_line(&self) -> String {
        [self.street.clone(), self.city_state_zip()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `City, ST` for forms with a combined city/state box
pub fn city_state(city: &str, state: &str) -> String {
    let city = city.trim();
    let state = state_abbreviation(state);
    match (city.is_empty(), state.is_empty()) {
        (false, false) => format!("{}, {}", city, state),
        (false, true) => city.to_string(),
        (true, _) => state,
    }
}

const STATES: &[(&str, &str)] = &[
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
    ("District of Columbia", "DC"),
    ("Puerto Rico", "PR"),
    ("Virgin Islands", "VI"),
    ("American Samoa", "AS"),
    ("Guam", "GU"),
    ("Northern Mariana Islands", "MP"),
];

/// Map a full state name to its two-letter code. Two-letter input is
/// upper-cased; anything unrecognized is returned trimmed.
pub fn state_abbreviation(state: &str) -> String {
    let state = state.trim();
    if let Some((_, abbr)) = STATES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(state))
    {
        return abbr.to_string();
    }
    if state.len() == 2 && state.chars().all(|c| c.is_ascii_alphabetic()) {
        return state.to_ascii_uppercase();
    }
    state.to_string()
}
