//! Suggested output filenames
//!
//! Never fails: empty or partial names fall back to `Unknown`.

use crate::fields::{normalize::format_date, PersonName, FILENAME_DATE};
use chrono::NaiveDate;

/// Who a generated document is about, as far as its filename is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSubject {
    /// `F.Last`
    Person(PersonName),
    /// Full name with spaces turned into underscores, commas removed
    FullName(String),
    Unknown,
}

impl FileSubject {
    fn render(&self) -> String {
        match self {
            FileSubject::Person(name) => match (name.initial(), name.is_complete()) {
                (Some(initial), true) => format!("{}.{}", initial, name.last),
                _ => "Unknown".to_string(),
            },
            FileSubject::FullName(full) => {
                let joined = full
                    .replace(',', "")
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join("_");
                if joined.is_empty() {
                    "Unknown".to_string()
                } else {
                    joined
                }
            }
            FileSubject::Unknown => "Unknown".to_string(),
        }
    }
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// `{prefix}_{subject}_{MM.DD.YY}.pdf`
pub fn suggested_filename(prefix: &str, subject: &FileSubject, date: NaiveDate) -> String {
    let date = format_date(date, FILENAME_DATE).unwrap_or_default();
    format!("{}_{}_{}.pdf", prefix, sanitize(&subject.render()), date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn test_person_filename() {
        let subject = FileSubject::Person(PersonName::new("John", "Smith"));
        assert_eq!(
            suggested_filename("EE10", &subject, day()),
            "EE10_J.Smith_03.05.24.pdf"
        );
    }

    #[rstest]
    #[case(PersonName::new("", "Smith"))]
    #[case(PersonName::new("John", ""))]
    #[case(PersonName::default())]
    fn test_incomplete_person_is_unknown(#[case] name: PersonName) {
        assert_eq!(
            suggested_filename("EE1", &FileSubject::Person(name), day()),
            "EE1_Unknown_03.05.24.pdf"
        );
    }

    #[test]
    fn test_full_name_filename() {
        let subject = FileSubject::FullName("Smith, John  Q".to_string());
        assert_eq!(
            suggested_filename("Withdrawal_Letter", &subject, day()),
            "Withdrawal_Letter_Smith_John_Q_03.05.24.pdf"
        );
        assert_eq!(
            suggested_filename("IR_Notice", &FileSubject::FullName(" ".to_string()), day()),
            "IR_Notice_Unknown_03.05.24.pdf"
        );
    }

    #[test]
    fn test_path_separators_replaced() {
        let subject = FileSubject::Person(PersonName::new("J", "O/Brien"));
        assert_eq!(
            suggested_filename("EN16", &subject, day()),
            "EN16_J.O_Brien_03.05.24.pdf"
        );
    }
}
