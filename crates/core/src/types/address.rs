//! Postal addresses for members and venues.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::validation::ValidationErrors;

/// Maximum length of an address line, city or country.
pub const MAX_LINE_LENGTH: usize = 100;
/// Maximum length of a postal code.
pub const MAX_POSTAL_CODE_LENGTH: usize = 5;

/// A postal address.
///
/// A freshly created member has an address with every field empty; it is
/// filled in later from the profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Street number and name.
    pub label_first: String,
    /// Optional complement (building, floor).
    pub label_second: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
}

impl Address {
    /// Whether the member has filled in their address yet.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.label_first.is_empty()
            && self.label_second.is_empty()
            && self.postal_code.is_empty()
            && self.city.is_empty()
            && self.country.is_empty()
    }

    /// The address as display lines, skipping an empty complement.
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        let mut lines = vec![self.label_first.as_str()];
        if !self.label_second.is_empty() {
            lines.push(&self.label_second);
        }
        lines.extend([
            self.postal_code.as_str(),
            self.city.as_str(),
            self.country.as_str(),
        ]);
        lines
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

/// Address form fields, as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressInput {
    #[serde(default)]
    pub label_first: String,
    #[serde(default)]
    pub label_second: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl AddressInput {
    /// Trim and check every field.
    ///
    /// # Errors
    ///
    /// Returns one entry per missing or overlong field.
    pub fn validate(&self) -> Result<Address, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let label_first = required(&mut errors, "label_first", &self.label_first, MAX_LINE_LENGTH);
        let label_second = self.label_second.trim().to_owned();
        if label_second.chars().count() > MAX_LINE_LENGTH {
            errors.add("label_second", too_long(MAX_LINE_LENGTH));
        }
        let postal_code = required(
            &mut errors,
            "postal_code",
            &self.postal_code,
            MAX_POSTAL_CODE_LENGTH,
        );
        let city = required(&mut errors, "city", &self.city, MAX_LINE_LENGTH);
        let country = required(&mut errors, "country", &self.country, MAX_LINE_LENGTH);

        errors.into_result(|| Address {
            label_first,
            label_second,
            postal_code,
            city,
            country,
        })
    }
}

fn required(errors: &mut ValidationErrors, field: &'static str, value: &str, max: usize) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "this field is required");
    } else if value.chars().count() > max {
        errors.add(field, too_long(max));
    }
    value.to_owned()
}

fn too_long(max: usize) -> String {
    format!("must be at most {max} characters")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> AddressInput {
        AddressInput {
            label_first: " 12 rue du Stade ".into(),
            label_second: String::new(),
            postal_code: "69007".into(),
            city: "Lyon".into(),
            country: "France".into(),
        }
    }

    #[test]
    fn test_display_skips_empty_complement() {
        let address = input().validate().unwrap();
        assert_eq!(address.to_string(), "12 rue du Stade\n69007\nLyon\nFrance");

        let with_complement = Address {
            label_second: "Bât. B".into(),
            ..address
        };
        assert_eq!(
            with_complement.to_string(),
            "12 rue du Stade\nBât. B\n69007\nLyon\nFrance"
        );
    }

    #[test]
    fn test_validate_reports_each_field() {
        let bad = AddressInput {
            label_first: String::new(),
            postal_code: "690070".into(),
            ..input()
        };
        let errors = bad.validate().unwrap_err();
        assert_eq!(errors.for_field("label_first"), Some("this field is required"));
        assert!(errors.for_field("postal_code").is_some());
        assert!(errors.for_field("city").is_none());
    }

    #[test]
    fn test_blank_address() {
        assert!(Address::default().is_blank());
        assert!(!input().validate().unwrap().is_blank());
    }
}
