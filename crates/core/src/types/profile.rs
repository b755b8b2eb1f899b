//! Member profile values: names, phone number, contact form, documents.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::address::{Address, AddressInput};
use super::validation::ValidationErrors;

/// Maximum length of a first name.
pub const MAX_FIRST_NAME_LENGTH: usize = 30;
/// Maximum length of a last name.
pub const MAX_LAST_NAME_LENGTH: usize = 150;

/// Last names are stored upper-cased (`"dupont"` becomes `"DUPONT"`).
#[must_use]
pub fn normalize_last_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// First names are stored with a leading capital and the rest lower-cased.
#[must_use]
pub fn normalize_first_name(name: &str) -> String {
    let mut chars = name.trim().chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// "Update personal info" form, as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonalInfoInput {
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
}

/// Normalized names, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPersonalInfo {
    pub last_name: String,
    pub first_name: String,
}

impl PersonalInfoInput {
    /// Check both names and normalize their case.
    ///
    /// # Errors
    ///
    /// Returns an entry for each empty or overlong name.
    pub fn validate(&self) -> Result<ValidatedPersonalInfo, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let last_name = check_name(&mut errors, "last_name", &self.last_name, MAX_LAST_NAME_LENGTH);
        let first_name = check_name(
            &mut errors,
            "first_name",
            &self.first_name,
            MAX_FIRST_NAME_LENGTH,
        );
        errors.into_result(|| ValidatedPersonalInfo {
            last_name: normalize_last_name(&last_name),
            first_name: normalize_first_name(&first_name),
        })
    }
}

fn check_name(errors: &mut ValidationErrors, field: &'static str, value: &str, max: usize) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "this field is required");
    } else if value.chars().count() > max {
        errors.add(field, format!("must be at most {max} characters"));
    }
    value.to_owned()
}

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumberError {
    #[error("phone number cannot be empty")]
    Empty,
    #[error("phone number must be at most {max} characters")]
    TooLong { max: usize },
    #[error("phone number may only contain digits, spaces and + . - ( )")]
    InvalidCharacter,
}

/// A contact phone number, kept as typed by the member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub const MAX_LENGTH: usize = 20;

    /// Parse a phone number.
    ///
    /// # Errors
    ///
    /// Rejects empty, overlong, or non-phone characters.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneNumberError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(PhoneNumberError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '.' | '-' | '(' | ')'))
        {
            return Err(PhoneNumberError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// "Update phone and address" form: phone, address and privacy flag are
/// edited and saved together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInput {
    #[serde(default)]
    pub phone_number: String,
    #[serde(flatten)]
    pub address: AddressInput,
    /// Checkbox: present (any value) when ticked.
    #[serde(default)]
    pub has_private_profile: Option<String>,
}

/// A validated contact form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedContact {
    pub phone_number: PhoneNumber,
    pub address: Address,
    pub has_private_profile: bool,
}

impl ContactInput {
    /// Validate all three parts; nothing is returned unless every part is valid.
    ///
    /// # Errors
    ///
    /// Returns the combined field errors of the phone number and the address.
    pub fn validate(&self) -> Result<ValidatedContact, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let phone_number = errors.check("phone_number", PhoneNumber::parse(&self.phone_number));
        let address = match self.address.validate() {
            Ok(address) => Some(address),
            Err(address_errors) => {
                errors.merge(address_errors);
                None
            }
        };

        match (phone_number, address) {
            (Some(phone_number), Some(address)) => Ok(ValidatedContact {
                phone_number,
                address,
                has_private_profile: self.has_private_profile.is_some(),
            }),
            _ => Err(errors),
        }
    }
}

/// Kind of document a member can upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Medical certificate or sports licence.
    Medical,
    /// Identity document.
    Identity,
}

impl DocumentKind {
    /// Content types accepted for upload.
    pub const ACCEPTED_CONTENT_TYPES: [&'static str; 3] =
        ["application/pdf", "image/png", "image/jpeg"];

    /// Top-level storage directory for this kind.
    #[must_use]
    pub const fn directory(self) -> &'static str {
        match self {
            Self::Medical => "lic",
            Self::Identity => "id",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Medical => "Certificat médical ou licence",
            Self::Identity => "Pièce d'identité",
        }
    }

    /// Whether an upload with this content type or file extension is accepted.
    #[must_use]
    pub fn accepts(content_type: Option<&str>, file_name: &str) -> bool {
        if let Some(content_type) = content_type
            && Self::ACCEPTED_CONTENT_TYPES.contains(&content_type)
        {
            return true;
        }
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        matches!(
            extension.as_deref(),
            Some("pdf" | "png" | "jpg" | "jpeg")
        )
    }

    /// Storage key for an uploaded file: `{dir}/{LAST}_{First}/{file}`.
    ///
    /// Only the final component of `file_name` is kept and characters outside
    /// `[A-Za-z0-9._-]` become `_`.
    #[must_use]
    pub fn storage_key(self, last_name: &str, first_name: &str, file_name: &str) -> String {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        let mut safe = sanitize(base);
        if safe.trim_matches(['.', '_']).is_empty() {
            safe = "document".to_owned();
        }
        format!(
            "{}/{}_{}/{}",
            self.directory(),
            sanitize(last_name),
            sanitize(first_name),
            safe
        )
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_name_normalization() {
        assert_eq!(normalize_last_name(" dupont "), "DUPONT");
        assert_eq!(normalize_first_name("jEAN-marc"), "Jean-marc");
        assert_eq!(normalize_first_name("émilie"), "Émilie");
        assert_eq!(normalize_first_name(""), "");
    }

    #[test]
    fn test_personal_info_validation() {
        let ok = PersonalInfoInput {
            last_name: "martin".into(),
            first_name: "LUCIE".into(),
        };
        assert_eq!(
            ok.validate().unwrap(),
            ValidatedPersonalInfo {
                last_name: "MARTIN".into(),
                first_name: "Lucie".into(),
            }
        );

        let bad = PersonalInfoInput {
            last_name: String::new(),
            first_name: "x".repeat(31),
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.for_field("last_name").is_some());
        assert!(errors.for_field("first_name").is_some());
    }

    #[test]
    fn test_phone_number() {
        assert!(PhoneNumber::parse("+33 6 12 34 56 78").is_ok());
        assert_eq!(PhoneNumber::parse(""), Err(PhoneNumberError::Empty));
        assert_eq!(
            PhoneNumber::parse("06 12 ab"),
            Err(PhoneNumberError::InvalidCharacter)
        );
        assert!(matches!(
            PhoneNumber::parse(&"1".repeat(21)),
            Err(PhoneNumberError::TooLong { .. })
        ));
    }

    #[test]
    fn test_contact_requires_every_part() {
        let input = ContactInput {
            phone_number: "0612345678".into(),
            address: AddressInput {
                label_first: "1 place Bellecour".into(),
                label_second: String::new(),
                postal_code: "69002".into(),
                city: "Lyon".into(),
                country: "France".into(),
            },
            has_private_profile: Some("on".into()),
        };
        let contact = input.validate().unwrap();
        assert!(contact.has_private_profile);

        let bad = ContactInput {
            phone_number: String::new(),
            address: AddressInput {
                city: String::new(),
                ..input.address
            },
            has_private_profile: None,
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.for_field("phone_number").is_some());
        assert!(errors.for_field("city").is_some());
    }

    #[test]
    fn test_document_storage_key() {
        assert_eq!(
            DocumentKind::Medical.storage_key("DUPONT", "Jean", "certif.pdf"),
            "lic/DUPONT_Jean/certif.pdf"
        );
        assert_eq!(
            DocumentKind::Identity.storage_key("LE BON", "Zoé", "../../etc/passwd"),
            "id/LE_BON_Zo_/passwd"
        );
        assert_eq!(
            DocumentKind::Identity.storage_key("A", "B", ".."),
            "id/A_B/document"
        );
    }

    #[test]
    fn test_document_accepts() {
        assert!(DocumentKind::accepts(Some("application/pdf"), "x"));
        assert!(DocumentKind::accepts(None, "scan.JPG"));
        assert!(!DocumentKind::accepts(Some("text/plain"), "notes.txt"));
    }
}
