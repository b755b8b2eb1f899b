//! Personal profile domain type.

use teamspirit_core::{Address, AddressId, DocumentKind, PersonalId};

/// Extended member attributes, one-to-one with a [`super::User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Personal {
    pub id: PersonalId,
    /// Empty until the member fills it in.
    pub phone_number: String,
    pub address_id: AddressId,
    pub address: Address,
    /// Hide phone and address from other members.
    pub has_private_profile: bool,
    /// Storage key of the identity document.
    pub id_file: Option<String>,
    /// Storage key of the medical certificate or licence.
    pub medical_file: Option<String>,
}

impl Personal {
    /// Storage key of the document of `kind`, if uploaded.
    #[must_use]
    pub fn document(&self, kind: DocumentKind) -> Option<&str> {
        match kind {
            DocumentKind::Medical => self.medical_file.as_deref(),
            DocumentKind::Identity => self.id_file.as_deref(),
        }
    }
}
