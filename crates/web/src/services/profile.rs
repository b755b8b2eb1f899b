//! Member profiles: own profile, edits, documents and the member directory.

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use teamspirit_core::{
    Address, ContactInput, DocumentKind, Email, PersonalInfoInput, Position, UserId,
    ValidationErrors, normalize_first_name, normalize_last_name,
};

use crate::db::{
    ProfileRepository, Repositories, RepositoryError, RoleRepository, UserRepository,
};
use crate::models::{CurrentUser, Personal, User};
use crate::services::documents::{DocumentError, DocumentStore};

/// Errors from profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// A submitted form is invalid.
    #[error("invalid form: {0}")]
    Validation(ValidationErrors),

    #[error("member not found")]
    NotFound,

    #[error("document storage error: {0}")]
    Document(#[from] DocumentError),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ProfileError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Everything shown on the member's own profile page.
#[derive(Debug, Clone)]
pub struct ProfileOverview {
    pub user: User,
    pub personal: Personal,
    pub position: Position,
}

/// Contact details, present only when the viewer may see them.
#[derive(Debug, Clone)]
pub struct ContactDetails {
    pub phone_number: String,
    pub address: Address,
}

/// A member as seen by another member.
#[derive(Debug, Clone)]
pub struct MemberDetail {
    pub user: User,
    pub position: Position,
    pub contact: Option<ContactDetails>,
}

/// "Update user" form: email and names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// An uploaded file, as received from the multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct ProfileService<'a> {
    users: &'a dyn UserRepository,
    profiles: &'a dyn ProfileRepository,
    roles: &'a dyn RoleRepository,
    documents: &'a dyn DocumentStore,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub fn new(repos: &'a Repositories, documents: &'a dyn DocumentStore) -> Self {
        Self {
            users: repos.users.as_ref(),
            profiles: repos.profiles.as_ref(),
            roles: repos.roles.as_ref(),
            documents,
        }
    }

    /// The member's own profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NotFound` if the user or their profile is gone.
    pub async fn overview(&self, user_id: UserId) -> Result<ProfileOverview, ProfileError> {
        let user = self.user(user_id).await?;
        let personal = self.personal(&user).await?;
        let position = self
            .roles
            .get(user.personal_id)
            .await?
            .ok_or(ProfileError::NotFound)?;
        Ok(ProfileOverview {
            user,
            personal,
            position,
        })
    }

    /// Save normalized names (`DUPONT`, `Jean`).
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Validation` for empty or overlong names.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn update_personal_info(
        &self,
        user_id: UserId,
        input: &PersonalInfoInput,
    ) -> Result<User, ProfileError> {
        let names = input.validate().map_err(ProfileError::Validation)?;
        Ok(self.users.update_names(user_id, &names).await?)
    }

    /// Save phone, address and privacy flag together.
    ///
    /// Nothing is written unless all three are valid.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Validation` with every invalid field.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn update_contact(
        &self,
        user_id: UserId,
        input: &ContactInput,
    ) -> Result<(), ProfileError> {
        let contact = input.validate().map_err(ProfileError::Validation)?;
        let user = self.user(user_id).await?;
        self.profiles
            .update_contact(user.personal_id, &contact)
            .await?;
        tracing::info!("contact details updated");
        Ok(())
    }

    /// Change email and names.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Validation` for a malformed or already used
    /// email and for bad names.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn update_account(
        &self,
        user_id: UserId,
        input: &AccountInput,
    ) -> Result<User, ProfileError> {
        let mut errors = ValidationErrors::new();
        let email = errors.check("email", Email::parse(&input.email));
        let names = PersonalInfoInput {
            last_name: input.last_name.clone(),
            first_name: input.first_name.clone(),
        };
        if let Err(name_errors) = names.validate() {
            errors.merge(name_errors);
        }
        let Some(email) = email.filter(|_| errors.is_empty()) else {
            return Err(ProfileError::Validation(errors));
        };

        self.users
            .update_account(
                user_id,
                &email,
                &normalize_first_name(&input.first_name),
                &normalize_last_name(&input.last_name),
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ProfileError::Validation(ValidationErrors::single(
                    "email",
                    "a member with this email already exists",
                )),
                other => other.into(),
            })
    }

    /// Store an uploaded document and point the profile at it.
    ///
    /// A previous document of the same kind stored under another key is
    /// removed afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Validation` for an empty file or a type other
    /// than PDF, PNG or JPEG.
    #[instrument(skip(self, upload), fields(user_id = %user_id, kind = ?kind, file = %upload.file_name))]
    pub async fn upload_document(
        &self,
        user_id: UserId,
        kind: DocumentKind,
        upload: &Upload,
    ) -> Result<String, ProfileError> {
        if upload.bytes.is_empty() || upload.file_name.is_empty() {
            return Err(ProfileError::Validation(ValidationErrors::single(
                "file",
                "please choose a file",
            )));
        }
        if !DocumentKind::accepts(upload.content_type.as_deref(), &upload.file_name) {
            return Err(ProfileError::Validation(ValidationErrors::single(
                "file",
                "only PDF, PNG and JPEG files are accepted",
            )));
        }

        let user = self.user(user_id).await?;
        let key = kind.storage_key(&user.last_name, &user.first_name, &upload.file_name);
        self.documents.put(&key, &upload.bytes).await?;
        let previous = self
            .profiles
            .set_document(user.personal_id, kind, Some(&key))
            .await?;

        if let Some(previous) = previous.filter(|p| *p != key)
            && let Err(e) = self.documents.delete(&previous).await
        {
            tracing::warn!(error = %e, previous = %previous, "could not remove replaced document");
        }

        tracing::info!(key = %key, "document uploaded");
        Ok(key)
    }

    /// Delete the stored document of `kind` and clear the reference.
    ///
    /// Returns whether there was a document.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Document` if the stored object cannot be
    /// removed; the reference is then kept.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn drop_document(
        &self,
        user_id: UserId,
        kind: DocumentKind,
    ) -> Result<bool, ProfileError> {
        let user = self.user(user_id).await?;
        let personal = self.personal(&user).await?;
        let Some(key) = personal.document(kind) else {
            return Ok(false);
        };

        self.documents.delete(key).await?;
        self.profiles
            .set_document(user.personal_id, kind, None)
            .await?;
        tracing::info!(key = %key, "document dropped");
        Ok(true)
    }

    /// Another member's page. Contact details are hidden when the profile
    /// is private, unless the viewer is that member.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NotFound` for an unknown or malformed email.
    pub async fn member_detail(
        &self,
        viewer: &CurrentUser,
        email: &str,
    ) -> Result<MemberDetail, ProfileError> {
        let email = Email::parse(email).map_err(|_| ProfileError::NotFound)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(ProfileError::NotFound)?;
        let personal = self.personal(&user).await?;
        let position = self
            .roles
            .get(user.personal_id)
            .await?
            .ok_or(ProfileError::NotFound)?;

        let visible = !personal.has_private_profile || viewer.id == user.id;
        let contact = visible.then(|| ContactDetails {
            phone_number: personal.phone_number,
            address: personal.address,
        });

        Ok(MemberDetail {
            user,
            position,
            contact,
        })
    }

    async fn user(&self, user_id: UserId) -> Result<User, ProfileError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(ProfileError::NotFound)
    }

    async fn personal(&self, user: &User) -> Result<Personal, ProfileError> {
        self.profiles
            .get(user.personal_id)
            .await?
            .ok_or(ProfileError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryDatabase;
    use crate::services::auth::AuthService;
    use crate::services::documents::MemoryDocumentStore;
    use teamspirit_core::AddressInput;

    struct Fixture {
        repos: Repositories,
        documents: MemoryDocumentStore,
        owner: User,
        other: User,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::in_memory(&InMemoryDatabase::new());
        let auth = AuthService::new(&repos);
        let owner = auth
            .create_member("jean@example.com", "jean", "dupont", "password1", false)
            .await
            .unwrap();
        let other = auth
            .create_member("zoe@example.com", "zoé", "le bon", "password1", false)
            .await
            .unwrap();
        Fixture {
            repos,
            documents: MemoryDocumentStore::new(),
            owner,
            other,
        }
    }

    fn contact(private: bool) -> ContactInput {
        ContactInput {
            phone_number: "06 12 34 56 78".to_owned(),
            address: AddressInput {
                label_first: "3 rue des Lilas".to_owned(),
                label_second: String::new(),
                postal_code: "69003".to_owned(),
                city: "Lyon".to_owned(),
                country: "France".to_owned(),
            },
            has_private_profile: private.then(|| "on".to_owned()),
        }
    }

    fn pdf(name: &str) -> Upload {
        Upload {
            file_name: name.to_owned(),
            content_type: Some("application/pdf".to_owned()),
            bytes: b"%PDF-1.7".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_overview_of_new_member() {
        let f = fixture().await;
        let service = ProfileService::new(&f.repos, &f.documents);
        let overview = service.overview(f.owner.id).await.unwrap();
        assert_eq!(overview.position, Position::Member);
        assert!(overview.personal.address.is_blank());
        assert!(overview.personal.medical_file.is_none());
    }

    #[tokio::test]
    async fn test_update_personal_info_normalizes() {
        let f = fixture().await;
        let service = ProfileService::new(&f.repos, &f.documents);
        let user = service
            .update_personal_info(
                f.owner.id,
                &PersonalInfoInput {
                    last_name: "durand".to_owned(),
                    first_name: "PAUL".to_owned(),
                },
            )
            .await
            .unwrap();
        assert_eq!(user.last_name, "DURAND");
        assert_eq!(user.first_name, "Paul");
    }

    #[tokio::test]
    async fn test_invalid_contact_writes_nothing() {
        let f = fixture().await;
        let service = ProfileService::new(&f.repos, &f.documents);
        let mut input = contact(false);
        input.address.city.clear();

        let err = service.update_contact(f.owner.id, &input).await.unwrap_err();
        assert!(matches!(err, ProfileError::Validation(_)));

        let personal = service.overview(f.owner.id).await.unwrap().personal;
        assert!(personal.phone_number.is_empty());
        assert!(personal.address.is_blank());
    }

    #[tokio::test]
    async fn test_private_profile_hides_contact_from_others() {
        let f = fixture().await;
        let service = ProfileService::new(&f.repos, &f.documents);
        service.update_contact(f.owner.id, &contact(true)).await.unwrap();

        let as_other = service
            .member_detail(&CurrentUser::from(&f.other), "jean@example.com")
            .await
            .unwrap();
        assert!(as_other.contact.is_none());

        let as_owner = service
            .member_detail(&CurrentUser::from(&f.owner), "jean@example.com")
            .await
            .unwrap();
        assert_eq!(as_owner.contact.unwrap().address.city, "Lyon");

        service.update_contact(f.owner.id, &contact(false)).await.unwrap();
        let public = service
            .member_detail(&CurrentUser::from(&f.other), "jean@example.com")
            .await
            .unwrap();
        assert_eq!(public.contact.unwrap().phone_number, "06 12 34 56 78");
    }

    #[tokio::test]
    async fn test_member_detail_unknown() {
        let f = fixture().await;
        let service = ProfileService::new(&f.repos, &f.documents);
        let viewer = CurrentUser::from(&f.owner);
        assert!(matches!(
            service.member_detail(&viewer, "ghost@example.com").await,
            Err(ProfileError::NotFound)
        ));
        assert!(matches!(
            service.member_detail(&viewer, "not-an-email").await,
            Err(ProfileError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_account_duplicate_email() {
        let f = fixture().await;
        let service = ProfileService::new(&f.repos, &f.documents);
        let input = AccountInput {
            email: "zoe@example.com".to_owned(),
            first_name: "Jean".to_owned(),
            last_name: "Dupont".to_owned(),
        };
        let err = service.update_account(f.owner.id, &input).await.unwrap_err();
        let ProfileError::Validation(errors) = err else {
            panic!("expected a validation error");
        };
        assert!(errors.for_field("email").is_some());

        let renamed = service
            .update_account(
                f.owner.id,
                &AccountInput {
                    email: "jean.dupont@example.com".to_owned(),
                    ..input
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.email.as_str(), "jean.dupont@example.com");
        assert_eq!(renamed.last_name, "DUPONT");
    }

    #[tokio::test]
    async fn test_upload_and_drop_document() {
        let f = fixture().await;
        let service = ProfileService::new(&f.repos, &f.documents);

        let key = service
            .upload_document(f.owner.id, DocumentKind::Medical, &pdf("certif.pdf"))
            .await
            .unwrap();
        assert_eq!(key, "lic/DUPONT_Jean/certif.pdf");
        assert_eq!(f.documents.keys().await, vec![key.clone()]);

        // Replacing removes the old object.
        let replaced = service
            .upload_document(f.owner.id, DocumentKind::Medical, &pdf("licence.pdf"))
            .await
            .unwrap();
        assert_eq!(f.documents.keys().await, vec![replaced]);

        assert!(service
            .drop_document(f.owner.id, DocumentKind::Medical)
            .await
            .unwrap());
        assert!(f.documents.keys().await.is_empty());
        let personal = service.overview(f.owner.id).await.unwrap().personal;
        assert!(personal.medical_file.is_none());

        assert!(!service
            .drop_document(f.owner.id, DocumentKind::Medical)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_upload_rejects_other_types() {
        let f = fixture().await;
        let service = ProfileService::new(&f.repos, &f.documents);
        let upload = Upload {
            file_name: "notes.txt".to_owned(),
            content_type: Some("text/plain".to_owned()),
            bytes: b"hello".to_vec(),
        };
        assert!(matches!(
            service
                .upload_document(f.owner.id, DocumentKind::Identity, &upload)
                .await,
            Err(ProfileError::Validation(_))
        ));
        assert!(f.documents.keys().await.is_empty());
    }
}
