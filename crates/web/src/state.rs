//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::config::WebConfig;
use crate::db::Repositories;
use crate::services::documents::{DocumentStore, LocalDocumentStore};
use crate::services::email::{LogMailer, Mailer, SmtpMailer};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    /// `None` when running on in-memory repositories.
    pool: Option<PgPool>,
    repos: Repositories,
    documents: Arc<dyn DocumentStore>,
    mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Assemble state from already built parts.
    #[must_use]
    pub fn new(
        config: WebConfig,
        pool: Option<PgPool>,
        repos: Repositories,
        documents: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                repos,
                documents,
                mailer,
            }),
        }
    }

    /// Production state: `PostgreSQL` repositories, documents under the
    /// media root, SMTP mail when configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn from_pool(config: WebConfig, pool: PgPool) -> Result<Self, SmtpError> {
        let repos = Repositories::postgres(&pool);
        let documents: Arc<dyn DocumentStore> =
            Arc::new(LocalDocumentStore::new(config.media_root.clone()));
        let mailer: Arc<dyn Mailer> = match &config.email {
            Some(email) => Arc::new(SmtpMailer::new(email)?),
            None => {
                tracing::warn!("SMTP not configured, password reset links will only be logged");
                Arc::new(LogMailer)
            }
        };
        Ok(Self::new(config, Some(pool), repos, documents, mailer))
    }

    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// The database pool, if running on `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn repos(&self) -> &Repositories {
        &self.inner.repos
    }

    #[must_use]
    pub fn documents(&self) -> &dyn DocumentStore {
        self.inner.documents.as_ref()
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn Mailer {
        self.inner.mailer.as_ref()
    }
}
