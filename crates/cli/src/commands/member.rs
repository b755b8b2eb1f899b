//! Member account and role management.

use teamspirit_core::{Email, Position};
use teamspirit_web::db::Repositories;
use teamspirit_web::services::auth::AuthService;
use teamspirit_web::services::roles::RoleService;

use super::{CliError, connect};

/// Create a member account with an empty profile and the member role.
pub async fn create(
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    is_staff: bool,
) -> Result<(), CliError> {
    let pool = connect().await?;
    let repos = Repositories::postgres(&pool);

    let user = AuthService::new(&repos)
        .create_member(email, first_name, last_name, password, is_staff)
        .await?;

    tracing::info!(
        "Member created! ID: {}, Email: {}, Name: {}",
        user.id,
        user.email,
        user.display_name()
    );
    Ok(())
}

/// Replace the role of the member registered under `email`.
pub async fn assign_role(email: &str, role: &str) -> Result<(), CliError> {
    let position: Position = role
        .parse()
        .map_err(|_| CliError::InvalidRole(role.to_owned()))?;
    let parsed = Email::parse(email).map_err(|_| CliError::UnknownMember(email.to_owned()))?;

    let pool = connect().await?;
    let repos = Repositories::postgres(&pool);

    let user = repos
        .users
        .get_by_email(&parsed)
        .await?
        .ok_or_else(|| CliError::UnknownMember(email.to_owned()))?;

    RoleService::new(&repos)
        .assign_role(user.personal_id, position)
        .await?;

    tracing::info!("{} is now {}", user.display_name(), position.label());
    Ok(())
}
