//! Email/password and OAuth account provisioning.

use nvoi_core::accounts::{login_from_email, validate_email, validate_password_strength};
use nvoi_core::error::CoreError;
use nvoi_core::invites::normalize_email;
use nvoi_db::models::user::{CreatePasswordUser, OAuthAccount, User};
use nvoi_db::repositories::UserRepo;
use nvoi_db::DbPool;

use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::services::workspaces::ensure_user_has_workspace;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Create an email/password account and its default workspace.
///
/// The workspace is named after `name`, or the email's local part.
pub async fn register_with_email(
    pool: &DbPool,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> AppResult<User> {
    let email = normalize_email(email);
    validate_email(&email)?;
    validate_password_strength(password)?;

    if UserRepo::find_by_email(pool, &email).await?.is_some() {
        return Err(CoreError::Conflict("Email already registered".into()).into());
    }

    let password_hash = hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    let login = login_from_email(&email);

    let user = UserRepo::create_with_password(
        pool,
        &CreatePasswordUser {
            email: email.clone(),
            login: login.clone(),
            name: name.map(str::to_string),
            password_hash,
        },
    )
    .await?;

    ensure_user_has_workspace(pool, user.id, Some(name.unwrap_or(&login))).await?;
    tracing::info!(user_id = %user.id, "Registered email account");
    Ok(user)
}

/// Check an email/password pair and record the login.
///
/// Unknown emails, OAuth-only accounts and wrong passwords all fail with
/// the same message.
pub async fn login_with_email(pool: &DbPool, email: &str, password: &str) -> AppResult<User> {
    let invalid = || AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into()));

    let user = UserRepo::find_by_email(pool, &normalize_email(email))
        .await?
        .ok_or_else(invalid)?;
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(invalid());
    };

    let valid = verify_password(password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !valid {
        return Err(invalid());
    }

    UserRepo::record_login(pool, user.id).await?;
    Ok(user)
}

/// Find the account for `account.email` and link the provider to it, or
/// create a new account; then make sure it has a workspace.
pub async fn find_or_create_oauth_user(
    pool: &DbPool,
    account: &OAuthAccount,
    display_name: Option<&str>,
) -> Result<User, sqlx::Error> {
    let user = match UserRepo::find_by_email(pool, &account.email).await? {
        Some(existing) => UserRepo::link_oauth_account(pool, existing.id, account)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?,
        None => UserRepo::create_oauth(pool, account).await?,
    };

    ensure_user_has_workspace(pool, user.id, display_name).await?;
    Ok(user)
}
