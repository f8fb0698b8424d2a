//! Users, credentials and bearer sessions.
//!
//! Passwords are hashed with Argon2id. Bearer, verification and reset tokens are random
//! opaque strings handed to the caller once; only their SHA-256 digests are persisted.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use model::entities::{budget, category, session, transaction, transaction::TransactionKind, user};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use crate::categories::visible_to;
use crate::error::{ComputeError, ConflictKind, Result, conflict_or_database};
use crate::metrics;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Delivers one-time tokens to the user out of band (e.g. by email).
#[async_trait]
pub trait TokenDelivery: Send + Sync {
    async fn send_verification(&self, user: &user::Model, token: &str) -> Result<()>;
    async fn send_password_reset(&self, user: &user::Model, token: &str) -> Result<()>;
}

/// Writes tokens to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

#[async_trait]
impl TokenDelivery for LogDelivery {
    async fn send_verification(&self, user: &user::Model, token: &str) -> Result<()> {
        info!(email = %user.email, %token, "Verification token issued");
        Ok(())
    }

    async fn send_password_reset(&self, user: &user::Model, token: &str) -> Result<()> {
        info!(email = %user.email, %token, "Password reset token issued");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct IdentitySettings {
    pub session_ttl: Duration,
    pub reset_token_ttl: Duration,
    /// Mark new users verified immediately instead of issuing a verification token.
    pub auto_verify: bool,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(168),
            reset_token_ttl: Duration::minutes(60),
            auto_verify: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct Registered {
    pub user: user::Model,
    /// `None` when the user was verified on creation.
    pub verification_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub expires_at: NaiveDateTime,
    pub user: user::Model,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileStats {
    pub total_transactions: u64,
    pub expense_count: u64,
    pub income_count: u64,
    pub total_spent: Decimal,
    pub total_income: Decimal,
    pub active_budgets: u64,
    pub categories_available: u64,
}

pub(crate) fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ComputeError::Credentials(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

fn check_password_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ComputeError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Access control: resolves opaque credentials to users and manages their lifecycle.
pub struct IdentityService<'a> {
    db: &'a DatabaseConnection,
    settings: &'a IdentitySettings,
    delivery: &'a dyn TokenDelivery,
}

impl<'a> IdentityService<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        settings: &'a IdentitySettings,
        delivery: &'a dyn TokenDelivery,
    ) -> Self {
        Self {
            db,
            settings,
            delivery,
        }
    }

    #[instrument(skip(self, registration, now), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration, now: NaiveDateTime) -> Result<Registered> {
        let email = normalize_email(&registration.email);
        check_password_strength(&registration.password)?;

        if self.find_by_email(&email).await?.is_some() {
            warn!("Registration refused: email already in use");
            return Err(ComputeError::Conflict(ConflictKind::EmailTaken));
        }

        let verification_token = (!self.settings.auto_verify).then(new_token);
        let user = user::ActiveModel {
            email: Set(email),
            password_hash: Set(hash_password(&registration.password)?),
            first_name: Set(registration.first_name),
            last_name: Set(registration.last_name),
            is_verified: Set(self.settings.auto_verify),
            verification_token: Set(verification_token.as_deref().map(digest)),
            reset_token: Set(None),
            reset_token_expires: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .map_err(|e| conflict_or_database(e, ConflictKind::EmailTaken))?;

        if let Some(token) = verification_token.as_deref() {
            self.delivery.send_verification(&user, token).await?;
        }

        info!("User registered with ID: {}", user.id);
        Ok(Registered {
            user,
            verification_token,
        })
    }

    /// Consumes a verification token.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, token: &str, now: NaiveDateTime) -> Result<user::Model> {
        let Some(user) = user::Entity::find()
            .filter(user::Column::VerificationToken.eq(digest(token)))
            .one(self.db)
            .await?
        else {
            warn!("Unknown verification token");
            return Err(ComputeError::Validation(
                "Invalid or expired verification token".to_string(),
            ));
        };

        let mut active: user::ActiveModel = user.into();
        active.is_verified = Set(true);
        active.verification_token = Set(None);
        active.updated_at = Set(now);
        let user = active.update(self.db).await?;

        info!("User {} verified", user.id);
        Ok(user)
    }

    /// Unknown email and wrong password are reported identically.
    #[instrument(skip(self, password, now))]
    pub async fn login(&self, email: &str, password: &str, now: NaiveDateTime) -> Result<LoginSession> {
        let invalid = || ComputeError::Unauthorized("Invalid email or password".to_string());

        let user = self
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash) {
            warn!("Failed login for user {}", user.id);
            return Err(invalid());
        }
        if !user.is_verified {
            warn!("Login refused for unverified user {}", user.id);
            return Err(ComputeError::Unauthorized("Email not verified".to_string()));
        }

        let token = new_token();
        let expires_at = now + self.settings.session_ttl;
        session::ActiveModel {
            user_id: Set(user.id),
            token_hash: Set(digest(&token)),
            expires_at: Set(expires_at),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        info!("User {} logged in", user.id);
        Ok(LoginSession {
            token,
            expires_at,
            user,
        })
    }

    /// Resolves a bearer token to its verified user.
    #[instrument(skip_all)]
    pub async fn resolve(&self, token: &str, now: NaiveDateTime) -> Result<user::Model> {
        trace!("Resolving bearer token");
        let Some(session) = session::Entity::find()
            .filter(session::Column::TokenHash.eq(digest(token)))
            .one(self.db)
            .await?
        else {
            debug!("Bearer token does not match any session");
            return Err(ComputeError::Unauthorized("Invalid token".to_string()));
        };

        if session.is_expired(now) {
            debug!("Session {} expired at {}", session.id, session.expires_at);
            session.delete(self.db).await?;
            return Err(ComputeError::Unauthorized("Token expired".to_string()));
        }

        let user = user::Entity::find_by_id(session.user_id)
            .one(self.db)
            .await?
            .ok_or_else(|| ComputeError::Unauthorized("Invalid token".to_string()))?;
        if !user.is_verified {
            return Err(ComputeError::Unauthorized("Email not verified".to_string()));
        }
        Ok(user)
    }

    #[instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<bool> {
        let result = session::Entity::delete_many()
            .filter(session::Column::TokenHash.eq(digest(token)))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    #[instrument(skip(self))]
    pub async fn profile_stats(&self, user_id: i32) -> Result<ProfileStats> {
        let transactions = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(user_id))
            .all(self.db)
            .await?;

        let mut stats = ProfileStats {
            total_transactions: transactions.len() as u64,
            expense_count: 0,
            income_count: 0,
            total_spent: Decimal::ZERO,
            total_income: Decimal::ZERO,
            active_budgets: 0,
            categories_available: 0,
        };
        for tx in transactions {
            match tx.kind {
                TransactionKind::Expense => {
                    stats.expense_count += 1;
                    stats.total_spent += tx.amount;
                }
                TransactionKind::Income => {
                    stats.income_count += 1;
                    stats.total_income += tx.amount;
                }
            }
        }
        stats.total_spent = metrics::normalize_amount(stats.total_spent);
        stats.total_income = metrics::normalize_amount(stats.total_income);

        stats.active_budgets = budget::Entity::find()
            .filter(budget::Column::UserId.eq(user_id))
            .filter(budget::Column::IsActive.eq(true))
            .count(self.db)
            .await?;
        stats.categories_available = category::Entity::find()
            .filter(visible_to(user_id))
            .count(self.db)
            .await?;

        Ok(stats)
    }

    #[instrument(skip(self, now))]
    pub async fn update_profile(
        &self,
        user_id: i32,
        first_name: String,
        last_name: String,
        now: NaiveDateTime,
    ) -> Result<user::Model> {
        let user = self.get(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.first_name = Set(first_name);
        active.last_name = Set(last_name);
        active.updated_at = Set(now);
        let user = active.update(self.db).await?;
        info!("Profile of user {} updated", user_id);
        Ok(user)
    }

    #[instrument(skip(self, current_password, new_password, now))]
    pub async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
        now: NaiveDateTime,
    ) -> Result<()> {
        let user = self.get(user_id).await?;
        if !verify_password(current_password, &user.password_hash) {
            warn!("Password change for user {} refused: wrong current password", user_id);
            return Err(ComputeError::Validation("Current password is incorrect".to_string()));
        }
        check_password_strength(new_password)?;

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(new_password)?);
        active.updated_at = Set(now);
        active.update(self.db).await?;

        info!("Password changed for user {}", user_id);
        Ok(())
    }

    /// Issues a reset token when the email is known. Unknown emails succeed silently.
    #[instrument(skip(self, now))]
    pub async fn request_password_reset(&self, email: &str, now: NaiveDateTime) -> Result<Option<String>> {
        let Some(user) = self.find_by_email(&normalize_email(email)).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(None);
        };

        let token = new_token();
        let mut active: user::ActiveModel = user.into();
        active.reset_token = Set(Some(digest(&token)));
        active.reset_token_expires = Set(Some(now + self.settings.reset_token_ttl));
        active.updated_at = Set(now);
        let user = active.update(self.db).await?;

        self.delivery.send_password_reset(&user, &token).await?;
        info!("Password reset issued for user {}", user.id);
        Ok(Some(token))
    }

    /// Sets a new password from a reset token and revokes every session of the user.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str, now: NaiveDateTime) -> Result<()> {
        let invalid = || ComputeError::Validation("Invalid or expired reset token".to_string());
        let user = user::Entity::find()
            .filter(user::Column::ResetToken.eq(digest(token)))
            .filter(user::Column::ResetTokenExpires.gt(now))
            .one(self.db)
            .await?
            .ok_or_else(invalid)?;
        check_password_strength(new_password)?;

        let user_id = user.id;
        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(new_password)?);
        active.reset_token = Set(None);
        active.reset_token_expires = Set(None);
        active.updated_at = Set(now);
        active.update(self.db).await?;

        session::Entity::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .exec(self.db)
            .await?;

        info!("Password reset for user {}", user_id);
        Ok(())
    }

    /// Removes the user; owned categories, transactions, budgets and sessions cascade.
    #[instrument(skip(self, password))]
    pub async fn delete_account(&self, user_id: i32, password: &str) -> Result<()> {
        let user = self.get(user_id).await?;
        if !verify_password(password, &user.password_hash) {
            warn!("Account deletion for user {} refused: wrong password", user_id);
            return Err(ComputeError::Validation("Password is incorrect".to_string()));
        }
        user.delete(self.db).await?;
        info!("User {} deleted", user_id);
        Ok(())
    }

    async fn get(&self, user_id: i32) -> Result<user::Model> {
        user::Entity::find_by_id(user_id)
            .one(self.db)
            .await?
            .ok_or(ComputeError::NotFound("User"))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db)
            .await?)
    }
}
