use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use agora_db::Database;
use agora_db::models::{NewUser, UserRow};
use agora_types::api::RegisterForm;
use agora_types::models::UserIdentity;

use crate::error::{AppError, AuthError};
use crate::password::{hash_secret, verify_secret};

/// Owns the `users` table: registration, credential checks, password
/// recovery and the self-service mutations.
///
/// Every method is blocking (SQLite plus Argon2); async callers go through
/// `spawn_blocking`.
#[derive(Clone)]
pub struct AccountStore {
    db: Arc<Database>,
}

impl AccountStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn register(&self, form: &RegisterForm) -> Result<UserIdentity, AppError> {
        if form.username.is_empty() {
            return Err(AppError::validation("Username is required."));
        }
        if form.password != form.confirm_password {
            return Err(AppError::validation("Passwords do not match. Please try again."));
        }

        let password_hash = hash_secret(&form.password)?;
        let security_answer_hash = hash_secret(&form.security_answer)?;
        let id = Uuid::new_v4().to_string();

        self.db.create_user(&NewUser {
            id: &id,
            username: &form.username,
            password_hash: &password_hash,
            email: &form.email,
            security_question: &form.security_question,
            security_answer_hash: &security_answer_hash,
        })?;

        info!("Registered user {}", form.username);
        Ok(UserIdentity {
            id,
            username: form.username.clone(),
        })
    }

    /// `None` for an unknown username or a wrong password; the two are not
    /// distinguished.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserIdentity>, AppError> {
        let Some(user) = self.db.get_user_by_username(username)? else {
            return Ok(None);
        };

        if verify_secret(password, &user.password)? {
            Ok(Some(UserIdentity {
                id: user.id,
                username: user.username,
            }))
        } else {
            Ok(None)
        }
    }

    /// First step of recovery. Note that answering `None` tells the caller the
    /// username does not exist.
    pub fn begin_password_reset(&self, username: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .db
            .get_user_by_username(username)?
            .map(|user| user.security_question))
    }

    pub fn complete_password_reset(
        &self,
        username: &str,
        security_answer: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self
            .db
            .get_user_by_username(username)?
            .ok_or(AuthError::WrongSecurityAnswer)?;

        if !verify_secret(security_answer, &user.security_answer)? {
            warn!("Wrong security answer for {}", username);
            return Err(AuthError::WrongSecurityAnswer.into());
        }

        self.set_password(username, new_password)?;
        info!("Password reset for {}", username);
        Ok(())
    }

    pub fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
        confirm_new_password: &str,
    ) -> Result<(), AppError> {
        let user = self.require_user(username)?;

        if !verify_secret(current_password, &user.password)? {
            return Err(AuthError::WrongPassword.into());
        }
        if new_password != confirm_new_password {
            return Err(AppError::validation("New passwords do not match. Please try again."));
        }

        self.set_password(username, new_password)?;
        info!("Password changed for {}", username);
        Ok(())
    }

    /// Rename in place. The caller is responsible for re-issuing the session
    /// under the new name.
    pub fn change_username(&self, old_username: &str, new_username: &str) -> Result<UserIdentity, AppError> {
        if new_username.is_empty() {
            return Err(AppError::validation("Username is required."));
        }
        let user = self.require_user(old_username)?;
        if old_username != new_username && !self.db.rename_user(old_username, new_username)? {
            return Err(AuthError::UnknownUser.into());
        }

        info!("Renamed user {} to {}", old_username, new_username);
        Ok(UserIdentity {
            id: user.id,
            username: new_username.to_string(),
        })
    }

    pub fn change_email(&self, username: &str, new_email: &str) -> Result<(), AppError> {
        if !self.db.update_email(username, new_email)? {
            return Err(AuthError::UnknownUser.into());
        }
        info!("Email changed for {}", username);
        Ok(())
    }

    /// An empty number clears the stored cellphone.
    pub fn change_cellphone(&self, username: &str, new_cellphone: &str) -> Result<(), AppError> {
        let value = (!new_cellphone.is_empty()).then_some(new_cellphone);
        if !self.db.update_cellphone(username, value)? {
            return Err(AuthError::UnknownUser.into());
        }
        info!("Cellphone changed for {}", username);
        Ok(())
    }

    pub fn delete_account(&self, username: &str) -> Result<(), AppError> {
        if !self.db.delete_user(username)? {
            return Err(AuthError::UnknownUser.into());
        }
        info!("Deleted account {}", username);
        Ok(())
    }

    /// The account a session id currently points at, under its current name.
    /// `None` once the account has been deleted.
    pub fn resolve(&self, user_id: &str) -> Result<Option<UserIdentity>, AppError> {
        Ok(self.db.get_user_by_id(user_id)?.map(|user| UserIdentity {
            id: user.id,
            username: user.username,
        }))
    }

    pub fn get(&self, username: &str) -> Result<Option<UserRow>, AppError> {
        Ok(self.db.get_user_by_username(username)?)
    }

    fn require_user(&self, username: &str) -> Result<UserRow, AppError> {
        self.get(username)?.ok_or(AppError::Auth(AuthError::UnknownUser))
    }

    fn set_password(&self, username: &str, new_password: &str) -> Result<(), AppError> {
        let hash = hash_secret(new_password)?;
        if !self.db.update_password(username, &hash)? {
            return Err(AuthError::UnknownUser.into());
        }
        Ok(())
    }
}
