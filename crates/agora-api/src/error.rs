use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

use crate::pages;

/// Why an authentication step failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password. Please try again.")]
    InvalidCredentials,

    #[error("Current password is incorrect. Please try again.")]
    WrongPassword,

    #[error("Incorrect security answer. Please try again.")]
    WrongSecurityAnswer,

    #[error("No account with that username exists.")]
    UnknownUser,

    #[error("Please log in to continue.")]
    Unauthenticated,
}

/// Every failure a request can end in.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed, missing or mismatched form input.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Uniqueness violation on register or rename.
    #[error("{0}")]
    Conflict(String),

    /// Storage unavailable or anything else unexpected.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// HTTP status for each error kind. This is the only place the mapping lives.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Errors the user caused and can fix by resubmitting a form. Handlers
    /// turn these into flash messages instead of the apology page.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, AppError::Internal(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Auth(AuthError::Unauthenticated) => Redirect::to("/login").into_response(),
            AppError::Internal(e) => {
                error!("Internal error: {:#}", e);
                // Internals stay in the log, not on the page
                pages::apology(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong on our side.")
                    .into_response()
            }
            other => pages::apology(other.status_code(), &other.to_string()).into_response(),
        }
    }
}

impl From<agora_db::DbError> for AppError {
    fn from(err: agora_db::DbError) -> Self {
        match err {
            agora_db::DbError::Conflict(_) => AppError::conflict("That username is already taken."),
            agora_db::DbError::Other(e) => AppError::Internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn status_table() {
        assert_eq!(AppError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(anyhow::anyhow!("disk gone")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthenticated_redirects_to_login() {
        let resp = AppError::from(AuthError::Unauthenticated).into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/login");
    }

    #[test]
    fn internal_error_renders_apology() {
        let resp = AppError::from(anyhow::anyhow!("disk gone")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn db_conflict_maps_to_conflict() {
        let err: AppError = agora_db::DbError::Conflict("users.username".into()).into();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(err.is_user_facing());
    }
}
