use serde::{Deserialize, Serialize};

// -- Session token claims --

/// Claims carried by the signed session cookie. `uid` is the account's
/// immutable id and decides who the session belongs to; `sub` is the username
/// at issue time and is refreshed from the account row on every request.
/// `exp` is absolute and never extended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub uid: String,
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

// -- Auth forms --

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub email: String,
    pub security_question: String,
    pub security_answer: String,
}

/// The forgot-password page posts one of two forms, distinguished by which
/// submit button was pressed.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub username: String,
    pub security_answer: Option<String>,
    pub new_password: Option<String>,
    pub retrieve_question: Option<String>,
    pub reset_password: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ForgotPasswordStep<'a> {
    RetrieveQuestion,
    Reset {
        security_answer: &'a str,
        new_password: &'a str,
    },
    Unknown,
}

impl ForgotPasswordForm {
    pub fn step(&self) -> ForgotPasswordStep<'_> {
        if self.retrieve_question.is_some() {
            ForgotPasswordStep::RetrieveQuestion
        } else if self.reset_password.is_some() {
            ForgotPasswordStep::Reset {
                security_answer: self.security_answer.as_deref().unwrap_or_default(),
                new_password: self.new_password.as_deref().unwrap_or_default(),
            }
        } else {
            ForgotPasswordStep::Unknown
        }
    }
}

// -- Settings forms --

#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeUsernameForm {
    pub new_username: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeEmailForm {
    pub new_email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeCellphoneForm {
    pub new_cellphone: String,
}
