use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, warn};

use agora_db::Database;
use agora_types::api::{ForgotPasswordForm, ForgotPasswordStep, LoginForm, RegisterForm};

use crate::accounts::AccountStore;
use crate::articles::ArticleStore;
use crate::error::{AppError, AuthError};
use crate::flash::{self, Flash};
use crate::middleware::{clear_session_cookie, current_session, set_session_cookie};
use crate::pages;
use crate::sessions::{SESSION_COOKIE, SessionManager};
use crate::uploads::ImageStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub accounts: AccountStore,
    pub sessions: SessionManager,
    pub articles: ArticleStore,
    pub images: ImageStore,
    pub secure_cookies: bool,
    pub max_upload_bytes: usize,
}

/// Settings the HTTP layer needs from the binary's configuration.
#[derive(Clone)]
pub struct ApiConfig {
    pub session_secret: String,
    pub upload_dir: PathBuf,
    pub secure_cookies: bool,
    pub max_upload_bytes: usize,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("session_secret", &"<redacted>")
            .field("upload_dir", &self.upload_dir)
            .field("secure_cookies", &self.secure_cookies)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl AppStateInner {
    pub async fn build(db: Arc<Database>, config: &ApiConfig) -> anyhow::Result<AppState> {
        let images = ImageStore::new(config.upload_dir.clone()).await?;
        Ok(Arc::new(Self {
            accounts: AccountStore::new(db.clone()),
            sessions: SessionManager::new(&config.session_secret),
            articles: ArticleStore::new(db),
            images,
            secure_cookies: config.secure_cookies,
            max_upload_bytes: config.max_upload_bytes,
        }))
    }
}

/// Run blocking store work (SQLite, Argon2) off the async runtime.
pub async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&AppStateInner) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(e.into())
        })?
}

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Result<(CookieJar, Html<String>), AppError> {
    let username = current_session(&state, &jar).await?.map(|claims| claims.sub);
    let (jar, flash) = flash::take(jar);
    Ok((jar, pages::index(username.as_deref(), flash.as_ref())))
}

// -- Login / logout --

pub async fn login_page(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (jar, pages::login(flash.as_ref()))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.clone();
    let identity = blocking(&state, move |s| {
        s.accounts.authenticate(&form.username, &form.password)
    })
    .await?;

    match identity {
        Some(identity) => {
            let token = state.sessions.login(&identity)?;
            let jar = set_session_cookie(jar, token, state.secure_cookies);
            Ok((jar, Redirect::to("/")).into_response())
        }
        None => {
            warn!("Failed login for {}", username);
            Ok(flash::redirect(
                jar,
                "login_error",
                AuthError::InvalidCredentials.to_string(),
                "/login",
            ))
        }
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.logout(cookie.value());
    }
    (clear_session_cookie(jar), Redirect::to("/"))
}

// -- Registration --

pub async fn register_page(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (jar, pages::register(flash.as_ref()))
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    match blocking(&state, move |s| s.accounts.register(&form)).await {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(e) if e.is_user_facing() => {
            let flash = Flash::new("register_error", e.to_string());
            Ok((e.status_code(), pages::register(Some(&flash))).into_response())
        }
        Err(e) => Err(e),
    }
}

// -- Password recovery --

pub async fn forgot_password_page(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (jar, pages::forgot_password(None, flash.as_ref()))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Response, AppError> {
    match form.step() {
        ForgotPasswordStep::RetrieveQuestion => {
            let username = form.username.clone();
            let question = blocking(&state, move |s| s.accounts.begin_password_reset(&username)).await?;

            match question {
                Some(question) => {
                    Ok(pages::forgot_password(Some((&form.username, &question)), None).into_response())
                }
                None => {
                    let flash = Flash::new("forgot_password_error", "Username not found. Please try again.");
                    Ok(pages::forgot_password(None, Some(&flash)).into_response())
                }
            }
        }
        ForgotPasswordStep::Reset {
            security_answer,
            new_password,
        } => {
            let username = form.username.clone();
            let answer = security_answer.to_string();
            let new_password = new_password.to_string();
            let result = blocking(&state, move |s| {
                s.accounts
                    .complete_password_reset(&username, &answer, &new_password)
            })
            .await;

            match result {
                Ok(()) => Ok(flash::redirect(
                    jar,
                    "forgot_password_success",
                    "Password reset successful. Please log in with your new password.",
                    "/login",
                )),
                Err(e) if e.is_user_facing() => {
                    let flash = Flash::new("forgot_password_error", e.to_string());
                    Ok((e.status_code(), pages::forgot_password(None, Some(&flash))).into_response())
                }
                Err(e) => Err(e),
            }
        }
        ForgotPasswordStep::Unknown => Ok(pages::forgot_password(None, None).into_response()),
    }
}
