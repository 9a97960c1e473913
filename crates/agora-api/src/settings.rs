//! Self-service account pages. Every route here sits behind `require_auth`.

use axum::{
    Extension, Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use agora_types::api::{
    ChangeCellphoneForm, ChangeEmailForm, ChangePasswordForm, ChangeUsernameForm, SessionClaims,
};

use crate::auth::{AppState, blocking};
use crate::error::{AppError, AuthError};
use crate::flash;
use crate::middleware::{clear_session_cookie, set_session_cookie};
use crate::pages;

pub async fn settings_page(
    Extension(claims): Extension<SessionClaims>,
    jar: CookieJar,
) -> (CookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (jar, pages::settings(&claims.sub, flash.as_ref()))
}

fn succeeded(jar: CookieJar, message: &str) -> Response {
    flash::redirect(jar, "settings_success", message, "/settings")
}

/// Turn a failed mutation into a settings flash. A session whose account has
/// disappeared is ended and sent to the login page.
fn failed(state: &AppState, claims: &SessionClaims, jar: CookieJar, err: AppError) -> Result<Response, AppError> {
    match err {
        AppError::Auth(AuthError::UnknownUser) => {
            warn!("Session for missing account {} ended", claims.sub);
            state.sessions.revoke(claims);
            Ok(flash::redirect(
                clear_session_cookie(jar),
                "login_error",
                "Your account no longer exists.",
                "/login",
            ))
        }
        e if e.is_user_facing() => Ok(flash::redirect(jar, "settings_error", e.to_string(), "/settings")),
        e => Err(e),
    }
}

// -- Password --

pub async fn change_password_page(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (jar, pages::change_password(flash.as_ref()))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    jar: CookieJar,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response, AppError> {
    let username = claims.sub.clone();
    let result = blocking(&state, move |s| {
        s.accounts.change_password(
            &username,
            &form.current_password,
            &form.new_password,
            &form.confirm_new_password,
        )
    })
    .await;

    match result {
        Ok(()) => Ok(succeeded(jar, "Password changed successfully.")),
        Err(e) => failed(&state, &claims, jar, e),
    }
}

// -- Username --

pub async fn change_username_page(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (
        jar,
        pages::change_field("Change username", "/change_username", "New username", "new_username", flash.as_ref()),
    )
}

/// Renames the account and moves the caller's session to the new name.
pub async fn change_username(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    jar: CookieJar,
    Form(form): Form<ChangeUsernameForm>,
) -> Result<Response, AppError> {
    let old = claims.sub.clone();
    let result = blocking(&state, move |s| s.accounts.change_username(&old, &form.new_username)).await;

    match result {
        Ok(identity) => {
            let token = state.sessions.reissue(&claims, &identity.username)?;
            let jar = set_session_cookie(jar, token, state.secure_cookies);
            Ok(succeeded(jar, "Username changed successfully."))
        }
        Err(e) => failed(&state, &claims, jar, e),
    }
}

// -- Email --

pub async fn change_email_page(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (
        jar,
        pages::change_field("Change email", "/change_email", "New email", "new_email", flash.as_ref()),
    )
}

pub async fn change_email(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    jar: CookieJar,
    Form(form): Form<ChangeEmailForm>,
) -> Result<Response, AppError> {
    let username = claims.sub.clone();
    let result = blocking(&state, move |s| s.accounts.change_email(&username, &form.new_email)).await;

    match result {
        Ok(()) => Ok(succeeded(jar, "Email changed successfully.")),
        Err(e) => failed(&state, &claims, jar, e),
    }
}

// -- Cellphone --

pub async fn change_cellphone_page(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (
        jar,
        pages::change_field(
            "Change cellphone",
            "/change_cellphone",
            "New cellphone number",
            "new_cellphone",
            flash.as_ref(),
        ),
    )
}

pub async fn change_cellphone(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    jar: CookieJar,
    Form(form): Form<ChangeCellphoneForm>,
) -> Result<Response, AppError> {
    let username = claims.sub.clone();
    let result = blocking(&state, move |s| {
        s.accounts.change_cellphone(&username, &form.new_cellphone)
    })
    .await;

    match result {
        Ok(()) => Ok(succeeded(jar, "Cellphone number changed successfully.")),
        Err(e) => failed(&state, &claims, jar, e),
    }
}

// -- Deletion --

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let username = claims.sub.clone();
    match blocking(&state, move |s| s.accounts.delete_account(&username)).await {
        // Already gone: still end the session
        Ok(()) | Err(AppError::Auth(AuthError::UnknownUser)) => {}
        Err(e) => return Err(e),
    }

    state.sessions.revoke(&claims);
    Ok((clear_session_cookie(jar), Redirect::to("/")).into_response())
}
