use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::info;

use agora_types::api::SessionClaims;

use crate::auth::{AppState, blocking};
use crate::error::AppError;
use crate::sessions::SESSION_COOKIE;

/// The live session behind the request's cookie, if any.
///
/// The token names an account id. That id is looked up on every request and
/// `sub` is replaced with the account's current username, so a session follows
/// renames and dies with its account. A session whose account is gone is
/// revoked on the spot.
pub async fn current_session(state: &AppState, jar: &CookieJar) -> Result<Option<SessionClaims>, AppError> {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value());
    let Ok(mut claims) = state.sessions.require_authenticated(token) else {
        return Ok(None);
    };

    let uid = claims.uid.clone();
    match blocking(state, move |s| s.accounts.resolve(&uid)).await? {
        Some(identity) => {
            claims.sub = identity.username;
            Ok(Some(claims))
        }
        None => {
            info!("Session for deleted account {} ended", claims.uid);
            state.sessions.revoke(&claims);
            Ok(None)
        }
    }
}

/// Gate for protected routes. On success the session's claims are placed in
/// request extensions for `Extension<SessionClaims>`; otherwise the client is
/// sent to the login page.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match current_session(&state, &jar).await {
        Ok(Some(claims)) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Ok(None) => Redirect::to("/login").into_response(),
        Err(e) => e.into_response(),
    }
}

pub fn set_session_cookie(jar: CookieJar, token: String, secure: bool) -> CookieJar {
    jar.add(
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax),
    )
}

pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
