//! One-shot messages carried to the next rendered page in a cookie.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;

const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub category: String,
    pub message: String,
}

impl Flash {
    pub fn new(category: &str, message: impl Into<String>) -> Self {
        Self {
            category: category.to_string(),
            message: message.into(),
        }
    }
}

pub fn push(jar: CookieJar, category: &str, message: impl AsRef<str>) -> CookieJar {
    // Base64 keeps spaces and punctuation out of the raw cookie value
    let value = B64.encode(format!("{}\n{}", category, message.as_ref()));
    jar.add(
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Queue a flash and send the client to `to`.
pub fn redirect(jar: CookieJar, category: &str, message: impl AsRef<str>, to: &str) -> Response {
    (push(jar, category, message), Redirect::to(to)).into_response()
}

/// Read and clear the pending flash, if any.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };

    let flash = B64
        .decode(cookie.value())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|text| {
            let (category, message) = text.split_once('\n')?;
            Some(Flash {
                category: category.to_string(),
                message: message.to_string(),
            })
        });

    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}
