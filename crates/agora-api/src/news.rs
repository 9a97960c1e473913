use axum::{
    Extension,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use agora_types::api::SessionClaims;
use agora_types::models::ArticleDraft;

use crate::articles;
use crate::auth::{AppState, blocking};
use crate::error::AppError;
use crate::flash::{self, Flash};
use crate::pages;
use crate::uploads;

pub async fn news_list(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let articles = blocking(&state, |s| s.articles.list_articles()).await?;
    let (jar, flash) = flash::take(jar);
    Ok((jar, pages::news_list(&articles, flash.as_ref())))
}

pub async fn add_news_page(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (jar, pages::add_news(flash.as_ref()))
}

/// Fields of the add-news form. The image is kept only when a file was chosen.
async fn read_form(
    multipart: &mut Multipart,
    author: String,
) -> Result<(ArticleDraft, Option<(String, Bytes)>), MultipartError> {
    let mut draft = ArticleDraft {
        title: String::new(),
        description: String::new(),
        body: String::new(),
        image_reference: None,
        author,
    };
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "title" => draft.title = field.text().await?,
            "description" => draft.description = field.text().await?,
            "body" => draft.body = field.text().await?,
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty, unnamed part when no file was chosen
                if !filename.is_empty() {
                    image = Some((filename, bytes));
                }
            }
            _ => {}
        }
    }

    Ok((draft, image))
}

fn rejected(status: StatusCode, message: &str) -> Response {
    let flash = Flash::new("add_news_error", message);
    (status, pages::add_news(Some(&flash))).into_response()
}

/// POST /add_news: multipart form with `title`, `description`, `body` and an
/// optional `image` file. The author is the session's user.
pub async fn add_news(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let (mut draft, image) = match read_form(&mut multipart, claims.sub).await {
        Ok(form) => form,
        Err(e) => {
            // Over the body limit is 413, anything else 400
            warn!("Rejected news upload: {}", e.body_text());
            return Ok(rejected(e.status(), "Upload rejected. Check the image size and try again."));
        }
    };

    // Reject before anything touches the upload directory
    if let Err(e) = articles::validate(&draft) {
        return Ok(rejected(e.status_code(), &e.to_string()));
    }
    if image
        .as_ref()
        .is_some_and(|(filename, _)| uploads::image_extension(filename).is_none())
    {
        return Ok(rejected(
            StatusCode::BAD_REQUEST,
            "Only image files (png, jpg, jpeg, gif, webp, bmp) can be attached.",
        ));
    }

    if let Some((filename, bytes)) = image {
        draft.image_reference = Some(state.images.save(&filename, &bytes).await?);
    }

    let image_reference = draft.image_reference.clone();
    match blocking(&state, move |s| s.articles.add_article(&draft)).await {
        Ok(_) => Ok(Redirect::to("/news").into_response()),
        Err(e) => {
            if let Some(reference) = image_reference {
                if let Err(cleanup) = state.images.remove(&reference).await {
                    warn!("Could not remove orphaned upload {}: {:#}", reference, cleanup);
                }
            }
            Err(e)
        }
    }
}
