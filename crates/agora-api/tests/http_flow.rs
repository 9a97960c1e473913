use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use agora_api::auth::{ApiConfig, AppStateInner};
use agora_api::routes;
use agora_db::Database;

const BOUNDARY: &str = "agora-test-boundary";

/// Drives the router like a browser: remembers cookies across requests.
struct Browser {
    app: Router,
    cookies: HashMap<String, String>,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Reply {
    fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

impl Browser {
    fn new(app: Router) -> Self {
        Self {
            app,
            cookies: HashMap::new(),
        }
    }

    async fn send(&mut self, method: Method, uri: &str, content_type: Option<String>, body: Body) -> Reply {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            req = req.header(header::CONTENT_TYPE, ct);
        }
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            req = req.header(header::COOKIE, cookie);
        }

        let resp = self.app.clone().oneshot(req.body(body).unwrap()).await.unwrap();

        for set in resp.headers().get_all(header::SET_COOKIE) {
            let pair = set.to_str().unwrap().split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            if value.is_empty() {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }

        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        Reply {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    async fn get(&mut self, uri: &str) -> Reply {
        self.send(Method::GET, uri, None, Body::empty()).await
    }

    async fn post_form(&mut self, uri: &str, form: &str) -> Reply {
        self.send(
            Method::POST,
            uri,
            Some("application/x-www-form-urlencoded".to_string()),
            Body::from(form.to_string()),
        )
        .await
    }

    async fn post_multipart(&mut self, uri: &str, fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Reply {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        let (filename, bytes) = image.unwrap_or(("", &b""[..]));
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        self.send(
            Method::POST,
            uri,
            Some(format!("multipart/form-data; boundary={BOUNDARY}")),
            Body::from(body),
        )
        .await
    }

    async fn register(&mut self, username: &str, password: &str) -> Reply {
        self.post_form(
            "/register",
            &format!(
                "username={username}&password={password}&confirm_password={password}\
                 &email={username}%40example.com&security_question=First+pet%3F&security_answer=Rex"
            ),
        )
        .await
    }

    async fn login(&mut self, username: &str, password: &str) -> Reply {
        self.post_form("/login", &format!("username={username}&password={password}"))
            .await
    }
}

async fn site() -> (TempDir, Router) {
    let (dir, app, _db) = site_with_limit(1024 * 1024).await;
    (dir, app)
}

async fn site_with_limit(max_upload_bytes: usize) -> (TempDir, Router, Arc<Database>) {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(Database::open(&dir.path().join("site.db")).unwrap());
    let config = ApiConfig {
        session_secret: "integration-secret".into(),
        upload_dir: dir.path().join("uploads"),
        secure_cookies: false,
        max_upload_bytes,
    };
    let state = AppStateInner::build(db.clone(), &config).await.unwrap();
    (dir, routes::router(state), db)
}

fn upload_count(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path().join("uploads")).unwrap().count()
}

#[tokio::test]
async fn protected_pages_redirect_to_login() {
    let (_dir, app) = site().await;
    let mut browser = Browser::new(app);

    for uri in ["/settings", "/add_news", "/change_password", "/change_email"] {
        let reply = browser.get(uri).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(reply.location(), "/login", "{uri}");
    }
}

#[tokio::test]
async fn register_login_logout() {
    let (_dir, app) = site().await;
    let mut browser = Browser::new(app);

    let reply = browser.register("alice", "pw1").await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/login");

    let reply = browser.login("alice", "pw1").await;
    assert_eq!(reply.location(), "/");
    let session = browser.cookies.get("session").cloned().unwrap();

    let reply = browser.get("/").await;
    assert!(reply.body.contains("Welcome, alice!"));
    let reply = browser.get("/settings").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Signed in as alice"));

    let reply = browser.post_form("/logout", "").await;
    assert_eq!(reply.location(), "/");
    assert!(!browser.cookies.contains_key("session"));

    // Replaying the old token inside its lifetime must not work
    browser.cookies.insert("session".into(), session);
    let reply = browser.get("/settings").await;
    assert_eq!(reply.location(), "/login");
}

#[tokio::test]
async fn failed_login_flashes_once() {
    let (_dir, app) = site().await;
    let mut browser = Browser::new(app);
    browser.register("alice", "pw1").await;

    let reply = browser.login("alice", "nope").await;
    assert_eq!(reply.location(), "/login");
    assert!(!browser.cookies.contains_key("session"));

    let reply = browser.get("/login").await;
    assert!(reply.body.contains("Invalid username or password"));
    let reply = browser.get("/login").await;
    assert!(!reply.body.contains("Invalid username or password"));
}

#[tokio::test]
async fn duplicate_registration_is_reported() {
    let (_dir, app) = site().await;
    let mut browser = Browser::new(app);
    browser.register("alice", "pw1").await;

    let reply = browser.register("alice", "pw2").await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert!(reply.body.contains("already taken"));

    let reply = browser.login("alice", "pw1").await;
    assert_eq!(reply.location(), "/");
}

#[tokio::test]
async fn mismatched_registration_rerenders_form() {
    let (_dir, app) = site().await;
    let mut browser = Browser::new(app);

    let reply = browser
        .post_form(
            "/register",
            "username=alice&password=a&confirm_password=b&email=x&security_question=q&security_answer=a",
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body.contains("Passwords do not match"));
    assert!(reply.body.contains(r#"action="/register""#));
}

#[tokio::test]
async fn forgot_password_two_steps() {
    let (_dir, app) = site().await;
    let mut browser = Browser::new(app);
    browser.register("alice", "oldpass").await;

    let reply = browser
        .post_form("/forgot_password", "username=alice&retrieve_question=1")
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("First pet?"));

    let reply = browser
        .post_form("/forgot_password", "username=ghost&retrieve_question=1")
        .await;
    assert!(reply.body.contains("Username not found"));

    let reply = browser
        .post_form(
            "/forgot_password",
            "username=alice&security_answer=Cat&new_password=newpass&reset_password=1",
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.body.contains("Incorrect security answer"));

    let reply = browser
        .post_form(
            "/forgot_password",
            "username=alice&security_answer=Rex&new_password=newpass&reset_password=1",
        )
        .await;
    assert_eq!(reply.location(), "/login");

    assert_eq!(browser.login("alice", "oldpass").await.location(), "/login");
    assert_eq!(browser.login("alice", "newpass").await.location(), "/");
}

#[tokio::test]
async fn post_news_with_image() {
    let (dir, app) = site().await;
    let mut browser = Browser::new(app);
    browser.register("alice", "pw1").await;
    browser.login("alice", "pw1").await;

    let reply = browser
        .post_multipart(
            "/add_news",
            &[("title", "Launch"), ("description", "We are live"), ("body", "Details")],
            Some(("../../banner.png", &b"\x89PNG"[..])),
        )
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/news");

    let stored = std::fs::read(dir.path().join("uploads").join("banner.png")).unwrap();
    assert_eq!(stored, b"\x89PNG");

    let reply = browser.get("/news").await;
    assert!(reply.body.contains("Launch"));
    assert!(reply.body.contains("by alice"));
    assert!(reply.body.contains(r#"src="/static/uploads/banner.png""#));

    let reply = browser.get("/static/uploads/banner.png").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
}

#[tokio::test]
async fn news_with_non_image_attachment_is_rejected() {
    let (dir, app) = site().await;
    let mut browser = Browser::new(app);
    browser.register("alice", "pw1").await;
    browser.login("alice", "pw1").await;

    let reply = browser
        .post_multipart(
            "/add_news",
            &[("title", "T"), ("description", "D"), ("body", "B")],
            Some(("page.html", &b"<script>fetch('/delete_account')</script>"[..])),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body.contains("Only image files"));
    assert_eq!(upload_count(&dir), 0);
    assert!(browser.get("/news").await.body.contains("No news yet."));
}

#[tokio::test]
async fn oversized_news_upload_is_413() {
    let (dir, app, _db) = site_with_limit(1024).await;
    let mut browser = Browser::new(app);
    browser.register("alice", "pw1").await;
    browser.login("alice", "pw1").await;

    let big = vec![0u8; 8 * 1024];
    let reply = browser
        .post_multipart(
            "/add_news",
            &[("title", "T"), ("description", "D"), ("body", "B")],
            Some(("big.png", &big[..])),
        )
        .await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(upload_count(&dir), 0);
}

#[tokio::test]
async fn failed_article_insert_removes_its_image() {
    let (dir, app, db) = site_with_limit(1024 * 1024).await;
    let mut browser = Browser::new(app);
    browser.register("alice", "pw1").await;
    browser.login("alice", "pw1").await;

    db.with_conn_mut(|conn| {
        conn.execute_batch("DROP TABLE articles;")?;
        Ok(())
    })
    .unwrap();

    let reply = browser
        .post_multipart(
            "/add_news",
            &[("title", "T"), ("description", "D"), ("body", "B")],
            Some(("banner.png", &b"\x89PNG"[..])),
        )
        .await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(upload_count(&dir), 0);
}

#[tokio::test]
async fn incomplete_news_is_rejected() {
    let (dir, app) = site().await;
    let mut browser = Browser::new(app);
    browser.register("alice", "pw1").await;
    browser.login("alice", "pw1").await;

    let reply = browser
        .post_multipart(
            "/add_news",
            &[("title", ""), ("description", "D"), ("body", "B")],
            Some(("orphan.png", &b"bytes"[..])),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body.contains("Missing data"));
    assert!(!dir.path().join("uploads").join("orphan.png").exists());

    let reply = browser.get("/news").await;
    assert!(reply.body.contains("No news yet."));
}

#[tokio::test]
async fn rename_moves_session() {
    let (_dir, app) = site().await;
    let mut browser = Browser::new(app);
    browser.register("alice", "pw1").await;
    browser.login("alice", "pw1").await;
    let old_session = browser.cookies.get("session").cloned().unwrap();

    let reply = browser.post_form("/change_username", "new_username=bob").await;
    assert_eq!(reply.location(), "/settings");

    let reply = browser.get("/settings").await;
    assert!(reply.body.contains("Signed in as bob"));
    assert!(reply.body.contains("Username changed successfully."));

    // The pre-rename token is dead
    let mut stale = Browser::new(browser.app.clone());
    stale.cookies.insert("session".into(), old_session);
    assert_eq!(stale.get("/settings").await.location(), "/login");

    assert_eq!(browser.login("alice", "pw1").await.location(), "/login");
    assert_eq!(browser.login("bob", "pw1").await.location(), "/");
}

#[tokio::test]
async fn rename_elsewhere_carries_every_session() {
    let (_dir, app) = site().await;
    let mut first = Browser::new(app.clone());
    let mut second = Browser::new(app);
    first.register("alice", "pw1").await;
    first.login("alice", "pw1").await;
    second.login("alice", "pw1").await;

    first.post_form("/change_username", "new_username=bob").await;

    // The other browser now acts as bob, not as whoever claims "alice" next
    first.register("alice", "other").await;
    let reply = second.get("/settings").await;
    assert!(reply.body.contains("Signed in as bob"));

    second.post_form("/change_email", "new_email=bob%40example.com").await;
    assert!(second.get("/settings").await.body.contains("Email changed successfully."));

    let mut newcomer = Browser::new(second.app.clone());
    assert_eq!(newcomer.login("alice", "other").await.location(), "/");
    assert!(newcomer.get("/settings").await.body.contains("Signed in as alice"));
}

#[tokio::test]
async fn deleted_account_session_cannot_touch_new_owner() {
    let (_dir, app) = site().await;
    let mut first = Browser::new(app.clone());
    let mut second = Browser::new(app.clone());
    first.register("alice", "pw1").await;
    first.login("alice", "pw1").await;
    second.login("alice", "pw1").await;

    first.post_form("/delete_account", "").await;

    let mut stranger = Browser::new(app);
    stranger.register("alice", "strangerpw").await;

    assert_eq!(second.get("/settings").await.location(), "/login");
    let reply = second.post_form("/delete_account", "").await;
    assert_eq!(reply.location(), "/login");
    let reply = second.get("/").await;
    assert!(reply.body.contains("Welcome, Guest!"));

    assert_eq!(stranger.login("alice", "strangerpw").await.location(), "/");
}

#[tokio::test]
async fn rename_onto_taken_name_flashes_error() {
    let (_dir, app) = site().await;
    let mut browser = Browser::new(app);
    browser.register("alice", "pw1").await;
    browser.register("bob", "pw2").await;
    browser.login("alice", "pw1").await;

    let reply = browser.post_form("/change_username", "new_username=bob").await;
    assert_eq!(reply.location(), "/settings");

    let reply = browser.get("/settings").await;
    assert!(reply.body.contains("Signed in as alice"));
    assert!(reply.body.contains("already taken"));
}

#[tokio::test]
async fn change_password_flow() {
    let (_dir, app) = site().await;
    let mut browser = Browser::new(app);
    browser.register("alice", "pw1").await;
    browser.login("alice", "pw1").await;

    browser
        .post_form(
            "/change_password",
            "current_password=wrong&new_password=pw2&confirm_new_password=pw2",
        )
        .await;
    let reply = browser.get("/settings").await;
    assert!(reply.body.contains("Current password is incorrect"));

    browser
        .post_form(
            "/change_password",
            "current_password=pw1&new_password=pw2&confirm_new_password=pw2",
        )
        .await;
    let reply = browser.get("/settings").await;
    assert!(reply.body.contains("Password changed successfully."));

    assert_eq!(browser.login("alice", "pw1").await.location(), "/login");
    assert_eq!(browser.login("alice", "pw2").await.location(), "/");
}

#[tokio::test]
async fn delete_account_ends_session() {
    let (_dir, app) = site().await;
    let mut browser = Browser::new(app);
    browser.register("alice", "pw1").await;
    browser.login("alice", "pw1").await;

    let reply = browser.post_form("/delete_account", "").await;
    assert_eq!(reply.location(), "/");
    assert!(!browser.cookies.contains_key("session"));

    assert_eq!(browser.get("/settings").await.location(), "/login");
    assert_eq!(browser.login("alice", "pw1").await.location(), "/login");
}

#[tokio::test]
async fn placeholder_and_missing_pages() {
    let (_dir, app) = site().await;
    let mut browser = Browser::new(app);

    let reply = browser.get("/game").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Game 1"));

    let reply = browser.get("/no/such/page").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.body.contains("Page not found."));
}
