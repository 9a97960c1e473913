use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::uploads::UPLOAD_URL_PREFIX;
use crate::{news, placeholders, settings};

/// The whole site. Protected routes redirect to `/login` without a valid session.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(auth::index))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/register", get(auth::register_page).post(auth::register))
        .route(
            "/forgot_password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route("/news", get(news::news_list))
        .route("/shop", get(placeholders::shop))
        .route("/game", get(placeholders::game))
        .route("/data_analyzer", get(placeholders::data_analyzer))
        .route("/recreational_activities", get(placeholders::recreational_activities))
        .route("/blogs", get(placeholders::blogs));

    let protected_routes = Router::new()
        .route("/settings", get(settings::settings_page))
        .route(
            "/add_news",
            get(news::add_news_page)
                .post(news::add_news)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route("/delete_account", post(settings::delete_account))
        .route(
            "/change_password",
            get(settings::change_password_page).post(settings::change_password),
        )
        .route(
            "/change_username",
            get(settings::change_username_page).post(settings::change_username),
        )
        .route(
            "/change_email",
            get(settings::change_email_page).post(settings::change_email),
        )
        .route(
            "/change_cellphone",
            get(settings::change_cellphone_page).post(settings::change_cellphone),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Browsers must not sniff an upload into HTML
    let uploads = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .service(ServeDir::new(state.images.dir()));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(UPLOAD_URL_PREFIX, uploads)
        .fallback(placeholders::not_found)
        .with_state(state)
}
