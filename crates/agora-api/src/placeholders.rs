//! Static content pages with no behaviour behind them.

use axum::{http::StatusCode, response::Html};

use crate::pages;

pub async fn shop() -> Html<String> {
    pages::placeholder("Shop", &[])
}

pub async fn game() -> Html<String> {
    pages::placeholder(
        "Games",
        &[
            ("Game 1", "Description for game 1"),
            ("Game 2", "Description for game 2"),
        ],
    )
}

pub async fn data_analyzer() -> Html<String> {
    pages::placeholder("Data Analyzer", &[])
}

pub async fn recreational_activities() -> Html<String> {
    pages::placeholder(
        "Recreational Activities",
        &[
            ("Activity 1", "Description for activity 1"),
            ("Activity 2", "Description for activity 2"),
        ],
    )
}

pub async fn blogs() -> Html<String> {
    pages::placeholder(
        "Blogs",
        &[
            ("Blog 1", "Description for blog 1"),
            ("Blog 2", "Description for blog 2"),
        ],
    )
}

pub async fn not_found() -> (StatusCode, Html<String>) {
    pages::apology(StatusCode::NOT_FOUND, "Page not found.")
}
