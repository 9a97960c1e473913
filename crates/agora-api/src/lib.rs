pub mod accounts;
pub mod articles;
pub mod auth;
pub mod error;
pub mod flash;
pub mod middleware;
pub mod news;
pub mod pages;
pub mod password;
pub mod placeholders;
pub mod routes;
pub mod sessions;
pub mod settings;
pub mod uploads;
