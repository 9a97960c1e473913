use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated account, as handed to the session layer after a
/// successful password check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub body: String,
    /// Relative URL of the uploaded image, if one was supplied.
    pub image_reference: Option<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Input for a new article; `author` comes from the session, never the form.
#[derive(Debug, Clone)]
pub struct ArticleDraft {
    pub title: String,
    pub description: String,
    pub body: String,
    pub image_reference: Option<String>,
    pub author: String,
}
