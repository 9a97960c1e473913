/// Database row types. These map directly to SQLite rows.
/// Distinct from agora-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    /// Argon2 PHC string.
    pub password: String,
    pub email: String,
    pub cellphone: Option<String>,
    pub security_question: String,
    /// Argon2 PHC string.
    pub security_answer: String,
    pub created_at: String,
}

/// Values for a new `users` row. Both secrets must already be hashed.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub email: &'a str,
    pub security_question: &'a str,
    pub security_answer_hash: &'a str,
}

pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub body: String,
    pub image_url: Option<String>,
    pub author: String,
    pub created_at: String,
}

pub struct NewArticle<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub body: &'a str,
    pub image_url: Option<&'a str>,
    pub author: &'a str,
}
