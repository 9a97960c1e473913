use crate::models::{ArticleRow, NewArticle, NewUser, UserRow};
use crate::{Database, DbError};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

impl Database {
    // -- Users --

    /// Insert a user row. A taken username surfaces as `DbError::Conflict`
    /// straight from the UNIQUE constraint; there is no separate existence check.
    pub fn create_user(&self, user: &NewUser<'_>) -> std::result::Result<(), DbError> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, email, security_question, security_answer)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user.id,
                    user.username,
                    user.password_hash,
                    user.email,
                    user.security_question,
                    user.security_answer_hash,
                ],
            )?;
            Ok(())
        })
        .map_err(DbError::classify)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    /// Look a user up by the immutable id, which survives renames.
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Returns `false` when no row has this username.
    pub fn update_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        self.update_user_column("password", username, Some(password_hash))
    }

    pub fn update_email(&self, username: &str, email: &str) -> Result<bool> {
        self.update_user_column("email", username, Some(email))
    }

    pub fn update_cellphone(&self, username: &str, cellphone: Option<&str>) -> Result<bool> {
        self.update_user_column("cellphone", username, cellphone)
    }

    /// Move a row from `old` to `new` in one statement. The old name is freed
    /// and the new one claimed together, or neither happens.
    pub fn rename_user(&self, old: &str, new: &str) -> std::result::Result<bool, DbError> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET username = ?1 WHERE username = ?2",
                [new, old],
            )?;
            Ok(changed > 0)
        })
        .map_err(DbError::classify)
    }

    pub fn delete_user(&self, username: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE username = ?1", [username])?;
            Ok(changed > 0)
        })
    }

    fn update_user_column(&self, column: &'static str, username: &str, value: Option<&str>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let sql = format!("UPDATE users SET {} = ?1 WHERE username = ?2", column);
            let changed = conn.execute(&sql, rusqlite::params![value, username])?;
            Ok(changed > 0)
        })
    }

    // -- Articles --

    /// Append an article and return its row.
    pub fn insert_article(&self, article: &NewArticle<'_>) -> Result<ArticleRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO articles (title, description, body, image_url, author)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    article.title,
                    article.description,
                    article.body,
                    article.image_url,
                    article.author,
                ],
            )?;
            let id = conn.last_insert_rowid();
            query_article(conn, id)
        })
    }

    /// All articles, oldest first.
    pub fn list_articles(&self) -> Result<Vec<ArticleRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, body, image_url, author, created_at
                 FROM articles
                 ORDER BY id ASC",
            )?;

            let rows = stmt
                .query_map([], map_article)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &'static str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, password, email, cellphone, security_question, security_answer, created_at
         FROM users WHERE {} = ?1",
        column
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                email: row.get(3)?,
                cellphone: row.get(4)?,
                security_question: row.get(5)?,
                security_answer: row.get(6)?,
                created_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_article(conn: &Connection, id: i64) -> Result<ArticleRow> {
    let row = conn.query_row(
        "SELECT id, title, description, body, image_url, author, created_at
         FROM articles WHERE id = ?1",
        [id],
        map_article,
    )?;
    Ok(row)
}

fn map_article(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArticleRow> {
    Ok(ArticleRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        body: row.get(3)?,
        image_url: row.get(4)?,
        author: row.get(5)?,
        created_at: row.get(6)?,
    })
}
