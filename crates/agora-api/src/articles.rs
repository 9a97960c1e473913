use std::sync::Arc;

use tracing::{info, warn};

use agora_db::Database;
use agora_db::models::{ArticleRow, NewArticle};
use agora_types::models::{Article, ArticleDraft};

use crate::error::AppError;

/// Append-only store of news articles.
#[derive(Clone)]
pub struct ArticleStore {
    db: Arc<Database>,
}

impl ArticleStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Title, description and body must all be non-empty. The author is
    /// trusted as given; callers take it from an authenticated session.
    pub fn add_article(&self, draft: &ArticleDraft) -> Result<Article, AppError> {
        validate(draft)?;

        let row = self.db.insert_article(&NewArticle {
            title: &draft.title,
            description: &draft.description,
            body: &draft.body,
            image_url: draft.image_reference.as_deref(),
            author: &draft.author,
        })?;

        info!("Article {} posted by {}", row.id, row.author);
        Ok(to_article(row))
    }

    /// Every article, oldest first, read fresh from storage.
    pub fn list_articles(&self) -> Result<Vec<Article>, AppError> {
        let rows = self.db.list_articles()?;
        Ok(rows.into_iter().map(to_article).collect())
    }
}

pub fn validate(draft: &ArticleDraft) -> Result<(), AppError> {
    if draft.title.is_empty() || draft.description.is_empty() || draft.body.is_empty() {
        return Err(AppError::validation("Missing data"));
    }
    Ok(())
}

fn to_article(row: ArticleRow) -> Article {
    let created_at = row
        .created_at
        .parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on article {}: {}", row.created_at, row.id, e);
            chrono::DateTime::default()
        });

    Article {
        id: row.id,
        title: row.title,
        description: row.description,
        body: row.body,
        image_reference: row.image_url,
        author: row.author,
        created_at,
    }
}
