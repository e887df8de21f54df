use chrono::{DateTime, Utc};
use sqlx::Row;

use zen_core::domain::ids::UserId;
use zen_core::domain::review::{Review, ReviewId, StarRating};

use super::{RepositoryError, ReviewRepository};
use crate::DbPool;

pub struct SqlReviewRepository {
    pool: DbPool,
}

impl SqlReviewRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_review(row: &sqlx::sqlite::SqliteRow) -> Result<Review, RepositoryError> {
    let id: String = row.try_get("id").map_err(RepositoryError::decode)?;
    let reviewer_id: String = row.try_get("reviewer_id").map_err(RepositoryError::decode)?;
    let reviewer_name: String = row.try_get("reviewer_name").map_err(RepositoryError::decode)?;
    let stars: i64 = row.try_get("stars").map_err(RepositoryError::decode)?;
    let comment: Option<String> = row.try_get("comment").map_err(RepositoryError::decode)?;
    let images_json: String = row.try_get("images_json").map_err(RepositoryError::decode)?;
    let staff: String = row.try_get("staff").map_err(RepositoryError::decode)?;
    let ticket: String = row.try_get("ticket").map_err(RepositoryError::decode)?;
    let created_at: String = row.try_get("created_at").map_err(RepositoryError::decode)?;

    let stars = u8::try_from(stars)
        .map_err(RepositoryError::decode)
        .and_then(|value| StarRating::new(value).map_err(RepositoryError::decode))?;
    let images: Vec<String> = serde_json::from_str(&images_json).map_err(RepositoryError::decode)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|value| value.with_timezone(&Utc))
        .map_err(RepositoryError::decode)?;

    Ok(Review {
        id: ReviewId(id),
        reviewer_id: reviewer_id.parse::<UserId>().map_err(RepositoryError::decode)?,
        reviewer_name,
        stars,
        comment,
        images,
        staff,
        ticket,
        created_at,
    })
}

#[async_trait::async_trait]
impl ReviewRepository for SqlReviewRepository {
    async fn insert(&self, review: Review) -> Result<(), RepositoryError> {
        let images_json = serde_json::to_string(&review.images).map_err(RepositoryError::decode)?;

        let result = sqlx::query(
            "INSERT INTO review
                (id, reviewer_id, reviewer_name, stars, comment, images_json, staff, ticket,
                 created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(review.id.as_str())
        .bind(review.reviewer_id.to_string())
        .bind(&review.reviewer_name)
        .bind(i64::from(review.stars.value()))
        .bind(&review.comment)
        .bind(images_json)
        .bind(&review.staff)
        .bind(&review.ticket)
        .bind(review.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                Err(RepositoryError::Conflict(format!("review {}", review.id)))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn find(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, reviewer_id, reviewer_name, stars, comment, images_json, staff, ticket,
                    created_at
             FROM review
             WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_review).transpose()
    }

    async fn list(&self, limit: u32) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, reviewer_id, reviewer_name, stars, comment, images_json, staff, ticket,
                    created_at
             FROM review
             ORDER BY created_at DESC, id ASC
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_review).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use zen_core::domain::ids::UserId;
    use zen_core::domain::review::{Review, ReviewId, StarRating};

    use super::SqlReviewRepository;
    use crate::repositories::{RepositoryError, ReviewRepository};
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlReviewRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlReviewRepository::new(pool)
    }

    fn review(id: &str, stars: u8, comment: Option<&str>) -> Review {
        Review {
            id: ReviewId(id.to_owned()),
            reviewer_id: UserId(11),
            reviewer_name: "alice".to_owned(),
            stars: StarRating::new(stars).expect("valid stars"),
            comment: comment.map(str::to_owned),
            images: Vec::new(),
            staff: "<@99>".to_owned(),
            ticket: "ticket-alice".to_owned(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn stored_reviews_are_independently_retrievable() {
        let repo = repository().await;
        let first = review("#aaaaaaa", 4, Some("Great!"));
        let mut second = review("#bbbbbbb", 2, None);
        second.images = vec!["https://cdn.example/1.png".to_owned()];

        repo.insert(first.clone()).await.expect("insert first");
        repo.insert(second.clone()).await.expect("insert second");

        let found_first = repo.find(&first.id).await.expect("find").expect("first exists");
        let found_second = repo.find(&second.id).await.expect("find").expect("second exists");
        assert_eq!(found_first.comment.as_deref(), Some("Great!"));
        assert_eq!(found_first.stars.value(), 4);
        assert_eq!(found_second.images, second.images);
        assert_eq!(found_second.comment, None);
    }

    #[tokio::test]
    async fn duplicate_id_is_a_conflict_and_keeps_the_original() {
        let repo = repository().await;
        repo.insert(review("#ccccccc", 5, Some("first"))).await.expect("insert");

        let error = repo
            .insert(review("#ccccccc", 1, Some("second")))
            .await
            .expect_err("duplicate id must be rejected");
        assert!(matches!(error, RepositoryError::Conflict(_)));

        let stored = repo
            .find(&ReviewId("#ccccccc".to_owned()))
            .await
            .expect("find")
            .expect("original kept");
        assert_eq!(stored.comment.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn list_returns_newest_first_up_to_limit() {
        let repo = repository().await;
        let mut older = review("#ddddddd", 3, None);
        older.created_at = Utc::now() - Duration::hours(2);
        let newer = review("#eeeeeee", 5, None);

        repo.insert(older).await.expect("insert older");
        repo.insert(newer).await.expect("insert newer");

        let listed = repo.list(1).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id.as_str(), "#eeeeeee");

        assert!(repo.find(&ReviewId("#missing".to_owned())).await.expect("find").is_none());
    }
}
