use sqlx::Row;

use zen_core::domain::ticket::TicketNumber;

use super::{RepositoryError, TicketCounterRepository};
use crate::DbPool;

pub struct SqlTicketCounterRepository {
    pool: DbPool,
}

impl SqlTicketCounterRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_u64(value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("ticket counter is negative: {value}")))
}

#[async_trait::async_trait]
impl TicketCounterRepository for SqlTicketCounterRepository {
    async fn next(&self) -> Result<TicketNumber, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO ticket_counter (id, value) VALUES (1, 1)
             ON CONFLICT(id) DO UPDATE SET value = value + 1
             RETURNING value",
        )
        .fetch_one(&self.pool)
        .await?;

        let value: i64 = row.try_get("value").map_err(RepositoryError::decode)?;
        Ok(TicketNumber(to_u64(value)?))
    }

    async fn current(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT value FROM ticket_counter WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => to_u64(row.try_get("value").map_err(RepositoryError::decode)?),
            None => Ok(0),
        }
    }

    async fn reset_to(&self, value: u64) -> Result<(), RepositoryError> {
        let value = i64::try_from(value)
            .map_err(|_| RepositoryError::Decode(format!("ticket counter too large: {value}")))?;
        sqlx::query(
            "INSERT INTO ticket_counter (id, value) VALUES (1, ?)
             ON CONFLICT(id) DO UPDATE SET value = excluded.value",
        )
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
