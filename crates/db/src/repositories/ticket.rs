use chrono::{DateTime, Utc};
use sqlx::Row;

use zen_core::domain::ids::{ChannelId, MessageId, UserId};
use zen_core::domain::ticket::{StaffRef, Ticket, TicketNumber, TicketStatus};

use super::{RepositoryError, TicketRepository};
use crate::DbPool;

const TICKET_COLUMNS: &str = "channel_id, channel_name, number, owner_id, owner_name, category_id,
    status, claimed_by_id, claimed_by_name, welcome_message_id, opened_at, closed_at";

pub struct SqlTicketRepository {
    pool: DbPool,
}

impl SqlTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_id<T: std::str::FromStr>(column: &str, value: &str) -> Result<T, RepositoryError> {
    value
        .parse::<T>()
        .map_err(|_| RepositoryError::Decode(format!("{column} is not an id: `{value}`")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|value| value.with_timezone(&Utc))
        .map_err(RepositoryError::decode)
}

fn row_to_ticket(row: &sqlx::sqlite::SqliteRow) -> Result<Ticket, RepositoryError> {
    let channel_id: String = row.try_get("channel_id").map_err(RepositoryError::decode)?;
    let channel_name: String = row.try_get("channel_name").map_err(RepositoryError::decode)?;
    let number: i64 = row.try_get("number").map_err(RepositoryError::decode)?;
    let owner_id: String = row.try_get("owner_id").map_err(RepositoryError::decode)?;
    let owner_name: String = row.try_get("owner_name").map_err(RepositoryError::decode)?;
    let category_id: Option<String> = row.try_get("category_id").map_err(RepositoryError::decode)?;
    let status: String = row.try_get("status").map_err(RepositoryError::decode)?;
    let claimed_by_id: Option<String> =
        row.try_get("claimed_by_id").map_err(RepositoryError::decode)?;
    let claimed_by_name: Option<String> =
        row.try_get("claimed_by_name").map_err(RepositoryError::decode)?;
    let welcome_message_id: Option<String> =
        row.try_get("welcome_message_id").map_err(RepositoryError::decode)?;
    let opened_at: String = row.try_get("opened_at").map_err(RepositoryError::decode)?;
    let closed_at: Option<String> = row.try_get("closed_at").map_err(RepositoryError::decode)?;

    let status = TicketStatus::parse(&status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown ticket status `{status}`")))?;
    let claimed_by = match (claimed_by_id, claimed_by_name) {
        (Some(id), name) => Some(StaffRef {
            user_id: parse_id::<UserId>("claimed_by_id", &id)?,
            name: name.unwrap_or_default(),
        }),
        (None, _) => None,
    };

    Ok(Ticket {
        channel_id: parse_id::<ChannelId>("channel_id", &channel_id)?,
        channel_name,
        number: TicketNumber(u64::try_from(number).map_err(RepositoryError::decode)?),
        owner_id: parse_id::<UserId>("owner_id", &owner_id)?,
        owner_name,
        category_id: category_id
            .as_deref()
            .map(|value| parse_id::<ChannelId>("category_id", value))
            .transpose()?,
        status,
        claimed_by,
        welcome_message_id: welcome_message_id
            .as_deref()
            .map(|value| parse_id::<MessageId>("welcome_message_id", value))
            .transpose()?,
        opened_at: parse_timestamp(&opened_at)?,
        closed_at: closed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

#[async_trait::async_trait]
impl TicketRepository for SqlTicketRepository {
    async fn find(&self, channel_id: ChannelId) -> Result<Option<Ticket>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM ticket WHERE channel_id = ?"))
            .bind(channel_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_ticket).transpose()
    }

    async fn find_active_by_owner(
        &self,
        owner: UserId,
        category: Option<ChannelId>,
    ) -> Result<Option<Ticket>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {TICKET_COLUMNS} FROM ticket
             WHERE owner_id = ? AND status != 'closed'
             ORDER BY number DESC"
        ))
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await?;

        for row in &rows {
            let ticket = row_to_ticket(row)?;
            if category.is_none() || ticket.category_id == category {
                return Ok(Some(ticket));
            }
        }
        Ok(None)
    }

    async fn save(&self, ticket: Ticket) -> Result<(), RepositoryError> {
        let number = i64::try_from(ticket.number.0).map_err(RepositoryError::decode)?;

        sqlx::query(&format!(
            "INSERT INTO ticket ({TICKET_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(channel_id) DO UPDATE SET
                channel_name = excluded.channel_name,
                number = excluded.number,
                owner_id = excluded.owner_id,
                owner_name = excluded.owner_name,
                category_id = excluded.category_id,
                status = excluded.status,
                claimed_by_id = excluded.claimed_by_id,
                claimed_by_name = excluded.claimed_by_name,
                welcome_message_id = excluded.welcome_message_id,
                opened_at = excluded.opened_at,
                closed_at = excluded.closed_at"
        ))
        .bind(ticket.channel_id.to_string())
        .bind(&ticket.channel_name)
        .bind(number)
        .bind(ticket.owner_id.to_string())
        .bind(&ticket.owner_name)
        .bind(ticket.category_id.map(|id| id.to_string()))
        .bind(ticket.status.as_str())
        .bind(ticket.claimed_by.as_ref().map(|staff| staff.user_id.to_string()))
        .bind(ticket.claimed_by.as_ref().map(|staff| staff.name.clone()))
        .bind(ticket.welcome_message_id.map(|id| id.to_string()))
        .bind(ticket.opened_at.to_rfc3339())
        .bind(ticket.closed_at.map(|value| value.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_active(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM ticket WHERE status != 'closed'")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count").map_err(RepositoryError::decode)?;
        u64::try_from(count).map_err(RepositoryError::decode)
    }
}
