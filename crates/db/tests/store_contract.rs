use chrono::{Duration, Utc};
use tempfile::TempDir;
use zen_core::domain::ids::{ChannelId, UserId};
use zen_core::domain::review::{Review, ReviewId, StarRating};
use zen_core::domain::settings::SettingKey;
use zen_core::domain::ticket::{Ticket, TicketNumber, TicketStatus};
use zen_db::repositories::RepositoryError;
use zen_db::{connect_with_settings, migrations, DbPool, Stores};

async fn sql_pool(url: &str) -> DbPool {
    let pool = connect_with_settings(url, 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    pool
}

async fn backends() -> Vec<(&'static str, Stores)> {
    vec![
        ("sql", Stores::sql(sql_pool("sqlite::memory:").await)),
        ("memory", Stores::in_memory()),
    ]
}

fn review(id: &str, minutes_ago: i64) -> Review {
    Review {
        id: ReviewId(id.to_owned()),
        reviewer_id: UserId(7),
        reviewer_name: "alice".to_owned(),
        stars: StarRating::new(4).expect("valid rating"),
        comment: None,
        images: vec!["https://cdn.example/a.png".to_owned()],
        staff: "<@9>".to_owned(),
        ticket: "ticket-alice".to_owned(),
        created_at: Utc::now() - Duration::minutes(minutes_ago),
    }
}

fn ticket(channel: u64, owner: u64) -> Ticket {
    Ticket {
        channel_id: ChannelId(channel),
        channel_name: format!("ticket-user{owner}"),
        number: TicketNumber(channel),
        owner_id: UserId(owner),
        owner_name: format!("user{owner}"),
        category_id: Some(ChannelId(500)),
        status: TicketStatus::Open,
        claimed_by: None,
        welcome_message_id: None,
        opened_at: Utc::now(),
        closed_at: None,
    }
}

#[tokio::test]
async fn counter_starts_at_one_and_never_repeats() {
    for (name, stores) in backends().await {
        assert_eq!(stores.counter.current().await.expect("current"), 0, "{name}");

        let first = stores.counter.next().await.expect("first");
        let second = stores.counter.next().await.expect("second");

        assert_eq!(first, TicketNumber(1), "{name}");
        assert_eq!(second, TicketNumber(2), "{name}");

        stores.counter.reset_to(40).await.expect("reset");
        assert_eq!(stores.counter.next().await.expect("after reset"), TicketNumber(41), "{name}");
    }
}

#[tokio::test]
async fn settings_last_write_wins_per_key() {
    for (name, stores) in backends().await {
        stores.settings.set(SettingKey::StaffRoleId, 1).await.expect("first write");
        stores.settings.set(SettingKey::StaffRoleId, 2).await.expect("second write");
        stores.settings.set(SettingKey::CategoryOpenId, 3).await.expect("other key");

        let settings = stores.settings.load().await.expect("load");
        assert_eq!(settings.get(SettingKey::StaffRoleId), Some(2), "{name}");
        assert_eq!(settings.get(SettingKey::CategoryOpenId), Some(3), "{name}");
        assert_eq!(settings.get(SettingKey::TranscriptChannelId), None, "{name}");
    }
}

#[tokio::test]
async fn duplicate_review_ids_conflict_and_listing_is_newest_first() {
    for (name, stores) in backends().await {
        stores.reviews.insert(review("#Older01", 10)).await.expect("older");
        stores.reviews.insert(review("#Newer02", 1)).await.expect("newer");

        let duplicate = stores.reviews.insert(review("#Older01", 0)).await;
        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))), "{name}: {duplicate:?}");

        let listed = stores.reviews.list(10).await.expect("list");
        let ids: Vec<&str> = listed.iter().map(|review| review.id.as_str()).collect();
        assert_eq!(ids, vec!["#Newer02", "#Older01"], "{name}");

        let found = stores.reviews.find(&ReviewId("#Older01".to_owned())).await.expect("find");
        assert_eq!(found.map(|review| review.images.len()), Some(1), "{name}");
    }
}

#[tokio::test]
async fn closing_a_ticket_frees_the_owner() {
    for (name, stores) in backends().await {
        let mut record = ticket(10, 70);
        stores.tickets.save(record.clone()).await.expect("save");
        assert_eq!(stores.tickets.count_active().await.expect("count"), 1, "{name}");

        record.status = TicketStatus::Closed;
        record.closed_at = Some(Utc::now());
        stores.tickets.save(record).await.expect("close");

        let active = stores
            .tickets
            .find_active_by_owner(UserId(70), Some(ChannelId(500)))
            .await
            .expect("lookup");
        assert!(active.is_none(), "{name}");
        assert_eq!(stores.tickets.count_active().await.expect("count"), 0, "{name}");
        assert!(stores.tickets.find(ChannelId(10)).await.expect("find").is_some(), "{name}");
    }
}

#[tokio::test]
async fn sql_state_survives_reconnect() {
    let dir = TempDir::new().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("zen.db").display());

    let pool = sql_pool(&url).await;
    let stores = Stores::sql(pool.clone());
    stores.counter.next().await.expect("allocate");
    stores.emojis.upsert("star", "<:star:42>").await.expect("emoji");
    stores.reviews.insert(review("#Keep123", 0)).await.expect("review");
    pool.close().await;

    let reopened = Stores::sql(sql_pool(&url).await);
    assert_eq!(reopened.counter.current().await.expect("current"), 1);
    assert_eq!(
        reopened.emojis.load_all().await.expect("emojis").get("star").map(String::as_str),
        Some("<:star:42>")
    );
    assert_eq!(reopened.reviews.list(5).await.expect("list").len(), 1);
}
