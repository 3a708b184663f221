use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{DirectChat, Message};

#[derive(sqlx::FromRow)]
struct ChatRow {
    id: Uuid,
    participant_a: String,
    participant_b: String,
}

impl From<ChatRow> for DirectChat {
    fn from(ChatRow { id, participant_a, participant_b }: ChatRow) -> Self {
        DirectChat {
            id,
            participants: [participant_a, participant_b],
            messages: Vec::new(),
        }
    }
}

fn sorted<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

async fn lookup(conn: &mut SqliteConnection, a: &str, b: &str) -> Result<Option<ChatRow>, sqlx::Error> {
    let (low, high) = sorted(a, b);
    sqlx::query_as(
        "SELECT id,participant_a,participant_b FROM direct_chats
         WHERE min(participant_a, participant_b)=? AND max(participant_a, participant_b)=?",
    )
    .bind(low)
    .bind(high)
    .fetch_optional(conn)
    .await
}

/// Returns the chat for the pair, creating an empty one stored as `[a, b]`.
async fn get_or_create(conn: &mut SqliteConnection, a: &str, b: &str) -> Result<ChatRow, sqlx::Error> {
    // the pair index makes a concurrent creator's insert a no-op
    sqlx::query("INSERT OR IGNORE INTO direct_chats (id,participant_a,participant_b,created_at) VALUES (?,?,?,?)")
        .bind(Uuid::now_v7())
        .bind(a)
        .bind(b)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    lookup(conn, a, b).await?.ok_or(sqlx::Error::RowNotFound)
}

async fn messages(conn: &mut SqliteConnection, chat_id: Uuid) -> Result<Vec<Message>, sqlx::Error> {
    sqlx::query_as("SELECT id,sender_id,text,created_at FROM direct_messages WHERE chat_id=? ORDER BY rowid")
        .bind(chat_id)
        .fetch_all(conn)
        .await
}

pub async fn find_direct_chat(db_pool: &SqlitePool, a: &str, b: &str) -> Result<Option<DirectChat>, sqlx::Error> {
    let mut conn = db_pool.acquire().await?;
    Ok(lookup(&mut conn, a, b).await?.map(DirectChat::from))
}

pub async fn direct_chat_with_messages(
    db_pool: &SqlitePool,
    a: &str,
    b: &str,
) -> Result<Option<DirectChat>, sqlx::Error> {
    let mut conn = db_pool.acquire().await?;
    let Some(row) = lookup(&mut conn, a, b).await? else {
        return Ok(None);
    };

    let mut chat = DirectChat::from(row);
    chat.messages = messages(&mut conn, chat.id).await?;
    Ok(Some(chat))
}

/// History lookup that materializes an empty chat on first view.
pub async fn open_direct_chat(db_pool: &SqlitePool, a: &str, b: &str) -> Result<DirectChat, sqlx::Error> {
    let mut conn = db_pool.acquire().await?;
    let mut chat = DirectChat::from(get_or_create(&mut conn, a, b).await?);
    chat.messages = messages(&mut conn, chat.id).await?;
    Ok(chat)
}

pub async fn append_direct_message(
    db_pool: &SqlitePool,
    a: &str,
    b: &str,
    sender_id: &str,
    text: &str,
) -> Result<Message, sqlx::Error> {
    let mut tx = db_pool.begin().await?;
    let chat = get_or_create(&mut tx, a, b).await?;

    let message = Message {
        id: Uuid::now_v7(),
        sender_id: sender_id.to_owned(),
        text: text.to_owned(),
        created_at: Utc::now(),
    };

    sqlx::query("INSERT INTO direct_messages (id,chat_id,sender_id,text,created_at) VALUES (?,?,?,?,?)")
        .bind(message.id)
        .bind(chat.id)
        .bind(&message.sender_id)
        .bind(&message.text)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn first_message_creates_chat() {
        let db_pool = db::memory_pool().await.unwrap();
        assert!(find_direct_chat(&db_pool, "alice", "bob").await.unwrap().is_none());

        append_direct_message(&db_pool, "alice", "bob", "alice", "hi").await.unwrap();

        let chat = direct_chat_with_messages(&db_pool, "bob", "alice").await.unwrap().unwrap();
        assert_eq!(chat.participants, ["alice".to_owned(), "bob".to_owned()]);
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].sender_id, "alice");
        assert_eq!(chat.messages[0].text, "hi");
    }

    #[tokio::test]
    async fn replies_append_to_the_same_chat() {
        let db_pool = db::memory_pool().await.unwrap();

        append_direct_message(&db_pool, "alice", "bob", "alice", "hi").await.unwrap();
        append_direct_message(&db_pool, "bob", "alice", "bob", "hey").await.unwrap();
        append_direct_message(&db_pool, "alice", "bob", "alice", "how are you").await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM direct_chats")
            .fetch_one(&db_pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let chat = direct_chat_with_messages(&db_pool, "alice", "bob").await.unwrap().unwrap();
        let texts: Vec<_> = chat.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["hi", "hey", "how are you"]);
        assert_eq!(chat.messages[1].sender_id, "bob");
    }

    #[tokio::test]
    async fn open_creates_empty_chat_once() {
        let db_pool = db::memory_pool().await.unwrap();

        let first = open_direct_chat(&db_pool, "carol", "dave").await.unwrap();
        let second = open_direct_chat(&db_pool, "dave", "carol").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.participants, ["carol".to_owned(), "dave".to_owned()]);
        assert!(second.messages.is_empty());
    }
}
