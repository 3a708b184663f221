use tower_sessions::Session;

use crate::AppResult;

/// Written by the login flow; holds the participant id of the signed-in user.
pub const USER_ID: &str = "user_id";

pub async fn participant(session: &Session) -> AppResult<Option<String>> {
    Ok(session.get::<String>(USER_ID).await?)
}
