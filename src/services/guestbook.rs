use color_eyre::{eyre::eyre, Result};
use serde::Serialize;

use crate::supabase::api_types::ApiMessageRow;
use crate::supabase::types::Message;
use crate::supabase::{Order, Query, SupabaseClient, MESSAGES_TABLE};

use super::validation;

pub const NAME_LEN: (usize, usize) = (2, 50);
pub const CONTENT_LEN: (usize, usize) = (10, 500);

/// Guestbook entry as typed by a visitor
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
  pub name: String,
  pub email: Option<String>,
  pub content: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct MessageRow {
  name: String,
  email: Option<String>,
  content: String,
}

impl NewMessage {
  fn validate(&self) -> Result<MessageRow, validation::ValidationError> {
    let email = self
      .email
      .as_deref()
      .filter(|e| !e.trim().is_empty())
      .map(validation::email)
      .transpose()?;

    Ok(MessageRow {
      name: validation::length("name", &self.name, NAME_LEN.0, NAME_LEN.1)?,
      email,
      content: validation::length("content", &self.content, CONTENT_LEN.0, CONTENT_LEN.1)?,
    })
  }
}

/// Public guestbook over the anon client. Never cached.
#[derive(Clone)]
pub struct GuestbookService {
  client: Option<SupabaseClient>,
}

impl GuestbookService {
  pub fn new(client: Option<SupabaseClient>) -> Self {
    Self { client }
  }

  /// Newest first. Empty when the backend is not configured.
  pub async fn list(&self) -> Result<Vec<Message>> {
    let Some(client) = &self.client else {
      tracing::debug!("Guestbook unavailable, no Supabase client");
      return Ok(Vec::new());
    };

    let query = Query::all().order("created_at", Order::Desc);
    let rows: Vec<ApiMessageRow> = client.select(MESSAGES_TABLE, &query).await?;
    Ok(rows.into_iter().map(ApiMessageRow::into_message).collect())
  }

  pub async fn post(&self, message: &NewMessage) -> Result<Message> {
    let row = message.validate()?;
    let client = self
      .client
      .as_ref()
      .ok_or_else(|| eyre!("Guestbook unavailable: set SUPABASE_URL and SUPABASE_ANON_KEY"))?;

    let rows: Vec<ApiMessageRow> = client.insert(MESSAGES_TABLE, &[row]).await?;
    let posted = rows
      .into_iter()
      .next()
      .map(ApiMessageRow::into_message)
      .ok_or_else(|| eyre!("Guestbook insert returned no row"))?;
    tracing::info!(id = %posted.id, "Posted guestbook message");
    Ok(posted)
  }
}
