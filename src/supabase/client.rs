use color_eyre::{eyre::eyre, Result};
use reqwest::{header, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

use crate::config::Config;

use super::api_types::ApiError;

/// Sort direction for PostgREST `order=`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
  Asc,
  Desc,
}

/// PostgREST query string builder.
#[derive(Debug, Clone, Default)]
pub struct Query {
  select: Option<String>,
  order: Vec<String>,
  filters: Vec<(String, String)>,
}

impl Query {
  pub fn new() -> Self {
    Self::default()
  }

  /// `select=*` shorthand
  pub fn all() -> Self {
    Self::new().select("*")
  }

  pub fn select(mut self, columns: &str) -> Self {
    self.select = Some(columns.to_string());
    self
  }

  pub fn order(mut self, column: &str, order: Order) -> Self {
    let dir = match order {
      Order::Asc => "asc",
      Order::Desc => "desc",
    };
    self.order.push(format!("{}.{}", column, dir));
    self
  }

  pub fn eq(mut self, column: &str, value: &str) -> Self {
    self.filters.push((column.to_string(), format!("eq.{}", value)));
    self
  }

  pub fn neq(mut self, column: &str, value: &str) -> Self {
    self.filters.push((column.to_string(), format!("neq.{}", value)));
    self
  }

  pub fn pairs(&self) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Some(select) = &self.select {
      pairs.push(("select".to_string(), select.clone()));
    }
    if !self.order.is_empty() {
      pairs.push(("order".to_string(), self.order.join(",")));
    }
    pairs.extend(self.filters.iter().cloned());
    pairs
  }
}

/// Thin client for the Supabase REST (PostgREST) and Functions endpoints.
#[derive(Clone)]
pub struct SupabaseClient {
  http: reqwest::Client,
  base: Url,
  key: String,
}

impl SupabaseClient {
  pub fn new(base_url: &str, key: &str, timeout: Duration) -> Result<Self> {
    let mut base =
      Url::parse(base_url).map_err(|e| eyre!("Invalid Supabase URL '{}': {}", base_url, e))?;
    // Url::join treats the last segment as a file unless it ends in '/'
    if !base.path().ends_with('/') {
      base.set_path(&format!("{}/", base.path()));
    }

    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      key: key.to_string(),
    })
  }

  /// Client with the public anon key, or None when not configured.
  pub fn public(config: &Config) -> Option<Self> {
    Self::with_key(config, Config::anon_key(), "anon")
  }

  /// Client with the service-role key. Bypasses row-level security.
  pub fn admin(config: &Config) -> Option<Self> {
    Self::with_key(config, Config::service_role_key(), "service_role")
  }

  fn with_key(config: &Config, key: Option<String>, role: &str) -> Option<Self> {
    let url = config.supabase_url();
    tracing::info!(
      role,
      has_url = url.is_some(),
      has_key = key.is_some(),
      "Supabase client configuration"
    );

    match Self::new(&url?, &key?, config.http.timeout()) {
      Ok(client) => Some(client),
      Err(e) => {
        tracing::error!(role, error = %e, "Supabase client not initialized");
        None
      }
    }
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint '{}': {}", path, e))
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    self
      .http
      .request(method, url)
      .header("apikey", &self.key)
      .bearer_auth(&self.key)
  }

  fn table_request(&self, method: Method, table: &str, query: &Query) -> Result<RequestBuilder> {
    let url = self.endpoint(&format!("rest/v1/{}", table))?;
    Ok(self.request(method, url).query(&query.pairs()))
  }

  /// `GET /rest/v1/{table}`
  pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>> {
    let response = self
      .table_request(Method::GET, table, query)?
      .send()
      .await
      .map_err(|e| eyre!("Failed to query {}: {}", table, e))?;

    decode(table, response).await
  }

  /// `POST /rest/v1/{table}`, returning the inserted rows.
  pub async fn insert<B, T>(&self, table: &str, rows: &B) -> Result<Vec<T>>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let response = self
      .table_request(Method::POST, table, &Query::new())?
      .header("Prefer", "return=representation")
      .json(rows)
      .send()
      .await
      .map_err(|e| eyre!("Failed to insert into {}: {}", table, e))?;

    decode(table, response).await
  }

  /// `PATCH /rest/v1/{table}?{filter}`, returning the updated rows.
  pub async fn update<B, T>(&self, table: &str, filter: &Query, patch: &B) -> Result<Vec<T>>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let response = self
      .table_request(Method::PATCH, table, filter)?
      .header("Prefer", "return=representation")
      .json(patch)
      .send()
      .await
      .map_err(|e| eyre!("Failed to update {}: {}", table, e))?;

    decode(table, response).await
  }

  /// `DELETE /rest/v1/{table}?{filter}`
  pub async fn delete(&self, table: &str, filter: &Query) -> Result<()> {
    let response = self
      .table_request(Method::DELETE, table, filter)?
      .send()
      .await
      .map_err(|e| eyre!("Failed to delete from {}: {}", table, e))?;

    check_status(table, response).await?;
    Ok(())
  }

  /// `POST /functions/v1/{name}`
  pub async fn invoke<B, T>(&self, name: &str, body: &B) -> Result<T>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let url = self.endpoint(&format!("functions/v1/{}", name))?;
    let response = self
      .request(Method::POST, url)
      .json(body)
      .send()
      .await
      .map_err(|e| eyre!("Failed to invoke function {}: {}", name, e))?;

    let response = check_status(name, response).await?;
    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse {} response: {}", name, e))
  }

  /// Reachability probe. Any HTTP answer counts as reachable.
  pub async fn ping(&self) -> Result<()> {
    let url = self.endpoint("rest/v1/")?;
    self
      .request(Method::HEAD, url)
      .send()
      .await
      .map_err(|e| eyre!("Supabase unreachable: {}", e))?;
    Ok(())
  }
}

async fn check_status(what: &str, response: reqwest::Response) -> Result<reqwest::Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  Err(eyre!("{}", describe_failure(what, status, &body)))
}

async fn decode<T: DeserializeOwned>(table: &str, response: reqwest::Response) -> Result<Vec<T>> {
  let response = check_status(table, response).await?;
  let rows = response
    .json::<Vec<T>>()
    .await
    .map_err(|e| eyre!("Failed to parse {} rows: {}", table, e))?;
  tracing::debug!(table, count = rows.len(), "Fetched rows");
  Ok(rows)
}

/// Human-readable failure, preferring the PostgREST error message.
fn describe_failure(what: &str, status: StatusCode, body: &str) -> String {
  match serde_json::from_str::<ApiError>(body) {
    Ok(err) => {
      let mut text = format!("{} request failed ({}): {}", what, status, err.message);
      if let Some(hint) = err.hint.filter(|h| !h.is_empty()) {
        text.push_str(&format!(" (hint: {})", hint));
      }
      text
    }
    Err(_) if body.trim().is_empty() => format!("{} request failed ({})", what, status),
    Err(_) => format!("{} request failed ({}): {}", what, status, body.trim()),
  }
}
