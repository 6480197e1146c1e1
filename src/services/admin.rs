//! Back-office CRUD for `skills` and `projects`.
//!
//! Uses the service-role client, so row-level security does not apply. Unlike
//! the public services, every failure here is returned to the caller.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::supabase::api_types::{ApiProjectRow, ApiSkillRow};
use crate::supabase::types::{AdminProject, AdminSkill, ProjectCategory, SkillCategory};
use crate::supabase::{Order, Query, SupabaseClient, PROJECTS_TABLE, SKILLS_TABLE};

use super::projects::PROJECTS_CACHE_KEY;
use super::skills::SKILLS_CACHE_KEY;
use super::validation::{self, ValidationError};

/// Sentinel id; `id != sentinel` matches every row.
const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// New skill as entered by the admin
#[derive(Debug, Clone)]
pub struct SkillInput {
  pub name: String,
  pub level: i64,
  pub category: SkillCategory,
  pub description: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
struct SkillRow {
  name: String,
  level: i64,
  category: SkillCategory,
  description: Option<String>,
}

impl SkillInput {
  fn validate(&self) -> Result<SkillRow, ValidationError> {
    Ok(SkillRow {
      name: validation::required("name", &self.name)?,
      level: validation::in_range("level", self.level, 0, 100)?,
      category: assignable(self.category)?,
      description: optional_text(self.description.as_deref()),
    })
  }
}

/// Partial skill update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SkillPatch {
  pub name: Option<String>,
  pub level: Option<i64>,
  pub category: Option<SkillCategory>,
  pub description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SkillPatchRow {
  #[serde(skip_serializing_if = "Option::is_none")]
  name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  level: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  category: Option<SkillCategory>,
  #[serde(skip_serializing_if = "Option::is_none")]
  description: Option<String>,
  updated_at: String,
}

impl SkillPatch {
  fn validate(&self) -> Result<SkillPatchRow, ValidationError> {
    Ok(SkillPatchRow {
      name: self
        .name
        .as_deref()
        .map(|n| validation::required("name", n))
        .transpose()?,
      level: self
        .level
        .map(|l| validation::in_range("level", l, 0, 100))
        .transpose()?,
      category: self.category.map(assignable).transpose()?,
      description: self.description.as_ref().map(|d| d.trim().to_string()),
      updated_at: Utc::now().to_rfc3339(),
    })
  }
}

/// New project as entered by the admin
#[derive(Debug, Clone)]
pub struct ProjectInput {
  pub title: String,
  pub description: String,
  pub image: String,
  pub tech: Vec<String>,
  pub link: String,
  pub category: Option<ProjectCategory>,
}

#[derive(Debug, Serialize, PartialEq)]
struct ProjectRow {
  title: String,
  description: String,
  image: String,
  tech: Vec<String>,
  link: String,
  category: Option<ProjectCategory>,
}

impl ProjectInput {
  fn validate(&self) -> Result<ProjectRow, ValidationError> {
    Ok(ProjectRow {
      title: validation::required("title", &self.title)?,
      description: validation::required("description", &self.description)?,
      image: self.image.trim().to_string(),
      tech: clean_tech(&self.tech),
      link: self.link.trim().to_string(),
      category: self.category,
    })
  }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
  pub title: Option<String>,
  pub description: Option<String>,
  pub image: Option<String>,
  pub tech: Option<Vec<String>>,
  pub link: Option<String>,
  pub category: Option<ProjectCategory>,
}

#[derive(Debug, Serialize)]
struct ProjectPatchRow {
  #[serde(skip_serializing_if = "Option::is_none")]
  title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  image: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  tech: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  link: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  category: Option<ProjectCategory>,
  updated_at: String,
}

impl ProjectPatch {
  fn validate(&self) -> Result<ProjectPatchRow, ValidationError> {
    Ok(ProjectPatchRow {
      title: self
        .title
        .as_deref()
        .map(|t| validation::required("title", t))
        .transpose()?,
      description: self
        .description
        .as_deref()
        .map(|d| validation::required("description", d))
        .transpose()?,
      image: self.image.as_ref().map(|i| i.trim().to_string()),
      tech: self.tech.as_deref().map(clean_tech),
      link: self.link.as_ref().map(|l| l.trim().to_string()),
      category: self.category,
      updated_at: Utc::now().to_rfc3339(),
    })
  }
}

/// Writes must name a real category; `Uncategorized` only describes stored rows.
fn assignable(category: SkillCategory) -> Result<SkillCategory, ValidationError> {
  match category {
    SkillCategory::Uncategorized => Err(ValidationError::Required { field: "category" }),
    known => Ok(known),
  }
}

fn optional_text(value: Option<&str>) -> Option<String> {
  value
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(String::from)
}

/// Trim entries and drop empty ones.
fn clean_tech(tech: &[String]) -> Vec<String> {
  tech
    .iter()
    .map(|t| t.trim())
    .filter(|t| !t.is_empty())
    .map(String::from)
    .collect()
}

/// Admin CRUD over the service-role client.
///
/// Successful writes clear the public cache of the touched table.
#[derive(Clone)]
pub struct AdminService {
  client: Option<SupabaseClient>,
  store: Arc<dyn CacheStore>,
}

impl AdminService {
  pub fn new(client: Option<SupabaseClient>, store: Arc<dyn CacheStore>) -> Self {
    Self { client, store }
  }

  fn client(&self) -> Result<&SupabaseClient> {
    self.client.as_ref().ok_or_else(|| {
      eyre!("Supabase admin client not initialized. Set SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY.")
    })
  }

  fn invalidate(&self, key: &str) {
    if let Err(e) = self.store.clear(key) {
      tracing::warn!(key, error = %e, "Failed to invalidate public cache");
    }
  }

  // ==========================================================================
  // skills
  // ==========================================================================

  pub async fn list_skills(&self) -> Result<Vec<AdminSkill>> {
    let query = Query::all()
      .order("category", Order::Asc)
      .order("level", Order::Desc);
    let rows: Vec<ApiSkillRow> = self.client()?.select(SKILLS_TABLE, &query).await?;
    rows.into_iter().map(ApiSkillRow::into_admin).collect()
  }

  pub async fn get_skill(&self, id: &str) -> Result<AdminSkill> {
    let rows: Vec<ApiSkillRow> = self
      .client()?
      .select(SKILLS_TABLE, &Query::all().eq("id", id))
      .await?;
    single(rows, "skill", id)?.into_admin()
  }

  pub async fn create_skill(&self, input: &SkillInput) -> Result<AdminSkill> {
    let row = input.validate()?;
    let rows: Vec<ApiSkillRow> = self.client()?.insert(SKILLS_TABLE, &[row]).await?;
    let created = single(rows, "skill", "new")?.into_admin()?;
    tracing::info!(id = %created.id, name = %created.skill.name, "Created skill");
    self.invalidate(SKILLS_CACHE_KEY);
    Ok(created)
  }

  pub async fn update_skill(&self, id: &str, patch: &SkillPatch) -> Result<AdminSkill> {
    let row = patch.validate()?;
    let rows: Vec<ApiSkillRow> = self
      .client()?
      .update(SKILLS_TABLE, &Query::new().eq("id", id), &row)
      .await?;
    let updated = single(rows, "skill", id)?.into_admin()?;
    tracing::info!(id, "Updated skill");
    self.invalidate(SKILLS_CACHE_KEY);
    Ok(updated)
  }

  pub async fn delete_skill(&self, id: &str) -> Result<()> {
    self
      .client()?
      .delete(SKILLS_TABLE, &Query::new().eq("id", id))
      .await?;
    tracing::info!(id, "Deleted skill");
    self.invalidate(SKILLS_CACHE_KEY);
    Ok(())
  }

  /// Insert many skills at once, returning how many rows were created.
  ///
  /// Every input is validated first; one invalid entry rejects the batch.
  pub async fn import_skills(&self, inputs: &[SkillInput]) -> Result<usize> {
    let rows = inputs
      .iter()
      .map(SkillInput::validate)
      .collect::<Result<Vec<_>, _>>()?;
    if rows.is_empty() {
      return Ok(0);
    }

    let created: Vec<ApiSkillRow> = self.client()?.insert(SKILLS_TABLE, &rows).await?;
    tracing::info!(count = created.len(), "Imported skills");
    self.invalidate(SKILLS_CACHE_KEY);
    Ok(created.len())
  }

  /// Delete every skill row.
  pub async fn clear_all_skills(&self) -> Result<()> {
    self
      .client()?
      .delete(SKILLS_TABLE, &Query::new().neq("id", NIL_UUID))
      .await?;
    tracing::warn!("Deleted all skills");
    self.invalidate(SKILLS_CACHE_KEY);
    Ok(())
  }

  // ==========================================================================
  // projects
  // ==========================================================================

  pub async fn list_projects(&self) -> Result<Vec<AdminProject>> {
    let query = Query::all()
      .order("category", Order::Asc)
      .order("created_at", Order::Desc);
    let rows: Vec<ApiProjectRow> = self.client()?.select(PROJECTS_TABLE, &query).await?;
    rows.into_iter().map(ApiProjectRow::into_admin).collect()
  }

  pub async fn get_project(&self, id: &str) -> Result<AdminProject> {
    let rows: Vec<ApiProjectRow> = self
      .client()?
      .select(PROJECTS_TABLE, &Query::all().eq("id", id))
      .await?;
    single(rows, "project", id)?.into_admin()
  }

  pub async fn create_project(&self, input: &ProjectInput) -> Result<AdminProject> {
    let row = input.validate()?;
    let rows: Vec<ApiProjectRow> = self.client()?.insert(PROJECTS_TABLE, &[row]).await?;
    let created = single(rows, "project", "new")?.into_admin()?;
    tracing::info!(id = %created.id, title = %created.project.title, "Created project");
    self.invalidate(PROJECTS_CACHE_KEY);
    Ok(created)
  }

  pub async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<AdminProject> {
    let row = patch.validate()?;
    let rows: Vec<ApiProjectRow> = self
      .client()?
      .update(PROJECTS_TABLE, &Query::new().eq("id", id), &row)
      .await?;
    let updated = single(rows, "project", id)?.into_admin()?;
    tracing::info!(id, "Updated project");
    self.invalidate(PROJECTS_CACHE_KEY);
    Ok(updated)
  }

  pub async fn delete_project(&self, id: &str) -> Result<()> {
    self
      .client()?
      .delete(PROJECTS_TABLE, &Query::new().eq("id", id))
      .await?;
    tracing::info!(id, "Deleted project");
    self.invalidate(PROJECTS_CACHE_KEY);
    Ok(())
  }
}

/// Exactly one row, as PostgREST `.single()` would demand.
fn single<T>(rows: Vec<T>, what: &str, id: &str) -> Result<T> {
  let count = rows.len();
  let mut rows = rows.into_iter();
  match (rows.next(), count) {
    (Some(row), 1) => Ok(row),
    (None, _) => Err(eyre!("No {} found with id {}", what, id)),
    (Some(_), n) => Err(eyre!("Expected one {} with id {}, found {}", what, id, n)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStore;
  use crate::supabase::client::test_server::serve_once;
  use std::time::Duration;

  fn docker_input(level: i64) -> SkillInput {
    SkillInput {
      name: " Docker ".into(),
      level,
      category: SkillCategory::ItOps,
      description: Some("  ".into()),
    }
  }

  /// Client pointed at a closed port; any request would fail with a connect error.
  fn unreachable_client() -> SupabaseClient {
    SupabaseClient::new("http://127.0.0.1:9", "k", Duration::from_millis(200)).unwrap()
  }

  #[test]
  fn test_skill_input_is_normalized() {
    let row = docker_input(85).validate().unwrap();
    assert_eq!(
      row,
      SkillRow {
        name: "Docker".into(),
        level: 85,
        category: SkillCategory::ItOps,
        description: None,
      }
    );
  }

  #[tokio::test]
  async fn test_invalid_level_rejected_before_request() {
    let admin = AdminService::new(Some(unreachable_client()), Arc::new(MemoryStore::new()));

    let err = admin.create_skill(&docker_input(150)).await.unwrap_err();

    assert_eq!(
      err.downcast_ref::<ValidationError>(),
      Some(&ValidationError::OutOfRange {
        field: "level",
        min: 0,
        max: 100
      })
    );
  }

  #[tokio::test]
  async fn test_uncategorized_skill_rejected_before_request() {
    let admin = AdminService::new(Some(unreachable_client()), Arc::new(MemoryStore::new()));
    let mut input = docker_input(50);
    input.category = SkillCategory::Uncategorized;

    let err = admin.create_skill(&input).await.unwrap_err();
    assert_eq!(
      err.downcast_ref::<ValidationError>(),
      Some(&ValidationError::Required { field: "category" })
    );

    let patch = SkillPatch {
      category: Some(SkillCategory::Uncategorized),
      ..Default::default()
    };
    assert!(patch.validate().is_err());
  }

  #[tokio::test]
  async fn test_import_rejects_whole_batch() {
    let admin = AdminService::new(Some(unreachable_client()), Arc::new(MemoryStore::new()));
    let mut blank = docker_input(50);
    blank.name = "   ".into();

    let err = admin
      .import_skills(&[docker_input(50), blank])
      .await
      .unwrap_err();

    assert!(err.downcast_ref::<ValidationError>().is_some());
    assert_eq!(admin.import_skills(&[]).await.unwrap(), 0);
  }

  #[test]
  fn test_project_tech_cleanup() {
    let input = ProjectInput {
      title: "ETL".into(),
      description: "pipelines".into(),
      image: String::new(),
      tech: vec![" Python ".into(), "".into(), "  ".into(), "SQL".into()],
      link: "#".into(),
      category: Some(ProjectCategory::Data),
    };
    assert_eq!(input.validate().unwrap().tech, vec!["Python", "SQL"]);

    let mut missing = input;
    missing.description = " ".into();
    assert_eq!(
      missing.validate(),
      Err(ValidationError::Required {
        field: "description"
      })
    );
  }

  #[test]
  fn test_patch_serializes_only_set_fields() {
    let patch = SkillPatch {
      level: Some(90),
      ..Default::default()
    };
    let json = serde_json::to_value(patch.validate().unwrap()).unwrap();
    let object = json.as_object().unwrap();
    assert_eq!(object.get("level"), Some(&serde_json::json!(90)));
    assert!(object.contains_key("updated_at"));
    assert!(!object.contains_key("name"));
  }

  #[tokio::test]
  async fn test_unconfigured_admin_errors() {
    let admin = AdminService::new(None, Arc::new(MemoryStore::new()));
    let err = admin.list_skills().await.unwrap_err();
    assert!(err.to_string().contains("SUPABASE_SERVICE_ROLE_KEY"));
  }

  #[tokio::test]
  async fn test_create_skill_invalidates_public_cache() {
    let (url, server) = serve_once(
      201,
      r#"[{"id":"9f1c","name":"Docker","level":85,"category":"it_ops","description":null}]"#,
    )
    .await;
    let store = Arc::new(MemoryStore::new());
    store.set(SKILLS_CACHE_KEY, "{}").unwrap();
    store.set(PROJECTS_CACHE_KEY, "{}").unwrap();
    let client = SupabaseClient::new(&url, "service", Duration::from_secs(5)).unwrap();
    let admin = AdminService::new(Some(client), store.clone());

    let created = admin.create_skill(&docker_input(85)).await.unwrap();

    let request = server.await.unwrap();
    assert_eq!(created.id, "9f1c");
    assert_eq!(created.skill.name, "Docker");
    assert!(request.contains(r#""name":"Docker""#));
    assert!(request.contains(r#""description":null"#));
    assert_eq!(store.keys(), vec![PROJECTS_CACHE_KEY.to_string()]);
  }

  #[tokio::test]
  async fn test_get_missing_project_is_error() {
    let (url, server) = serve_once(200, "[]").await;
    let client = SupabaseClient::new(&url, "service", Duration::from_secs(5)).unwrap();
    let admin = AdminService::new(Some(client), Arc::new(MemoryStore::new()));

    let err = admin.get_project("nope").await.unwrap_err();

    server.await.unwrap();
    assert!(err.to_string().contains("No project found with id nope"));
  }
}
