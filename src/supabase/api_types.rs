//! Serde-deserializable types matching PostgREST rows and function responses.
//!
//! These types are separate from domain types so loosely typed rows (nullable
//! columns, free-text categories, numeric or uuid ids) can be normalized in one
//! place.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use serde_json::Value;

use super::types::{AdminProject, AdminSkill, Message, Project, Skill, SkillCategory, WeatherData};

/// PostgREST error body
#[derive(Debug, Deserialize)]
pub struct ApiError {
  pub message: String,
  pub code: Option<String>,
  pub details: Option<String>,
  pub hint: Option<String>,
}

/// Render a row id (uuid string or serial integer) as a string.
fn id_string(id: &Value) -> Option<String> {
  match id {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn non_empty(s: Option<String>) -> Option<String> {
  s.filter(|s| !s.trim().is_empty())
}

// ============================================================================
// skills
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiSkillRow {
  #[serde(default)]
  pub id: Value,
  pub name: String,
  pub level: i64,
  pub category: String,
  pub description: Option<String>,
}

impl ApiSkillRow {
  /// Convert to the public shape. An unrecognized category is kept as
  /// [`SkillCategory::Uncategorized`] so the row still shows up.
  pub fn into_skill(self) -> Skill {
    let category = self.category.parse().unwrap_or_else(|e: String| {
      tracing::warn!(skill = %self.name, error = %e, "Unrecognized skill category");
      SkillCategory::Uncategorized
    });
    Skill {
      name: self.name,
      level: self.level.clamp(0, 100) as u8,
      category,
      description: non_empty(self.description),
    }
  }

  pub fn into_admin(self) -> Result<AdminSkill> {
    let id = id_string(&self.id).ok_or_else(|| eyre!("skill row '{}' has no id", self.name))?;
    Ok(AdminSkill {
      id,
      skill: self.into_skill(),
    })
  }
}

pub fn into_skills(rows: Vec<ApiSkillRow>) -> Vec<Skill> {
  rows.into_iter().map(ApiSkillRow::into_skill).collect()
}

// ============================================================================
// projects
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiProjectRow {
  #[serde(default)]
  pub id: Value,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default)]
  pub tech: Option<Vec<String>>,
  #[serde(default)]
  pub link: Option<String>,
  #[serde(default)]
  pub category: Option<String>,
}

impl ApiProjectRow {
  /// Missing tech becomes empty; an unknown category is dropped.
  pub fn into_project(self) -> Project {
    Project {
      title: self.title,
      description: self.description.unwrap_or_default(),
      image: self.image.unwrap_or_default(),
      tech: self.tech.unwrap_or_default(),
      link: self.link.unwrap_or_default(),
      category: self.category.and_then(|c| c.parse().ok()),
    }
  }

  pub fn into_admin(self) -> Result<AdminProject> {
    let id = id_string(&self.id).ok_or_else(|| eyre!("project row '{}' has no id", self.title))?;
    Ok(AdminProject {
      id,
      project: self.into_project(),
    })
  }
}

// ============================================================================
// messages
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiMessageRow {
  pub id: Value,
  pub name: String,
  pub email: Option<String>,
  pub content: String,
  pub created_at: DateTime<Utc>,
}

impl ApiMessageRow {
  pub fn into_message(self) -> Message {
    Message {
      id: id_string(&self.id).unwrap_or_default(),
      name: self.name,
      email: non_empty(self.email),
      content: self.content,
      created_at: self.created_at,
    }
  }
}

// ============================================================================
// weather function
// ============================================================================

/// Interpret the `weather` function payload.
///
/// The function reports upstream failures in-band as `{"error": "..."}`.
pub fn parse_weather(payload: Value) -> Result<WeatherData> {
  if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
    let message = error
      .as_str()
      .map(String::from)
      .unwrap_or_else(|| error.to_string());
    return Err(eyre!("Weather function error: {}", message));
  }

  serde_json::from_value(payload).map_err(|e| eyre!("Malformed weather payload: {}", e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::supabase::types::ProjectCategory;
  use serde_json::json;

  #[test]
  fn test_skill_row_without_description() {
    let row: ApiSkillRow =
      serde_json::from_value(json!({"name": "Docker", "level": 85, "category": "it_ops"})).unwrap();
    let skill = row.into_skill();
    assert_eq!(
      skill,
      Skill {
        name: "Docker".into(),
        level: 85,
        category: SkillCategory::ItOps,
        description: None,
      }
    );
  }

  #[test]
  fn test_skill_row_blank_description_is_none() {
    let row: ApiSkillRow = serde_json::from_value(
      json!({"id": 3, "name": "SQL", "level": 120, "category": "ai", "description": ""}),
    )
    .unwrap();
    let admin = row.into_admin().unwrap();
    assert_eq!(admin.id, "3");
    assert_eq!(admin.skill.level, 100);
    assert_eq!(admin.skill.description, None);
  }

  #[test]
  fn test_unknown_skill_category_is_kept() {
    let rows: Vec<ApiSkillRow> = serde_json::from_value(json!([
      {"name": "Docker", "level": 85, "category": "it_ops"},
      {"name": "Baking", "level": 99, "category": "kitchen"}
    ]))
    .unwrap();
    let skills = into_skills(rows);
    assert_eq!(skills.len(), 2);
    assert_eq!(skills[0].category, SkillCategory::ItOps);
    assert_eq!(skills[1].name, "Baking");
    assert_eq!(skills[1].category, SkillCategory::Uncategorized);
  }

  #[test]
  fn test_project_row_defaults() {
    let row: ApiProjectRow = serde_json::from_value(json!({
      "id": "a1b2", "title": "HIS rollout", "description": "d", "image": "/p.jpg",
      "tech": null, "link": "#", "category": "mystery"
    }))
    .unwrap();
    let admin = row.into_admin().unwrap();
    assert_eq!(admin.id, "a1b2");
    assert!(admin.project.tech.is_empty());
    assert_eq!(admin.project.category, None);
  }

  #[test]
  fn test_project_row_known_category() {
    let row: ApiProjectRow =
      serde_json::from_value(json!({"title": "ETL", "category": "data", "tech": ["Python"]}))
        .unwrap();
    let project = row.into_project();
    assert_eq!(project.category, Some(ProjectCategory::Data));
    assert_eq!(project.tech, vec!["Python".to_string()]);
  }

  #[test]
  fn test_weather_error_payload_is_failure() {
    let err = parse_weather(json!({"error": "quota exceeded"})).unwrap_err();
    assert!(err.to_string().contains("quota exceeded"));
  }

  #[test]
  fn test_weather_malformed_payload_is_failure() {
    assert!(parse_weather(json!({"city": "Paris"})).is_err());
  }

  #[test]
  fn test_message_row_numeric_id() {
    let row: ApiMessageRow = serde_json::from_value(json!({
      "id": 7, "name": "Alex", "email": null, "content": "Great site!",
      "created_at": "2024-05-01T10:00:00Z"
    }))
    .unwrap();
    let message = row.into_message();
    assert_eq!(message.id, "7");
    assert_eq!(message.email, None);
  }
}
