//! Domain records shown on the landing screen and edited through the admin surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Skill grouping, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
  ItOps,
  Ai,
  ProjectManagement,
  HealthcareIt,
  /// Stored rows whose category is not one of the above
  Uncategorized,
}

impl SkillCategory {
  pub const ALL: [SkillCategory; 4] = [
    SkillCategory::ItOps,
    SkillCategory::Ai,
    SkillCategory::ProjectManagement,
    SkillCategory::HealthcareIt,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::ItOps => "it_ops",
      Self::Ai => "ai",
      Self::ProjectManagement => "project_management",
      Self::HealthcareIt => "healthcare_it",
      Self::Uncategorized => "uncategorized",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Self::ItOps => "IT Ops",
      Self::Ai => "AI",
      Self::ProjectManagement => "Project Management",
      Self::HealthcareIt => "Healthcare IT",
      Self::Uncategorized => "Other",
    }
  }
}

impl fmt::Display for SkillCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SkillCategory {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|c| c.as_str() == s)
      .ok_or_else(|| format!("unknown skill category '{}'", s))
  }
}

/// A skill as shown publicly (no identity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
  pub name: String,
  /// Proficiency, 0..=100
  pub level: u8,
  pub category: SkillCategory,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// A skill row including its database id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSkill {
  pub id: String,
  #[serde(flatten)]
  pub skill: Skill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectCategory {
  ItOps,
  Ai,
  Data,
  Backend,
  Fullstack,
  HealthcareIt,
}

impl ProjectCategory {
  pub const ALL: [ProjectCategory; 6] = [
    ProjectCategory::ItOps,
    ProjectCategory::Ai,
    ProjectCategory::Data,
    ProjectCategory::Backend,
    ProjectCategory::Fullstack,
    ProjectCategory::HealthcareIt,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::ItOps => "it_ops",
      Self::Ai => "ai",
      Self::Data => "data",
      Self::Backend => "backend",
      Self::Fullstack => "fullstack",
      Self::HealthcareIt => "healthcare_it",
    }
  }
}

impl fmt::Display for ProjectCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ProjectCategory {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|c| c.as_str() == s)
      .ok_or_else(|| format!("unknown project category '{}'", s))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub title: String,
  pub description: String,
  pub image: String,
  pub tech: Vec<String>,
  pub link: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<ProjectCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProject {
  pub id: String,
  #[serde(flatten)]
  pub project: Project,
}

/// Current conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherNow {
  pub temp: String,
  pub feels_like: String,
  /// Provider icon code
  pub icon: String,
  /// Emoji rendering of the icon
  pub icon_text: String,
  pub text: String,
  pub humidity: String,
  pub wind_scale: String,
  pub update_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirQuality {
  pub aqi: String,
  pub category: String,
  pub primary: String,
}

/// Weather snapshot for one city, as returned by the `weather` function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
  pub city: String,
  pub location_id: String,
  pub now: WeatherNow,
  #[serde(default)]
  pub air: Option<AirQuality>,
  pub timestamp: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default)]
  pub cached: bool,
  #[serde(default)]
  pub fallback: bool,
}

/// Guestbook entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  pub content: String,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_skill_category_parse() {
    assert_eq!("it_ops".parse::<SkillCategory>(), Ok(SkillCategory::ItOps));
    assert_eq!(
      "healthcare_it".parse::<SkillCategory>(),
      Ok(SkillCategory::HealthcareIt)
    );
    assert!("cooking".parse::<SkillCategory>().is_err());
  }

  #[test]
  fn test_skill_omits_missing_description() {
    let skill = Skill {
      name: "Docker".into(),
      level: 85,
      category: SkillCategory::ItOps,
      description: None,
    };
    let json = serde_json::to_string(&skill).unwrap();
    assert_eq!(json, r#"{"name":"Docker","level":85,"category":"it_ops"}"#);
  }

  #[test]
  fn test_admin_skill_flattens() {
    let json = r#"{"id":"42","name":"SQL","level":80,"category":"ai"}"#;
    let admin: AdminSkill = serde_json::from_str(json).unwrap();
    assert_eq!(admin.id, "42");
    assert_eq!(admin.skill.category, SkillCategory::Ai);
  }

  #[test]
  fn test_weather_wire_names() {
    let json = r#"{
      "city": "Paris", "locationId": "101",
      "now": {"temp": "18", "feelsLike": "17", "icon": "101", "iconText": "⛅",
              "text": "Cloudy", "humidity": "70", "windScale": "3", "updateTime": "2024-05-01T10:00:00Z"},
      "air": null, "timestamp": "2024-05-01T10:00:00Z"
    }"#;
    let weather: WeatherData = serde_json::from_str(json).unwrap();
    assert_eq!(weather.location_id, "101");
    assert_eq!(weather.now.feels_like, "17");
    assert!(!weather.cached);
    assert!(!weather.fallback);
    assert!(weather.air.is_none());
  }
}
