//! Non-interactive subcommands.

use clap::{Args, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::{CacheResult, CacheSource};
use crate::services::admin::{ProjectInput, ProjectPatch, SkillInput, SkillPatch};
use crate::services::guestbook::NewMessage;
use crate::services::preferences::Language;
use crate::services::skills::fallback_skills;
use crate::services::Services;
use crate::supabase::types::{ProjectCategory, Skill, SkillCategory};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Interactive landing screen (default)
  Tui,

  /// Print skills grouped by category
  Skills {
    #[arg(long)]
    json: bool,
  },

  /// Print projects
  Projects {
    /// Category name, or "all"
    #[arg(short, long)]
    category: Option<String>,
    #[arg(long)]
    json: bool,
  },

  /// Print current weather
  Weather {
    /// City to look up (default: remembered city, then the language default)
    #[arg(long)]
    city: Option<String>,
    /// en or zh (default: saved language)
    #[arg(long)]
    lang: Option<Language>,
    /// Remember --city for later lookups and the TUI
    #[arg(long, requires = "city")]
    remember: bool,
    #[arg(long)]
    json: bool,
  },

  /// Local cache maintenance
  Cache {
    #[command(subcommand)]
    command: CacheCommand,
  },

  /// Back-office edits (requires SUPABASE_SERVICE_ROLE_KEY)
  Admin {
    #[command(subcommand)]
    command: AdminCommand,
  },

  /// Read or sign the guestbook
  Guestbook {
    #[command(subcommand)]
    command: GuestbookCommand,
  },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
  /// Remove cached datasets
  Clear {
    #[arg(value_enum, default_value_t = CacheTarget::All)]
    target: CacheTarget,
  },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTarget {
  Skills,
  Projects,
  Weather,
  All,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
  #[command(subcommand)]
  Skills(AdminSkillCommand),
  #[command(subcommand)]
  Projects(AdminProjectCommand),
}

#[derive(Subcommand, Debug)]
pub enum AdminSkillCommand {
  List,
  Get { id: String },
  Create(SkillArgs),
  Update {
    id: String,
    #[command(flatten)]
    patch: SkillPatchArgs,
  },
  Delete { id: String },
  /// Bulk insert from a JSON array of skills, or the embedded defaults
  Import {
    #[arg(required_unless_present = "defaults")]
    file: Option<PathBuf>,
    #[arg(long, conflicts_with = "file")]
    defaults: bool,
  },
  /// Delete every skill
  Clear {
    #[arg(long)]
    yes: bool,
  },
}

#[derive(Args, Debug)]
pub struct SkillArgs {
  #[arg(long)]
  name: String,
  #[arg(long)]
  level: i64,
  #[arg(long)]
  category: SkillCategory,
  #[arg(long)]
  description: Option<String>,
}

#[derive(Args, Debug)]
pub struct SkillPatchArgs {
  #[arg(long)]
  name: Option<String>,
  #[arg(long)]
  level: Option<i64>,
  #[arg(long)]
  category: Option<SkillCategory>,
  #[arg(long)]
  description: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AdminProjectCommand {
  List,
  Get { id: String },
  Create(ProjectArgs),
  Update {
    id: String,
    #[command(flatten)]
    patch: ProjectPatchArgs,
  },
  Delete { id: String },
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
  #[arg(long)]
  title: String,
  #[arg(long)]
  description: String,
  #[arg(long, default_value = "")]
  image: String,
  /// Comma separated
  #[arg(long, value_delimiter = ',')]
  tech: Vec<String>,
  #[arg(long, default_value = "#")]
  link: String,
  #[arg(long)]
  category: Option<ProjectCategory>,
}

#[derive(Args, Debug)]
pub struct ProjectPatchArgs {
  #[arg(long)]
  title: Option<String>,
  #[arg(long)]
  description: Option<String>,
  #[arg(long)]
  image: Option<String>,
  #[arg(long, value_delimiter = ',')]
  tech: Option<Vec<String>>,
  #[arg(long)]
  link: Option<String>,
  #[arg(long)]
  category: Option<ProjectCategory>,
}

#[derive(Subcommand, Debug)]
pub enum GuestbookCommand {
  /// Newest messages first
  List {
    #[arg(long)]
    json: bool,
  },
  Post {
    #[arg(long)]
    name: String,
    #[arg(long)]
    content: String,
    #[arg(long)]
    email: Option<String>,
  },
}

/// Run one subcommand to completion.
pub async fn run(command: Command, services: &Services) -> Result<()> {
  match command {
    Command::Tui => Err(eyre!("tui is handled by the caller")),
    Command::Skills { json } => {
      let result = services.skills.skills_by_category().await;
      if json {
        return print_json(&result.data);
      }
      print_source(&result);
      for (category, skills) in result.data {
        println!("{}", category.label());
        for skill in skills {
          println!("  {:<28} {:>3}", skill.name, skill.level);
        }
      }
      Ok(())
    }
    Command::Projects { category, json } => {
      let result = services
        .projects
        .projects_by_category(category.as_deref())
        .await;
      if json {
        return print_json(&result.data);
      }
      print_source(&result);
      for project in &result.data {
        let category = project.category.map(|c| c.as_str()).unwrap_or("-");
        println!("{:<14} {}", category, project.title);
        println!("{:<14} {}", "", project.tech.join(", "));
      }
      Ok(())
    }
    Command::Weather {
      city,
      lang,
      remember,
      json,
    } => {
      let prefs = &services.preferences;
      if remember {
        prefs.set_selected_city(city.as_deref())?;
      }
      let lang = lang.unwrap_or_else(|| prefs.language());
      let city = city.or_else(|| prefs.selected_city());
      tracing::debug!(
        city = city.as_deref().unwrap_or(services.weather.default_city(lang.as_str())),
        lang = %lang,
        "Weather lookup"
      );

      let result = services
        .weather
        .get_weather(city.as_deref(), lang.as_str())
        .await;
      if json {
        return print_json(&result.data);
      }
      print_source(&result);
      let weather = &result.data;
      println!(
        "{} {} {}°C (feels {}°C), {}",
        weather.now.icon_text, weather.city, weather.now.temp, weather.now.feels_like, weather.now.text
      );
      println!(
        "humidity {}%  wind {}",
        weather.now.humidity, weather.now.wind_scale
      );
      if let Some(air) = &weather.air {
        println!("AQI {} ({}), primary {}", air.aqi, air.category, air.primary);
      }
      Ok(())
    }
    Command::Cache {
      command: CacheCommand::Clear { target },
    } => {
      match target {
        CacheTarget::Skills => services.skills.clear_cache(),
        CacheTarget::Projects => services.projects.clear_cache(),
        CacheTarget::Weather => services.weather.clear_all_cache(),
        CacheTarget::All => services.clear_all_caches(),
      }
      println!("Cleared {:?} cache", target);
      Ok(())
    }
    Command::Admin { command } => run_admin(command, services).await,
    Command::Guestbook { command } => run_guestbook(command, services).await,
  }
}

async fn run_admin(command: AdminCommand, services: &Services) -> Result<()> {
  let admin = &services.admin;
  match command {
    AdminCommand::Skills(command) => match command {
      AdminSkillCommand::List => print_json(&admin.list_skills().await?),
      AdminSkillCommand::Get { id } => print_json(&admin.get_skill(&id).await?),
      AdminSkillCommand::Create(args) => print_json(&admin.create_skill(&args.into()).await?),
      AdminSkillCommand::Update { id, patch } => {
        print_json(&admin.update_skill(&id, &patch.into()).await?)
      }
      AdminSkillCommand::Delete { id } => {
        admin.delete_skill(&id).await?;
        println!("Deleted skill {}", id);
        Ok(())
      }
      AdminSkillCommand::Import { file, defaults } => {
        let inputs = match file {
          Some(path) if !defaults => read_import(&path)?,
          _ => fallback_skills().into_iter().map(SkillInput::from).collect(),
        };
        let count = admin.import_skills(&inputs).await?;
        println!("Imported {} skills", count);
        Ok(())
      }
      AdminSkillCommand::Clear { yes } => {
        if !yes {
          return Err(eyre!("Refusing to delete every skill without --yes"));
        }
        admin.clear_all_skills().await?;
        println!("Deleted all skills");
        Ok(())
      }
    },
    AdminCommand::Projects(command) => match command {
      AdminProjectCommand::List => print_json(&admin.list_projects().await?),
      AdminProjectCommand::Get { id } => print_json(&admin.get_project(&id).await?),
      AdminProjectCommand::Create(args) => print_json(&admin.create_project(&args.into()).await?),
      AdminProjectCommand::Update { id, patch } => {
        print_json(&admin.update_project(&id, &patch.into()).await?)
      }
      AdminProjectCommand::Delete { id } => {
        admin.delete_project(&id).await?;
        println!("Deleted project {}", id);
        Ok(())
      }
    },
  }
}

async fn run_guestbook(command: GuestbookCommand, services: &Services) -> Result<()> {
  match command {
    GuestbookCommand::List { json } => {
      let messages = services.guestbook.list().await?;
      if json {
        return print_json(&messages);
      }
      for message in &messages {
        println!(
          "{}  {}: {}",
          message.created_at.format("%Y-%m-%d %H:%M"),
          message.name,
          message.content
        );
      }
      Ok(())
    }
    GuestbookCommand::Post {
      name,
      content,
      email,
    } => {
      let posted = services
        .guestbook
        .post(&NewMessage {
          name,
          email,
          content,
        })
        .await?;
      println!("Posted message {}", posted.id);
      Ok(())
    }
  }
}

/// One entry of an import file
#[derive(Debug, Deserialize)]
struct ImportSkill {
  name: String,
  level: i64,
  category: SkillCategory,
  #[serde(default)]
  description: Option<String>,
}

fn read_import(path: &Path) -> Result<Vec<SkillInput>> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
  parse_import(&contents).map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))
}

fn parse_import(contents: &str) -> Result<Vec<SkillInput>> {
  let rows: Vec<ImportSkill> = serde_json::from_str(contents)?;
  Ok(
    rows
      .into_iter()
      .map(|row| SkillInput {
        name: row.name,
        level: row.level,
        category: row.category,
        description: row.description,
      })
      .collect(),
  )
}

impl From<Skill> for SkillInput {
  fn from(skill: Skill) -> Self {
    Self {
      name: skill.name,
      level: i64::from(skill.level),
      category: skill.category,
      description: skill.description,
    }
  }
}

impl From<SkillArgs> for SkillInput {
  fn from(args: SkillArgs) -> Self {
    Self {
      name: args.name,
      level: args.level,
      category: args.category,
      description: args.description,
    }
  }
}

impl From<SkillPatchArgs> for SkillPatch {
  fn from(args: SkillPatchArgs) -> Self {
    Self {
      name: args.name,
      level: args.level,
      category: args.category,
      description: args.description,
    }
  }
}

impl From<ProjectArgs> for ProjectInput {
  fn from(args: ProjectArgs) -> Self {
    Self {
      title: args.title,
      description: args.description,
      image: args.image,
      tech: args.tech,
      link: args.link,
      category: args.category,
    }
  }
}

impl From<ProjectPatchArgs> for ProjectPatch {
  fn from(args: ProjectPatchArgs) -> Self {
    Self {
      title: args.title,
      description: args.description,
      image: args.image,
      tech: args.tech,
      link: args.link,
      category: args.category,
    }
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn print_source<T>(result: &CacheResult<T>) {
  match (result.source, result.cached_at) {
    (CacheSource::Cache, Some(at)) => {
      eprintln!("source: cache (written {})", at.format("%Y-%m-%d %H:%M:%S UTC"))
    }
    (source, _) => eprintln!("source: {}", source.label()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_import() {
    let inputs = parse_import(
      r#"[{"name":"Docker","level":85,"category":"it_ops"},
          {"name":"LLM","level":70,"category":"ai","description":"RAG"}]"#,
    )
    .unwrap();

    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0].category, SkillCategory::ItOps);
    assert_eq!(inputs[0].description, None);
    assert_eq!(inputs[1].description.as_deref(), Some("RAG"));
  }

  #[test]
  fn test_parse_import_rejects_unknown_category() {
    assert!(parse_import(r#"[{"name":"x","level":1,"category":"cooking"}]"#).is_err());
  }

  #[test]
  fn test_fallback_skills_convert_to_inputs() {
    let inputs: Vec<SkillInput> = fallback_skills().into_iter().map(SkillInput::from).collect();
    assert_eq!(inputs.len(), 8);
    assert!(inputs.iter().all(|i| (0..=100).contains(&i.level)));
  }
}
