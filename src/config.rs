use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder shipped in sample env files; treated as "not configured".
const PLACEHOLDER_URL: &str = "your_supabase_url_here";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub supabase: SupabaseConfig,
  #[serde(default)]
  pub profile: Profile,
  #[serde(default)]
  pub weather: WeatherConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub http: HttpConfig,
  #[serde(default)]
  pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupabaseConfig {
  /// Project URL, e.g. https://abcd.supabase.co (SUPABASE_URL overrides)
  pub url: Option<String>,
}

/// Hero section content
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Profile {
  pub name: String,
  pub title: String,
  pub bio: String,
  pub email: Option<String>,
  pub github: Option<String>,
}

impl Default for Profile {
  fn default() -> Self {
    Self {
      name: "Neo Operator".to_string(),
      title: "IT Ops · AI · Project Management".to_string(),
      bio: "Bridging hospital systems, data pipelines and delivery teams.".to_string(),
      email: None,
      github: None,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherConfig {
  /// Default city for English (CYBERFOLIO_DEFAULT_CITY overrides)
  pub default_city: Option<String>,
  /// Default city for Chinese (CYBERFOLIO_DEFAULT_CITY_ZH overrides)
  pub default_city_zh: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
  /// Persistent SQLite file in the data directory
  #[default]
  Sqlite,
  /// Process-local, lost on exit
  Memory,
  /// Caching disabled
  None,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub backend: CacheBackend,
  /// Override for the SQLite file location
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
  pub timeout_secs: u64,
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self { timeout_secs: 10 }
  }
}

impl HttpConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

/// Automatic refetch triggers for the landing screen.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
  /// Periodic refetch, disabled when unset
  pub interval_secs: Option<u64>,
  pub on_focus: bool,
  pub on_reconnect: bool,
  /// How often the connectivity monitor probes the backend
  pub probe_interval_secs: u64,
}

impl Default for RefreshConfig {
  fn default() -> Self {
    Self {
      interval_secs: None,
      on_focus: true,
      on_reconnect: true,
      probe_interval_secs: 30,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./cyberfolio.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cyberfolio/config.yaml
  ///
  /// Without any file the defaults are used; the site still renders from
  /// fallback data.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => {
        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
      }
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("cyberfolio.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("cyberfolio").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config = Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    tracing::info!(path = %path.display(), "Loaded config");
    Ok(config)
  }

  pub fn parse(contents: &str) -> Result<Self> {
    // An empty file deserializes to unit, not a mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Supabase project URL, from SUPABASE_URL or the config file.
  ///
  /// Returns None when unset or still the placeholder value.
  pub fn supabase_url(&self) -> Option<String> {
    let from_env = std::env::var("SUPABASE_URL").ok();
    usable_url(from_env.as_deref().or(self.supabase.url.as_deref()))
  }

  /// Public (anon) key, subject to row-level security.
  pub fn anon_key() -> Option<String> {
    non_empty_env("SUPABASE_ANON_KEY")
  }

  /// Service-role key for admin operations. Bypasses row-level security.
  pub fn service_role_key() -> Option<String> {
    non_empty_env("SUPABASE_SERVICE_ROLE_KEY")
  }

  /// Default weather city for a language.
  pub fn default_city(&self, lang: &str) -> String {
    if lang == "zh" {
      non_empty_env("CYBERFOLIO_DEFAULT_CITY_ZH")
        .or_else(|| self.weather.default_city_zh.clone())
        .unwrap_or_else(|| "旧金山".to_string())
    } else {
      non_empty_env("CYBERFOLIO_DEFAULT_CITY")
        .or_else(|| self.weather.default_city.clone())
        .unwrap_or_else(|| "San Francisco".to_string())
    }
  }

  pub fn refetch_interval(&self) -> Option<Duration> {
    self
      .refresh
      .interval_secs
      .filter(|secs| *secs > 0)
      .map(Duration::from_secs)
  }
}

fn non_empty_env(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn usable_url(raw: Option<&str>) -> Option<String> {
  raw
    .map(str::trim)
    .filter(|url| !url.is_empty() && *url != PLACEHOLDER_URL)
    .map(|url| url.trim_end_matches('/').to_string())
}
