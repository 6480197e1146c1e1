use color_eyre::Result;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::cache::CacheStore;

pub const LANGUAGE_KEY: &str = "language";
pub const SELECTED_CITY_KEY: &str = "cyber_weather_selected_city";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
  #[default]
  En,
  Zh,
}

impl Language {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::En => "en",
      Self::Zh => "zh",
    }
  }

  pub fn toggle(self) -> Self {
    match self {
      Self::En => Self::Zh,
      Self::Zh => Self::En,
    }
  }
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Language {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "en" => Ok(Self::En),
      "zh" => Ok(Self::Zh),
      other => Err(format!("unsupported language '{}' (expected en or zh)", other)),
    }
  }
}

/// Visitor preferences, persisted next to the data caches.
#[derive(Clone)]
pub struct Preferences {
  store: Arc<dyn CacheStore>,
}

impl Preferences {
  pub fn new(store: Arc<dyn CacheStore>) -> Self {
    Self { store }
  }

  pub fn language(&self) -> Language {
    self
      .read(LANGUAGE_KEY)
      .and_then(|raw| raw.parse().ok())
      .unwrap_or_default()
  }

  pub fn set_language(&self, language: Language) -> Result<()> {
    self.store.set(LANGUAGE_KEY, language.as_str())
  }

  pub fn selected_city(&self) -> Option<String> {
    self
      .read(SELECTED_CITY_KEY)
      .map(|c| c.trim().to_string())
      .filter(|c| !c.is_empty())
  }

  /// `None` or a blank name forgets the selection.
  pub fn set_selected_city(&self, city: Option<&str>) -> Result<()> {
    match city.map(str::trim).filter(|c| !c.is_empty()) {
      Some(city) => self.store.set(SELECTED_CITY_KEY, city),
      None => self.store.clear(SELECTED_CITY_KEY),
    }
  }

  fn read(&self, key: &str) -> Option<String> {
    match self.store.get(key) {
      Ok(value) => value,
      Err(e) => {
        tracing::warn!(key, error = %e, "Failed to read preference");
        None
      }
    }
  }
}
