//! Data services behind the portfolio: cached public reads, guestbook,
//! admin writes and visitor preferences.

pub mod admin;
pub mod guestbook;
pub mod preferences;
pub mod projects;
pub mod skills;
pub mod validation;
pub mod weather;

use color_eyre::Result;
use std::sync::Arc;

use crate::cache::{CacheStore, MemoryStore, NoopStore, SqliteStore};
use crate::config::{CacheBackend, Config};
use crate::supabase::SupabaseClient;

use admin::AdminService;
use guestbook::GuestbookService;
use preferences::Preferences;
use projects::ProjectService;
use skills::SkillService;
use weather::{CityDefaults, WeatherService};

/// Every service, sharing one store and one pair of clients.
#[derive(Clone)]
pub struct Services {
  pub store: Arc<dyn CacheStore>,
  /// Anon client, used for reachability probes
  pub public: Option<SupabaseClient>,
  pub skills: SkillService,
  pub projects: ProjectService,
  pub weather: WeatherService,
  pub guestbook: GuestbookService,
  pub admin: AdminService,
  pub preferences: Preferences,
}

impl Services {
  /// Build from config. `persist = false` forces the in-memory store.
  pub fn from_config(config: &Config, persist: bool) -> Result<Self> {
    let backend = if persist {
      config.cache.backend
    } else {
      CacheBackend::Memory
    };
    let store = open_store(backend, config)?;
    Ok(Self::with_store(config, store))
  }

  pub fn with_store(config: &Config, store: Arc<dyn CacheStore>) -> Self {
    let public = SupabaseClient::public(config);
    let admin = SupabaseClient::admin(config);
    if public.is_none() {
      tracing::warn!("Supabase not configured, serving embedded fallback data");
    }

    let defaults = CityDefaults {
      en: config.default_city("en"),
      zh: config.default_city("zh"),
    };

    Self {
      skills: SkillService::new(public.clone(), Arc::clone(&store)),
      projects: ProjectService::new(public.clone(), Arc::clone(&store)),
      weather: WeatherService::new(public.clone(), Arc::clone(&store), defaults),
      guestbook: GuestbookService::new(public.clone()),
      admin: AdminService::new(admin, Arc::clone(&store)),
      preferences: Preferences::new(Arc::clone(&store)),
      public,
      store,
    }
  }

  /// Drop every cached dataset. Preferences survive.
  pub fn clear_all_caches(&self) {
    self.skills.clear_cache();
    self.projects.clear_cache();
    self.weather.clear_all_cache();
  }
}

fn open_store(backend: CacheBackend, config: &Config) -> Result<Arc<dyn CacheStore>> {
  let store: Arc<dyn CacheStore> = match backend {
    CacheBackend::Sqlite => match &config.cache.path {
      Some(path) => Arc::new(SqliteStore::open(path)?),
      None => Arc::new(SqliteStore::open_default()?),
    },
    CacheBackend::Memory => Arc::new(MemoryStore::new()),
    CacheBackend::None => Arc::new(NoopStore),
  };
  tracing::debug!(?backend, "Opened cache store");
  Ok(store)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::preferences::Language;

  #[tokio::test]
  async fn test_clear_all_keeps_preferences() {
    let store = Arc::new(MemoryStore::new());
    let services = Services::with_store(&Config::default(), store.clone());
    services.preferences.set_language(Language::Zh).unwrap();
    store.set(skills::SKILLS_CACHE_KEY, "{}").unwrap();
    store.set("cyber_weather_cache_Tokyo_en", "{}").unwrap();

    services.clear_all_caches();

    assert_eq!(store.keys(), vec![preferences::LANGUAGE_KEY.to_string()]);
  }

  #[test]
  fn test_sqlite_backend_uses_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.cache.path = Some(dir.path().join("nested").join("cache.db"));

    let services = Services::from_config(&config, true).unwrap();
    services.preferences.set_language(Language::Zh).unwrap();

    assert!(dir.path().join("nested").join("cache.db").exists());
  }

  #[test]
  fn test_backends() {
    let mut config = Config::default();
    config.cache.backend = CacheBackend::None;
    let disabled = Services::from_config(&config, true).unwrap();
    disabled.preferences.set_language(Language::Zh).unwrap();
    assert_eq!(disabled.preferences.language(), Language::En);

    // --no-persist ignores the configured backend
    let memory = Services::from_config(&config, false).unwrap();
    memory.preferences.set_language(Language::Zh).unwrap();
    assert_eq!(memory.preferences.language(), Language::Zh);
  }
}
