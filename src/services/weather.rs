use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CachePolicy, CacheResult, CacheSource, CacheStore, CachedFetcher, ClearScope};
use crate::supabase::api_types::parse_weather;
use crate::supabase::types::{WeatherData, WeatherNow};
use crate::supabase::{SupabaseClient, WEATHER_FUNCTION};

pub const WEATHER_CACHE_PREFIX: &str = "cyber_weather_cache";
pub const WEATHER_TTL: Duration = Duration::from_secs(5 * 60);

/// Parameters of one weather lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
  /// Explicit city; the language default is used when absent
  pub city: Option<String>,
  pub lang: String,
}

impl WeatherQuery {
  pub fn new(city: Option<String>, lang: &str) -> Self {
    Self {
      city: city.filter(|c| !c.trim().is_empty()),
      lang: lang.to_string(),
    }
  }

  /// `cyber_weather_cache_{city|default}_{lang}`
  pub fn cache_key(&self) -> String {
    format!(
      "{}_{}_{}",
      WEATHER_CACHE_PREFIX,
      self.city.as_deref().unwrap_or("default"),
      self.lang
    )
  }
}

/// Default city per language.
#[derive(Debug, Clone)]
pub struct CityDefaults {
  pub en: String,
  pub zh: String,
}

impl CityDefaults {
  pub fn for_lang(&self, lang: &str) -> &str {
    if lang == "zh" {
      &self.zh
    } else {
      &self.en
    }
  }
}

impl Default for CityDefaults {
  fn default() -> Self {
    Self {
      en: "San Francisco".to_string(),
      zh: "旧金山".to_string(),
    }
  }
}

#[derive(Debug, Serialize)]
struct WeatherRequest<'a> {
  city: &'a str,
  lang: &'a str,
}

/// Current weather with a five minute cache and a synthetic fallback snapshot.
#[derive(Clone)]
pub struct WeatherService {
  fetcher: CachedFetcher<WeatherQuery, WeatherData>,
  defaults: Arc<CityDefaults>,
}

impl WeatherService {
  pub fn new(
    client: Option<SupabaseClient>,
    store: Arc<dyn CacheStore>,
    defaults: CityDefaults,
  ) -> Self {
    let request_defaults = defaults.clone();
    Self::with_source(store, defaults, move |query: WeatherQuery| {
      let client = client.clone();
      let city = query
        .city
        .clone()
        .unwrap_or_else(|| request_defaults.for_lang(&query.lang).to_string());
      async move {
        let client = client.ok_or_else(|| eyre!("Supabase client not initialized"))?;
        let payload: Value = client
          .invoke(
            WEATHER_FUNCTION,
            &WeatherRequest {
              city: &city,
              lang: &query.lang,
            },
          )
          .await?;
        parse_weather(payload)
      }
    })
  }

  pub fn with_source<F, Fut>(store: Arc<dyn CacheStore>, defaults: CityDefaults, source: F) -> Self
  where
    F: Fn(WeatherQuery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<WeatherData>> + Send + 'static,
  {
    let defaults = Arc::new(defaults);
    let fallback_defaults = Arc::clone(&defaults);

    let policy = CachePolicy {
      name: "weather",
      ttl: WEATHER_TTL,
      scope: ClearScope::Prefix(format!("{}_", WEATHER_CACHE_PREFIX)),
    };

    Self {
      fetcher: CachedFetcher::new(
        policy,
        store,
        WeatherQuery::cache_key,
        source,
        move |query: &WeatherQuery| fallback_weather(query, &fallback_defaults),
      ),
      defaults,
    }
  }

  /// Weather for `city` (or the language default).
  ///
  /// The payload's `cached` and `fallback` flags mirror the result source.
  pub async fn get_weather(&self, city: Option<&str>, lang: &str) -> CacheResult<WeatherData> {
    let query = WeatherQuery::new(city.map(String::from), lang);
    let mut result = self.fetcher.fetch(query).await;
    result.data.cached = result.source == CacheSource::Cache;
    result
  }

  pub fn default_city(&self, lang: &str) -> &str {
    self.defaults.for_lang(lang)
  }

  /// Remove cached weather for every city and language.
  pub fn clear_all_cache(&self) {
    self.fetcher.clear_cache();
  }
}

/// Sunny placeholder used when the weather function is unavailable.
pub fn fallback_weather(query: &WeatherQuery, defaults: &CityDefaults) -> WeatherData {
  let now = Utc::now().to_rfc3339();
  let text = if query.lang == "zh" { "晴朗" } else { "Sunny" };

  WeatherData {
    city: query
      .city
      .clone()
      .unwrap_or_else(|| defaults.for_lang(&query.lang).to_string()),
    location_id: "fallback".to_string(),
    now: WeatherNow {
      temp: "22".to_string(),
      feels_like: "23".to_string(),
      icon: "100".to_string(),
      icon_text: "☀️".to_string(),
      text: text.to_string(),
      humidity: "65".to_string(),
      wind_scale: "2".to_string(),
      update_time: now.clone(),
    },
    air: None,
    timestamp: now,
    error: Some("Using fallback data".to_string()),
    fallback: true,
    cached: false,
  }
}

/// Temperature band used to color the badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureBand {
  Hot,
  Warm,
  Cool,
  Cold,
  Unknown,
}

/// Classify a temperature string (degrees Celsius, leading integer).
pub fn temperature_band(temp: &str) -> TemperatureBand {
  let trimmed = temp.trim();
  let digits_end = trimmed
    .char_indices()
    .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && *c == '-')))
    .map(|(i, _)| i)
    .unwrap_or(trimmed.len());

  match trimmed[..digits_end].parse::<i32>() {
    Ok(t) if t >= 30 => TemperatureBand::Hot,
    Ok(t) if t >= 25 => TemperatureBand::Warm,
    Ok(t) if t >= 15 => TemperatureBand::Cool,
    Ok(_) => TemperatureBand::Cold,
    Err(_) => TemperatureBand::Unknown,
  }
}

/// Air quality severity, derived from the provider's bilingual category text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AirQualityLevel {
  Good,
  Moderate,
  SensitiveGroups,
  Unhealthy,
  VeryUnhealthy,
  Hazardous,
  Unknown,
}

pub fn air_quality_level(category: &str) -> AirQualityLevel {
  // Order matters: "Unhealthy for Sensitive Groups" and "Very Unhealthy" both
  // contain "Unhealthy".
  let rules: [(&[&str], AirQualityLevel); 6] = [
    (&["优", "Good"], AirQualityLevel::Good),
    (&["良", "Moderate"], AirQualityLevel::Moderate),
    (
      &["轻度污染", "Unhealthy for Sensitive Groups"],
      AirQualityLevel::SensitiveGroups,
    ),
    (&["重度污染", "Very Unhealthy"], AirQualityLevel::VeryUnhealthy),
    (&["严重污染", "Hazardous"], AirQualityLevel::Hazardous),
    (&["中度污染", "Unhealthy"], AirQualityLevel::Unhealthy),
  ];

  rules
    .iter()
    .find(|(needles, _)| needles.iter().any(|n| category.contains(n)))
    .map(|(_, level)| *level)
    .unwrap_or(AirQualityLevel::Unknown)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStore;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  fn live(city: &str) -> WeatherData {
    let query = WeatherQuery::new(Some(city.to_string()), "en");
    WeatherData {
      location_id: "101".to_string(),
      error: None,
      fallback: false,
      ..fallback_weather(&query, &CityDefaults::default())
    }
  }

  #[test]
  fn test_cache_key_format() {
    assert_eq!(
      WeatherQuery::new(None, "en").cache_key(),
      "cyber_weather_cache_default_en"
    );
    assert_eq!(
      WeatherQuery::new(Some("Paris".into()), "zh").cache_key(),
      "cyber_weather_cache_Paris_zh"
    );
    assert_eq!(
      WeatherQuery::new(Some(" ".into()), "en").cache_key(),
      "cyber_weather_cache_default_en"
    );
  }

  #[tokio::test]
  async fn test_unconfigured_returns_flagged_fallback() {
    let store = Arc::new(MemoryStore::new());
    let service = WeatherService::new(None, store.clone(), CityDefaults::default());

    let result = service.get_weather(None, "zh").await;

    assert_eq!(result.source, CacheSource::Fallback);
    assert!(result.data.fallback);
    assert!(!result.data.cached);
    assert_eq!(result.data.city, "旧金山");
    assert_eq!(result.data.now.text, "晴朗");
    assert_eq!(result.data.location_id, "fallback");
    assert!(store.keys().is_empty());
  }

  #[tokio::test]
  async fn test_second_call_is_marked_cached() {
    let store = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let service = WeatherService::with_source(store, CityDefaults::default(), move |q| {
      counter.fetch_add(1, Ordering::SeqCst);
      let city = q.city.unwrap_or_else(|| "San Francisco".to_string());
      async move { Ok::<_, color_eyre::Report>(live(&city)) }
    });

    let first = service.get_weather(Some("Paris"), "en").await;
    assert_eq!(first.source, CacheSource::Live);
    assert!(!first.data.cached);

    let second = service.get_weather(Some("Paris"), "en").await;
    assert_eq!(second.source, CacheSource::Cache);
    assert!(second.data.cached);
    assert_eq!(second.data.city, "Paris");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A different parameterization is a separate entry
    service.get_weather(Some("Paris"), "zh").await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_clear_all_cache_removes_every_city() {
    let store = Arc::new(MemoryStore::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let service = WeatherService::with_source(store.clone(), CityDefaults::default(), move |q| {
      recorder.lock().unwrap().push(q.cache_key());
      async move { Ok::<_, color_eyre::Report>(live("x")) }
    });

    service.get_weather(Some("Paris"), "en").await;
    service.get_weather(None, "zh").await;
    store.set("language", "zh").unwrap();

    service.clear_all_cache();

    assert_eq!(store.keys(), vec!["language".to_string()]);
    service.get_weather(Some("Paris"), "en").await;
    assert_eq!(seen.lock().unwrap().len(), 3);
  }

  #[tokio::test]
  async fn test_in_band_error_serves_fallback() {
    let store = Arc::new(MemoryStore::new());
    let service = WeatherService::with_source(store, CityDefaults::default(), |_| async {
      parse_weather(serde_json::json!({"error": "city not found"}))
    });

    let result = service.get_weather(Some("Atlantis"), "en").await;

    assert_eq!(result.source, CacheSource::Fallback);
    assert_eq!(result.data.city, "Atlantis");
    assert_eq!(result.data.error.as_deref(), Some("Using fallback data"));
  }

  #[test]
  fn test_temperature_bands() {
    assert_eq!(temperature_band("31"), TemperatureBand::Hot);
    assert_eq!(temperature_band("30"), TemperatureBand::Hot);
    assert_eq!(temperature_band("25"), TemperatureBand::Warm);
    assert_eq!(temperature_band("15°C"), TemperatureBand::Cool);
    assert_eq!(temperature_band("-3"), TemperatureBand::Cold);
    assert_eq!(temperature_band("n/a"), TemperatureBand::Unknown);
  }

  #[test]
  fn test_air_quality_levels() {
    assert_eq!(air_quality_level("优"), AirQualityLevel::Good);
    assert_eq!(air_quality_level("Moderate"), AirQualityLevel::Moderate);
    assert_eq!(
      air_quality_level("Unhealthy for Sensitive Groups"),
      AirQualityLevel::SensitiveGroups
    );
    assert_eq!(air_quality_level("Very Unhealthy"), AirQualityLevel::VeryUnhealthy);
    assert_eq!(air_quality_level("Unhealthy"), AirQualityLevel::Unhealthy);
    assert_eq!(air_quality_level("中度污染"), AirQualityLevel::Unhealthy);
    assert_eq!(air_quality_level("Hazardous"), AirQualityLevel::Hazardous);
    assert_eq!(air_quality_level("???"), AirQualityLevel::Unknown);
  }
}
