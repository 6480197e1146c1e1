use color_eyre::{eyre::eyre, Result};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CachePolicy, CacheResult, CacheStore, CachedFetcher, ClearScope};
use crate::supabase::api_types::{into_skills, ApiSkillRow};
use crate::supabase::types::{Skill, SkillCategory};
use crate::supabase::{Order, Query, SupabaseClient, SKILLS_TABLE};

pub const SKILLS_CACHE_KEY: &str = "cyber_skills_cache";
pub const SKILLS_TTL: Duration = Duration::from_secs(30 * 60);

/// Skills grouped by category, in category order
pub type SkillsByCategory = BTreeMap<SkillCategory, Vec<Skill>>;

/// Public skills list with TTL cache and embedded fallback.
#[derive(Clone)]
pub struct SkillService {
  fetcher: CachedFetcher<(), Vec<Skill>>,
}

impl SkillService {
  /// Service backed by the `skills` table. `None` means not configured and
  /// every fetch is answered from the fallback table.
  pub fn new(client: Option<SupabaseClient>, store: Arc<dyn CacheStore>) -> Self {
    Self::with_source(store, move || {
      let client = client.clone();
      async move {
        let client = client.ok_or_else(|| eyre!("Supabase client not initialized"))?;
        fetch_skills(&client).await
      }
    })
  }

  /// Service backed by an arbitrary remote source.
  pub fn with_source<F, Fut>(store: Arc<dyn CacheStore>, source: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Skill>>> + Send + 'static,
  {
    let policy = CachePolicy {
      name: "skills",
      ttl: SKILLS_TTL,
      scope: ClearScope::Key(SKILLS_CACHE_KEY.to_string()),
    };

    Self {
      fetcher: CachedFetcher::new(
        policy,
        store,
        |_: &()| SKILLS_CACHE_KEY.to_string(),
        move |_| source(),
        |_| fallback_skills(),
      ),
    }
  }

  pub async fn get_skills(&self) -> CacheResult<Vec<Skill>> {
    self.fetcher.fetch(()).await
  }

  pub async fn skills_by_category(&self) -> CacheResult<SkillsByCategory> {
    self.get_skills().await.map(group_by_category)
  }

  pub fn clear_cache(&self) {
    self.fetcher.clear_cache();
  }
}

/// Ordered by category, strongest skills first.
async fn fetch_skills(client: &SupabaseClient) -> Result<Vec<Skill>> {
  let query = Query::all()
    .order("category", Order::Asc)
    .order("level", Order::Desc);
  let rows: Vec<ApiSkillRow> = client.select(SKILLS_TABLE, &query).await?;
  Ok(into_skills(rows))
}

pub fn group_by_category(skills: Vec<Skill>) -> SkillsByCategory {
  let mut grouped = SkillsByCategory::new();
  for skill in skills {
    grouped.entry(skill.category).or_default().push(skill);
  }
  grouped
}

fn skill(name: &str, level: u8, category: SkillCategory, description: &str) -> Skill {
  Skill {
    name: name.to_string(),
    level,
    category,
    description: Some(description.to_string()),
  }
}

/// Embedded skills shown when the live source is unavailable.
pub fn fallback_skills() -> Vec<Skill> {
  use SkillCategory::*;

  vec![
    skill(
      "Database Administration",
      90,
      ItOps,
      "Oracle, PostgreSQL and MySQL administration and tuning",
    ),
    skill(
      "Linux Operations",
      80,
      ItOps,
      "System administration, daily operations and scripting",
    ),
    skill(
      "Python",
      85,
      Ai,
      "Data science, automation scripts and backend services",
    ),
    skill(
      "Machine Learning",
      75,
      Ai,
      "Classic algorithms and applied models",
    ),
    skill(
      "PMP Project Management",
      90,
      ProjectManagement,
      "Initiation, planning, schedule and cost control",
    ),
    skill(
      "Risk Management",
      80,
      ProjectManagement,
      "Risk identification, assessment and contingency planning",
    ),
    skill(
      "HIS/EMR/LIS Systems",
      85,
      HealthcareIt,
      "Hospital core system workflows, data flow and integration",
    ),
    skill(
      "Online Insurance Payment",
      75,
      HealthcareIt,
      "Medical insurance payment flows for online services",
    ),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{now_millis, CacheEntry, CacheSource, MemoryStore};
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn docker() -> Skill {
    Skill {
      name: "Docker".into(),
      level: 85,
      category: SkillCategory::ItOps,
      description: None,
    }
  }

  fn counting_service(
    store: Arc<MemoryStore>,
    remote: Result<Vec<Skill>, &'static str>,
  ) -> (SkillService, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let service = SkillService::with_source(store, move || {
      counter.fetch_add(1, Ordering::SeqCst);
      let remote = remote.clone();
      async move { remote.map_err(|e| eyre!(e)) }
    });
    (service, calls)
  }

  #[tokio::test]
  async fn test_unconfigured_client_serves_fallback() {
    let store = Arc::new(MemoryStore::new());
    let service = SkillService::new(None, store.clone());

    let result = service.get_skills().await;

    assert_eq!(result.source, CacheSource::Fallback);
    assert_eq!(result.data, fallback_skills());
    assert_eq!(result.data.len(), 8);
    assert!(store.keys().is_empty());
  }

  #[test]
  fn test_fallback_covers_every_category() {
    let grouped = group_by_category(fallback_skills());
    for category in SkillCategory::ALL {
      assert_eq!(grouped[&category].len(), 2, "{}", category);
    }
  }

  #[test]
  fn test_uncategorized_skills_group_last() {
    let mut odd = docker();
    odd.category = SkillCategory::Uncategorized;
    let grouped = group_by_category(vec![odd, docker()]);

    let order: Vec<_> = grouped.keys().copied().collect();
    assert_eq!(order, vec![SkillCategory::ItOps, SkillCategory::Uncategorized]);
  }

  #[tokio::test]
  async fn test_live_skill_is_cached() {
    let store = Arc::new(MemoryStore::new());
    let (service, calls) = counting_service(store.clone(), Ok(vec![docker()]));

    let result = service.get_skills().await;

    assert_eq!(result.source, CacheSource::Live);
    assert_eq!(result.data, vec![docker()]);
    assert_eq!(result.data[0].description, None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let raw = store.get(SKILLS_CACHE_KEY).unwrap().unwrap();
    let entry: CacheEntry<Vec<Skill>> = serde_json::from_str(&raw).unwrap();
    assert_eq!(entry.data, vec![docker()]);
  }

  #[tokio::test]
  async fn test_ttl_boundary_scenario() {
    let store = Arc::new(MemoryStore::new());
    let (service, calls) = counting_service(store.clone(), Ok(vec![docker()]));
    let seed = |age_minutes: i64| {
      let entry = CacheEntry::at(fallback_skills(), now_millis() - age_minutes * 60 * 1000);
      store
        .set(SKILLS_CACHE_KEY, &serde_json::to_string(&entry).unwrap())
        .unwrap();
    };

    seed(29);
    let result = service.get_skills().await;
    assert_eq!(result.source, CacheSource::Cache);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    seed(31);
    let result = service.get_skills().await;
    assert_eq!(result.source, CacheSource::Live);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_remote_error_is_silent_fallback() {
    let store = Arc::new(MemoryStore::new());
    let (service, _) = counting_service(store.clone(), Err("timeout"));

    let result = service.skills_by_category().await;

    assert_eq!(result.source, CacheSource::Fallback);
    assert_eq!(result.data.len(), SkillCategory::ALL.len());
    assert_eq!(store.get(SKILLS_CACHE_KEY).unwrap(), None);
  }

  #[tokio::test]
  async fn test_clear_cache_then_fetch_goes_remote() {
    let store = Arc::new(MemoryStore::new());
    let (service, calls) = counting_service(store.clone(), Ok(vec![docker()]));

    service.get_skills().await;
    service.clear_cache();
    let result = service.get_skills().await;

    assert_eq!(result.source, CacheSource::Live);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
