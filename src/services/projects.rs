use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CachePolicy, CacheResult, CacheStore, CachedFetcher, ClearScope};
use crate::supabase::api_types::ApiProjectRow;
use crate::supabase::types::{Project, ProjectCategory};
use crate::supabase::{Order, Query, SupabaseClient, PROJECTS_TABLE};

pub const PROJECTS_CACHE_KEY: &str = "cyber_projects_cache";
pub const PROJECTS_TTL: Duration = Duration::from_secs(30 * 60);

/// Public project list with TTL cache and embedded fallback.
#[derive(Clone)]
pub struct ProjectService {
  fetcher: CachedFetcher<(), Vec<Project>>,
}

impl ProjectService {
  pub fn new(client: Option<SupabaseClient>, store: Arc<dyn CacheStore>) -> Self {
    Self::with_source(store, move || {
      let client = client.clone();
      async move {
        let client = client.ok_or_else(|| eyre!("Supabase client not initialized"))?;
        fetch_projects(&client).await
      }
    })
  }

  pub fn with_source<F, Fut>(store: Arc<dyn CacheStore>, source: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Project>>> + Send + 'static,
  {
    let policy = CachePolicy {
      name: "projects",
      ttl: PROJECTS_TTL,
      scope: ClearScope::Key(PROJECTS_CACHE_KEY.to_string()),
    };

    Self {
      fetcher: CachedFetcher::new(
        policy,
        store,
        |_: &()| PROJECTS_CACHE_KEY.to_string(),
        move |_| source(),
        |_| fallback_projects(),
      ),
    }
  }

  pub async fn get_projects(&self) -> CacheResult<Vec<Project>> {
    self.fetcher.fetch(()).await
  }

  /// Projects in one category. `None` and `"all"` return everything.
  pub async fn projects_by_category(&self, category: Option<&str>) -> CacheResult<Vec<Project>> {
    let wanted = match category {
      None | Some("all") => None,
      Some(name) => Some(name.parse::<ProjectCategory>().ok()),
    };

    self.get_projects().await.map(|projects| match wanted {
      None => projects,
      // Unknown category names match nothing
      Some(None) => Vec::new(),
      Some(Some(category)) => projects
        .into_iter()
        .filter(|p| p.category == Some(category))
        .collect(),
    })
  }

  pub fn clear_cache(&self) {
    self.fetcher.clear_cache();
  }
}

/// Ordered by category, newest first.
async fn fetch_projects(client: &SupabaseClient) -> Result<Vec<Project>> {
  let query = Query::all()
    .order("category", Order::Asc)
    .order("created_at", Order::Desc);
  let rows: Vec<ApiProjectRow> = client.select(PROJECTS_TABLE, &query).await?;
  Ok(rows.into_iter().map(ApiProjectRow::into_project).collect())
}

fn project(title: &str, description: &str, image: &str, tech: &[&str]) -> Project {
  Project {
    title: title.to_string(),
    description: description.to_string(),
    image: image.to_string(),
    tech: tech.iter().map(|t| t.to_string()).collect(),
    link: "#".to_string(),
    category: Some(ProjectCategory::HealthcareIt),
  }
}

/// Embedded projects shown when the live source is unavailable.
pub fn fallback_projects() -> Vec<Project> {
  vec![
    project(
      "Regional Public Health Informatization",
      "Delivered real-name care cards, a county health portal mini-program and a unified \
       payment platform across 4 county hospitals, 24 clinics and 536 village health rooms.",
      "/placeholder-project1.jpg",
      &["WeChat Mini Program", "Java", "Spring Boot", "MySQL", "Redis", "HL7/FHIR"],
    ),
    project(
      "Hospital Billing Platform Rollout",
      "Led billing platform delivery for more than ten hospitals: deployment, workflow \
       analysis, third-party and insurance payment integration, finance system hookup.",
      "/placeholder-project2.jpg",
      &["Java", "Spring Boot", "Vue.js", "Oracle", "Redis", "Docker"],
    ),
    project(
      "Infectious Disease Surveillance Data Collection",
      "Deployed data collection software across tiered medical institutions, covering \
       cleansing, standardization, reporting and data quality monitoring.",
      "/placeholder-project3.jpg",
      &["Python", "ETL", "PostgreSQL", "Data Warehouse", "Data Visualization"],
    ),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, MemoryStore};
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn live_projects() -> Vec<Project> {
    vec![
      Project {
        title: "Model serving".into(),
        description: "d".into(),
        image: String::new(),
        tech: vec!["Rust".into()],
        link: "#".into(),
        category: Some(ProjectCategory::Ai),
      },
      Project {
        title: "Uncategorized".into(),
        description: "d".into(),
        image: String::new(),
        tech: Vec::new(),
        link: "#".into(),
        category: None,
      },
    ]
  }

  #[tokio::test]
  async fn test_unconfigured_client_serves_fallback() {
    let store = Arc::new(MemoryStore::new());
    let service = ProjectService::new(None, store.clone());

    let result = service.get_projects().await;

    assert_eq!(result.source, CacheSource::Fallback);
    assert_eq!(result.data, fallback_projects());
    assert!(store.keys().is_empty());
  }

  #[tokio::test]
  async fn test_category_filter() {
    let store = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let service = ProjectService::with_source(store, move || {
      counter.fetch_add(1, Ordering::SeqCst);
      async { Ok::<_, color_eyre::Report>(live_projects()) }
    });

    assert_eq!(service.projects_by_category(None).await.data.len(), 2);
    assert_eq!(service.projects_by_category(Some("all")).await.data.len(), 2);

    let ai = service.projects_by_category(Some("ai")).await;
    assert_eq!(ai.source, CacheSource::Cache);
    assert_eq!(ai.data.len(), 1);
    assert_eq!(ai.data[0].title, "Model serving");

    assert!(service
      .projects_by_category(Some("gardening"))
      .await
      .data
      .is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_remote_error_serves_fallback() {
    let store = Arc::new(MemoryStore::new());
    let service =
      ProjectService::with_source(store.clone(), || async {
        Err::<Vec<Project>, _>(eyre!("502 Bad Gateway"))
      });

    let result = service.get_projects().await;

    assert_eq!(result.source, CacheSource::Fallback);
    assert_eq!(result.data.len(), 3);
    assert_eq!(store.get(PROJECTS_CACHE_KEY).unwrap(), None);
  }
}
