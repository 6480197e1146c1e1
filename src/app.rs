use crate::config::{Config, Profile};
use crate::connectivity;
use crate::event::{Event, EventHandler};
use crate::resource::{EnvSignal, FetchState, Loaded, Resource, ResourceOptions};
use crate::services::preferences::Language;
use crate::services::Services;
use crate::supabase::types::{Message, Project, Skill, WeatherData};
use crate::ui;
use color_eyre::Result;
use crossterm::event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

/// Landing screen section with keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
  Skills,
  Projects,
  Guestbook,
}

impl Section {
  fn next(self) -> Self {
    match self {
      Self::Skills => Self::Projects,
      Self::Projects => Self::Guestbook,
      Self::Guestbook => Self::Skills,
    }
  }

  fn prev(self) -> Self {
    self.next().next()
  }
}

/// Main application state
pub struct App {
  config: Config,
  services: Services,

  language: Language,
  section: Section,
  project_selected: usize,
  message_selected: usize,

  skills: Resource<Vec<Skill>>,
  projects: Resource<Vec<Project>>,
  weather: Resource<Option<WeatherData>>,
  guestbook: Resource<Vec<Message>>,

  /// Focus and reconnect signals shared by every resource
  signals: broadcast::Sender<EnvSignal>,
  /// Latest connectivity probe result
  online: watch::Receiver<bool>,
  /// Stops the connectivity monitor
  monitor: CancellationToken,

  /// One-shot feedback shown in the status bar
  notice: Option<String>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  /// Build the app and start loading every section. Needs a tokio runtime.
  pub fn new(config: Config, services: Services) -> Self {
    let (signals, _) = broadcast::channel(16);
    let monitor = CancellationToken::new();

    let online = match (&services.public, config.refresh.on_reconnect) {
      (Some(client), true) => connectivity::spawn_monitor(
        Duration::from_secs(config.refresh.probe_interval_secs),
        connectivity::supabase_probe(client.clone()),
        signals.clone(),
        monitor.clone(),
      ),
      // Nothing to probe, report online
      _ => watch::channel(true).1,
    };

    let language = services.preferences.language();
    let options = resource_options(&config);

    let skills = {
      let service = services.skills.clone();
      let clear = services.skills.clone();
      Resource::from_cached(
        options.clone(),
        Some(signals.subscribe()),
        move || {
          let service = service.clone();
          async move { service.get_skills().await }
        },
        move || clear.clear_cache(),
      )
    };

    let projects = {
      let service = services.projects.clone();
      let clear = services.projects.clone();
      Resource::from_cached(
        options.clone(),
        Some(signals.subscribe()),
        move || {
          let service = service.clone();
          async move { service.get_projects().await }
        },
        move || clear.clear_cache(),
      )
    };

    let guestbook = {
      let service = services.guestbook.clone();
      Resource::spawn(
        ResourceOptions {
          enable_cache: false,
          ..options.clone()
        },
        Some(signals.subscribe()),
        move || {
          let service = service.clone();
          async move {
            let data = service.list().await?;
            Ok::<_, color_eyre::Report>(Loaded { data, source: None })
          }
        },
        || {},
      )
    };

    let weather = weather_resource(&services, &options, &signals, language);

    Self {
      config,
      services,
      language,
      section: Section::Skills,
      project_selected: 0,
      message_selected: 0,
      skills,
      projects,
      weather,
      guestbook,
      signals,
      online,
      monitor,
      notice: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableFocusChange)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    // Main loop
    let result = loop {
      if self.should_quit {
        break Ok(());
      }

      // Draw UI
      if let Err(e) = terminal.draw(|frame| ui::draw(frame, self)) {
        break Err(e.into());
      }

      // Handle events
      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break Ok(()),
      }
    };

    // Cleanup terminal
    stdout().execute(DisableFocusChange)?;
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::FocusGained => {
        // Err only means no resource listens for signals
        let _ = self.signals.send(EnvSignal::Focus);
      }
      Event::Tick => {} // Resources publish state, the next draw picks it up
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    self.notice = None;

    match key.code {
      // Quit
      KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      // Navigation
      KeyCode::Tab => self.section = self.section.next(),
      KeyCode::BackTab => self.section = self.section.prev(),
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),

      // Data
      KeyCode::Char('r') => self.refetch_all(),
      KeyCode::Char('c') => {
        self.services.clear_all_caches();
        self.refetch_all();
        self.notice = Some("Caches cleared".to_string());
      }
      KeyCode::Char('l') => self.toggle_language(),

      _ => {}
    }
  }

  fn refetch_all(&self) {
    tracing::debug!("Manual refetch");
    self.skills.request_refetch();
    self.projects.request_refetch();
    self.weather.request_refetch();
    self.guestbook.request_refetch();
  }

  fn toggle_language(&mut self) {
    self.language = self.language.toggle();
    if let Err(e) = self.services.preferences.set_language(self.language) {
      tracing::warn!(error = %e, "Failed to save language");
    }

    // Replacing the resource cancels the lookup for the old language
    self.weather = weather_resource(
      &self.services,
      &resource_options(&self.config),
      &self.signals,
      self.language,
    );
    self.notice = Some(format!("Language: {}", self.language));
  }

  fn move_selection(&mut self, delta: i32) {
    let (selected, len) = match self.section {
      Section::Skills => return,
      Section::Projects => (
        &mut self.project_selected,
        self.projects.state().data.len(),
      ),
      Section::Guestbook => (
        &mut self.message_selected,
        self.guestbook.state().data.len(),
      ),
    };

    if len == 0 {
      *selected = 0;
      return;
    }
    let next = (*selected as i64 + i64::from(delta)).clamp(0, len as i64 - 1);
    *selected = next as usize;
  }

  pub fn profile(&self) -> &Profile {
    &self.config.profile
  }

  pub fn language(&self) -> Language {
    self.language
  }

  pub fn section(&self) -> Section {
    self.section
  }

  pub fn project_selected(&self) -> usize {
    self.project_selected
  }

  pub fn message_selected(&self) -> usize {
    self.message_selected
  }

  pub fn skills_state(&self) -> FetchState<Vec<Skill>> {
    self.skills.state()
  }

  pub fn projects_state(&self) -> FetchState<Vec<Project>> {
    self.projects.state()
  }

  pub fn weather_state(&self) -> FetchState<Option<WeatherData>> {
    self.weather.state()
  }

  pub fn guestbook_state(&self) -> FetchState<Vec<Message>> {
    self.guestbook.state()
  }

  pub fn is_online(&self) -> bool {
    *self.online.borrow()
  }

  pub fn notice(&self) -> Option<&str> {
    self.notice.as_deref()
  }
}

impl Drop for App {
  fn drop(&mut self) {
    self.monitor.cancel();
  }
}

fn resource_options(config: &Config) -> ResourceOptions {
  ResourceOptions {
    auto_fetch: true,
    refetch_interval: config.refetch_interval(),
    enable_cache: true,
    refetch_on_focus: config.refresh.on_focus,
    refetch_on_reconnect: config.refresh.on_reconnect,
  }
}

/// Weather for the remembered city (or the language default).
fn weather_resource(
  services: &Services,
  options: &ResourceOptions,
  signals: &broadcast::Sender<EnvSignal>,
  language: Language,
) -> Resource<Option<WeatherData>> {
  let service = services.weather.clone();
  let clear = services.weather.clone();
  let city = services.preferences.selected_city();
  let lang = language.as_str();

  Resource::from_cached(
    options.clone(),
    Some(signals.subscribe()),
    move || {
      let service = service.clone();
      let city = city.clone();
      async move { service.get_weather(city.as_deref(), lang).await.map(Some) }
    },
    move || clear.clear_all_cache(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, MemoryStore};
  use std::sync::Arc;

  fn app() -> App {
    let config = Config::default();
    let services = Services::with_store(&config, Arc::new(MemoryStore::new()));
    App::new(config, services)
  }

  fn press(app: &mut App, code: KeyCode) {
    app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
  }

  #[tokio::test]
  async fn test_sections_cycle() {
    let mut app = app();
    assert_eq!(app.section(), Section::Skills);

    press(&mut app, KeyCode::Tab);
    assert_eq!(app.section(), Section::Projects);
    press(&mut app, KeyCode::BackTab);
    press(&mut app, KeyCode::BackTab);
    assert_eq!(app.section(), Section::Guestbook);
  }

  #[tokio::test]
  async fn test_language_toggle_is_persisted() {
    let mut app = app();
    assert_eq!(app.language(), Language::En);

    press(&mut app, KeyCode::Char('l'));

    assert_eq!(app.language(), Language::Zh);
    assert_eq!(app.services.preferences.language(), Language::Zh);
    assert_eq!(app.notice(), Some("Language: zh"));
  }

  #[tokio::test]
  async fn test_project_selection_is_clamped() {
    let mut app = app();
    app
      .projects
      .subscribe()
      .wait_for(|s| !s.loading)
      .await
      .unwrap();
    // Unconfigured backend: three embedded projects
    assert_eq!(app.projects_state().source, Some(CacheSource::Fallback));

    press(&mut app, KeyCode::Tab);
    for _ in 0..5 {
      press(&mut app, KeyCode::Char('j'));
    }
    assert_eq!(app.project_selected(), 2);

    press(&mut app, KeyCode::Char('k'));
    assert_eq!(app.project_selected(), 1);
  }

  #[tokio::test]
  async fn test_quit_keys() {
    let mut quitting = app();
    quitting.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(quitting.should_quit);

    let mut clearing = app();
    press(&mut clearing, KeyCode::Char('c'));
    assert!(!clearing.should_quit);
    assert_eq!(clearing.notice(), Some("Caches cleared"));
  }
}
