mod renderfns;
mod views;

use crate::app::{App, Section};
use crate::cache::CacheSource;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use renderfns::source_color;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1),  // Header
      Constraint::Length(4),  // Hero
      Constraint::Min(10),    // Skills and projects
      Constraint::Length(8),  // Guestbook
      Constraint::Length(1),  // Status bar
    ])
    .split(frame.area());

  renderfns::draw_header(
    frame,
    chunks[0],
    app.profile(),
    app.language(),
    &app.weather_state(),
  );
  views::hero::draw_hero(frame, chunks[1], app.profile());

  let body = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
    .split(chunks[2]);
  views::skills::draw_skills(
    frame,
    body[0],
    &app.skills_state(),
    app.section() == Section::Skills,
  );
  views::projects::draw_projects(
    frame,
    body[1],
    &app.projects_state(),
    app.project_selected(),
    app.section() == Section::Projects,
  );
  views::guestbook::draw_guestbook(
    frame,
    chunks[3],
    &app.guestbook_state(),
    app.message_selected(),
    app.section() == Section::Guestbook,
  );

  draw_status_bar(frame, chunks[4], app);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let mut spans = Vec::new();

  if !app.is_online() {
    spans.push(Span::styled(" OFFLINE ", Style::default().fg(Color::Black).bg(Color::Red)));
  }

  for (name, source) in [
    ("skills", app.skills_state().source),
    ("projects", app.projects_state().source),
    ("weather", app.weather_state().source),
  ] {
    spans.push(Span::styled(format!(" {}:", name), Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      source_label(source),
      Style::default().fg(source_color(source)),
    ));
  }
  spans.push(Span::raw("  "));

  if let Some(error) = first_error(app) {
    spans.push(Span::styled(
      format!("{}  r:retry", error),
      Style::default().fg(Color::Red),
    ));
  } else if let Some(notice) = app.notice() {
    spans.push(Span::styled(notice.to_string(), Style::default().fg(Color::Yellow)));
  } else {
    spans.push(Span::styled(
      "Tab:section  j/k:nav  r:refresh  c:clear cache  l:language  q:quit",
      Style::default().fg(Color::DarkGray),
    ));
  }

  frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn source_label(source: Option<CacheSource>) -> &'static str {
  source.map(|s| s.label()).unwrap_or("-")
}

fn first_error(app: &App) -> Option<String> {
  [
    ("skills", app.skills_state().error),
    ("projects", app.projects_state().error),
    ("weather", app.weather_state().error),
    ("guestbook", app.guestbook_state().error),
  ]
  .into_iter()
  .find_map(|(name, error)| error.map(|e| format!("{}: {}", name, e)))
}
