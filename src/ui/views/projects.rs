use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::resource::FetchState;
use crate::supabase::types::Project;
use crate::ui::renderfns::truncate;

use super::skills::{border_style, section_title};

pub fn draw_projects(
  frame: &mut Frame,
  area: Rect,
  state: &FetchState<Vec<Project>>,
  selected: usize,
  focused: bool,
) {
  let block = Block::default()
    .title(section_title("Projects", state))
    .borders(Borders::ALL)
    .border_style(border_style(focused));

  if state.data.is_empty() {
    let content = if state.loading {
      "Loading projects..."
    } else {
      "No projects to show."
    };
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let inner = block.inner(area);
  frame.render_widget(block, area);

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(state.data.len().min(6) as u16), // Titles
      Constraint::Length(1),                              // Separator
      Constraint::Min(1),                                 // Selected project
    ])
    .split(inner);

  let width = usize::from(inner.width).saturating_sub(4);
  let items: Vec<ListItem> = state
    .data
    .iter()
    .map(|project| {
      let category = project
        .category
        .map(|c| c.as_str())
        .unwrap_or("-");
      ListItem::new(Line::from(vec![
        Span::styled(format!("{:<14}", category), Style::default().fg(Color::Magenta)),
        Span::raw(truncate(&project.title, width.saturating_sub(14))),
      ]))
    })
    .collect();

  let list = List::new(items)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let selected = selected.min(state.data.len() - 1);
  let mut list_state = ListState::default();
  list_state.select(Some(selected));
  frame.render_stateful_widget(list, chunks[0], &mut list_state);

  frame.render_widget(
    Paragraph::new("─".repeat(usize::from(inner.width))).style(Style::default().fg(Color::DarkGray)),
    chunks[1],
  );

  let project = &state.data[selected];
  let detail = vec![
    Line::from(Span::raw(project.description.clone())),
    Line::from(vec![
      Span::styled("Tech: ", Style::default().fg(Color::DarkGray)),
      Span::styled(project.tech.join(" · "), Style::default().fg(Color::Cyan)),
    ]),
    Line::from(vec![
      Span::styled("Link: ", Style::default().fg(Color::DarkGray)),
      Span::raw(project.link.clone()),
    ]),
  ];
  frame.render_widget(Paragraph::new(detail).wrap(Wrap { trim: true }), chunks[2]);
}
