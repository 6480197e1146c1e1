use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::resource::FetchState;
use crate::supabase::types::Message;
use crate::ui::renderfns::truncate;

use super::skills::{border_style, section_title};

pub fn draw_guestbook(
  frame: &mut Frame,
  area: Rect,
  state: &FetchState<Vec<Message>>,
  selected: usize,
  focused: bool,
) {
  let block = Block::default()
    .title(section_title("Guestbook", state))
    .borders(Borders::ALL)
    .border_style(border_style(focused));

  if let (Some(error), true) = (&state.error, state.data.is_empty()) {
    let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
      .block(block)
      .style(Style::default().fg(Color::Red));
    frame.render_widget(paragraph, area);
    return;
  }

  if state.data.is_empty() {
    let content = if state.loading {
      "Loading messages..."
    } else {
      "No messages yet. Leave one with `cyberfolio guestbook post`."
    };
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let width = usize::from(area.width).saturating_sub(34);
  let items: Vec<ListItem> = state
    .data
    .iter()
    .map(|message| {
      ListItem::new(Line::from(vec![
        Span::styled(
          format!("{} ", message.created_at.format("%Y-%m-%d")),
          Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
          format!("{:<16}", truncate(&message.name, 16)),
          Style::default().fg(Color::Magenta),
        ),
        Span::raw(truncate(&message.content.replace('\n', " "), width)),
      ]))
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("> ");

  let mut list_state = ListState::default();
  if focused {
    list_state.select(Some(selected.min(state.data.len() - 1)));
  }
  frame.render_stateful_widget(list, area, &mut list_state);
}
