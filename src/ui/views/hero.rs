use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::config::Profile;

pub fn draw_hero(frame: &mut Frame, area: Rect, profile: &Profile) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Magenta));

  let mut contact = Vec::new();
  if let Some(email) = &profile.email {
    contact.push(Span::styled("✉ ", Style::default().fg(Color::Cyan)));
    contact.push(Span::raw(format!("{}   ", email)));
  }
  if let Some(github) = &profile.github {
    contact.push(Span::styled("⌥ ", Style::default().fg(Color::Cyan)));
    contact.push(Span::raw(github.clone()));
  }

  let lines = vec![
    Line::from(Span::styled(
      profile.bio.clone(),
      Style::default().fg(Color::White),
    )),
    Line::from(contact).style(Style::default().fg(Color::DarkGray)),
  ];

  let paragraph = Paragraph::new(lines)
    .block(block)
    .wrap(Wrap { trim: true });
  frame.render_widget(paragraph, area);
}
