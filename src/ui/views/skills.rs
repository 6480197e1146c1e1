use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::resource::FetchState;
use crate::services::skills::group_by_category;
use crate::supabase::types::Skill;
use crate::ui::renderfns::{level_bar, source_color, truncate};

const BAR_WIDTH: usize = 12;
const NAME_WIDTH: usize = 22;

pub fn draw_skills(frame: &mut Frame, area: Rect, state: &FetchState<Vec<Skill>>, focused: bool) {
  let block = Block::default()
    .title(section_title("Skills", state))
    .borders(Borders::ALL)
    .border_style(border_style(focused));

  if state.data.is_empty() {
    let content = if state.loading {
      "Loading skills..."
    } else {
      "No skills to show."
    };
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let paragraph = Paragraph::new(skill_lines(&state.data)).block(block);
  frame.render_widget(paragraph, area);
}

/// One heading per category followed by its skills with level bars.
fn skill_lines(skills: &[Skill]) -> Vec<Line<'static>> {
  let mut lines = Vec::new();
  for (category, skills) in group_by_category(skills.to_vec()) {
    lines.push(Line::from(Span::styled(
      category.label(),
      Style::default().fg(Color::Magenta).bold(),
    )));
    for skill in skills {
      lines.push(Line::from(vec![
        Span::raw("  "),
        Span::raw(format!(
          "{:<width$}",
          truncate(&skill.name, NAME_WIDTH),
          width = NAME_WIDTH
        )),
        Span::styled(level_bar(skill.level, BAR_WIDTH), Style::default().fg(Color::Cyan)),
        Span::styled(
          format!(" {:>3}%", skill.level),
          Style::default().fg(Color::DarkGray),
        ),
      ]));
    }
  }
  lines
}

/// ` Title (n) [source] ` with loading and error markers
pub(crate) fn section_title<T>(name: &str, state: &FetchState<Vec<T>>) -> Line<'static> {
  let mut spans = vec![Span::raw(format!(" {} ({}) ", name, state.data.len()))];
  if let Some(source) = state.source {
    spans.push(Span::styled(
      format!("[{}] ", source.label()),
      Style::default().fg(source_color(Some(source))),
    ));
  }
  if state.loading {
    spans.push(Span::styled("loading... ", Style::default().fg(Color::DarkGray)));
  } else if state.error.is_some() {
    spans.push(Span::styled("error ", Style::default().fg(Color::Red)));
  }
  Line::from(spans)
}

pub(crate) fn border_style(focused: bool) -> Style {
  if focused {
    Style::default().fg(Color::Cyan)
  } else {
    Style::default().fg(Color::Blue)
  }
}
