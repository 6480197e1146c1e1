use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::config::Profile;
use crate::resource::FetchState;
use crate::services::preferences::Language;
use crate::services::weather::{air_quality_level, temperature_band};
use crate::supabase::types::WeatherData;

use super::utils::{air_quality_color, band_color, source_color};

/// Draw the header bar with name, title, language and the weather badge
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  profile: &Profile,
  language: Language,
  weather: &FetchState<Option<WeatherData>>,
) {
  let mut spans = vec![
    Span::styled(
      format!(" {} ", profile.name),
      Style::default().fg(Color::Magenta).bold(),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", profile.title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", language.as_str().to_uppercase()),
      Style::default().fg(Color::Cyan),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::raw(" "),
  ];
  spans.extend(weather_badge(weather));

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn weather_badge(state: &FetchState<Option<WeatherData>>) -> Vec<Span<'static>> {
  let Some(weather) = &state.data else {
    let text = if state.loading { "weather..." } else { "weather n/a" };
    return vec![Span::styled(text, Style::default().fg(Color::DarkGray))];
  };

  let now = &weather.now;
  let mut spans = vec![
    Span::raw(format!("{} ", now.icon_text)),
    Span::styled(
      format!("{}°C", now.temp),
      Style::default().fg(band_color(temperature_band(&now.temp))).bold(),
    ),
    Span::raw(format!(" {} · {}", now.text, weather.city)),
  ];

  if let Some(air) = &weather.air {
    spans.push(Span::raw(" · "));
    spans.push(Span::styled(
      format!("AQI {} {}", air.aqi, air.category),
      Style::default().fg(air_quality_color(air_quality_level(&air.category))),
    ));
  }

  if let Some(source) = state.source {
    spans.push(Span::styled(
      format!(" [{}]", source.label()),
      Style::default().fg(source_color(Some(source))),
    ));
  }

  spans
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use crate::services::weather::{fallback_weather, CityDefaults, WeatherQuery};

  fn text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.content.as_ref()).collect()
  }

  #[test]
  fn test_badge_shows_fallback_snapshot() {
    let defaults = CityDefaults::default();
    let weather = fallback_weather(&WeatherQuery::new(None, "en"), &defaults);
    let state = FetchState {
      loading: false,
      error: None,
      data: Some(weather),
      source: Some(CacheSource::Fallback),
    };

    let badge = text(&weather_badge(&state));

    assert!(badge.contains("22°C"));
    assert!(badge.contains("San Francisco"));
    assert!(badge.ends_with("[fallback]"));
  }

  #[test]
  fn test_badge_while_loading() {
    let state = FetchState {
      loading: true,
      ..FetchState::default()
    };
    assert_eq!(text(&weather_badge(&state)), "weather...");
  }
}
