use ratatui::prelude::Color;

use crate::cache::CacheSource;
use crate::services::weather::{AirQualityLevel, TemperatureBand};

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for where a dataset came from
pub fn source_color(source: Option<CacheSource>) -> Color {
  match source {
    Some(CacheSource::Live) => Color::Green,
    Some(CacheSource::Cache) => Color::Cyan,
    Some(CacheSource::Fallback) => Color::Yellow,
    None => Color::DarkGray,
  }
}

/// Fixed-width proficiency bar, e.g. `█████░░░░░` for 50
pub fn level_bar(level: u8, width: usize) -> String {
  let filled = (usize::from(level.min(100)) * width + 50) / 100;
  format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn band_color(band: TemperatureBand) -> Color {
  match band {
    TemperatureBand::Hot => Color::Red,
    TemperatureBand::Warm => Color::LightYellow,
    TemperatureBand::Cool => Color::LightCyan,
    TemperatureBand::Cold => Color::Blue,
    TemperatureBand::Unknown => Color::White,
  }
}

pub fn air_quality_color(level: AirQualityLevel) -> Color {
  match level {
    AirQualityLevel::Good => Color::Green,
    AirQualityLevel::Moderate => Color::Yellow,
    AirQualityLevel::SensitiveGroups => Color::LightRed,
    AirQualityLevel::Unhealthy => Color::Red,
    AirQualityLevel::VeryUnhealthy | AirQualityLevel::Hazardous => Color::Magenta,
    AirQualityLevel::Unknown => Color::DarkGray,
  }
}
