//! Input validation for admin and guestbook writes.
//!
//! Validation runs before any request is made; a failed check means nothing
//! was sent.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("{field} is required")]
  Required { field: &'static str },

  #[error("{field} must be between {min} and {max}")]
  OutOfRange {
    field: &'static str,
    min: i64,
    max: i64,
  },

  #[error("{field} must be {min} to {max} characters")]
  Length {
    field: &'static str,
    min: usize,
    max: usize,
  },

  #[error("please enter a valid email address")]
  Email,
}

/// Trimmed, non-empty text.
pub fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(ValidationError::Required { field });
  }
  Ok(trimmed.to_string())
}

/// Trimmed text whose character count lies in `min..=max`.
pub fn length(
  field: &'static str,
  value: &str,
  min: usize,
  max: usize,
) -> Result<String, ValidationError> {
  let trimmed = value.trim();
  let count = trimmed.chars().count();
  if count < min || count > max {
    return Err(ValidationError::Length { field, min, max });
  }
  Ok(trimmed.to_string())
}

pub fn in_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<i64, ValidationError> {
  if value < min || value > max {
    return Err(ValidationError::OutOfRange { field, min, max });
  }
  Ok(value)
}

/// Loose `local@domain.tld` check without whitespace.
pub fn email(value: &str) -> Result<String, ValidationError> {
  let trimmed = value.trim();
  let valid = !trimmed.chars().any(char::is_whitespace)
    && trimmed
      .split_once('@')
      .filter(|(local, domain)| !local.is_empty() && !domain.contains('@'))
      .and_then(|(_, domain)| domain.rsplit_once('.'))
      .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty());

  if valid {
    Ok(trimmed.to_string())
  } else {
    Err(ValidationError::Email)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_required_trims() {
    assert_eq!(required("name", "  Docker ").unwrap(), "Docker");
    assert_eq!(
      required("name", "   "),
      Err(ValidationError::Required { field: "name" })
    );
  }

  #[test]
  fn test_length_counts_chars() {
    assert_eq!(length("name", "李雷", 2, 50).unwrap(), "李雷");
    assert!(length("name", "A", 2, 50).is_err());
    assert!(length("content", &"x".repeat(501), 10, 500).is_err());
  }

  #[test]
  fn test_range() {
    assert_eq!(in_range("level", 100, 0, 100), Ok(100));
    assert_eq!(
      in_range("level", 101, 0, 100),
      Err(ValidationError::OutOfRange {
        field: "level",
        min: 0,
        max: 100
      })
    );
    assert!(in_range("level", -1, 0, 100).is_err());
  }

  #[test]
  fn test_email() {
    assert!(email("neo@matrix.io").is_ok());
    assert!(email("neo@matrix").is_err());
    assert!(email("@matrix.io").is_err());
    assert!(email("neo @matrix.io").is_err());
    assert!(email("neo@@matrix.io").is_err());
  }

  #[test]
  fn test_messages() {
    assert_eq!(
      ValidationError::OutOfRange {
        field: "level",
        min: 0,
        max: 100
      }
      .to_string(),
      "level must be between 0 and 100"
    );
  }
}
