//! Supabase access: REST client, wire rows and domain records.

pub mod api_types;
pub mod client;
pub mod types;

pub use client::{Order, Query, SupabaseClient};

/// Table names
pub const SKILLS_TABLE: &str = "skills";
pub const PROJECTS_TABLE: &str = "projects";
pub const MESSAGES_TABLE: &str = "messages";

/// Edge function returning current weather for `{city, lang}`
pub const WEATHER_FUNCTION: &str = "weather";
