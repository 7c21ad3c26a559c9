//! Named timer configurations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub name: String,
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub sessions_until_long_break: u32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetInput {
    pub name: String,
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub sessions_until_long_break: u32,
    #[serde(default)]
    pub is_default: bool,
}

impl PresetInput {
    pub const FIELDS: &'static [&'static str] = &[
        "name",
        "work_duration",
        "short_break_duration",
        "long_break_duration",
        "sessions_until_long_break",
        "is_default",
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetPatch {
    pub name: Option<String>,
    pub work_duration: Option<u32>,
    pub short_break_duration: Option<u32>,
    pub long_break_duration: Option<u32>,
    pub sessions_until_long_break: Option<u32>,
    pub is_default: Option<bool>,
}

impl PresetPatch {
    pub fn apply_to(self, input: &mut PresetInput) {
        if let Some(v) = self.name {
            input.name = v;
        }
        if let Some(v) = self.work_duration {
            input.work_duration = v;
        }
        if let Some(v) = self.short_break_duration {
            input.short_break_duration = v;
        }
        if let Some(v) = self.long_break_duration {
            input.long_break_duration = v;
        }
        if let Some(v) = self.sessions_until_long_break {
            input.sessions_until_long_break = v;
        }
        if let Some(v) = self.is_default {
            input.is_default = v;
        }
    }
}

impl From<&Preset> for PresetInput {
    fn from(preset: &Preset) -> Self {
        Self {
            name: preset.name.clone(),
            work_duration: preset.work_duration,
            short_break_duration: preset.short_break_duration,
            long_break_duration: preset.long_break_duration,
            sessions_until_long_break: preset.sessions_until_long_break,
            is_default: preset.is_default,
        }
    }
}
