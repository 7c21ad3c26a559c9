//! Per-user timer preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WORK_DURATION: u32 = 25;
pub const DEFAULT_SHORT_BREAK_DURATION: u32 = 5;
pub const DEFAULT_LONG_BREAK_DURATION: u32 = 15;
pub const DEFAULT_SESSIONS_UNTIL_LONG_BREAK: u32 = 4;
pub const DEFAULT_WORK_SOUND: &str = "bell";
pub const DEFAULT_BREAK_SOUND: &str = "chime";
pub const DEFAULT_VOLUME: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSettings {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub sessions_until_long_break: u32,
    pub auto_start_breaks: bool,
    pub auto_start_work: bool,
    pub enable_audio: bool,
    pub work_sound: String,
    pub break_sound: String,
    pub volume: f64,
    pub enable_notifications: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The editable part of [`TimerSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsValues {
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub sessions_until_long_break: u32,
    pub auto_start_breaks: bool,
    pub auto_start_work: bool,
    pub enable_audio: bool,
    pub work_sound: String,
    pub break_sound: String,
    pub volume: f64,
    pub enable_notifications: bool,
}

impl Default for SettingsValues {
    fn default() -> Self {
        Self {
            work_duration: DEFAULT_WORK_DURATION,
            short_break_duration: DEFAULT_SHORT_BREAK_DURATION,
            long_break_duration: DEFAULT_LONG_BREAK_DURATION,
            sessions_until_long_break: DEFAULT_SESSIONS_UNTIL_LONG_BREAK,
            auto_start_breaks: false,
            auto_start_work: false,
            enable_audio: true,
            work_sound: DEFAULT_WORK_SOUND.into(),
            break_sound: DEFAULT_BREAK_SOUND.into(),
            volume: DEFAULT_VOLUME,
            enable_notifications: true,
        }
    }
}

impl TimerSettings {
    pub fn values(&self) -> SettingsValues {
        SettingsValues {
            work_duration: self.work_duration,
            short_break_duration: self.short_break_duration,
            long_break_duration: self.long_break_duration,
            sessions_until_long_break: self.sessions_until_long_break,
            auto_start_breaks: self.auto_start_breaks,
            auto_start_work: self.auto_start_work,
            enable_audio: self.enable_audio,
            work_sound: self.work_sound.clone(),
            break_sound: self.break_sound.clone(),
            volume: self.volume,
            enable_notifications: self.enable_notifications,
        }
    }
}

/// PATCH body: every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub work_duration: Option<u32>,
    pub short_break_duration: Option<u32>,
    pub long_break_duration: Option<u32>,
    pub sessions_until_long_break: Option<u32>,
    pub auto_start_breaks: Option<bool>,
    pub auto_start_work: Option<bool>,
    pub enable_audio: Option<bool>,
    pub work_sound: Option<String>,
    pub break_sound: Option<String>,
    pub volume: Option<f64>,
    pub enable_notifications: Option<bool>,
}

impl SettingsPatch {
    pub const FIELDS: &'static [&'static str] = &[
        "work_duration",
        "short_break_duration",
        "long_break_duration",
        "sessions_until_long_break",
        "auto_start_breaks",
        "auto_start_work",
        "enable_audio",
        "work_sound",
        "break_sound",
        "volume",
        "enable_notifications",
    ];

    pub fn apply_to(self, values: &mut SettingsValues) {
        if let Some(v) = self.work_duration {
            values.work_duration = v;
        }
        if let Some(v) = self.short_break_duration {
            values.short_break_duration = v;
        }
        if let Some(v) = self.long_break_duration {
            values.long_break_duration = v;
        }
        if let Some(v) = self.sessions_until_long_break {
            values.sessions_until_long_break = v;
        }
        if let Some(v) = self.auto_start_breaks {
            values.auto_start_breaks = v;
        }
        if let Some(v) = self.auto_start_work {
            values.auto_start_work = v;
        }
        if let Some(v) = self.enable_audio {
            values.enable_audio = v;
        }
        if let Some(v) = self.work_sound {
            values.work_sound = v;
        }
        if let Some(v) = self.break_sound {
            values.break_sound = v;
        }
        if let Some(v) = self.volume {
            values.volume = v;
        }
        if let Some(v) = self.enable_notifications {
            values.enable_notifications = v;
        }
    }
}
