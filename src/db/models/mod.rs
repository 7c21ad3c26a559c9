pub mod preset;
pub mod session;
pub mod settings;
pub mod task;

pub use preset::{Preset, PresetInput, PresetPatch};
pub use session::{Session, SessionFilter, SessionView};
pub use settings::{SettingsPatch, SettingsValues, TimerSettings};
pub use task::TaskRef;
