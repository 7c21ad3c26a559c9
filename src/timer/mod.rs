pub mod commands;
pub mod engine;
pub mod state;
pub mod sync;

pub use engine::{NewSession, SessionEngine, SessionUpdate};
pub use state::{SessionAction, SessionStatus, SessionType};
pub use sync::{SyncReport, SyncRequest};
