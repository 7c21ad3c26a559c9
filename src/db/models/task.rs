use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only mirror of a task owned by the task-management layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}
