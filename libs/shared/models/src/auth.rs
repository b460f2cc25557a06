use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The console has a single shared credential; whoever presents it is "the operator".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    pub authenticated_at: DateTime<Utc>,
}

impl Operator {
    pub fn shared() -> Self {
        Self {
            name: "operator".to_string(),
            authenticated_at: Utc::now(),
        }
    }
}
