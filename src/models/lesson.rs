use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Module code with whitespace stripped; not guaranteed to resolve.
    pub module: String,
    pub description: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub location: String,
}

impl Lesson {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}
