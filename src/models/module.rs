use serde::{Deserialize, Serialize};

/// A course from the table at the top of the sheet, keyed by `code`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub code: String,
    pub name: String,
    pub credits: String,
    pub lead: String,
    pub fill_color: String,
}

impl Module {
    /// Calendar summary, e.g. `[CS101] Intro`.
    pub fn summary(&self) -> String {
        format!("[{}] {}", self.code, self.name)
    }
}
