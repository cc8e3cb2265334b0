use serde::{Deserialize, Serialize};

/// An ordered, schema-less column→value mapping for one uploaded row.
/// Column labels are caller-defined and carry no semantic meaning to the
/// engine; all matching logic (see `normalize`) scans values only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowData {
    entries: Vec<(String, String)>,
}

impl RowData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.entries.push((column.into(), value.into()));
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.entries.iter().find(|(c, _)| c == column).map(|(_, v)| v.as_str())
    }
}

impl FromIterator<(String, String)> for RowData {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}
