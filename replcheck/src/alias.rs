//! Host → display alias lookup.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    /// Keys are matched case-insensitively.
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(host, alias)| (host.to_ascii_lowercase(), alias))
                .collect(),
        }
    }

    /// Alias for `host`, or the host itself.
    pub fn resolve(&self, host: &str) -> String {
        self.entries
            .get(&host.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| host.to_string())
    }
}
