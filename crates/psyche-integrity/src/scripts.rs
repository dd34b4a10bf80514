//! Expected vs. loaded script sources.

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct ScriptInventory {
    expected: BTreeSet<String>,
    loaded: RwLock<BTreeSet<String>>,
}

impl ScriptInventory {
    pub fn new<I, S>(expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected: expected.into_iter().map(Into::into).collect(),
            loaded: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn register_loaded(&self, source: impl Into<String>) {
        self.loaded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.into());
    }

    pub fn loaded(&self) -> Vec<String> {
        self.loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Loaded sources that were never declared.
    pub fn unexpected(&self) -> Vec<String> {
        self.loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .difference(&self.expected)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_only_undeclared_sources() {
        let inventory = ScriptInventory::new(["app.js", "vendor.js"]);
        inventory.register_loaded("app.js");
        inventory.register_loaded("injected.js");
        inventory.register_loaded("injected.js");
        assert_eq!(inventory.unexpected(), vec!["injected.js".to_string()]);
        assert_eq!(inventory.loaded().len(), 2);
    }
}
