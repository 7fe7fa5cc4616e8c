use std::collections::BTreeSet;

use serde::Serialize;

use triage_protocol::RecordKey;

/// Check-all/check-some state over the currently loaded records.
///
/// `check_all` means the checked set was snapshotted from the loaded
/// records at the time it was last enabled. Pages appended afterwards are
/// not pulled in; the set only changes through explicit toggles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BulkSelection {
    checked: BTreeSet<RecordKey>,
    check_all: bool,
}

impl BulkSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or remove one key. Any manual toggle drops the check-all flag.
    pub fn toggle_one(&mut self, key: &str) {
        self.check_all = false;
        if !self.checked.remove(key) {
            self.checked.insert(key.to_string());
        }
    }

    /// Enable: snapshot exactly the loaded record keys. Disable: clear.
    pub fn toggle_all<'a>(&mut self, checked: bool, loaded: impl Iterator<Item = &'a RecordKey>) {
        if checked {
            self.checked = loaded.cloned().collect();
            self.check_all = true;
        } else {
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        self.checked.clear();
        self.check_all = false;
    }

    pub fn is_checked(&self, key: &str) -> bool {
        self.checked.contains(key)
    }

    pub fn checked(&self) -> &BTreeSet<RecordKey> {
        &self.checked
    }

    pub fn count(&self) -> usize {
        self.checked.len()
    }

    pub fn check_all(&self) -> bool {
        self.check_all
    }
}
