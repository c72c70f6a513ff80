//! Change detection between two fact snapshots.
//!
//! Upstream inference is expensive, so only facts that are new or whose SQL
//! changed since the previous snapshot need to go through it again. SQL is
//! compared by content hash.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::LineageFact;

/// SHA256 of the SQL text as lowercase hex, or an empty string for empty SQL.
pub fn sql_digest(sql: &str) -> String {
    if sql.is_empty() {
        return String::new();
    }
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Which unique keys need (re)inference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPlan {
    /// Present now, absent from the previous snapshot.
    pub new: Vec<String>,
    /// Present in both, SQL changed.
    pub changed: Vec<String>,
    /// Present only in the previous snapshot.
    pub removed: Vec<String>,
    pub unchanged: usize,
}

impl RefreshPlan {
    /// Keys to send through inference, new first.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.new.iter().chain(self.changed.iter()).map(String::as_str)
    }

    pub fn is_up_to_date(&self) -> bool {
        self.new.is_empty() && self.changed.is_empty()
    }
}

/// Compare the current facts against the previously inferred snapshot.
///
/// Facts are matched on `unique_key`. Output lists follow the order of the
/// snapshot they come from.
pub fn plan_refresh(current: &[LineageFact], previous: &[LineageFact]) -> RefreshPlan {
    let previous_digests: HashMap<&str, String> = previous
        .iter()
        .map(|f| (f.unique_key.as_str(), sql_digest(&f.sql_text)))
        .collect();

    let mut plan = RefreshPlan::default();
    let mut seen = BTreeSet::new();

    for fact in current {
        let key = fact.unique_key.as_str();
        if !seen.insert(key) {
            continue;
        }
        match previous_digests.get(key) {
            None => plan.new.push(key.to_string()),
            Some(digest) if *digest != sql_digest(&fact.sql_text) => {
                plan.changed.push(key.to_string())
            }
            Some(_) => plan.unchanged += 1,
        }
    }

    let mut removed_seen = BTreeSet::new();
    plan.removed = previous
        .iter()
        .map(|f| f.unique_key.as_str())
        .filter(|k| !seen.contains(k) && removed_seen.insert(*k))
        .map(str::to_string)
        .collect();

    plan
}
