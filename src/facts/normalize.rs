//! Record normalization: raw facts to a case-insensitive fact table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{last_segment, ColumnKey, LineageFact};
use crate::error::{LineageError, LineageResult};

/// Options controlling how upstream lists are validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Fail on upstream lists of different lengths instead of truncating.
    pub strict_upstream_lists: bool,
}

/// Recorded when a fact's upstream table and column lists differ in length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamMismatch {
    pub tables: usize,
    pub columns: usize,
}

/// A fact after normalization.
///
/// Key fields are trimmed and lower-cased; display text keeps its casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFact {
    pub key: ColumnKey,
    pub unique_key: String,
    /// Lower-cased fully qualified table identifier.
    pub table: String,
    pub description: String,
    pub reasoning: String,
    /// Upstream columns in list order.
    pub upstream: Vec<ColumnKey>,
    pub upstream_mismatch: Option<UpstreamMismatch>,
}

/// Normalized facts indexed by [`ColumnKey`].
///
/// Iteration follows the order facts were supplied in.
#[derive(Debug, Clone, Default)]
pub struct FactTable {
    facts: Vec<NormalizedFact>,
    index: HashMap<ColumnKey, usize>,
    by_column: HashMap<String, Vec<usize>>,
}

impl FactTable {
    /// Normalize facts with default options.
    pub fn from_facts<I>(facts: I) -> LineageResult<Self>
    where
        I: IntoIterator<Item = LineageFact>,
    {
        normalize(facts, NormalizeOptions::default())
    }

    pub fn get(&self, key: &ColumnKey) -> Option<&NormalizedFact> {
        self.index.get(key).map(|&i| &self.facts[i])
    }

    /// Look up a fact by case-insensitive model and column.
    pub fn lookup(&self, model: &str, column: &str) -> Option<&NormalizedFact> {
        self.get(&ColumnKey::normalized(model, column))
    }

    pub fn contains(&self, key: &ColumnKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedFact> {
        self.facts.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ColumnKey> {
        self.facts.iter().map(|f| &f.key)
    }

    /// Keys of every fact a reporting-side `table.column` reference can name.
    ///
    /// The table matches on the model name, the fully qualified table
    /// identifier, or the last segment of a qualified name. More than one key
    /// comes back when the reference is ambiguous.
    pub fn resolve(&self, table: &str, column: &str) -> Vec<ColumnKey> {
        let table = table.trim().to_lowercase();
        if table.is_empty() {
            return Vec::new();
        }
        let short = last_segment(&table);
        let column = last_segment(column).to_lowercase();

        let Some(candidates) = self.by_column.get(&column) else {
            return Vec::new();
        };

        let exact: Vec<ColumnKey> = candidates
            .iter()
            .map(|&i| &self.facts[i])
            .filter(|f| f.key.model == table || f.table == table)
            .map(|f| f.key.clone())
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        candidates
            .iter()
            .map(|&i| &self.facts[i])
            .filter(|f| last_segment(&f.key.model) == short || last_segment(&f.table) == short)
            .map(|f| f.key.clone())
            .collect()
    }
}

/// Normalize a batch of raw facts into a [`FactTable`].
///
/// Fails with [`LineageError::DuplicateFact`] when two facts share a key.
/// Facts with an empty model or column are skipped with a warning.
pub fn normalize<I>(facts: I, options: NormalizeOptions) -> LineageResult<FactTable>
where
    I: IntoIterator<Item = LineageFact>,
{
    let mut table = FactTable::default();

    for raw in facts {
        let key = ColumnKey::normalized(raw.model_name(), &raw.column);
        if key.model.is_empty() || key.column.is_empty() {
            warn!(unique_key = %raw.unique_key, "skipping fact without model or column name");
            continue;
        }

        if let Some(&existing) = table.index.get(&key) {
            return Err(LineageError::DuplicateFact {
                key,
                first: table.facts[existing].unique_key.clone(),
                second: raw.unique_key.trim().to_string(),
            });
        }

        let (upstream, upstream_mismatch) = parse_upstream(&key, &raw, options)?;

        let position = table.facts.len();
        table.index.insert(key.clone(), position);
        table
            .by_column
            .entry(key.column.clone())
            .or_default()
            .push(position);
        table.facts.push(NormalizedFact {
            key,
            unique_key: raw.unique_key.trim().to_string(),
            table: raw.table.trim().to_lowercase(),
            description: raw.description.trim().to_string(),
            reasoning: raw.reasoning.trim().to_string(),
            upstream,
            upstream_mismatch,
        });
    }

    Ok(table)
}

/// Pair the upstream table and column lists positionally.
fn parse_upstream(
    key: &ColumnKey,
    raw: &LineageFact,
    options: NormalizeOptions,
) -> LineageResult<(Vec<ColumnKey>, Option<UpstreamMismatch>)> {
    let tables = split_list(&raw.upstream_table_list);
    let columns = split_list(&raw.upstream_column_list);

    let mismatch = (tables.len() != columns.len()).then_some(UpstreamMismatch {
        tables: tables.len(),
        columns: columns.len(),
    });

    if let Some(m) = mismatch {
        if options.strict_upstream_lists {
            return Err(LineageError::UpstreamListMismatch {
                key: key.clone(),
                tables: m.tables,
                columns: m.columns,
            });
        }
        warn!(
            fact = %key,
            tables = m.tables,
            columns = m.columns,
            "upstream lists differ in length, truncating to the shorter"
        );
    }

    let upstream = tables
        .iter()
        .zip(columns.iter())
        .filter(|(t, c)| !t.is_empty() && !c.is_empty())
        .map(|(t, c)| ColumnKey::normalized(t, c))
        .filter(|k| !k.column.is_empty())
        .collect();

    Ok((upstream, mismatch))
}

/// Split a comma-joined list, keeping empty entries so positions line up.
fn split_list(s: &str) -> Vec<&str> {
    let s = s.trim();
    if s.is_empty() {
        return Vec::new();
    }
    s.split(',')
        .map(|item| {
            item.trim()
                .trim_matches(|c| matches!(c, '[' | ']' | '"' | '\''))
                .trim()
        })
        .collect()
}
