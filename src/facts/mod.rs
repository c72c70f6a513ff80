//! Flat lineage facts.
//!
//! A [`LineageFact`] is one row of the fact table produced upstream of this
//! crate: a single (table, column) pair together with the SQL that builds it
//! and the inferred comma-joined upstream lists. Facts are case-sensitive as
//! stored; [`normalize`] turns a batch of them into a case-insensitive
//! [`FactTable`] keyed by [`ColumnKey`].

mod normalize;
pub mod refresh;
pub mod response;

pub use normalize::{normalize, FactTable, NormalizeOptions, NormalizedFact, UpstreamMismatch};

use serde::{Deserialize, Serialize};

// =============================================================================
// Raw Fact
// =============================================================================

/// One raw lineage fact, as stored in the warehouse fact table.
///
/// Field names map to the warehouse column headers so a CSV export of that
/// table deserializes directly. Columns absent from the export default to
/// empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageFact {
    #[serde(rename = "UNIQUE_KEY")]
    pub unique_key: String,
    #[serde(rename = "DATABASE")]
    pub database: String,
    #[serde(rename = "SCHEMA")]
    pub schema: String,
    /// Fully qualified model identifier, e.g. `model.jaffle_shop.customers`.
    #[serde(rename = "TABLE_NAME")]
    pub table: String,
    #[serde(rename = "COLUMN_NAME")]
    pub column: String,
    #[serde(rename = "RESOURCE_TYPE")]
    pub resource_type: String,
    /// Short model name, e.g. `customers`.
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "SQL")]
    pub sql_text: String,
    #[serde(rename = "REFERENCE")]
    pub reference_text: String,
    #[serde(rename = "COLUMN_DESCRIPTION")]
    pub description: String,
    #[serde(rename = "REASONING")]
    pub reasoning: String,
    #[serde(rename = "UPSTREAM_TABLE")]
    pub upstream_table_list: String,
    #[serde(rename = "UPSTREAM_COLUMN")]
    pub upstream_column_list: String,
}

impl LineageFact {
    /// Create a fact for `model.column` with no upstream lists.
    pub fn new(model: impl Into<String>, column: impl Into<String>) -> Self {
        let model = model.into();
        let column = column.into();
        Self {
            unique_key: format!("{}.{}", model, column),
            name: model.clone(),
            table: model,
            column,
            ..Self::default()
        }
    }

    /// Set the comma-joined upstream lists.
    pub fn with_upstream(mut self, tables: impl Into<String>, columns: impl Into<String>) -> Self {
        self.upstream_table_list = tables.into();
        self.upstream_column_list = columns.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql_text = sql.into();
        self
    }

    /// The model this fact belongs to: `NAME` when present, otherwise the
    /// last dot-separated segment of `TABLE_NAME`.
    pub fn model_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            last_segment(&self.table)
        } else {
            name
        }
    }
}

// =============================================================================
// Column Key
// =============================================================================

/// Case-insensitive identity of a column: `(lowercase(model), lowercase(column))`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnKey {
    pub model: String,
    pub column: String,
}

impl ColumnKey {
    /// Build a key, trimming and lower-casing both parts.
    ///
    /// A qualified column (`orders.amount`) is reduced to its last segment.
    pub fn normalized(model: &str, column: &str) -> Self {
        Self {
            model: model.trim().to_lowercase(),
            column: last_segment(column).to_lowercase(),
        }
    }

    /// Parse from "model.column" format, splitting at the last dot.
    /// Returns None when either side is empty.
    pub fn parse(s: &str) -> Option<Self> {
        let (model, column) = s.trim().rsplit_once('.')?;
        if model.trim().is_empty() || column.trim().is_empty() {
            return None;
        }
        Some(Self::normalized(model, column))
    }
}

impl std::fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.model, self.column)
    }
}

/// The part of a dotted identifier after the last dot, trimmed.
pub(crate) fn last_segment(s: &str) -> &str {
    let s = s.trim();
    s.rsplit('.').next().unwrap_or(s).trim()
}
