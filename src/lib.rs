//! # threadline
//!
//! Column-level lineage for BI dashboards, from the dashboard field down to
//! the source columns in the warehouse.
//!
//! ## Architecture
//!
//! Two independently derived lineage sources are combined into one tree per
//! dashboard field:
//!
//! ```text
//! ┌──────────────────────────────┐      ┌──────────────────────────────┐
//! │  Lineage facts (CSV)         │      │  BI lineage document (JSON)  │
//! │  table, column, upstream     │      │  workbook → dashboard →      │
//! │  table/column lists          │      │  data source → sheet → field │
//! └──────────────────────────────┘      └──────────────────────────────┘
//!                │                                     │
//!                ▼ [facts::normalize]                  ▼ [bi::build_field_tree]
//! ┌──────────────────────────────┐      ┌──────────────────────────────┐
//! │  FactTable                   │      │  BiFieldNode                 │
//! │  (case-insensitive keys)     │      │  (reporting side)            │
//! └──────────────────────────────┘      └──────────────────────────────┘
//!                │                                     │
//!                ▼ [lineage::TreeBuilder]              │
//! ┌──────────────────────────────┐                     │
//! │  LineageNode                 │                     │
//! │  (database side, path-scoped │                     │
//! │   cycle cut)                 │                     │
//! └──────────────────────────────┘                     │
//!                │                                     │
//!                └────────────────┬────────────────────┘
//!                                 ▼ [merge]
//!                ┌──────────────────────────────────┐
//!                │  CombinedTree / CombinedDocument │
//!                └──────────────────────────────────┘
//!                                 │
//!                                 ▼ [flatten]
//!                ┌──────────────────────────────────┐
//!                │  FlatRow (level 1..n)            │
//!                └──────────────────────────────────┘
//! ```
//!
//! The engine is synchronous and performs no I/O; [`export`] holds the file
//! readers and writers used by the `threadline` binary.

pub mod bi;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod facts;
pub mod flatten;
pub mod lineage;
pub mod merge;
pub mod telemetry;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::bi::{build_field_tree, BiFieldNode, BiLineageDocument, LineageChild, LineageSide};
    pub use crate::document::{stitch, CombinedDocument, StitchOutput};
    pub use crate::error::{LineageError, LineageResult};
    pub use crate::facts::{normalize, ColumnKey, FactTable, LineageFact, NormalizeOptions};
    pub use crate::flatten::{flatten, rebuild, FlatRow, FlattenContext};
    pub use crate::lineage::{detect_cycles, LineageNode, TreeBuilder, Truncation};
    pub use crate::merge::{merge, CombinedTree, MergeStats, Merger};
}

pub use error::{LineageError, LineageResult};
