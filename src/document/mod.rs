//! The combined lineage document.
//!
//! [`stitch`] runs every field instance of a BI lineage document through the
//! merger and groups the results as dashboard → data source → field, the
//! shape written out as the combined nested document.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bi::{build_field_tree, BiFieldNode, BiLineageDocument};
use crate::flatten::{flatten, FlatRow, FlattenContext};
use crate::merge::{MergeStats, Merger};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedDocument {
    #[serde(default)]
    pub dashboards: Vec<DashboardLineage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardLineage {
    pub workbook: String,
    pub name: String,
    #[serde(default)]
    pub data_sources: Vec<DataSourceLineage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceLineage {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldLineage>,
}

/// One dashboard field with its combined lineage tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLineage {
    pub sheet: String,
    pub lineage: BiFieldNode,
}

/// Result of [`stitch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StitchOutput {
    pub document: CombinedDocument,
    pub stats: MergeStats,
}

impl CombinedDocument {
    /// Every field in document order, with its dashboard and data source.
    pub fn fields(&self) -> impl Iterator<Item = (&DashboardLineage, &DataSourceLineage, &FieldLineage)> {
        self.dashboards.iter().flat_map(|dashboard| {
            dashboard.data_sources.iter().flat_map(move |data_source| {
                data_source
                    .fields
                    .iter()
                    .map(move |field| (dashboard, data_source, field))
            })
        })
    }

    pub fn field_count(&self) -> usize {
        self.fields().count()
    }

    /// Flatten every field tree, in document order.
    pub fn flatten(&self) -> Vec<FlatRow> {
        self.fields()
            .flat_map(|(dashboard, data_source, field)| {
                let context =
                    FlattenContext::new(&dashboard.name, &data_source.name, &field.lineage.name);
                flatten(&field.lineage, &context)
            })
            .collect()
    }
}

/// Merge every field instance of `document` with database lineage.
pub fn stitch(document: &BiLineageDocument, merger: &Merger<'_>) -> StitchOutput {
    let mut stats = MergeStats::default();
    let mut dashboards = Vec::new();

    for workbook in &document.workbooks {
        for dashboard in &workbook.dashboards {
            let data_sources = dashboard
                .upstream_datasources
                .iter()
                .map(|data_source| {
                    let mut fields = Vec::new();
                    for sheet in &data_source.sheets {
                        for instance in &sheet.sheet_field_instances {
                            let combined = merger.merge(build_field_tree(instance));
                            stats.absorb(combined.stats);
                            fields.push(FieldLineage {
                                sheet: sheet.name.clone(),
                                lineage: combined.root,
                            });
                        }
                    }
                    DataSourceLineage {
                        name: data_source.name.clone(),
                        fields,
                    }
                })
                .collect();

            dashboards.push(DashboardLineage {
                workbook: workbook.name.clone(),
                name: dashboard.name.clone(),
                data_sources,
            });
        }
    }

    let document = CombinedDocument { dashboards };
    info!(
        dashboards = document.dashboards.len(),
        fields = document.field_count(),
        grafted = stats.grafted,
        unmatched = stats.unmatched,
        "stitched reporting and database lineage"
    );
    StitchOutput { document, stats }
}
