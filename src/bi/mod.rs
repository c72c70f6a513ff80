//! Reporting-side lineage.
//!
//! The BI metadata extractor produces a nested document:
//!
//! ```text
//! workbooks[] → dashboards[] → upstreamDatasources[] → sheets[] → sheetFieldInstances[]
//! ```
//!
//! Each field instance lists the columns it reads. An upstream column is
//! either a physical column (with the tables and databases it comes from) or
//! a calculation (with a formula and its own upstream columns).
//! [`build_field_tree`] turns one field instance into a [`BiFieldNode`] tree.

mod tree;

pub use tree::{build_field_tree, BiFieldNode, LineageChild, LineageSide};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiLineageDocument {
    #[serde(default)]
    pub workbooks: Vec<Workbook>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
    pub name: String,
    #[serde(default)]
    pub dashboards: Vec<Dashboard>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub name: String,
    #[serde(default)]
    pub upstream_datasources: Vec<DataSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub name: String,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub worksheet_fields: Vec<NamedRef>,
    #[serde(default)]
    pub sheet_field_instances: Vec<FieldInstance>,
}

/// A field placed on a sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInstance {
    pub name: String,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub upstream_columns: Vec<UpstreamColumn>,
}

/// A column or calculation a field reads from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamColumn {
    pub name: String,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub upstream_tables: Vec<NamedRef>,
    #[serde(default)]
    pub upstream_databases: Vec<NamedRef>,
    /// Set for calculations only.
    #[serde(default)]
    pub upstream_columns: Vec<UpstreamColumn>,
}

impl UpstreamColumn {
    pub fn is_calculation(&self) -> bool {
        !self.upstream_columns.is_empty()
            || self.formula.as_deref().is_some_and(|f| !f.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

/// A field instance with the names of everything enclosing it.
#[derive(Debug, Clone, Copy)]
pub struct FieldLocation<'a> {
    pub workbook: &'a str,
    pub dashboard: &'a str,
    pub data_source: &'a str,
    pub sheet: &'a str,
    pub field: &'a FieldInstance,
}

impl BiLineageDocument {
    /// Every field instance in document order.
    pub fn field_instances(&self) -> Vec<FieldLocation<'_>> {
        let mut fields = Vec::new();
        for workbook in &self.workbooks {
            for dashboard in &workbook.dashboards {
                for data_source in &dashboard.upstream_datasources {
                    for sheet in &data_source.sheets {
                        fields.extend(sheet.sheet_field_instances.iter().map(|field| {
                            FieldLocation {
                                workbook: &workbook.name,
                                dashboard: &dashboard.name,
                                data_source: &data_source.name,
                                sheet: &sheet.name,
                                field,
                            }
                        }));
                    }
                }
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "workbooks": [{
            "name": "Jaffle Shop",
            "dashboards": [{
                "name": "Dashboard 1",
                "upstreamDatasources": [{
                    "name": "orders (jaffle)",
                    "sheets": [{
                        "name": "Revenue",
                        "worksheetFields": [{"name": "Amount"}],
                        "sheetFieldInstances": [
                            {
                                "name": "Amount",
                                "formula": "",
                                "upstreamColumns": [{
                                    "name": "amount",
                                    "upstreamDatabases": [{"name": "ANALYTICS"}],
                                    "upstreamTables": [{"name": "orders"}]
                                }]
                            },
                            {
                                "name": "Order Count",
                                "formula": null,
                                "upstreamColumns": [{
                                    "name": "Orders Per Customer",
                                    "formula": "COUNT([order_id]) / COUNTD([customer_id])",
                                    "upstreamColumns": [
                                        {"name": "order_id", "upstreamTables": [{"name": "orders"}]}
                                    ]
                                }]
                            }
                        ]
                    }]
                }]
            }]
        }]
    }"#;

    #[test]
    fn test_deserialize_document() {
        let doc: BiLineageDocument = serde_json::from_str(DOC).unwrap();
        let fields = doc.field_instances();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].workbook, "Jaffle Shop");
        assert_eq!(fields[0].dashboard, "Dashboard 1");
        assert_eq!(fields[0].data_source, "orders (jaffle)");
        assert_eq!(fields[0].sheet, "Revenue");
        assert_eq!(fields[0].field.name, "Amount");

        let column = &fields[0].field.upstream_columns[0];
        assert_eq!(column.upstream_tables[0].name, "orders");
        assert!(!column.is_calculation());

        let calc = &fields[1].field.upstream_columns[0];
        assert!(calc.is_calculation());
        assert_eq!(fields[1].field.formula, None);
    }

    #[test]
    fn test_empty_document() {
        let doc: BiLineageDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.field_instances().is_empty());
    }
}
