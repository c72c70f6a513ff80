//! Parsing of free-text upstream inference responses.
//!
//! The inference step answers in a loose line format:
//!
//! ```text
//! Upstream Column(s): [amount, quantity], Upstream Table(s): [stg_payments, stg_orders],
//! Reasoning: amount is summed per order
//! ```
//!
//! [`parse_inference_response`] pulls the bracketed lists and the reasoning
//! out of that text so they can be stored on a [`LineageFact`].

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::LineageFact;

static TABLES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Upstream Table\(s\):\s*\[([^\]]*)\]").unwrap());
static COLUMNS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Upstream Column\(s\):\s*\[([^\]]*)\]").unwrap());
static REASONING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Reasoning:\s*(.*)").unwrap());

/// Upstream lists and reasoning extracted from an inference response.
///
/// Any part missing from the response is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredUpstream {
    pub upstream_tables: String,
    pub upstream_columns: String,
    pub reasoning: String,
}

impl InferredUpstream {
    pub fn is_empty(&self) -> bool {
        self.upstream_tables.is_empty()
            && self.upstream_columns.is_empty()
            && self.reasoning.is_empty()
    }

    /// Store the parsed lists and reasoning on a fact.
    pub fn apply_to(&self, fact: &mut LineageFact) {
        fact.upstream_table_list = self.upstream_tables.clone();
        fact.upstream_column_list = self.upstream_columns.clone();
        fact.reasoning = self.reasoning.clone();
    }
}

/// Parse an inference response. Never fails; unmatched parts stay empty.
pub fn parse_inference_response(response: &str) -> InferredUpstream {
    let response = response.split_whitespace().collect::<Vec<_>>().join(" ");

    let capture = |pattern: &Regex| {
        pattern
            .captures(&response)
            .and_then(|c| c.get(1))
            .map(|m| strip_brackets(m.as_str()))
            .unwrap_or_default()
    };

    InferredUpstream {
        upstream_tables: capture(&TABLES_PATTERN),
        upstream_columns: capture(&COLUMNS_PATTERN),
        reasoning: REASONING_PATTERN
            .captures(&response)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
    }
}

fn strip_brackets(s: &str) -> String {
    s.replace(['[', ']'], "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_response() {
        let response = "Upstream Column(s): [amount, quantity],\n  Upstream Table(s): [stg_payments, stg_orders],\nReasoning: amount is   summed per order";
        let parsed = parse_inference_response(response);

        assert_eq!(parsed.upstream_columns, "amount, quantity");
        assert_eq!(parsed.upstream_tables, "stg_payments, stg_orders");
        assert_eq!(parsed.reasoning, "amount is summed per order");
    }

    #[test]
    fn test_parse_missing_parts() {
        let parsed = parse_inference_response("Upstream Table(s): [stg_orders]");
        assert_eq!(parsed.upstream_tables, "stg_orders");
        assert_eq!(parsed.upstream_columns, "");
        assert_eq!(parsed.reasoning, "");
        assert!(!parsed.is_empty());

        assert!(parse_inference_response("no idea").is_empty());
    }

    #[test]
    fn test_apply_to_fact() {
        let parsed = parse_inference_response(
            "Upstream Column(s): [order_id], Upstream Table(s): [stg_orders], Reasoning: one to one mapping",
        );
        let mut fact = LineageFact::new("orders", "order_id");
        parsed.apply_to(&mut fact);

        assert_eq!(fact.upstream_table_list, "stg_orders");
        assert_eq!(fact.upstream_column_list, "order_id");
        assert_eq!(fact.reasoning, "one to one mapping");
    }
}
