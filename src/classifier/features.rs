//! Feature extraction for a before/after rewrite pair
//!
//! Produces a fixed 10-dimensional f64 vector. The order of `FEATURE_NAMES`
//! is part of the persisted model schema: a model only loads against the
//! exact key list it was trained with.
//!
//!   0..3  complexity (before, after, change)
//!   3..6  line count (before, after, change)
//!   6..9  nesting depth (before, after, change)
//!   9     variable read count difference (after - before)

use indexmap::IndexMap;

use super::metrics::{average_complexity, line_count, nesting_depth, variable_reads};
use crate::syntax::{parse_module, Node};

/// Number of features produced by the extractor.
pub const NUM_FEATURES: usize = 10;

/// Feature keys, in extraction order.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "complexity_before",
    "complexity_after",
    "complexity_change",
    "length_before",
    "length_after",
    "length_change",
    "nesting_before",
    "nesting_after",
    "nesting_change",
    "variable_usage_diff",
];

/// The extractor's schema as owned strings.
pub fn feature_keys() -> Vec<String> {
    FEATURE_NAMES.iter().map(|k| k.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub values: [f64; NUM_FEATURES],
}

impl FeatureVector {
    pub fn new(values: [f64; NUM_FEATURES]) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|k| *k == key)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    pub fn to_named(&self) -> IndexMap<String, f64> {
        self.iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    pub(crate) fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }
}

/// Per-snippet measurements. Unparseable snippets measure zero everywhere
/// except line count.
struct SnippetMetrics {
    complexity: f64,
    length: f64,
    nesting: f64,
    reads: f64,
}

impl SnippetMetrics {
    fn measure(code: &str) -> Self {
        let tree: Option<Node> = parse_module(code).ok();
        Self {
            complexity: tree.as_ref().map_or(0.0, average_complexity),
            length: line_count(code) as f64,
            nesting: tree.as_ref().map_or(0.0, |t| nesting_depth(t) as f64),
            reads: tree.as_ref().map_or(0.0, |t| variable_reads(t) as f64),
        }
    }
}

/// Compare two versions of a snippet.
pub fn extract_features(before: &str, after: &str) -> FeatureVector {
    let b = SnippetMetrics::measure(before);
    let a = SnippetMetrics::measure(after);
    FeatureVector::new([
        b.complexity,
        a.complexity,
        a.complexity - b.complexity,
        b.length,
        a.length,
        a.length - b.length,
        b.nesting,
        a.nesting,
        a.nesting - b.nesting,
        a.reads - b.reads,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_keys_fixed() {
        let features = extract_features("x = 1\n", "x = 2\n");
        let keys: Vec<&str> = features.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, FEATURE_NAMES.to_vec());
        assert_eq!(features.to_named().len(), NUM_FEATURES);
    }

    #[test]
    fn test_loop_rewrite_features() {
        let before = "result = []\nfor i in range(5):\n    result.append(i * 2)\n";
        let after = "result = []\nresult = [i * 2 for i in range(5)]\n";
        let f = extract_features(before, after);
        assert_eq!(f.get("length_before"), Some(3.0));
        assert_eq!(f.get("length_after"), Some(2.0));
        assert_eq!(f.get("length_change"), Some(-1.0));
        assert_eq!(f.get("complexity_before"), Some(0.0));
        // before reads: range, result, i; after reads: i, range
        assert_eq!(f.get("variable_usage_diff"), Some(-1.0));
    }

    #[test]
    fn test_malformed_snippets_default_to_zero() {
        let f = extract_features("def broken(:\n", "also broken(:\n");
        for key in [
            "complexity_before",
            "complexity_after",
            "nesting_before",
            "nesting_after",
            "nesting_change",
            "variable_usage_diff",
        ] {
            assert_eq!(f.get(key), Some(0.0), "{}", key);
        }
        assert_eq!(f.get("length_before"), Some(1.0));
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(extract_features("", "").get("nope"), None);
    }
}
