//! Shared types for passgate.
//!
//! Design goal: versioned, explicit, boring.
//! These structs are used for parsed test records, compare receipts, and the config file.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const COMPARE_SCHEMA_V1: &str = "passgate.compare.v1";

/// Separator between the file, class and test-name components of a [`TestKey`].
pub const KEY_SEPARATOR: &str = "::";

/// File component used when a report does not say which file a test came from.
///
/// By convention these are native (non-scriptable) tests.
pub const UNKNOWN_FILE: &str = "UNKNOWN";

/// Subsystems tested through separate pipelines.
pub const DEFAULT_EXCLUDED_PREFIXES: [&str; 3] = ["inductor/", "export/", "dynamo/"];

/// Substring of a `<skipped message="...">` that marks a test the transformed
/// harness deliberately did not run.
pub const DEFAULT_EXCLUSION_MARKER: &str = "Policy: we don't run";

/// Identifier of a single test case: `<file>::<class>::<name>`.
///
/// Two keys are the same test iff their strings are equal.
#[derive(
    Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(transparent)]
pub struct TestKey(String);

impl TestKey {
    /// Build a key from report attributes. A missing file becomes [`UNKNOWN_FILE`].
    pub fn new(file: Option<&str>, class: &str, name: &str) -> Self {
        let file = file.unwrap_or(UNKNOWN_FILE);
        Self(format!("{file}{KEY_SEPARATOR}{class}{KEY_SEPARATOR}{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the first `::`, or the whole key if there is none.
    pub fn file(&self) -> &str {
        self.0
            .split_once(KEY_SEPARATOR)
            .map_or(self.0.as_str(), |(file, _)| file)
    }
}

impl fmt::Display for TestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TestKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TestKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Errored,
    Skipped,

    /// The harness itself decided not to run or count this test.
    Excluded,
}

impl Outcome {
    pub fn is_passed(self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Errored => "errored",
            Outcome::Skipped => "skipped",
            Outcome::Excluded => "excluded",
        }
    }
}

/// One execution observation for one test within one run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct TestRecord {
    pub key: TestKey,
    pub outcome: Outcome,

    /// Diagnostic payload from the report (failure or skip message).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestRecord {
    pub fn new(key: impl Into<TestKey>, outcome: Outcome) -> Self {
        Self {
            key: key.into(),
            outcome,
            message: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Where one side of the comparison came from.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RunRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Number of test records read for this run.
    pub records: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FilterPolicy {
    pub excluded_prefixes: Vec<String>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            excluded_prefixes: DEFAULT_EXCLUDED_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PassRateCounts {
    /// Baseline passes left after filtering and exclusion subtraction.
    pub baseline_passed: u32,

    /// Of those, passes confirmed under the transformed run.
    pub successful: u32,

    pub regressions: u32,

    /// Regressions that never appeared in the transformed run at all.
    pub missing: u32,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Pass,
    Fail,

    /// Nothing comparable: the baseline had no passing tests after filtering.
    NoData,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PassRateReceipt {
    pub schema: String,
    pub tool: ToolInfo,

    pub baseline_ref: RunRef,
    pub transformed_ref: RunRef,

    pub filter: FilterPolicy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rate: Option<f64>,

    /// successful / baseline_passed, in [0, 1].
    pub rate: f64,

    pub counts: PassRateCounts,

    /// Sorted.
    pub baseline_pass_keys: Vec<TestKey>,

    /// Sorted. Includes `missing_keys`.
    pub regression_keys: Vec<TestKey>,

    /// Sorted subset of `regression_keys` absent from the transformed run.
    pub missing_keys: Vec<TestKey>,

    pub verdict: Verdict,
}

// ----------------------------
// Optional config file schema
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Replaces the built-in prefix list when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusion_marker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Minimum acceptable pass rate, as a fraction (0.95 = 95%).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rate: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_no_data: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_components_with_separator() {
        let k = TestKey::new(Some("test_nn.py"), "TestNN", "test_linear");
        assert_eq!(k.as_str(), "test_nn.py::TestNN::test_linear");
        assert_eq!(k.file(), "test_nn.py");
    }

    #[test]
    fn key_without_file_uses_unknown_sentinel() {
        let k = TestKey::new(None, "AtenTest", "test_add");
        assert_eq!(k.file(), UNKNOWN_FILE);
    }

    #[test]
    fn key_without_separator_is_all_file() {
        let k = TestKey::from("dynamo/test_foo.py");
        assert_eq!(k.file(), "dynamo/test_foo.py");
    }

    #[test]
    fn key_serializes_as_plain_string() {
        let k = TestKey::from("a.py::A::t");
        assert_eq!(serde_json::to_string(&k).unwrap(), "\"a.py::A::t\"");
    }

    #[test]
    fn verdict_status_serde_is_snake_case() {
        let json = serde_json::to_string(&VerdictStatus::NoData).unwrap();
        assert_eq!(json, "\"no_data\"");
    }

    #[test]
    fn record_message_is_optional_on_input() {
        let rec: TestRecord =
            serde_json::from_str(r#"{"key":"a.py::A::t","outcome":"excluded"}"#).unwrap();
        assert_eq!(rec.outcome, Outcome::Excluded);
        assert_eq!(rec.message, None);
    }

    #[test]
    fn config_file_parses_all_sections() {
        let cfg: ConfigFile = toml::from_str(
            r#"
            [filter]
            excluded_prefixes = ["inductor/"]

            [ingest]
            exclusion_marker = "skip me"

            [defaults]
            min_rate = 0.9
            fail_on_no_data = true
            "#,
        )
        .unwrap();

        assert_eq!(
            cfg.filter.excluded_prefixes,
            Some(vec!["inductor/".to_string()])
        );
        assert_eq!(cfg.ingest.exclusion_marker.as_deref(), Some("skip me"));
        assert_eq!(cfg.defaults.min_rate, Some(0.9));
        assert_eq!(cfg.defaults.fail_on_no_data, Some(true));
    }

    #[test]
    fn config_file_rejects_unknown_keys() {
        let res = toml::from_str::<ConfigFile>("[filter]\nprefixes = []\n");
        assert!(res.is_err());
    }

    #[test]
    fn empty_config_file_is_default() {
        let cfg: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(cfg, ConfigFile::default());
    }
}
