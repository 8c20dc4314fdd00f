//! Application layer for passgate.
//!
//! The app layer coordinates report sources and domain logic.
//! It does not parse CLI flags and it does not write files.

mod report;

pub use report::{github_annotations, render_markdown, render_text};

use anyhow::Context;
use passgate_domain::{compute_pass_rate, judge, KeyFilter, PassRate};
use passgate_ingest::{read_report_dir, JunitOptions};
use passgate_types::{FilterPolicy, PassRateReceipt, RunRef, TestKey, TestRecord, ToolInfo};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Where test records for one run come from.
pub trait ReportSource {
    fn load(&self, location: &Path) -> anyhow::Result<Vec<TestRecord>>;
}

/// Reads a directory tree of JUnit XML reports.
#[derive(Debug, Default, Clone)]
pub struct JunitDirSource {
    opts: JunitOptions,
}

impl JunitDirSource {
    pub fn new(opts: JunitOptions) -> Self {
        Self { opts }
    }
}

impl ReportSource for JunitDirSource {
    fn load(&self, location: &Path) -> anyhow::Result<Vec<TestRecord>> {
        Ok(read_report_dir(location, &self.opts)?)
    }
}

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub baseline: PathBuf,
    pub transformed: PathBuf,
    pub filter: FilterPolicy,

    /// Fraction below which the verdict is `fail`.
    pub min_rate: Option<f64>,

    pub tool: ToolInfo,
}

#[derive(Debug, Clone)]
pub struct CompareOutcome {
    pub receipt: PassRateReceipt,
    pub pass_rate: PassRate,
}

pub struct CompareUseCase<S: ReportSource> {
    source: S,
}

impl<S: ReportSource> CompareUseCase<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn execute(&self, req: CompareRequest) -> anyhow::Result<CompareOutcome> {
        tracing::info!("reading baseline reports from {}", req.baseline.display());
        let baseline = self
            .source
            .load(&req.baseline)
            .with_context(|| format!("load baseline reports from {}", req.baseline.display()))?;

        tracing::info!(
            "reading transformed reports from {}",
            req.transformed.display()
        );
        let transformed = self.source.load(&req.transformed).with_context(|| {
            format!(
                "load transformed reports from {}",
                req.transformed.display()
            )
        })?;

        tracing::info!(
            baseline_records = baseline.len(),
            transformed_records = transformed.len(),
            "extracting passed test cases"
        );

        let filter = KeyFilter::from_policy(&req.filter);
        let pass_rate = compute_pass_rate(&baseline, &transformed, &filter);

        if pass_rate.is_no_data() {
            tracing::warn!("no baseline tests passed after filtering; cannot compute pass rate");
        } else {
            tracing::info!(
                "computed pass rate: {:.2} ({}/{})",
                pass_rate.rate,
                pass_rate.successful_keys.len(),
                pass_rate.baseline_pass_keys.len()
            );
        }
        if !pass_rate.missing_keys.is_empty() {
            tracing::debug!(
                missing = ?pass_rate.missing_keys,
                "baseline tests not found in transformed reports"
            );
        }

        let receipt = build_receipt(
            &req,
            &pass_rate,
            RunRef {
                path: Some(req.baseline.display().to_string()),
                records: baseline.len() as u64,
            },
            RunRef {
                path: Some(req.transformed.display().to_string()),
                records: transformed.len() as u64,
            },
        );

        Ok(CompareOutcome { receipt, pass_rate })
    }
}

fn build_receipt(
    req: &CompareRequest,
    pass_rate: &PassRate,
    baseline_ref: RunRef,
    transformed_ref: RunRef,
) -> PassRateReceipt {
    PassRateReceipt {
        schema: passgate_types::COMPARE_SCHEMA_V1.to_string(),
        tool: req.tool.clone(),
        baseline_ref,
        transformed_ref,
        filter: req.filter.clone(),
        min_rate: req.min_rate,
        rate: pass_rate.rate,
        counts: pass_rate.counts(),
        baseline_pass_keys: sorted(&pass_rate.baseline_pass_keys),
        regression_keys: sorted(&pass_rate.regression_keys),
        missing_keys: sorted(&pass_rate.missing_keys),
        verdict: judge(pass_rate, req.min_rate),
    }
}

// BTreeSet iteration is already ordered; this just fixes the wire shape.
fn sorted(keys: &BTreeSet<TestKey>) -> Vec<TestKey> {
    keys.iter().cloned().collect()
}

/// Classify identifiers with the effective filter (`true` = excluded).
pub fn classify_keys<'a>(
    policy: &FilterPolicy,
    keys: impl IntoIterator<Item = &'a str>,
) -> Vec<(TestKey, bool)> {
    let filter = KeyFilter::from_policy(policy);
    keys.into_iter()
        .map(|k| {
            let key = TestKey::from(k);
            let excluded = filter.should_exclude(&key);
            (key, excluded)
        })
        .collect()
}
