//! Domain logic for passgate.
//!
//! This crate is intentionally I/O-free: it does set algebra and policy.
//! Sets are `BTreeSet`s so every derived output is deterministic.

mod filter;

pub use filter::KeyFilter;

use passgate_types::{Outcome, PassRateCounts, TestKey, TestRecord, Verdict, VerdictStatus};
use std::collections::BTreeSet;

/// Keys with at least one passing record. Retries reconcile by any-success.
pub fn passed_keys(records: &[TestRecord]) -> BTreeSet<TestKey> {
    records
        .iter()
        .filter(|r| r.outcome.is_passed())
        .map(|r| r.key.clone())
        .collect()
}

/// Keys the run's own harness marked as deliberately not run.
pub fn excluded_keys(records: &[TestRecord]) -> BTreeSet<TestKey> {
    records
        .iter()
        .filter(|r| r.outcome == Outcome::Excluded)
        .map(|r| r.key.clone())
        .collect()
}

/// Every key that appears in the run, whatever its outcome.
pub fn seen_keys(records: &[TestRecord]) -> BTreeSet<TestKey> {
    records.iter().map(|r| r.key.clone()).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassRate {
    /// `successful_keys / baseline_pass_keys`, or 0.0 when the baseline is empty.
    pub rate: f64,

    /// Baseline passes after filtering and after subtracting the transformed
    /// run's explicit exclusions.
    pub baseline_pass_keys: BTreeSet<TestKey>,

    /// Baseline passes also passing under the transformed run.
    pub successful_keys: BTreeSet<TestKey>,

    /// `baseline_pass_keys - successful_keys`.
    pub regression_keys: BTreeSet<TestKey>,

    /// Regressions that never appeared in the transformed run. Diagnostic only.
    pub missing_keys: BTreeSet<TestKey>,
}

impl PassRate {
    fn no_data() -> Self {
        Self {
            rate: 0.0,
            baseline_pass_keys: BTreeSet::new(),
            successful_keys: BTreeSet::new(),
            regression_keys: BTreeSet::new(),
            missing_keys: BTreeSet::new(),
        }
    }

    /// True when no baseline test survived filtering, i.e. nothing was compared.
    pub fn is_no_data(&self) -> bool {
        self.baseline_pass_keys.is_empty()
    }

    /// Regressions that ran under the transformed mode but did not pass.
    pub fn failed_keys(&self) -> impl Iterator<Item = &TestKey> {
        self.regression_keys
            .iter()
            .filter(|k| !self.missing_keys.contains(*k))
    }

    pub fn counts(&self) -> PassRateCounts {
        PassRateCounts {
            baseline_passed: count(&self.baseline_pass_keys),
            successful: count(&self.successful_keys),
            regressions: count(&self.regression_keys),
            missing: count(&self.missing_keys),
        }
    }
}

fn count(keys: &BTreeSet<TestKey>) -> u32 {
    u32::try_from(keys.len()).unwrap_or(u32::MAX)
}

/// Compare the transformed run against the baseline run.
///
/// Exclusions are read from the transformed run only, and are subtracted from
/// the baseline side: a test the transformed harness refuses to run is not a
/// regression.
pub fn compute_pass_rate(
    baseline: &[TestRecord],
    transformed: &[TestRecord],
    filter: &KeyFilter,
) -> PassRate {
    let mut baseline_pass_keys = filter.retain(passed_keys(baseline));
    let transformed_pass_keys = filter.retain(passed_keys(transformed));

    let explicitly_excluded = excluded_keys(transformed);
    baseline_pass_keys.retain(|k| !explicitly_excluded.contains(k));

    if baseline_pass_keys.is_empty() {
        return PassRate::no_data();
    }

    let successful_keys: BTreeSet<TestKey> = baseline_pass_keys
        .intersection(&transformed_pass_keys)
        .cloned()
        .collect();

    let rate = successful_keys.len() as f64 / baseline_pass_keys.len() as f64;

    let regression_keys: BTreeSet<TestKey> = baseline_pass_keys
        .difference(&successful_keys)
        .cloned()
        .collect();

    let transformed_seen = seen_keys(transformed);
    let missing_keys: BTreeSet<TestKey> = baseline_pass_keys
        .difference(&transformed_seen)
        .cloned()
        .collect();

    PassRate {
        rate,
        baseline_pass_keys,
        successful_keys,
        regression_keys,
        missing_keys,
    }
}

/// Turn a pass rate into a verdict.
///
/// `min_rate` is a fraction; without it every comparable result passes.
pub fn judge(pass_rate: &PassRate, min_rate: Option<f64>) -> Verdict {
    let mut reasons: Vec<String> = Vec::new();

    if pass_rate.is_no_data() {
        reasons.push("no baseline tests passed after filtering; pass rate is undefined".into());
        return Verdict {
            status: VerdictStatus::NoData,
            reasons,
        };
    }

    let status = match min_rate {
        Some(min) if pass_rate.rate < min => {
            reasons.push(format!(
                "pass rate {rate:.2}% is below minimum {min:.2}%",
                rate = pass_rate.rate * 100.0,
                min = min * 100.0
            ));
            VerdictStatus::Fail
        }
        _ => VerdictStatus::Pass,
    };

    if !pass_rate.regression_keys.is_empty() {
        reasons.push(format!(
            "{n} baseline-passing tests not passing under transformed mode ({m} never ran)",
            n = pass_rate.regression_keys.len(),
            m = pass_rate.missing_keys.len()
        ));
    }

    Verdict { status, reasons }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(key: &str, outcome: Outcome) -> TestRecord {
        TestRecord::new(key, outcome)
    }

    fn keys(ks: &[&str]) -> BTreeSet<TestKey> {
        ks.iter().map(|k| TestKey::from(*k)).collect()
    }

    const A: &str = "test_a.py::TestA::test_one";
    const B: &str = "test_b.py::TestB::test_two";
    const C: &str = "test_c.py::TestC::test_three";

    #[test]
    fn passed_keys_any_success_across_retries() {
        let records = vec![
            rec(A, Outcome::Failed),
            rec(A, Outcome::Passed),
            rec(B, Outcome::Errored),
            rec(B, Outcome::Failed),
        ];
        assert_eq!(passed_keys(&records), keys(&[A]));
    }

    #[test]
    fn excluded_keys_only_counts_excluded_outcome() {
        let records = vec![
            rec(A, Outcome::Skipped),
            rec(B, Outcome::Excluded),
            rec(C, Outcome::Passed),
        ];
        assert_eq!(excluded_keys(&records), keys(&[B]));
    }

    #[test]
    fn explicit_exclusion_removes_baseline_pass() {
        let baseline = vec![
            rec(A, Outcome::Passed),
            rec(B, Outcome::Passed),
            rec(C, Outcome::Passed),
        ];
        let transformed = vec![
            rec(A, Outcome::Passed),
            rec(B, Outcome::Passed),
            rec(C, Outcome::Excluded),
        ];

        let r = compute_pass_rate(&baseline, &transformed, &KeyFilter::default());
        assert_eq!(r.rate, 1.0);
        assert_eq!(r.baseline_pass_keys, keys(&[A, B]));
        assert!(r.regression_keys.is_empty());
    }

    #[test]
    fn half_passing_is_half_rate() {
        let baseline = vec![rec(A, Outcome::Passed), rec(B, Outcome::Passed)];
        let transformed = vec![rec(A, Outcome::Passed), rec(B, Outcome::Failed)];

        let r = compute_pass_rate(&baseline, &transformed, &KeyFilter::default());
        assert_eq!(r.rate, 0.5);
        assert_eq!(r.regression_keys, keys(&[B]));
        assert!(r.missing_keys.is_empty());
    }

    #[test]
    fn only_filtered_baseline_is_no_data() {
        let baseline = vec![rec("inductor/test_x.py::T::m", Outcome::Passed)];
        let transformed = vec![rec("inductor/test_x.py::T::m", Outcome::Passed)];

        let r = compute_pass_rate(&baseline, &transformed, &KeyFilter::default());
        assert_eq!(r.rate, 0.0);
        assert!(r.baseline_pass_keys.is_empty());
        assert!(r.regression_keys.is_empty());
        assert!(r.is_no_data());
    }

    #[test]
    fn exclusions_come_from_transformed_run_only() {
        // Baseline marking its own test excluded does nothing.
        let baseline = vec![rec(A, Outcome::Passed), rec(A, Outcome::Excluded)];
        let transformed = vec![rec(A, Outcome::Failed)];

        let r = compute_pass_rate(&baseline, &transformed, &KeyFilter::default());
        assert_eq!(r.baseline_pass_keys, keys(&[A]));
        assert_eq!(r.regression_keys, keys(&[A]));
    }

    #[test]
    fn excluded_wins_even_if_transformed_also_passed() {
        let baseline = vec![rec(A, Outcome::Passed), rec(B, Outcome::Passed)];
        let transformed = vec![
            rec(A, Outcome::Passed),
            rec(A, Outcome::Excluded),
            rec(B, Outcome::Passed),
        ];

        let r = compute_pass_rate(&baseline, &transformed, &KeyFilter::default());
        assert_eq!(r.baseline_pass_keys, keys(&[B]));
        assert_eq!(r.rate, 1.0);
    }

    #[test]
    fn absent_tests_are_regressions_and_reported_missing() {
        let baseline = vec![
            rec(A, Outcome::Passed),
            rec(B, Outcome::Passed),
            rec(C, Outcome::Passed),
        ];
        let transformed = vec![rec(A, Outcome::Passed), rec(B, Outcome::Skipped)];

        let r = compute_pass_rate(&baseline, &transformed, &KeyFilter::default());
        assert_eq!(r.regression_keys, keys(&[B, C]));
        assert_eq!(r.missing_keys, keys(&[C]));
        assert_eq!(r.failed_keys().cloned().collect::<BTreeSet<_>>(), keys(&[B]));

        let counts = r.counts();
        assert_eq!(counts.baseline_passed, 3);
        assert_eq!(counts.successful, 1);
        assert_eq!(counts.regressions, 2);
        assert_eq!(counts.missing, 1);
    }

    #[test]
    fn total_regression_is_distinct_from_no_data() {
        let baseline = vec![rec(A, Outcome::Passed)];
        let transformed = vec![rec(A, Outcome::Failed)];

        let r = compute_pass_rate(&baseline, &transformed, &KeyFilter::default());
        assert_eq!(r.rate, 0.0);
        assert!(!r.is_no_data());
        assert_eq!(r.regression_keys, keys(&[A]));
    }

    #[test]
    fn transformed_pass_in_excluded_dir_does_not_count() {
        let k = "dynamo/test_misc.py::T::m";
        let baseline = vec![rec(A, Outcome::Passed), rec(k, Outcome::Passed)];
        let transformed = vec![rec(k, Outcome::Passed)];

        let r = compute_pass_rate(&baseline, &transformed, &KeyFilter::default());
        assert_eq!(r.baseline_pass_keys, keys(&[A]));
        assert_eq!(r.rate, 0.0);
    }

    #[test]
    fn judge_no_data() {
        let r = compute_pass_rate(&[], &[], &KeyFilter::default());
        let v = judge(&r, Some(0.5));
        assert_eq!(v.status, VerdictStatus::NoData);
        assert_eq!(v.reasons.len(), 1);
    }

    #[test]
    fn judge_fails_below_min_rate() {
        let baseline = vec![rec(A, Outcome::Passed), rec(B, Outcome::Passed)];
        let transformed = vec![rec(A, Outcome::Passed)];
        let r = compute_pass_rate(&baseline, &transformed, &KeyFilter::default());

        let v = judge(&r, Some(0.75));
        assert_eq!(v.status, VerdictStatus::Fail);
        assert!(v.reasons[0].contains("50.00%"));
        assert!(v.reasons[1].contains("1 never ran"));
    }

    #[test]
    fn judge_passes_at_exact_min_rate() {
        let baseline = vec![rec(A, Outcome::Passed), rec(B, Outcome::Passed)];
        let transformed = vec![rec(A, Outcome::Passed)];
        let r = compute_pass_rate(&baseline, &transformed, &KeyFilter::default());

        assert_eq!(judge(&r, Some(0.5)).status, VerdictStatus::Pass);
        assert_eq!(judge(&r, None).status, VerdictStatus::Pass);
    }

    #[test]
    fn judge_clean_pass_has_no_reasons() {
        let baseline = vec![rec(A, Outcome::Passed)];
        let transformed = vec![rec(A, Outcome::Passed)];
        let r = compute_pass_rate(&baseline, &transformed, &KeyFilter::default());

        let v = judge(&r, Some(1.0));
        assert_eq!(v.status, VerdictStatus::Pass);
        assert!(v.reasons.is_empty());
    }

    // =========================================================================
    // Property-Based Tests
    // =========================================================================

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        const FILES: [&str; 6] = [
            "test_nn.py",
            "test_ops.py",
            "distributed/test_c10d.py",
            "inductor/test_torchinductor.py",
            "dynamo/test_misc.py",
            "UNKNOWN",
        ];

        fn key_strategy() -> impl Strategy<Value = TestKey> {
            (0..FILES.len(), 0u8..4).prop_map(|(f, n)| {
                TestKey::new(Some(FILES[f]), "TestCase", &format!("test_{n}"))
            })
        }

        fn outcome_strategy() -> impl Strategy<Value = Outcome> {
            prop_oneof![
                3 => Just(Outcome::Passed),
                1 => Just(Outcome::Failed),
                1 => Just(Outcome::Errored),
                1 => Just(Outcome::Skipped),
                1 => Just(Outcome::Excluded),
            ]
        }

        fn records_strategy() -> impl Strategy<Value = Vec<TestRecord>> {
            prop::collection::vec(
                (key_strategy(), outcome_strategy()).prop_map(|(key, outcome)| TestRecord {
                    key,
                    outcome,
                    message: None,
                }),
                0..40,
            )
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            /// Rate is always a fraction.
            #[test]
            fn prop_rate_bounds(b in records_strategy(), t in records_strategy()) {
                let r = compute_pass_rate(&b, &t, &KeyFilter::default());
                prop_assert!((0.0..=1.0).contains(&r.rate), "rate {} out of bounds", r.rate);
            }

            /// Regressions are baseline passes that did not succeed.
            #[test]
            fn prop_regressions_subset(b in records_strategy(), t in records_strategy()) {
                let r = compute_pass_rate(&b, &t, &KeyFilter::default());
                prop_assert!(r.regression_keys.is_subset(&r.baseline_pass_keys));
                prop_assert!(r.successful_keys.is_disjoint(&r.regression_keys));
                prop_assert!(r.missing_keys.is_subset(&r.regression_keys));
                prop_assert_eq!(
                    r.successful_keys.len() + r.regression_keys.len(),
                    r.baseline_pass_keys.len()
                );
            }

            /// Filtering is a single pass; its output is a fixed point.
            #[test]
            fn prop_filter_idempotent(ks in prop::collection::btree_set(key_strategy(), 0..30)) {
                let f = KeyFilter::default();
                let once = f.retain(ks);
                let twice = f.retain(once.clone());
                prop_assert_eq!(once, twice);
            }

            /// Filtered output never holds UNKNOWN or excluded-prefix keys.
            #[test]
            fn prop_filtered_baseline_is_in_scope(b in records_strategy(), t in records_strategy()) {
                let f = KeyFilter::default();
                let r = compute_pass_rate(&b, &t, &f);
                prop_assert!(r.baseline_pass_keys.iter().all(|k| !f.should_exclude(k)));
            }

            /// Empty comparable baseline yields the no-data sentinel.
            #[test]
            fn prop_empty_baseline_sentinel(b in records_strategy(), t in records_strategy()) {
                let f = KeyFilter::default();
                let r = compute_pass_rate(&b, &t, &f);
                let mut expected = f.retain(passed_keys(&b));
                let excl = excluded_keys(&t);
                expected.retain(|k| !excl.contains(k));
                if expected.is_empty() {
                    prop_assert_eq!(r.rate, 0.0);
                    prop_assert!(r.baseline_pass_keys.is_empty());
                    prop_assert!(r.regression_keys.is_empty());
                    prop_assert!(r.missing_keys.is_empty());
                } else {
                    prop_assert_eq!(r.baseline_pass_keys, expected);
                }
            }

            /// When everything that passed at baseline passes transformed, nothing regresses.
            #[test]
            fn prop_perfect_match(b in records_strategy(), extra in records_strategy()) {
                let mut t: Vec<TestRecord> = passed_keys(&b)
                    .into_iter()
                    .map(|key| TestRecord { key, outcome: Outcome::Passed, message: None })
                    .collect();
                t.extend(extra.into_iter().filter(|r| r.outcome != Outcome::Excluded));

                let r = compute_pass_rate(&b, &t, &KeyFilter::default());
                prop_assert!(r.regression_keys.is_empty());
                if !r.is_no_data() {
                    prop_assert_eq!(r.rate, 1.0);
                }
            }

            /// Explicitly excluded tests never reach the filtered baseline set.
            #[test]
            fn prop_exclusion_subtraction(b in records_strategy(), t in records_strategy()) {
                let r = compute_pass_rate(&b, &t, &KeyFilter::default());
                for k in excluded_keys(&t) {
                    prop_assert!(!r.baseline_pass_keys.contains(&k));
                }
            }

            /// Input order never changes the result.
            #[test]
            fn prop_order_independent(b in records_strategy(), t in records_strategy()) {
                let f = KeyFilter::default();
                let forward = compute_pass_rate(&b, &t, &f);

                let mut b_rev = b.clone();
                b_rev.reverse();
                let mut t_rev = t.clone();
                t_rev.reverse();
                let backward = compute_pass_rate(&b_rev, &t_rev, &f);

                prop_assert_eq!(forward, backward);
            }
        }
    }
}
