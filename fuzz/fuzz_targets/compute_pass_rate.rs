#![no_main]

use libfuzzer_sys::fuzz_target;
use passgate_domain::{compute_pass_rate, KeyFilter};
use passgate_types::TestRecord;

#[derive(Debug, arbitrary::Arbitrary)]
struct Input {
    baseline: Vec<TestRecord>,
    transformed: Vec<TestRecord>,
    prefixes: Vec<String>,
}

fuzz_target!(|input: Input| {
    let filter = KeyFilter::new(input.prefixes.iter().filter(|p| !p.is_empty()));
    let pr = compute_pass_rate(&input.baseline, &input.transformed, &filter);

    assert!((0.0..=1.0).contains(&pr.rate));
    assert!(pr.successful_keys.is_subset(&pr.baseline_pass_keys));
    assert!(pr.missing_keys.is_subset(&pr.regression_keys));
    assert_eq!(
        pr.successful_keys.len() + pr.regression_keys.len(),
        pr.baseline_pass_keys.len()
    );
    for key in &pr.baseline_pass_keys {
        assert!(!filter.should_exclude(key));
    }
});
