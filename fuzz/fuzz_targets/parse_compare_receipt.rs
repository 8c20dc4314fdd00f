#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(receipt) = serde_json::from_slice::<passgate_types::PassRateReceipt>(data) {
        // Renderers must accept anything that deserializes.
        let _ = passgate_app::render_text(&receipt);
        let _ = passgate_app::render_markdown(&receipt);
        let _ = passgate_app::github_annotations(&receipt);
    }
});
