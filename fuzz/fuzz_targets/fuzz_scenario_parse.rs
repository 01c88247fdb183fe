//! Fuzz target: scenario TOML parsing and replay
//!
//! Feeds arbitrary text to Scenario::from_toml_str(). Anything that parses is
//! replayed; both stages must return Ok/Err without panicking.
//!
//! Run: cargo +nightly fuzz run fuzz_scenario_parse -- -max_len=4096

#![no_main]
use ifo_core::scenario::Scenario;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(scenario) = Scenario::from_toml_str(text) else {
        return;
    };
    // Keep replays bounded
    if scenario.steps.len() > 64 || scenario.accounts.len() > 16 {
        return;
    }
    if let Ok(report) = scenario.run() {
        assert_eq!(report.outcomes.len(), scenario.steps.len());
    }
});
