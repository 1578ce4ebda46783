//! Fuzz target for asset-gc.toml parsing.
//!
//! Checks that no input panics the parser, the validator or the policy
//! builder, and that a validated config yields a usable policy.
//!
//! Run with: `cargo +nightly fuzz run fuzz_config_parsing`

#![no_main]

use asset_gc::config::Config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = toml::from_str::<Config>(text) else {
        return;
    };

    let policy = config.to_policy();
    if config.validate().is_ok() {
        assert!(policy.validate().is_none());
    }
});
