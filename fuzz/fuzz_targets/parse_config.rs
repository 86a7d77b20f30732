//! Fuzz harness for settle configuration files (settle.yaml)
//!
//! Parsing and resolving every profile must never panic, whatever the input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use settle_config::SettleConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(config) = serde_yaml::from_str::<SettleConfig>(input) else {
        return;
    };

    let _ = config.spec_for(None);
    for name in config.profiles.keys() {
        let _ = config.spec_for(Some(name));
    }
    let _ = config.retry.validate();
});
