//! Fuzz target: request body validation.
//!
//! Any JSON value fed to the validators must yield either a value or a
//! non-empty list of field errors.

#![no_main]

use libfuzzer_sys::fuzz_target;
use routerctl_gateway::validate;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Err(errors) = validate::dhcp_config(&body) {
        assert!(!errors.is_empty());
    }
    if let Err(errors) = validate::rule_request(&body) {
        assert!(!errors.is_empty());
    }
    if let Err(errors) = validate::policy_change(&body) {
        assert!(!errors.is_empty());
    }
    if let Err(errors) = validate::route_change(&body) {
        assert!(!errors.is_empty());
    }
});
