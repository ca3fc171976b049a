//! Fuzz target: `iptables-save` parsing and rendering.
//!
//! Arbitrary text must parse without panicking, and rendering a parsed rule
//! set must not lose tables or rules.

#![no_main]

use libfuzzer_sys::fuzz_target;
use routerctl_core::parse_rule_set;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let parsed = parse_rule_set(text);
    let reparsed = parse_rule_set(&parsed.to_string());
    assert_eq!(parsed.chains.len(), reparsed.chains.len());
    assert_eq!(parsed.rule_count(), reparsed.rule_count());
});
