// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_a_simple_key_value_pair() {
    assert_eq!(parse_param("foo=bar").unwrap(), ("foo".to_string(), "bar".to_string()));
}

#[test]
fn value_may_contain_an_equals_sign() {
    assert_eq!(parse_param("url=https://x?a=b").unwrap(), ("url".to_string(), "https://x?a=b".to_string()));
}

#[test]
fn missing_equals_is_an_error() {
    assert!(parse_param("no-equals-here").is_err());
}

#[test]
fn unescape_reverses_newline_and_carriage_return_escapes() {
    assert_eq!(unescape_param("line1\\nline2\\rdone"), "line1\nline2\rdone");
}

#[test]
fn unescape_reverses_escaped_backslash() {
    assert_eq!(unescape_param("a\\\\b"), "a\\b");
}

#[test]
fn unescape_round_trips_through_the_launcher_escape() {
    let original = "has\r\ncontrol\\chars";
    let escaped = loom_scheduler_escape_param_equivalent(original);
    assert_eq!(unescape_param(&escaped), original);
}

/// Mirrors `loom_scheduler::launcher::escape_param` so this test doesn't
/// take a dependency on the scheduler crate just to exercise the inverse.
fn loom_scheduler_escape_param_equivalent(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\r', "\\r").replace('\n', "\\n")
}
