use yare::parameterized;

use super::*;

#[test]
fn test_no_minimum_never_deletes() {
    let snapshots = snaps_named(&["a", "b", "c", "d"]);
    assert_eq!(decide_delete(&snapshots, &policy(Some(TimeDelta::hours(1)), None)), None);
}

#[parameterized(
    below_minimum = { 2, 3, false },
    at_minimum = { 3, 3, false },
    one_over = { 4, 3, true },
    far_over = { 40, 3, true },
    retain_zero_with_one = { 1, 0, true },
    retain_zero_with_none = { 0, 0, false },
)]
fn test_count_against_minimum(count: usize, retained: usize, expected: bool) {
    let snapshots: Vec<Snapshot> = (0..count)
        .map(|i| snap(&format!("snap-{i:03}"), TimeDelta::hours(i as i64)))
        .collect();
    let target = decide_delete(&snapshots, &policy(None, Some(retained)));
    assert_eq!(target.is_some(), expected);
}

#[test]
fn test_deletes_lexicographically_smallest_name() {
    let snapshots = snaps_named(&["c", "a", "b", "e", "d"]);
    assert_eq!(
        decide_delete(&snapshots, &policy(None, Some(3))),
        Some("a".to_string())
    );
}

#[test]
fn test_name_order_not_creation_order() {
    // "zeta" is the oldest, but "alpha" sorts first
    let snapshots = vec![
        snap("zeta", TimeDelta::days(10)),
        snap("alpha", TimeDelta::minutes(1)),
    ];
    assert_eq!(
        decide_delete(&snapshots, &policy(None, Some(1))),
        Some("alpha".to_string())
    );
}

#[test]
fn test_byte_order_comparison() {
    // uppercase sorts before lowercase, "10" before "9"
    let snapshots = snaps_named(&["b", "Z", "snap-9", "snap-10"]);
    assert_eq!(
        decide_delete(&snapshots, &policy(None, Some(0))),
        Some("Z".to_string())
    );

    let numbered = snaps_named(&["snap-9", "snap-10"]);
    assert_eq!(
        decide_delete(&numbered, &policy(None, Some(1))),
        Some("snap-10".to_string())
    );
}

#[test]
fn test_single_target_regardless_of_excess() {
    let names: Vec<String> = (0..100).map(|i| format!("s{i:03}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let snapshots = snaps_named(&refs);

    let decision = decide(&snapshots, &policy(None, Some(1)), now());
    assert_eq!(decision.delete, Some("s000".to_string()));
}

#[test]
fn test_decisions_are_idempotent() {
    let snapshots = snaps_named(&["c", "a", "b"]);
    let p = policy(Some(TimeDelta::minutes(30)), Some(2));
    let first = decide(&snapshots, &p, now());
    let second = decide(&snapshots, &p, now());
    assert_eq!(first, second);
    assert_eq!(first.delete.as_deref(), Some("a"));
    assert!(first.should_create);
}
