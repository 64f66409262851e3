use crate::client::Mutation;
use crate::types::{ActionOutcome, Operation};

use super::*;

fn create(instance_id: &str) -> Mutation {
    Mutation::Create {
        instance_id: instance_id.into(),
    }
}

fn delete(instance_id: &str, snapshot: &str) -> Mutation {
    Mutation::Delete {
        instance_id: instance_id.into(),
        snapshot: snapshot.into(),
    }
}

#[tokio::test]
async fn test_tag_frequency_beats_metadata() {
    let client = Arc::new(cloud().with_instance(
        Instance::new("i-1")
            .with_metadata(FREQUENCY_KEY, "1d")
            .with_tag(FREQUENCY_KEY, "1h"),
        vec![snap("s1", TimeDelta::hours(2))],
    ));

    let report = run(&client).await;

    assert_eq!(client.mutations(), vec![create("i-1")]);
    assert_eq!(report.created_count(), 1);
    assert_eq!(report.deleted_count(), 0);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_metadata_minimum_prunes_smallest_name() {
    let client = Arc::new(cloud().with_instance(
        Instance::new("i-1").with_metadata(MIN_SNAPSHOTS_KEY, "3"),
        snaps_named(&["c", "a", "b", "e", "d"]),
    ));

    let report = run(&client).await;

    assert_eq!(client.mutations(), vec![delete("i-1", "a")]);
    assert_eq!(client.snapshot_names("i-1"), vec!["b", "c", "d", "e"]);
    insta::assert_json_snapshot!(report.instance("i-1").unwrap(), @r#"
    {
      "instance_id": "i-1",
      "snapshot_count": 5,
      "policy": {
        "min_interval_ms": null,
        "min_retained": 3
      },
      "decision": {
        "should_create": false,
        "delete": "a"
      },
      "actions": [
        {
          "operation": "delete_snapshot",
          "snapshot": "a",
          "outcome": "performed"
        }
      ],
      "warnings": [],
      "failures": []
    }
    "#);
}

#[tokio::test]
async fn test_unconfigured_instance_issues_no_mutations() {
    let client = Arc::new(cloud().with_instance(
        Instance::new("i-1").with_tag("role", "db"),
        snaps_named(&["x", "y", "z", "w"]),
    ));

    let report = run(&client).await;

    assert!(client.mutations().is_empty());
    let instance = report.instance("i-1").unwrap();
    assert!(instance.policy.is_unconfigured());
    assert!(instance.decision.as_ref().is_some_and(|d| d.is_noop()));
    assert!(instance.actions.is_empty());
    assert!(report.is_success());
}

#[tokio::test]
async fn test_pruning_removes_one_snapshot_per_run() {
    let client = Arc::new(cloud().with_instance(
        Instance::new("i-1").with_tag(MIN_SNAPSHOTS_KEY, "3"),
        snaps_named(&["c", "a", "b", "e", "d"]),
    ));

    run(&client).await;
    run(&client).await;
    run(&client).await;

    assert_eq!(
        client.mutations(),
        vec![delete("i-1", "a"), delete("i-1", "b")]
    );
    assert_eq!(client.snapshot_names("i-1"), vec!["c", "d", "e"]);
}

#[tokio::test]
async fn test_fresh_snapshot_is_not_duplicated() {
    let client = Arc::new(cloud().with_instance(hourly("i-1"), Vec::new()));

    run(&client).await;
    let second = run(&client).await;

    assert_eq!(client.mutations(), vec![create("i-1")]);
    assert!(second.instance("i-1").unwrap().actions.is_empty());
}

#[tokio::test]
async fn test_listing_fetched_once_for_both_decisions() {
    let client = Arc::new(cloud().with_instance(
        hourly("i-1"),
        vec![
            snap("x", TimeDelta::hours(2)),
            snap("y", TimeDelta::hours(3)),
            snap("z", TimeDelta::hours(4)),
        ],
    ));

    run(&client).await;

    assert_eq!(client.listing_count("i-1"), 1);
    // The delete target comes from the listing taken before the create.
    assert_eq!(client.mutations(), vec![create("i-1"), delete("i-1", "x")]);
}

#[tokio::test]
async fn test_dry_run_issues_no_mutations() {
    let client = Arc::new(cloud().with_instance(
        hourly("i-1"),
        vec![
            snap("x", TimeDelta::hours(2)),
            snap("y", TimeDelta::hours(3)),
            snap("z", TimeDelta::hours(4)),
        ],
    ));
    let options = ReconcileOptions {
        dry_run: true,
        ..Default::default()
    };

    let report = reconciler(&client, options).run_at(now()).await;

    assert!(client.mutations().is_empty());
    assert!(report.dry_run);
    assert_eq!(report.created_count(), 0);
    let actions = &report.instance("i-1").unwrap().actions;
    assert_eq!(
        actions
            .iter()
            .map(|a| (a.operation, a.snapshot.as_deref(), a.outcome))
            .collect::<Vec<_>>(),
        vec![
            (Operation::CreateSnapshot, None, ActionOutcome::Planned),
            (Operation::DeleteSnapshot, Some("x"), ActionOutcome::Planned),
        ]
    );
}

#[tokio::test]
async fn test_concurrent_run_matches_sequential() {
    fn populated() -> Arc<InMemoryClient> {
        let client = (0..6).fold(cloud(), |client, i| {
            client.with_instance(
                hourly(&format!("i-{i}")),
                vec![
                    snap("a", TimeDelta::hours(3)),
                    snap("b", TimeDelta::hours(2)),
                    snap("c", TimeDelta::hours(5)),
                ],
            )
        });
        Arc::new(client)
    }

    let sequential_client = populated();
    let sequential = run(&sequential_client).await;

    let concurrent_client = populated();
    let concurrent = reconciler(
        &concurrent_client,
        ReconcileOptions {
            dry_run: false,
            concurrency: 4,
        },
    )
    .run_at(now())
    .await;

    assert_eq!(concurrent, sequential);
    assert_eq!(concurrent.created_count(), 6);
    assert_eq!(concurrent.deleted_count(), 6);
    assert_eq!(concurrent_client.mutations().len(), 12);
    assert_eq!(
        concurrent
            .instances
            .iter()
            .map(|i| i.instance_id.as_str())
            .collect::<Vec<_>>(),
        vec!["i-0", "i-1", "i-2", "i-3", "i-4", "i-5"]
    );
}
