//! Integration stories for the declarative host

use nirmata_reconciler::host::{parse_manifests, Command, Host, StateStore};
use nirmata_reconciler::model::ClusterSpec;
use nirmata_reconciler::Error;

use super::fake::{context, FakeControlPlane, Provisioning};

const FLEET: &str = r#"
kind: Cluster
name: prod-east
nodeCount: 3
clusterType: aks-standard
---
kind: Cluster
name: prod-west
nodeCount: 5
clusterType: aks-standard
---
kind: AksClusterType
name: aks-standard
version: 1.29.2
credentials: azure-prod
region: eastus
resourceGroup: rg-platform
subnetId: subnet-nodes
vmSize: Standard_D4s_v3
vmSetType: VirtualMachineScaleSets
workspaceId: ws-123
httpsApplicationRouting: false
monitoring: true
diskSize: 64
"#;

/// Story: apply creates the type before the clusters that use it
#[tokio::test(start_paused = true)]
async fn story_apply_creates_the_whole_fleet() {
    let api = FakeControlPlane::new();
    api.add_credentials("azure-prod");
    let (ctx, _events) = context(&api);
    let host = Host::new(ctx);
    let mut store = StateStore::in_memory();

    let outcomes = host
        .run(Command::Apply, parse_manifests(FLEET).unwrap(), &mut store)
        .await
        .unwrap();

    let keys: Vec<&str> = outcomes.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["AksClusterType/aks-standard", "Cluster/prod-east", "Cluster/prod-west"]
    );
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
    assert_eq!(store.keys().count(), 3);
    assert_eq!(api.node_counts("prod-west"), vec![5]);
}

/// Story: a second apply with a new size scales instead of recreating
#[tokio::test(start_paused = true)]
async fn story_reapply_updates_existing_clusters() {
    let api = FakeControlPlane::new();
    api.add_credentials("azure-prod");
    let (ctx, _events) = context(&api);
    let host = Host::new(ctx);
    let mut store = StateStore::in_memory();

    host.run(Command::Apply, parse_manifests(FLEET).unwrap(), &mut store)
        .await
        .unwrap();

    let scaled = FLEET.replace("nodeCount: 3", "nodeCount: 4");
    let outcomes = host
        .run(Command::Apply, parse_manifests(&scaled).unwrap(), &mut store)
        .await
        .unwrap();

    assert!(outcomes.iter().all(|o| o.result.is_ok()));
    assert_eq!(api.node_counts("prod-east"), vec![4]);
    assert_eq!(api.count_calls("POST KubernetesCluster"), 2);
    assert_eq!(api.count_calls("PUT NodePool"), 1);

    let recorded = store.get::<ClusterSpec>("Cluster/prod-east").unwrap();
    assert_eq!(recorded.recorded.unwrap().node_count, 4);
}

/// Story: one failing cluster does not stop the others
#[tokio::test(start_paused = true)]
async fn story_failures_are_isolated_per_resource() {
    let api = FakeControlPlane::new();
    api.add_cluster_type("aks-standard", "1.29.2", "azure");
    api.provision_as(Provisioning::RunningAfter(2));
    let (ctx, _events) = context(&api);
    let host = Host::new(ctx);
    let mut store = StateStore::in_memory();

    let manifests = parse_manifests(
        r#"
kind: Cluster
name: good
nodeCount: 1
clusterType: aks-standard
---
kind: Cluster
name: orphan
nodeCount: 1
clusterType: no-such-type
"#,
    )
    .unwrap();

    let outcomes = host.run(Command::Apply, manifests, &mut store).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].key == "Cluster/good" && outcomes[0].result.is_ok());
    assert!(outcomes[1].key == "Cluster/orphan");
    assert!(matches!(&outcomes[1].result, Err(e) if e.is_not_found()));
    assert_eq!(store.keys().collect::<Vec<_>>(), vec!["Cluster/good"]);
}

/// Story: an invalid manifest fails the run before any remote call
#[tokio::test]
async fn story_invalid_manifest_blocks_the_run() {
    let api = FakeControlPlane::new();
    api.add_credentials("azure-prod");
    let (ctx, _events) = context(&api);
    let host = Host::new(ctx);
    let mut store = StateStore::in_memory();

    let oversized = FLEET.replace("nodeCount: 5", "nodeCount: 1000");
    let err = host
        .run(Command::Apply, parse_manifests(&oversized).unwrap(), &mut store)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation { .. }));
    assert!(api.calls().is_empty());
}

/// Story: destroy removes clusters before the type they depend on
#[tokio::test(start_paused = true)]
async fn story_destroy_then_refresh_leaves_nothing() {
    let api = FakeControlPlane::new();
    api.add_credentials("azure-prod");
    let (ctx, _events) = context(&api);
    let host = Host::new(ctx);
    let mut store = StateStore::in_memory();

    host.run(Command::Apply, parse_manifests(FLEET).unwrap(), &mut store)
        .await
        .unwrap();
    let outcomes = host
        .run(Command::Destroy, parse_manifests(FLEET).unwrap(), &mut store)
        .await
        .unwrap();

    assert!(outcomes.iter().all(|o| o.result.is_ok()));
    let deletes: Vec<String> = api
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("DELETE"))
        .collect();
    assert_eq!(deletes.len(), 3);
    assert_eq!(deletes[2], "DELETE ClusterType action=delete");
    assert!(!api.has_cluster_type("aks-standard"));

    host.run(Command::Refresh, parse_manifests(FLEET).unwrap(), &mut store)
        .await
        .unwrap();
    assert_eq!(store.keys().count(), 0);
}

/// Story: an unreadable state entry stops the run before any remote write
#[tokio::test(start_paused = true)]
async fn story_corrupt_state_entry_blocks_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, r#"{"Cluster/prod-west": {"id": 5}}"#).unwrap();

    let api = FakeControlPlane::new();
    api.add_credentials("azure-prod");
    let (ctx, _events) = context(&api);
    let host = Host::new(ctx);
    let mut store = StateStore::load(&path).await.unwrap();

    let err = host
        .run(Command::Apply, parse_manifests(FLEET).unwrap(), &mut store)
        .await
        .unwrap_err();

    match err {
        Error::Serialization { message } => assert!(message.contains("Cluster/prod-west")),
        other => panic!("Expected Serialization, got {other:?}"),
    }
    assert!(api.calls().is_empty());
    assert!(!api.has_cluster_type("aks-standard"));
}

/// Story: each crashed task is reported against its own resource
#[tokio::test(start_paused = true)]
async fn story_crashed_tasks_report_their_own_resource() {
    let api = FakeControlPlane::new();
    api.add_cluster_type("aks-standard", "1.29.2", "azure");
    api.crash_on_lookup("alpha");
    api.crash_on_lookup("gamma");
    let (ctx, _events) = context(&api);
    let host = Host::new(ctx);
    let mut store = StateStore::in_memory();

    let manifests = parse_manifests(
        r#"
kind: Cluster
name: alpha
nodeCount: 1
clusterType: aks-standard
---
kind: Cluster
name: beta
nodeCount: 1
clusterType: aks-standard
---
kind: Cluster
name: gamma
nodeCount: 1
clusterType: aks-standard
"#,
    )
    .unwrap();

    let outcomes = host.run(Command::Refresh, manifests, &mut store).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[1].key == "Cluster/beta" && outcomes[1].result.is_ok());
    for (outcome, name) in [(&outcomes[0], "alpha"), (&outcomes[2], "gamma")] {
        assert_eq!(outcome.key, format!("Cluster/{name}"));
        match &outcome.result {
            Err(Error::TaskAborted { resource, message }) => {
                assert_eq!(resource, &outcome.key);
                assert!(message.contains(name), "{resource} got {message}");
            }
            other => panic!("Expected TaskAborted for {name}, got {other:?}"),
        }
    }
}

/// Story: refresh adopts a cluster that exists remotely but was never recorded
#[tokio::test(start_paused = true)]
async fn story_refresh_imports_an_existing_cluster() {
    let api = FakeControlPlane::new();
    api.add_cluster_type("aks-standard", "1.29.2", "azure");
    api.add_cluster("legacy", 4);
    let (ctx, _events) = context(&api);
    let host = Host::new(ctx);
    let mut store = StateStore::in_memory();

    let manifest = r#"
kind: Cluster
name: legacy
nodeCount: 2
clusterType: aks-standard
"#;

    host.run(Command::Refresh, parse_manifests(manifest).unwrap(), &mut store)
        .await
        .unwrap();

    let imported = store.get::<ClusterSpec>("Cluster/legacy").unwrap();
    assert!(imported.exists());
    assert_eq!(imported.recorded.unwrap().node_count, 4);

    let outcomes = host
        .run(Command::Apply, parse_manifests(manifest).unwrap(), &mut store)
        .await
        .unwrap();

    assert!(outcomes[0].result.is_ok());
    assert_eq!(api.count_calls("POST"), 0);
    assert_eq!(api.node_counts("legacy"), vec![2]);
}
