//! End-to-end tests for the cache, the merge and the sync tool.

use serde_json::json;
use std::sync::Arc;
use tokensync_engine::{
    endpoints, BridgeWriter, Category, DataCore, EngineError, MockBridge, Snapshot,
    SnapshotBridge, SyncConfig, SyncPhase, TokenSyncTool,
};
use tokensync_model::{
    Asset, AssetFormat, AssetGroup, AssetScale, Brand, DesignSystemVersion, TokenValue,
};

fn version() -> DesignSystemVersion {
    DesignSystemVersion::new("ds", "v1")
}

fn snapshot_tool(
    snapshot: Snapshot,
    write_back: bool,
) -> (
    Arc<SnapshotBridge>,
    TokenSyncTool<SnapshotBridge, BridgeWriter<SnapshotBridge>>,
) {
    let bridge = Arc::new(SnapshotBridge::new(snapshot));
    let core = Arc::new(DataCore::new(Arc::clone(&bridge), version()));
    let writer = Arc::new(BridgeWriter::new(Arc::clone(&bridge), version()));
    let config =
        SyncConfig::new(version(), Brand::new("b1", "Default")).with_write_back(write_back);
    (bridge, TokenSyncTool::new(config, core, writer))
}

const PALETTE: &str = r##"{
    "Colors": {
        "Brand": {
            "red": {"value": "#FF0000", "type": "color"},
            "blue": {"value": "#0000FF", "type": "color"}
        },
        "accent": {"value": "{Colors.Brand.red}", "type": "color", "description": "Call to action"}
    },
    "Radius": {
        "small": {"value": "2px", "type": "borderRadius"}
    }
}"##;

#[tokio::test]
async fn write_back_then_resync_is_stable() {
    let (bridge, tool) = snapshot_tool(Snapshot::default(), true);

    let first = tool.sync(PALETTE).await.unwrap();
    assert_eq!(first.diff.tokens.to_create.len(), 4);
    assert_eq!(first.ack.map(|a| a.tokens_written), Some(4));

    let written = bridge.snapshot();
    assert_eq!(written.tokens.len(), 4);
    // color root, Colors, Brand, radius root, Radius
    assert_eq!(written.groups.len(), 5);

    let second = tool.sync(PALETTE).await.unwrap();
    assert!(second.diff.is_structurally_unchanged());
    assert_eq!(second.diff.tokens.to_update.len(), 4);

    let mut first_ids: Vec<String> = first.tokens.iter().map(|t| t.id.clone()).collect();
    let mut second_ids: Vec<String> = second.tokens.iter().map(|t| t.id.clone()).collect();
    first_ids.sort();
    second_ids.sort();
    assert_eq!(first_ids, second_ids);

    let accent = second.tokens.iter().find(|t| t.name == "accent").unwrap();
    let red = second.tokens.iter().find(|t| t.name == "red").unwrap();
    assert_eq!(accent.alias_id.as_deref(), Some(red.id.as_str()));
    assert_eq!(accent.value, TokenValue::Color("#FF0000".into()));
    assert_eq!(tool.phase(), SyncPhase::Synced);
}

#[tokio::test]
async fn merge_moves_token_into_new_group() {
    let snapshot: Snapshot = serde_json::from_value(json!({
        "tokens": [
            {"id": "t-red", "persistentId": "p-red", "brandId": "b1", "tokenType": "color",
             "name": "red", "value": "#FE0000"}
        ],
        "groups": [
            {"id": "g-root", "persistentId": "g-root", "brandId": "b1", "tokenType": "color",
             "name": "Color", "isRoot": true, "childrenIds": ["g-colors"]},
            {"id": "g-colors", "persistentId": "g-colors", "brandId": "b1", "tokenType": "color",
             "name": "Colors", "childrenIds": ["g-brand"]},
            {"id": "g-brand", "persistentId": "g-brand", "brandId": "b1", "tokenType": "color",
             "name": "Brand", "childrenIds": ["t-red"]}
        ]
    }))
    .unwrap();
    let (_, tool) = snapshot_tool(snapshot, false);

    let loaded = tool
        .load_definition(
            r##"{"Colors": {"Brand": {"Primary": {
                "red": {"value": "#FF0000", "type": "color", "persistentId": "p-red"}
            }}}}"##,
        )
        .unwrap();
    let outcome = tool
        .merge_with_remote(&loaded.processed_nodes, &loaded.groups, false)
        .await
        .unwrap();

    assert_eq!(outcome.diff.groups.to_create.len(), 1);
    let primary = &outcome.diff.groups.to_create[0];
    assert_eq!(primary.name, "Primary");
    assert_eq!(primary.child_ids, vec!["t-red"]);

    let red = &outcome.diff.tokens.to_update[0];
    assert_eq!(red.id, "t-red");
    assert_eq!(red.value, TokenValue::Color("#FF0000".into()));

    let brand = outcome.groups.iter().find(|g| g.id == "g-brand").unwrap();
    assert_eq!(brand.child_ids, vec![primary.id.clone()]);
    assert!(outcome.ack.is_none());
}

#[tokio::test]
async fn sort_orders_follow_the_tree() {
    let (_, tool) = snapshot_tool(Snapshot::default(), false);
    let outcome = tool.sync(PALETTE).await.unwrap();

    let order = |name: &str| {
        outcome
            .tokens
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.sort_order)
            .unwrap()
    };
    let group_order = |name: &str| {
        outcome
            .groups
            .iter()
            .find(|g| g.name == name && !g.is_root)
            .map(|g| g.sort_order)
            .unwrap()
    };

    // Color root, Colors, Brand, red, blue, accent
    assert_eq!(group_order("Colors"), 100);
    assert_eq!(group_order("Brand"), 200);
    assert_eq!(order("red"), 300);
    assert_eq!(order("blue"), 400);
    assert_eq!(order("accent"), 500);
    // Radius root, Radius, small
    assert_eq!(order("small"), 200);
}

fn token_bridge() -> Arc<MockBridge> {
    let bridge = Arc::new(MockBridge::new());
    bridge.set_response(
        endpoints::TOKENS,
        json!({"tokens": [
            {"id": "t1", "persistentId": "p1", "brandId": "b1", "tokenType": "color",
             "name": "red", "value": "#FF0000"}
        ]}),
    );
    bridge
}

#[tokio::test]
async fn concurrent_reads_share_one_fetch() {
    let bridge = token_bridge();
    bridge.set_latency_yields(5);
    let core = DataCore::new(Arc::clone(&bridge), version());

    let (a, b, c) = tokio::join!(core.tokens(), core.tokens(), core.tokens());
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_eq!(bridge.fetch_count(endpoints::TOKENS), 1);
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
}

#[tokio::test]
async fn concurrent_failure_reaches_every_waiter() {
    let bridge = token_bridge();
    bridge.set_latency_yields(5);
    bridge.fail_times(endpoints::TOKENS, "connection reset", 1);
    let core = DataCore::new(Arc::clone(&bridge), version());

    let (a, b) = tokio::join!(core.tokens(), core.tokens());
    assert_eq!(a.unwrap_err(), EngineError::transport("connection reset"));
    assert_eq!(b.unwrap_err(), EngineError::transport("connection reset"));
    assert_eq!(bridge.fetch_count(endpoints::TOKENS), 1);
    assert!(!core.is_synced(Category::Tokens).await);

    // The next caller starts a fresh attempt.
    assert_eq!(core.tokens().await.unwrap().len(), 1);
    assert_eq!(bridge.fetch_count(endpoints::TOKENS), 2);
}

#[tokio::test]
async fn disabled_cache_fetches_every_time() {
    let bridge = token_bridge();
    bridge.set_cache_enabled(false);
    let core = DataCore::new(Arc::clone(&bridge), version());

    core.tokens().await.unwrap();
    core.tokens().await.unwrap();
    assert_eq!(bridge.fetch_count(endpoints::TOKENS), 2);
    assert!(!core.is_synced(Category::Tokens).await);
}

#[tokio::test]
async fn short_render_response_yields_nothing() {
    let bridge = Arc::new(MockBridge::new());
    bridge.set_post_response(
        endpoints::RENDER_ASSETS,
        json!({"items": [
            {"originalName": "Icon", "url": "https://cdn.example/1.svg"},
            {"originalName": "Logo", "url": "https://cdn.example/2.svg"}
        ]}),
    );
    let core = DataCore::new(Arc::clone(&bridge), version());

    let assets: Vec<Asset> = ["a1", "a2", "a3"]
        .iter()
        .map(|id| Asset {
            id: id.to_string(),
            persistent_id: format!("p-{id}"),
            brand_id: "b1".into(),
            name: id.to_string(),
            description: String::new(),
            previous_duplicates: 0,
        })
        .collect();
    let group = AssetGroup {
        id: "g1".into(),
        persistent_id: "g1".into(),
        brand_id: "b1".into(),
        name: "Icons".into(),
        description: String::new(),
        is_root: true,
        subgroup_ids: Vec::new(),
        asset_ids: vec!["a1".into(), "a2".into(), "a3".into()],
    };

    let result = core
        .render_assets(&assets, &[group], AssetFormat::Svg, AssetScale::X1)
        .await;
    assert_eq!(
        result,
        Err(EngineError::CountMismatch {
            requested: 3,
            received: 2
        })
    );
    assert_eq!(bridge.posts()[0].1["persistentIds"], json!(["p-a1", "p-a2", "p-a3"]));
}
