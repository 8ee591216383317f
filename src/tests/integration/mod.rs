//! Integration tests for the BBC plugin server
//!
//! Every scenario drives the server through its HTTP routes the way a relayer
//! and an operator would.

use crate::{
    application::services::{InstanceDirectory, PluginRegistry},
    config::AppConfig,
    infrastructure::{adapters::MonitoringAdapter, http::HttpServer, loader::ManifestModuleLoader},
    tests::{
        common::{create_test_context, create_test_server, MockLoader, PluginSpec},
        config, TestResult,
    },
};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use warp::{test::request, Filter, Reply};

async fn post<F>(routes: &F, path: &str, body: Value) -> Value
where
    F: Filter<Error = Infallible> + Clone + 'static,
    F::Extract: Reply + Send,
{
    let res = request().method("POST").path(path).json(&body).reply(routes).await;
    serde_json::from_slice(res.body()).unwrap()
}

fn startup_call(product: &str, domain: &str) -> Value {
    json!({
        "product": product,
        "domain": domain,
        "request": { "type": "startUp", "rawContext": hex::encode(create_test_context()) }
    })
}

fn height_call(product: &str, domain: &str) -> Value {
    json!({
        "product": product,
        "domain": domain,
        "request": { "type": "queryLatestHeight" }
    })
}

fn relay_call(product: &str, domain: &str) -> Value {
    json!({
        "product": product,
        "domain": domain,
        "request": { "type": "relayAuthMessage", "rawMessage": "cafe" }
    })
}

fn chain_a_loader() -> Arc<MockLoader> {
    Arc::new(
        MockLoader::new()
            .with_artifact("/repo/a", PluginSpec::new("chainA"))
            .with_artifact("/repo/b", PluginSpec::new("chainB").failing_start()),
    )
}

async fn create_chain_a_server() -> HttpServer {
    config::init();
    let loader = chain_a_loader();
    let registry = Arc::new(PluginRegistry::new("/repo", loader));
    registry.load_plugins().await.unwrap();
    // chainB stays LOADED: its start hook refuses
    assert!(registry.start_plugins().await.is_err());
    let directory = Arc::new(InstanceDirectory::new(registry.clone()));
    HttpServer::new(
        AppConfig::default(),
        registry,
        directory,
        Arc::new(MonitoringAdapter::new().unwrap()),
    )
}

#[tokio::test]
async fn test_startup_then_query_and_unsupported_product() {
    let server = create_chain_a_server().await;
    let routes = server.cross_chain_routes();

    let resp = post(&routes, "/bbc-call", startup_call("chainA", "domain1")).await;
    assert_eq!(resp["code"], 0, "{}", resp);

    let resp = post(&routes, "/if-domain-alive", json!({ "domains": ["domain1"] })).await;
    assert_eq!(resp["payload"]["ifDomainAlive"]["results"]["domain1"], true);

    let resp = post(&routes, "/bbc-call", height_call("chainA", "domain1")).await;
    assert_eq!(resp["code"], 0);
    assert_eq!(resp["payload"]["bbcResp"]["type"], "queryLatestHeight");
    assert_eq!(resp["payload"]["bbcResp"]["height"], 0);

    // loaded but never started counts as unsupported
    let resp = post(&routes, "/bbc-call", startup_call("chainB", "domain1")).await;
    assert_eq!(resp["code"], 218);

    let resp = post(
        &routes,
        "/if-product-support",
        json!({ "products": ["chainA", "chainB", "chainZ"] }),
    )
    .await;
    let results = &resp["payload"]["ifProductSupport"]["results"];
    assert_eq!(results["chainA"], true);
    assert_eq!(results["chainB"], false);
    assert_eq!(results["chainZ"], false);
}

#[tokio::test]
async fn test_call_before_startup_is_217() {
    let server = create_chain_a_server().await;
    let routes = server.cross_chain_routes();

    let resp = post(&routes, "/bbc-call", height_call("chainA", "domain2")).await;
    assert_eq!(resp["code"], 217);
    assert!(resp["errorMsg"]
        .as_str()
        .unwrap()
        .ends_with("call startup plz: domain2"));

    let resp = post(&routes, "/if-domain-alive", json!({ "domains": ["domain2"] })).await;
    assert_eq!(resp["payload"]["ifDomainAlive"]["results"]["domain2"], false);
}

#[tokio::test]
async fn test_concurrent_startup_builds_one_instance() {
    config::init();
    let loader = Arc::new(
        MockLoader::new().with_artifact("/repo/a", PluginSpec::new("chainA").create_delay_ms(40)),
    );
    let (server, _, directory) = create_test_server(loader.clone()).await;
    let routes = server.cross_chain_routes();

    let calls = (0..6).map(|_| post(&routes, "/bbc-call", startup_call("chainA", "domain3")));
    let responses = futures::future::join_all(calls).await;

    assert!(responses.iter().all(|r| r["code"] == 0), "{:?}", responses);
    assert_eq!(loader.constructions(), 1);
    assert_eq!(directory.running_count(), 1);
}

fn slow_chain_a_loader() -> Arc<MockLoader> {
    Arc::new(
        MockLoader::new()
            .with_artifact("/repo/a", PluginSpec::new("chainA").create_delay_ms(300))
            .with_artifact("/repo/b", PluginSpec::new("chainB")),
    )
}

#[tokio::test]
async fn test_abandoned_startup_keeps_other_products_responsive() {
    config::init();
    let (server, _, directory) = create_test_server(slow_chain_a_loader()).await;
    let routes = server.cross_chain_routes();
    let management = server.management_routes();

    // the relayer disconnects long before the instance is built
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        post(&routes, "/bbc-call", startup_call("chainA", "domain1")),
    )
    .await;
    assert!(abandoned.is_err());

    let resp = tokio::time::timeout(
        Duration::from_millis(200),
        post(&management, "/manage", json!({ "type": "stopPlugin", "product": "chainA" })),
    )
    .await
    .expect("stopPlugin answered");
    assert_eq!(resp["code"], 0, "{}", resp);

    let resp = tokio::time::timeout(
        Duration::from_millis(200),
        post(&routes, "/bbc-call", startup_call("chainB", "domain2")),
    )
    .await
    .expect("chainB startup answered");
    assert_eq!(resp["code"], 0, "{}", resp);

    // the build outlives its caller and lands in the directory
    let mut built = false;
    for _ in 0..100 {
        if directory.get("chainA", "domain1").is_some() {
            built = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(built);
}

#[tokio::test]
async fn test_slow_startup_does_not_stall_queued_stop() {
    config::init();
    let (server, _, _) = create_test_server(slow_chain_a_loader()).await;
    let routes = server.cross_chain_routes();
    let management = server.management_routes();

    let slow = post(&routes, "/bbc-call", startup_call("chainA", "domain1"));
    let stop = async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        let began = Instant::now();
        let resp = post(&management, "/manage", json!({ "type": "stopPlugin", "product": "chainA" })).await;
        (resp, began.elapsed())
    };
    let other = async {
        tokio::time::sleep(Duration::from_millis(60)).await;
        let began = Instant::now();
        let resp = post(&routes, "/bbc-call", startup_call("chainB", "domain2")).await;
        (resp, began.elapsed())
    };

    let (slow, (stop, stop_took), (other, other_took)) = tokio::join!(slow, stop, other);
    assert_eq!(stop["code"], 0, "{}", stop);
    assert!(stop_took < Duration::from_millis(200), "{:?}", stop_took);
    assert_eq!(other["code"], 0, "{}", other);
    assert!(other_took < Duration::from_millis(200), "{:?}", other_took);
    assert_eq!(slow["code"], 0, "{}", slow);
}

#[tokio::test]
async fn test_reload_serves_fresh_instances() {
    config::init();
    let loader = Arc::new(MockLoader::new().with_artifact("/repo/a", PluginSpec::new("chainA")));
    let (server, _, _) = create_test_server(loader).await;
    let routes = server.cross_chain_routes();
    let management = server.management_routes();

    assert_eq!(post(&routes, "/bbc-call", startup_call("chainA", "domain1")).await["code"], 0);
    assert_eq!(post(&routes, "/bbc-call", relay_call("chainA", "domain1")).await["code"], 0);
    let resp = post(&routes, "/bbc-call", height_call("chainA", "domain1")).await;
    assert_eq!(resp["payload"]["bbcResp"]["height"], 1);

    let resp = post(&management, "/manage", json!({ "type": "reloadPlugin", "product": "chainA" })).await;
    assert_eq!(resp["code"], 0, "{}", resp);

    // the old instance went away with the old plugin
    let resp = post(&routes, "/bbc-call", height_call("chainA", "domain1")).await;
    assert_eq!(resp["code"], 217);

    assert_eq!(post(&routes, "/bbc-call", startup_call("chainA", "domain1")).await["code"], 0);
    let resp = post(&routes, "/bbc-call", height_call("chainA", "domain1")).await;
    assert_eq!(resp["payload"]["bbcResp"]["height"], 0);
}

#[tokio::test]
async fn test_heartbeat_tracks_registry_and_directory() {
    config::init();
    let loader = Arc::new(
        MockLoader::new()
            .with_artifact("/repo/a", PluginSpec::new("chainA"))
            .with_artifact("/repo/b", PluginSpec::new("chainB")),
    );
    let (server, _, _) = create_test_server(loader).await;
    let routes = server.cross_chain_routes();
    let management = server.management_routes();

    post(&routes, "/bbc-call", startup_call("chainA", "domain1")).await;
    post(&routes, "/bbc-call", startup_call("chainB", "domain2")).await;

    let resp = post(&routes, "/heartbeat", json!({})).await;
    assert_eq!(resp["payload"]["heartbeat"]["products"], json!(["chainA", "chainB"]));
    assert_eq!(resp["payload"]["heartbeat"]["domains"], json!(["domain1", "domain2"]));

    // stopping leaves instances alive but the product is no longer servable
    let resp = post(&management, "/manage", json!({ "type": "stopPlugin", "product": "chainB" })).await;
    assert_eq!(resp["code"], 0);
    let resp = post(&routes, "/heartbeat", json!({})).await;
    assert_eq!(resp["payload"]["heartbeat"]["products"], json!(["chainA"]));
    assert_eq!(resp["payload"]["heartbeat"]["domains"], json!(["domain1", "domain2"]));

    let resp = post(
        &management,
        "/manage",
        json!({ "type": "restartBbc", "product": "chainA", "domain": "domain1" }),
    )
    .await;
    assert_eq!(resp["code"], 0);
    let resp = post(&routes, "/heartbeat", json!({})).await;
    assert_eq!(resp["payload"]["heartbeat"]["domains"], json!(["domain2"]));
}

#[tokio::test]
async fn test_unknown_operations_are_rejected_with_their_codes() {
    config::init();
    let loader = Arc::new(MockLoader::new().with_artifact("/repo/a", PluginSpec::new("chainA")));
    let (server, _, _) = create_test_server(loader).await;
    let routes = server.cross_chain_routes();

    post(&routes, "/bbc-call", startup_call("chainA", "domain1")).await;
    let resp = post(
        &routes,
        "/bbc-call",
        json!({ "product": "chainA", "domain": "domain1", "request": { "type": "addValidRelayer" } }),
    )
    .await;
    assert_eq!(resp["code"], 200);

    let resp = post(&server.management_routes(), "/manage", json!({ "type": "uninstall" })).await;
    assert_eq!(resp["code"], 300);
}

#[tokio::test]
async fn test_simulator_plugin_end_to_end() -> TestResult<()> {
    config::init();
    let repository = tempfile::tempdir()?;
    std::fs::write(
        repository.path().join("sim.toml"),
        "product = \"simchain\"\nfactory = \"simulator\"\n\n[settings]\ninitial_height = 100\n",
    )?;

    let mut app_config = AppConfig::default();
    app_config.plugins.repository = repository.path().display().to_string();

    let loader = Arc::new(ManifestModuleLoader::with_builtin_factories());
    let registry = Arc::new(PluginRegistry::new(app_config.plugins.repository_path(), loader));
    let directory = Arc::new(InstanceDirectory::new(registry.clone()));
    let server = HttpServer::new(app_config, registry, directory, Arc::new(MonitoringAdapter::new()?));
    let routes = server.cross_chain_routes();
    let management = server.management_routes();

    assert_eq!(post(&management, "/manage", json!({ "type": "loadPlugins" })).await["code"], 0);
    assert_eq!(post(&management, "/manage", json!({ "type": "startPlugins" })).await["code"], 0);

    assert_eq!(post(&routes, "/bbc-call", startup_call("simchain", "domain1")).await["code"], 0);
    let resp = post(&routes, "/bbc-call", relay_call("simchain", "domain1")).await;
    assert_eq!(resp["code"], 0, "{}", resp);
    let tx_hash = resp["payload"]["bbcResp"]["receipt"]["txHash"].clone();

    let resp = post(
        &routes,
        "/bbc-call",
        json!({
            "product": "simchain",
            "domain": "domain1",
            "request": { "type": "readCrossChainMessageReceipt", "txHash": tx_hash }
        }),
    )
    .await;
    assert_eq!(resp["payload"]["bbcResp"]["receipt"]["confirmed"], true);

    let resp = post(&routes, "/bbc-call", height_call("simchain", "domain1")).await;
    assert_eq!(resp["payload"]["bbcResp"]["height"], 101);

    let res = request().method("GET").path("/metrics").reply(&routes).await;
    let text = String::from_utf8(res.body().to_vec())?;
    assert!(text.contains("bbc_calls_total"));
    Ok(())
}
