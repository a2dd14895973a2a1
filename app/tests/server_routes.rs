use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use beeish_wallet_lib::config_store::ContractConfig;
use beeish_wallet_lib::server::{create_router, ServerState};
use beeish_wallet_lib::{
    Address, BlockchainClient, Environment, InputValidator, MetadataClient, RevealProxy,
};
use mockito::{Matcher, Server};
use secrecy::SecretString;
use serde_json::{json, Value};

const TIMEOUT: Duration = Duration::from_secs(5);
const OWNER: &str = "0x00000000000000000000000000000000000000aa";

fn contract() -> ContractConfig {
    ContractConfig {
        address: Address::from_string("0x00000000000000000000000000000000000000cc").unwrap(),
        ..ContractConfig::default()
    }
}

fn state(upstream: &str, passcode: Option<&str>, contract: ContractConfig) -> ServerState {
    ServerState {
        reveal: Arc::new(
            RevealProxy::new(
                upstream,
                passcode.map(|p| SecretString::from(p.to_string())),
                TIMEOUT,
            )
            .unwrap(),
        ),
        chain: Arc::new(BlockchainClient::new(upstream, TIMEOUT).unwrap()),
        metadata: MetadataClient::new(upstream, "https://beeishxyz.mypinata.cloud/ipfs/", TIMEOUT)
            .unwrap(),
        contract,
        validator: Arc::new(InputValidator::new().unwrap()),
        environment: Environment::Test,
        chain_id: 2741,
    }
}

async fn serve(state: ServerState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    addr
}

async fn post_reveal(addr: SocketAddr, body: &str) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/reveal", addr))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

fn token_ids_result(ids: &[u64]) -> String {
    let mut out = format!("0x{:064x}{:064x}", 32, ids.len());
    for id in ids {
        out.push_str(&format!("{:064x}", id));
    }
    out
}

#[tokio::test]
async fn health_reports_environment_and_chain() {
    let addr = serve(state("http://127.0.0.1:9", None, contract())).await;
    let body: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "test");
    assert_eq!(body["chainId"], 2741);
}

#[tokio::test]
async fn reveal_validates_before_calling_upstream() {
    let addr = serve(state("http://127.0.0.1:9", Some("s3cret"), contract())).await;

    let (status, body) = post_reveal(addr, "{}").await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "success": false, "message": "Token ID is required" }));

    let (status, body) = post_reveal(addr, "not json").await;
    assert_eq!(status, 500);
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn reveal_without_passcode_is_configuration_error() {
    let addr = serve(state("http://127.0.0.1:9", None, contract())).await;
    let (status, body) = post_reveal(addr, r#"{"tokenId": 4}"#).await;
    assert_eq!(status, 500);
    assert_eq!(body["message"], "Server configuration error");
}

#[tokio::test]
async fn reveal_proxies_to_metadata_service() {
    let mut upstream = Server::new_async().await;
    let reveal = upstream
        .mock("GET", "/api/reveal-token/21")
        .match_query(Matcher::UrlEncoded("passcode".into(), "s3cret".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true,"item":{"name":"Bee-ish #21","attributes":[]}}"#)
        .create_async()
        .await;

    let addr = serve(state(&upstream.url(), Some("s3cret"), contract())).await;
    let (status, body) = post_reveal(addr, r#"{"tokenId": "21"}"#).await;

    reveal.assert_async().await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["item"]["name"], "Bee-ish #21");
}

#[tokio::test]
async fn owner_tokens_combine_chain_and_metadata() {
    let mut upstream = Server::new_async().await;
    let _call = upstream
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "method": "eth_call" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": token_ids_result(&[3, 9]) }).to_string())
        .create_async()
        .await;
    let _hive = upstream
        .mock("GET", "/metadata/3")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"name":"Bee-ish #3","image":"ipfs://QmHive","attributes":[{"trait_type":"Form","value":"Hive"}]}"#,
        )
        .create_async()
        .await;
    let _missing = upstream
        .mock("GET", "/metadata/9")
        .with_status(404)
        .create_async()
        .await;

    let addr = serve(state(&upstream.url(), None, contract())).await;
    let response = reqwest::get(format!("http://{}/api/owners/{}/tokens", addr, OWNER))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["address"], OWNER);
    assert_eq!(body["counts"], json!({ "all": 2, "hives": 1, "bees": 0 }));
    let tokens = body["tokens"].as_array().unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0]["tokenId"], 3);
    assert_eq!(tokens[0]["form"], "hive");
    assert_eq!(
        tokens[0]["imageUrl"],
        "https://beeishxyz.mypinata.cloud/ipfs/QmHive"
    );
    assert_eq!(tokens[1]["tokenId"], 9);
    assert!(tokens[1]["form"].is_null());
}

#[tokio::test]
async fn owner_tokens_reject_bad_input_and_missing_contract() {
    let addr = serve(state("http://127.0.0.1:9", None, ContractConfig::default())).await;

    let response = reqwest::get(format!("http://{}/api/owners/not-an-address/tokens", addr))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = reqwest::get(format!("http://{}/api/owners/{}/tokens", addr, OWNER))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Server configuration error");
}

#[tokio::test]
async fn owner_tokens_surface_chain_failures_as_bad_gateway() {
    let mut upstream = Server::new_async().await;
    let _down = upstream
        .mock("POST", "/")
        .with_status(503)
        .create_async()
        .await;

    let addr = serve(state(&upstream.url(), None, contract())).await;
    let response = reqwest::get(format!("http://{}/api/owners/{}/tokens", addr, OWNER))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 502);
}
