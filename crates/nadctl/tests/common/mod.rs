#![allow(dead_code)]

use nad_core::{Config, DiscoveryCache, Endpoint, Simulator};
use nadctl::{Context, McpServer};
use serde_json::{json, Value};

pub async fn start_simulator() -> Simulator {
    Simulator::bind("127.0.0.1:0")
        .await
        .expect("simulator should bind an ephemeral port")
}

/// Config aimed at `endpoint` with short timeouts and an isolated cache.
pub fn context(endpoint: Option<&Endpoint>, cache_dir: &tempfile::TempDir) -> Context {
    let mut config = Config::default();
    if let Some(endpoint) = endpoint {
        config.device.address = Some(endpoint.host.clone());
        config.device.port = endpoint.port;
    }
    config.device.connect_timeout_ms = 500;
    config.device.read_timeout_ms = 500;
    config.discovery.probe_timeout_ms = 300;
    config.discovery.timeout_secs = 2;
    Context::with_cache(config, DiscoveryCache::new(cache_dir.path().join("cache.json")))
}

pub fn server(endpoint: Option<&Endpoint>, cache_dir: &tempfile::TempDir) -> McpServer {
    McpServer::new(context(endpoint, cache_dir))
}

/// Send one request and decode the reply.
pub async fn request(server: &McpServer, id: u64, method: &str, params: Value) -> Value {
    let line = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }).to_string();
    let reply = server
        .handle_line(&line)
        .await
        .expect("requests with an id get a reply");
    serde_json::from_str(&reply).expect("reply is JSON")
}

pub async fn call_tool(server: &McpServer, id: u64, name: &str, arguments: Value) -> Value {
    request(server, id, "tools/call", json!({ "name": name, "arguments": arguments })).await
}

/// Text of the first content block of a tool result.
pub fn tool_text(reply: &Value) -> &str {
    reply["result"]["content"][0]["text"]
        .as_str()
        .expect("tool result has text content")
}
