//! Read-only JSON resources.

use serde_json::{json, Value};

use nad_core::types::MAX_BRIGHTNESS;
use nad_core::{DeviceState, Endpoint, Source};

use super::protocol::RpcError;
use super::McpServer;

pub const STATUS_URI: &str = "nad://status";
pub const SOURCES_URI: &str = "nad://sources";
pub const CAPABILITIES_URI: &str = "nad://capabilities";

pub fn definitions() -> Vec<Value> {
    [
        (STATUS_URI, "Receiver status", "Live power, volume, source, mute and brightness"),
        (SOURCES_URI, "Input sources", "Input names in front-panel order"),
        (CAPABILITIES_URI, "Capabilities", "Volume limits, brightness range and inputs"),
    ]
    .into_iter()
    .map(|(uri, name, description)| {
        json!({
            "uri": uri,
            "name": name,
            "description": description,
            "mimeType": "application/json",
        })
    })
    .collect()
}

pub async fn read(server: &McpServer, uri: &str) -> Result<Value, RpcError> {
    let body = match uri {
        STATUS_URI => status(server).await?,
        SOURCES_URI => json!({ "sources": Source::names() }),
        CAPABILITIES_URI => capabilities(server),
        other => return Err(RpcError::invalid_params(format!("unknown resource {other:?}"))),
    };
    let text = serde_json::to_string_pretty(&body).map_err(RpcError::internal)?;
    Ok(json!({
        "contents": [{
            "uri": uri,
            "mimeType": "application/json",
            "text": text,
        }]
    }))
}

async fn status(server: &McpServer) -> Result<Value, RpcError> {
    let result = async {
        let mut client = server.device().await?;
        let state = client.refresh().await?;
        Ok::<_, nad_core::NadError>(status_body(client.endpoint(), &state))
    }
    .await;
    match result {
        Ok(body) => Ok(body),
        Err(e) => {
            if e.is_transport() {
                server.reset_device().await;
            }
            Err(RpcError::internal(format!("[{}] {}", e.tag(), e)))
        }
    }
}

pub fn status_body(endpoint: &Endpoint, state: &DeviceState) -> Value {
    json!({
        "endpoint": endpoint.to_string(),
        "model": state.model,
        "power": state.power.to_string(),
        "volume_db": state.volume,
        "source": state.source.name(),
        "mute": state.mute.to_string(),
        "brightness": state.brightness,
    })
}

fn capabilities(server: &McpServer) -> Value {
    let config = &server.context().config;
    json!({
        "volume": {
            "min_db": config.volume.min_db,
            "max_db": config.volume.max_db,
            "step_db": config.volume.step_db,
        },
        "brightness": { "min": 0, "max": MAX_BRIGHTNESS },
        "sources": Source::names(),
        "power": ["On", "Off"],
        "mute": ["On", "Off"],
    })
}
