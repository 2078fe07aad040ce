//! Tool catalogue and dispatch.

use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use nad_core::types::format_volume;
use nad_core::{discover, Direction, Mute, NadError, Source};

use super::protocol::RpcError;
use super::resources::status_body;
use super::McpServer;

struct Tool {
    name: &'static str,
    description: &'static str,
    schema: fn() -> Value,
}

fn no_args() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn level_db() -> Value {
    json!({
        "type": "object",
        "properties": {
            "level": { "type": "number", "description": "Volume in dB, e.g. -30.5" }
        },
        "required": ["level"],
    })
}

fn source_name() -> Value {
    json!({
        "type": "object",
        "properties": {
            "source": { "type": "string", "enum": Source::names() }
        },
        "required": ["source"],
    })
}

fn brightness_level() -> Value {
    json!({
        "type": "object",
        "properties": {
            "level": { "type": "integer", "minimum": 0, "maximum": nad_core::types::MAX_BRIGHTNESS }
        },
        "required": ["level"],
    })
}

fn mute_state() -> Value {
    json!({
        "type": "object",
        "properties": {
            "state": { "type": "string", "enum": ["on", "off"] }
        },
        "required": ["state"],
    })
}

fn discover_args() -> Value {
    json!({
        "type": "object",
        "properties": {
            "refresh": { "type": "boolean", "description": "Scan even if the cache is fresh" },
            "timeout_seconds": { "type": "number", "description": "Overall scan deadline" }
        },
    })
}

const TOOLS: &[Tool] = &[
    Tool { name: "get_status", description: "Read power, volume, source, mute, brightness and model", schema: no_args },
    Tool { name: "power_on", description: "Turn the receiver on", schema: no_args },
    Tool { name: "power_off", description: "Put the receiver in standby", schema: no_args },
    Tool { name: "power_toggle", description: "Toggle power", schema: no_args },
    Tool { name: "get_power", description: "Read the power state", schema: no_args },
    Tool { name: "get_volume", description: "Read the volume in dB", schema: no_args },
    Tool { name: "set_volume", description: "Set the volume in dB (within the configured limits)", schema: level_db },
    Tool { name: "volume_up", description: "Raise the volume by one step", schema: no_args },
    Tool { name: "volume_down", description: "Lower the volume by one step", schema: no_args },
    Tool { name: "get_source", description: "Read the selected input", schema: no_args },
    Tool { name: "set_source", description: "Select an input by name", schema: source_name },
    Tool { name: "next_source", description: "Select the next input", schema: no_args },
    Tool { name: "previous_source", description: "Select the previous input", schema: no_args },
    Tool { name: "list_sources", description: "List the input names", schema: no_args },
    Tool { name: "get_mute", description: "Read the mute state", schema: no_args },
    Tool { name: "set_mute", description: "Mute or unmute", schema: mute_state },
    Tool { name: "toggle_mute", description: "Toggle mute", schema: no_args },
    Tool { name: "get_brightness", description: "Read the front display brightness (0-3)", schema: no_args },
    Tool { name: "set_brightness", description: "Set the front display brightness (0-3)", schema: brightness_level },
    Tool { name: "discover_devices", description: "Find NAD receivers on the local network", schema: discover_args },
];

pub fn definitions() -> Vec<Value> {
    TOOLS
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "inputSchema": (t.schema)(),
            })
        })
        .collect()
}

fn text_result(text: impl Into<String>) -> Value {
    json!({ "content": [{ "type": "text", "text": text.into() }] })
}

fn error_result(err: &NadError) -> Value {
    json!({
        "content": [{ "type": "text", "text": format!("[{}] {}", err.tag(), err) }],
        "isError": true,
    })
}

// ── Argument extraction ───────────────────────────────────────────────────────

fn number_arg(args: &Value, key: &str) -> Result<f64, RpcError> {
    args.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| RpcError::invalid_params(format!("{key} must be a number")))
}

fn integer_arg(args: &Value, key: &str) -> Result<i64, RpcError> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| RpcError::invalid_params(format!("{key} must be an integer")))
}

fn string_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, RpcError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params(format!("{key} must be a string")))
}

fn mute_arg(args: &Value, key: &str) -> Result<Mute, RpcError> {
    string_arg(args, key)?
        .parse()
        .map_err(|_| RpcError::invalid_params(format!("{key} must be \"on\" or \"off\"")))
}

fn optional_bool(args: &Value, key: &str) -> Result<bool, RpcError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| RpcError::invalid_params(format!("{key} must be a boolean"))),
    }
}

fn optional_seconds(args: &Value, key: &str) -> Result<Option<Duration>, RpcError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_f64() {
            Some(secs) if secs.is_finite() && secs > 0.0 => Ok(Some(Duration::from_secs_f64(secs))),
            _ => Err(RpcError::invalid_params(format!("{key} must be a positive number"))),
        },
    }
}

/// Device call decoded from `tools/call`, validated before the receiver is
/// touched.
enum Call {
    Status,
    Power,
    PowerOn,
    PowerOff,
    PowerToggle,
    Volume,
    SetVolume(f64),
    StepVolume(Direction),
    Source,
    SetSource(String),
    StepSource(Direction),
    Mute,
    SetMute(Mute),
    ToggleMute,
    Brightness,
    SetBrightness(i64),
}

pub async fn call(server: &McpServer, name: &str, args: &Value) -> Result<Value, RpcError> {
    let call = match name {
        "get_status" => Call::Status,
        "power_on" => Call::PowerOn,
        "power_off" => Call::PowerOff,
        "power_toggle" => Call::PowerToggle,
        "get_power" => Call::Power,
        "get_volume" => Call::Volume,
        "set_volume" => Call::SetVolume(number_arg(args, "level")?),
        "volume_up" => Call::StepVolume(Direction::Up),
        "volume_down" => Call::StepVolume(Direction::Down),
        "get_source" => Call::Source,
        "set_source" => Call::SetSource(string_arg(args, "source")?.to_string()),
        "next_source" => Call::StepSource(Direction::Up),
        "previous_source" => Call::StepSource(Direction::Down),
        "list_sources" => return Ok(text_result(Source::names().join("\n"))),
        "get_mute" => Call::Mute,
        "set_mute" => Call::SetMute(mute_arg(args, "state")?),
        "toggle_mute" => Call::ToggleMute,
        "get_brightness" => Call::Brightness,
        "set_brightness" => Call::SetBrightness(integer_arg(args, "level")?),
        "discover_devices" => {
            let refresh = optional_bool(args, "refresh")?;
            let timeout = optional_seconds(args, "timeout_seconds")?;
            return Ok(discover_devices(server, refresh, timeout).await);
        }
        other => return Err(RpcError::invalid_params(format!("unknown tool {other:?}"))),
    };

    match run(server, call).await {
        Ok(text) => Ok(text_result(text)),
        Err(e) => {
            warn!("MCP tool {} failed: {}", name, e);
            if e.is_transport() {
                server.reset_device().await;
            }
            Ok(error_result(&e))
        }
    }
}

async fn run(server: &McpServer, call: Call) -> nad_core::Result<String> {
    let mut client = server.device().await?;
    let text = match call {
        Call::Status => {
            let state = client.refresh().await?;
            serde_json::to_string_pretty(&status_body(client.endpoint(), &state))?
        }
        Call::Power => format!("Power: {}", client.power().await?),
        Call::PowerOn => format!("Power: {}", client.power_on().await?),
        Call::PowerOff => format!("Power: {}", client.power_off().await?),
        Call::PowerToggle => format!("Power: {}", client.power_toggle().await?),
        Call::Volume => format!("Volume: {} dB", format_volume(client.volume().await?)),
        Call::SetVolume(db) => format!("Volume: {} dB", format_volume(client.set_volume(db).await?)),
        Call::StepVolume(d) => format!("Volume: {} dB", format_volume(client.step_volume(d).await?)),
        Call::Source => format!("Source: {}", client.source().await?),
        Call::SetSource(name) => format!("Source: {}", client.set_source_name(&name).await?),
        Call::StepSource(d) => format!("Source: {}", client.step_source(d).await?),
        Call::Mute => format!("Mute: {}", client.mute().await?),
        Call::SetMute(mute) => format!("Mute: {}", client.set_mute(mute).await?),
        Call::ToggleMute => format!("Mute: {}", client.toggle_mute().await?),
        Call::Brightness => format!("Brightness: {}", client.brightness().await?),
        Call::SetBrightness(level) => format!("Brightness: {}", client.set_brightness(level).await?),
    };
    Ok(text)
}

async fn discover_devices(server: &McpServer, refresh: bool, timeout: Option<Duration>) -> Value {
    let ctx = server.context();
    let mut options = ctx.config.scan_options();
    if let Some(deadline) = timeout {
        options.deadline = deadline;
    }
    let outcome = discover(
        &ctx.cache,
        &options,
        ctx.config.discovery.use_cache && !refresh,
        ctx.config.cache_ttl(),
        &CancellationToken::new(),
    )
    .await;
    match outcome {
        Ok(outcome) => {
            let devices: Vec<Value> = outcome
                .devices
                .iter()
                .map(|d| json!({ "address": d.address, "port": d.port, "model": d.model }))
                .collect();
            let body = json!({ "devices": devices, "from_cache": outcome.from_cache });
            match serde_json::to_string_pretty(&body) {
                Ok(text) => text_result(text),
                Err(e) => error_result(&NadError::from(e)),
            }
        }
        Err(e) => error_result(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_has_an_object_schema() {
        let defs = definitions();
        assert_eq!(defs.len(), 20);
        for def in &defs {
            assert_eq!(def["inputSchema"]["type"], "object", "{}", def["name"]);
        }
    }

    #[test]
    fn argument_types_are_checked() {
        let args = json!({ "level": "loud", "refresh": "yes", "timeout_seconds": -1 });
        assert!(number_arg(&args, "level").is_err());
        assert!(optional_bool(&args, "refresh").is_err());
        assert!(optional_seconds(&args, "timeout_seconds").is_err());
        assert_eq!(mute_arg(&json!({ "state": "ON" }), "state").unwrap(), Mute::On);
        assert!(mute_arg(&json!({ "state": "loud" }), "state").is_err());
        assert!(mute_arg(&json!({}), "state").is_err());
        assert!(!optional_bool(&json!({}), "refresh").unwrap());
        assert_eq!(
            optional_seconds(&json!({ "timeout_seconds": 2 }), "timeout_seconds").unwrap(),
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn device_errors_carry_the_tag() {
        let result = error_result(&NadError::NotConnected);
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("[NotConnected]"));
    }
}
