//! Model Context Protocol server over stdio.
//!
//! One JSON-RPC message per line in, one per line out. The receiver
//! connection is opened on the first tool call that needs it and kept behind
//! an async mutex, so concurrent requests still reach the device one at a
//! time.

pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod tools;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use nad_core::{NadClient, NadError};

use crate::endpoint::Context;
use protocol::{parse_request, Request, Response, RpcError, PROTOCOL_VERSION};

pub const SERVER_NAME: &str = "nadctl";

pub struct McpServer {
    ctx: Context,
    client: Mutex<Option<NadClient>>,
}

impl McpServer {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            client: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Lock the device, dialling it first if needed.
    pub async fn device(&self) -> nad_core::Result<MappedMutexGuard<'_, NadClient>> {
        let mut guard = self.client.lock().await;
        if guard.is_none() {
            let client = self.ctx.connect().await?;
            info!("MCP connected to {}", client.endpoint());
            *guard = Some(client);
        }
        MutexGuard::try_map(guard, |slot| slot.as_mut()).map_err(|_| NadError::NotConnected)
    }

    /// Forget the connection after a transport failure; the next call redials.
    pub async fn reset_device(&self) {
        if let Some(mut client) = self.client.lock().await.take() {
            client.disconnect();
        }
    }

    /// Handle one input line. `None` for notifications and blank lines.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let response = match parse_request(line) {
            Ok(request) => self.handle_request(request).await?,
            Err(response) => response,
        };
        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Failed to encode response: {}", e);
                None
            }
        }
    }

    pub async fn handle_request(&self, request: Request) -> Option<Response> {
        debug!("MCP <- {} {:?}", request.method, request.id);
        let result = self.dispatch(&request.method, &request.params).await;
        let id = request.id?;
        Some(match result {
            Ok(value) => Response::ok(id, value),
            Err(error) => {
                debug!("MCP {} failed: {}", request.method, error.message);
                Response::err(id, error)
            }
        })
    }

    async fn dispatch(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_result(params)),
            "notifications/initialized" | "notifications/cancelled" => Ok(Value::Null),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::definitions() })),
            "tools/call" => {
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcError::invalid_params("missing tool name"))?;
                let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                tools::call(self, name, &args).await
            }
            "resources/list" => Ok(json!({ "resources": resources::definitions() })),
            "resources/read" => {
                let uri = params
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcError::invalid_params("missing resource uri"))?;
                resources::read(self, uri).await
            }
            "prompts/list" => Ok(json!({ "prompts": prompts::definitions() })),
            "prompts/get" => {
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcError::invalid_params("missing prompt name"))?;
                let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                prompts::get(name, &args)
            }
            other => Err(RpcError::method_not_found(other)),
        }
    }

    /// Serve until `reader` reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(reply) = self.handle_line(&line).await {
                writer.write_all(reply.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        info!("MCP client closed stdin");
        self.reset_device().await;
        Ok(())
    }
}

fn initialize_result(params: &Value) -> Value {
    let version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": {
            "tools": {},
            "resources": {},
            "prompts": {},
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// Serve MCP on stdin/stdout.
pub async fn serve_stdio(ctx: Context) -> anyhow::Result<()> {
    info!("MCP server starting on stdio");
    McpServer::new(ctx)
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}
