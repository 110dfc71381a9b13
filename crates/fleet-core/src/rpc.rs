//! JSON-RPC over HTTP client for a worker's embedded consensus node.

use crate::{RpcClient, RpcError, RpcOutcome, DEFAULT_RPC_ID};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'a str,
    method: &'static str,
    params: Value,
}

#[derive(Clone, Debug)]
pub struct HttpRpcClient {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpRpcClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url).context("parse rpc base URL")?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build rpc http client")?;
        Ok(Self { base_url, http })
    }

    async fn call(&self, method: &'static str, id: &str, params: Value) -> RpcOutcome {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let resp = self
            .http
            .post(self.base_url.clone())
            .json(&req)
            .send()
            .await
            .with_context(|| format!("POST rpc {method}"))
            .map_err(RpcError::transport)?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("read rpc {method} response"))
            .map_err(RpcError::transport)?;

        if !status.is_success() {
            let message = match envelope_error(&body) {
                Some(message) => message,
                None if body.trim().is_empty() => status.to_string(),
                None => body,
            };
            return Err(RpcError::request_failed(Some(status.as_u16()), message));
        }

        classify_envelope(method, body)
    }
}

/// Inspect a 2xx JSON-RPC body. The raw text is returned untouched on success.
fn classify_envelope(method: &str, body: String) -> RpcOutcome {
    let envelope: Value = serde_json::from_str(&body)
        .with_context(|| format!("decode rpc {method} response"))
        .map_err(RpcError::body_malformed)?;

    let Some(fields) = envelope.as_object() else {
        return Err(RpcError::body_malformed(anyhow::anyhow!(
            "decode rpc {method} response: expected a JSON object"
        )));
    };

    match fields.get("error") {
        None | Some(Value::Null) => Ok(body),
        Some(err) => Err(RpcError::request_failed(None, rpc_error_message(err))),
    }
}

/// Message of the JSON-RPC `error` object in `body`, if `body` is such an envelope.
fn envelope_error(body: &str) -> Option<String> {
    let envelope: Value = serde_json::from_str(body).ok()?;
    match envelope.as_object()?.get("error")? {
        Value::Null => None,
        err => Some(rpc_error_message(err)),
    }
}

fn rpc_error_message(err: &Value) -> String {
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    match err.get("data").and_then(Value::as_str) {
        Some(data) if !data.is_empty() => format!("{message}: {data}"),
        _ => message,
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn query(&self, path: &str, data: &str, id: &str) -> RpcOutcome {
        let params = json!({
            "path": path,
            "data": data,
            "height": "0",
            "prove": false,
        });
        self.call("abci_query", id, params).await
    }

    async fn status(&self) -> RpcOutcome {
        self.call("status", DEFAULT_RPC_ID, json!({})).await
    }

    async fn broadcast_tx(&self, tx: &str, id: &str) -> RpcOutcome {
        self.call("broadcast_tx_sync", id, json!({ "tx": tx })).await
    }
}
