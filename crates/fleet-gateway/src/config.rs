use clap::Parser;
use fleet_core::AppId;
use std::{fmt, str::FromStr};

/// Gateway configuration.
#[derive(Parser, Debug, Clone)]
pub struct GatewayConfig {
    /// Bind address for the HTTP server.
    #[arg(long, env = "GATEWAY_BIND", default_value = "127.0.0.1:8091")]
    pub bind: String,

    /// Workers to expose, as `APP_ID=P2P_PORT@RPC_URL` (repeatable; comma-separated in env).
    #[arg(long = "worker", env = "GATEWAY_WORKERS", value_delimiter = ',')]
    pub workers: Vec<WorkerSpec>,

    /// Per-request timeout for consensus-engine RPC calls, in milliseconds.
    #[arg(long, env = "GATEWAY_RPC_TIMEOUT_MS", default_value_t = 10_000)]
    pub rpc_timeout_ms: u64,
}

/// One worker registration: `APP_ID=P2P_PORT@RPC_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub app_id: AppId,
    pub p2p_port: u16,
    pub rpc_url: String,
}

impl FromStr for WorkerSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (app_id, rest) = s
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected APP_ID=P2P_PORT@RPC_URL, got {s:?}"))?;
        let (p2p_port, rpc_url) = rest
            .split_once('@')
            .ok_or_else(|| anyhow::anyhow!("expected APP_ID=P2P_PORT@RPC_URL, got {s:?}"))?;

        let app_id = app_id
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid app id {app_id:?}: {err}"))?;
        let p2p_port = p2p_port
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid p2p port {p2p_port:?}: {err}"))?;
        if rpc_url.is_empty() {
            anyhow::bail!("missing rpc url in {s:?}");
        }

        Ok(Self {
            app_id,
            p2p_port,
            rpc_url: rpc_url.to_string(),
        })
    }
}

impl fmt::Display for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}@{}", self.app_id, self.p2p_port, self.rpc_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_worker_spec() {
        let spec: WorkerSpec = "7=26656@http://127.0.0.1:26657".parse().expect("valid spec");
        assert_eq!(
            spec,
            WorkerSpec {
                app_id: 7,
                p2p_port: 26656,
                rpc_url: "http://127.0.0.1:26657".to_string(),
            }
        );
        assert_eq!(spec.to_string(), "7=26656@http://127.0.0.1:26657");
    }

    #[test]
    fn rejects_malformed_worker_spec() {
        for raw in ["7", "7=26656", "x=26656@http://a", "7=70000@http://a", "7=26656@"] {
            assert!(raw.parse::<WorkerSpec>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn cli_collects_repeated_workers() {
        let cfg = GatewayConfig::try_parse_from([
            "fleet-gateway",
            "--worker",
            "1=26656@http://127.0.0.1:26657",
            "--worker",
            "2=26666@http://127.0.0.1:26667",
            "--rpc-timeout-ms",
            "250",
        ])
        .expect("parse cli");
        assert_eq!(cfg.workers.len(), 2);
        assert_eq!(cfg.workers[1].app_id, 2);
        assert_eq!(cfg.rpc_timeout_ms, 250);
        assert_eq!(cfg.bind, "127.0.0.1:8091");
    }
}
