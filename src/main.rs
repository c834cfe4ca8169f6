//! UI bridge sidecar - main entry point.
//!
//! Reads host events as JSON lines (`{"event": "tool:pre", "data": {...}}`)
//! from a file or stdin, runs them through a mounted bridge and delivers the
//! resulting UI events either as JSON lines on stdout or to WebSocket peers.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;

use ui_bridge::adapters::codec::{read_line, DEFAULT_MAX_LINE_BYTES};
use ui_bridge::mount::mount_with_options;
use ui_bridge::types::deep_merge;
use ui_bridge::{BridgeContext, HookRegistry, LineStreamAdapter, UiAdapter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    /// JSON lines on stdout.
    Stdout,
    /// Broadcast WebSocket server.
    Websocket,
}

#[derive(Debug, Parser)]
#[command(name = "ui-bridge", version, about = "Translate host lifecycle events into UI events")]
struct Args {
    /// Host event stream (JSON lines). Defaults to stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// JSON file with configuration overrides.
    #[arg(long, env = "UI_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "stdout")]
    transport: Transport,

    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(long, default_value_t = 8765)]
    port: u16,

    /// native, ui_friendly or both.
    #[arg(long)]
    event_mode: Option<String>,

    /// minimal, standard, verbose or debug.
    #[arg(long)]
    preset: Option<String>,

    /// Keep serving after the input ends, until Ctrl-C.
    #[arg(long)]
    linger: bool,
}

#[derive(Debug, Deserialize)]
struct HostRecord {
    event: String,
    #[serde(default)]
    data: Value,
}

impl Args {
    async fn options(&self) -> Result<Value, Box<dyn std::error::Error>> {
        let mut options = match &self.config {
            Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
            None => json!({}),
        };

        let mut flags = Map::new();
        if let Some(mode) = &self.event_mode {
            flags.insert("event_mode".into(), json!(mode));
        }
        if let Some(preset) = &self.preset {
            flags.insert("preset".into(), json!(preset));
        }
        let transport = match self.transport {
            Transport::Stdout => json!({"type": "custom", "adapter": "stdout"}),
            Transport::Websocket => {
                json!({"type": "websocket", "host": self.host, "port": self.port})
            }
        };
        flags.insert("transport".into(), transport);
        deep_merge(&mut options, Value::Object(flags));
        Ok(options)
    }
}

async fn pump<R: AsyncBufRead + Unpin>(reader: &mut R, hooks: &HookRegistry) {
    loop {
        match read_line(reader, DEFAULT_MAX_LINE_BYTES).await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match serde_json::from_str::<HostRecord>(&line) {
                Ok(record) => {
                    hooks.fire(&record.event, record.data).await;
                }
                Err(err) => tracing::warn!(error = %err, "Skipping malformed host event"),
            },
            Ok(None) => break,
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!(error = %err, "Skipping unreadable input line");
            }
            Err(err) => {
                tracing::error!(error = %err, "Input read failed");
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize observability
    ui_bridge::observability::init_tracing();

    let mut context = BridgeContext::new();
    context.register_adapter_factory("stdout", |_: &Map<String, Value>| {
        Ok(Arc::new(LineStreamAdapter::writer_only(tokio::io::stdout())) as Arc<dyn UiAdapter>)
    });

    let hooks = HookRegistry::new();
    let mounted = mount_with_options(&hooks, args.options().await?, &mut context).await?;

    let cancel = CancellationToken::new();
    let mut command_loops = Vec::new();
    if let Some(bridge) = mounted.bridges().first().cloned() {
        let weak = Arc::downgrade(&bridge);
        bridge
            .register_command_handler("get_history", move |_: Map<String, Value>| {
                let events = weak.upgrade().map(|b| b.history()).unwrap_or_default();
                async move { Ok::<_, ui_bridge::Error>(serde_json::to_value(events)?) }
            })
            .await;
        let token = cancel.clone();
        command_loops.push(tokio::spawn(async move {
            bridge.serve_commands(token).await;
        }));
    }

    tracing::info!(transport = mounted.transport(), "UI bridge sidecar running");

    let input = async {
        match &args.input {
            Some(path) => {
                let file = tokio::fs::File::open(path).await?;
                pump(&mut BufReader::new(file), &hooks).await;
            }
            None => pump(&mut BufReader::new(tokio::io::stdin()), &hooks).await,
        }
        if args.linger {
            std::future::pending::<()>().await;
        }
        Ok::<_, std::io::Error>(())
    };

    tokio::select! {
        result = input => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    cancel.cancel();
    for handle in command_loops {
        let _ = handle.await;
    }
    mounted.unmount().await;
    Ok(())
}
