//! Load driver for a running `server_live`.
//!
//! Fetches the match list over HTTP, opens `--viewers` WebSocket connections that
//! each join every match, and prints per-type frame counts every report interval.

use anyhow::{Context, Result};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Base HTTP URL of the server
    #[clap(long, default_value = "http://127.0.0.1:3000")]
    http_url: String,

    /// WebSocket URL of the server
    #[clap(long, default_value = "ws://127.0.0.1:3000/ws")]
    ws_url: String,

    /// Number of concurrent viewers
    #[clap(short, long, default_value_t = 10)]
    viewers: usize,

    /// Report interval in seconds
    #[clap(short, long, default_value_t = 10)]
    report_interval_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    data: Option<Vec<MatchSummary>>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatchSummary {
    id: String,
    home: String,
    away: String,
}

type Counters = Arc<Mutex<HashMap<String, u64>>>;

async fn fetch_match_ids(http_url: &str) -> Result<Vec<String>> {
    let envelope: Envelope = reqwest::get(format!("{}/api/matches", http_url))
        .await
        .context("Failed to reach the read API")?
        .json()
        .await
        .context("Unexpected read API response")?;
    if !envelope.success {
        anyhow::bail!("Read API error: {}", envelope.error.unwrap_or_default());
    }
    let matches = envelope.data.unwrap_or_default();
    for m in &matches {
        info!("Match {}: {} vs {}", m.id, m.home, m.away);
    }
    Ok(matches.into_iter().map(|m| m.id).collect())
}

async fn run_viewer(n: usize, ws_url: String, match_ids: Vec<String>, counters: Counters) -> Result<()> {
    let url = format!("{}?userId=viewer-{}", ws_url, n);
    let (mut socket, _) = connect_async(url.as_str()).await.context("WebSocket connect failed")?;

    for match_id in &match_ids {
        let frame = json!({"type": "subscribe", "data": {"matchId": match_id}});
        socket.send(Message::Text(frame.to_string().into())).await?;
    }

    while let Some(frame) = socket.next().await {
        match frame? {
            Message::Text(text) => {
                let kind = serde_json::from_str::<Value>(text.as_str())
                    .ok()
                    .and_then(|v| v.get("type").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_else(|| "undecodable".to_string());
                if let Ok(mut counts) = counters.lock() {
                    *counts.entry(kind).or_insert(0) += 1;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let match_ids = fetch_match_ids(&args.http_url).await?;
    let counters: Counters = Arc::new(Mutex::new(HashMap::new()));

    for n in 0..args.viewers {
        let ws_url = args.ws_url.clone();
        let match_ids = match_ids.clone();
        let counters = Arc::clone(&counters);
        tokio::spawn(async move {
            if let Err(e) = run_viewer(n, ws_url, match_ids, counters).await {
                warn!("Viewer {} stopped: {}", n, e);
            }
        });
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(args.report_interval_seconds));
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let snapshot = counters.lock().map(|mut c| std::mem::take(&mut *c)).unwrap_or_default();
                let mut kinds: Vec<_> = snapshot.into_iter().collect();
                kinds.sort();
                info!("Frames in the last {}s: {:?}", args.report_interval_seconds, kinds);
            }
        }
    }
    Ok(())
}
