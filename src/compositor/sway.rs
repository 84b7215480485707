//! Sway compositor implementation
//!
//! Talks to Sway over its i3-ipc compatible Unix socket. A fresh connection
//! is opened for every snapshot so a restarted Sway is picked up transparently.

use color_eyre::eyre::{self, Context, Result};
use serde::Deserialize;
use std::env;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::trace;

use super::{Layout, MonitorInfo, Rect, WindowInfo};

// ============================================================================
// i3-ipc Protocol Constants
// ============================================================================

const IPC_MAGIC: &[u8] = b"i3-ipc";

// Message types
const IPC_GET_OUTPUTS: u32 = 3;
const IPC_GET_TREE: u32 = 4;

/// Largest reply payload accepted from the socket
const MAX_REPLY_LEN: usize = 64 * 1024 * 1024;

/// Hidden output holding the scratchpad
const SCRATCHPAD_OUTPUT: &str = "__i3";

// ============================================================================
// Sway IPC JSON Structures
// ============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
struct SwayRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl From<SwayRect> for Rect {
    fn from(r: SwayRect) -> Self {
        Rect::new(r.x, r.y, r.width, r.height)
    }
}

/// Node of the `GET_TREE` reply
#[derive(Debug, Deserialize)]
struct SwayNode {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    node_type: String,
    rect: SwayRect,
    /// Only set on views (actual application windows)
    #[serde(default)]
    pid: Option<i64>,
    #[serde(default)]
    nodes: Vec<SwayNode>,
    #[serde(default)]
    floating_nodes: Vec<SwayNode>,
}

/// Entry of the `GET_OUTPUTS` reply
#[derive(Debug, Deserialize)]
struct SwayOutput {
    name: String,
    #[serde(default)]
    make: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
    rect: SwayRect,
}

fn default_active() -> bool {
    true
}

impl SwayOutput {
    fn description(&self) -> String {
        [self.make.as_deref(), self.model.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty() && *s != "Unknown")
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Collect views in tree order, skipping the scratchpad
fn collect_windows(node: &SwayNode, windows: &mut Vec<WindowInfo>) {
    if node.node_type == "output" && node.name.as_deref() == Some(SCRATCHPAD_OUTPUT) {
        return;
    }

    let is_view = matches!(node.node_type.as_str(), "con" | "floating_con")
        && node.pid.is_some()
        && node.nodes.is_empty();
    if is_view {
        windows.push(WindowInfo {
            title: node.name.clone().unwrap_or_default(),
            rect: node.rect.into(),
        });
    }

    for child in node.nodes.iter().chain(&node.floating_nodes) {
        collect_windows(child, windows);
    }
}

fn parse_tree(payload: &[u8]) -> Result<Vec<WindowInfo>> {
    let root: SwayNode = serde_json::from_slice(payload).context("Failed to parse Sway tree")?;
    let mut windows = Vec::new();
    collect_windows(&root, &mut windows);
    Ok(windows)
}

fn parse_outputs(payload: &[u8]) -> Result<Vec<MonitorInfo>> {
    let outputs: Vec<SwayOutput> =
        serde_json::from_slice(payload).context("Failed to parse Sway outputs")?;
    Ok(outputs
        .iter()
        .filter(|o| o.active && o.name != SCRATCHPAD_OUTPUT)
        .map(|o| MonitorInfo::new(&o.name, &o.description(), o.rect.into()))
        .collect())
}

// ============================================================================
// Sway Compositor
// ============================================================================

/// Sway compositor using the i3-ipc protocol
#[derive(Debug, Clone)]
pub struct SwayCompositor {
    socket_path: String,
}

impl SwayCompositor {
    /// Reads `SWAYSOCK` from the environment
    ///
    /// # Errors
    /// Returns an error if `SWAYSOCK` is not set.
    pub fn new() -> Result<Self> {
        let socket_path = env::var("SWAYSOCK").context("SWAYSOCK not set. Is Sway running?")?;
        Ok(Self { socket_path })
    }

    #[must_use]
    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    /// Query windows and outputs over one connection
    ///
    /// # Errors
    /// Returns an error if the socket is unreachable or a reply is malformed.
    pub async fn layout(&self) -> Result<Layout> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .with_context(|| format!("Failed to connect to Sway socket: {}", self.socket_path))?;

        let tree = request(&mut stream, IPC_GET_TREE).await?;
        let outputs = request(&mut stream, IPC_GET_OUTPUTS).await?;

        Ok(Layout {
            windows: parse_tree(&tree)?,
            monitors: parse_outputs(&outputs)?,
        })
    }
}

/// Send an empty-payload request and return the reply payload
async fn request(stream: &mut UnixStream, msg_type: u32) -> Result<Vec<u8>> {
    // Header: magic + payload length + type
    let mut message = Vec::with_capacity(14);
    message.extend_from_slice(IPC_MAGIC);
    message.extend_from_slice(&0u32.to_ne_bytes());
    message.extend_from_slice(&msg_type.to_ne_bytes());
    stream
        .write_all(&message)
        .await
        .context("Failed to send IPC message")?;

    let mut header = [0u8; 14];
    stream
        .read_exact(&mut header)
        .await
        .context("Failed to read IPC header")?;

    if &header[0..6] != IPC_MAGIC {
        eyre::bail!("Invalid IPC magic bytes");
    }

    let length = u32::from_ne_bytes([header[6], header[7], header[8], header[9]]) as usize;
    let reply_type = u32::from_ne_bytes([header[10], header[11], header[12], header[13]]);
    if reply_type != msg_type {
        eyre::bail!("Unexpected reply type {reply_type} (expected {msg_type})");
    }

    if length > MAX_REPLY_LEN {
        eyre::bail!("IPC reply of {length} bytes exceeds the {MAX_REPLY_LEN} byte limit");
    }

    let mut payload = vec![0u8; length];
    stream
        .read_exact(&mut payload)
        .await
        .context("Failed to read IPC payload")?;

    trace!("Sway reply type {}: {} bytes", reply_type, length);
    Ok(payload)
}
