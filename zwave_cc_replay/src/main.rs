//! Capture replay harness.
//!
//! Reads a TOML capture (node identity, command classes and a list of steps),
//! plays it through a `zwave_cc::Node` and prints one JSON object per step
//! with the dispatch outcome, the notifications raised and the messages the
//! node queued in response.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing_subscriber::EnvFilter;

use zwave_cc::config::hex_dump;
use zwave_cc::persist::{load_node_from_path, save_node_to_path};
use zwave_cc::registry::CommandClassRegistry;
use zwave_cc::{Node, Notification, QueuedMsg, RequestFlags};

#[derive(Parser, Debug)]
#[command(name = "zwave_cc_replay")]
#[command(about = "Replay captured Z-Wave frames through a node and print what happens")]
struct Args {
    /// Capture file (TOML)
    capture: PathBuf,

    /// Extra command-class definitions merged over the embedded ones
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Start from saved node state instead of a fresh node
    #[arg(long)]
    state: Option<PathBuf>,

    /// Save node state here after the replay
    #[arg(long)]
    save: Option<PathBuf>,

    /// Pretty-print each JSON record
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Deserialize)]
struct Capture {
    home_id: u32,
    node_id: u8,
    #[serde(default)]
    classes: Vec<u8>,
    scene_count: Option<u8>,
    #[serde(default)]
    poll_intensity: Vec<PollSetting>,
    #[serde(rename = "step", default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct PollSetting {
    class: u8,
    #[serde(default = "default_instance")]
    instance: u8,
    index: u8,
    intensity: u8,
}

#[derive(Debug, Deserialize)]
struct Step {
    comment: Option<String>,
    /// Inbound frame as hex, class id first.
    frame: Option<String>,
    #[serde(default = "default_instance")]
    instance: u8,
    /// Request pass: any of "static", "session", "dynamic".
    request: Option<Vec<String>>,
    set: Option<SetStep>,
    poll: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SetStep {
    class: u8,
    #[serde(default = "default_instance")]
    instance: u8,
    index: u8,
    value: String,
}

const fn default_instance() -> u8 {
    1
}

#[derive(Debug, Serialize)]
struct StepRecord {
    step: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    action: String,
    outcome: String,
    notifications: Vec<NotificationRecord>,
    queued: Vec<QueuedRecord>,
}

#[derive(Debug, Serialize)]
struct NotificationRecord {
    event: Notification,
    label: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Serialize)]
struct QueuedRecord {
    priority: String,
    label: String,
    frame: String,
}

fn parse_hex(s: &str) -> anyhow::Result<Vec<u8>> {
    s.split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).with_context(|| format!("bad hex byte '{b}'")))
        .collect()
}

fn parse_flags(names: &[String]) -> anyhow::Result<RequestFlags> {
    let mut flags = RequestFlags::empty();
    for name in names {
        flags |= match name.to_ascii_lowercase().as_str() {
            "static" => RequestFlags::STATIC,
            "session" => RequestFlags::SESSION,
            "dynamic" => RequestFlags::DYNAMIC,
            other => bail!("unknown request pass '{other}'"),
        };
    }
    Ok(flags)
}

fn build_node(capture: &Capture, state: Option<&PathBuf>) -> anyhow::Result<Node> {
    let mut node = match state {
        Some(path) => load_node_from_path(path)
            .with_context(|| format!("loading node state {}", path.display()))?,
        None => Node::new(capture.home_id, capture.node_id),
    };
    for &class_id in &capture.classes {
        if node.command_class(class_id).is_some() {
            continue;
        }
        node.add_command_class(class_id)
            .with_context(|| format!("adding class 0x{class_id:02X}"))?;
    }
    if let Some(count) = capture.scene_count {
        node.set_scene_count(count).context("configuring scene count")?;
    }
    for p in &capture.poll_intensity {
        let id = node
            .get_value(p.class, p.instance, p.index)
            .map(zwave_cc::Value::id)
            .with_context(|| {
                format!(
                    "no value for poll setting class 0x{:02X} index {}",
                    p.class, p.index
                )
            })?;
        if let Some(v) = node.value_mut(&id) {
            v.set_poll_intensity(p.intensity);
        }
    }
    Ok(node)
}

fn run_step(node: &mut Node, step: &Step, tx: &mut UnboundedSender<QueuedMsg>) -> anyhow::Result<(String, String)> {
    if let Some(hex) = &step.frame {
        let frame = parse_hex(hex)?;
        let handled = node.handle_frame(&frame, step.instance, tx);
        return Ok((format!("frame {hex}"), format!("{handled:?}")));
    }
    if let Some(names) = &step.request {
        let flags = parse_flags(names)?;
        let sent = node.request_state(flags, tx);
        return Ok((format!("request {flags:?}"), format!("sent={sent}")));
    }
    if let Some(set) = &step.set {
        let id = node
            .get_value(set.class, set.instance, set.index)
            .map(zwave_cc::Value::id)
            .with_context(|| format!("no value at class 0x{:02X} index {}", set.class, set.index))?;
        let outcome = match node.set_value_from_string(&id, &set.value, tx) {
            Ok(()) => "ok".to_string(),
            Err(e) => format!("error: {e}"),
        };
        return Ok((format!("set {id} = {}", set.value), outcome));
    }
    if let Some(cycle) = step.poll {
        let n = node.poll(cycle, tx);
        return Ok((format!("poll {cycle}"), format!("requested={n}")));
    }
    bail!("step has no frame, request, set or poll")
}

fn collect_notifications(node: &mut Node) -> Vec<NotificationRecord> {
    node.drain_notifications()
        .into_iter()
        .map(|notification| {
            let value = node.value(&notification.value_id());
            NotificationRecord {
                event: notification,
                label: value.map(|v| v.label().to_string()),
                value: value.map(zwave_cc::Value::get_as_string),
            }
        })
        .collect()
}

fn collect_queued(rx: &mut UnboundedReceiver<QueuedMsg>) -> Vec<QueuedRecord> {
    let mut out = Vec::new();
    while let Ok(q) = rx.try_recv() {
        let frame = match q.msg.build() {
            Ok(bytes) => hex_dump(&bytes),
            Err(e) => {
                tracing::warn!(label = q.msg.label(), "cannot build frame: {e}");
                String::new()
            }
        };
        out.push(QueuedRecord {
            priority: format!("{:?}", q.priority),
            label: q.msg.label().to_string(),
            frame,
        });
    }
    out
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    zwave_cc::init_defaults().context("loading embedded command classes")?;
    if let Some(path) = &args.registry {
        CommandClassRegistry::from_path(path)
            .and_then(|reg| reg.register_or_merge())
            .with_context(|| format!("merging registry {}", path.display()))?;
    }

    let text = tokio::fs::read_to_string(&args.capture)
        .await
        .with_context(|| format!("reading capture {}", args.capture.display()))?;
    let capture: Capture = toml::from_str(&text)
        .with_context(|| format!("parsing capture {}", args.capture.display()))?;
    tracing::info!(
        node = capture.node_id,
        steps = capture.steps.len(),
        "replaying {}",
        args.capture.display()
    );

    let mut node = build_node(&capture, args.state.as_ref())?;
    node.drain_notifications();

    let (mut tx, mut rx) = mpsc::unbounded_channel::<QueuedMsg>();
    for (i, step) in capture.steps.iter().enumerate() {
        let (action, outcome) = run_step(&mut node, step, &mut tx)
            .with_context(|| format!("step {}", i + 1))?;
        let record = StepRecord {
            step: i + 1,
            comment: step.comment.clone(),
            action,
            outcome,
            notifications: collect_notifications(&mut node),
            queued: collect_queued(&mut rx),
        };
        let line = if args.pretty {
            serde_json::to_string_pretty(&record)?
        } else {
            serde_json::to_string(&record)?
        };
        println!("{line}");
    }

    if let Some(path) = &args.save {
        save_node_to_path(&node, path).with_context(|| format!("saving node state {}", path.display()))?;
        tracing::info!("saved node state to {}", path.display());
    }
    Ok(())
}
