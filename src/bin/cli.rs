use anyhow::{bail, Context};
use crabcast::config::CrabcastConfig;
use crabcast::publish::{LocalVideoTrack, NegotiationEvent, TrackHandle, TrackWorker};
use crabcast::testing::{FakeFactory, FakeSender};
use crabcast::types::{VideoCodec, VideoDimensions};
use crabcast::webrtc::{compute_video_encodings, Encoding};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crabcast::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabcast-cli <encodings|replay|config> [args] [--json]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "encodings" => cmd_encodings(&args),
        "replay" => cmd_replay(&args).await,
        "config" => cmd_config(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn positional(args: &[String]) -> Vec<&str> {
    args.iter()
        .skip(2)
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .collect()
}

fn wants_json(args: &[String]) -> bool {
    args.iter().any(|a| a == "--json")
}

fn load_config(path: Option<&str>) -> anyhow::Result<CrabcastConfig> {
    let path = path
        .map(PathBuf::from)
        .unwrap_or_else(CrabcastConfig::default_path);
    let config = CrabcastConfig::load_layered(&path)?;
    if let Err(reason) = config.validate() {
        bail!("Invalid configuration in {:?}: {}", path, reason);
    }
    Ok(config)
}

fn print_encodings(encodings: &[Encoding]) {
    for e in encodings {
        println!(
            "{:<4} active={:<5} mode={:<8} bitrate={:<8} fps={:<3} scale={}",
            e.rid.as_deref().unwrap_or("-"),
            e.active,
            e.scalability_mode.as_deref().unwrap_or("-"),
            e.max_bitrate_bps.map_or("-".to_string(), |b| b.to_string()),
            e.max_framerate.map_or("-".to_string(), |f| f.to_string()),
            e.scale_resolution_down_by
                .map_or("-".to_string(), |s| format!("{:.2}", s)),
        );
    }
}

fn cmd_encodings(args: &[String]) -> anyhow::Result<()> {
    // encodings <width> <height> [codec] [--json]
    let pos = positional(args);
    if pos.len() < 2 {
        eprintln!("Usage: crabcast-cli encodings <width> <height> [codec] [--json]");
        std::process::exit(1);
    }
    let width: u32 = pos[0].parse().context("width must be a number")?;
    let height: u32 = pos[1].parse().context("height must be a number")?;
    let config = load_config(None)?;
    let codec = match pos.get(2) {
        Some(name) => name.parse::<VideoCodec>()?,
        None => config.publish.default_codec,
    };

    let encodings = compute_video_encodings(
        codec,
        VideoDimensions::new(width, height),
        &config.publish.simulcast,
    );
    if wants_json(args) {
        println!("{}", serde_json::to_string_pretty(&encodings)?);
    } else {
        println!("{} {}x{}", codec, width, height);
        print_encodings(&encodings);
    }
    Ok(())
}

/// Negotiation script replayed against an in-memory track.
#[derive(Debug, Deserialize)]
struct ReplayScript {
    codec: Option<VideoCodec>,
    #[serde(default = "default_width")]
    width: u32,
    #[serde(default = "default_height")]
    height: u32,
    steps: Vec<NegotiationEvent>,
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

#[derive(Debug, Serialize)]
struct SenderState {
    codec: VideoCodec,
    active_rids: Vec<String>,
    active: Vec<bool>,
}

#[derive(Debug, Serialize)]
struct StepReport {
    step: usize,
    new_codecs: Vec<VideoCodec>,
    senders: Vec<SenderState>,
}

async fn cmd_replay(args: &[String]) -> anyhow::Result<()> {
    // replay <script.json> [--json]
    let pos = positional(args);
    let Some(script_path) = pos.first() else {
        eprintln!("Usage: crabcast-cli replay <script.json> [--json]");
        std::process::exit(1);
    };
    let contents = std::fs::read_to_string(script_path)
        .with_context(|| format!("Failed to read script {}", script_path))?;
    let script: ReplayScript = serde_json::from_str(&contents).context("Invalid replay script")?;

    let config = load_config(None)?;
    let codec = script.codec.unwrap_or(config.publish.default_codec);
    let source = VideoDimensions::new(script.width, script.height);

    let track = LocalVideoTrack::create(
        "replay",
        Box::new(FakeFactory::new()),
        config.capture.clone(),
        None,
    )?;
    let (handle, task) = TrackWorker::spawn(track, config.worker.command_capacity);

    let primary = Arc::new(FakeSender::new(
        "primary",
        compute_video_encodings(codec, source, &config.publish.simulcast),
    ));
    handle.bind_sender(primary.clone()).await?;
    handle.set_codec(codec).await?;

    let mut senders = vec![(codec, primary)];
    let mut reports = Vec::new();
    for (step, event) in script.steps.into_iter().enumerate() {
        let new_codecs = handle.deliver(event).await;
        for &new_codec in &new_codecs {
            let sender = publish_alternate(&handle, new_codec, source, &config).await?;
            senders.push((new_codec, sender));
        }

        reports.push(StepReport {
            step: step + 1,
            new_codecs,
            senders: senders
                .iter()
                .map(|(codec, sender)| SenderState {
                    codec: *codec,
                    active_rids: sender.active_rids(),
                    active: sender.active_flags(),
                })
                .collect(),
        });
    }

    handle.shutdown().await?;
    task.await?;

    if wants_json(args) {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("step {}: new codecs {:?}", report.step, report.new_codecs);
            for sender in &report.senders {
                println!(
                    "  {:<5} active {:?} {:?}",
                    sender.codec.name(),
                    sender.active_rids,
                    sender.active
                );
            }
        }
    }
    Ok(())
}

async fn publish_alternate(
    handle: &TrackHandle,
    codec: VideoCodec,
    source: VideoDimensions,
    config: &CrabcastConfig,
) -> anyhow::Result<Arc<FakeSender>> {
    let encodings = compute_video_encodings(codec, source, &config.publish.simulcast);
    handle.add_simulcast_track(codec, encodings.clone()).await?;
    let sender = Arc::new(FakeSender::new(codec.name(), encodings));
    handle.bind_simulcast_sender(codec, sender.clone()).await?;
    Ok(sender)
}

fn cmd_config(args: &[String]) -> anyhow::Result<()> {
    // config [path] [--json]
    let pos = positional(args);
    let config = load_config(pos.first().copied())?;
    if wants_json(args) {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
