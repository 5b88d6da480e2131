//! xtask simulate — drive controller and bridge the way the A2DP stack would.
//!
//! A simulated sink connects, then the tool issues fixed-size pulls back to
//! back and writes every buffer to the output file. The bridge task runs
//! between pulls, so end-of-track advances happen exactly as on the device.
//! Play the result with e.g. `ffplay -f s16le -ar 44100 -ac 2 out.pcm`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use bluetooth::{BridgeTask, TransportBridge};
use colored::Colorize;
use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use platform::audio_types::{AbsoluteVolume, VolumePercent, PCM_BYTES_PER_SECOND};
use platform::{A2dpSink, ConnectionState, PlayerConfig};
use playback::{AudioPipeline, Mp3Decoder, PlaybackController, PlaybackObserver, PlaybackState};

/// Bytes per pull, as the A2DP stack requests them.
const PULL_LEN: usize = 512;

const PEER: [u8; 6] = [0x5E, 0xED, 0x00, 0x00, 0x00, 0x01];

struct ConsoleSink;

impl A2dpSink for ConsoleSink {
    fn set_volume(&mut self, volume: AbsoluteVolume) {
        tracing::info!("sink volume {}/127", volume.get());
    }

    fn is_connected(&self) -> bool {
        true
    }
}

struct ConsoleObserver;

impl PlaybackObserver for ConsoleObserver {
    fn on_playback_changed(&self, state: PlaybackState, ordinal: Option<u32>, name: &str) {
        let label = match state {
            PlaybackState::Playing => "▶".green(),
            PlaybackState::Paused => "⏸".yellow(),
            PlaybackState::Stopped => "■".red(),
        };
        match ordinal {
            Some(i) => println!("  {label} #{i} {name}"),
            None => println!("  {label}"),
        }
    }
}

/// Entry point for `simulate`.
pub fn run(root: &Path, out: &Path, seconds: u32, gain: u8) -> Result<()> {
    let cfg = PlayerConfig::DEFAULT;
    let mut catalog = crate::catalog::open(root, &cfg)?;
    let total = catalog.load().map_err(|e| anyhow!("catalog load failed: {e}"))?;
    if total == 0 {
        bail!("no tracks under {}", root.display());
    }

    let storage = catalog.storage_mut().clone();
    let pipeline = AudioPipeline::new(storage, Mp3Decoder::new(), &cfg);
    let observer = ConsoleObserver;
    let controller: PlaybackController<'_, NoopRawMutex, _, _> =
        PlaybackController::new(catalog, pipeline, &cfg);
    controller.add_observer(&observer);
    let bridge = TransportBridge::new(&controller, &cfg);
    let mut task = BridgeTask::new(&bridge, ConsoleSink);

    let file = File::create(out).with_context(|| format!("cannot create {}", out.display()))?;
    let mut writer = BufWriter::new(file);
    let pulls = u64::from(seconds)
        .saturating_mul(u64::from(PCM_BYTES_PER_SECOND))
        .checked_div(PULL_LEN as u64)
        .unwrap_or(0);

    println!();
    println!("{}", format!("🎧 Simulating {seconds}s over {total} tracks...").cyan().bold());
    let started = Instant::now();

    block_on(async {
        controller.pipeline().lock().await.set_gain(VolumePercent::new(gain));
        bridge.on_connection_state(ConnectionState::Connected, Some(PEER));
        task.process_events().await;
        let mut buf = [0u8; PULL_LEN];
        for _ in 0..pulls {
            bridge.pull(&mut buf);
            writer.write_all(&buf)?;
            task.process_events().await;
        }
        bridge.on_connection_state(ConnectionState::Disconnected, None);
        task.process_events().await;
        Ok::<(), std::io::Error>(())
    })
    .with_context(|| format!("writing {}", out.display()))?;
    writer.flush()?;

    println!(
        "{}",
        format!(
            "  ✓ {} written in {:.2}s (last position {}s of track #{})",
            out.display(),
            started.elapsed().as_secs_f64(),
            controller.position_seconds(),
            controller.current_ordinal().map_or_else(|| "-".to_string(), |i| i.to_string()),
        )
        .green()
    );
    Ok(())
}
