use std::sync::Arc;
use std::time::{Duration, Instant};

use ad_player::headless::{HeadlessPage, HeadlessPlayer, RecordingBeacons};
use ad_player::{
    AdPlayer, AdPlayerConfig, AdSlot, BeaconSender, HttpBeaconSender, PlaybackSurface,
    RandomSource, SeededRandom, ThreadRandom,
};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::SimulateArgs;

const PLAYER_ID: &str = "adslot";
const CLOCK_TICK: Duration = Duration::from_millis(100);

/// Records every beacon and also sends it over HTTP.
struct LiveBeacons {
    recorder: Arc<RecordingBeacons>,
    http: HttpBeaconSender,
}

impl BeaconSender for LiveBeacons {
    fn send(&self, url: &str) {
        self.recorder.send(url);
        self.http.send(url);
    }
}

#[derive(Debug, Serialize)]
struct Report {
    slot_type: String,
    elapsed_secs: f64,
    interrupted: bool,
    beacons: Vec<String>,
    companion_updates: Vec<serde_json::Value>,
    host_calls: Vec<String>,
}

async fn load_config(args: &SimulateArgs) -> Result<AdPlayerConfig> {
    let config = match &args.config {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading config {}", path.display()))?;
            AdPlayerConfig::from_json_str(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => AdPlayerConfig::default(),
    };
    Ok(if args.sibling {
        config.with_video_sibling(true)
    } else {
        config
    })
}

/// End a slot that is still displayed and wait out the done-callback delay.
async fn end_display(ads: &AdPlayer, slot: &Arc<AdSlot>) {
    if !slot.is_currently_displayed() {
        return;
    }
    ads.display(slot, || {}, None);
    tokio::time::sleep(ads.config().done_grace_delay() + CLOCK_TICK).await;
}

/// Advance the simulated surfaces in real time until cancelled.
fn spawn_clock(player: Arc<HeadlessPlayer>, token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLOCK_TICK);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let step = CLOCK_TICK.as_secs_f64();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    for surface in [player.primary(), player.sibling()].into_iter().flatten() {
                        if surface.advance(step) {
                            debug!(surface = surface.id(), "Simulated playback ended");
                        }
                    }
                }
            }
        }
    })
}

pub async fn run(args: SimulateArgs) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.slot)
        .await
        .with_context(|| format!("reading slot {}", args.slot.display()))?;
    let slot = Arc::new(
        AdSlot::from_json_str(&raw)
            .with_context(|| format!("parsing slot {}", args.slot.display()))?,
    );
    let config = load_config(&args).await?;

    let display_duration = match args.duration {
        Some(secs) if !secs.is_finite() || secs < 0.0 => {
            bail!("--duration must be a non-negative number of seconds, got {secs}")
        }
        Some(secs) => Some(Duration::from_secs_f64(secs)),
        None => None,
    };

    let player = Arc::new(
        HeadlessPlayer::new(PLAYER_ID, args.content_length, args.ad_length)
            .with_supported_formats(args.formats.iter().cloned()),
    );
    let page = Arc::new(HeadlessPage::new());
    for target in &slot.companion_targets {
        page.add_container(&target.element_id);
    }

    let recorder = Arc::new(RecordingBeacons::default());
    let beacons: Arc<dyn BeaconSender> = if args.live_beacons {
        Arc::new(LiveBeacons {
            recorder: recorder.clone(),
            http: HttpBeaconSender::new(&config.beacon)?,
        })
    } else {
        recorder.clone()
    };
    let random: Arc<dyn RandomSource> = match args.seed {
        Some(seed) => Arc::new(SeededRandom::new(seed)),
        None => Arc::new(ThreadRandom),
    };

    let ads = AdPlayer::with_random_source(player.clone(), page.clone(), beacons, config, random);

    // Content is playing when the slot starts.
    if let Some(primary) = player.primary() {
        primary.play();
    }
    let clock_token = CancellationToken::new();
    let clock = spawn_clock(player.clone(), clock_token.clone());

    info!(
        slot = %args.slot.display(),
        slot_type = %slot.slot_type,
        ads = slot.ads.len(),
        "Starting simulation"
    );
    let started = Instant::now();
    let interrupted = tokio::select! {
        _ = ads.display_and_wait(&slot, display_duration) => false,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, ending slot");
            end_display(&ads, &slot).await;
            true
        }
    };
    clock_token.cancel();
    if let Err(e) = clock.await {
        warn!(error = %e, "Clock task failed");
    }

    let report = Report {
        slot_type: slot.slot_type.to_string(),
        elapsed_secs: started.elapsed().as_secs_f64(),
        interrupted,
        beacons: recorder.urls(),
        companion_updates: player
            .notifications()
            .into_iter()
            .map(|(_, payload)| payload)
            .collect(),
        host_calls: player.calls(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
