#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ad_player::headless::{HeadlessPage, HeadlessPlayer, RecordingBeacons};
use ad_player::{
    AdCreative, AdPlayer, AdPlayerConfig, FixedIndex, TrackingEvent, TrackingEventName,
    VideoFile,
};

pub const PLAYER_ID: &str = "player";
pub const AD_URL: &str = "https://cdn.example/ad.mp4";

/// Initialize tracing for tests with appropriate settings
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub struct Harness {
    pub player: Arc<HeadlessPlayer>,
    pub page: Arc<HeadlessPage>,
    pub beacons: Arc<RecordingBeacons>,
    pub ads: AdPlayer,
}

pub fn harness(config: AdPlayerConfig) -> Harness {
    init_tracing();
    let player = Arc::new(HeadlessPlayer::new(PLAYER_ID, 120.0, 20.0));
    let page = Arc::new(HeadlessPage::new());
    let beacons = Arc::new(RecordingBeacons::default());
    let ads = AdPlayer::with_random_source(
        player.clone(),
        page.clone(),
        beacons.clone(),
        config,
        Arc::new(FixedIndex(0)),
    );
    Harness {
        player,
        page,
        beacons,
        ads,
    }
}

/// Counts done callback invocations.
#[derive(Clone, Default)]
pub struct DoneCounter(Arc<AtomicUsize>);

impl DoneCounter {
    pub fn callback(&self) -> impl FnOnce() + Send + 'static {
        let count = self.0.clone();
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn tracking_events() -> Vec<TrackingEvent> {
    [
        TrackingEventName::Start,
        TrackingEventName::FirstQuartile,
        TrackingEventName::Midpoint,
        TrackingEventName::ThirdQuartile,
        TrackingEventName::Complete,
        TrackingEventName::Pause,
        TrackingEventName::Resume,
        TrackingEventName::Rewind,
    ]
    .into_iter()
    .map(|name| TrackingEvent::new(name, format!("https://track.example/{name}")))
    .collect()
}

pub fn video_creative() -> AdCreative {
    AdCreative {
        video_files: vec![VideoFile::new(AD_URL, "video/mp4")],
        tracking_events: tracking_events(),
        ..Default::default()
    }
}

/// Tracking beacons recorded so far, by event name.
pub fn tracked(beacons: &RecordingBeacons) -> Vec<String> {
    beacons
        .urls()
        .into_iter()
        .filter_map(|u| {
            u.strip_prefix("https://track.example/")
                .map(str::to_string)
        })
        .collect()
}

/// Let spawned work run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Wait past the done-callback grace delay.
pub async fn grace() {
    tokio::time::sleep(Duration::from_millis(60)).await;
}
