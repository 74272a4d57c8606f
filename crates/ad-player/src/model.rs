//! Creative data contracts.
//!
//! These shapes are produced by the upstream ad metadata resolver and are
//! read-only to the engine. Field names follow the resolver's camelCase JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Inline style entries (`property -> value`).
pub type StyleMap = BTreeMap<String, String>;

/// Kind of placement an [`AdSlot`](crate::AdSlot) fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    /// Linear break: the ad replaces content playback.
    #[default]
    Linear,
    /// Overlay window: the ad is shown on top of ongoing content.
    Overlay,
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("linear"),
            Self::Overlay => f.write_str("overlay"),
        }
    }
}

/// A playable media file of a creative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFile {
    pub url: String,
    /// MIME type, e.g. `video/mp4`
    #[serde(alias = "type")]
    pub format: String,
}

impl VideoFile {
    pub fn new(url: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: format.into(),
        }
    }
}

/// Banner creative rendered into a page-declared companion target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Companion {
    pub width: u32,
    pub height: u32,
    #[serde(alias = "html")]
    pub markup: String,
}

/// Overlay creative shown on top of content playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonLinearCreative {
    pub width: u32,
    pub height: u32,
    #[serde(alias = "html")]
    pub markup: String,
    #[serde(default)]
    pub css: StyleMap,
}

/// Progress and lifecycle events a creative may carry beacons for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackingEventName {
    Start,
    FirstQuartile,
    Midpoint,
    ThirdQuartile,
    Complete,
    Pause,
    Resume,
    Rewind,
    /// Events the engine never fires (mute, fullscreen, ...)
    #[serde(other)]
    Unsupported,
}

impl TrackingEventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::FirstQuartile => "firstQuartile",
            Self::Midpoint => "midpoint",
            Self::ThirdQuartile => "thirdQuartile",
            Self::Complete => "complete",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Rewind => "rewind",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for TrackingEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A beacon bound to a tracking event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub event_name: TrackingEventName,
    pub beacon_url: String,
}

impl TrackingEvent {
    pub fn new(event_name: TrackingEventName, beacon_url: impl Into<String>) -> Self {
        Self {
            event_name,
            beacon_url: beacon_url.into(),
        }
    }
}

/// A concrete ad asset bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdCreative {
    pub video_files: Vec<VideoFile>,
    pub companions: Vec<Companion>,
    pub non_linear: Vec<NonLinearCreative>,
    pub tracking_events: Vec<TrackingEvent>,
    pub click_through: Option<String>,
    pub impressions: Vec<String>,
}

impl AdCreative {
    pub fn has_video(&self) -> bool {
        !self.video_files.is_empty()
    }
}

/// Page-declared slot for companion content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionTarget {
    #[serde(alias = "elementid")]
    pub element_id: String,
    pub width: u32,
    pub height: u32,
}

impl CompanionTarget {
    pub fn new(element_id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            element_id: element_id.into(),
            width,
            height,
        }
    }

    /// Exact size match.
    pub fn fits(&self, companion: &Companion) -> bool {
        self.width == companion.width && self.height == companion.height
    }
}

/// Countdown notice shown while a linear ad plays.
///
/// `$1` in the text is replaced with the remaining seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotNotice {
    pub text: String,
    #[serde(default)]
    pub css: StyleMap,
}

/// Skip control shown while a linear ad plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipControl {
    pub text: String,
    #[serde(default)]
    pub css: StyleMap,
}
