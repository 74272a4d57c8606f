//! ad-player: client-side video ad insertion and tracking.
//!
//! Given an [`AdSlot`] (a linear break or an overlay window) and a host media
//! player, the engine picks a creative, plays or renders it, reports playback
//! progress through tracking beacons, and restores the player when the slot
//! is over.
//!
//! ## Entry point
//!
//! - [`AdPlayer`] - Injects the host collaborators and displays slots
//!
//! ## Data contracts
//!
//! - [`AdSlot`] - Placement opportunity with candidate creatives and page helpers
//! - [`AdCreative`] - Video files, companions, overlays, beacons
//! - [`CompanionTarget`] - Page container for companion banners
//!
//! ## Host collaborators
//!
//! - [`HostPlayer`] / [`PlaybackSurface`] - The media player and its video surfaces
//! - [`PageInterface`] - Element insertion scoped to the player
//! - [`BeaconSender`] - Fire-and-forget beacon transport ([`HttpBeaconSender`])
//! - [`RandomSource`] - Creative selection ([`ThreadRandom`], [`SeededRandom`])
//!
//! ## Tracking
//!
//! - [`TrackingEventDispatcher`] - Quartile and lifecycle beacons
//!
//! ## Headless host
//!
//! - [`headless`] - In-memory player, page and beacon recorder

pub mod beacon;
pub mod companion;
pub mod config;
mod context;
mod duration;
pub mod error;
pub mod events;
pub mod headless;
pub mod host;
pub mod model;
pub mod orchestrator;
pub mod overlay;
pub mod selection;
pub mod slot;
pub mod task;
pub mod tracking;
pub mod video;

pub use beacon::{BeaconSender, HttpBeaconSender};
pub use companion::UPDATE_COMPANION_EVENT;
pub use config::{AdPlayerConfig, BeaconConfig};
pub use error::{AdPlayerError, Result};
pub use events::{EventHub, PageEvent, PlayerEvent, Propagation, Subscription, SurfaceEvent};
pub use host::{
    ControlBarState, ElementKind, HostPlayer, OverlayLayout, PageElement, PageInterface,
    PlaybackSurface, Transition,
};
pub use model::{
    AdCreative, Companion, CompanionTarget, NonLinearCreative, SkipControl, SlotNotice,
    SlotType, StyleMap, TrackingEvent, TrackingEventName, VideoFile,
};
pub use orchestrator::AdPlayer;
pub use overlay::overlay_layout;
pub use selection::{FixedIndex, RandomSource, SeededRandom, ThreadRandom, select_from};
pub use slot::{AdSlot, CycleId, DoneCallback};
pub use task::{FirstTick, ScheduledTask};
pub use tracking::{TrackingBinding, TrackingEventDispatcher};
pub use video::render_notice;
