// lib.rs - map marker core shared by the web and mobile shells

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod fetcher;
pub mod interaction;
pub mod model;
pub mod sync;
pub mod view;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{ConfigError, CoreConfig};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use fetcher::{FetchError, FetchStrategy, RawMarker};
pub use interaction::{InteractionError, MapClickOutcome};
pub use model::{
    LatLng, MarkerCollection, MarkerId, MarkerRecord, MarkerState, MarkerType, Model, Projection,
    Scene, SceneState, SidebarState, Viewport, CLICKED_MARKER_ID, PINNED_MARKER_ID,
};
pub use sync::SyncOutcome;
pub use view::{MarkerView, ViewModel};

/// Lookup radius around the sidebar-aware center, in the backend's distance unit.
pub const SEARCH_RADIUS: u32 = 10_000;
pub const DEFAULT_SIDEBAR_WIDTH_PX: f64 = 390.0;
pub const DEFAULT_API_BASE_URL: &str = "https://api.lostfound.example/v1";
pub const DEFAULT_ZOOM_LEVEL: i32 = 3;
