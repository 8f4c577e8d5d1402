use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::HashMap, fmt};

use crate::config::CoreConfig;
use crate::fetcher::FetchError;
use crate::DEFAULT_ZOOM_LEVEL;

/// Reserved id of the marker placed by tapping empty map.
pub const CLICKED_MARKER_ID: &str = "__clicked__";
/// Reserved id of the marker owned by a detail flow.
pub const PINNED_MARKER_ID: &str = "__pinned__";

// --- Marker identity ---

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn clicked() -> Self {
        Self::new(CLICKED_MARKER_ID)
    }

    #[must_use]
    pub fn pinned() -> Self {
        Self::new(PINNED_MARKER_ID)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_clicked(&self) -> bool {
        self.0 == CLICKED_MARKER_ID
    }

    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.0 == PINNED_MARKER_ID
    }

    /// Pseudo-markers never come from the backend.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.is_clicked() || self.is_pinned()
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Backends hand out both numeric and textual ids.
impl<'de> Deserialize<'de> for MarkerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

// --- Geography ---

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    #[must_use]
    pub fn translated_by(self, offset: Self) -> Self {
        Self {
            lat: self.lat + offset.lat,
            lng: self.lng + offset.lng,
        }
    }
}

/// Map scale at the current level, as reported by the map widget.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub lat_per_px: f64,
    pub lng_per_px: f64,
}

impl Projection {
    #[must_use]
    pub const fn new(lat_per_px: f64, lng_per_px: f64) -> Self {
        Self {
            lat_per_px,
            lng_per_px,
        }
    }

    /// Geo translation from the widget center to the center of the area
    /// left uncovered by a sidebar docked on the left edge.
    #[must_use]
    pub fn sidebar_offset(&self, sidebar_width_px: f64) -> LatLng {
        LatLng::new(0.0, sidebar_width_px / 2.0 * self.lng_per_px)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom_level: i32,
    pub sidebar_offset: LatLng,
}

impl Viewport {
    #[must_use]
    pub fn at(center: LatLng) -> Self {
        Self {
            center,
            zoom_level: DEFAULT_ZOOM_LEVEL,
            sidebar_offset: LatLng::default(),
        }
    }

    /// The point the user perceives as centered.
    #[must_use]
    pub fn sidebar_aware_center(&self) -> LatLng {
        self.center.translated_by(self.sidebar_offset)
    }
}

// --- Scenes ---

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scene {
    #[default]
    Initial,
    KeptLocationPicker,
    ChooseLostOrFound,
    LostDetailsForm,
    FoundDetailsForm,
}

impl Scene {
    /// Scenes whose marker set follows the viewport.
    #[must_use]
    pub const fn refreshes_on_move(self) -> bool {
        matches!(self, Self::Initial | Self::KeptLocationPicker)
    }

    #[must_use]
    pub const fn is_details_form(self) -> bool {
        matches!(self, Self::LostDetailsForm | Self::FoundDetailsForm)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::KeptLocationPicker => "kept_location_picker",
            Self::ChooseLostOrFound => "choose_lost_or_found",
            Self::LostDetailsForm => "lost_details_form",
            Self::FoundDetailsForm => "found_details_form",
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    pub scene: Scene,
    /// Absent until the map widget reports its first viewport.
    pub viewport: Option<Viewport>,
}

impl SceneState {
    pub fn enter(&mut self, scene: Scene) {
        self.scene = scene;
    }

    pub fn record_center(&mut self, center: LatLng) {
        match &mut self.viewport {
            Some(viewport) => viewport.center = center,
            None => self.viewport = Some(Viewport::at(center)),
        }
    }

    pub fn record_level(&mut self, zoom_level: i32) {
        self.viewport
            .get_or_insert_with(|| Viewport::at(LatLng::default()))
            .zoom_level = zoom_level;
    }

    pub fn record_sidebar_offset(&mut self, sidebar_offset: LatLng) {
        self.viewport
            .get_or_insert_with(|| Viewport::at(LatLng::default()))
            .sidebar_offset = sidebar_offset;
    }

    #[must_use]
    pub fn sidebar_aware_center(&self) -> Option<LatLng> {
        self.viewport.as_ref().map(Viewport::sidebar_aware_center)
    }
}

// --- Markers ---

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerType {
    Item,
    Stronghold,
    Clicked,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub latlng: LatLng,
    #[serde(rename = "type")]
    pub marker_type: MarkerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl MarkerRecord {
    #[must_use]
    pub fn clicked_at(latlng: LatLng) -> Self {
        Self {
            latlng,
            marker_type: MarkerType::Clicked,
            data: None,
        }
    }
}

pub type MarkerCollection = HashMap<MarkerId, MarkerRecord>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerState {
    pub markers: MarkerCollection,
    pub active_marker_id: Option<MarkerId>,
}

impl MarkerState {
    #[must_use]
    pub fn get(&self, id: &MarkerId) -> Option<&MarkerRecord> {
        self.markers.get(id)
    }

    #[must_use]
    pub fn clicked(&self) -> Option<&MarkerRecord> {
        self.markers.get(&MarkerId::clicked())
    }

    #[must_use]
    pub fn pinned(&self) -> Option<&MarkerRecord> {
        self.markers.get(&MarkerId::pinned())
    }

    pub fn remove_clicked(&mut self) -> Option<MarkerRecord> {
        self.markers.remove(&MarkerId::clicked())
    }

    /// Clears the selection if it no longer names a marker. Returns whether it did.
    pub fn drop_dangling_selection(&mut self) -> bool {
        match &self.active_marker_id {
            Some(id) if !self.markers.contains_key(id) => {
                self.active_marker_id = None;
                true
            }
            _ => false,
        }
    }

    /// Selection always names a marker in the collection.
    #[must_use]
    pub fn selection_is_consistent(&self) -> bool {
        self.active_marker_id
            .as_ref()
            .map_or(true, |id| self.markers.contains_key(id))
    }
}

// --- Sidebar ---

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarState {
    pub open: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self { open: true }
    }
}

impl SidebarState {
    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Model {
    pub config: CoreConfig,
    pub scene: SceneState,
    pub markers: MarkerState,
    pub sidebar: SidebarState,

    // Sync bookkeeping: lookups are numbered from 1 in dispatch order
    pub last_dispatched_fetch: u64,
    pub last_settled_fetch: u64,
    pub last_fetch_error: Option<FetchError>,
}

impl Model {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the newest lookup, or one dispatched after it, settles.
    /// A lookup the shell never resolves stops counting once a later one
    /// completes.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.last_settled_fetch < self.last_dispatched_fetch
    }
}
