//! Marker and map clicks, plus the pin flow.
//!
//! Selection is either empty or names one marker in the collection. Tapping
//! empty map with nothing selected places the clicked pseudo-marker and
//! selects it; tapping again deselects (and drops the pseudo-marker if it was
//! the selection).

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::model::{
    LatLng, MarkerId, MarkerRecord, MarkerState, MarkerType, SceneState, SidebarState,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("marker not found: {0}")]
    MarkerNotFound(MarkerId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapClickOutcome {
    /// A details form owns location picking.
    Ignored,
    Deselected(MarkerId),
    Placed(LatLng),
}

#[instrument(level = "debug", skip_all, fields(marker_id = %marker_id))]
pub fn on_marker_clicked(
    markers: &mut MarkerState,
    sidebar: &mut SidebarState,
    marker_id: &MarkerId,
) -> Result<(), InteractionError> {
    if markers.get(marker_id).is_none() {
        warn!("clicked marker is not in the collection");
        return Err(InteractionError::MarkerNotFound(marker_id.clone()));
    }

    if !marker_id.is_clicked() && markers.remove_clicked().is_some() {
        debug!("pending placement cancelled");
    }

    markers.active_marker_id = Some(marker_id.clone());
    sidebar.open();
    Ok(())
}

#[instrument(level = "debug", skip(scene, markers, sidebar), fields(current = %scene.scene))]
pub fn on_map_clicked(
    scene: &SceneState,
    markers: &mut MarkerState,
    sidebar: &mut SidebarState,
    lat: f64,
    lng: f64,
) -> MapClickOutcome {
    if scene.scene.is_details_form() {
        return MapClickOutcome::Ignored;
    }

    if let Some(previous) = markers.active_marker_id.take() {
        if previous.is_clicked() {
            markers.remove_clicked();
        }
        return MapClickOutcome::Deselected(previous);
    }

    let at = LatLng::new(lat, lng);
    markers
        .markers
        .insert(MarkerId::clicked(), MarkerRecord::clicked_at(at));
    markers.active_marker_id = Some(MarkerId::clicked());
    sidebar.open();
    MapClickOutcome::Placed(at)
}

/// Places or replaces the pinned pseudo-marker. Selection is left alone.
pub fn pin_marker(
    markers: &mut MarkerState,
    latlng: LatLng,
    marker_type: MarkerType,
    data: Option<serde_json::Value>,
) {
    markers.markers.insert(
        MarkerId::pinned(),
        MarkerRecord {
            latlng,
            marker_type,
            data,
        },
    );
}

/// Removes the pinned pseudo-marker. Returns whether one existed.
pub fn unpin_marker(markers: &mut MarkerState) -> bool {
    let removed = markers.markers.remove(&MarkerId::pinned()).is_some();
    markers.drop_dangling_selection();
    removed
}
