use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::fetcher::FetchError;
use crate::model::{LatLng, MarkerCollection, MarkerId, MarkerType, Projection, Scene};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    Configure(CoreConfig),

    // Map widget
    MapInitialized {
        center: LatLng,
        level: i32,
        projection: Projection,
    },
    CenterChanged {
        center: LatLng,
    },
    /// Always followed by `CenterChanged` from the map widget.
    LevelChanged {
        level: i32,
        projection: Projection,
    },
    MarkerClicked {
        marker_id: MarkerId,
    },
    MapClicked {
        lat: f64,
        lng: f64,
    },

    // Scene & detail flows
    SceneEntered(Scene),
    RefreshRequested,
    MarkerPinned {
        latlng: LatLng,
        marker_type: MarkerType,
        data: Option<serde_json::Value>,
    },
    MarkerUnpinned,

    // Sidebar
    SidebarToggled,
    SidebarClosed,

    // Capability responses
    /// `seq` numbers lookups in dispatch order.
    MarkersFetched {
        seq: u64,
        scene_at_dispatch: Scene,
        result: Result<MarkerCollection, FetchError>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::MapInitialized { .. } => "map_initialized",
            Self::CenterChanged { .. } => "center_changed",
            Self::LevelChanged { .. } => "level_changed",
            Self::MarkerClicked { .. } => "marker_clicked",
            Self::MapClicked { .. } => "map_clicked",
            Self::SceneEntered(_) => "scene_entered",
            Self::RefreshRequested => "refresh_requested",
            Self::MarkerPinned { .. } => "marker_pinned",
            Self::MarkerUnpinned => "marker_unpinned",
            Self::SidebarToggled => "sidebar_toggled",
            Self::SidebarClosed => "sidebar_closed",
            Self::MarkersFetched { .. } => "markers_fetched",
        }
    }

    /// Events that originate from a user gesture rather than the widget or network.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::MarkerClicked { .. }
                | Self::MapClicked { .. }
                | Self::RefreshRequested
                | Self::SidebarToggled
                | Self::SidebarClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names() {
        assert_eq!(Event::RefreshRequested.name(), "refresh_requested");
        assert_eq!(Event::SceneEntered(Scene::Initial).name(), "scene_entered");
        assert_eq!(
            Event::MapClicked { lat: 1.0, lng: 2.0 }.name(),
            "map_clicked"
        );
    }

    #[test]
    fn user_initiated_events() {
        assert!(Event::MapClicked { lat: 0.0, lng: 0.0 }.is_user_initiated());
        assert!(Event::MarkerClicked {
            marker_id: MarkerId::new("a")
        }
        .is_user_initiated());
        assert!(!Event::CenterChanged {
            center: LatLng::default()
        }
        .is_user_initiated());
        assert!(!Event::MarkersFetched {
            seq: 1,
            scene_at_dispatch: Scene::Initial,
            result: Err(FetchError::EmptyBody),
        }
        .is_user_initiated());
    }

    #[test]
    fn shell_events_deserialize_from_json() {
        let event: Event = serde_json::from_str(
            r#"{"MapInitialized": {"center": {"lat": 37.5, "lng": 127.0}, "level": 3,
                "projection": {"lat_per_px": 0.0001, "lng_per_px": 0.0001}}}"#,
        )
        .unwrap();
        assert_eq!(event.name(), "map_initialized");

        let event: Event = serde_json::from_str(r#"{"SceneEntered": "kept_location_picker"}"#).unwrap();
        assert_eq!(event, Event::SceneEntered(Scene::KeptLocationPicker));
    }
}
