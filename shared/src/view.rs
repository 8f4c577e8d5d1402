use serde::{Deserialize, Serialize};

use crate::model::{LatLng, MarkerId, MarkerType, Model, Scene};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MarkerView {
    pub id: MarkerId,
    pub latlng: LatLng,
    pub marker_type: MarkerType,
    pub active: bool,
    pub data: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub scene: Scene,
    pub center: Option<LatLng>,
    pub zoom_level: Option<i32>,
    /// Sorted by id so the shell can diff renders cheaply.
    pub markers: Vec<MarkerView>,
    pub active_marker_id: Option<MarkerId>,
    pub sidebar_open: bool,
    pub is_refreshing: bool,
    pub fetch_error: Option<String>,
}

impl From<&Model> for ViewModel {
    fn from(model: &Model) -> Self {
        let active = model.markers.active_marker_id.as_ref();

        let mut markers: Vec<MarkerView> = model
            .markers
            .markers
            .iter()
            .map(|(id, record)| MarkerView {
                id: id.clone(),
                latlng: record.latlng,
                marker_type: record.marker_type,
                active: active == Some(id),
                data: record.data.clone(),
            })
            .collect();
        markers.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            scene: model.scene.scene,
            center: model.scene.viewport.map(|v| v.center),
            zoom_level: model.scene.viewport.map(|v| v.zoom_level),
            markers,
            active_marker_id: model.markers.active_marker_id.clone(),
            sidebar_open: model.sidebar.open,
            is_refreshing: model.is_refreshing(),
            fetch_error: model.last_fetch_error.as_ref().map(ToString::to_string),
        }
    }
}
