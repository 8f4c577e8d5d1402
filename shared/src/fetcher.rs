//! Remote marker lookup.
//!
//! The scene decides which endpoint is queried and how results are tagged.
//! Responses come back to the app as [`Event::MarkersFetched`], already
//! turned into a typed [`MarkerCollection`].

use crux_http::{Error as HttpError, Http};
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::event::Event;
use crate::model::{LatLng, MarkerCollection, MarkerId, MarkerRecord, MarkerType, Scene};

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid request url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("HTTP error {code}")]
    Status { code: u16 },

    #[error("undecodable marker payload: {message}")]
    Decode { message: String },

    #[error("response had no body")]
    EmptyBody,
}

/// Marker shape returned by both lookup endpoints. `data` is the whole
/// object as received, `id` and `latlng` included.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMarker {
    pub id: MarkerId,
    pub latlng: LatLng,
    pub data: serde_json::Value,
}

#[derive(Deserialize)]
struct MarkerKey {
    id: MarkerId,
    latlng: LatLng,
}

impl<'de> Deserialize<'de> for RawMarker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = serde_json::Value::deserialize(deserializer)?;
        let MarkerKey { id, latlng } = MarkerKey::deserialize(&data).map_err(de::Error::custom)?;
        Ok(Self { id, latlng, data })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FetchStrategy {
    Items,
    Strongholds,
}

impl FetchStrategy {
    /// Scenes without a strategy never query the backend.
    #[must_use]
    pub const fn for_scene(scene: Scene) -> Option<Self> {
        match scene {
            Scene::Initial => Some(Self::Items),
            Scene::KeptLocationPicker => Some(Self::Strongholds),
            Scene::ChooseLostOrFound | Scene::LostDetailsForm | Scene::FoundDetailsForm => None,
        }
    }

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::Strongholds => "strongholds",
        }
    }

    #[must_use]
    pub const fn marker_type(self) -> MarkerType {
        match self {
            Self::Items => MarkerType::Item,
            Self::Strongholds => MarkerType::Stronghold,
        }
    }
}

/// A lookup decided by the sync controller, ready to be sent.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest {
    pub strategy: FetchStrategy,
    pub scene_at_dispatch: Scene,
    pub url: Url,
}

impl FetchRequest {
    pub fn new(
        api_base_url: &str,
        scene_at_dispatch: Scene,
        strategy: FetchStrategy,
        center: LatLng,
        radius: u32,
    ) -> Result<Self, FetchError> {
        let url = build_url(api_base_url, strategy, center, radius)?;
        Ok(Self {
            strategy,
            scene_at_dispatch,
            url,
        })
    }
}

pub fn build_url(
    api_base_url: &str,
    strategy: FetchStrategy,
    center: LatLng,
    radius: u32,
) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: api_base_url.to_string(),
        reason,
    };

    let mut url = Url::parse(api_base_url).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("not a base url".to_string()))?
        .pop_if_empty()
        .push(strategy.path());
    url.query_pairs_mut()
        .clear()
        .append_pair("lat", &center.lat.to_string())
        .append_pair("lng", &center.lng.to_string())
        .append_pair("radius", &radius.to_string());

    Ok(url)
}

/// Tags every fetched marker for the strategy. Reserved ids are dropped.
#[must_use]
pub fn into_markers(strategy: FetchStrategy, raw: Vec<RawMarker>) -> MarkerCollection {
    let marker_type = strategy.marker_type();
    let mut markers = MarkerCollection::with_capacity(raw.len());

    for marker in raw {
        if marker.id.is_reserved() {
            warn!(id = %marker.id, "backend returned a reserved marker id, skipping");
            continue;
        }
        markers.insert(
            marker.id,
            MarkerRecord {
                latlng: marker.latlng,
                marker_type,
                data: Some(marker.data),
            },
        );
    }

    markers
}

fn collect_response(
    strategy: FetchStrategy,
    result: crux_http::Result<crux_http::Response<Vec<u8>>>,
) -> Result<MarkerCollection, FetchError> {
    let mut response = result.map_err(|e| match e {
        HttpError::Http(e) => FetchError::Status { code: e.code.into() },
        other => FetchError::Transport {
            message: other.to_string(),
        },
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { code: status.into() });
    }

    let body = response.take_body().ok_or(FetchError::EmptyBody)?;
    let raw = decode_markers(&body)?;
    Ok(into_markers(strategy, raw))
}

pub fn decode_markers(body: &[u8]) -> Result<Vec<RawMarker>, FetchError> {
    if body.is_empty() {
        return Err(FetchError::EmptyBody);
    }
    serde_json::from_slice(body).map_err(|e| FetchError::Decode {
        message: e.to_string(),
    })
}

/// Sends the lookup; completion arrives as [`Event::MarkersFetched`] tagged
/// with `seq`.
///
/// The HTTP effect carries no deadline. Shells are expected to time requests
/// out themselves and resolve them with an error, which arrives here as
/// [`FetchError::Transport`].
pub fn fetch_markers(http: &Http<Event>, request: FetchRequest, seq: u64) {
    let FetchRequest {
        strategy,
        scene_at_dispatch,
        url,
    } = request;

    debug!(%url, scene = %scene_at_dispatch, seq, "fetching markers");

    http.get(url.as_str()).send(move |result| Event::MarkersFetched {
        seq,
        scene_at_dispatch,
        result: collect_response(strategy, result),
    });
}
