//! Viewport-driven marker refresh.
//!
//! Every viewport event updates [`SceneState`] and, in scenes that follow the
//! map, plans a lookup around the sidebar-aware center. Lookups complete out
//! of band; [`apply_fetch_result`] commits a result only if the scene it was
//! dispatched from is still the current one.

use tracing::{debug, info, instrument, warn};

use crate::config::CoreConfig;
use crate::fetcher::{FetchError, FetchRequest, FetchStrategy};
use crate::model::{
    LatLng, MarkerCollection, MarkerId, MarkerState, Projection, Scene, SceneState,
};

/// What a completed lookup did to the marker store.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Applied { count: usize, selection_cleared: bool },
    /// The scene changed while the lookup was in flight.
    Stale,
    Failed(FetchError),
}

#[instrument(level = "debug", skip(scene, config))]
pub fn on_map_initialized(
    scene: &mut SceneState,
    config: &CoreConfig,
    center: LatLng,
    level: i32,
    projection: Projection,
) -> Option<FetchRequest> {
    scene.record_center(center);
    scene.record_level(level);
    scene.record_sidebar_offset(projection.sidebar_offset(config.sidebar_width_px));

    refresh_on_move(scene, config)
}

#[instrument(level = "debug", skip(scene, config))]
pub fn on_center_changed(
    scene: &mut SceneState,
    config: &CoreConfig,
    center: LatLng,
) -> Option<FetchRequest> {
    scene.record_center(center);

    refresh_on_move(scene, config)
}

/// Records the new level and sidebar offset without refreshing.
///
/// The map widget reports a center change right after every level change,
/// since zooming shifts the visible center under the fixed-width sidebar.
/// That follow-up event performs the refresh, so refreshing here as well
/// would issue a duplicate lookup. A widget that zooms without reporting the
/// center afterwards will leave markers stale until the next move.
#[instrument(level = "debug", skip(scene, config))]
pub fn on_level_changed(
    scene: &mut SceneState,
    config: &CoreConfig,
    level: i32,
    projection: Projection,
) {
    scene.record_level(level);
    scene.record_sidebar_offset(projection.sidebar_offset(config.sidebar_width_px));
}

fn refresh_on_move(scene: &SceneState, config: &CoreConfig) -> Option<FetchRequest> {
    if scene.scene.refreshes_on_move() {
        refresh(scene, config)
    } else {
        None
    }
}

/// Plans a lookup for the current scene, or `None` if the scene has no
/// lookup or the viewport is not known yet.
#[must_use]
pub fn refresh(scene: &SceneState, config: &CoreConfig) -> Option<FetchRequest> {
    let scene_at_dispatch = scene.scene;
    let strategy = FetchStrategy::for_scene(scene_at_dispatch)?;

    let Some(center) = scene.sidebar_aware_center() else {
        debug!(scene = %scene_at_dispatch, "no viewport yet, skipping refresh");
        return None;
    };

    match FetchRequest::new(
        &config.api_base_url,
        scene_at_dispatch,
        strategy,
        center,
        config.search_radius,
    ) {
        Ok(request) => Some(request),
        Err(e) => {
            warn!(error = %e, "cannot build marker lookup");
            None
        }
    }
}

/// Commits a completed lookup.
///
/// The stale check runs before anything is written: a result whose
/// dispatch scene differs from the current scene leaves the store untouched.
/// Otherwise fetched markers replace the whole collection, the clicked and
/// pinned pseudo-markers are carried over from the previous collection, and
/// a selection that no longer resolves is cleared.
#[instrument(level = "debug", skip(scene, markers, result), fields(current = %scene.scene))]
pub fn apply_fetch_result(
    scene: &SceneState,
    markers: &mut MarkerState,
    scene_at_dispatch: Scene,
    result: Result<MarkerCollection, FetchError>,
) -> SyncOutcome {
    if scene.scene != scene_at_dispatch {
        debug!(dispatched = %scene_at_dispatch, "discarding stale marker lookup");
        return SyncOutcome::Stale;
    }

    let mut fresh = match result {
        Ok(fresh) => fresh,
        Err(e) => {
            warn!(error = %e, "marker lookup failed, keeping previous markers");
            return SyncOutcome::Failed(e);
        }
    };

    for id in [MarkerId::clicked(), MarkerId::pinned()] {
        match markers.markers.get(&id) {
            Some(record) => {
                fresh.insert(id, record.clone());
            }
            None => {
                fresh.remove(&id);
            }
        }
    }

    let count = fresh.len();
    markers.markers = fresh;
    let selection_cleared = markers.drop_dangling_selection();

    info!(count, selection_cleared, "markers refreshed");
    SyncOutcome::Applied {
        count,
        selection_cleared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MarkerRecord, MarkerType};
    use proptest::prelude::*;

    fn item(lat: f64, lng: f64) -> MarkerRecord {
        MarkerRecord {
            latlng: LatLng::new(lat, lng),
            marker_type: MarkerType::Item,
            data: None,
        }
    }

    fn scene_at(scene: Scene, center: LatLng) -> SceneState {
        let mut state = SceneState {
            scene,
            viewport: None,
        };
        state.record_center(center);
        state
    }

    fn any_scene() -> impl Strategy<Value = Scene> {
        prop_oneof![
            Just(Scene::Initial),
            Just(Scene::KeptLocationPicker),
            Just(Scene::ChooseLostOrFound),
            Just(Scene::LostDetailsForm),
            Just(Scene::FoundDetailsForm),
        ]
    }

    fn any_collection() -> impl Strategy<Value = MarkerCollection> {
        prop::collection::hash_map("[a-f]{1,3}", (-80.0f64..80.0, -170.0f64..170.0), 0..8)
            .prop_map(|raw| {
                raw.into_iter()
                    .map(|(id, (lat, lng))| (MarkerId::new(id), item(lat, lng)))
                    .collect()
            })
    }

    mod viewport_event_tests {
        use super::*;

        #[test]
        fn map_initialized_records_viewport_and_refreshes() {
            let config = CoreConfig::default();
            let mut scene = SceneState::default();

            let request = on_map_initialized(
                &mut scene,
                &config,
                LatLng::new(37.5, 127.0),
                4,
                Projection::new(0.0001, 0.0001),
            )
            .expect("initial scene refreshes");

            let viewport = scene.viewport.unwrap();
            assert_eq!(viewport.zoom_level, 4);
            assert_eq!(
                viewport.sidebar_offset,
                Projection::new(0.0001, 0.0001).sidebar_offset(config.sidebar_width_px)
            );
            assert_eq!(request.strategy, FetchStrategy::Items);
            assert_eq!(request.scene_at_dispatch, Scene::Initial);
        }

        #[test]
        fn center_change_in_form_scene_records_without_refresh() {
            let config = CoreConfig::default();
            let mut scene = scene_at(Scene::LostDetailsForm, LatLng::new(0.0, 0.0));

            let request = on_center_changed(&mut scene, &config, LatLng::new(5.0, 6.0));

            assert!(request.is_none());
            assert_eq!(scene.viewport.unwrap().center, LatLng::new(5.0, 6.0));
        }

        #[test]
        fn center_change_in_picker_fetches_strongholds() {
            let config = CoreConfig::default();
            let mut scene = scene_at(Scene::KeptLocationPicker, LatLng::new(0.0, 0.0));

            let request = on_center_changed(&mut scene, &config, LatLng::new(5.0, 6.0)).unwrap();
            assert_eq!(request.strategy, FetchStrategy::Strongholds);
            assert!(request.url.path().ends_with("/strongholds"));
        }

        #[test]
        fn level_change_never_plans_a_lookup() {
            let config = CoreConfig::default();
            let mut scene = scene_at(Scene::Initial, LatLng::new(1.0, 1.0));

            on_level_changed(&mut scene, &config, 9, Projection::new(0.01, 0.02));

            let viewport = scene.viewport.unwrap();
            assert_eq!(viewport.zoom_level, 9);
            assert_eq!(viewport.sidebar_offset, LatLng::new(0.0, config.sidebar_width_px / 2.0 * 0.02));
        }
    }

    mod refresh_tests {
        use super::*;

        #[test]
        fn queries_around_sidebar_aware_center() {
            let config = CoreConfig::default();
            let mut scene = scene_at(Scene::Initial, LatLng::new(37.5, 127.0));
            scene.record_sidebar_offset(LatLng::new(0.0, 0.5));

            let request = refresh(&scene, &config).unwrap();
            let pairs: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();
            assert!(pairs.contains(&("lat".into(), "37.5".into())));
            assert!(pairs.contains(&("lng".into(), "127.5".into())));
            assert!(pairs.contains(&("radius".into(), "10000".into())));
        }

        #[test]
        fn no_viewport_means_no_lookup() {
            let scene = SceneState::default();
            assert!(refresh(&scene, &CoreConfig::default()).is_none());
        }

        #[test]
        fn invalid_base_url_means_no_lookup() {
            let config = CoreConfig {
                api_base_url: "not a url".into(),
                ..CoreConfig::default()
            };
            let scene = scene_at(Scene::Initial, LatLng::new(1.0, 1.0));
            assert!(refresh(&scene, &config).is_none());
        }
    }

    mod apply_tests {
        use super::*;

        #[test]
        fn initial_scene_scenario() {
            let scene = scene_at(Scene::Initial, LatLng::new(37.5, 127.0));
            let mut markers = MarkerState::default();
            let fetched: MarkerCollection = [(MarkerId::new("a"), item(37.5, 127.0))].into();

            let outcome = apply_fetch_result(&scene, &mut markers, Scene::Initial, Ok(fetched));

            assert_eq!(
                outcome,
                SyncOutcome::Applied {
                    count: 1,
                    selection_cleared: false
                }
            );
            assert_eq!(markers.markers.len(), 1);
            assert_eq!(
                markers.get(&MarkerId::new("a")).unwrap().marker_type,
                MarkerType::Item
            );
            assert_eq!(markers.active_marker_id, None);
        }

        #[test]
        fn vanished_selection_is_cleared() {
            let scene = scene_at(Scene::Initial, LatLng::default());
            let mut markers = MarkerState {
                markers: [(MarkerId::new("a"), item(0.0, 0.0))].into(),
                active_marker_id: Some(MarkerId::new("a")),
            };
            let fetched: MarkerCollection = [(MarkerId::new("b"), item(1.0, 1.0))].into();

            let outcome = apply_fetch_result(&scene, &mut markers, Scene::Initial, Ok(fetched));

            assert!(matches!(
                outcome,
                SyncOutcome::Applied {
                    selection_cleared: true,
                    ..
                }
            ));
            assert_eq!(markers.active_marker_id, None);
        }

        #[test]
        fn surviving_selection_is_kept() {
            let scene = scene_at(Scene::Initial, LatLng::default());
            let mut markers = MarkerState {
                markers: [(MarkerId::new("a"), item(0.0, 0.0))].into(),
                active_marker_id: Some(MarkerId::new("a")),
            };
            let fetched: MarkerCollection = [(MarkerId::new("a"), item(0.5, 0.5))].into();

            apply_fetch_result(&scene, &mut markers, Scene::Initial, Ok(fetched));

            assert_eq!(markers.active_marker_id, Some(MarkerId::new("a")));
            assert_eq!(markers.get(&MarkerId::new("a")).unwrap().latlng, LatLng::new(0.5, 0.5));
        }

        #[test]
        fn selected_clicked_marker_survives_refresh() {
            let scene = scene_at(Scene::Initial, LatLng::default());
            let mut markers = MarkerState::default();
            markers
                .markers
                .insert(MarkerId::clicked(), MarkerRecord::clicked_at(LatLng::new(10.0, 20.0)));
            markers.active_marker_id = Some(MarkerId::clicked());

            apply_fetch_result(&scene, &mut markers, Scene::Initial, Ok(MarkerCollection::new()));

            assert_eq!(markers.active_marker_id, Some(MarkerId::clicked()));
            assert_eq!(
                markers.clicked(),
                Some(&MarkerRecord::clicked_at(LatLng::new(10.0, 20.0)))
            );
        }

        #[test]
        fn stale_result_is_discarded() {
            let scene = scene_at(Scene::LostDetailsForm, LatLng::default());
            let mut markers = MarkerState {
                markers: [(MarkerId::new("a"), item(0.0, 0.0))].into(),
                active_marker_id: Some(MarkerId::new("a")),
            };
            let before = markers.clone();

            let outcome =
                apply_fetch_result(&scene, &mut markers, Scene::Initial, Ok(MarkerCollection::new()));

            assert_eq!(outcome, SyncOutcome::Stale);
            assert_eq!(markers, before);
        }

        #[test]
        fn failure_keeps_previous_markers() {
            let scene = scene_at(Scene::Initial, LatLng::default());
            let mut markers = MarkerState {
                markers: [(MarkerId::new("a"), item(0.0, 0.0))].into(),
                active_marker_id: None,
            };
            let before = markers.clone();

            let outcome = apply_fetch_result(
                &scene,
                &mut markers,
                Scene::Initial,
                Err(FetchError::Status { code: 503 }),
            );

            assert_eq!(outcome, SyncOutcome::Failed(FetchError::Status { code: 503 }));
            assert_eq!(markers, before);
        }
    }

    proptest! {
        #[test]
        fn scenes_without_strategy_never_fetch(
            scene in any_scene(),
            lat in -80.0f64..80.0,
            lng in -170.0f64..170.0,
        ) {
            let state = scene_at(scene, LatLng::new(lat, lng));
            let planned = refresh(&state, &CoreConfig::default());
            prop_assert_eq!(planned.is_some(), scene.refreshes_on_move());
        }

        #[test]
        fn stale_completion_leaves_store_identical(
            dispatched in any_scene(),
            current in any_scene(),
            old in any_collection(),
            fresh in any_collection(),
            select_first in any::<bool>(),
        ) {
            prop_assume!(dispatched != current);
            let scene = scene_at(current, LatLng::default());
            let active = if select_first { old.keys().next().cloned() } else { None };
            let mut markers = MarkerState { markers: old, active_marker_id: active };
            let before = markers.clone();

            let outcome = apply_fetch_result(&scene, &mut markers, dispatched, Ok(fresh));

            prop_assert_eq!(outcome, SyncOutcome::Stale);
            prop_assert_eq!(markers, before);
        }

        #[test]
        fn refresh_replaces_all_but_pseudo_markers(
            old in any_collection(),
            fresh in any_collection(),
            clicked in proptest::option::of((-80.0f64..80.0, -170.0f64..170.0)),
            pinned in proptest::option::of((-80.0f64..80.0, -170.0f64..170.0)),
            selected in proptest::option::of("[a-f]{1,3}"),
        ) {
            let scene = scene_at(Scene::Initial, LatLng::default());
            let mut markers = MarkerState { markers: old, active_marker_id: None };
            if let Some((lat, lng)) = clicked {
                markers.markers.insert(MarkerId::clicked(), MarkerRecord::clicked_at(LatLng::new(lat, lng)));
            }
            if let Some((lat, lng)) = pinned {
                markers.markers.insert(MarkerId::pinned(), item(lat, lng));
            }
            markers.active_marker_id = selected.map(MarkerId::new).filter(|id| markers.markers.contains_key(id));
            let clicked_before = markers.clicked().cloned();
            let pinned_before = markers.pinned().cloned();

            apply_fetch_result(&scene, &mut markers, Scene::Initial, Ok(fresh.clone()));

            prop_assert_eq!(markers.clicked().cloned(), clicked_before);
            prop_assert_eq!(markers.pinned().cloned(), pinned_before);
            let regular: MarkerCollection = markers
                .markers
                .iter()
                .filter(|(id, _)| !id.is_reserved())
                .map(|(id, record)| (id.clone(), record.clone()))
                .collect();
            prop_assert_eq!(regular, fresh);
            prop_assert!(markers.selection_is_consistent());
        }
    }
}
