use tracing::{debug, info, warn};

use crate::capabilities::Capabilities;
use crate::event::Event;
use crate::fetcher::{self, FetchRequest};
use crate::interaction::{self, MapClickOutcome};
use crate::model::Model;
use crate::sync::{self, SyncOutcome};
use crate::view::ViewModel;

#[derive(Default)]
pub struct App;

impl App {
    fn send_fetch(request: Option<FetchRequest>, model: &mut Model, caps: &Capabilities) {
        if let Some(request) = request {
            model.last_dispatched_fetch += 1;
            fetcher::fetch_markers(&caps.http, request, model.last_dispatched_fetch);
        }
    }

    /// Routes one event to its controller. Returns whether anything the
    /// view depends on may have changed.
    fn handle(event: Event, model: &mut Model, caps: &Capabilities) -> bool {
        match event {
            Event::Configure(config) => match config.validate() {
                Ok(()) => {
                    info!(api_base_url = %config.api_base_url, "configuration updated");
                    model.config = config;
                    false
                }
                Err(e) => {
                    warn!(error = %e, "rejected configuration");
                    false
                }
            },

            Event::MapInitialized {
                center,
                level,
                projection,
            } => {
                let request =
                    sync::on_map_initialized(&mut model.scene, &model.config, center, level, projection);
                Self::send_fetch(request, model, caps);
                true
            }

            Event::CenterChanged { center } => {
                let request = sync::on_center_changed(&mut model.scene, &model.config, center);
                Self::send_fetch(request, model, caps);
                true
            }

            Event::LevelChanged { level, projection } => {
                sync::on_level_changed(&mut model.scene, &model.config, level, projection);
                true
            }

            Event::SceneEntered(scene) => {
                model.scene.enter(scene);
                if scene.refreshes_on_move() {
                    let request = sync::refresh(&model.scene, &model.config);
                    Self::send_fetch(request, model, caps);
                }
                true
            }

            Event::RefreshRequested => {
                let request = sync::refresh(&model.scene, &model.config);
                let planned = request.is_some();
                Self::send_fetch(request, model, caps);
                planned
            }

            Event::MarkersFetched {
                seq,
                scene_at_dispatch,
                result,
            } => {
                model.last_settled_fetch = model.last_settled_fetch.max(seq);

                match sync::apply_fetch_result(
                    &model.scene,
                    &mut model.markers,
                    scene_at_dispatch,
                    result,
                ) {
                    SyncOutcome::Applied { .. } => model.last_fetch_error = None,
                    SyncOutcome::Failed(e) => model.last_fetch_error = Some(e),
                    SyncOutcome::Stale => {}
                }
                true
            }

            Event::MarkerClicked { marker_id } => {
                match interaction::on_marker_clicked(&mut model.markers, &mut model.sidebar, &marker_id)
                {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "ignoring marker click");
                        false
                    }
                }
            }

            Event::MapClicked { lat, lng } => {
                let outcome = interaction::on_map_clicked(
                    &model.scene,
                    &mut model.markers,
                    &mut model.sidebar,
                    lat,
                    lng,
                );
                outcome != MapClickOutcome::Ignored
            }

            Event::MarkerPinned {
                latlng,
                marker_type,
                data,
            } => {
                interaction::pin_marker(&mut model.markers, latlng, marker_type, data);
                true
            }

            Event::MarkerUnpinned => interaction::unpin_marker(&mut model.markers),

            Event::SidebarToggled => {
                model.sidebar.toggle();
                true
            }

            Event::SidebarClosed => {
                let was_open = model.sidebar.open;
                model.sidebar.close();
                was_open
            }
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            "update"
        );

        if Self::handle(event, model, caps) {
            caps.render.render();
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::from(model)
    }
}
