//! Shell capabilities.
//!
//! Rendering uses Crux's built-in `Render`; marker lookups go through
//! `crux_http`, so the shell only needs a generic HTTP executor.
pub use crux_core::render::Render;
pub use crux_http::Http;

// The Effect derive implements `WithContext<App, Effect>` and needs `App` in scope.
#[allow(unused_imports)]
use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
}
