//! Axum router construction.

use axum::{routing::get, Router};
use common::protocol::{AUDIO_PATH, IDENTICONS_PATH, IMAGES_PATH};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with the three media routes attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route(IMAGES_PATH, get(handlers::image))
        .route(AUDIO_PATH, get(handlers::audio))
        .route(IDENTICONS_PATH, get(handlers::identicon))
        .fallback(handlers::not_found)
        .layer(middleware::trace_layer())
        .with_state(state)
}
