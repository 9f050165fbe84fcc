use relay::engine::Engine;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn Engine>,
    /// Frames buffered between the engine and a slow client
    pub stream_buffer: usize,
}
