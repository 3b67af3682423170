use std::sync::Arc;

use audio_core::AudioProcessor;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) processor: Arc<dyn AudioProcessor>,
}
