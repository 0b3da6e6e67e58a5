use std::sync::{Arc, Mutex};
use tracing::error;

/// Single user-visible error message. Last error wins; reading clears it.
#[derive(Clone, Debug, Default)]
pub struct ErrorSlot {
    message: Arc<Mutex<Option<String>>>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        if let Ok(mut slot) = self.message.lock() {
            *slot = Some(message);
        }
    }

    pub fn take(&self) -> Option<String> {
        self.message.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn is_empty(&self) -> bool {
        self.message.lock().map(|slot| slot.is_none()).unwrap_or(true)
    }
}
