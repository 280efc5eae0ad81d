use tokio::sync::broadcast;

const ERROR_CHANNEL_CAPACITY: usize = 32;

/// Transient user-visible notifications (snackbars, toasts).
#[derive(Debug, Clone)]
pub struct ErrorChannel {
    tx: broadcast::Sender<String>,
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Publishes a message. Messages emitted with no subscriber are dropped.
    pub fn emit(&self, message: impl Into<String>) {
        let message = message.into();
        if self.tx.send(message.clone()).is_err() {
            log::debug!("no subscriber for error message: {}", message);
        }
    }
}
