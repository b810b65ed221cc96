//! Status and error reporting for components that talk to the user.

use tracing::{error, info};

/// Where short user-facing status lines go. Implementations must be
/// callable from any thread.
pub trait StatusSink: Send + Sync {
    fn status(&self, message: &str);
    fn error(&self, message: &str);
}

/// Sends status lines to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn status(&self, message: &str) {
        info!(target: "maildirshell::status", "{message}");
    }

    fn error(&self, message: &str) {
        error!(target: "maildirshell::status", "{message}");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::StatusSink;
    use parking_lot::Mutex;

    /// Records every line for assertions.
    #[derive(Default)]
    pub struct Recorder {
        pub lines: Mutex<Vec<(bool, String)>>,
    }

    impl StatusSink for Recorder {
        fn status(&self, message: &str) {
            self.lines.lock().push((false, message.to_string()));
        }

        fn error(&self, message: &str) {
            self.lines.lock().push((true, message.to_string()));
        }
    }
}
