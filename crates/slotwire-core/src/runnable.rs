//! Start/stop hooks collected into a reserved group.

use std::fmt;
use std::sync::Arc;

use slotwire_common::error::BoxError;

type Hook = Arc<dyn Fn() -> std::result::Result<(), BoxError> + Send + Sync>;

/// A pair of start and stop hooks.
///
/// Every declaration producing a `Runnable` contributes to the
/// `slotwire_runnable` collector group. Running the hooks in order is left
/// to the caller.
#[derive(Clone)]
pub struct Runnable {
    on_start: Option<Hook>,
    on_stop: Option<Hook>,
}

impl Runnable {
    /// Creates a runnable with no hooks.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            on_start: None,
            on_stop: None,
        }
    }

    /// Sets the start hook.
    #[must_use]
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Sets the stop hook.
    #[must_use]
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_stop = Some(Arc::new(hook));
        self
    }

    /// Runs the start hook, if any.
    ///
    /// # Errors
    ///
    /// Returns whatever the hook returns.
    pub fn start(&self) -> std::result::Result<(), BoxError> {
        self.on_start.as_ref().map_or(Ok(()), |hook| hook())
    }

    /// Runs the stop hook, if any.
    ///
    /// # Errors
    ///
    /// Returns whatever the hook returns.
    pub fn stop(&self) -> std::result::Result<(), BoxError> {
        self.on_stop.as_ref().map_or(Ok(()), |hook| hook())
    }
}

impl Default for Runnable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runnable")
            .field("on_start", &self.on_start.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}
