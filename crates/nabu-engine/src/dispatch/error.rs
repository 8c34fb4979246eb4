use thiserror::Error;

/// Failure to hand an action to the designated thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The dispatch loop has stopped; the action was not (and will not be) run.
    #[error("dispatch loop has shut down")]
    Disconnected,
}
