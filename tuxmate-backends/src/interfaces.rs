use tuxmate_models::{core::ScheduledTask, errors::Result};

/// Narrow seam between the scheduler façade and one OS scheduling
/// mechanism. The façade never sees encoding details; a third backend is
/// a new implementation of this trait and nothing else.
///
/// All calls are synchronous and blocking; the persisted representation
/// (job-table lines or unit-file pair) is the sole source of truth and
/// every call re-derives state from it.
pub trait SchedulerBackend {
    /// Reconstructs all managed tasks from persisted state. Pure read;
    /// never mutates the store.
    fn list(&self) -> Result<Vec<ScheduledTask>>;

    /// Persists a new task in the enabled state. `command` is the
    /// external command mapped from the task type by the façade.
    fn add(&self, task: &ScheduledTask, command: &str) -> Result<()>;

    /// Deletes the task with this id, erasing every backend artifact
    /// that references it.
    fn remove(&self, id: &str) -> Result<()>;

    /// Flips the task between enabled and disabled.
    fn toggle(&self, id: &str) -> Result<()>;
}
