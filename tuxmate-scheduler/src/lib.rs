//! Scheduler façade: one uniform List/Add/Remove/Toggle surface over
//! whichever backend capability detection picked.

pub mod commands;
pub mod detect;

use log::{debug, info};

use tuxmate_backends::{cron::CronBackend, interfaces::SchedulerBackend, systemd::SystemdBackend};
use tuxmate_models::{
    core::ScheduledTask,
    errors::{Result, SchedulerError},
};

use crate::detect::BackendKind;

/// Per task and backend store, a task is Absent, Enabled or Disabled.
/// `add` moves Absent→Enabled, `toggle` flips Enabled↔Disabled, `remove`
/// moves either back to Absent; `list` observes without transitioning.
pub struct Scheduler {
    kind: BackendKind,
    backend: Box<dyn SchedulerBackend>,
}

impl Scheduler {
    /// Detects capabilities once and binds the recommended backend for
    /// the lifetime of this scheduler.
    pub fn from_detection() -> Result<Self> {
        let caps = detect::detect();
        let kind = detect::recommend(&caps).ok_or(SchedulerError::BackendUnavailable)?;
        info!("using {:?} scheduling backend", kind);

        let backend: Box<dyn SchedulerBackend> = match kind {
            BackendKind::Systemd => Box::new(SystemdBackend::new()?),
            BackendKind::Cron => Box::new(CronBackend::new()),
        };
        Ok(Scheduler { kind, backend })
    }

    pub fn with_backend(kind: BackendKind, backend: Box<dyn SchedulerBackend>) -> Self {
        Scheduler { kind, backend }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn list(&self) -> Result<Vec<ScheduledTask>> {
        self.backend.list()
    }

    /// Schedules a new task. Tasks are always created enabled; a payload
    /// asking for a pre-disabled task is accepted but starts enabled
    /// (pending product clarification).
    pub fn add(&self, task: &ScheduledTask) -> Result<()> {
        task.validate()?;
        if !task.enabled {
            debug!(
                "task '{}' requested disabled; it will be created enabled",
                task.id
            );
        }
        let command = commands::command_for(&task.task_type);
        self.backend.add(task, &command)
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        self.backend.remove(id)
    }

    pub fn toggle(&self, id: &str) -> Result<()> {
        self.backend.toggle(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Clone, Default)]
    struct RecordingBackend {
        added: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl SchedulerBackend for RecordingBackend {
        fn list(&self) -> Result<Vec<ScheduledTask>> {
            Ok(Vec::new())
        }

        fn add(&self, task: &ScheduledTask, command: &str) -> Result<()> {
            self.added
                .borrow_mut()
                .push((task.id.clone(), command.to_string()));
            Ok(())
        }

        fn remove(&self, _id: &str) -> Result<()> {
            Ok(())
        }

        fn toggle(&self, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn task() -> ScheduledTask {
        ScheduledTask {
            id: "upd1".to_string(),
            task_type: "Nettoyage".to_string(),
            name: "Cleanup".to_string(),
            description: String::new(),
            day_of_week: 6,
            hour: 9,
            minute: 0,
            enabled: true,
            created_at: Local::now(),
        }
    }

    fn scheduler() -> (Scheduler, RecordingBackend) {
        let backend = RecordingBackend::default();
        (
            Scheduler::with_backend(BackendKind::Cron, Box::new(backend.clone())),
            backend,
        )
    }

    #[test]
    fn add_maps_type_to_command_before_dispatch() {
        let (scheduler, backend) = scheduler();
        scheduler.add(&task()).unwrap();

        assert_eq!(
            *backend.added.borrow(),
            vec![("upd1".to_string(), "tuxmate-run cleanup".to_string())]
        );
    }

    #[test]
    fn add_validates_before_touching_the_backend() {
        let (scheduler, backend) = scheduler();
        let mut bad = task();
        bad.hour = 24;

        let err = scheduler.add(&bad).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(backend.added.borrow().is_empty());
    }
}
