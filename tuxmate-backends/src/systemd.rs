//! systemd adapter: each task is a `tuxmate-<id>.service` /
//! `tuxmate-<id>.timer` pair under the user unit directory. Enablement
//! is always a live `systemctl --user is-enabled` query; unit-file
//! presence alone says nothing about whether the timer will fire.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Local;
use log::{debug, warn};

use tuxmate_models::{
    core::ScheduledTask,
    errors::{Result, SchedulerError},
};
use tuxmate_utilities::process::{self, CommandOutput, ProcessError};

use crate::{interfaces::SchedulerBackend, mappers};

/// Fixed prefix naming every scheduler-owned unit file.
pub const UNIT_PREFIX: &str = "tuxmate-";

const SERVICE_DESCRIPTION_PREFIX: &str = "Tuxmate";
const TYPE_FIELD: &str = "TaskType=";

// Status queries are cheap; enable/start may pull in unit graph work.
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);
const MUTATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Seam over `systemctl --user`; the live implementation shells out,
/// tests substitute a fake.
pub trait UnitManager {
    fn is_enabled(&self, unit: &str) -> Result<bool>;
    fn daemon_reload(&self) -> Result<()>;
    fn enable(&self, unit: &str) -> Result<()>;
    fn disable(&self, unit: &str) -> Result<()>;
    fn start(&self, unit: &str) -> Result<()>;
    fn stop(&self, unit: &str) -> Result<()>;
}

pub struct SystemctlManager;

impl SystemctlManager {
    fn run(&self, args: &[&str], step: &str, timeout: Duration) -> Result<CommandOutput> {
        let mut full = vec!["--user"];
        full.extend_from_slice(args);
        process::run_with_timeout("systemctl", &full, timeout).map_err(|err| match err {
            ProcessError::TimedOut { command, timeout } => {
                SchedulerError::Timeout { command, timeout }
            }
            other => SchedulerError::persistence(step, other),
        })
    }

    fn mutate(&self, verb: &str, unit: &str) -> Result<()> {
        let output = self.run(&[verb, unit], verb, MUTATE_TIMEOUT)?;
        if output.success {
            Ok(())
        } else {
            Err(SchedulerError::persistence(verb, &output.stderr))
        }
    }
}

impl UnitManager for SystemctlManager {
    fn is_enabled(&self, unit: &str) -> Result<bool> {
        // `is-enabled` exits non-zero for a disabled unit; only the
        // printed state matters.
        let output = self.run(&["is-enabled", unit], "is-enabled", QUERY_TIMEOUT)?;
        Ok(output.stdout.trim() == "enabled")
    }

    fn daemon_reload(&self) -> Result<()> {
        let output = self.run(&["daemon-reload"], "daemon-reload", MUTATE_TIMEOUT)?;
        if output.success {
            Ok(())
        } else {
            Err(SchedulerError::persistence("daemon-reload", &output.stderr))
        }
    }

    fn enable(&self, unit: &str) -> Result<()> {
        self.mutate("enable", unit)
    }

    fn disable(&self, unit: &str) -> Result<()> {
        self.mutate("disable", unit)
    }

    fn start(&self, unit: &str) -> Result<()> {
        self.mutate("start", unit)
    }

    fn stop(&self, unit: &str) -> Result<()> {
        self.mutate("stop", unit)
    }
}

pub struct SystemdBackend {
    unit_dir: PathBuf,
    manager: Box<dyn UnitManager>,
}

impl SystemdBackend {
    /// Backend over `~/.config/systemd/user` and the real `systemctl`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            SchedulerError::persistence("resolve-home", "no home directory for current user")
        })?;
        Ok(Self::with_manager(
            home.join(".config").join("systemd").join("user"),
            Box::new(SystemctlManager),
        ))
    }

    pub fn with_manager(unit_dir: PathBuf, manager: Box<dyn UnitManager>) -> Self {
        SystemdBackend { unit_dir, manager }
    }

    fn timer_name(id: &str) -> String {
        format!("{}{}.timer", UNIT_PREFIX, id)
    }

    fn service_name(id: &str) -> String {
        format!("{}{}.service", UNIT_PREFIX, id)
    }

    fn timer_path(&self, id: &str) -> PathBuf {
        self.unit_dir.join(Self::timer_name(id))
    }

    fn service_path(&self, id: &str) -> PathBuf {
        self.unit_dir.join(Self::service_name(id))
    }

    /// Rebuilds one task from its unit pair plus a live enablement
    /// query. `None` means the pair is not something we wrote.
    fn read_task(&self, id: &str) -> Result<Option<ScheduledTask>> {
        let timer_content = fs::read_to_string(self.timer_path(id))
            .map_err(|err| io_failure("read-timer-unit", err))?;
        let service_content = fs::read_to_string(self.service_path(id))
            .map_err(|err| io_failure("read-service-unit", err))?;

        let Some((day_of_week, hour, minute)) = unit_field(&timer_content, "OnCalendar=")
            .and_then(mappers::parse_on_calendar)
        else {
            debug!("timer for '{}' has no parsable OnCalendar, skipping", id);
            return Ok(None);
        };

        let name = unit_field(&service_content, "Description=")
            .and_then(|desc| desc.split_once(" - "))
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| "Tache".to_string());

        // Units written by this build carry the type explicitly; the
        // keyword heuristic only covers pairs from older builds.
        let task_type = unit_field(&service_content, TYPE_FIELD)
            .map(str::to_string)
            .unwrap_or_else(|| infer_type_from_name(&name).to_string());

        let enabled = self.manager.is_enabled(&Self::timer_name(id))?;

        Ok(Some(ScheduledTask {
            id: id.to_string(),
            task_type,
            name,
            // Not stored in the units; documented lossy field.
            description: "managed by systemd timer".to_string(),
            day_of_week,
            hour,
            minute,
            enabled,
            created_at: Local::now(),
        }))
    }
}

impl SchedulerBackend for SystemdBackend {
    fn list(&self) -> Result<Vec<ScheduledTask>> {
        if !self.unit_dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&self.unit_dir).map_err(|err| io_failure("read-unit-dir", err))?;

        let mut tasks = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| io_failure("read-unit-dir", err))?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(id) = file_name
                .strip_prefix(UNIT_PREFIX)
                .and_then(|rest| rest.strip_suffix(".timer"))
            else {
                continue;
            };

            if !self.service_path(id).is_file() {
                debug!("orphaned timer '{}' without service unit, skipping", file_name);
                continue;
            }

            if let Some(task) = self.read_task(id)? {
                tasks.push(task);
            }
        }

        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    fn add(&self, task: &ScheduledTask, command: &str) -> Result<()> {
        fs::create_dir_all(&self.unit_dir).map_err(|err| io_failure("create-unit-dir", err))?;

        if self.timer_path(&task.id).exists() {
            return Err(SchedulerError::validation(
                "id",
                format!("a task with id '{}' is already scheduled", task.id),
            ));
        }

        // Each step is named on failure and already-written files stay
        // in place, so a retry can resume where this stopped.
        fs::write(self.service_path(&task.id), service_unit(task, command))
            .map_err(|err| io_failure("write-service-unit", err))?;
        fs::write(self.timer_path(&task.id), timer_unit(task))
            .map_err(|err| io_failure("write-timer-unit", err))?;

        self.manager.daemon_reload()?;
        self.manager.enable(&Self::timer_name(&task.id))?;
        self.manager.start(&Self::timer_name(&task.id))?;
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        let timer_path = self.timer_path(id);
        let service_path = self.service_path(id);
        if !timer_path.exists() && !service_path.exists() {
            return Err(SchedulerError::NotFound(id.to_string()));
        }

        let timer = Self::timer_name(id);
        if let Err(err) = self.manager.stop(&timer) {
            debug!("stop before removal failed for {}: {}", timer, err);
        }
        if let Err(err) = self.manager.disable(&timer) {
            debug!("disable before removal failed for {}: {}", timer, err);
        }

        remove_if_present(&timer_path)?;
        remove_if_present(&service_path)?;

        self.manager.daemon_reload()
    }

    fn toggle(&self, id: &str) -> Result<()> {
        let timer = Self::timer_name(id);
        if !self.timer_path(id).exists() {
            return Err(SchedulerError::NotFound(id.to_string()));
        }

        if self.manager.is_enabled(&timer)? {
            if let Err(err) = self.manager.stop(&timer) {
                warn!("stop failed while disabling {}: {}", timer, err);
            }
            self.manager.disable(&timer)
        } else {
            self.manager.enable(&timer)?;
            if let Err(err) = self.manager.start(&timer) {
                warn!("start failed after enabling {}: {}", timer, err);
            }
            Ok(())
        }
    }
}

fn service_unit(task: &ScheduledTask, command: &str) -> String {
    format!(
        "[Unit]\n\
         Description={} - {}\n\
         After=network.target\n\
         \n\
         [X-Tuxmate]\n\
         {}{}\n\
         \n\
         [Service]\n\
         Type=oneshot\n\
         ExecStart=/bin/bash -c \"{}\"\n\
         \n\
         [Install]\n\
         WantedBy=default.target\n",
        SERVICE_DESCRIPTION_PREFIX, task.name, TYPE_FIELD, task.task_type, command
    )
}

fn timer_unit(task: &ScheduledTask) -> String {
    // Persistent=true makes a firing missed while the host was off run
    // on next startup.
    format!(
        "[Unit]\n\
         Description={} timer - {}\n\
         \n\
         [Timer]\n\
         OnCalendar={}\n\
         Persistent=true\n\
         \n\
         [Install]\n\
         WantedBy=timers.target\n",
        SERVICE_DESCRIPTION_PREFIX,
        task.name,
        mappers::on_calendar(task.day_of_week, task.hour, task.minute)
    )
}

/// First `Key=value` line in a unit file, value part only.
fn unit_field<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    content
        .lines()
        .find_map(|line| line.trim().strip_prefix(key))
        .map(str::trim)
}

/// Best-effort compatibility shim for unit pairs that predate the
/// explicit TaskType field.
fn infer_type_from_name(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    if lower.contains("nettoyage") || lower.contains("cleanup") {
        "Nettoyage"
    } else if lower.contains("rapport") || lower.contains("report") {
        "Rapport"
    } else {
        "MisesAJour"
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_failure("remove-unit", err)),
    }
}

fn io_failure(step: &str, err: io::Error) -> SchedulerError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        SchedulerError::Permission(err.to_string())
    } else {
        SchedulerError::persistence(step, err)
    }
}
