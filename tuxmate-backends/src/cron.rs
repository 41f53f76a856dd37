//! Cron adapter: tasks live as metadata/schedule line pairs inside the
//! user's crontab. The crontab may hold entries this scheduler does not
//! own; those lines pass through every rewrite untouched and in order.
//! Mutations always run a full read → edit → whole-file install cycle so
//! no partial state is ever visible to a concurrent crontab reader.

use std::{env, fs, io, time::Duration};

use chrono::Local;
use log::debug;
use uuid::Uuid;

use tuxmate_models::{
    core::ScheduledTask,
    errors::{Result, SchedulerError},
};
use tuxmate_utilities::process::{self, CommandOutput, ProcessError};

use crate::{interfaces::SchedulerBackend, mappers};

const CRONTAB_TIMEOUT: Duration = Duration::from_secs(10);

pub struct CronBackend;

impl CronBackend {
    pub fn new() -> Self {
        CronBackend
    }

    /// Reads the current crontab as a line sequence. A missing crontab
    /// is an empty one, not an error.
    fn read_lines(&self) -> Result<Vec<String>> {
        let output = run_crontab(&["-l"], "crontab-read")?;
        if output.success {
            if output.stdout.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(output.stdout.split('\n').map(str::to_string).collect());
        }
        if output.stderr.contains("no crontab") {
            return Ok(Vec::new());
        }
        Err(crontab_failure("crontab-read", &output))
    }

    /// Replaces the whole crontab with `lines` in one installation step,
    /// via a uniquely named temp file handed to `crontab`.
    fn install_lines(&self, lines: &[String]) -> Result<()> {
        let mut body = lines.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }

        let temp_path = env::temp_dir().join(format!("tuxmate-crontab-{}.tmp", Uuid::new_v4()));
        fs::write(&temp_path, &body).map_err(|err| io_failure("crontab-write-temp", err))?;

        let path_arg = temp_path.to_string_lossy().to_string();
        let result = run_crontab(&[path_arg.as_str()], "crontab-install");
        if let Err(err) = fs::remove_file(&temp_path) {
            debug!("could not remove temp crontab {}: {}", temp_path.display(), err);
        }

        let output = result?;
        if output.success {
            Ok(())
        } else {
            Err(crontab_failure("crontab-install", &output))
        }
    }
}

impl Default for CronBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBackend for CronBackend {
    fn list(&self) -> Result<Vec<ScheduledTask>> {
        Ok(tasks_from_lines(&self.read_lines()?))
    }

    fn add(&self, task: &ScheduledTask, command: &str) -> Result<()> {
        let mut lines = self.read_lines()?;
        append_pair(&mut lines, task, command)?;
        self.install_lines(&lines)
    }

    fn remove(&self, id: &str) -> Result<()> {
        let lines = self.read_lines()?;
        let remaining = remove_pair(&lines, id)?;
        self.install_lines(&remaining)
    }

    fn toggle(&self, id: &str) -> Result<()> {
        let lines = self.read_lines()?;
        let flipped = toggle_pair(&lines, id)?;
        self.install_lines(&flipped)
    }
}

/// Sequential scan: a marker line plus the line below it form one task.
/// Anything else (including malformed pairs) is left alone.
fn tasks_from_lines(lines: &[String]) -> Vec<ScheduledTask> {
    let mut tasks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let Some(meta) = mappers::parse_metadata_line(&lines[i]) else {
            i += 1;
            continue;
        };
        let Some(schedule) = lines.get(i + 1).and_then(|l| mappers::parse_schedule_line(l))
        else {
            debug!("marker line for '{}' has no parsable schedule, skipping", meta.id);
            i += 1;
            continue;
        };

        tasks.push(ScheduledTask {
            id: meta.id,
            task_type: meta.task_type,
            name: meta.name,
            description: meta.description,
            day_of_week: schedule.day_of_week,
            hour: schedule.hour,
            minute: schedule.minute,
            enabled: schedule.enabled,
            created_at: Local::now(),
        });
        i += 2;
    }
    tasks
}

/// Appends the metadata/schedule pair for a new task, rejecting an id
/// that is already present.
fn append_pair(lines: &mut Vec<String>, task: &ScheduledTask, command: &str) -> Result<()> {
    if find_metadata_index(lines, &task.id).is_some() {
        return Err(SchedulerError::validation(
            "id",
            format!("a task with id '{}' is already scheduled", task.id),
        ));
    }

    // Tasks are always created enabled, whatever the payload said.
    let mut created = task.clone();
    created.enabled = true;

    lines.push(mappers::metadata_line(&created));
    lines.push(mappers::schedule_line(&created, command));
    Ok(())
}

/// Drops the metadata line for `id` and its paired schedule line,
/// keeping every other line byte-identical.
fn remove_pair(lines: &[String], id: &str) -> Result<Vec<String>> {
    let index = find_metadata_index(lines, id).ok_or_else(|| not_found(id))?;

    let mut remaining = Vec::with_capacity(lines.len().saturating_sub(2));
    for (i, line) in lines.iter().enumerate() {
        if i == index || i == index + 1 {
            continue;
        }
        remaining.push(line.clone());
    }
    Ok(remaining)
}

/// Flips the disable prefix on the schedule line paired with `id`.
fn toggle_pair(lines: &[String], id: &str) -> Result<Vec<String>> {
    let index = find_metadata_index(lines, id).ok_or_else(|| not_found(id))?;
    let schedule_index = index + 1;
    if schedule_index >= lines.len() {
        return Err(not_found(id));
    }

    let mut flipped = lines.to_vec();
    let current = &lines[schedule_index];
    flipped[schedule_index] = if current.trim_start().starts_with('#') {
        mappers::enable_schedule_line(current)
    } else {
        mappers::disable_schedule_line(current)
    };
    Ok(flipped)
}

fn find_metadata_index(lines: &[String], id: &str) -> Option<usize> {
    lines
        .iter()
        .position(|line| mappers::parse_metadata_line(line).is_some_and(|meta| meta.id == id))
}

fn not_found(id: &str) -> SchedulerError {
    SchedulerError::NotFound(id.to_string())
}

fn run_crontab(args: &[&str], step: &str) -> Result<CommandOutput> {
    process::run_with_timeout("crontab", args, CRONTAB_TIMEOUT).map_err(|err| match err {
        ProcessError::TimedOut { command, timeout } => SchedulerError::Timeout { command, timeout },
        other => SchedulerError::persistence(step, other),
    })
}

fn crontab_failure(step: &str, output: &CommandOutput) -> SchedulerError {
    let stderr = output.stderr.to_lowercase();
    if stderr.contains("not allowed") || stderr.contains("permission denied") {
        SchedulerError::Permission(output.stderr.clone())
    } else {
        SchedulerError::persistence(step, &output.stderr)
    }
}

fn io_failure(step: &str, err: io::Error) -> SchedulerError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        SchedulerError::Permission(err.to_string())
    } else {
        SchedulerError::persistence(step, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn weekly_update() -> ScheduledTask {
        ScheduledTask {
            id: "upd1".to_string(),
            task_type: "MisesAJour".to_string(),
            name: "Weekly Update".to_string(),
            description: String::new(),
            day_of_week: 1,
            hour: 3,
            minute: 30,
            enabled: true,
            created_at: Local::now(),
        }
    }

    fn foreign_lines() -> Vec<String> {
        vec![
            "MAILTO=admin@example.org".to_string(),
            "0 4 * * * /usr/local/bin/backup.sh".to_string(),
            String::new(),
            "# hand-written note, keep me".to_string(),
        ]
    }

    #[test]
    fn add_appends_marker_then_schedule() {
        let mut lines = foreign_lines();
        append_pair(&mut lines, &weekly_update(), "tuxmate-run updates").unwrap();

        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines[4],
            "# TUXMATE: id=upd1 type=MisesAJour nom=Weekly_Update desc="
        );
        assert_eq!(lines[5], "30 3 * * 1 tuxmate-run updates");
    }

    #[test]
    fn add_ignores_requested_disabled_state() {
        let mut task = weekly_update();
        task.enabled = false;
        let mut lines = Vec::new();
        append_pair(&mut lines, &task, "tuxmate-run updates").unwrap();

        let tasks = tasks_from_lines(&lines);
        assert!(tasks[0].enabled);
    }

    #[test]
    fn duplicate_id_is_rejected_before_writing() {
        let mut lines = Vec::new();
        append_pair(&mut lines, &weekly_update(), "tuxmate-run updates").unwrap();
        let before = lines.clone();

        let err = append_pair(&mut lines, &weekly_update(), "tuxmate-run updates").unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(lines, before);
    }

    #[test]
    fn list_round_trips_added_task() {
        let mut lines = foreign_lines();
        append_pair(&mut lines, &weekly_update(), "tuxmate-run updates").unwrap();

        let tasks = tasks_from_lines(&lines);
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.id, "upd1");
        assert_eq!(task.task_type, "MisesAJour");
        assert_eq!(task.name, "Weekly Update");
        assert_eq!(
            (task.day_of_week, task.hour, task.minute),
            (1, 3, 30)
        );
        assert!(task.enabled);
    }

    #[test]
    fn toggle_twice_restores_original_line() {
        let mut lines = foreign_lines();
        append_pair(&mut lines, &weekly_update(), "tuxmate-run updates").unwrap();

        let disabled = toggle_pair(&lines, "upd1").unwrap();
        assert_eq!(disabled[5], "# 30 3 * * 1 tuxmate-run updates");
        assert!(!tasks_from_lines(&disabled)[0].enabled);

        let restored = toggle_pair(&disabled, "upd1").unwrap();
        assert_eq!(restored, lines);
    }

    #[test]
    fn remove_drops_both_lines_and_nothing_else() {
        let mut lines = foreign_lines();
        append_pair(&mut lines, &weekly_update(), "tuxmate-run updates").unwrap();

        let remaining = remove_pair(&lines, "upd1").unwrap();
        assert_eq!(remaining, foreign_lines());
        assert!(!remaining.iter().any(|l| l.contains("upd1")));
    }

    #[test]
    fn mutations_preserve_foreign_lines_byte_for_byte() {
        let mut lines = foreign_lines();
        append_pair(&mut lines, &weekly_update(), "tuxmate-run updates").unwrap();
        let toggled = toggle_pair(&lines, "upd1").unwrap();
        let remaining = remove_pair(&toggled, "upd1").unwrap();

        assert_eq!(&lines[..4], foreign_lines().as_slice());
        assert_eq!(&toggled[..4], foreign_lines().as_slice());
        assert_eq!(remaining, foreign_lines());
    }

    #[test]
    fn remove_and_toggle_report_unknown_id() {
        let lines = foreign_lines();
        assert_eq!(remove_pair(&lines, "ghost").unwrap_err().kind(), "not_found");
        assert_eq!(toggle_pair(&lines, "ghost").unwrap_err().kind(), "not_found");
    }

    #[test]
    fn list_skips_marker_without_schedule() {
        let lines = vec![
            "# TUXMATE: id=lonely type=Rapport nom=Solo desc=".to_string(),
            "not a cron line".to_string(),
        ];
        assert!(tasks_from_lines(&lines).is_empty());
    }
}
