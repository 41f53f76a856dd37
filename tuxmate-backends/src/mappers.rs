//! Pure format codecs shared by the backend adapters: crontab
//! metadata/schedule lines and systemd OnCalendar expressions. Nothing
//! here touches the filesystem or spawns a process.

use tuxmate_models::core::ScheduledTask;

/// Marker token opening every scheduler-owned metadata line in the
/// user's crontab. Lines without it are foreign and preserved verbatim.
pub const CRON_MARKER: &str = "# TUXMATE:";

/// Metadata recovered from a crontab marker line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMeta {
    pub id: String,
    pub task_type: String,
    pub name: String,
    pub description: String,
}

/// Schedule fields recovered from the cron line paired with a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleFields {
    pub enabled: bool,
    pub minute: u32,
    pub hour: u32,
    pub day_of_week: i32,
}

/// Renders `# TUXMATE: id=.. type=.. nom=.. desc=..`. Spaces in the
/// display fields become underscores so the line stays space-separated.
pub fn metadata_line(task: &ScheduledTask) -> String {
    format!(
        "{} id={} type={} nom={} desc={}",
        CRON_MARKER,
        task.id,
        task.task_type,
        escape_value(&task.name),
        escape_value(&task.description),
    )
}

pub fn parse_metadata_line(line: &str) -> Option<TaskMeta> {
    let rest = line.trim().strip_prefix(CRON_MARKER)?;

    let mut id = None;
    let mut task_type = None;
    let mut name = None;
    let mut description = None;
    for part in rest.split_whitespace() {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key {
            "id" => id = Some(value.to_string()),
            "type" => task_type = Some(value.to_string()),
            "nom" => name = Some(unescape_value(value)),
            "desc" => description = Some(unescape_value(value)),
            // Unknown keys from newer builds are tolerated.
            _ => {}
        }
    }

    let id = id.filter(|v| !v.is_empty())?;
    Some(TaskMeta {
        id,
        task_type: task_type.unwrap_or_else(|| "MisesAJour".to_string()),
        name: name.unwrap_or_else(|| "Tache".to_string()),
        description: description.unwrap_or_default(),
    })
}

/// Renders the 5-field cron line: `minute hour * * dow command`, with a
/// `# ` prefix when the task is disabled.
pub fn schedule_line(task: &ScheduledTask, command: &str) -> String {
    let dow = if task.day_of_week == -1 {
        "*".to_string()
    } else {
        task.day_of_week.to_string()
    };
    let line = format!("{} {} * * {} {}", task.minute, task.hour, dow, command);
    if task.enabled {
        line
    } else {
        format!("# {}", line)
    }
}

pub fn parse_schedule_line(line: &str) -> Option<ScheduleFields> {
    let trimmed = line.trim();
    let (enabled, body) = match trimmed.strip_prefix('#') {
        Some(rest) => (false, rest.trim_start()),
        None => (true, trimmed),
    };

    let fields: Vec<&str> = body.split_whitespace().collect();
    if fields.len() < 5 {
        return None;
    }

    let minute: u32 = fields[0].parse().ok().filter(|m| *m <= 59)?;
    let hour: u32 = fields[1].parse().ok().filter(|h| *h <= 23)?;
    let day_of_week = if fields[4] == "*" {
        -1
    } else {
        // cron accepts 7 as an alias for Sunday.
        match fields[4].parse::<i32>().ok()? {
            7 => 0,
            d if (0..=6).contains(&d) => d,
            _ => return None,
        }
    };

    Some(ScheduleFields {
        enabled,
        minute,
        hour,
        day_of_week,
    })
}

/// Marks the paired cron line as disabled (no-op if already disabled).
pub fn disable_schedule_line(line: &str) -> String {
    if line.trim_start().starts_with('#') {
        line.to_string()
    } else {
        format!("# {}", line)
    }
}

/// Strips the disable prefix from the paired cron line.
pub fn enable_schedule_line(line: &str) -> String {
    match line.trim_start().strip_prefix('#') {
        Some(rest) => rest.trim_start().to_string(),
        None => line.to_string(),
    }
}

// Sunday-first (our convention) to systemd weekday tokens. systemd
// numbers weekdays Monday-first, so this is a lookup in both directions,
// never an offset.
const WEEKDAY_TOKENS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn weekday_token(day_of_week: i32) -> Option<&'static str> {
    usize::try_from(day_of_week)
        .ok()
        .and_then(|d| WEEKDAY_TOKENS.get(d))
        .copied()
}

pub fn weekday_from_token(token: &str) -> Option<i32> {
    WEEKDAY_TOKENS
        .iter()
        .position(|t| *t == token)
        .map(|p| p as i32)
}

/// Builds the systemd OnCalendar expression: `*-*-* HH:MM:00` for a
/// daily task, `<Tok> *-*-* HH:MM:00` for a weekly one.
pub fn on_calendar(day_of_week: i32, hour: u32, minute: u32) -> String {
    match weekday_token(day_of_week) {
        Some(token) => format!("{} *-*-* {:02}:{:02}:00", token, hour, minute),
        None => format!("*-*-* {:02}:{:02}:00", hour, minute),
    }
}

/// Inverse of [`on_calendar`]. Returns `(day_of_week, hour, minute)`,
/// or `None` for expressions this scheduler never writes.
pub fn parse_on_calendar(expr: &str) -> Option<(i32, u32, u32)> {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    let (day_of_week, time_part) = match parts.as_slice() {
        [_, time] => (-1, *time),
        [token, _, time] => (weekday_from_token(token)?, *time),
        _ => return None,
    };

    let mut clock = time_part.split(':');
    let hour: u32 = clock.next()?.parse().ok().filter(|h| *h <= 23)?;
    let minute: u32 = clock.next()?.parse().ok().filter(|m| *m <= 59)?;
    Some((day_of_week, hour, minute))
}

fn escape_value(value: &str) -> String {
    value.replace(' ', "_")
}

fn unescape_value(value: &str) -> String {
    value.replace('_', " ")
}
