//! Capability detection: which scheduling mechanisms are usable on this
//! host, and which one to pick. Probes never mutate anything and are
//! bounded by a short timeout.

use std::time::Duration;

use log::debug;
use serde::Serialize;

use tuxmate_utilities::process;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The scheduling mechanism a backend adapter drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Systemd,
    Cron,
}

#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub systemd_available: bool,
    pub cron_available: bool,
}

/// Pure selection policy over the two capability booleans. systemd wins
/// when present (calendar recurrence, catches up on firings missed while
/// the host was off); cron is the fallback. Adding a backend extends
/// this match, nothing else.
pub fn recommend(caps: &Capabilities) -> Option<BackendKind> {
    match (caps.systemd_available, caps.cron_available) {
        (true, _) => Some(BackendKind::Systemd),
        (false, true) => Some(BackendKind::Cron),
        (false, false) => None,
    }
}

/// Probes the host. A probe that fails to spawn counts as unavailable.
pub fn detect() -> Capabilities {
    let systemd_available = probe("systemctl", &["--user", "status"]);
    let cron_available = probe("which", &["crontab"]);
    debug!(
        "capabilities: systemd={} cron={}",
        systemd_available, cron_available
    );
    Capabilities {
        systemd_available,
        cron_available,
    }
}

fn probe(program: &str, args: &[&str]) -> bool {
    process::run_with_timeout(program, args, PROBE_TIMEOUT)
        .map(|output| output.success)
        .unwrap_or(false)
}

/// Wire shape of the `detect` CLI action.
#[derive(Debug, Serialize)]
pub struct DetectionReport {
    #[serde(rename = "systemd_disponible")]
    pub systemd_available: bool,
    #[serde(rename = "cron_disponible")]
    pub cron_available: bool,
    #[serde(rename = "recommande")]
    pub recommended: &'static str,
    pub success: bool,
}

impl From<&Capabilities> for DetectionReport {
    fn from(caps: &Capabilities) -> Self {
        let recommended = match recommend(caps) {
            Some(BackendKind::Systemd) => "systemd",
            Some(BackendKind::Cron) => "cron",
            None => "aucun",
        };
        DetectionReport {
            systemd_available: caps.systemd_available,
            cron_available: caps.cron_available,
            recommended,
            success: caps.systemd_available || caps.cron_available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(systemd: bool, cron: bool) -> Capabilities {
        Capabilities {
            systemd_available: systemd,
            cron_available: cron,
        }
    }

    #[test]
    fn selection_covers_all_four_combinations() {
        assert_eq!(recommend(&caps(true, true)), Some(BackendKind::Systemd));
        assert_eq!(recommend(&caps(true, false)), Some(BackendKind::Systemd));
        assert_eq!(recommend(&caps(false, true)), Some(BackendKind::Cron));
        assert_eq!(recommend(&caps(false, false)), None);
    }

    #[test]
    fn report_carries_wire_keys() {
        let report = DetectionReport::from(&caps(false, true));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["systemd_disponible"], false);
        assert_eq!(json["cron_disponible"], true);
        assert_eq!(json["recommande"], "cron");
        assert_eq!(json["success"], true);
    }

    #[test]
    fn no_mechanism_reports_failure() {
        let report = DetectionReport::from(&caps(false, false));
        assert_eq!(report.recommended, "aucun");
        assert!(!report.success);
    }
}
