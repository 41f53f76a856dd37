//! The fixed task-type → external-command mapping. The scheduler never
//! inspects these collaborators; it only knows what to invoke. A new
//! task type is one table entry.

const COMMANDS: &[(&str, &str)] = &[
    ("MisesAJour", "tuxmate-run updates"),
    ("Nettoyage", "tuxmate-run cleanup"),
    ("Rapport", "tuxmate-run report"),
];

/// Command to schedule for a task type. Unknown tags fall through to the
/// generic runner so the type stays open-ended.
pub fn command_for(task_type: &str) -> String {
    COMMANDS
        .iter()
        .find(|(tag, _)| *tag == task_type)
        .map(|(_, command)| (*command).to_string())
        .unwrap_or_else(|| format!("tuxmate-run {}", task_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_map_to_their_runner() {
        assert_eq!(command_for("MisesAJour"), "tuxmate-run updates");
        assert_eq!(command_for("Nettoyage"), "tuxmate-run cleanup");
        assert_eq!(command_for("Rapport"), "tuxmate-run report");
    }

    #[test]
    fn unknown_tag_falls_through_to_generic_runner() {
        assert_eq!(command_for("Sauvegarde"), "tuxmate-run Sauvegarde");
    }
}
