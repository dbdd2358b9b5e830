//! CLI command implementations.

pub mod clear;
pub mod compact;
pub mod enqueue;
pub mod inspect;
pub mod list;
pub mod process;
pub mod retry;

use driftq_core::{Priority, SyncAction, SyncStatus};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Parses a snake_case status name.
pub(crate) fn parse_status(name: &str) -> Result<SyncStatus, Box<dyn std::error::Error>> {
    SyncStatus::ALL
        .into_iter()
        .find(|status| status.as_str() == name)
        .ok_or_else(|| format!("unknown status: {name}").into())
}

/// Parses a priority name.
pub(crate) fn parse_priority(name: &str) -> Result<Priority, Box<dyn std::error::Error>> {
    match name {
        "low" => Ok(Priority::Low),
        "normal" => Ok(Priority::Normal),
        "high" => Ok(Priority::High),
        "critical" => Ok(Priority::Critical),
        other => Err(format!("unknown priority: {other}").into()),
    }
}

/// Parses an action name.
pub(crate) fn parse_action(name: &str) -> Result<SyncAction, Box<dyn std::error::Error>> {
    match name {
        "create" => Ok(SyncAction::Create),
        "update" => Ok(SyncAction::Update),
        "delete" => Ok(SyncAction::Delete),
        "bulk_create" => Ok(SyncAction::BulkCreate),
        "bulk_update" => Ok(SyncAction::BulkUpdate),
        "bulk_delete" => Ok(SyncAction::BulkDelete),
        "upsert" => Ok(SyncAction::Upsert),
        other => Err(format!("unknown action: {other}").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names() {
        assert_eq!(parse_status("in_progress").unwrap(), SyncStatus::InProgress);
        assert_eq!(parse_priority("critical").unwrap(), Priority::Critical);
        assert_eq!(parse_action("bulk_delete").unwrap(), SyncAction::BulkDelete);
    }

    #[test]
    fn rejects_unknown_names() {
        assert!(parse_status("nope").is_err());
        assert!(parse_priority("urgent").is_err());
        assert!(parse_action("destroy").is_err());
    }
}
