//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use staffdesk_auth::AuthSnapshot;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// One session snapshot flattened for display.
#[derive(Debug, Serialize, Tabled)]
pub struct SnapshotRow {
    /// Status
    status: String,
    /// Loading
    loading: bool,
    /// User
    user: String,
    /// Staff
    staff: bool,
    /// Staff ID
    staff_id: String,
    /// Reply
    reply: bool,
    /// Content
    content: bool,
    /// Meetings
    meetings: bool,
    /// Error
    error: String,
}

impl From<&AuthSnapshot> for SnapshotRow {
    fn from(snapshot: &AuthSnapshot) -> Self {
        let dash = || "-".to_string();
        Self {
            status: snapshot.status.to_string(),
            loading: snapshot.loading,
            user: snapshot.user_id().map(|id| id.to_string()).unwrap_or_else(dash),
            staff: snapshot.is_staff(),
            staff_id: snapshot
                .permissions
                .staff_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(dash),
            reply: snapshot.permissions.can_reply_tickets,
            content: snapshot.permissions.can_manage_content,
            meetings: snapshot.permissions.can_attend_meetings,
            error: snapshot.error.map(|tag| tag.to_string()).unwrap_or_else(dash),
        }
    }
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                let table = Table::new(items).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a session snapshot. JSON output carries the full snapshot, table
/// output the flattened row.
pub fn print_snapshot(snapshot: &AuthSnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Table => print_list(&[SnapshotRow::from(snapshot)], format),
        OutputFormat::Json => print_item(snapshot, format),
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{:#?}", item);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{}:", key), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot_row() {
        let row = SnapshotRow::from(&AuthSnapshot::initial());
        assert_eq!(row.status, "unknown");
        assert!(row.loading);
        assert_eq!(row.user, "-");
        assert!(!row.staff);
        assert_eq!(row.error, "-");
    }
}
