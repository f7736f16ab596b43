use crate::api::models::{ExtensionStatus, QueueWallboard};
use crate::api::resources::Resource;
use crate::bulk::Selection;

/// What a page shows for its current filter: one row per visible entry.
///
/// Rows carry plain text only; the widgets render them as labels, never as
/// markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: String,
    pub cells: Vec<String>,
    pub checked: bool,
    pub status_class: Option<&'static str>,
}

impl Table {
    pub fn build<R: Resource>(items: &[&R], selection: &Selection) -> Self {
        let rows = items
            .iter()
            .map(|item| Row {
                id: item.id().to_string(),
                cells: item.cells(),
                checked: selection.contains(item.id()),
                status_class: item.status_dot().map(status_class),
            })
            .collect();
        Self { rows }
    }
}

/// CSS class of the presence dot.
pub fn status_class(status: ExtensionStatus) -> &'static str {
    match status {
        ExtensionStatus::Online => "status-online",
        ExtensionStatus::Busy => "status-busy",
        ExtensionStatus::Away => "status-away",
        ExtensionStatus::Offline => "status-offline",
        ExtensionStatus::Unknown => "status-unknown",
    }
}

/// `m:ss`, or `h:mm:ss` past the hour.
pub fn format_duration(secs: u32) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 { format!("{h}:{m:02}:{s:02}") } else { format!("{m}:{s:02}") }
}

/// Counter labels on the supervisor wallboard, in display order.
pub fn wallboard_counters(wb: &QueueWallboard) -> Vec<(&'static str, String)> {
    vec![
        ("Calls waiting", wb.calls_waiting.to_string()),
        ("Available", wb.agents_available.to_string()),
        ("Busy", wb.agents_busy.to_string()),
        ("Paused", wb.agents_paused.to_string()),
        ("Avg wait", format_duration(wb.avg_wait_time)),
        ("Longest wait", format_duration(wb.longest_wait_time)),
        ("Completed", wb.calls_completed.to_string()),
        ("Abandoned", wb.calls_abandoned.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{CallQueue, Extension};

    #[test]
    fn two_queues_render_two_rows() {
        let queues: Vec<CallQueue> = serde_json::from_value(serde_json::json!([
            {"queue_number": "600", "name": "Support", "strategy": "ringall"},
            {"queue_number": "601", "name": "Sales", "strategy": "rrmemory"}
        ]))
        .unwrap();
        let refs: Vec<&CallQueue> = queues.iter().collect();
        let table = Table::build(&refs, &Selection::default());

        assert_eq!(table.rows.len(), 2);
        assert_eq!(&CallQueue::COLUMNS[..3], &["Queue", "Name", "Strategy"]);
        assert_eq!(&table.rows[0].cells[..3], &["600", "Support", "ringall"]);
        assert_eq!(&table.rows[1].cells[..3], &["601", "Sales", "rrmemory"]);
        assert!(CallQueue::PAGE_ACTIONS.contains(&"Apply Configuration"));
    }

    #[test]
    fn checked_rows_and_status_dots() {
        let exts = vec![
            Extension { number: "2001".into(), status: ExtensionStatus::Online, ..Default::default() },
            Extension { number: "2002".into(), ..Default::default() },
        ];
        let refs: Vec<&Extension> = exts.iter().collect();
        let mut sel = Selection::default();
        sel.set("2002", true);
        let table = Table::build(&refs, &sel);

        assert!(!table.rows[0].checked);
        assert!(table.rows[1].checked);
        assert_eq!(table.rows[0].status_class, Some("status-online"));
        assert_eq!(table.rows[1].status_class, Some("status-unknown"));
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(125), "2:05");
        assert_eq!(format_duration(3725), "1:02:05");
    }
}
