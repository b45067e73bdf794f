//! Plain-text export of the render buffer.

use crate::buffer::LogRecord;
use crate::error::Result;
use crate::protocol::TaskId;
use chrono::{DateTime, Local};

const SEPARATOR_WIDTH: usize = 50;

/// A rendered export artifact. The caller decides where it goes (download,
/// clipboard, disk); this component only produces the bytes and a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExport {
    /// `task_{id}_logs_{unix_millis}.txt`
    pub file_name: String,
    pub contents: String,
}

/// Render the buffered records into the console's export layout: a task
/// header, the export timestamp, a separator rule, then one line per record
/// with any `extra` payload as compact JSON indented underneath.
pub fn render_export(
    task_id: TaskId,
    records: &[LogRecord],
    exported_at: DateTime<Local>,
) -> Result<LogExport> {
    let mut lines: Vec<String> = Vec::with_capacity(records.len() + 4);
    lines.push(format!("Task logs #{task_id}"));
    lines.push(format!(
        "Exported at: {}",
        exported_at.format("%Y-%m-%d %H:%M:%S")
    ));
    lines.push("=".repeat(SEPARATOR_WIDTH));
    lines.push(String::new());

    for record in records {
        let mut line = format!(
            "[{}] [{}] {}",
            record.received_at.format("%H:%M:%S"),
            record.level.label(),
            record.message
        );
        if !record.extra.is_empty() {
            line.push_str("\n  ");
            line.push_str(&serde_json::to_string(&record.extra)?);
        }
        lines.push(line);
    }

    Ok(LogExport {
        file_name: format!(
            "task_{task_id}_logs_{}.txt",
            exported_at.timestamp_millis()
        ),
        // Every line carries its terminator, the last one included.
        contents: format!("{}\n", lines.join("\n")),
    })
}
