// WHY: per-template export - every raw line lands in the file of its event identifier
// Groups are written in sorted event-id order, lines in record order

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::mined::MinedRecord;

/// Summary of an export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupExport {
    pub groups_written: usize,
    pub lines_written: u64,
}

/// Group records by event identifier, preserving record order within a group
pub fn group_by_event(records: &[MinedRecord]) -> BTreeMap<&str, Vec<&MinedRecord>> {
    let mut groups: BTreeMap<&str, Vec<&MinedRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.event_id.as_str()).or_default().push(record);
    }
    groups
}

/// File an event group is exported to, `<output_dir>/<event_id>.csv`.
///
/// Path separators in the identifier are replaced so the file always stays
/// directly inside `output_dir`.
pub fn group_file_path(output_dir: &Path, event_id: &str) -> PathBuf {
    let mut name: String = event_id
        .chars()
        .map(|ch| if ch == '/' || ch == '\\' { '_' } else { ch })
        .collect();
    if name.is_empty() || name == "." || name == ".." {
        name = format!("_{name}");
    }
    output_dir.join(format!("{name}.csv"))
}

/// Render one group as headerless single-column CSV
pub fn render_group(records: &[&MinedRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for record in records {
        writer.write_record([record.content.as_str()])?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush group CSV: {}", e.error()))
}

/// Write every event group to its own file under `output_dir`
pub async fn write_event_groups(output_dir: &Path, records: &[MinedRecord]) -> Result<GroupExport> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let groups = group_by_event(records);
    let mut export = GroupExport::default();

    for (event_id, members) in &groups {
        let path = group_file_path(output_dir, event_id);
        let body = render_group(members)?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write group file {}", path.display()))?;

        debug!("Exported {} lines for event {}", members.len(), event_id);
        export.groups_written += 1;
        export.lines_written += members.len() as u64;
    }

    info!(
        "Exported {} event groups ({} lines) to {}",
        export.groups_written,
        export.lines_written,
        output_dir.display()
    );

    Ok(export)
}
