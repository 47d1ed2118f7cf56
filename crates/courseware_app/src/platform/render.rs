use std::collections::HashMap;

use courseware_core::{AppViewModel, JobId, UploadPhase, UploadRowView};

fn phase_label(phase: UploadPhase) -> &'static str {
    match phase {
        UploadPhase::Initiating => "initiating",
        UploadPhase::Uploading => "uploading",
        UploadPhase::Polling => "processing",
        UploadPhase::CreatingRecord => "creating module",
        UploadPhase::Completed => "completed",
        UploadPhase::Failed => "failed",
    }
}

pub fn render_row(row: &UploadRowView) -> String {
    let mut line = format!(
        "[job {}] {:>3}% {:<15} {}",
        row.job_id,
        row.percent,
        phase_label(row.phase),
        row.title
    );
    if !row.message.is_empty() {
        line.push_str(" - ");
        line.push_str(&row.message);
    }
    if let Some(record) = &row.record {
        line.push_str(&format!(" ({record})"));
    }
    line
}

/// Renders only rows whose visible state changed since the last call.
#[derive(Debug, Default)]
pub struct ProgressRenderer {
    last: HashMap<JobId, String>,
}

impl ProgressRenderer {
    pub fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();
        for row in &view.jobs {
            let line = render_row(row);
            if self.last.get(&row.job_id) != Some(&line) {
                self.last.insert(row.job_id, line.clone());
                lines.push(line);
            }
        }
        lines
    }
}
