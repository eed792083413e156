//! Rendering of lifecycle reports

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::lifecycle::ImageLifecycleReport;

const HEADERS: [&str; 5] = ["IMAGE", "VERSION", "LATEST", "STATUS", "REGISTRY"];

/// Render reports as an aligned text table
pub fn render_table(reports: &[ImageLifecycleReport]) -> String {
    let rows: Vec<[String; 5]> = reports
        .iter()
        .map(|report| {
            [
                report.image.full_path.clone(),
                report.image.version_label().to_string(),
                report.latest_version.clone().unwrap_or_else(|| "-".to_string()),
                report.status.as_str().to_uppercase(),
                report.registry.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &HEADERS.map(str::to_string), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    images: &'a [ImageLifecycleReport],
}

/// Render reports as pretty-printed JSON stamped with `generated_at`
pub fn render_json(
    reports: &[ImageLifecycleReport],
    generated_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport {
        generated_at,
        images: reports,
    })
}
