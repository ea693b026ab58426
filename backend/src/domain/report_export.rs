use anyhow::{Context, Result};
use serde::Serialize;
use shared::MonthlyReport;
use tracing::info;

/// A rendered monthly report, ready to be downloaded or written out
#[derive(Debug, Clone, PartialEq)]
pub struct ReportExport {
    pub filename: String,
    pub csv_content: String,
    pub row_count: usize,
}

#[derive(Serialize)]
struct ReportRow<'a> {
    route: &'a str,
    student: &'a str,
    present: usize,
    present_days: String,
    absent: usize,
    absent_days: String,
    incidents: usize,
    frequency: String,
}

pub struct ReportExporter;

impl ReportExporter {
    /// One CSV row per grouped student; routes without students produce no rows
    pub fn to_csv(report: &MonthlyReport) -> Result<ReportExport> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut row_count = 0;

        for group in report.routes.iter().filter(|g| !g.students.is_empty()) {
            for stats in &group.students {
                writer.serialize(ReportRow {
                    route: &group.route_name,
                    student: &stats.student.name,
                    present: stats.present_count,
                    present_days: join_days(&stats.present_days),
                    absent: stats.absent_count,
                    absent_days: join_days(&stats.absent_days),
                    incidents: stats.incident_count,
                    frequency: format!("{:.0}%", stats.frequency_percent),
                })?;
                row_count += 1;
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e))?;
        let csv_content = String::from_utf8(bytes).context("CSV output is not UTF-8")?;
        let filename = format!("monthly_report_{}.csv", report.month);

        info!("Exported {} report rows to {}", row_count, filename);
        Ok(ReportExport {
            filename,
            csv_content,
            row_count,
        })
    }
}

fn join_days(days: &[u32]) -> String {
    days.iter()
        .map(|day| day.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
