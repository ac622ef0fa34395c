//! 报告写入服务 - 业务能力层
//!
//! 只负责把 `AuditReport` 写成文件（Markdown + JSON），不关心流程

use std::path::PathBuf;

use tokio::fs;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::AuditReport;

/// 写出的文件路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub markdown: PathBuf,
    pub json: PathBuf,
}

/// 报告写入服务
///
/// 职责：
/// - 渲染 Markdown 报告（题目表、统计表、总评）
/// - 写出 JSON 报告供下游渲染服务使用
/// - 不修改报告内容
pub struct ReportWriter {
    output_folder: PathBuf,
}

impl ReportWriter {
    pub fn new(output_folder: impl Into<PathBuf>) -> Self {
        Self {
            output_folder: output_folder.into(),
        }
    }

    /// 写出 `<name>.md` 与 `<name>.json`
    pub async fn write(&self, report: &AuditReport) -> AppResult<ReportPaths> {
        fs::create_dir_all(&self.output_folder)
            .await
            .map_err(|e| AppError::file_write_failed(self.output_folder.display().to_string(), e))?;

        let stem = file_stem(&report.meta.name);
        let paths = ReportPaths {
            markdown: self.output_folder.join(format!("{}.md", stem)),
            json: self.output_folder.join(format!("{}.json", stem)),
        };

        let markdown = render_markdown(report);
        fs::write(&paths.markdown, markdown)
            .await
            .map_err(|e| AppError::file_write_failed(paths.markdown.display().to_string(), e))?;

        let json = serde_json::to_string_pretty(report).map_err(|e| {
            AppError::file_write_failed(
                paths.json.display().to_string(),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        fs::write(&paths.json, json)
            .await
            .map_err(|e| AppError::file_write_failed(paths.json.display().to_string(), e))?;

        debug!(
            "报告已写入: {} / {}",
            paths.markdown.display(),
            paths.json.display()
        );
        Ok(paths)
    }
}

/// 报告名 → 安全的文件名
fn file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "audit_report".to_string()
    } else {
        cleaned
    }
}

/// 表格单元格中不能出现换行和竖线
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// 渲染 Markdown 报告
pub fn render_markdown(report: &AuditReport) -> String {
    let mut out = String::new();
    let meta = &report.meta;

    out.push_str(&format!("# Exam audit: {}\n\n", meta.name));
    out.push_str(&format!("- {}\n", meta.describe()));
    out.push_str(&format!("- Generated at: {}\n\n", report.generated_at));

    out.push_str("## Item analysis\n\n");
    out.push_str("| # | Objective | Level | Marks | Note type | Note | Suggested edit |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    for r in &report.records {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            r.ordinal,
            cell(&r.learning_objective),
            r.assessment_objective,
            r.marks,
            cell(&r.note_type),
            cell(&r.note),
            cell(&r.suggested_edit),
        ));
    }

    out.push_str("\n## Working table\n\n");
    out.push_str("| Item | Value | Status |\n");
    out.push_str("|---|---|---|\n");
    for e in report.working_table.entries() {
        out.push_str(&format!("| {} | {} | {} |\n", e.label, e.value, e.status));
    }

    out.push_str("\n## Summary\n\n");
    out.push_str(report.summary.trim());
    out.push('\n');

    if !report.item_failures.is_empty() {
        out.push_str("\n## Items not analysed\n\n");
        for f in &report.item_failures {
            out.push_str(&format!("- Item {}: {}\n", f.ordinal, cell(&f.reason)));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisRecord, AssessmentObjective, AuditMeta, ItemFailure};
    use crate::services::working_table::aggregate;

    fn sample_report(name: &str) -> AuditReport {
        AuditReport {
            meta: AuditMeta {
                name: name.to_string(),
                subject: "Physics".to_string(),
                ..Default::default()
            },
            records: vec![AnalysisRecord {
                ordinal: 1,
                learning_objective: "Forces".to_string(),
                assessment_objective: AssessmentObjective::A01,
                marks: 1.0,
                note_type: "wording".to_string(),
                note: "ambiguous | unclear\nstem".to_string(),
                suggested_edit: "Define a force.".to_string(),
                classification_reason: "recall".to_string(),
            }],
            working_table: aggregate(&[], &[], &[], false),
            summary: "Short exam.".to_string(),
            item_failures: vec![ItemFailure {
                ordinal: 2,
                reason: "exhausted".to_string(),
            }],
            generated_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_markdown_contains_all_sections() {
        let md = render_markdown(&sample_report("g11 physics"));
        assert!(md.contains("# Exam audit: g11 physics"));
        assert!(md.contains("| 1 | Forces | A01 | 1 | wording | ambiguous \\| unclear stem | Define a force. |"));
        assert!(md.contains("## Working table"));
        assert!(md.contains("Short exam."));
        assert!(md.contains("- Item 2: exhausted"));
    }

    #[test]
    fn test_file_stem_is_sanitized() {
        assert_eq!(file_stem("g11 / final"), "g11___final");
        assert_eq!(file_stem("  "), "audit_report");
        assert_eq!(file_stem("فيزياء-11"), "فيزياء-11");
    }

    #[tokio::test]
    async fn test_write_creates_both_files() {
        let dir = std::env::temp_dir().join(format!("exam_audit_reports_{}", std::process::id()));
        let writer = ReportWriter::new(&dir);
        let paths = writer.write(&sample_report("unit")).await.unwrap();

        let json = tokio::fs::read_to_string(&paths.json).await.unwrap();
        let parsed: AuditReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert!(tokio::fs::metadata(&paths.markdown).await.is_ok());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
