use crate::models::{AuditMeta, PageRange};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 一个审计任务（来自 TOML 文件）
///
/// ```toml
/// name = "physics-g11-final"
/// subject = "Physics"
/// grade = "11"
/// semester = "1"
/// exam_type = "final"
/// exam = "inputs/exam.txt"
/// policy = "inputs/policy.txt"
/// book = "inputs/book.txt"
/// pages = { start = 1, end = 50 }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AuditJob {
    #[serde(flatten)]
    pub meta: AuditMeta,
    pub exam: PathBuf,
    #[serde(default)]
    pub policy: Option<PathBuf>,
    #[serde(default)]
    pub book: Option<PathBuf>,
    /// 学生用书的页码范围
    #[serde(default)]
    pub pages: Option<PageRange>,
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
}

impl AuditJob {
    /// 相对路径按任务文件所在目录解析
    fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.exam = resolve(self.exam);
        self.policy = self.policy.map(resolve);
        self.book = self.book.map(resolve);
        self
    }
}

/// 从 TOML 文件加载审计任务
pub async fn load_audit_job(toml_file_path: &Path) -> Result<AuditJob> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let job = parse_audit_job(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    let base = toml_file_path.parent().unwrap_or_else(|| Path::new("."));
    let mut job = job.resolve_paths(base);
    job.file_path = Some(toml_file_path.to_path_buf());

    Ok(job)
}

/// 解析任务内容；未填写名称时留空，由调用方用文件名补齐
pub fn parse_audit_job(content: &str) -> Result<AuditJob> {
    let job: AuditJob = toml::from_str(content)?;
    if let Some(pages) = job.pages {
        if pages.start == 0 || pages.end < pages.start {
            anyhow::bail!("页码范围不合法: {}", pages);
        }
    }
    Ok(job)
}

/// 从文件夹中加载所有 TOML 任务，按文件名排序
pub async fn load_all_jobs(folder_path: &str) -> Result<Vec<AuditJob>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut jobs = Vec::new();
    for path in paths {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_audit_job(&path).await {
            Ok(mut job) => {
                if job.meta.name.trim().is_empty() {
                    job.meta.name = path
                        .file_stem()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .to_string();
                }
                jobs.push(job);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_job() {
        let job = parse_audit_job(
            r#"
name = "physics-g11"
subject = "Physics"
grade = "11"
exam = "exam.txt"
book = "book.txt"
pages = { start = 3, end = 9 }
"#,
        )
        .unwrap();

        assert_eq!(job.meta.name, "physics-g11");
        assert_eq!(job.meta.subject, "Physics");
        assert_eq!(job.meta.semester, "");
        assert_eq!(job.exam, PathBuf::from("exam.txt"));
        assert!(job.policy.is_none());
        assert_eq!(job.pages, Some(PageRange::new(3, 9)));
    }

    #[test]
    fn test_reject_inverted_page_range() {
        let result = parse_audit_job(
            r#"
name = "x"
exam = "exam.txt"
pages = { start = 9, end = 3 }
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_exam_is_an_error() {
        assert!(parse_audit_job("name = \"x\"").is_err());
    }

    #[test]
    fn test_relative_paths_resolved_against_job_folder() {
        let job = parse_audit_job("name = \"x\"\nexam = \"exam.txt\"\npolicy = \"/abs/policy.txt\"")
            .unwrap()
            .resolve_paths(Path::new("/jobs"));
        assert_eq!(job.exam, PathBuf::from("/jobs/exam.txt"));
        assert_eq!(job.policy, Some(PathBuf::from("/abs/policy.txt")));
    }

    #[tokio::test]
    async fn test_load_all_jobs_skips_broken_files() {
        let dir = std::env::temp_dir().join(format!("exam_audit_jobs_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("a.toml"), "exam = \"exam.txt\"").await.unwrap();
        tokio::fs::write(dir.join("b.toml"), "this is not toml = = =").await.unwrap();
        tokio::fs::write(dir.join("notes.md"), "ignored").await.unwrap();

        let jobs = load_all_jobs(dir.to_str().unwrap()).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].meta.name, "a");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
