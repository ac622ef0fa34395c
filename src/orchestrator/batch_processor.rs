//! 批量审计处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量审计任务的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：检查配置、写日志表头、创建模型网关与文本提取器
//! 2. **批量加载**：扫描并加载所有审计任务（`Vec<AuditJob>`）
//! 3. **并发控制**：使用 Semaphore 限制同时运行的任务数
//! 4. **报告输出**：每个任务完成后写出 Markdown + JSON 报告
//! 5. **全局统计**：汇总所有任务的处理结果
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个题目的细节
//! - **资源所有者**：唯一持有模型网关的模块
//! - **向下委托**：委托 audit_processor 处理单次审计

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{Extractor, OpenAiGateway};
use crate::models::{load_all_jobs, AuditJob};
use crate::orchestrator::audit_processor::{AuditInputs, AuditProcessor};
use crate::services::{ReportPaths, ReportWriter};
use crate::utils::logging::{
    append_log_line, init_log_file, log_jobs_loaded, log_startup, print_final_stats,
};

type Processor = AuditProcessor<OpenAiGateway, Extractor>;

/// 应用主结构
pub struct App {
    config: Config,
    processor: Arc<Processor>,
    writer: Arc<ReportWriter>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;

        init_log_file(&config.output_log_file)?;
        log_startup(&config);

        let gateway = OpenAiGateway::new(&config);
        let extractor = Extractor::from_config(&config)?;
        if matches!(extractor, Extractor::Remote(_)) {
            info!("📡 使用远程文本提取服务");
        }

        let processor = AuditProcessor::new(gateway, extractor, config.clone());
        let writer = ReportWriter::new(&config.output_folder);

        Ok(Self {
            config,
            processor: Arc::new(processor),
            writer: Arc::new(writer),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        info!("\n📁 正在扫描审计任务...");
        let jobs = load_all_jobs(&self.config.jobs_folder).await?;

        if jobs.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML文件，程序结束");
            return Ok(());
        }

        log_jobs_loaded(jobs.len(), self.config.max_concurrent_jobs);

        let stats = self.process_all_jobs(jobs).await?;

        print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(())
    }

    /// 并发处理所有任务
    async fn process_all_jobs(&self, jobs: Vec<AuditJob>) -> Result<ProcessingStats> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_jobs.max(1)));
        let mut stats = ProcessingStats {
            total: jobs.len(),
            ..Default::default()
        };

        let mut handles = Vec::new();
        for (idx, job) in jobs.into_iter().enumerate() {
            let job_index = idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;
            let processor = Arc::clone(&self.processor);
            let writer = Arc::clone(&self.writer);

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = process_job(&processor, &writer, &job).await;
                if let Err(e) = &result {
                    error!("[任务 {}] ❌ {} 处理失败: {}", job_index, job.meta.name, e);
                }
                (job.meta.name, result)
            });
            handles.push((job_index, handle));
        }

        for (job_index, handle) in handles {
            let line = match handle.await {
                Ok((name, Ok(paths))) => {
                    stats.success += 1;
                    info!("[任务 {}] ✓ 报告已写入: {}", job_index, paths.markdown.display());
                    format!("✓ {} → {}", name, paths.markdown.display())
                }
                Ok((name, Err(e))) => {
                    stats.failed += 1;
                    format!("❌ {}: {}", name, e)
                }
                Err(e) => {
                    stats.failed += 1;
                    error!("[任务 {}] 任务执行失败: {}", job_index, e);
                    format!("❌ 任务 {}: {}", job_index, e)
                }
            };

            if let Err(e) = append_log_line(&self.config.output_log_file, &line) {
                warn!("⚠️ 写入日志文件失败: {}", e);
            }
        }

        Ok(stats)
    }
}

/// 处理单个审计任务：读取文档 → 审计 → 写报告
async fn process_job(
    processor: &Processor,
    writer: &ReportWriter,
    job: &AuditJob,
) -> AppResult<ReportPaths> {
    info!("📄 开始处理任务: {} ({})", job.meta.name, job.meta.describe());

    let inputs = AuditInputs {
        meta: job.meta.clone(),
        exam: Some(read_bytes(&job.exam).await?),
        policy: read_optional(job.policy.as_deref()).await?,
        book: read_optional(job.book.as_deref()).await?,
        pages: job.pages,
    };

    let report = processor.run(&inputs).await?;
    writer.write(&report).await
}

async fn read_bytes(path: &Path) -> AppResult<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))
}

async fn read_optional(path: Option<&Path>) -> AppResult<Option<Vec<u8>>> {
    match path {
        Some(p) => Ok(Some(read_bytes(p).await?)),
        None => Ok(None),
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    success: usize,
    failed: usize,
    total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_spawnable<T: std::future::Future + Send + 'static>(_: &T) {}

    #[test]
    fn test_app_run_can_be_spawned() {
        // 只做类型检查：整个运行过程必须能交给 tokio::spawn
        fn check(app: Arc<App>) {
            let fut = async move { app.run().await };
            assert_spawnable(&fut);
        }
        let _ = check;
    }

    #[tokio::test]
    async fn test_missing_exam_file_is_reported() {
        let processor = AuditProcessor::new(
            OpenAiGateway::new(&Config::default()),
            Extractor::Plain(Default::default()),
            Config::default(),
        );
        let writer = ReportWriter::new(std::env::temp_dir());
        let job = crate::models::loaders::toml_loader::parse_audit_job(
            "name = \"x\"\nexam = \"/definitely/not/here.txt\"",
        )
        .unwrap();

        let err = process_job(&processor, &writer, &job).await.unwrap_err();
        assert!(matches!(err, AppError::File(_)));
    }
}
