//! 单次审计处理器 - 编排层
//!
//! ## 职责
//!
//! 一次运行处理一张试卷：
//! `抽取题目 → (逐题) 检索 → 分类 → 分析 → 条件重新分类 → 汇总 → 统计 → 总评`
//!
//! ## 核心功能
//!
//! 1. **文档准备**：调用文本提取服务，试卷为空时中止，参考文档为空时用空上下文继续
//! 2. **题目抽取**：一次模型调用，抽取结果为空时中止本次运行
//! 3. **逐题并发**：各题互不依赖，`buffer_unordered` 并发执行后按题号归并
//! 4. **失败隔离**：单题重试耗尽时写入占位记录（可配置为中止）
//! 5. **统计与总评**：在完整记录集合上计算统计表并生成总评
//!
//! 结果是一个不可变的 `AuditReport`，由调用方持有。

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, InputError};
use crate::infrastructure::{GenerativeModel, TextExtractor};
use crate::models::exam::RawSummary;
use crate::models::{
    AnalysisRecord, AuditMeta, AuditReport, Document, DocumentRole, ExamItem, ItemFailure,
    PageRange,
};
use crate::services::item_extraction::extract_items;
use crate::services::prompts::{summarize_prompt, SUMMARY_CONTRACT};
use crate::services::working_table::{aggregate, overview};
use crate::services::{DocumentIndex, HeuristicClassifier, StructuredClient};
use crate::workflow::{ItemCtx, ItemFlow, ItemOutcome};

/// 一次运行的输入文档（原始字节）
#[derive(Debug, Clone, Default)]
pub struct AuditInputs {
    pub meta: AuditMeta,
    pub exam: Option<Vec<u8>>,
    pub policy: Option<Vec<u8>>,
    pub book: Option<Vec<u8>>,
    /// 学生用书的页码范围
    pub pages: Option<PageRange>,
}

/// 总评提示词中每道题只保留题号、标签与意见
#[derive(Debug, Serialize)]
struct CompactRecord<'a> {
    ordinal: u32,
    label: &'a str,
    note: &'a str,
}

/// 审计处理器
///
/// 持有模型客户端、文本提取器和分类器；每次 `run` 互不影响，不保存任何会话状态。
pub struct AuditProcessor<M, E> {
    client: StructuredClient<M>,
    extractor: E,
    classifier: HeuristicClassifier,
    config: Config,
}

impl<M: GenerativeModel, E: TextExtractor> AuditProcessor<M, E> {
    pub fn new(model: M, extractor: E, config: Config) -> Self {
        Self {
            client: StructuredClient::from_config(model, &config),
            extractor,
            classifier: HeuristicClassifier::default(),
            config,
        }
    }

    /// 从原始文档字节运行一次审计
    pub async fn run(&self, inputs: &AuditInputs) -> AppResult<AuditReport> {
        let run = inputs.meta.name.as_str();

        let exam_bytes = inputs.exam.as_deref().ok_or(InputError::MissingDocument {
            role: DocumentRole::Exam,
        })?;

        let exam = self.load_document(DocumentRole::Exam, exam_bytes, None).await?;
        if exam.is_empty() {
            error!("[{}] ❌ 试卷没有可用文本", run);
            return Err(AppError::ExtractionEmpty {
                role: DocumentRole::Exam,
            });
        }

        let policy = self
            .load_optional(DocumentRole::Policy, inputs.policy.as_deref(), None, run)
            .await?;
        let book = self
            .load_optional(DocumentRole::Book, inputs.book.as_deref(), inputs.pages, run)
            .await?;

        self.run_documents(&inputs.meta, &exam, &policy, &book).await
    }

    async fn load_document(
        &self,
        role: DocumentRole,
        bytes: &[u8],
        pages: Option<PageRange>,
    ) -> AppResult<Document> {
        let text = self.extractor.extract(bytes, pages).await?;
        Ok(Document::new(role, text))
    }

    /// 可选文档：缺失或为空时使用空上下文
    async fn load_optional(
        &self,
        role: DocumentRole,
        bytes: Option<&[u8]>,
        pages: Option<PageRange>,
        run: &str,
    ) -> AppResult<Document> {
        let Some(bytes) = bytes else {
            info!("[{}] 未提供 {}，使用空上下文", run, role);
            return Ok(Document::empty(role));
        };

        let document = self.load_document(role, bytes, pages).await?;
        if document.is_empty() {
            warn!(
                "[{}] ⚠️ {}，使用空上下文",
                run,
                AppError::ExtractionEmpty { role }
            );
        }
        Ok(document)
    }

    /// 在已提取的文档上运行一次审计
    pub async fn run_documents(
        &self,
        meta: &AuditMeta,
        exam: &Document,
        policy: &Document,
        book: &Document,
    ) -> AppResult<AuditReport> {
        let run = meta.name.as_str();
        if exam.is_empty() {
            return Err(AppError::ExtractionEmpty {
                role: DocumentRole::Exam,
            });
        }

        log_run_start(run, exam, policy, book);

        // ========== 抽取题目 ==========
        let items = extract_items(&self.client, meta, exam.text(), self.config.max_exam_chars).await?;
        if items.is_empty() {
            error!("[{}] ❌ 未抽取到任何题目，中止本次运行", run);
            return Err(AppError::NoItems {
                run: run.to_string(),
            });
        }

        // ========== 逐题处理 ==========
        let policy_index =
            DocumentIndex::build(policy, self.config.chunk_size, self.config.chunk_overlap);
        let book_index = DocumentIndex::build(book, self.config.chunk_size, self.config.chunk_overlap);
        let flow = ItemFlow::new(
            &self.client,
            &self.classifier,
            meta,
            &policy_index,
            &book_index,
            &self.config,
        );

        let total = items.len();
        // 先装箱再进入 stream，外层 future 才能被 tokio::spawn
        let pending: Vec<BoxFuture<'_, (&ExamItem, AppResult<ItemOutcome>)>> = items
            .iter()
            .map(|item| analyze_item(&flow, item, run, total).boxed())
            .collect();
        let mut outcomes: Vec<(&ExamItem, AppResult<ItemOutcome>)> = stream::iter(pending)
            .buffer_unordered(self.config.max_concurrent_items.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|(item, _)| item.ordinal);

        // ========== 汇总 ==========
        let (records, grounded, item_failures) = self.collect(run, outcomes)?;

        // ========== 统计 ==========
        let working_table = aggregate(&items, &records, &grounded, !book.is_empty());

        // ========== 总评 ==========
        let summary = self.summarize(meta, &records, &overview(&working_table)).await?;

        log_run_complete(run, records.len(), item_failures.len());

        Ok(AuditReport {
            meta: meta.clone(),
            records,
            working_table,
            summary,
            item_failures,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }

    /// 按题号归并单题结果；隔离策略下重试耗尽的题目写入占位记录
    #[allow(clippy::type_complexity)]
    fn collect(
        &self,
        run: &str,
        outcomes: Vec<(&ExamItem, AppResult<ItemOutcome>)>,
    ) -> AppResult<(Vec<AnalysisRecord>, Vec<u32>, Vec<ItemFailure>)> {
        let mut records = Vec::with_capacity(outcomes.len());
        let mut grounded = Vec::new();
        let mut failures = Vec::new();

        for (item, outcome) in outcomes {
            match outcome {
                Ok(outcome) => {
                    if outcome.book_grounded {
                        grounded.push(item.ordinal);
                    }
                    records.push(outcome.record);
                }
                Err(e) if !e.is_fatal() && self.config.isolate_item_failures => {
                    error!("[{}] ❌ 题目 {} 分析失败，已跳过: {}", run, item.ordinal, e);
                    let label = self.classifier.classify(&item.text);
                    let reason = failure_reason(&e);
                    records.push(AnalysisRecord::placeholder(item, label, &reason));
                    failures.push(ItemFailure {
                        ordinal: item.ordinal,
                        reason,
                    });
                }
                Err(e) => {
                    error!("[{}] ❌ 题目 {} 处理失败，中止本次运行: {}", run, item.ordinal, e);
                    return Err(e);
                }
            }
        }

        Ok((records, grounded, failures))
    }

    async fn summarize(
        &self,
        meta: &AuditMeta,
        records: &[AnalysisRecord],
        table_overview: &str,
    ) -> AppResult<String> {
        let compact: Vec<CompactRecord<'_>> = records
            .iter()
            .map(|r| CompactRecord {
                ordinal: r.ordinal,
                label: r.assessment_objective.label(),
                note: &r.note,
            })
            .collect();
        let compact_json = serde_json::to_string(&compact).unwrap_or_else(|_| "[]".to_string());

        let prompt = summarize_prompt(meta, &compact_json, table_overview);
        let generated = self
            .client
            .generate::<RawSummary>(&prompt, &SUMMARY_CONTRACT)
            .await?;
        Ok(generated.value.summary.trim().to_string())
    }
}

async fn analyze_item<'a, M: GenerativeModel>(
    flow: &ItemFlow<'_, M>,
    item: &'a ExamItem,
    run: &str,
    total: usize,
) -> (&'a ExamItem, AppResult<ItemOutcome>) {
    let ctx = ItemCtx::new(run, item.ordinal, total);
    info!("{} 开始分析", ctx);
    (item, flow.run(item, &ctx).await)
}

/// 报告中的失败原因只保留一行
fn failure_reason(error: &AppError) -> String {
    match error {
        AppError::GenerationExhausted {
            attempts,
            last_error,
            ..
        } => format!("no valid output after {} attempts: {}", attempts, last_error),
        other => other.to_string(),
    }
}

// ========== 日志辅助函数 ==========

fn log_run_start(run: &str, exam: &Document, policy: &Document, book: &Document) {
    info!("{}", "─".repeat(60));
    info!("📄 [{}] 开始审计", run);
    info!(
        "📚 试卷 {} 字符 | 评价文件 {} 字符 | 学生用书 {} 字符",
        exam.char_len(),
        policy.char_len(),
        book.char_len()
    );
}

fn log_run_complete(run: &str, records: usize, failed: usize) {
    info!(
        "✓ [{}] 审计完成: {} 道题, 其中 {} 道分析失败",
        run, records, failed
    );
    info!("{}", "─".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_is_single_line() {
        let err = AppError::GenerationExhausted {
            contract: "analyze_item".to_string(),
            attempts: 3,
            last_error: "expected value".to_string(),
            last_raw: "line one\nline two".to_string(),
        };
        let reason = failure_reason(&err);
        assert_eq!(reason, "no valid output after 3 attempts: expected value");
    }

    #[test]
    fn test_compact_record_shape() {
        let json = serde_json::to_string(&CompactRecord {
            ordinal: 1,
            label: "A01",
            note: "clear",
        })
        .unwrap();
        assert_eq!(json, r#"{"ordinal":1,"label":"A01","note":"clear"}"#);
    }
}
