//! 题目处理流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整处理流程
//!
//! 流程顺序：
//! 1. 检索上下文（评价文件 + 学生用书）
//! 2. 启发式分类（只作提示）
//! 3. 模型分析 → 标签合并
//! 4. 条件满足时重新分类一次

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::GenerativeModel;
use crate::models::exam::{RawAnalysis, RawReclassification};
use crate::models::{AnalysisRecord, AssessmentObjective, AuditMeta, ExamItem};
use crate::services::classifier::{adopt_reclassification, reconcile};
use crate::services::prompts::{
    analyze_item_prompt, reclassify_prompt, ANALYSIS_CONTRACT, RECLASSIFY_CONTRACT,
};
use crate::services::{DocumentIndex, HeuristicClassifier, StructuredClient};
use crate::workflow::item_ctx::ItemCtx;

/// 单题处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub record: AnalysisRecord,
    /// 学生用书中是否检索到字面匹配
    pub book_grounded: bool,
    /// 是否触发了重新分类
    pub reclassified: bool,
}

/// 题目处理流程
///
/// - 编排单道题的处理步骤
/// - 决定何时检索、何时分析、何时重新分类
/// - 不持有任何资源，只借用本次运行共享的只读数据
pub struct ItemFlow<'a, M> {
    client: &'a StructuredClient<M>,
    classifier: &'a HeuristicClassifier,
    meta: &'a AuditMeta,
    policy: &'a DocumentIndex,
    book: &'a DocumentIndex,
    policy_top_k: usize,
    book_top_k: usize,
    verbose_logging: bool,
}

impl<'a, M: GenerativeModel> ItemFlow<'a, M> {
    pub fn new(
        client: &'a StructuredClient<M>,
        classifier: &'a HeuristicClassifier,
        meta: &'a AuditMeta,
        policy: &'a DocumentIndex,
        book: &'a DocumentIndex,
        config: &Config,
    ) -> Self {
        Self {
            client,
            classifier,
            meta,
            policy,
            book,
            policy_top_k: config.policy_top_k,
            book_top_k: config.book_top_k,
            verbose_logging: config.verbose_logging,
        }
    }

    pub async fn run(&self, item: &ExamItem, ctx: &ItemCtx) -> AppResult<ItemOutcome> {
        // ========== 检索上下文 ==========
        let policy_hits = self.policy.retrieve(&item.text, self.policy_top_k);
        let book_hits = self.book.retrieve(&item.text, self.book_top_k);
        let book_grounded = book_hits.iter().any(|h| h.lexical_match);

        if self.verbose_logging {
            debug!(
                "{} 检索: 评价文件 {} 段, 学生用书 {} 段 (字面匹配: {})",
                ctx,
                policy_hits.len(),
                book_hits.len(),
                book_grounded
            );
        }

        // ========== 启发式分类 ==========
        let hint = self.classifier.heuristic(&item.text);
        debug!("{} {}", ctx, hint.describe());

        // ========== 模型分析 ==========
        let prompt = analyze_item_prompt(self.meta, item, &hint, &policy_hits, &book_hits);
        let analysis = self
            .client
            .generate::<RawAnalysis>(&prompt, &ANALYSIS_CONTRACT)
            .await?;
        if analysis.attempts > 1 {
            info!("{} 第 {} 次尝试得到合法输出", ctx, analysis.attempts);
        }
        let raw = analysis.value;

        let (mut label, from_model) = reconcile(&raw.assessment_objective, &hint);
        let mut classification_reason = if from_model && !raw.classification_reason.trim().is_empty() {
            raw.classification_reason.trim().to_string()
        } else if from_model {
            format!("model label {}", label)
        } else {
            warn!(
                "{} ⚠️ 模型标签 '{}' 不合法，使用启发式标签 {}",
                ctx, raw.assessment_objective, hint.label
            );
            hint.describe()
        };

        // ========== 条件重新分类（最多一次） ==========
        let mut reclassified = false;
        if self.classifier.needs_reclassification(label, &item.text) {
            reclassified = true;
            let cue = self.classifier.escalation_cue(&item.text).unwrap_or_default();
            info!("{} 🔁 标签为 {} 但包含分析线索 '{}'，重新分类", ctx, label, cue);

            if let Some(candidate) = self.reclassify(item, label, &cue, ctx).await? {
                let adopted = adopt_reclassification(label, &candidate.assessment_objective);
                if adopted != label {
                    info!("{} ✓ 重新分类: {} → {}", ctx, label, adopted);
                    classification_reason = if candidate.reason.trim().is_empty() {
                        format!("{}; reclassified from {}", classification_reason, label)
                    } else {
                        candidate.reason.trim().to_string()
                    };
                    label = adopted;
                } else if AssessmentObjective::parse_label(&candidate.assessment_objective).is_none() {
                    warn!(
                        "{} ⚠️ 重新分类返回了不合法的标签 '{}'，保留 {}",
                        ctx, candidate.assessment_objective, label
                    );
                }
            }
        }

        Ok(ItemOutcome {
            record: AnalysisRecord {
                ordinal: item.ordinal,
                learning_objective: raw.learning_objective.trim().to_string(),
                assessment_objective: label,
                marks: item.mark_value,
                note_type: raw.note_type.trim().to_string(),
                note: raw.note.trim().to_string(),
                suggested_edit: raw.suggested_edit.trim().to_string(),
                classification_reason,
            },
            book_grounded,
            reclassified,
        })
    }

    /// 重新分类调用；尝试次数耗尽时视为没有合法结果
    async fn reclassify(
        &self,
        item: &ExamItem,
        current: AssessmentObjective,
        cue: &str,
        ctx: &ItemCtx,
    ) -> AppResult<Option<RawReclassification>> {
        let prompt = reclassify_prompt(item, current, cue);
        match self
            .client
            .generate::<RawReclassification>(&prompt, &RECLASSIFY_CONTRACT)
            .await
        {
            Ok(generated) => Ok(Some(generated.value)),
            Err(e @ AppError::GenerationExhausted { .. }) => {
                warn!("{} ⚠️ 重新分类失败，保留原标签: {}", ctx, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
