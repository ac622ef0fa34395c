//! 提示词模板
//!
//! 每个提示词的第一行是任务标记（`[task:...]`），模型日志与脚本化测试模型都按它区分调用。

use crate::models::{AssessmentObjective, AuditMeta, ExamItem};
use crate::services::classifier::HeuristicHint;
use crate::services::retriever::RetrievedChunk;
use crate::services::structured_client::OutputContract;

pub const TASK_EXTRACT_ITEMS: &str = "[task:extract_items]";
pub const TASK_ANALYZE_ITEM: &str = "[task:analyze_item]";
pub const TASK_RECLASSIFY: &str = "[task:reclassify]";
pub const TASK_SUMMARIZE: &str = "[task:summarize]";
pub const TASK_REPAIR_JSON: &str = "[task:repair_json]";

pub const ITEM_LIST_CONTRACT: OutputContract = OutputContract {
    name: "extract_items",
    keys: &["items", "number", "text", "marks"],
};

pub const ANALYSIS_CONTRACT: OutputContract = OutputContract {
    name: "analyze_item",
    keys: &[
        "learning_objective",
        "assessment_objective",
        "note_type",
        "note",
        "suggested_edit",
        "classification_reason",
    ],
};

pub const RECLASSIFY_CONTRACT: OutputContract = OutputContract {
    name: "reclassify",
    keys: &["assessment_objective", "reason"],
};

pub const SUMMARY_CONTRACT: OutputContract = OutputContract {
    name: "summarize",
    keys: &["summary"],
};

/// 题目抽取
pub fn extract_items_prompt(meta: &AuditMeta, exam_text: &str) -> String {
    format!(
        r#"{tag}
Split the following exam ({meta}) into its individual items.
Keep each item's wording exactly as written. Include the item number and the mark value when they are printed.

Return JSON only, in this shape:
{{"items": [{{"number": 1, "text": "item text", "marks": 2}}]}}

Exam text:
{exam}"#,
        tag = TASK_EXTRACT_ITEMS,
        meta = meta.describe(),
        exam = exam_text,
    )
}

/// 单题分析
pub fn analyze_item_prompt(
    meta: &AuditMeta,
    item: &ExamItem,
    hint: &HeuristicHint,
    policy_context: &[RetrievedChunk<'_>],
    book_context: &[RetrievedChunk<'_>],
) -> String {
    format!(
        r#"{tag}
Audit one item of an exam ({meta}) against the assessment policy and the student book.

Item {ordinal} ({marks} marks):
{text}

Assessment policy excerpts:
{policy}

Student book excerpts:
{book}

A keyword heuristic suggests {hint_label} ({hint_reason}). This is only a hint; decide for yourself.
Allowed assessment objectives: A01 (recall / understanding), A02 (application / analysis), A01/A02 (both).

Return JSON only, in this shape:
{{"learning_objective": "matching objective or indicator", "assessment_objective": "A01|A02|A01/A02", "note_type": "ok|wording|alignment|marks|other", "note": "review note", "suggested_edit": "suggested rewording, or empty", "classification_reason": "why this objective"}}"#,
        tag = TASK_ANALYZE_ITEM,
        meta = meta.describe(),
        ordinal = item.ordinal,
        marks = item.mark_value,
        text = item.text,
        policy = format_context(policy_context),
        book = format_context(book_context),
        hint_label = hint.label,
        hint_reason = hint.describe(),
    )
}

/// 一次性重新分类
pub fn reclassify_prompt(item: &ExamItem, current: AssessmentObjective, cue: &str) -> String {
    format!(
        r#"{tag}
The exam item below was classified as {current}, but it contains an analytical cue ("{cue}").
Re-check the assessment objective. Allowed values: A01, A02, A01/A02.

Item {ordinal}:
{text}

Return JSON only: {{"assessment_objective": "A01|A02|A01/A02", "reason": "short reason"}}"#,
        tag = TASK_RECLASSIFY,
        current = current,
        cue = cue,
        ordinal = item.ordinal,
        text = item.text,
    )
}

/// 总评（只包含题号、标签与意见）
pub fn summarize_prompt(meta: &AuditMeta, compact_records: &str, table_overview: &str) -> String {
    format!(
        r#"{tag}
Write a short analytical summary (3-5 sentences) of this exam audit ({meta}).

Statistics:
{table}

Per-item labels and notes:
{records}

Return JSON only: {{"summary": "..."}}"#,
        tag = TASK_SUMMARIZE,
        meta = meta.describe(),
        table = table_overview,
        records = compact_records,
    )
}

/// 解析失败后的修复提示：附上一次的原始输出与错误信息
pub fn repair_prompt(contract: &OutputContract, previous_raw: &str, parse_error: &str) -> String {
    format!(
        r#"{tag} {name}
Your previous answer was not valid JSON.
Parse error: {error}

Repair it and return only the corrected JSON object. Preserve these exact keys: {keys}.

Previous answer:
{raw}"#,
        tag = TASK_REPAIR_JSON,
        name = contract.name,
        error = parse_error,
        keys = contract.keys.join(", "),
        raw = previous_raw,
    )
}

fn format_context(chunks: &[RetrievedChunk<'_>]) -> String {
    if chunks.is_empty() {
        return "(none provided)".to_string();
    }
    chunks
        .iter()
        .map(|r| format!("[{}] {}", r.chunk.index + 1, r.chunk.text.trim()))
        .collect::<Vec<_>>()
        .join("\n---\n")
}
