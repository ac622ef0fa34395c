//! 题目抽取服务 - 业务能力层
//!
//! 一次模型调用把整张试卷拆成题目列表，然后在本地补齐题号和分值。

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::infrastructure::GenerativeModel;
use crate::models::de::fold_digit;
use crate::models::exam::{RawItem, RawItemList};
use crate::models::{AuditMeta, ExamItem};
use crate::services::prompts::{extract_items_prompt, ITEM_LIST_CONTRACT};
use crate::services::structured_client::StructuredClient;

fn marks_with_unit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:marks?|pts?|points?|درجة|درجات|علامة|علامات)")
            .expect("marks pattern")
    })
}

fn bracketed_marks_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\s*(\d+(?:\.\d+)?)\s*\]").expect("bracketed marks pattern"))
}

/// 试卷文本按字符数截断，返回是否发生了截断
pub fn exam_excerpt(text: &str, max_chars: usize) -> (String, bool) {
    let total = text.chars().count();
    if total <= max_chars {
        (text.to_string(), false)
    } else {
        (text.chars().take(max_chars).collect(), true)
    }
}

/// 从题干中找回分值：`(2 marks)`、`[3]`、`(٢ درجة)`；取最后一处
pub fn marks_from_text(text: &str) -> Option<f64> {
    let folded: String = text.chars().map(|c| fold_digit(c).unwrap_or(c)).collect();

    let last_capture = |re: &Regex| -> Option<f64> {
        re.captures_iter(&folded)
            .last()
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    };

    last_capture(marks_with_unit_regex()).or_else(|| last_capture(bracketed_marks_regex()))
}

/// 规范化抽取结果
///
/// 1. 丢弃空题干
/// 2. 每道题都带有互不重复的题号时保留模型给出的题号
/// 3. 否则按原顺序从 1 开始重新编号
/// 4. 缺失的分值从题干中找回，找不到为 0
pub fn assign_ordinals(raw_items: Vec<RawItem>) -> Vec<ExamItem> {
    let kept: Vec<RawItem> = raw_items
        .into_iter()
        .filter(|item| !item.text.trim().is_empty())
        .collect();

    let mut seen = HashSet::new();
    let keep_given = kept
        .iter()
        .all(|item| item.ordinal.is_some_and(|o| seen.insert(o)));
    if !keep_given && kept.iter().any(|item| item.ordinal.is_some()) {
        warn!("⚠️ 题号缺失或重复，按原顺序重新编号");
    }

    let mut items: Vec<ExamItem> = kept
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| {
            let ordinal = match raw.ordinal {
                Some(o) if keep_given => o,
                _ => idx as u32 + 1,
            };
            let text = raw.text.trim().to_string();
            let mark_value = raw
                .marks
                .or_else(|| marks_from_text(&text))
                .unwrap_or(0.0)
                .max(0.0);
            ExamItem {
                ordinal,
                text,
                mark_value,
            }
        })
        .collect();

    items.sort_by_key(|item| item.ordinal);
    items
}

/// 调用模型抽取题目
///
/// 返回的列表可能为空，由调用方决定如何处理。
pub async fn extract_items<M: GenerativeModel>(
    client: &StructuredClient<M>,
    meta: &AuditMeta,
    exam_text: &str,
    max_exam_chars: usize,
) -> AppResult<Vec<ExamItem>> {
    let (excerpt, truncated) = exam_excerpt(exam_text, max_exam_chars);
    if truncated {
        warn!(
            "⚠️ [{}] 试卷文本超过 {} 字符，已截断后再抽取题目",
            meta.name, max_exam_chars
        );
    }

    let prompt = extract_items_prompt(meta, &excerpt);
    let generated = client
        .generate::<RawItemList>(&prompt, &ITEM_LIST_CONTRACT)
        .await?;

    let raw_count = generated.value.items.len();
    let items = assign_ordinals(generated.value.items);
    debug!(
        "[{}] 模型返回 {} 项，保留 {} 道题",
        meta.name,
        raw_count,
        items.len()
    );
    info!("[{}] ✓ 抽取到 {} 道题", meta.name, items.len());

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ordinal: Option<u32>, text: &str, marks: Option<f64>) -> RawItem {
        RawItem {
            ordinal,
            text: text.to_string(),
            marks,
        }
    }

    #[test]
    fn test_missing_ordinals_assigned_from_one() {
        let items = assign_ordinals(vec![
            raw(None, "Define force. (1 mark)", None),
            raw(None, "Calculate speed from the graph. (2 marks)", None),
        ]);
        let ordinals: Vec<u32> = items.iter().map(|i| i.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2]);
        assert_eq!(items[0].mark_value, 1.0);
        assert_eq!(items[1].mark_value, 2.0);
    }

    #[test]
    fn test_empty_text_dropped() {
        let items = assign_ordinals(vec![
            raw(Some(1), "   ", Some(1.0)),
            raw(None, "Name a planet.", Some(1.0)),
        ]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].ordinal, 1);
    }

    #[test]
    fn test_unique_given_ordinals_kept() {
        let items = assign_ordinals(vec![
            raw(Some(3), "third", None),
            raw(Some(5), "fifth", None),
        ]);
        let pairs: Vec<(u32, &str)> = items.iter().map(|i| (i.ordinal, i.text.as_str())).collect();
        assert_eq!(pairs, vec![(3, "third"), (5, "fifth")]);
    }

    #[test]
    fn test_mixed_ordinals_renumbered_in_source_order() {
        let items = assign_ordinals(vec![
            raw(None, "first", None),
            raw(Some(1), "second", None),
            raw(Some(1), "third", None),
            raw(Some(5), "fourth", None),
        ]);
        let pairs: Vec<(u32, &str)> = items.iter().map(|i| (i.ordinal, i.text.as_str())).collect();
        assert_eq!(pairs, vec![(1, "first"), (2, "second"), (3, "third"), (4, "fourth")]);

        let unique: HashSet<u32> = items.iter().map(|i| i.ordinal).collect();
        assert_eq!(unique.len(), items.len());
    }

    #[test]
    fn test_marks_from_text() {
        assert_eq!(marks_from_text("Define force. (1 mark)"), Some(1.0));
        assert_eq!(marks_from_text("Explain. [3]"), Some(3.0));
        assert_eq!(marks_from_text("عرف القوة (٢ درجة)"), Some(2.0));
        assert_eq!(marks_from_text("Question 4 (1.5 points)"), Some(1.5));
        assert_eq!(marks_from_text("Define force."), None);
    }

    #[test]
    fn test_model_marks_preferred_over_text() {
        let items = assign_ordinals(vec![raw(Some(1), "Define force. (1 mark)", Some(4.0))]);
        assert_eq!(items[0].mark_value, 4.0);
    }

    #[test]
    fn test_exam_excerpt() {
        assert_eq!(exam_excerpt("abc", 10), ("abc".to_string(), false));
        assert_eq!(exam_excerpt("اختبار", 3), ("اخت".to_string(), true));
    }
}
