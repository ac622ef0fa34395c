use serde::{Deserialize, Serialize};

use crate::models::de::{loose_number, loose_ordinal, loose_string};

/// 评价目标（认知层级标签）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssessmentObjective {
    /// 识记 / 理解
    #[serde(rename = "A01")]
    A01,
    /// 应用 / 分析
    #[serde(rename = "A02")]
    A02,
    /// 兼有两者
    #[serde(rename = "A01/A02")]
    A01A02,
}

impl AssessmentObjective {
    pub const ALL: [AssessmentObjective; 3] = [
        AssessmentObjective::A01,
        AssessmentObjective::A02,
        AssessmentObjective::A01A02,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AssessmentObjective::A01 => "A01",
            AssessmentObjective::A02 => "A02",
            AssessmentObjective::A01A02 => "A01/A02",
        }
    }

    /// 解析模型返回的标签
    ///
    /// 容忍大小写、空白，以及把数字 0 写成字母 O（"AO1"）。
    /// 不在三个合法标签内的值返回 `None`。
    pub fn parse_label(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let folded = compact.replace("AO", "A0");
        match folded.as_str() {
            "A01" => Some(AssessmentObjective::A01),
            "A02" => Some(AssessmentObjective::A02),
            "A01/A02" | "A02/A01" => Some(AssessmentObjective::A01A02),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssessmentObjective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 试卷中的一道题，抽取后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamItem {
    pub ordinal: u32,
    pub text: String,
    pub mark_value: f64,
}

/// 单题分析结果，与 `ExamItem` 按题号一一对应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub ordinal: u32,
    pub learning_objective: String,
    pub assessment_objective: AssessmentObjective,
    pub marks: f64,
    pub note_type: String,
    pub note: String,
    pub suggested_edit: String,
    pub classification_reason: String,
}

impl AnalysisRecord {
    /// 分析失败时的占位记录
    pub fn placeholder(item: &ExamItem, label: AssessmentObjective, reason: &str) -> Self {
        Self {
            ordinal: item.ordinal,
            learning_objective: String::new(),
            assessment_objective: label,
            marks: item.mark_value,
            note_type: NOTE_TYPE_ANALYSIS_FAILED.to_string(),
            note: format!("analysis unavailable: {}", reason),
            suggested_edit: String::new(),
            classification_reason: format!("heuristic label ({})", label),
        }
    }

    /// 是否需要人工复核（模型给出了实质性意见或分析失败）
    pub fn is_flagged(&self) -> bool {
        let note_type = self.note_type.trim().to_lowercase();
        !(note_type.is_empty()
            || matches!(note_type.as_str(), "ok" | "none" | "good" | "سليم" | "لا يوجد"))
    }
}

pub const NOTE_TYPE_ANALYSIS_FAILED: &str = "analysis_failed";

// ========== 模型输出的解码结构（所有字段都有默认值） ==========

/// 题目抽取响应
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawItemList {
    #[serde(alias = "questions", alias = "vocab")]
    pub items: Vec<RawItem>,
}

/// 抽取出的单道题，题号与分值都可能缺失
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawItem {
    #[serde(alias = "number", alias = "q", alias = "index", deserialize_with = "loose_ordinal")]
    pub ordinal: Option<u32>,
    #[serde(alias = "question", alias = "stem", deserialize_with = "loose_string")]
    pub text: String,
    #[serde(alias = "mark", alias = "mark_value", alias = "score", deserialize_with = "loose_number")]
    pub marks: Option<f64>,
}

/// 单题分析响应
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAnalysis {
    #[serde(alias = "obj", alias = "objective", deserialize_with = "loose_string")]
    pub learning_objective: String,
    #[serde(alias = "level", alias = "ao", deserialize_with = "loose_string")]
    pub assessment_objective: String,
    #[serde(alias = "type", deserialize_with = "loose_string")]
    pub note_type: String,
    #[serde(deserialize_with = "loose_string")]
    pub note: String,
    #[serde(alias = "fix", alias = "edit", deserialize_with = "loose_string")]
    pub suggested_edit: String,
    #[serde(alias = "reason", deserialize_with = "loose_string")]
    pub classification_reason: String,
}

/// 重新分类响应
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawReclassification {
    #[serde(alias = "level", alias = "ao", alias = "label", deserialize_with = "loose_string")]
    pub assessment_objective: String,
    #[serde(alias = "classification_reason", deserialize_with = "loose_string")]
    pub reason: String,
}

/// 总评响应
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSummary {
    #[serde(deserialize_with = "loose_string")]
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_accepts_three_labels() {
        assert_eq!(AssessmentObjective::parse_label("A01"), Some(AssessmentObjective::A01));
        assert_eq!(AssessmentObjective::parse_label(" a02 "), Some(AssessmentObjective::A02));
        assert_eq!(
            AssessmentObjective::parse_label("A01 / A02"),
            Some(AssessmentObjective::A01A02)
        );
        assert_eq!(AssessmentObjective::parse_label("AO1"), Some(AssessmentObjective::A01));
    }

    #[test]
    fn test_parse_label_rejects_other_values() {
        assert_eq!(AssessmentObjective::parse_label("A03"), None);
        assert_eq!(AssessmentObjective::parse_label("analysis"), None);
        assert_eq!(AssessmentObjective::parse_label(""), None);
    }

    #[test]
    fn test_raw_item_list_with_string_numbers() {
        let list: RawItemList = serde_json::from_str(
            r#"{"items":[{"number":"1","text":"x","marks":"1"},{"question":"y"}]}"#,
        )
        .unwrap();
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].ordinal, Some(1));
        assert_eq!(list.items[0].marks, Some(1.0));
        assert_eq!(list.items[1].ordinal, None);
        assert_eq!(list.items[1].text, "y");
    }

    #[test]
    fn test_raw_analysis_defaults_for_missing_fields() {
        let raw: RawAnalysis = serde_json::from_str(r#"{"level":"A02","note":null}"#).unwrap();
        assert_eq!(raw.assessment_objective, "A02");
        assert_eq!(raw.note, "");
        assert_eq!(raw.learning_objective, "");
    }

    #[test]
    fn test_label_serializes_with_slash() {
        let json = serde_json::to_string(&AssessmentObjective::A01A02).unwrap();
        assert_eq!(json, "\"A01/A02\"");
    }
}
