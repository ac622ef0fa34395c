use serde::{Deserialize, Serialize};

use crate::models::exam::AnalysisRecord;

/// 报告抬头信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub semester: String,
    #[serde(default)]
    pub exam_type: String,
}

impl AuditMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 提示词中使用的一行描述
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.subject.is_empty() {
            parts.push(format!("subject: {}", self.subject));
        }
        if !self.grade.is_empty() {
            parts.push(format!("grade: {}", self.grade));
        }
        if !self.semester.is_empty() {
            parts.push(format!("semester: {}", self.semester));
        }
        if !self.exam_type.is_empty() {
            parts.push(format!("exam type: {}", self.exam_type));
        }
        if parts.is_empty() {
            "unspecified exam".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// 统计表的固定键，顺序即报告中的行顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkingTableKey {
    ItemCount,
    TotalMarks,
    A01Marks,
    A02Marks,
    A01A02Marks,
    MultipleChoiceItems,
    HasTwoMultipleChoice,
    HasLongFormItem,
    BookCoverage,
    Clarity,
    FlaggedItems,
}

impl WorkingTableKey {
    pub const ALL: [WorkingTableKey; 11] = [
        WorkingTableKey::ItemCount,
        WorkingTableKey::TotalMarks,
        WorkingTableKey::A01Marks,
        WorkingTableKey::A02Marks,
        WorkingTableKey::A01A02Marks,
        WorkingTableKey::MultipleChoiceItems,
        WorkingTableKey::HasTwoMultipleChoice,
        WorkingTableKey::HasLongFormItem,
        WorkingTableKey::BookCoverage,
        WorkingTableKey::Clarity,
        WorkingTableKey::FlaggedItems,
    ];

    pub fn key(self) -> &'static str {
        match self {
            WorkingTableKey::ItemCount => "item_count",
            WorkingTableKey::TotalMarks => "total_marks",
            WorkingTableKey::A01Marks => "a01_marks",
            WorkingTableKey::A02Marks => "a02_marks",
            WorkingTableKey::A01A02Marks => "a01_a02_marks",
            WorkingTableKey::MultipleChoiceItems => "multiple_choice_items",
            WorkingTableKey::HasTwoMultipleChoice => "has_two_multiple_choice",
            WorkingTableKey::HasLongFormItem => "has_long_form_item",
            WorkingTableKey::BookCoverage => "book_coverage",
            WorkingTableKey::Clarity => "clarity",
            WorkingTableKey::FlaggedItems => "flagged_items",
        }
    }

    /// 报告中的显示名称
    pub fn label(self) -> &'static str {
        match self {
            WorkingTableKey::ItemCount => "Number of items",
            WorkingTableKey::TotalMarks => "Total marks",
            WorkingTableKey::A01Marks => "A01 marks",
            WorkingTableKey::A02Marks => "A02 marks",
            WorkingTableKey::A01A02Marks => "A01/A02 marks",
            WorkingTableKey::MultipleChoiceItems => "Multiple-choice items",
            WorkingTableKey::HasTwoMultipleChoice => "At least two multiple-choice items",
            WorkingTableKey::HasLongFormItem => "Contains a long-form item",
            WorkingTableKey::BookCoverage => "Items grounded in the book",
            WorkingTableKey::Clarity => "Wording is clear",
            WorkingTableKey::FlaggedItems => "Items with review notes",
        }
    }
}

/// 统计值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryValue {
    Count(usize),
    Marks(f64),
    Flag(bool),
    Ratio(f64),
}

impl std::fmt::Display for EntryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryValue::Count(n) => write!(f, "{}", n),
            EntryValue::Marks(m) => write!(f, "{}", m),
            EntryValue::Flag(true) => write!(f, "yes"),
            EntryValue::Flag(false) => write!(f, "no"),
            EntryValue::Ratio(r) => write!(f, "{:.0}%", r * 100.0),
        }
    }
}

/// 统计项评估状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "Missing")]
    Missing,
    #[serde(rename = "Review")]
    Review,
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryStatus::Ok => "OK",
            EntryStatus::Missing => "Missing",
            EntryStatus::Review => "Review",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingTableEntry {
    pub key: WorkingTableKey,
    pub label: String,
    pub value: EntryValue,
    pub status: EntryStatus,
}

/// 统计表：始终包含 `WorkingTableKey::ALL` 中的全部键，按同一顺序排列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingTable {
    entries: Vec<WorkingTableEntry>,
}

impl WorkingTable {
    pub(crate) fn from_entries(entries: Vec<WorkingTableEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[WorkingTableEntry] {
        &self.entries
    }

    pub fn get(&self, key: WorkingTableKey) -> Option<&WorkingTableEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn keys(&self) -> Vec<WorkingTableKey> {
        self.entries.iter().map(|e| e.key).collect()
    }
}

/// 被隔离的单题失败
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub ordinal: u32,
    pub reason: String,
}

/// 一次审计运行的结果，由调用方持有
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub meta: AuditMeta,
    pub records: Vec<AnalysisRecord>,
    pub working_table: WorkingTable,
    pub summary: String,
    pub item_failures: Vec<ItemFailure>,
    pub generated_at: String,
}
