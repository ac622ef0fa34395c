//! 统计表服务 - 业务能力层
//!
//! 从完整的分析记录集合计算固定键的统计项。
//! 布尔类判断（选择题数量、是否有长答题、措辞是否清楚）只看题目文本和已有记录，不调用模型。

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::{
    AnalysisRecord, AssessmentObjective, EntryStatus, EntryValue, ExamItem, WorkingTable,
    WorkingTableEntry, WorkingTableKey,
};

/// 长答题的最少词数
const LONG_FORM_MIN_WORDS: usize = 60;

/// 少于此词数的题干视为措辞不完整
const CLEAR_MIN_WORDS: usize = 3;

/// 学生用书覆盖率低于此值时标记为待复核
const BOOK_COVERAGE_REVIEW_BELOW: f64 = 0.5;

fn option_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)(?:^|\s)(?:\([a-dA-D]\)|[a-dA-D][.)])\s|(?:^|\s)(?:\([أبجد]\)|[أبجد][.)-])\s")
            .expect("option marker pattern")
    })
}

fn choice_phrase_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)choose the correct|multiple[- ]choice|circle the correct|select the correct|اختر الإجابة|ضع دائرة")
            .expect("choice phrase pattern")
    })
}

fn long_form_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(discuss|essay|explain in detail|describe in detail|write a paragraph|extended response)\b|ناقش|اكتب فقرة|بالتفصيل|مقال")
            .expect("long form pattern")
    })
}

/// 是否为选择题：至少两个选项标记，或出现"选择正确答案"之类的说法
pub fn is_multiple_choice(text: &str) -> bool {
    choice_phrase_regex().is_match(text) || option_marker_regex().find_iter(text).count() >= 2
}

/// 是否为长答题：出现论述类说法，或题干足够长
pub fn is_long_form(text: &str) -> bool {
    long_form_regex().is_match(text) || text.split_whitespace().count() >= LONG_FORM_MIN_WORDS
}

/// 题干措辞是否有明显问题：过短、括号未闭合、相邻重复词
pub fn is_unclear(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < CLEAR_MIN_WORDS {
        return true;
    }

    // 选项标记 `a)` 只有右括号，只检查未闭合的左括号
    let unclosed = [('(', ')'), ('[', ']')]
        .iter()
        .any(|&(open, close)| text.matches(open).count() > text.matches(close).count());
    let repeated = words.windows(2).any(|pair| {
        pair[0].chars().any(char::is_alphabetic) && pair[0].to_lowercase() == pair[1].to_lowercase()
    });

    unclosed || repeated
}

/// 模型给出的措辞类意见
fn is_wording_note(record: &AnalysisRecord) -> bool {
    matches!(
        record.note_type.trim().to_lowercase().as_str(),
        "wording" | "clarity" | "صياغة" | "وضوح"
    )
}

/// 计算统计表
///
/// - `grounded_ordinals`：在学生用书中检索到字面匹配的题号
/// - `book_available`：是否提供了学生用书
pub fn aggregate(
    items: &[ExamItem],
    records: &[AnalysisRecord],
    grounded_ordinals: &[u32],
    book_available: bool,
) -> WorkingTable {
    let item_count = items.len();
    let total_marks: f64 = records.iter().map(|r| r.marks).sum();
    let marks_for = |label: AssessmentObjective| -> f64 {
        records
            .iter()
            .filter(|r| r.assessment_objective == label)
            .map(|r| r.marks)
            .sum()
    };
    let a01 = marks_for(AssessmentObjective::A01);
    let a02 = marks_for(AssessmentObjective::A02);
    let a01_a02 = marks_for(AssessmentObjective::A01A02);

    let mcq_count = items.iter().filter(|i| is_multiple_choice(&i.text)).count();
    let has_long_form = items.iter().any(|i| is_long_form(&i.text));

    let item_ordinals: HashSet<u32> = items.iter().map(|i| i.ordinal).collect();
    let grounded = grounded_ordinals
        .iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .filter(|o| item_ordinals.contains(*o))
        .count();
    let coverage = if item_count == 0 {
        0.0
    } else {
        grounded as f64 / item_count as f64
    };

    let flagged = records.iter().filter(|r| r.is_flagged()).count();
    let clear = !items.iter().any(|i| is_unclear(&i.text)) && !records.iter().any(is_wording_note);

    let entries = WorkingTableKey::ALL
        .iter()
        .map(|&key| {
            let (value, status) = match key {
                WorkingTableKey::ItemCount => (
                    EntryValue::Count(item_count),
                    present_or_missing(item_count > 0),
                ),
                WorkingTableKey::TotalMarks => (
                    EntryValue::Marks(total_marks),
                    if total_marks > 0.0 {
                        EntryStatus::Ok
                    } else {
                        EntryStatus::Review
                    },
                ),
                WorkingTableKey::A01Marks => (EntryValue::Marks(a01), present_or_missing(a01 > 0.0)),
                WorkingTableKey::A02Marks => (EntryValue::Marks(a02), present_or_missing(a02 > 0.0)),
                WorkingTableKey::A01A02Marks => (EntryValue::Marks(a01_a02), EntryStatus::Ok),
                WorkingTableKey::MultipleChoiceItems => {
                    (EntryValue::Count(mcq_count), EntryStatus::Ok)
                }
                WorkingTableKey::HasTwoMultipleChoice => (
                    EntryValue::Flag(mcq_count >= 2),
                    present_or_missing(mcq_count >= 2),
                ),
                WorkingTableKey::HasLongFormItem => (
                    EntryValue::Flag(has_long_form),
                    present_or_missing(has_long_form),
                ),
                WorkingTableKey::BookCoverage => (
                    EntryValue::Ratio(coverage),
                    if !book_available {
                        EntryStatus::Missing
                    } else if coverage < BOOK_COVERAGE_REVIEW_BELOW {
                        EntryStatus::Review
                    } else {
                        EntryStatus::Ok
                    },
                ),
                WorkingTableKey::Clarity => (
                    EntryValue::Flag(clear),
                    if clear {
                        EntryStatus::Ok
                    } else {
                        EntryStatus::Review
                    },
                ),
                WorkingTableKey::FlaggedItems => (
                    EntryValue::Count(flagged),
                    if flagged == 0 {
                        EntryStatus::Ok
                    } else {
                        EntryStatus::Review
                    },
                ),
            };
            WorkingTableEntry {
                key,
                label: key.label().to_string(),
                value,
                status,
            }
        })
        .collect();

    WorkingTable::from_entries(entries)
}

fn present_or_missing(present: bool) -> EntryStatus {
    if present {
        EntryStatus::Ok
    } else {
        EntryStatus::Missing
    }
}

/// 给总评提示词用的简短统计描述
pub fn overview(table: &WorkingTable) -> String {
    table
        .entries()
        .iter()
        .map(|e| format!("- {}: {} ({})", e.key.key(), e.value, e.status))
        .collect::<Vec<_>>()
        .join("\n")
}
