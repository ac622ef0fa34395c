//! 启发式分类服务 - 业务能力层
//!
//! 关键词/模式匹配给出建议性的评价目标标签（A01 / A02）。
//! 结果只作为提示写进分析提示词，模型输出合法时以模型为准。
//!
//! 标签的确定拆成几个互不依赖的纯函数：
//! `heuristic` → 提示，`reconcile` → 模型标签与提示合并，
//! `needs_reclassification` / `adopt_reclassification` → 一次性升级。

use regex::Regex;

use crate::models::AssessmentObjective;
use crate::services::normalize::normalize_text;

/// 提示来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// 分析/应用类动词
    Analytical,
    /// 图表引用
    Structural,
    /// 识记/定义类动词
    Recall,
    /// 未命中任何规则
    Default,
}

/// 启发式提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicHint {
    pub label: AssessmentObjective,
    pub source: TriggerSource,
    pub trigger: Option<String>,
}

impl HeuristicHint {
    /// 写入分类理由的简短说明
    pub fn describe(&self) -> String {
        match (&self.source, &self.trigger) {
            (TriggerSource::Default, _) | (_, None) => {
                format!("heuristic {} (no trigger matched)", self.label)
            }
            (TriggerSource::Analytical, Some(t)) => {
                format!("heuristic {} (analytical trigger \"{}\")", self.label, t)
            }
            (TriggerSource::Structural, Some(t)) => {
                format!("heuristic {} (figure/table reference \"{}\")", self.label, t)
            }
            (TriggerSource::Recall, Some(t)) => {
                format!("heuristic {} (recall trigger \"{}\")", self.label, t)
            }
        }
    }
}

/// 可调的触发词表
///
/// 词表在构造时归一化，与归一化后的题目文本按整词比较。
#[derive(Debug, Clone)]
pub struct ClassifierPolicy {
    pub analytical: Vec<String>,
    pub recall: Vec<String>,
    pub structural: Regex,
    pub escalation: Regex,
}

const ANALYTICAL_TRIGGERS: &[&str] = &[
    "calculate", "calculates", "calculating", "compute", "determine", "derive", "analyse",
    "analyze", "interpret", "explain why", "justify", "evaluate", "compare", "predict",
    "deduce", "infer", "estimate", "design", "plot", "sketch the graph", "show that", "prove",
    "solve", "apply", "use the data", "suggest why",
    "احسب", "حلل", "فسر", "علل", "استنتج", "قارن", "توقع", "برر", "صمم", "اثبت", "قدر",
    "ارسم", "طبق", "استخدم البيانات",
];

const RECALL_TRIGGERS: &[&str] = &[
    "define", "state", "name", "list", "identify", "recall", "what is", "write down", "label",
    "give one", "give two", "mention", "select", "choose",
    "عرف", "اذكر", "ما المقصود", "سم", "عدد", "اكتب", "حدد", "اختر", "ما هو", "ما هي",
];

/// 图表引用（单独出现即判为 A02）
const STRUCTURAL_PATTERN: &str =
    r"\b(graph|graphs|table|figure|fig|diagram|chart|plot)\b|الرسم البياني|الجدول|الشكل|المخطط|المنحني";

/// 更强的分析线索，用于一次性升级
const ESCALATION_PATTERN: &str = r"\b(graph|table|figure|diagram|chart|data|experiment|explain why|justify|evaluate|predict|design|interpret)\b|الرسم البياني|الجدول|الشكل|البيانات|التجربه|فسر|علل|برر|صمم|توقع";

impl Default for ClassifierPolicy {
    fn default() -> Self {
        Self::new(ANALYTICAL_TRIGGERS, RECALL_TRIGGERS, STRUCTURAL_PATTERN, ESCALATION_PATTERN)
            .expect("built-in classifier patterns are valid")
    }
}

impl ClassifierPolicy {
    pub fn new(
        analytical: &[&str],
        recall: &[&str],
        structural: &str,
        escalation: &str,
    ) -> Result<Self, regex::Error> {
        let normalize_all = |words: &[&str]| -> Vec<String> {
            words
                .iter()
                .map(|w| normalize_text(w))
                .filter(|w| !w.is_empty())
                .collect()
        };
        Ok(Self {
            analytical: normalize_all(analytical),
            recall: normalize_all(recall),
            structural: Regex::new(structural)?,
            escalation: Regex::new(escalation)?,
        })
    }
}

/// 启发式分类器
#[derive(Debug, Clone, Default)]
pub struct HeuristicClassifier {
    policy: ClassifierPolicy,
}

impl HeuristicClassifier {
    pub fn new(policy: ClassifierPolicy) -> Self {
        Self { policy }
    }

    /// 只返回标签
    pub fn classify(&self, item_text: &str) -> AssessmentObjective {
        self.heuristic(item_text).label
    }

    /// 计算提示：分析词表优先，其次识记词表；图表引用单独即可判 A02；默认 A01
    pub fn heuristic(&self, item_text: &str) -> HeuristicHint {
        let normalized = normalize_text(item_text);
        let padded = format!(" {} ", normalized);

        if let Some(trigger) = first_match(&padded, &self.policy.analytical) {
            return HeuristicHint {
                label: AssessmentObjective::A02,
                source: TriggerSource::Analytical,
                trigger: Some(trigger),
            };
        }

        if let Some(m) = self.policy.structural.find(&normalized) {
            return HeuristicHint {
                label: AssessmentObjective::A02,
                source: TriggerSource::Structural,
                trigger: Some(m.as_str().to_string()),
            };
        }

        if let Some(trigger) = first_match(&padded, &self.policy.recall) {
            return HeuristicHint {
                label: AssessmentObjective::A01,
                source: TriggerSource::Recall,
                trigger: Some(trigger),
            };
        }

        HeuristicHint {
            label: AssessmentObjective::A01,
            source: TriggerSource::Default,
            trigger: None,
        }
    }

    /// 是否需要一次重新分类：当前标签为 A01 且命中强分析线索
    pub fn needs_reclassification(&self, label: AssessmentObjective, item_text: &str) -> bool {
        label == AssessmentObjective::A01 && self.escalation_cue(item_text).is_some()
    }

    /// 命中的强分析线索
    pub fn escalation_cue(&self, item_text: &str) -> Option<String> {
        let normalized = normalize_text(item_text);
        self.policy
            .escalation
            .find(&normalized)
            .map(|m| m.as_str().to_string())
    }
}

/// 合并模型标签与启发式提示：模型标签合法则采用，否则用提示
pub fn reconcile(model_label: &str, hint: &HeuristicHint) -> (AssessmentObjective, bool) {
    match AssessmentObjective::parse_label(model_label) {
        Some(label) => (label, true),
        None => (hint.label, false),
    }
}

/// 重新分类的结果只有在合法时才被采用
pub fn adopt_reclassification(prior: AssessmentObjective, candidate: &str) -> AssessmentObjective {
    AssessmentObjective::parse_label(candidate).unwrap_or(prior)
}

/// 在两侧补空格的文本中按整词查找第一个触发词
fn first_match(padded: &str, triggers: &[String]) -> Option<String> {
    triggers
        .iter()
        .find(|t| padded.contains(&format!(" {} ", t)))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> HeuristicClassifier {
        HeuristicClassifier::default()
    }

    #[test]
    fn test_definition_is_a01() {
        let hint = classifier().heuristic("1. Define force. (1 mark)");
        assert_eq!(hint.label, AssessmentObjective::A01);
        assert_eq!(hint.source, TriggerSource::Recall);
        assert_eq!(hint.trigger.as_deref(), Some("define"));
    }

    #[test]
    fn test_calculation_from_graph_is_a02() {
        let hint = classifier().heuristic("2. Calculate speed from the graph. (2 marks)");
        assert_eq!(hint.label, AssessmentObjective::A02);
        assert_eq!(hint.source, TriggerSource::Analytical);
    }

    #[test]
    fn test_structural_cue_alone_forces_a02() {
        let hint = classifier().heuristic("State the value shown in the table.");
        assert_eq!(hint.label, AssessmentObjective::A02);
        assert_eq!(hint.source, TriggerSource::Structural);
    }

    #[test]
    fn test_default_is_a01() {
        let hint = classifier().heuristic("Newton's first law.");
        assert_eq!(hint.label, AssessmentObjective::A01);
        assert_eq!(hint.source, TriggerSource::Default);
    }

    #[test]
    fn test_arabic_triggers() {
        let c = classifier();
        assert_eq!(c.classify("عرِّف القوة."), AssessmentObjective::A01);
        assert_eq!(c.classify("أحسب السرعة."), AssessmentObjective::A02);
        assert_eq!(c.classify("ادرس الشكل المجاور"), AssessmentObjective::A02);
    }

    #[test]
    fn test_whole_word_matching() {
        // "stated" 不应命中 "state"，"statement" 也不应命中
        let hint = classifier().heuristic("The statement was restated.");
        assert_eq!(hint.source, TriggerSource::Default);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let c = classifier();
        let text = "Explain why the current decreases when resistance increases.";
        let first = c.classify(text);
        for _ in 0..10 {
            assert_eq!(c.classify(text), first);
        }
    }

    #[test]
    fn test_reconcile_prefers_valid_model_label() {
        let hint = classifier().heuristic("Define force.");
        assert_eq!(reconcile("A02", &hint), (AssessmentObjective::A02, true));
        assert_eq!(reconcile("A01/A02", &hint), (AssessmentObjective::A01A02, true));
        assert_eq!(reconcile("level 3", &hint), (AssessmentObjective::A01, false));
    }

    #[test]
    fn test_needs_reclassification_only_for_a01_with_cue() {
        let c = classifier();
        let text = "Use the graph to state the speed.";
        assert!(c.needs_reclassification(AssessmentObjective::A01, text));
        assert!(!c.needs_reclassification(AssessmentObjective::A02, text));
        assert!(!c.needs_reclassification(AssessmentObjective::A01, "Define force."));
    }

    #[test]
    fn test_adopt_reclassification_keeps_prior_on_invalid() {
        assert_eq!(
            adopt_reclassification(AssessmentObjective::A01, "A01/A02"),
            AssessmentObjective::A01A02
        );
        assert_eq!(
            adopt_reclassification(AssessmentObjective::A01, "unsure"),
            AssessmentObjective::A01
        );
    }

    #[test]
    fn test_custom_policy() {
        let policy = ClassifierPolicy::new(&["ponder"], &["recite"], r"\bmap\b", r"\bmap\b").unwrap();
        let c = HeuristicClassifier::new(policy);
        assert_eq!(c.classify("Ponder the question"), AssessmentObjective::A02);
        assert_eq!(c.classify("Calculate x"), AssessmentObjective::A01);
    }
}
