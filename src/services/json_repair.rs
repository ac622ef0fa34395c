//! JSON 修复服务 - 业务能力层
//!
//! 模型常见的格式问题：代码块包裹、前后夹杂说明文字、中文/智能引号、
//! 阿拉伯逗号、尾逗号、行尾漏逗号。`repair` 按固定顺序做尽力而为的语法修正，
//! 不保证语义正确。

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::MalformedOutput;

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome<T> {
    pub value: T,
    /// 是否经过了 `repair` 才解析成功
    pub repaired: bool,
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`{3,}[A-Za-z0-9_-]*").expect("fence pattern"))
}

fn trailing_comma_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[\]}])").expect("trailing comma pattern"))
}

fn missing_comma_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(["\d\]}])([ \t\r]*\n\s*)(["\d\[{-])"#).expect("missing comma pattern")
    })
}

/// 修复常见的 JSON 格式问题
///
/// 步骤顺序固定：
/// 1. 删除控制字符（保留换行与制表符）
/// 2. 去掉代码块标记
/// 3. 截取第一个 `{` 到最后一个 `}` 之间的内容
/// 4. 智能引号 → 普通引号
/// 5. `،` / `，` → `,`
/// 6. 删除 `]` / `}` 前的尾逗号
/// 7. 两个值之间只隔一个换行时补逗号
///
/// 第 6、7 步反复执行直到不再变化，因此 `repair(repair(s)) == repair(s)`。
/// 第 7 步在字符串值本身含换行时可能误补逗号。
pub fn repair(raw: &str) -> String {
    let text = strip_control_chars(raw);
    let text = strip_code_fences(&text);
    let text = isolate_object(&text);
    let text = normalize_quotes(&text);
    let text = normalize_separators(&text);

    let mut current = text;
    loop {
        let next = insert_missing_commas(&remove_trailing_commas(&current));
        if next == current {
            // 删除逗号后首尾可能露出空白
            return current.trim().to_string();
        }
        current = next;
    }
}

fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn strip_code_fences(text: &str) -> String {
    fence_regex().replace_all(text, "").trim().to_string()
}

fn isolate_object(text: &str) -> String {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
            other => other,
        })
        .collect()
}

fn normalize_separators(text: &str) -> String {
    text.replace(['\u{060C}', '\u{FF0C}'], ",")
}

fn remove_trailing_commas(text: &str) -> String {
    trailing_comma_regex().replace_all(text, "$1").into_owned()
}

fn insert_missing_commas(text: &str) -> String {
    missing_comma_regex().replace_all(text, "$1,$2$3").into_owned()
}

/// 先严格解析，失败后修复并再解析一次
pub fn parse_structured(raw: &str) -> Result<ParseOutcome<Value>, MalformedOutput> {
    parse_structured_as::<Value>(raw)
}

/// 解析为具体类型；类型不匹配同样视为解析失败
///
/// 严格解析成功时不会调用 `repair`。
pub fn parse_structured_as<T: DeserializeOwned>(
    raw: &str,
) -> Result<ParseOutcome<T>, MalformedOutput> {
    let strict_error = match serde_json::from_str::<T>(raw) {
        Ok(value) => {
            return Ok(ParseOutcome {
                value,
                repaired: false,
            })
        }
        Err(e) => e.to_string(),
    };

    let repaired = repair(raw);
    match serde_json::from_str::<T>(&repaired) {
        Ok(value) => {
            warn!("🔧 严格解析失败 ({}), 修复后解析成功", strict_error);
            Ok(ParseOutcome {
                value,
                repaired: true,
            })
        }
        Err(e) => Err(MalformedOutput {
            strict_error,
            repaired_error: e.to_string(),
            raw: raw.to_string(),
        }),
    }
}
