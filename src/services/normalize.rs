//! 文本归一化
//!
//! 检索打分与启发式分类共用：小写、去除变音符号、统一等价字形、
//! 标点转空白、合并空白。纯词袋，不做词干化。

use phf::phf_map;
use std::collections::HashSet;

use crate::models::de::fold_digit;

/// 视觉或读音上等价的字形 → 规范字形
static LETTER_FOLDS: phf::Map<char, char> = phf_map! {
    // 阿拉伯字母
    'أ' => 'ا',
    'إ' => 'ا',
    'آ' => 'ا',
    'ٱ' => 'ا',
    'ى' => 'ي',
    'ئ' => 'ي',
    'ة' => 'ه',
    'ؤ' => 'و',
    'ک' => 'ك',
    'ی' => 'ي',
    'ہ' => 'ه',
    // 带重音的拉丁字母
    'à' => 'a', 'á' => 'a', 'â' => 'a', 'ã' => 'a', 'ä' => 'a', 'å' => 'a',
    'ç' => 'c',
    'è' => 'e', 'é' => 'e', 'ê' => 'e', 'ë' => 'e',
    'ì' => 'i', 'í' => 'i', 'î' => 'i', 'ï' => 'i',
    'ñ' => 'n',
    'ò' => 'o', 'ó' => 'o', 'ô' => 'o', 'õ' => 'o', 'ö' => 'o',
    'ù' => 'u', 'ú' => 'u', 'û' => 'u', 'ü' => 'u',
    'ý' => 'y', 'ÿ' => 'y',
};

/// 需要直接删除的变音符号
fn is_diacritic(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}'   // 拉丁组合附加符号
        | '\u{0610}'..='\u{061A}' // 阿拉伯小符号
        | '\u{064B}'..='\u{065F}' // 短元音符号
        | '\u{0670}'              // 上标 alef
        | '\u{0640}'              // tatweel
        | '\u{06D6}'..='\u{06ED}' // 古兰经标注符号
    )
}

/// 归一化文本
pub fn normalize_text(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if is_diacritic(c) {
            continue;
        }
        let c = fold_digit(c)
            .or_else(|| LETTER_FOLDS.get(&c).copied())
            .unwrap_or(c);
        if c.is_alphanumeric() {
            folded.push(c);
        } else {
            folded.push(' ');
        }
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 归一化后的词集合
pub fn normalized_tokens(text: &str) -> HashSet<String> {
    normalize_text(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_and_whitespace() {
        assert_eq!(normalize_text("  Define   force. (1 mark)\n"), "define force 1 mark");
    }

    #[test]
    fn test_arabic_diacritics_and_letterforms() {
        // "أَحْسُبْ" with harakat and hamza-on-alef
        assert_eq!(normalize_text("أَحْسُبْ"), normalize_text("احسب"));
        assert_eq!(normalize_text("الطاقة"), normalize_text("الطاقه"));
        assert_eq!(normalize_text("إلى"), "الي");
        assert_eq!(normalize_text("السؤال ٣"), "السوال 3");
    }

    #[test]
    fn test_latin_accents() {
        assert_eq!(normalize_text("Énergie cinétique"), "energie cinetique");
    }

    #[test]
    fn test_tokens_are_a_set() {
        let tokens = normalized_tokens("the graph, the GRAPH; the table");
        assert_eq!(tokens.len(), 3);
        assert!(tokens.contains("graph"));
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(normalize_text(" ... "), "");
        assert!(normalized_tokens("!!!").is_empty());
    }
}
