//! 宽松的反序列化辅助函数
//!
//! 模型输出中的数字经常以字符串出现（"1"、"Q3"、"2 marks"），
//! 字符串字段也可能是 null 或数字。

use serde::de::{self, Visitor};
use serde::Deserializer;
use std::fmt;

/// 字符串或数字 → 字符串；null → 空字符串
pub fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct LooseStringVisitor;

    impl<'de> Visitor<'de> for LooseStringVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number, boolean or null")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(value.trim().to_string())
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(LooseStringVisitor)
}

/// 数字或含数字的字符串 → `Some(f64)`；无法识别时为 `None`
pub fn loose_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LooseNumberVisitor;

    impl<'de> Visitor<'de> for LooseNumberVisitor {
        type Value = Option<f64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or a string containing a number")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(leading_number(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(Some(value as f64))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value as f64))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            Ok(Some(value))
        }

        fn visit_bool<E: de::Error>(self, _value: bool) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(LooseNumberVisitor)
}

/// 题号 → `Some(u32)`（"3"、"Q3"、"3)"、"٣"）；缺失或无法识别时为 `None`
pub fn loose_ordinal<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = loose_number(deserializer)?;
    Ok(number.and_then(|n| {
        if n >= 1.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
            Some(n as u32)
        } else {
            None
        }
    }))
}

/// 取字符串中第一个数字（支持阿拉伯-印度数字和小数点）
pub fn leading_number(value: &str) -> Option<f64> {
    let mut digits = String::new();
    let mut seen_dot = false;
    for c in value.chars() {
        let ascii = fold_digit(c);
        match ascii {
            Some(d) => digits.push(d),
            None if (c == '.' || c == '٫') && !digits.is_empty() && !seen_dot => {
                seen_dot = true;
                digits.push('.');
            }
            None if digits.is_empty() => continue,
            None => break,
        }
    }
    digits.trim_end_matches('.').parse().ok()
}

/// 阿拉伯-印度数字与 ASCII 数字统一
pub fn fold_digit(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        '\u{0660}'..='\u{0669}' => char::from_digit(c as u32 - 0x0660, 10),
        '\u{06F0}'..='\u{06F9}' => char::from_digit(c as u32 - 0x06F0, 10),
        _ => None,
    }
}
