//! 书目文本规范化层
//!
//! 对标题 / 丛书名做确定性、幂等的规范化。
//!
//! ## 处理流程
//! 1. Unicode 归一化（NFKC）+ 全角空格折叠
//! 2. 删除控制字符
//! 3. 禁用字符转全角
//! 4. 保留设备名保护
//! 5. 符号映射（波浪线、省略号）
//! 6. 冒号空白统一
//! 7. 卷号改写

mod engine;
mod normalizer;
mod rewriter;
mod rules;
mod types;

use std::fmt::Display;

pub use engine::TextEngine;
pub use normalizer::Normalizer;
pub use rewriter::Rewriter;
pub use rules::{VolumeRuleKind, FULLWIDTH_COLON, VOLUME_SUFFIX};
pub use types::{RuleStage, TransformResult};

/// 归一化文本（全角 → 半角）
pub fn normalize(text: &str) -> String {
    Normalizer::new().normalize(text)
}

/// 改写已归一化的文本
pub fn rewrite(text: &str) -> String {
    Rewriter::new().rewrite(text)
}

/// 归一化可缺失的字段
pub fn normalize_field(text: Option<&str>) -> Option<String> {
    text.map(normalize)
}

/// 改写可缺失的字段
pub fn rewrite_field(text: Option<&str>) -> Option<String> {
    text.map(rewrite)
}

/// 归一化 + 改写，并给出是否有改动
pub fn transform(text: Option<&str>) -> TransformResult {
    TextEngine::new().transform(text)
}

/// 变换任意可显示的值
pub fn transform_display<T: Display + ?Sized>(value: &T) -> TransformResult {
    TextEngine::new().transform_display(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_passthrough() {
        assert_eq!(normalize_field(None), None);
        assert_eq!(rewrite_field(None), None);
        assert_eq!(normalize_field(Some("")).as_deref(), Some(""));
        assert_eq!(rewrite_field(Some("")).as_deref(), Some(""));
    }

    #[test]
    fn test_public_properties() {
        assert_eq!(normalize("０１２３"), "0123");
        assert_eq!(normalize("巻　１"), "巻 1");
        assert!(!rewrite("a:b").contains(':'));
        assert_eq!(rewrite("Title＞ 6"), "Title＞ 6巻");
        assert_eq!(rewrite("Title(6)"), "Title 6巻");
        assert_eq!(rewrite("Title: 6"), "Title 6巻");
        assert_eq!(rewrite("a~b...c"), "a～b…c");
        assert_eq!(rewrite("CON"), "_CON");
        assert_eq!(rewrite("con"), "_con");
    }

    #[test]
    fn test_composed_idempotence() {
        for s in ["Ｖｏｌ：　０３", "a...b", "NUL", "x（９）", "x＞９"] {
            let once = rewrite(&normalize(s));
            let twice = rewrite(&normalize(&once));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_transform_wrapper() {
        assert!(transform(Some("０１")).changed);
        assert!(!transform(Some("01")).changed);
        assert!(!transform(None).changed);
        assert_eq!(transform_display(&7u8).text(), "7");
    }
}
