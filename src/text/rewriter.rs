//! 结构改写器
//!
//! 在归一化文本上按固定顺序执行改写阶段，每个阶段的输出作为下一阶段的输入：
//! 1. 删除控制字符（删除后重新归一化，控制字符两侧的字符可能需要组合）
//! 2. 禁用字符转全角（冒号在此之后只以全角形式出现）
//! 3. 保留设备名加 `_` 前缀
//! 4. 波浪线 / 省略号统一
//! 5. 冒号空白统一
//! 6. 卷号改写

use crate::text::normalizer::Normalizer;
use crate::text::rules::{
    escape_forbidden, is_stripped_control, COLON_SPACING, RESERVED_NAMES, SYMBOL_REMAP,
    VOLUME_RULES,
};
use crate::text::types::RuleStage;

/// 改写器（无状态，规则表为进程级常量）
#[derive(Debug, Clone, Copy, Default)]
pub struct Rewriter;

impl Rewriter {
    pub fn new() -> Self {
        Self
    }

    /// 改写文本
    pub fn rewrite(&self, text: &str) -> String {
        self.rewrite_traced(text).0
    }

    /// 改写文本，同时返回实际改动了文本的阶段
    pub fn rewrite_traced(&self, text: &str) -> (String, Vec<RuleStage>) {
        let mut stages = Vec::new();
        if text.is_empty() {
            return (String::new(), stages);
        }

        let mut current = text.to_string();
        for stage in RuleStage::REWRITE_ORDER {
            if let Some(next) = self.apply_stage(stage, &current) {
                if next != current {
                    stages.push(stage);
                    current = next;
                }
            }
        }

        (current, stages)
    }

    /// 执行单个阶段
    ///
    /// 返回 None 表示该阶段不适用
    fn apply_stage(&self, stage: RuleStage, text: &str) -> Option<String> {
        match stage {
            RuleStage::ControlStrip => {
                if text.chars().any(is_stripped_control) {
                    let stripped: String =
                        text.chars().filter(|&ch| !is_stripped_control(ch)).collect();
                    // 例如 "e\u{1}\u{301}" 删除后才能组合为 "é"
                    Some(Normalizer::new().normalize(&stripped))
                } else {
                    None
                }
            }
            RuleStage::ForbiddenEscape => {
                if text.chars().any(|ch| escape_forbidden(ch).is_some()) {
                    Some(
                        text.chars()
                            .map(|ch| escape_forbidden(ch).unwrap_or(ch))
                            .collect(),
                    )
                } else {
                    None
                }
            }
            RuleStage::ReservedGuard => {
                if RESERVED_NAMES.contains(text) {
                    Some(format!("_{}", text))
                } else {
                    None
                }
            }
            RuleStage::SymbolRemap => {
                if SYMBOL_REMAP.is_match(text) {
                    Some(SYMBOL_REMAP.apply(text))
                } else {
                    None
                }
            }
            RuleStage::ColonSpacing => {
                if text.contains(|ch: char| ch == ':' || ch == '：') {
                    Some(COLON_SPACING.apply(text))
                } else {
                    None
                }
            }
            RuleStage::VolumeNumber => VOLUME_RULES.apply(text).map(|(rewritten, kind)| {
                tracing::trace!("卷号规则命中: {:?}", kind);
                rewritten
            }),
            // 归一化不属于改写器
            RuleStage::Normalize => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(text: &str) -> String {
        Rewriter::new().rewrite(text)
    }

    #[test]
    fn test_volume_examples() {
        assert_eq!(rewrite("Title＞ 6"), "Title＞ 6巻");
        assert_eq!(rewrite("Title(6)"), "Title 6巻");
        assert_eq!(rewrite("Title: 6"), "Title 6巻");
        assert_eq!(rewrite("Title:6巻"), "Title 6巻");
        assert_eq!(rewrite("Title>6"), "Title＞ 6巻");
    }

    #[test]
    fn test_forbidden_escape() {
        let out = rewrite("a:b");
        assert!(!out.contains(':'));
        assert_eq!(out, "a： b");
        assert_eq!(rewrite(r#"a/b\c*d?e"f<g|h"#), "a／b＼c＊d？e＂f＜g｜h");
    }

    #[test]
    fn test_symbol_remap() {
        assert_eq!(rewrite("a~b...c"), "a～b…c");
        assert_eq!(rewrite("a〜b"), "a～b");
    }

    #[test]
    fn test_reserved_guard() {
        assert_eq!(rewrite("CON"), "_CON");
        assert_eq!(rewrite("con"), "_con");
        assert_eq!(rewrite("LPT3"), "_LPT3");
        assert_eq!(rewrite("CONAN"), "CONAN");
        assert_eq!(rewrite("_CON"), "_CON");
    }

    #[test]
    fn test_control_strip() {
        assert_eq!(rewrite("a\tb\nc\0"), "abc");
        // 控制字符删除后才做保留名判断
        assert_eq!(rewrite("NU\u{1}L"), "_NUL");
    }

    #[test]
    fn test_control_strip_recomposes() {
        assert_eq!(rewrite("e\u{1}\u{301}"), "\u{e9}");
        assert_eq!(rewrite("\u{1100}\u{1}\u{1161}"), "\u{ac00}");
        // 组合成 ≯ 后不再是禁用字符
        assert_eq!(rewrite("a>\u{1}\u{338}"), "a\u{226f}");
        assert_eq!(rewrite("a>\u{338}"), "a＞\u{338}");
    }

    #[test]
    fn test_empty() {
        assert_eq!(rewrite(""), "");
    }

    #[test]
    fn test_traced_stages() {
        let (out, stages) = Rewriter::new().rewrite_traced("Title: 6");
        assert_eq!(out, "Title 6巻");
        assert_eq!(
            stages,
            vec![RuleStage::ForbiddenEscape, RuleStage::VolumeNumber]
        );

        let (out, stages) = Rewriter::new().rewrite_traced("a:b");
        assert_eq!(out, "a： b");
        assert_eq!(
            stages,
            vec![RuleStage::ForbiddenEscape, RuleStage::ColonSpacing]
        );

        let (_, stages) = Rewriter::new().rewrite_traced("Title 6巻");
        assert!(stages.is_empty());
    }
}
