//! 规范化主引擎
//!
//! 组合归一化器和改写器：原始值 → 归一化 → 改写 → 最终值

use std::fmt::Display;

use crate::text::normalizer::Normalizer;
use crate::text::rewriter::Rewriter;
use crate::text::types::{RuleStage, TransformResult};

/// 文本规范化引擎（可复用，规则表预编译）
#[derive(Debug, Clone, Copy, Default)]
pub struct TextEngine {
    normalizer: Normalizer,
    rewriter: Rewriter,
}

impl TextEngine {
    pub fn new() -> Self {
        Self {
            normalizer: Normalizer::new(),
            rewriter: Rewriter::new(),
        }
    }

    /// 仅归一化
    pub fn normalize(&self, text: &str) -> String {
        self.normalizer.normalize(text)
    }

    /// 仅改写（调用方负责先归一化）
    pub fn rewrite(&self, text: &str) -> String {
        self.rewriter.rewrite(text)
    }

    /// 归一化 + 改写
    pub fn apply(&self, text: &str) -> String {
        self.rewriter.rewrite(&self.normalizer.normalize(text))
    }

    /// 变换字段值
    ///
    /// 纯函数，不可失败。字段缺失或为空时原样返回，changed = false
    pub fn transform(&self, text: Option<&str>) -> TransformResult {
        let Some(original) = text else {
            return TransformResult::unchanged(None);
        };
        if original.is_empty() {
            return TransformResult::unchanged(Some(String::new()));
        }

        let normalized = self.normalizer.normalize(original);
        let mut stages = Vec::new();
        if normalized != original {
            stages.push(RuleStage::Normalize);
        }

        let (rewritten, rewrite_stages) = self.rewriter.rewrite_traced(&normalized);
        stages.extend(rewrite_stages);

        let changed = rewritten != original;
        if changed {
            tracing::debug!("规范化: {:?} -> {:?} ({:?})", original, rewritten, stages);
        }

        TransformResult {
            original: Some(original.to_string()),
            result: Some(rewritten),
            changed,
            stages,
        }
    }

    /// 变换任意可显示的值（先转为字符串）
    pub fn transform_display<T: Display + ?Sized>(&self, value: &T) -> TransformResult {
        let text = value.to_string();
        self.transform(Some(&text))
    }
}
