//! 文本规范化类型定义

use serde::{Deserialize, Serialize};

/// 改写阶段
///
/// 顺序即执行顺序，后面的阶段依赖前面阶段的输出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStage {
    /// Unicode 归一化（NFKC + 全角空格）
    Normalize,
    /// 控制字符删除（U+0000 - U+001F）
    ControlStrip,
    /// 文件系统禁用字符转全角
    ForbiddenEscape,
    /// 保留设备名加前缀（CON、NUL 等）
    ReservedGuard,
    /// 波浪线 / 省略号统一
    SymbolRemap,
    /// 冒号前后空白统一
    ColonSpacing,
    /// 卷号改写（追加「巻」）
    VolumeNumber,
}

impl RuleStage {
    /// 改写器的全部阶段（不含 Normalize）
    pub const REWRITE_ORDER: [RuleStage; 6] = [
        RuleStage::ControlStrip,
        RuleStage::ForbiddenEscape,
        RuleStage::ReservedGuard,
        RuleStage::SymbolRemap,
        RuleStage::ColonSpacing,
        RuleStage::VolumeNumber,
    ];
}

/// 单次变换结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformResult {
    /// 原始值（None 表示字段缺失）
    pub original: Option<String>,
    /// 变换后的值
    pub result: Option<String>,
    /// 是否有改动
    pub changed: bool,
    /// 实际改动了文本的阶段
    pub stages: Vec<RuleStage>,
}

impl TransformResult {
    /// 创建无修改的结果
    pub fn unchanged(original: Option<String>) -> Self {
        Self {
            result: original.clone(),
            original,
            changed: false,
            stages: Vec::new(),
        }
    }

    /// 变换后的文本，字段缺失时为空串
    pub fn text(&self) -> &str {
        self.result.as_deref().unwrap_or("")
    }
}
