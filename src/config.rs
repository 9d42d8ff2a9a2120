// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::library::Field;

/// 配置目录名
const APP_DIR_NAME: &str = "TitleNormalizer";

/// 默认提案文件名（批量写回失败时导出）
const DEFAULT_PROPOSALS_FILE: &str = "proposed_changes.json";

// ============================================================================
// 规范化配置
// ============================================================================

/// 规范化配置
///
/// 只影响批处理层，文本引擎本身没有可配置项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// 参与规范化的字段（默认 title + series）
    #[serde(default = "default_fields")]
    pub fields: Vec<Field>,
    /// 写回失败时是否导出提案文件（默认启用）
    #[serde(default = "default_write_proposals_on_failure")]
    pub write_proposals_on_failure: bool,
    /// 提案文件路径，None 时放在配置文件旁边
    #[serde(default)]
    pub proposals_file: Option<PathBuf>,
    /// 批处理报告的来源标记
    #[serde(default = "default_source_tag")]
    pub source_tag: String,
}

fn default_fields() -> Vec<Field> {
    vec![Field::Title, Field::Series]
}

fn default_write_proposals_on_failure() -> bool {
    true
}

fn default_source_tag() -> String {
    "title-normalizer".to_string()
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl NormalizerConfig {
    pub fn new() -> Self {
        Self {
            fields: default_fields(),
            write_proposals_on_failure: default_write_proposals_on_failure(),
            proposals_file: None,
            source_tag: default_source_tag(),
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法获取配置目录"))?;
        let app_dir = config_dir.join(APP_DIR_NAME);
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("config.json"))
    }

    /// 从默认位置加载
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// 从指定路径加载
    ///
    /// 文件不存在时返回默认配置；整体解析失败时逐字段恢复
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::info!("尝试从以下路径加载配置: {:?}", path);

        if !path.exists() {
            tracing::warn!("配置文件不存在，返回默认配置");
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let v: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("配置文件不是合法 JSON: {}", path.display()))?;

        let config = match serde_json::from_value::<NormalizerConfig>(v.clone()) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("直接解析配置失败，尝试逐字段恢复: {}", e);
                let mut cfg = NormalizerConfig::new();

                if let Some(fields) = v.get("fields") {
                    if let Ok(fields) = serde_json::from_value(fields.clone()) {
                        tracing::info!("成功恢复 fields");
                        cfg.fields = fields;
                    }
                }
                if let Some(flag) = v.get("write_proposals_on_failure").and_then(|f| f.as_bool()) {
                    cfg.write_proposals_on_failure = flag;
                }
                if let Some(file) = v.get("proposals_file").and_then(|f| f.as_str()) {
                    cfg.proposals_file = Some(PathBuf::from(file));
                }
                if let Some(tag) = v.get("source_tag").and_then(|t| t.as_str()) {
                    cfg.source_tag = tag.to_string();
                }

                cfg
            }
        };

        tracing::info!("配置加载成功");
        Ok(config)
    }

    /// 保存到默认位置
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// 保存到指定路径（原子写入）
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tracing::info!("保存配置到: {:?}", path);
        write_atomic(path, &content)
    }

    /// 解析提案文件路径
    ///
    /// 未配置时放在 `base_dir` 下
    pub fn resolve_proposals_path(&self, base_dir: &Path) -> PathBuf {
        match &self.proposals_file {
            Some(file) if file.is_absolute() => file.clone(),
            Some(file) => base_dir.join(file),
            None => base_dir.join(DEFAULT_PROPOSALS_FILE),
        }
    }

    /// 是否处理该字段
    pub fn handles(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }
}

/// 原子写入：先写临时文件，再原子替换
///
/// 1. 如果目标文件存在，先备份到 .bak
/// 2. 重命名临时文件到目标文件
/// 3. 删除备份文件
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("json.tmp");
    let backup_path = path.with_extension("json.bak");

    std::fs::write(&temp_path, content).map_err(|e| {
        tracing::error!("写入临时文件失败: {}", e);
        e
    })?;

    if path.exists() {
        if backup_path.exists() {
            let _ = std::fs::remove_file(&backup_path);
        }
        std::fs::rename(path, &backup_path).map_err(|e| {
            tracing::error!("备份旧文件失败: {}", e);
            e
        })?;
    }

    match std::fs::rename(&temp_path, path) {
        Ok(_) => {
            let _ = std::fs::remove_file(&backup_path);
            Ok(())
        }
        Err(e) => {
            tracing::error!("重命名临时文件失败: {}", e);
            if backup_path.exists() {
                if let Err(restore_err) = std::fs::rename(&backup_path, path) {
                    tracing::error!("恢复备份失败: {}", restore_err);
                } else {
                    tracing::info!("已从备份恢复");
                }
            }
            Err(e.into())
        }
    }
}
