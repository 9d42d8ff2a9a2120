//! 内存书库
//!
//! JSON 文件 `[{ "id", "title", "series" }, ...]` 的内存实现，供命令行和测试使用

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::write_atomic;
use crate::library::types::{BookId, Field};
use crate::library::LibraryHost;

/// 单条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: BookId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub series: Option<String>,
}

impl MemoryRecord {
    pub fn new(id: u64, title: Option<&str>, series: Option<&str>) -> Self {
        Self {
            id: BookId(id),
            title: title.map(String::from),
            series: series.map(String::from),
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Series => &mut self.series,
        }
    }
}

/// 内存书库
#[derive(Debug, Clone, Default)]
pub struct MemoryLibrary {
    records: Vec<MemoryRecord>,
    /// None 表示选中全部
    selection: Option<Vec<BookId>>,
}

impl MemoryLibrary {
    pub fn new(records: Vec<MemoryRecord>) -> Self {
        Self {
            records,
            selection: None,
        }
    }

    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取书库文件失败: {}", path.display()))?;
        let records: Vec<MemoryRecord> = serde_json::from_str(&content)
            .with_context(|| format!("书库文件格式错误: {}", path.display()))?;
        tracing::info!("已加载 {} 条记录: {:?}", records.len(), path);
        Ok(Self::new(records))
    }

    /// 保存为 JSON 文件（原子写入）
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.records)?;
        write_atomic(path, &content)
    }

    /// 设置选中记录
    pub fn select(&mut self, ids: Vec<BookId>) {
        self.selection = Some(ids);
    }

    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    fn find(&self, id: BookId) -> Result<&MemoryRecord> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("record {} not found", id))
    }
}

impl LibraryHost for MemoryLibrary {
    fn selected_ids(&self) -> Result<Vec<BookId>> {
        Ok(match &self.selection {
            Some(ids) => ids.clone(),
            None => self.records.iter().map(|r| r.id).collect(),
        })
    }

    fn get_field(&self, id: BookId, field: Field) -> Result<Option<String>> {
        let record = self.find(id)?;
        Ok(match field {
            Field::Title => record.title.clone(),
            Field::Series => record.series.clone(),
        })
    }

    fn set_field(&mut self, id: BookId, field: Field, value: Option<&str>) -> Result<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("record {} not found", id))?;
        *record.field_mut(field) = value.map(String::from);
        Ok(())
    }
}
