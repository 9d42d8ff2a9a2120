//! 批处理类型定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 记录 ID（由宿主提供，不透明）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub u64);

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 可规范化的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Series,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Series => "series",
        }
    }
}

/// 单条记录的改动提案（至少一个字段有改动）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedChange {
    pub book_id: BookId,
    pub old_title: Option<String>,
    pub new_title: Option<String>,
    pub old_series: Option<String>,
    pub new_series: Option<String>,
}

impl ProposedChange {
    /// 字段是否有改动
    pub fn changes(&self, field: Field) -> bool {
        match field {
            Field::Title => self.old_title != self.new_title,
            Field::Series => self.old_series != self.new_series,
        }
    }

    /// 字段的新值
    pub fn new_value(&self, field: Field) -> Option<&str> {
        match field {
            Field::Title => self.new_title.as_deref(),
            Field::Series => self.new_series.as_deref(),
        }
    }

    /// 字段的旧值（回滚用）
    pub fn old_value(&self, field: Field) -> Option<&str> {
        match field {
            Field::Title => self.old_title.as_deref(),
            Field::Series => self.old_series.as_deref(),
        }
    }

    /// 有改动的字段
    pub fn changed_fields(&self) -> Vec<Field> {
        [Field::Title, Field::Series]
            .into_iter()
            .filter(|f| self.changes(*f))
            .collect()
    }

    /// 人类可读的描述
    pub fn describe(&self) -> String {
        let mut lines = vec![format!("ID {}:", self.book_id)];
        if self.changes(Field::Title) {
            lines.push(format!(
                "  Title: \"{}\" -> \"{}\"",
                self.old_title.as_deref().unwrap_or(""),
                self.new_title.as_deref().unwrap_or("")
            ));
        }
        if self.changes(Field::Series) {
            lines.push(format!(
                "  Series: \"{}\" -> \"{}\"",
                self.old_series.as_deref().unwrap_or(""),
                self.new_series.as_deref().unwrap_or("")
            ));
        }
        lines.join("\n")
    }
}

/// 写回失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyFailure {
    pub book_id: BookId,
    pub error: String,
}

/// 批处理报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// 来源标记
    pub source: String,
    /// 处理的记录数
    pub processed: usize,
    /// 有改动的记录数
    pub changed: usize,
    /// 写回成功的记录数
    pub applied: usize,
    /// 写回失败的记录
    pub failures: Vec<ApplyFailure>,
}

impl BatchReport {
    /// 是否全部成功
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// 摘要：`Applied: N  Failed: M` + 每条失败
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Applied: {}  Failed: {}",
            self.applied,
            self.failures.len()
        )];
        for failure in &self.failures {
            lines.push(format!("ID {} failed: {}", failure.book_id, failure.error));
        }
        lines.join("\n")
    }
}
