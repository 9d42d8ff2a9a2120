//! 书库批处理层
//!
//! 宿主只需实现 [`LibraryHost`]（列出选中 ID、读字段、写字段），
//! 批处理器负责调用文本引擎、比较前后差异、只写回有改动的字段。

mod batch;
mod memory;
mod types;

pub use batch::{write_proposals, BatchRunner, Proposals};
pub use memory::{MemoryLibrary, MemoryRecord};
pub use types::{ApplyFailure, BatchReport, BookId, Field, ProposedChange};

use anyhow::Result;

/// 宿主书库接口
///
/// 一次性实现，不做运行时探测
pub trait LibraryHost {
    /// 当前选中的记录（有序）
    fn selected_ids(&self) -> Result<Vec<BookId>>;

    /// 读取字段，字段缺失返回 None
    fn get_field(&self, id: BookId, field: Field) -> Result<Option<String>>;

    /// 写入字段
    fn set_field(&mut self, id: BookId, field: Field, value: Option<&str>) -> Result<()>;
}
