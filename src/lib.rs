//! 电子书书目字段（标题 / 丛书名）规范化
//!
//! - [`text`]: 纯文本引擎（归一化 + 改写），无 I/O
//! - [`library`]: 宿主书库接口与批处理
//! - [`config`]: 批处理配置

pub mod config;
pub mod library;
pub mod text;

pub use config::NormalizerConfig;
pub use library::{BatchReport, BatchRunner, BookId, Field, LibraryHost, ProposedChange};
pub use text::{
    normalize, normalize_field, rewrite, rewrite_field, transform, transform_display, TextEngine,
    TransformResult,
};
