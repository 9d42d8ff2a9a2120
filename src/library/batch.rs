//! 批处理器
//!
//! 流程：选中 ID → 读取字段 → 文本引擎 → 生成提案（dry-run）→ 可选写回 → 报告

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{write_atomic, NormalizerConfig};
use crate::library::types::{ApplyFailure, BatchReport, BookId, Field, ProposedChange};
use crate::library::LibraryHost;
use crate::text::TextEngine;

/// 提案集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proposals {
    /// 处理的记录数（含读取失败的记录）
    pub processed: usize,
    /// 有改动的记录
    pub changes: Vec<ProposedChange>,
}

/// 批处理器
pub struct BatchRunner {
    engine: TextEngine,
    config: NormalizerConfig,
    proposals_path: PathBuf,
}

impl BatchRunner {
    /// 创建批处理器
    ///
    /// # Arguments
    /// * `config` - 规范化配置
    /// * `base_dir` - 提案文件的默认目录
    pub fn new(config: NormalizerConfig, base_dir: &Path) -> Self {
        let proposals_path = config.resolve_proposals_path(base_dir);
        Self {
            engine: TextEngine::new(),
            config,
            proposals_path,
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn proposals_path(&self) -> &Path {
        &self.proposals_path
    }

    /// 生成提案（不写回）
    ///
    /// 没有选中记录时报错；单条记录读取失败只记日志并跳过
    pub fn propose<H: LibraryHost + ?Sized>(&self, host: &H) -> Result<Proposals> {
        let ids = host.selected_ids().context("获取选中记录失败")?;
        if ids.is_empty() {
            bail!("no selection: 没有选中任何记录");
        }

        tracing::info!("开始规范化 {} 条记录", ids.len());

        let mut changes = Vec::new();
        for id in &ids {
            match self.propose_one(host, *id) {
                Ok(Some(change)) => changes.push(change),
                Ok(None) => {}
                Err(e) => tracing::warn!("读取记录 {} 失败，跳过: {:#}", id, e),
            }
        }

        tracing::info!("提案生成完成: {} / {} 条有改动", changes.len(), ids.len());
        Ok(Proposals {
            processed: ids.len(),
            changes,
        })
    }

    fn propose_one<H: LibraryHost + ?Sized>(
        &self,
        host: &H,
        id: BookId,
    ) -> Result<Option<ProposedChange>> {
        let (old_title, new_title) = self.transform_field(host, id, Field::Title)?;
        let (old_series, new_series) = self.transform_field(host, id, Field::Series)?;

        let change = ProposedChange {
            book_id: id,
            old_title,
            new_title,
            old_series,
            new_series,
        };

        if change.changed_fields().is_empty() {
            Ok(None)
        } else {
            Ok(Some(change))
        }
    }

    /// 读取并变换单个字段，未启用的字段原值保留
    fn transform_field<H: LibraryHost + ?Sized>(
        &self,
        host: &H,
        id: BookId,
        field: Field,
    ) -> Result<(Option<String>, Option<String>)> {
        let old = host
            .get_field(id, field)
            .with_context(|| format!("读取 {} 失败", field.name()))?;
        if !self.config.handles(field) {
            return Ok((old.clone(), old));
        }

        let result = self.engine.transform(old.as_deref());
        Ok((result.original, result.result))
    }

    /// 写回提案，只写有改动的字段
    ///
    /// 单条失败记录在报告中，不中断整批。报告的 processed 取自 `proposals`，
    /// 即生成提案时读取的记录数
    pub fn apply<H: LibraryHost + ?Sized>(
        &self,
        host: &mut H,
        proposals: &Proposals,
    ) -> BatchReport {
        let mut applied = 0;
        let mut failures = Vec::new();

        for change in &proposals.changes {
            match self.apply_one(host, change) {
                Ok(()) => applied += 1,
                Err(e) => {
                    tracing::warn!("写回记录 {} 失败: {:#}", change.book_id, e);
                    failures.push(ApplyFailure {
                        book_id: change.book_id,
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        BatchReport {
            source: self.config.source_tag.clone(),
            processed: proposals.processed,
            changed: proposals.changes.len(),
            applied,
            failures,
        }
    }

    /// 写回单条记录的全部改动字段
    ///
    /// 中途失败时把已写入的字段恢复为旧值，记录要么全部更新要么保持原样
    fn apply_one<H: LibraryHost + ?Sized>(&self, host: &mut H, change: &ProposedChange) -> Result<()> {
        let mut written = Vec::new();

        for field in change.changed_fields() {
            if !self.config.handles(field) {
                continue;
            }
            if let Err(e) = host.set_field(change.book_id, field, change.new_value(field)) {
                let err = e.context(format!("写入 {} 失败", field.name()));
                return Err(Self::rollback(host, change, &written, err));
            }
            written.push(field);
        }
        Ok(())
    }

    /// 恢复已写入的字段，结果附加到错误信息
    fn rollback<H: LibraryHost + ?Sized>(
        host: &mut H,
        change: &ProposedChange,
        written: &[Field],
        err: anyhow::Error,
    ) -> anyhow::Error {
        if written.is_empty() {
            return err;
        }

        let mut failed = Vec::new();
        for &field in written {
            if let Err(e) = host.set_field(change.book_id, field, change.old_value(field)) {
                tracing::error!("回滚记录 {} 的 {} 失败: {:#}", change.book_id, field.name(), e);
                failed.push(field.name());
            }
        }

        if failed.is_empty() {
            err.context("已回滚")
        } else {
            err.context(format!("回滚失败，记录部分更新: {}", failed.join(", ")))
        }
    }

    /// 完整流程：生成提案，按需写回
    ///
    /// 写回有失败且配置允许时，把全部提案导出到提案文件以便离线处理
    pub fn run<H: LibraryHost + ?Sized>(
        &self,
        host: &mut H,
        apply: bool,
    ) -> Result<(Proposals, BatchReport)> {
        let proposals = self.propose(host)?;

        if !apply || proposals.changes.is_empty() {
            if proposals.changes.is_empty() {
                tracing::info!("没有需要修改的记录（已规范化或读取失败）");
            }
            let report = BatchReport {
                source: self.config.source_tag.clone(),
                processed: proposals.processed,
                changed: proposals.changes.len(),
                applied: 0,
                failures: Vec::new(),
            };
            return Ok((proposals, report));
        }

        let report = self.apply(host, &proposals);

        if !report.is_success() && self.config.write_proposals_on_failure {
            match write_proposals(&self.proposals_path, &proposals.changes) {
                Ok(()) => tracing::info!("提案已导出到: {:?}", self.proposals_path),
                Err(e) => tracing::error!("导出提案失败: {:#}", e),
            }
        }

        tracing::info!("批处理完成: {}", report.summary().replace('\n', "; "));
        Ok((proposals, report))
    }
}

/// 把提案写成 JSON（原子写入）
pub fn write_proposals(path: &Path, changes: &[ProposedChange]) -> Result<()> {
    let content = serde_json::to_string_pretty(changes)?;
    write_atomic(path, &content).with_context(|| format!("写入提案文件失败: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{MemoryLibrary, MemoryRecord};
    use std::collections::HashSet;

    fn library() -> MemoryLibrary {
        MemoryLibrary::new(vec![
            MemoryRecord::new(1, Some("Ｔｉｔｌｅ（１）"), Some("Ｓｅｒｉｅｓ")),
            MemoryRecord::new(2, Some("Clean Title 2巻"), None),
            MemoryRecord::new(3, Some("Vol：３"), Some("CON")),
        ])
    }

    /// 写入指定 ID 时失败的宿主
    struct FailingHost {
        inner: MemoryLibrary,
        fail_on: HashSet<BookId>,
        /// 只在写该字段时失败，None 表示所有字段
        fail_field: Option<Field>,
    }

    impl FailingHost {
        fn new(fail_on: &[u64]) -> Self {
            Self {
                inner: library(),
                fail_on: fail_on.iter().copied().map(BookId).collect(),
                fail_field: None,
            }
        }
    }

    impl LibraryHost for FailingHost {
        fn selected_ids(&self) -> Result<Vec<BookId>> {
            self.inner.selected_ids()
        }

        fn get_field(&self, id: BookId, field: Field) -> Result<Option<String>> {
            self.inner.get_field(id, field)
        }

        fn set_field(&mut self, id: BookId, field: Field, value: Option<&str>) -> Result<()> {
            if self.fail_on.contains(&id) && self.fail_field.map_or(true, |f| f == field) {
                bail!("record {} is locked", id);
            }
            self.inner.set_field(id, field, value)
        }
    }

    fn runner(dir: &Path) -> BatchRunner {
        BatchRunner::new(NormalizerConfig::new(), dir)
    }

    #[test]
    fn test_propose_only_changed_records() {
        let dir = tempfile::tempdir().unwrap();
        let lib = library();

        let proposals = runner(dir.path()).propose(&lib).unwrap();
        assert_eq!(proposals.processed, 3);
        assert_eq!(proposals.changes.len(), 2);

        let first = &proposals.changes[0];
        assert_eq!(first.book_id, BookId(1));
        assert_eq!(first.new_title.as_deref(), Some("Title 1巻"));
        assert_eq!(first.new_series.as_deref(), Some("Series"));

        let third = &proposals.changes[1];
        assert_eq!(third.new_title.as_deref(), Some("Vol 3巻"));
        assert_eq!(third.new_series.as_deref(), Some("_CON"));
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut lib = library();

        let (proposals, report) = runner(dir.path()).run(&mut lib, false).unwrap();
        assert_eq!(proposals.changes.len(), 2);
        assert_eq!(report.processed, 3);
        assert_eq!(report.changed, 2);
        assert_eq!(report.applied, 0);
        assert_eq!(
            lib.get_field(BookId(1), Field::Title).unwrap().as_deref(),
            Some("Ｔｉｔｌｅ（１）")
        );
    }

    #[test]
    fn test_apply_writes_changes_and_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let mut lib = library();
        let runner = runner(dir.path());

        let (_, report) = runner.run(&mut lib, true).unwrap();
        assert!(report.is_success());
        assert_eq!(report.applied, 2);
        assert_eq!(report.source, "title-normalizer");
        assert_eq!(
            lib.get_field(BookId(3), Field::Series).unwrap().as_deref(),
            Some("_CON")
        );
        // 缺失的字段保持缺失
        assert_eq!(lib.get_field(BookId(2), Field::Series).unwrap(), None);

        // 第二次运行不应再有改动
        let (proposals, _) = runner.run(&mut lib, true).unwrap();
        assert!(proposals.changes.is_empty());
    }

    #[test]
    fn test_title_only_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut lib = library();
        let config = NormalizerConfig {
            fields: vec![Field::Title],
            ..NormalizerConfig::new()
        };
        let runner = BatchRunner::new(config, dir.path());

        runner.run(&mut lib, true).unwrap();
        assert_eq!(
            lib.get_field(BookId(1), Field::Title).unwrap().as_deref(),
            Some("Title 1巻")
        );
        assert_eq!(
            lib.get_field(BookId(1), Field::Series).unwrap().as_deref(),
            Some("Ｓｅｒｉｅｓ")
        );
    }

    #[test]
    fn test_empty_selection_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut lib = library();
        lib.select(Vec::new());

        let err = runner(dir.path()).run(&mut lib, false).unwrap_err();
        assert!(err.to_string().contains("no selection"));
    }

    #[test]
    fn test_unknown_id_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut lib = library();
        lib.select(vec![BookId(1), BookId(99)]);

        let proposals = runner(dir.path()).propose(&lib).unwrap();
        assert_eq!(proposals.processed, 2);
        assert_eq!(proposals.changes.len(), 1);
    }

    #[test]
    fn test_failures_are_reported_and_exported() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FailingHost::new(&[3]);
        let runner = runner(dir.path());

        let (_, report) = runner.run(&mut host, true).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].book_id, BookId(3));
        assert!(report.failures[0].error.contains("locked"));

        let exported = std::fs::read_to_string(runner.proposals_path()).unwrap();
        let parsed: Vec<ProposedChange> = serde_json::from_str(&exported).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(exported.contains("Title 1巻"));
    }

    #[test]
    fn test_no_export_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FailingHost::new(&[1]);
        let config = NormalizerConfig {
            write_proposals_on_failure: false,
            ..NormalizerConfig::new()
        };
        let runner = BatchRunner::new(config, dir.path());

        let (_, report) = runner.run(&mut host, true).unwrap();
        assert!(!report.is_success());
        assert!(!runner.proposals_path().exists());
    }

    #[test]
    fn test_partial_write_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FailingHost {
            fail_field: Some(Field::Series),
            ..FailingHost::new(&[1])
        };

        let (_, report) = runner(dir.path()).run(&mut host, true).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].error.contains("已回滚"));
        assert!(report.failures[0].error.contains("locked"));

        // 标题写入成功后系列失败，标题恢复原值
        assert_eq!(
            host.get_field(BookId(1), Field::Title).unwrap().as_deref(),
            Some("Ｔｉｔｌｅ（１）")
        );
        assert_eq!(
            host.get_field(BookId(1), Field::Series).unwrap().as_deref(),
            Some("Ｓｅｒｉｅｓ")
        );
    }

    #[test]
    fn test_first_field_failure_needs_no_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FailingHost::new(&[3]);

        let (_, report) = runner(dir.path()).run(&mut host, true).unwrap();
        assert!(!report.failures[0].error.contains("回滚"));
    }

    #[test]
    fn test_apply_reports_proposal_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut lib = library();
        lib.select(vec![BookId(1), BookId(2), BookId(3), BookId(99)]);
        let runner = runner(dir.path());

        let proposals = runner.propose(&lib).unwrap();
        let report = runner.apply(&mut lib, &proposals);
        assert_eq!(report.processed, 4);
        assert_eq!(report.changed, 2);
        assert_eq!(report.applied, 2);
    }
}
