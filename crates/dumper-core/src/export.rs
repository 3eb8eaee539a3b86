use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use crate::{DumpSource, ExportConfig, ExportError, LineFilter, SQLiteSource, Verdict, scratch_path};

/// 导出统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// 转储产生的语句数
    pub read: u64,
    /// 写入迁移文件的语句数（不含首行）
    pub written: u64,
    pub skipped: u64,
    /// skipped 中疑似被误删的数据行
    pub suspicious: u64,
}

/// 转储 → 过滤 → 写出
#[derive(Debug, Clone)]
pub struct Exporter {
    header: String,
    filter: LineFilter,
    scratch_dir: PathBuf,
}

impl Exporter {
    /// header 必须是单行，保证它就是输出文件的第一行
    pub fn new(
        header: impl Into<String>,
        filter: LineFilter,
    ) -> Result<Self, ExportError> {
        let header = header.into();
        if header.contains(['\n', '\r']) {
            return Err(ExportError::InvalidHeader(header));
        }

        Ok(Self {
            header,
            filter,
            scratch_dir: std::env::temp_dir(),
        })
    }

    pub fn from_config(config: &ExportConfig) -> Result<Self, ExportError> {
        let exporter = Self::new(config.header.clone(), config.filter())?;
        Ok(match &config.scratch_dir {
            Some(dir) => exporter.with_scratch_dir(dir.clone()),
            None => exporter,
        })
    }

    /// 转储结果先落在这个目录下的临时文件里
    pub fn with_scratch_dir(
        mut self,
        dir: impl Into<PathBuf>,
    ) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// 写入首行，再写入通过过滤的每条语句，每条后接换行
    pub fn export_to_writer<S, W>(
        &self,
        source: &mut S,
        writer: &mut W,
    ) -> Result<ExportStats, ExportError>
    where
        S: DumpSource + ?Sized,
        W: Write,
    {
        let mut stats = ExportStats::default();
        writeln!(writer, "{}", self.header)?;

        source.dump(&mut |line| {
            stats.read += 1;
            match self.filter.check(line) {
                Verdict::Keep => {
                    writeln!(writer, "{}", line)?;
                    stats.written += 1;
                }
                Verdict::Skip => {
                    stats.skipped += 1;
                    tracing::trace!("跳过: {}", line);
                }
                Verdict::Suspicious => {
                    stats.skipped += 1;
                    stats.suspicious += 1;
                    tracing::warn!("排除规则命中了非控制语句，可能丢失数据: {}", line);
                }
            }
            Ok(())
        })?;

        writer.flush()?;
        Ok(stats)
    }

    /// 写入目标文件（创建或截断）
    ///
    /// 目标先以可写方式打开但不截断，不可写时在转储前失败。转储结果写入临时文件，
    /// 全部成功后才截断目标并拷贝进去，所以符号链接、权限和属主都保持不变。
    /// 转储失败时已有的目标文件不受影响，本次新建的目标文件会被删除。
    pub fn export_to_file<S>(
        &self,
        source: &mut S,
        path: &Path,
    ) -> Result<ExportStats, ExportError>
    where
        S: DumpSource + ?Sized,
    {
        // 1. 检查并打开目标（跟随符号链接）
        let existed = path.exists();
        if existed {
            let meta = fs::metadata(path).map_err(|err| ExportError::io(path, err))?;
            if meta.permissions().readonly() {
                return Err(ExportError::io(
                    path,
                    io::Error::new(io::ErrorKind::PermissionDenied, "目标文件只读"),
                ));
            }
        }
        let mut target = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| ExportError::io(path, err))?;
        let mut created = RemoveOnDrop::new(if existed { None } else { fs::canonicalize(path).ok() });

        // 2. 转储到临时文件
        let scratch_file = scratch_path(&self.scratch_dir, path);
        let scratch = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&scratch_file)
            .map_err(|err| ExportError::io(&scratch_file, err))?;
        let _scratch_guard = RemoveOnDrop::new(Some(scratch_file.clone()));
        let mut writer = BufWriter::new(scratch);

        let stats = self
            .export_to_writer(source, &mut writer)
            .map_err(|err| err.at(&scratch_file))?;

        let mut scratch = writer
            .into_inner()
            .map_err(|err| ExportError::io(&scratch_file, err.into_error()))?;
        scratch
            .seek(SeekFrom::Start(0))
            .map_err(|err| ExportError::io(&scratch_file, err))?;

        // 3. 截断目标并写入
        target.set_len(0).map_err(|err| ExportError::io(path, err))?;
        io::copy(&mut scratch, &mut target).map_err(|err| ExportError::io(path, err))?;
        target.sync_all().map_err(|err| ExportError::io(path, err))?;

        created.disarm();
        Ok(stats)
    }
}

/// 离开作用域时删除文件，除非已 disarm
struct RemoveOnDrop {
    path: Option<PathBuf>,
}

impl RemoveOnDrop {
    fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(err) = fs::remove_file(&path) {
                tracing::warn!("删除临时文件失败 {}: {}", path.display(), err);
            }
        }
    }
}

/// 按配置执行一次完整导出：源库只读打开，导出结束后连接随作用域关闭
pub fn run(config: &ExportConfig) -> Result<ExportStats, ExportError> {
    tracing::info!("开始导出: {} -> {}", config.source.display(), config.output.display());
    let start_time = Instant::now();

    let exporter = Exporter::from_config(config)?;
    let mut source = SQLiteSource::open(&config.source)?;
    let stats = exporter.export_to_file(&mut source, &config.output)?;

    tracing::info!(
        "导出完成，读取 {} 条，写入 {} 条，跳过 {} 条，耗时 {:.1} 秒",
        stats.read,
        stats.written,
        stats.skipped,
        start_time.elapsed().as_secs_f64()
    );
    if stats.suspicious > 0 {
        tracing::warn!(
            "{} 条非控制语句被排除规则删除，可考虑 match_mode = \"statement\"",
            stats.suspicious
        );
    }
    Ok(stats)
}
