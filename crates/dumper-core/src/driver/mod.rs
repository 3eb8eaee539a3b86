use crate::ExportError;

mod sqlite;

pub use sqlite::SQLiteSource;

/// 转储输出回调：每条 SQL 语句调用一次
pub type DumpSink<'a> = dyn FnMut(&str) -> Result<(), ExportError> + 'a;

/// 可转储为 SQL 语句序列的数据源
pub trait DumpSource {
    /// 按转储顺序依次把每条语句交给 sink，sink 返回错误时立即中止
    fn dump(
        &mut self,
        sink: &mut DumpSink<'_>,
    ) -> Result<(), ExportError>;
}

/// 固定语句序列，用于注入已知的转储结果
#[derive(Debug, Clone, Default)]
pub struct LineSource {
    lines: Vec<String>,
}

impl LineSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl DumpSource for LineSource {
    fn dump(
        &mut self,
        sink: &mut DumpSink<'_>,
    ) -> Result<(), ExportError> {
        for line in &self.lines {
            sink(line)?;
        }
        Ok(())
    }
}

/// 转义双引号标识符
pub fn escape_quote(s: &str) -> String {
    s.replace('"', "\"\"")
}

/// 单引号字符串字面量
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
