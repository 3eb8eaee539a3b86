// 核心模块导出
pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod filter;
mod paths;

pub use config::{DEFAULT_OUTPUT, DEFAULT_SOURCE, ExportConfig, SYSTEM_EVENTS_DDL};
pub use driver::{DumpSink, DumpSource, LineSource, SQLiteSource, escape_quote, quote_literal};
pub use error::ExportError;
pub use export::{ExportStats, Exporter, run};
pub use filter::{DEFAULT_EXCLUDES, LineFilter, MatchMode, Verdict};
pub use paths::{logs_dir, root_dir, scratch_path};
