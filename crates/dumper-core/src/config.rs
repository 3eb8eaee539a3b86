use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_EXCLUDES, ExportError, LineFilter, MatchMode, logs_dir};

pub const DEFAULT_SOURCE: &str = "data.db";
pub const DEFAULT_OUTPUT: &str = "migration.sql";

/// 迁移文件首行：辅助事件表
pub const SYSTEM_EVENTS_DDL: &str = "CREATE TABLE IF NOT EXISTS system_events (id INTEGER PRIMARY KEY AUTOINCREMENT, type TEXT, payload TEXT, created_at REAL);";

/// 导出配置（JSON），缺省字段取默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_source")]
    pub source: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_header")]
    pub header: String,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// 转储临时文件目录，默认系统临时目录
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

fn default_source() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE)
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

fn default_header() -> String {
    SYSTEM_EVENTS_DDL.to_string()
}

fn default_exclude() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
            header: default_header(),
            exclude: default_exclude(),
            match_mode: MatchMode::default(),
            log_dir: None,
            scratch_dir: None,
        }
    }
}

impl ExportConfig {
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let content = fs::read_to_string(path).map_err(|err| ExportError::Config {
            path: path.to_path_buf(),
            message: format!("无法读取配置文件: {}", err),
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|err| ExportError::Config {
            path: path.to_path_buf(),
            message: format!("配置文件格式错误: {}", err),
        })?;

        tracing::debug!("配置加载完成: {:?}", config);
        Ok(config)
    }

    pub fn filter(&self) -> LineFilter {
        LineFilter::new(self.exclude.iter().cloned(), self.match_mode)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(logs_dir)
    }
}
