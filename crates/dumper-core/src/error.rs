use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Source database not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Source database error: {0}")]
    Source(#[from] rusqlite::Error),

    #[error("Write error: {0}")]
    Write(#[from] io::Error),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Header must be a single line: {0:?}")]
    InvalidHeader(String),

    #[error("Config error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl ExportError {
    pub fn io(
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }

    /// 为写入错误补上目标文件路径
    pub fn at(
        self,
        path: impl Into<PathBuf>,
    ) -> Self {
        match self {
            ExportError::Write(source) => ExportError::io(path, source),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_path() {
        let err = ExportError::io("out/migration.sql", io::Error::from(io::ErrorKind::PermissionDenied));
        let text = err.to_string();
        assert!(text.starts_with("IO error on out/migration.sql"), "{}", text);
    }

    #[test]
    fn at_only_rewrites_write_errors() {
        let err = ExportError::Write(io::Error::other("disk full")).at("migration.sql");
        assert!(matches!(err, ExportError::Io { ref path, .. } if path == &PathBuf::from("migration.sql")));

        let err = ExportError::SourceMissing(PathBuf::from("data.db")).at("migration.sql");
        assert!(matches!(err, ExportError::SourceMissing(_)));
    }

    #[test]
    fn missing_source_names_the_path() {
        let err = ExportError::SourceMissing(PathBuf::from("data.db"));
        assert_eq!(err.to_string(), "Source database not found: data.db");
    }
}
