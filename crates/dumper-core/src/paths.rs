use std::{
    fs::create_dir_all,
    path::{Path, PathBuf},
};

use uuid::Uuid;

/// 获取 dumper 根目录（~/.dumper）
///
/// Fallback: 如果 home_dir 失败，使用 ./.dumper
pub fn root_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".dumper"))
        .unwrap_or_else(|| PathBuf::from(".dumper"))
}

/// 获取日志目录（~/.dumper/logs）
pub fn logs_dir() -> PathBuf {
    let dir = root_dir().join("logs");
    let _ = create_dir_all(&dir);
    dir
}

/// 转储临时文件（{dir}/{output 文件名}.{uuid}.partial），每次导出唯一
pub fn scratch_path(
    dir: &Path,
    output: &Path,
) -> PathBuf {
    let name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dump".into());
    dir.join(format!("{}.{}.partial", name, Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_paths_are_unique_and_inside_dir() {
        let dir = Path::new("/tmp/scratch");
        let first = scratch_path(dir, Path::new("out/migration.sql"));
        let second = scratch_path(dir, Path::new("out/migration.sql"));

        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(dir));
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("migration.sql."), "{}", name);
        assert!(name.ends_with(".partial"), "{}", name);
    }

    #[test]
    fn root_dir_ends_with_dumper() {
        assert!(root_dir().ends_with(".dumper"));
    }
}
