use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;

use dumper_core::{ExportConfig, MatchMode};

/// 示例：构造一个带自增表的数据库并导出迁移文件
fn export_sample(match_mode: MatchMode) {
    let work_dir = PathBuf::from("/tmp/dumper-example");
    let source = work_dir.join("data.db");
    let output = work_dir.join(format!("migration-{:?}.sql", match_mode).to_lowercase());

    // 清除上次运行的结果
    if work_dir.exists() {
        fs::remove_dir_all(&work_dir).unwrap();
    }
    fs::create_dir_all(&work_dir).unwrap();

    let conn = Connection::open(&source).unwrap();
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL);
         CREATE INDEX users_name ON users (name);
         INSERT INTO users (name) VALUES ('alice'), ('bob');
         CREATE TABLE notes (user_id INTEGER, body TEXT);
         INSERT INTO notes VALUES (1, 'BEGIN with coffee'), (2, 'plain note');",
    )
    .unwrap();
    drop(conn);

    let config = ExportConfig {
        source,
        output: output.clone(),
        match_mode,
        ..ExportConfig::default()
    };

    match dumper_core::run(&config) {
        Ok(stats) => {
            println!("✓ 导出成功: {:?}", stats);
            println!("{}", fs::read_to_string(&output).unwrap());
        }
        Err(err) => println!("✗ 导出失败: {}", err),
    }
}

fn main() {
    println!("=== Dumper 导出示例 ===\n");

    println!("示例 1: 默认子串匹配（会丢掉包含 BEGIN 的数据行）");
    println!("----------------------------------------");
    export_sample(MatchMode::Contains);

    println!("示例 2: 语句匹配（保留数据行）");
    println!("----------------------------------------");
    export_sample(MatchMode::Statement);
}
