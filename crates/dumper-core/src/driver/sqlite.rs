use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::ExportError;

use super::{DumpSink, DumpSource, escape_quote, quote_literal};

const TABLES_SQL: &str = r#"
SELECT "name", "sql"
FROM "sqlite_master"
WHERE "sql" NOT NULL AND "type" == 'table'
ORDER BY "name"
"#;

const OBJECTS_SQL: &str = r#"
SELECT "name", "sql"
FROM "sqlite_master"
WHERE "sql" NOT NULL AND "type" IN ('index', 'trigger', 'view')
"#;

const SEQUENCE_SQL: &str = r#"
SELECT 'INSERT INTO "sqlite_sequence" VALUES(' || quote("name") || ',' || quote("seq") || ')'
FROM "sqlite_sequence"
"#;

/// 只读打开的 SQLite 数据库，连接随值一起释放
pub struct SQLiteSource {
    conn: Connection,
}

impl SQLiteSource {
    /// 以只读方式打开数据库文件，并校验文件确实是 SQLite 数据库
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ExportError::SourceMissing(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        tracing::debug!("SQLite 已打开: {}", path.display());
        Self::from_connection(conn)
    }

    /// 包装已有连接（例如内存数据库）
    pub fn from_connection(conn: Connection) -> Result<Self, ExportError> {
        // 打开是惰性的，读一次 schema 才能发现非数据库文件
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))?;
        Ok(Self { conn })
    }

    fn schema_entries(
        &self,
        sql: &str,
    ) -> Result<Vec<(String, String)>, ExportError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut entries = vec![];
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn column_names(
        &self,
        table: &str,
    ) -> Result<Vec<String>, ExportError> {
        let sql = format!("PRAGMA table_info(\"{}\")", escape_quote(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;

        let mut columns = vec![];
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    /// 让 SQLite 自己用 quote() 渲染每一行，保证字面量格式与 sqlite3 一致
    fn dump_rows(
        &self,
        table: &str,
        sink: &mut DumpSink<'_>,
    ) -> Result<u64, ExportError> {
        let ident = escape_quote(table);
        let values = self
            .column_names(table)?
            .iter()
            .map(|col| format!("'||quote(\"{}\")||'", escape_quote(col)))
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            "SELECT 'INSERT INTO \"{}\" VALUES({})' FROM \"{}\"",
            ident.replace('\'', "''"),
            values,
            ident
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut count = 0u64;
        while let Some(row) = rows.next()? {
            let insert = row.get::<_, String>(0)?;
            sink(&format!("{};", insert))?;
            count += 1;
        }
        Ok(count)
    }

    fn sequence_statements(&self) -> Result<Vec<String>, ExportError> {
        let mut statements = vec!["DELETE FROM \"sqlite_sequence\";".to_string()];
        let mut stmt = self.conn.prepare(SEQUENCE_SQL)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for row in rows {
            statements.push(format!("{};", row?));
        }
        Ok(statements)
    }
}

impl DumpSource for SQLiteSource {
    fn dump(
        &mut self,
        sink: &mut DumpSink<'_>,
    ) -> Result<(), ExportError> {
        sink("BEGIN TRANSACTION;")?;

        // sqlite_sequence 放到最后，避免建表前就写入序列值
        let mut sequence = vec![];
        let mut writable_schema = false;
        for (name, sql) in self.schema_entries(TABLES_SQL)? {
            if name == "sqlite_sequence" {
                sequence = self.sequence_statements()?;
                continue;
            } else if name == "sqlite_stat1" {
                sink("ANALYZE \"sqlite_master\";")?;
            } else if name.starts_with("sqlite_") {
                continue;
            } else if sql.starts_with("CREATE VIRTUAL TABLE") {
                // 虚拟表直接登记到 sqlite_master，影子表随后按普通表转储
                if !writable_schema {
                    writable_schema = true;
                    sink("PRAGMA writable_schema=ON;")?;
                }
                sink(&format!(
                    "INSERT INTO sqlite_master(type,name,tbl_name,rootpage,sql)VALUES('table',{0},{0},0,{1});",
                    quote_literal(&name),
                    quote_literal(&sql)
                ))?;
            } else {
                sink(&format!("{};", sql))?;
            }

            let rows = self.dump_rows(&name, sink)?;
            tracing::debug!("表 {} 转储完成，共 {} 行", name, rows);
        }

        for (name, sql) in self.schema_entries(OBJECTS_SQL)? {
            tracing::debug!("转储对象: {}", name);
            sink(&format!("{};", sql))?;
        }

        if writable_schema {
            sink("PRAGMA writable_schema=OFF;")?;
        }

        for statement in &sequence {
            sink(statement)?;
        }

        sink("COMMIT;")
    }
}
