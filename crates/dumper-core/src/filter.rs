use serde::{Deserialize, Serialize};

/// 默认排除：自增序列表、事务开始、事务提交
pub const DEFAULT_EXCLUDES: [&str; 3] = ["sqlite_sequence", "BEGIN", "COMMIT"];

const TRANSACTION_KEYWORDS: [&str; 4] = ["BEGIN", "COMMIT", "END", "ROLLBACK"];

/// 排除规则的匹配方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// 行内任意位置包含即排除
    #[default]
    Contains,
    /// 忽略字符串字面量，事务关键字只匹配语句开头
    Statement,
}

/// 单行判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Skip,
    /// 被子串规则排除，但按语句规则应当保留（可能误删数据行）
    Suspicious,
}

#[derive(Debug, Clone)]
pub struct LineFilter {
    patterns: Vec<String>,
    mode: MatchMode,
}

impl Default for LineFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDES, MatchMode::default())
    }
}

impl LineFilter {
    pub fn new<I, S>(
        patterns: I,
        mode: MatchMode,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // 空模式会匹配所有行
        let patterns = patterns
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.is_empty())
            .collect();
        Self { patterns, mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn excludes(
        &self,
        line: &str,
    ) -> bool {
        match self.mode {
            MatchMode::Contains => self.matches_contains(line),
            MatchMode::Statement => self.matches_statement(line),
        }
    }

    pub fn check(
        &self,
        line: &str,
    ) -> Verdict {
        if !self.excludes(line) {
            Verdict::Keep
        } else if self.mode == MatchMode::Contains && !self.matches_statement(line) {
            Verdict::Suspicious
        } else {
            Verdict::Skip
        }
    }

    fn matches_contains(
        &self,
        line: &str,
    ) -> bool {
        self.patterns.iter().any(|p| line.contains(p.as_str()))
    }

    fn matches_statement(
        &self,
        line: &str,
    ) -> bool {
        let code = strip_literals(line);
        let leading = leading_keyword(&code);
        self.patterns.iter().any(|p| {
            if is_transaction_keyword(p) {
                leading.eq_ignore_ascii_case(p)
            } else {
                code.contains(p.as_str())
            }
        })
    }
}

fn is_transaction_keyword(pattern: &str) -> bool {
    TRANSACTION_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(pattern))
}

fn leading_keyword(code: &str) -> &str {
    code.trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or("")
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Literal,
    Identifier,
}

/// 去掉单引号字符串字面量，双引号标识符原样保留（其中的单引号不算字面量）
///
/// '' 与 "" 转义都会被当作两段相邻的字面量/标识符处理
fn strip_literals(line: &str) -> String {
    let mut code = String::with_capacity(line.len());
    let mut state = Scan::Code;
    for c in line.chars() {
        state = match (state, c) {
            (Scan::Code, '\'') => Scan::Literal,
            (Scan::Literal, '\'') => Scan::Code,
            (Scan::Literal, _) => Scan::Literal,
            (Scan::Code, '"') => {
                code.push(c);
                Scan::Identifier
            }
            (Scan::Identifier, '"') => {
                code.push(c);
                Scan::Code
            }
            (state, _) => {
                code.push(c);
                state
            }
        };
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_drops_control_and_sequence_lines() {
        let filter = LineFilter::default();
        assert!(filter.excludes("BEGIN TRANSACTION;"));
        assert!(filter.excludes("COMMIT;"));
        assert!(filter.excludes("DELETE FROM \"sqlite_sequence\";"));
        assert!(filter.excludes("INSERT INTO \"sqlite_sequence\" VALUES('t',3);"));
        assert!(!filter.excludes("CREATE TABLE t (x);"));
        assert!(!filter.excludes("INSERT INTO \"t\" VALUES(1);"));
    }

    #[test]
    fn contains_mode_matches_inside_values() {
        let filter = LineFilter::default();
        let line = "INSERT INTO \"notes\" VALUES('BEGIN here');";
        assert!(filter.excludes(line));
        assert_eq!(filter.check(line), Verdict::Suspicious);
    }

    #[test]
    fn contains_mode_is_case_sensitive() {
        let filter = LineFilter::default();
        assert!(!filter.excludes("begin;"));
        assert!(!filter.excludes("INSERT INTO \"t\" VALUES('committed');"));
    }

    #[test]
    fn plain_skips_are_not_suspicious() {
        let filter = LineFilter::default();
        assert_eq!(filter.check("BEGIN TRANSACTION;"), Verdict::Skip);
        assert_eq!(filter.check("COMMIT;"), Verdict::Skip);
        assert_eq!(filter.check("DELETE FROM \"sqlite_sequence\";"), Verdict::Skip);
        assert_eq!(filter.check("CREATE TABLE t (x);"), Verdict::Keep);
    }

    #[test]
    fn statement_mode_keeps_data_rows() {
        let filter = LineFilter::new(DEFAULT_EXCLUDES, MatchMode::Statement);
        assert!(filter.excludes("BEGIN TRANSACTION;"));
        assert!(filter.excludes("COMMIT;"));
        assert!(filter.excludes("INSERT INTO \"sqlite_sequence\" VALUES('t',3);"));
        assert!(!filter.excludes("INSERT INTO \"notes\" VALUES('BEGIN','COMMIT');"));
        assert!(!filter.excludes("INSERT INTO \"notes\" VALUES('sqlite_sequence');"));
        assert_eq!(filter.check("INSERT INTO \"notes\" VALUES('COMMIT');"), Verdict::Keep);
        assert!(!filter.excludes("INSERT INTO \"it's\" VALUES('sqlite_sequence');"));
        assert!(!filter.excludes("INSERT INTO \"it's\" VALUES('BEGIN');"));
    }

    #[test]
    fn statement_mode_keeps_trigger_bodies() {
        let trigger = "CREATE TRIGGER log_t AFTER INSERT ON t BEGIN INSERT INTO log VALUES (new.x); END;";
        assert!(!LineFilter::new(DEFAULT_EXCLUDES, MatchMode::Statement).excludes(trigger));
        assert_eq!(LineFilter::default().check(trigger), Verdict::Suspicious);
    }

    #[test]
    fn escaped_quotes_stay_inside_literal() {
        assert_eq!(strip_literals("VALUES('it''s BEGIN', 2)"), "VALUES(, 2)");
        assert_eq!(leading_keyword("  begin transaction;"), "begin");
        assert_eq!(strip_literals("INSERT INTO \"it's\" VALUES('x')"), "INSERT INTO \"it's\" VALUES()");
        assert_eq!(strip_literals(r#"INSERT INTO "a""b" VALUES('y')"#), r#"INSERT INTO "a""b" VALUES()"#);
    }

    #[test]
    fn empty_patterns_are_ignored() {
        let filter = LineFilter::new(["", "COMMIT"], MatchMode::Contains);
        assert_eq!(filter.patterns(), ["COMMIT"]);
        assert!(!filter.excludes("CREATE TABLE t (x);"));
    }

    #[test]
    fn match_mode_deserializes_snake_case() {
        let mode: MatchMode = serde_json::from_str("\"statement\"").unwrap();
        assert_eq!(mode, MatchMode::Statement);
    }
}
