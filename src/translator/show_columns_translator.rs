use once_cell::sync::Lazy;
use regex::Regex;

/// `SHOW COLUMNS FROM <table>` where the table is bare, backticked or double quoted.
static SHOW_COLUMNS_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)SHOW\s+COLUMNS\s+FROM\s+[`"]?(\w+)[`"]?"#).unwrap());

pub struct ShowColumnsTranslator;

impl ShowColumnsTranslator {
    /// Extract the table name targeted by a SHOW COLUMNS statement.
    pub fn table_name(mysql_sql: &str) -> Option<&str> {
        SHOW_COLUMNS_TABLE
            .captures(mysql_sql)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Rewrite `SHOW COLUMNS FROM t ...` into a lookup of the table's stored
    /// CREATE statement. Returns `None` when the table name cannot be captured.
    pub fn translate(mysql_sql: &str) -> Option<String> {
        let table = Self::table_name(mysql_sql)?;
        Some(format!(
            "SELECT sql FROM sqlite_master WHERE tbl_name = '{}'",
            table.replace('\'', "''")
        ))
    }

    /// Textual check for a column inside a stored CREATE statement: the name
    /// must appear quoted with `"`, `'` or a backtick and be followed by whitespace.
    ///
    /// This is not a catalog lookup. A quoted token elsewhere in the
    /// definition (a default value, a CHECK expression) with the same text
    /// and trailing whitespace also counts as a hit.
    pub fn has_column(create_sql: &str, column: &str) -> bool {
        let escaped = regex::escape(column);
        let pattern = format!(r#"(?:"{0}"|'{0}'|`{0}`)\s"#, escaped);
        match Regex::new(&pattern) {
            Ok(re) => re.is_match(create_sql),
            Err(_) => false,
        }
    }
}
