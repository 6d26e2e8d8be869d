use once_cell::sync::Lazy;
use regex::Regex;

/// `<column> <integer type>[(n)] [UNSIGNED] AUTO_INCREMENT`
static AUTO_INCREMENT_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)("[^"]+"|\w+)\s+(?:tinyint|smallint|mediumint|integer|int|bigint)(?:\s*\(\s*\d+\s*\))?\s+(?:unsigned\s+)?auto_increment\b"#,
    )
    .unwrap()
});

static AUTO_INCREMENT_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bauto_increment\b").unwrap());

/// `, PRIMARY KEY (<anything>)` including the leading comma.
static PRIMARY_KEY_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i),\s*PRIMARY\s+KEY\s*\(([^)]*)\)").unwrap());

const INLINE_PRIMARY_KEY: &str = "integer primary key autoincrement";

/// Something the lexical rewrite could not handle cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteWarning {
    /// `AUTO_INCREMENT` appears in a form the rewrite does not recognize.
    UnmatchedAutoIncrement,
    /// More than one column was turned into a primary key.
    MultipleAutoIncrementColumns(Vec<String>),
    /// A `PRIMARY KEY (...)` clause was kept next to the inlined key.
    ConflictingPrimaryKey { inlined: String, clause: String },
}

impl std::fmt::Display for RewriteWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewriteWarning::UnmatchedAutoIncrement => {
                write!(f, "AUTO_INCREMENT left in place: column declaration not recognized")
            }
            RewriteWarning::MultipleAutoIncrementColumns(columns) => {
                write!(f, "more than one AUTO_INCREMENT column: {}", columns.join(", "))
            }
            RewriteWarning::ConflictingPrimaryKey { inlined, clause } => {
                write!(f, "PRIMARY KEY ({}) kept alongside inlined primary key {}", clause, inlined)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableResult {
    pub sql: String,
    /// Column that received the inlined primary key, as written in the statement.
    pub primary_key_column: Option<String>,
    pub warnings: Vec<RewriteWarning>,
}

pub struct CreateTableTranslator;

impl CreateTableTranslator {
    /// Translate a MySQL CREATE TABLE statement to SQLite.
    ///
    /// Steps, in order: backticks become double quotes, an integer
    /// `AUTO_INCREMENT` column becomes `integer primary key autoincrement`,
    /// and a separate `PRIMARY KEY` clause naming only that column is
    /// dropped. Anything that does not fit those shapes is left alone and
    /// reported in `warnings`.
    pub fn translate(mysql_sql: &str) -> CreateTableResult {
        let quoted = mysql_sql.replace('`', "\"");
        let mut warnings = Vec::new();

        let inlined: Vec<String> = AUTO_INCREMENT_COLUMN
            .captures_iter(&quoted)
            .map(|caps| caps[1].to_string())
            .collect();
        let mut sql = AUTO_INCREMENT_COLUMN
            .replace_all(&quoted, |caps: &regex::Captures| format!("{} {}", &caps[1], INLINE_PRIMARY_KEY))
            .into_owned();

        if AUTO_INCREMENT_KEYWORD.is_match(&sql) {
            warnings.push(RewriteWarning::UnmatchedAutoIncrement);
        }
        if inlined.len() > 1 {
            warnings.push(RewriteWarning::MultipleAutoIncrementColumns(inlined.clone()));
        }

        let primary_key_column = inlined.first().cloned();
        if let Some(column) = &primary_key_column {
            sql = Self::strip_primary_key_clause(&sql, column, &mut warnings);
        }

        CreateTableResult {
            sql,
            primary_key_column,
            warnings,
        }
    }

    fn strip_primary_key_clause(sql: &str, column: &str, warnings: &mut Vec<RewriteWarning>) -> String {
        let wanted = unquote(column);
        let mut result = String::with_capacity(sql.len());
        let mut last = 0;

        for caps in PRIMARY_KEY_CLAUSE.captures_iter(sql) {
            let Some(whole) = caps.get(0) else { continue };
            let clause = caps[1].trim();
            let names: Vec<&str> = clause.split(',').map(|c| unquote(c.trim())).collect();

            result.push_str(&sql[last..whole.start()]);
            let redundant = names.len() == 1 && names[0].eq_ignore_ascii_case(wanted);
            if !redundant {
                result.push_str(whole.as_str());
                warnings.push(RewriteWarning::ConflictingPrimaryKey {
                    inlined: column.to_string(),
                    clause: clause.to_string(),
                });
            }
            last = whole.end();
        }
        result.push_str(&sql[last..]);
        result
    }
}

fn unquote(identifier: &str) -> &str {
    identifier.trim_matches('"')
}
