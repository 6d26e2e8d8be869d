/// Classification of an incoming MySQL statement, derived from its leading keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    BeginTransaction,
    Commit,
    CreateTable,
    AlterTable,
    SelectCurrentDatabase,
    ShowTables,
    ShowColumns,
    Unknown,
}

/// Multi-word forms, checked before the single keyword table because their
/// first token (`SELECT`, `CREATE`) would otherwise win.
const PHRASE_PREFIXES: &[(&str, QueryType)] = &[
    ("SELECT DATABASE()", QueryType::SelectCurrentDatabase),
    ("CREATE TABLE", QueryType::CreateTable),
    ("SHOW TABLES", QueryType::ShowTables),
    ("SHOW COLUMNS", QueryType::ShowColumns),
    ("START TRANSACTION", QueryType::BeginTransaction),
    ("ALTER TABLE", QueryType::AlterTable),
];

pub struct QueryTypeDetector;

impl QueryTypeDetector {
    /// Detect the query type. Pure and total: unrecognized text is `Unknown`.
    pub fn detect_query_type(query: &str) -> QueryType {
        let normalized = query.trim().to_ascii_uppercase();

        for (prefix, query_type) in PHRASE_PREFIXES {
            if normalized.starts_with(prefix) {
                return *query_type;
            }
        }

        let first = normalized.split_whitespace().next().unwrap_or("");
        match first {
            "INSERT" => QueryType::Insert,
            "DELETE" => QueryType::Delete,
            "UPDATE" => QueryType::Update,
            "START" => QueryType::BeginTransaction,
            "COMMIT" => QueryType::Commit,
            "SELECT" => QueryType::Select,
            "CREATE" => QueryType::CreateTable,
            _ => QueryType::Unknown,
        }
    }
}
