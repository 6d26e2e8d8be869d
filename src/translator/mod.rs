// Module for SQL translation between MySQL and SQLite

mod create_table_translator;
mod show_columns_translator;

pub use create_table_translator::{CreateTableResult, CreateTableTranslator, RewriteWarning};
pub use show_columns_translator::ShowColumnsTranslator;
