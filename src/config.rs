use clap::Parser;

use crate::session::PoolOptions;

#[derive(Parser, Debug, Clone)]
#[command(name = "mysqlite")]
#[command(about = "mysqlite - MySQL wire protocol server on top of SQLite", long_about = None)]
pub struct Config {
    // Basic configuration
    #[arg(short, long, default_value = "3306", env = "MYSQLITE_PORT")]
    pub port: u16,

    #[arg(long, default_value = "127.0.0.1", env = "MYSQLITE_BIND", help = "Address the TCP listener binds to")]
    pub bind: String,

    #[arg(short, long, default_value = ".", env = "MYSQLITE_DATA_DIR", help = "Directory holding one SQLite file per database")]
    pub data_dir: String,

    #[arg(long, env = "MYSQLITE_IN_MEMORY", help = "Keep every database in memory (for testing only)")]
    pub in_memory: bool,

    #[arg(long, default_value = "info", env = "MYSQLITE_LOG_LEVEL")]
    pub log_level: String,

    #[arg(long, default_value = "100", env = "MYSQLITE_STATEMENT_CACHE_SIZE", help = "Prepared statements cached per SQLite connection")]
    pub statement_cache_size: usize,

    // SQLite PRAGMA settings
    #[arg(long, default_value = "WAL", env = "MYSQLITE_JOURNAL_MODE", help = "SQLite journal mode (WAL, DELETE, TRUNCATE, etc.)")]
    pub pragma_journal_mode: String,

    #[arg(long, default_value = "NORMAL", env = "MYSQLITE_SYNCHRONOUS", help = "SQLite synchronous mode (NORMAL, FULL, OFF)")]
    pub pragma_synchronous: String,

    #[arg(long, default_value = "-64000", allow_hyphen_values = true, env = "MYSQLITE_CACHE_SIZE", help = "SQLite page cache size (negative for KB, positive for pages)")]
    pub pragma_cache_size: i32,
}

impl Config {
    /// Get a configuration instance with all values resolved from CLI args and environment variables
    pub fn load() -> Self {
        Config::parse()
    }

    pub fn pool_options(&self) -> PoolOptions {
        let mut options = if self.in_memory {
            PoolOptions::in_memory()
        } else {
            PoolOptions::directory(&self.data_dir)
        };
        options.journal_mode = self.pragma_journal_mode.clone();
        options.synchronous = self.pragma_synchronous.clone();
        options.cache_size = self.pragma_cache_size;
        options.statement_cache_size = self.statement_cache_size;
        options
    }
}
