// MySQL wire protocol binding
pub mod mysql_shim;

pub use mysql_shim::MysqlBackend;
