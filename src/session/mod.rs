// Module for session management
pub mod handler;
pub mod pool;
pub mod state;

pub use handler::{PreparedStatementInfo, SessionHandler};
pub use pool::{ConnectionPool, DatabaseLocation, PoolLease, PoolOptions, SharedConnection};
pub use state::{OpenTransaction, Session, StatementTable};
