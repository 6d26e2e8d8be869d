// Module for query classification and execution
pub mod executor;
pub mod extended;
pub mod query_type_detection;
pub mod result_builder;

pub use executor::QueryExecutor;
pub use extended::ExtendedQueryHandler;
pub use query_type_detection::{QueryType, QueryTypeDetector};
pub use result_builder::{Cell, QueryResult, ResultBuilder, ResultSet};
