pub mod engine;
pub mod error;
pub mod mysql;
pub mod postgres;

pub use engine::{BINDING_PASSWORD_LENGTH, CreatedUser, SqlEngine, SqlEngineProvider, StandardEngineProvider};
pub use error::SqlEngineError;
pub use mysql::MysqlEngine;
pub use postgres::PostgresEngine;
