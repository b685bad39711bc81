use async_trait::async_trait;

use crate::error::SqlEngineError;
use crate::mysql::MysqlEngine;
use crate::postgres::PostgresEngine;

pub const BINDING_PASSWORD_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedUser {
    pub username: String,
    pub password: String,
}

/// The in-database capability set the broker needs from an engine. One
/// session per broker call: `open` must be paired with `close` on every exit
/// path.
#[async_trait]
pub trait SqlEngine: Send + Sync {
    async fn open(
        &mut self,
        address: &str,
        port: i64,
        db_name: &str,
        username: &str,
        password: &str,
    ) -> Result<(), SqlEngineError>;

    async fn close(&mut self);

    async fn create_user(&self, binding_id: &str, db_name: &str, read_only: bool)
    -> Result<CreatedUser, SqlEngineError>;

    async fn drop_user(&self, binding_id: &str) -> Result<(), SqlEngineError>;

    async fn create_extensions(&self, extensions: &[String]) -> Result<(), SqlEngineError>;

    async fn drop_extensions(&self, extensions: &[String]) -> Result<(), SqlEngineError>;

    /// Drops every role this broker ever created in the database. Run once
    /// after a restore, where the snapshot carries the origin's users.
    async fn reset_state(&self) -> Result<(), SqlEngineError>;

    fn uri(&self, address: &str, port: i64, db_name: &str, username: &str, password: &str) -> String;

    fn jdbc_uri(&self, address: &str, port: i64, db_name: &str, username: &str, password: &str) -> String;
}

/// Constructs the engine matching an RDS engine name. mariadb speaks the
/// mysql wire protocol and shares its engine.
pub trait SqlEngineProvider: Send + Sync {
    fn engine(&self, engine: &str) -> Result<Box<dyn SqlEngine>, SqlEngineError>;
}

pub struct StandardEngineProvider;

impl SqlEngineProvider for StandardEngineProvider {
    fn engine(&self, engine: &str) -> Result<Box<dyn SqlEngine>, SqlEngineError> {
        match engine.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Box::new(PostgresEngine::new())),
            "mysql" | "mariadb" => Ok(Box::new(MysqlEngine::new())),
            other => Err(SqlEngineError::UnsupportedEngine(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_dispatches_by_engine_name() {
        let provider = StandardEngineProvider;
        assert!(provider.engine("postgres").is_ok());
        assert!(provider.engine("MySQL").is_ok());
        assert!(provider.engine("mariadb").is_ok());
        assert!(matches!(
            provider.engine("oracle"),
            Err(SqlEngineError::UnsupportedEngine(_))
        ));
    }
}
