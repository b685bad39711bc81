use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlEngineError {
    #[error("login failed")]
    LoginFailed,

    #[error("sql engine is not open")]
    NotOpen,

    #[error("port {0} is out of range")]
    InvalidPort(i64),

    #[error("sql engine '{0}' is not supported")]
    UnsupportedEngine(String),

    #[error("this sql engine does not support extensions")]
    ExtensionsNotSupported,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqlEngineError {
    /// Maps authentication failures (SQLSTATE class 28, both engines) onto
    /// [`SqlEngineError::LoginFailed`] so the credential sweep can branch on
    /// them.
    pub(crate) fn from_connect(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if code.starts_with("28") {
                    return SqlEngineError::LoginFailed;
                }
            }
        }
        SqlEngineError::Sqlx(err)
    }
}
