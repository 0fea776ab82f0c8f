use uuid::Uuid;

use crate::db::error::{DbError, DbResult};

/// Parse a UUID string from the database, returning a DbError on failure
pub fn parse_uuid(s: &str) -> DbResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::Internal(format!("Invalid UUID in database: {}", e)))
}

pub fn parse_optional_uuid(s: Option<String>) -> DbResult<Option<Uuid>> {
    s.as_deref().map(parse_uuid).transpose()
}

/// Decode an integer enum column, rejecting codes the model doesn't know.
pub fn parse_code<T>(column: &str, code: i64, decode: impl FnOnce(i64) -> Option<T>) -> DbResult<T> {
    decode(code).ok_or_else(|| {
        DbError::Internal(format!("Invalid {} code in database: {}", column, code))
    })
}
