//! Pure derivations from an OSBAPI instance id: cloud resource identifier,
//! database name, master credentials. Nothing here is stored; everything is
//! recomputable from the id and the broker settings.

use rds_broker_core::util::{keyed_hash, random_identifier};

pub const MASTER_USERNAME_LENGTH: usize = 16;
pub const MASTER_PASSWORD_LENGTH: usize = 32;

/// `<prefix>-<instance id>`, restricted to `[A-Za-z0-9-]`.
pub fn db_instance_identifier(db_prefix: &str, instance_id: &str) -> String {
    format!("{}-{}", sanitize_identifier(db_prefix), sanitize_identifier(instance_id))
}

/// `<prefix>_<instance id>`, restricted to `[A-Za-z0-9_]`.
pub fn db_name(db_prefix: &str, instance_id: &str) -> String {
    format!("{}_{}", sanitize_name(db_prefix), sanitize_name(instance_id))
}

pub fn generate_master_username() -> String {
    random_identifier(MASTER_USERNAME_LENGTH)
}

/// Deterministic master password. Recoverable from the seed at any time, so
/// no credential ever needs storing.
pub fn generate_master_password(seed: &str, instance_id: &str) -> String {
    keyed_hash(seed, instance_id, MASTER_PASSWORD_LENGTH)
}

fn sanitize_identifier(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' => Some(c),
            '_' => Some('-'),
            _ => None,
        })
        .collect()
}

fn sanitize_name(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '_' => Some(c),
            '-' => Some('_'),
            _ => None,
        })
        .collect()
}
