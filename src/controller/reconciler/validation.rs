//! # Spec Validation
//!
//! Checks a declaration before anything is provisioned:
//! - the effective instance name is a DNS-1035 label of at most 63 characters
//! - the database version is one Cloud SQL supports

use crate::constants::{MAX_INSTANCE_NAME_LEN, SUPPORTED_DATABASE_VERSIONS};
use crate::crd::PostgreSqlSpec;
use regex::Regex;
use std::sync::LazyLock;

static DNS_1035_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$")
        .expect("Failed to compile DNS-1035 label regex - this should never happen")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("instance name {name:?} is {len} characters long, at most {} are allowed", MAX_INSTANCE_NAME_LEN)]
    NameTooLong { name: String, len: usize },

    #[error("instance name {name:?} must consist of lower case alphanumeric characters or '-', start with a letter and end with an alphanumeric character")]
    InvalidName { name: String },

    #[error("database version {version:?} is not supported, expected one of {}", SUPPORTED_DATABASE_VERSIONS.join(", "))]
    UnsupportedVersion { version: String },
}

/// Validate a declaration
///
/// `resource_name` is the `metadata.name` the instance name falls back to.
pub fn validate_spec(spec: &PostgreSqlSpec, resource_name: &str) -> Result<(), ValidationError> {
    validate_instance_name(spec.instance_name(resource_name))?;
    validate_database_version(&spec.sql_instance.database_version)
}

pub fn validate_instance_name(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if len > MAX_INSTANCE_NAME_LEN {
        return Err(ValidationError::NameTooLong {
            name: name.to_string(),
            len,
        });
    }
    if !DNS_1035_LABEL.is_match(name) {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

pub fn validate_database_version(version: &str) -> Result<(), ValidationError> {
    if SUPPORTED_DATABASE_VERSIONS.contains(&version) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedVersion {
            version: version.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::SqlInstanceSpec;

    fn spec(name: &str, version: &str) -> PostgreSqlSpec {
        PostgreSqlSpec {
            sql_instance: SqlInstanceSpec {
                name: name.to_string(),
                database_version: version.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_spec() {
        assert_eq!(validate_spec(&spec("my-instance", "POSTGRES_12"), "pg"), Ok(()));
    }

    #[test]
    fn test_instance_name_falls_back_to_resource_name() {
        assert_eq!(validate_spec(&spec("", "POSTGRES_11"), "orders-db"), Ok(()));
        assert!(matches!(
            validate_spec(&spec("", "POSTGRES_11"), "Orders_DB"),
            Err(ValidationError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_instance_name_length_limit() {
        let ok = "a".repeat(63);
        let too_long = "a".repeat(64);

        assert_eq!(validate_instance_name(&ok), Ok(()));
        assert_eq!(
            validate_instance_name(&too_long),
            Err(ValidationError::NameTooLong {
                name: too_long.clone(),
                len: 64
            })
        );
    }

    #[test]
    fn test_instance_name_must_be_dns_1035_label() {
        for name in ["1db", "db-", "-db", "my.db", "MyDb", ""] {
            assert!(
                validate_instance_name(name).is_err(),
                "{name:?} should be rejected"
            );
        }
        for name in ["a", "db1", "my-db-2"] {
            assert_eq!(validate_instance_name(name), Ok(()), "{name:?}");
        }
    }

    #[test]
    fn test_database_versions() {
        for version in ["POSTGRES_9_6", "POSTGRES_10", "POSTGRES_11", "POSTGRES_12"] {
            assert_eq!(validate_database_version(version), Ok(()));
        }
        assert!(validate_database_version("POSTGRES_13").is_err());
        assert!(validate_database_version("MYSQL_5_7").is_err());
        assert!(validate_database_version("").is_err());
    }
}
