// ABOUTME: Identifier validation and quoting helpers shared by both engine adapters
// ABOUTME: Table and column names are interpolated into SQL, so they are checked first

use crate::error::{MigrateError, Result};

/// PostgreSQL truncates identifiers longer than this
const MAX_IDENTIFIER_LEN: usize = 63;

/// Validate a table or column name before it is interpolated into SQL
///
/// Accepts ASCII letters, digits and underscores, not starting with a digit,
/// at most 63 characters.
///
/// # Examples
///
/// ```
/// # use mysql_pg_table_migrator::utils::validate_table_name;
/// assert!(validate_table_name("staff_allocations").is_ok());
/// assert!(validate_table_name("staff; DROP TABLE staff").is_err());
/// assert!(validate_table_name("").is_err());
/// ```
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::config("Identifier cannot be empty"));
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(MigrateError::config(format!(
            "Identifier '{}' is longer than {} characters",
            sanitize_identifier(name),
            MAX_IDENTIFIER_LEN
        )));
    }

    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(MigrateError::config(format!(
            "Invalid identifier '{}': only letters, digits and underscores are allowed",
            sanitize_identifier(name)
        )));
    }

    Ok(())
}

/// Sanitize an identifier for display
///
/// Removes control characters and limits length to prevent log injection.
/// Display only; SQL safety comes from [`validate_table_name`] and quoting.
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Fold a name the way PostgreSQL folds an unquoted identifier
pub fn fold_pg_ident(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Quote a PostgreSQL identifier after case folding.
///
/// MySQL names keep their case (`createdAt`), while a schema created with unquoted
/// DDL only has the folded form (`createdat`).
pub fn quote_pg_ident(name: &str) -> String {
    format!("\"{}\"", fold_pg_ident(name).replace('"', "\"\""))
}

/// Quote a MySQL identifier
pub fn quote_mysql_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
