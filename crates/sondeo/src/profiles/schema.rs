//! `SQLite` schema for the profile store.

/// Longest accepted name, in characters.
pub const NOMBRE_MAX_LEN: usize = 100;

/// Longest accepted e-mail address, in characters.
pub const EMAIL_MAX_LEN: usize = 100;

/// Longest accepted phone number, in characters.
pub const TELEFONO_MAX_LEN: usize = 20;

/// SQL statement to create the profiles table.
pub const CREATE_USUARIOS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS usuarios (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL CHECK (length(nombre) <= 100),
    email TEXT NOT NULL UNIQUE CHECK (length(email) <= 100),
    telefono TEXT CHECK (telefono IS NULL OR length(telefono) <= 20)
)
";

/// SQL statement to index profiles by e-mail.
pub const CREATE_EMAIL_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_usuarios_email ON usuarios(email)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USUARIOS_TABLE,
    CREATE_EMAIL_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_usuarios_table_columns() {
        assert!(CREATE_USUARIOS_TABLE.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(CREATE_USUARIOS_TABLE.contains("nombre TEXT NOT NULL"));
        assert!(CREATE_USUARIOS_TABLE.contains("email TEXT NOT NULL UNIQUE"));
        assert!(CREATE_USUARIOS_TABLE.contains("telefono TEXT"));
    }

    #[test]
    fn test_limits_match_table() {
        assert!(CREATE_USUARIOS_TABLE.contains(&format!("length(nombre) <= {NOMBRE_MAX_LEN}")));
        assert!(CREATE_USUARIOS_TABLE.contains(&format!("length(email) <= {EMAIL_MAX_LEN}")));
        assert!(CREATE_USUARIOS_TABLE.contains(&format!("length(telefono) <= {TELEFONO_MAX_LEN}")));
    }
}
