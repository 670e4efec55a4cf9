//! User profile store.
//!
//! Profiles live in a single `SQLite` table keyed by id, with e-mail
//! addresses unique across the table.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

use schema::{EMAIL_MAX_LEN, NOMBRE_MAX_LEN, TELEFONO_MAX_LEN};

/// A stored user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Row id.
    pub id: i64,
    /// Full name.
    pub nombre: String,
    /// E-mail address, unique.
    pub email: String,
    /// Phone number.
    pub telefono: Option<String>,
}

/// Fields for a new profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    /// Full name.
    pub nombre: String,
    /// E-mail address.
    pub email: String,
    /// Phone number.
    #[serde(default)]
    pub telefono: Option<String>,
}

/// A partial update. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    /// New name.
    pub nombre: Option<String>,
    /// New e-mail address.
    pub email: Option<String>,
    /// New phone number.
    pub telefono: Option<String>,
}

/// `SQLite`-backed profile storage.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    conn: Connection,
}

impl ProfileStore {
    /// Open or create a profile database at the given path.
    ///
    /// Parent directories are created as needed and the schema is migrated
    /// to the current version.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening profile database at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&mut conn)?;

        info!("Profile database ready at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        migrations::initialize_schema(&mut conn)?;
        Ok(Self { path, conn })
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for bad fields and [`Error::ProfileExists`]
    /// if the e-mail address is taken.
    pub fn create(&self, profile: &NewProfile) -> Result<Profile> {
        let nombre = validate_nombre(&profile.nombre)?;
        let email = validate_email(&profile.email)?;
        let telefono = profile
            .telefono
            .as_deref()
            .map(validate_telefono)
            .transpose()?;

        if self.get_by_email(&email)?.is_some() {
            return Err(Error::profile_exists(email));
        }

        self.conn
            .execute(
                "INSERT INTO usuarios (nombre, email, telefono) VALUES (?1, ?2, ?3)",
                params![nombre, email, telefono],
            )
            .map_err(|e| unique_violation(e, &email))?;

        let id = self.conn.last_insert_rowid();
        debug!("Created profile {id}");
        Ok(Profile {
            id,
            nombre,
            email,
            telefono,
        })
    }

    /// Get a profile by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProfileNotFound`] if there is no such profile.
    pub fn get(&self, id: i64) -> Result<Profile> {
        self.conn
            .query_row(
                "SELECT id, nombre, email, telefono FROM usuarios WHERE id = ?1",
                [id],
                Self::row_to_profile,
            )
            .optional()?
            .ok_or(Error::ProfileNotFound { id })
    }

    /// Find a profile by e-mail address.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT id, nombre, email, telefono FROM usuarios WHERE email = ?1",
                [email],
                Self::row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// List profiles ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list(&self, skip: usize, limit: usize) -> Result<Vec<Profile>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, nombre, email, telefono
            FROM usuarios ORDER BY id LIMIT ?1 OFFSET ?2
            ",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let skip = i64::try_from(skip).unwrap_or(i64::MAX);
        let profiles = stmt
            .query_map([limit, skip], Self::row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProfileNotFound`] if the profile is absent,
    /// [`Error::Validation`] for bad fields, and [`Error::ProfileExists`] if
    /// the new e-mail belongs to another profile.
    pub fn update(&self, id: i64, update: &ProfileUpdate) -> Result<Profile> {
        let mut profile = self.get(id)?;

        if let Some(nombre) = &update.nombre {
            profile.nombre = validate_nombre(nombre)?;
        }
        if let Some(email) = &update.email {
            let email = validate_email(email)?;
            if email != profile.email {
                if self.get_by_email(&email)?.is_some() {
                    return Err(Error::profile_exists(email));
                }
                profile.email = email;
            }
        }
        if let Some(telefono) = &update.telefono {
            profile.telefono = Some(validate_telefono(telefono)?);
        }

        self.conn
            .execute(
                "UPDATE usuarios SET nombre = ?1, email = ?2, telefono = ?3 WHERE id = ?4",
                params![profile.nombre, profile.email, profile.telefono, id],
            )
            .map_err(|e| unique_violation(e, &profile.email))?;

        debug!("Updated profile {id}");
        Ok(profile)
    }

    /// Delete a profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProfileNotFound`] if there is no such profile.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM usuarios WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(Error::ProfileNotFound { id });
        }
        debug!("Deleted profile {id}");
        Ok(true)
    }

    /// Number of stored profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM usuarios", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
        Ok(Profile {
            id: row.get(0)?,
            nombre: row.get(1)?,
            email: row.get(2)?,
            telefono: row.get(3)?,
        })
    }
}

/// Map a UNIQUE constraint failure to a conflict on `email`.
fn unique_violation(error: rusqlite::Error, email: &str) -> Error {
    match &error {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            Error::profile_exists(email)
        }
        _ => Error::from(error),
    }
}

fn validate_nombre(nombre: &str) -> Result<String> {
    let nombre = nombre.trim();
    if nombre.is_empty() {
        return Err(Error::validation("El nombre no puede estar vacío"));
    }
    if nombre.chars().count() > NOMBRE_MAX_LEN {
        return Err(Error::validation(format!(
            "El nombre no puede superar {NOMBRE_MAX_LEN} caracteres"
        )));
    }
    Ok(nombre.to_string())
}

fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::validation("El email no puede estar vacío"));
    }
    if !email.contains('@') {
        return Err(Error::validation(format!("El email '{email}' no es válido")));
    }
    if email.chars().count() > EMAIL_MAX_LEN {
        return Err(Error::validation(format!(
            "El email no puede superar {EMAIL_MAX_LEN} caracteres"
        )));
    }
    Ok(email.to_string())
}

fn validate_telefono(telefono: &str) -> Result<String> {
    if telefono.chars().count() > TELEFONO_MAX_LEN {
        return Err(Error::validation(format!(
            "El teléfono no puede superar {TELEFONO_MAX_LEN} caracteres"
        )));
    }
    Ok(telefono.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_profile(nombre: &str, email: &str) -> NewProfile {
        NewProfile {
            nombre: nombre.to_string(),
            email: email.to_string(),
            telefono: None,
        }
    }

    fn store() -> ProfileStore {
        ProfileStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("users.db");
        let store = ProfileStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path);
    }

    #[test]
    fn test_reopen_keeps_profiles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.db");
        {
            let store = ProfileStore::open(&path).unwrap();
            store.create(&new_profile("Ana", "ana@example.com")).unwrap();
        }
        let store = ProfileStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        let created = store
            .create(&NewProfile {
                telefono: Some("555-0101".to_string()),
                ..new_profile("  Ana López ", "ana@example.com")
            })
            .unwrap();

        assert_eq!(created.nombre, "Ana López");
        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.telefono.as_deref(), Some("555-0101"));
    }

    #[test]
    fn test_create_duplicate_email() {
        let store = store();
        store.create(&new_profile("Ana", "ana@example.com")).unwrap();
        let err = store
            .create(&new_profile("Otra", "ana@example.com"))
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(
            err.to_string(),
            "Un usuario con el email 'ana@example.com' ya existe"
        );
    }

    #[test]
    fn test_create_validation() {
        let store = store();
        assert!(store.create(&new_profile("  ", "a@b.c")).unwrap_err().is_validation());
        assert!(store.create(&new_profile("Ana", "")).unwrap_err().is_validation());
        assert!(store
            .create(&new_profile("Ana", "sin-arroba"))
            .unwrap_err()
            .is_validation());
        assert!(store
            .create(&new_profile(&"x".repeat(101), "a@b.c"))
            .unwrap_err()
            .is_validation());
        let long_phone = NewProfile {
            telefono: Some("1".repeat(21)),
            ..new_profile("Ana", "a@b.c")
        };
        assert!(store.create(&long_phone).unwrap_err().is_validation());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_get_missing() {
        let err = store().get(42).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Usuario con ID 42 no encontrado");
    }

    #[test]
    fn test_get_by_email() {
        let store = store();
        let created = store.create(&new_profile("Ana", "ana@example.com")).unwrap();
        assert_eq!(
            store.get_by_email("ana@example.com").unwrap().map(|p| p.id),
            Some(created.id)
        );
        assert!(store.get_by_email("nadie@example.com").unwrap().is_none());
    }

    #[test]
    fn test_list_pagination() {
        let store = store();
        for i in 0..5 {
            store
                .create(&new_profile(&format!("U{i}"), &format!("u{i}@example.com")))
                .unwrap();
        }

        let all = store.list(0, 100).unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));

        let page = store.list(1, 2).unwrap();
        assert_eq!(
            page.iter().map(|p| p.nombre.as_str()).collect::<Vec<_>>(),
            vec!["U1", "U2"]
        );
        assert!(store.list(10, 2).unwrap().is_empty());
    }

    #[test]
    fn test_update_partial() {
        let store = store();
        let created = store
            .create(&NewProfile {
                telefono: Some("111".to_string()),
                ..new_profile("Ana", "ana@example.com")
            })
            .unwrap();

        let updated = store
            .update(
                created.id,
                &ProfileUpdate {
                    nombre: Some("Ana María".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.nombre, "Ana María");
        assert_eq!(updated.email, "ana@example.com");
        assert_eq!(updated.telefono.as_deref(), Some("111"));
        assert_eq!(store.get(created.id).unwrap(), updated);
    }

    #[test]
    fn test_update_same_email_is_not_conflict() {
        let store = store();
        let created = store.create(&new_profile("Ana", "ana@example.com")).unwrap();
        let update = ProfileUpdate {
            email: Some("ana@example.com".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(store.update(created.id, &update).is_ok());
    }

    #[test]
    fn test_update_email_conflict() {
        let store = store();
        store.create(&new_profile("Ana", "ana@example.com")).unwrap();
        let other = store.create(&new_profile("Luis", "luis@example.com")).unwrap();

        let update = ProfileUpdate {
            email: Some("ana@example.com".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(store.update(other.id, &update).unwrap_err().is_conflict());
        assert_eq!(store.get(other.id).unwrap().email, "luis@example.com");
    }

    #[test]
    fn test_update_missing_checked_first() {
        let update = ProfileUpdate {
            nombre: Some(String::new()),
            ..ProfileUpdate::default()
        };
        assert!(store().update(7, &update).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete() {
        let store = store();
        let created = store.create(&new_profile("Ana", "ana@example.com")).unwrap();
        assert!(store.delete(created.id).unwrap());
        assert!(store.get(created.id).unwrap_err().is_not_found());
        assert!(store.delete(created.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let store = store();
        store.create(&new_profile("Ana", "ana@example.com")).unwrap();
        let err = store
            .conn
            .execute(
                "INSERT INTO usuarios (nombre, email) VALUES ('X', 'ana@example.com')",
                [],
            )
            .unwrap_err();
        assert!(unique_violation(err, "ana@example.com").is_conflict());
    }
}
