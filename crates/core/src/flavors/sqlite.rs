//! SQLite-backed flavor catalog implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::debug;

use super::types::non_blank;
use super::{
    CatalogError, Flavor, FlavorInput, FlavorStep, FlavorStore, LookupInput, LookupItem,
    LookupKind, StepInput,
};
use crate::metrics::CATALOG_WRITES;

const FLAVOR_COLUMNS: &str = "f.id, f.created_datetime_utc, f.slug, f.description,
    (SELECT COUNT(*) FROM humor_flavor_steps s WHERE s.humor_flavor_id = f.id)";

const STEP_COLUMNS: &str = "id, created_datetime_utc, humor_flavor_id, llm_temperature, order_by,
    llm_input_type_id, llm_output_type_id, llm_model_id, humor_flavor_step_type_id,
    llm_system_prompt, llm_user_prompt, description";

/// SQLite-backed flavor catalog.
pub struct SqliteFlavorStore {
    conn: Mutex<Connection>,
}

impl SqliteFlavorStore {
    /// Open the catalog, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        let mut schema = String::from(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS humor_flavors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_datetime_utc TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS humor_flavor_steps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_datetime_utc TEXT NOT NULL,
                humor_flavor_id INTEGER NOT NULL REFERENCES humor_flavors(id) ON DELETE CASCADE,
                llm_temperature REAL,
                order_by INTEGER,
                llm_input_type_id INTEGER,
                llm_output_type_id INTEGER,
                llm_model_id INTEGER,
                humor_flavor_step_type_id INTEGER,
                llm_system_prompt TEXT,
                llm_user_prompt TEXT,
                description TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_humor_flavor_steps_flavor
                ON humor_flavor_steps(humor_flavor_id);
            "#,
        );

        for kind in LookupKind::ALL {
            schema.push_str(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT,
                    slug TEXT,
                    description TEXT
                );\n",
                kind.table()
            ));
        }

        conn.execute_batch(&schema).map_err(db_err)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Database("connection mutex poisoned".to_string()))
    }

    fn fetch_flavor(conn: &Connection, id: i64) -> Result<Flavor, CatalogError> {
        conn.query_row(
            &format!("SELECT {} FROM humor_flavors f WHERE f.id = ?", FLAVOR_COLUMNS),
            params![id],
            Self::row_to_flavor,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| CatalogError::NotFound(format!("Flavor {}", id)))
    }

    fn fetch_step(conn: &Connection, id: i64) -> Result<FlavorStep, CatalogError> {
        conn.query_row(
            &format!("SELECT {} FROM humor_flavor_steps WHERE id = ?", STEP_COLUMNS),
            params![id],
            Self::row_to_step,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| CatalogError::NotFound(format!("Step {}", id)))
    }

    fn row_to_flavor(row: &rusqlite::Row) -> rusqlite::Result<Flavor> {
        let created: String = row.get(1)?;
        Ok(Flavor {
            id: row.get(0)?,
            created_datetime_utc: parse_timestamp(&created),
            slug: row.get(2)?,
            description: row.get(3)?,
            step_count: row.get(4)?,
        })
    }

    fn row_to_step(row: &rusqlite::Row) -> rusqlite::Result<FlavorStep> {
        let created: String = row.get(1)?;
        Ok(FlavorStep {
            id: row.get(0)?,
            created_datetime_utc: parse_timestamp(&created),
            humor_flavor_id: row.get(2)?,
            llm_temperature: row.get(3)?,
            order_by: row.get(4)?,
            llm_input_type_id: row.get(5)?,
            llm_output_type_id: row.get(6)?,
            llm_model_id: row.get(7)?,
            humor_flavor_step_type_id: row.get(8)?,
            llm_system_prompt: row.get(9)?,
            llm_user_prompt: row.get(10)?,
            description: row.get(11)?,
        })
    }

    fn validate_flavor(input: &FlavorInput) -> Result<(String, Option<String>), CatalogError> {
        let slug = input.slug.trim();
        if slug.is_empty() {
            return Err(CatalogError::Validation("Slug is required".to_string()));
        }
        Ok((slug.to_string(), non_blank(input.description.clone())))
    }
}

impl FlavorStore for SqliteFlavorStore {
    fn list_flavors(&self, search: Option<&str>) -> Result<Vec<Flavor>, CatalogError> {
        let conn = self.conn()?;
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM humor_flavors f
                 WHERE ?1 IS NULL
                    OR lower(f.slug) LIKE ?1 ESCAPE '\\'
                    OR lower(COALESCE(f.description, '')) LIKE ?1 ESCAPE '\\'
                    OR CAST(f.id AS TEXT) LIKE ?1 ESCAPE '\\'
                 ORDER BY f.id",
                FLAVOR_COLUMNS
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![pattern], Self::row_to_flavor)
            .map_err(db_err)?;

        let mut flavors = Vec::new();
        for row in rows {
            flavors.push(row.map_err(db_err)?);
        }
        Ok(flavors)
    }

    fn get_flavor(&self, id: i64) -> Result<Flavor, CatalogError> {
        let conn = self.conn()?;
        Self::fetch_flavor(&conn, id)
    }

    fn create_flavor(&self, input: &FlavorInput) -> Result<Flavor, CatalogError> {
        let (slug, description) = Self::validate_flavor(input)?;
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO humor_flavors (created_datetime_utc, slug, description) VALUES (?, ?, ?)",
            params![Utc::now().to_rfc3339(), slug, description],
        )
        .map_err(|e| write_err(e, &slug))?;

        let id = conn.last_insert_rowid();
        debug!("Created flavor {} ({})", id, slug);
        CATALOG_WRITES.with_label_values(&["flavor", "create"]).inc();
        Self::fetch_flavor(&conn, id)
    }

    fn update_flavor(&self, id: i64, input: &FlavorInput) -> Result<Flavor, CatalogError> {
        let (slug, description) = Self::validate_flavor(input)?;
        let conn = self.conn()?;

        let updated = conn
            .execute(
                "UPDATE humor_flavors SET slug = ?, description = ? WHERE id = ?",
                params![slug, description, id],
            )
            .map_err(|e| write_err(e, &slug))?;

        if updated == 0 {
            return Err(CatalogError::NotFound(format!("Flavor {}", id)));
        }
        CATALOG_WRITES.with_label_values(&["flavor", "update"]).inc();
        Self::fetch_flavor(&conn, id)
    }

    fn delete_flavor(&self, id: i64) -> Result<(), CatalogError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        let steps = tx
            .execute(
                "DELETE FROM humor_flavor_steps WHERE humor_flavor_id = ?",
                params![id],
            )
            .map_err(db_err)?;
        let deleted = tx
            .execute("DELETE FROM humor_flavors WHERE id = ?", params![id])
            .map_err(db_err)?;

        if deleted == 0 {
            return Err(CatalogError::NotFound(format!("Flavor {}", id)));
        }
        tx.commit().map_err(db_err)?;

        debug!("Deleted flavor {} and {} steps", id, steps);
        CATALOG_WRITES.with_label_values(&["flavor", "delete"]).inc();
        Ok(())
    }

    fn list_steps(&self, flavor_id: i64) -> Result<Vec<FlavorStep>, CatalogError> {
        let conn = self.conn()?;
        Self::fetch_flavor(&conn, flavor_id)?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM humor_flavor_steps
                 WHERE humor_flavor_id = ?
                 ORDER BY order_by IS NULL, order_by ASC, id ASC",
                STEP_COLUMNS
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![flavor_id], Self::row_to_step)
            .map_err(db_err)?;

        let mut steps = Vec::new();
        for row in rows {
            steps.push(row.map_err(db_err)?);
        }
        Ok(steps)
    }

    fn get_step(&self, id: i64) -> Result<FlavorStep, CatalogError> {
        let conn = self.conn()?;
        Self::fetch_step(&conn, id)
    }

    fn create_step(&self, flavor_id: i64, input: &StepInput) -> Result<FlavorStep, CatalogError> {
        let input = input.clone().normalized();
        let conn = self.conn()?;
        Self::fetch_flavor(&conn, flavor_id)?;

        conn.execute(
            "INSERT INTO humor_flavor_steps (
                created_datetime_utc, humor_flavor_id, llm_temperature, order_by,
                llm_input_type_id, llm_output_type_id, llm_model_id, humor_flavor_step_type_id,
                llm_system_prompt, llm_user_prompt, description
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                Utc::now().to_rfc3339(),
                flavor_id,
                input.llm_temperature,
                input.order_by,
                input.llm_input_type_id,
                input.llm_output_type_id,
                input.llm_model_id,
                input.humor_flavor_step_type_id,
                input.llm_system_prompt,
                input.llm_user_prompt,
                input.description,
            ],
        )
        .map_err(db_err)?;

        let id = conn.last_insert_rowid();
        debug!("Created step {} for flavor {}", id, flavor_id);
        CATALOG_WRITES.with_label_values(&["step", "create"]).inc();
        Self::fetch_step(&conn, id)
    }

    fn update_step(&self, id: i64, input: &StepInput) -> Result<FlavorStep, CatalogError> {
        let input = input.clone().normalized();
        let conn = self.conn()?;

        let updated = conn
            .execute(
                "UPDATE humor_flavor_steps SET
                    llm_temperature = ?, order_by = ?, llm_input_type_id = ?,
                    llm_output_type_id = ?, llm_model_id = ?, humor_flavor_step_type_id = ?,
                    llm_system_prompt = ?, llm_user_prompt = ?, description = ?
                 WHERE id = ?",
                params![
                    input.llm_temperature,
                    input.order_by,
                    input.llm_input_type_id,
                    input.llm_output_type_id,
                    input.llm_model_id,
                    input.humor_flavor_step_type_id,
                    input.llm_system_prompt,
                    input.llm_user_prompt,
                    input.description,
                    id,
                ],
            )
            .map_err(db_err)?;

        if updated == 0 {
            return Err(CatalogError::NotFound(format!("Step {}", id)));
        }
        CATALOG_WRITES.with_label_values(&["step", "update"]).inc();
        Self::fetch_step(&conn, id)
    }

    fn delete_step(&self, id: i64) -> Result<(), CatalogError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM humor_flavor_steps WHERE id = ?", params![id])
            .map_err(db_err)?;

        if deleted == 0 {
            return Err(CatalogError::NotFound(format!("Step {}", id)));
        }
        CATALOG_WRITES.with_label_values(&["step", "delete"]).inc();
        Ok(())
    }

    fn list_lookups(&self, kind: LookupKind) -> Result<Vec<LookupItem>, CatalogError> {
        let conn = self.conn()?;
        let order = match kind {
            LookupKind::LlmModels => "name",
            _ => "id",
        };

        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, name, slug, description FROM {} ORDER BY {}",
                kind.table(),
                order
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(LookupItem {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    slug: row.get(2)?,
                    description: row.get(3)?,
                })
            })
            .map_err(db_err)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row.map_err(db_err)?);
        }
        Ok(items)
    }

    fn add_lookup(
        &self,
        kind: LookupKind,
        input: &LookupInput,
    ) -> Result<LookupItem, CatalogError> {
        let name = non_blank(input.name.clone());
        let slug = non_blank(input.slug.clone());
        if name.is_none() && slug.is_none() {
            return Err(CatalogError::Validation(format!(
                "A name or slug is required for {}",
                kind
            )));
        }
        let description = non_blank(input.description.clone());

        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (name, slug, description) VALUES (?, ?, ?)",
                kind.table()
            ),
            params![name, slug, description],
        )
        .map_err(db_err)?;

        CATALOG_WRITES.with_label_values(&["lookup", "create"]).inc();
        Ok(LookupItem {
            id: conn.last_insert_rowid(),
            name,
            slug,
            description,
        })
    }
}

fn db_err(e: rusqlite::Error) -> CatalogError {
    CatalogError::Database(e.to_string())
}

/// Map a write failure, reporting unique-slug violations as conflicts.
fn write_err(e: rusqlite::Error, slug: &str) -> CatalogError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            CatalogError::Conflict(format!("A flavor with slug '{}' already exists", slug))
        }
        _ => db_err(e),
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteFlavorStore {
        SqliteFlavorStore::in_memory().unwrap()
    }

    fn flavor_input(slug: &str, description: Option<&str>) -> FlavorInput {
        FlavorInput {
            slug: slug.to_string(),
            description: description.map(str::to_string),
        }
    }

    fn step_input(order_by: Option<i64>, description: &str) -> StepInput {
        StepInput {
            order_by,
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_get_flavor() {
        let store = store();
        let created = store
            .create_flavor(&flavor_input(" sarcastic-roast ", Some("Dry and mean")))
            .unwrap();

        assert_eq!(created.slug, "sarcastic-roast");
        assert_eq!(created.description.as_deref(), Some("Dry and mean"));
        assert_eq!(created.step_count, 0);

        let fetched = store.get_flavor(created.id).unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_create_flavor_requires_slug() {
        let result = store().create_flavor(&flavor_input("   ", Some("x")));
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[test]
    fn test_blank_description_stored_as_null() {
        let flavor = store().create_flavor(&flavor_input("plain", Some(""))).unwrap();
        assert!(flavor.description.is_none());
    }

    #[test]
    fn test_duplicate_slug_is_conflict() {
        let store = store();
        store.create_flavor(&flavor_input("puns", None)).unwrap();
        let result = store.create_flavor(&flavor_input("puns", None));
        assert!(matches!(result, Err(CatalogError::Conflict(_))));
    }

    #[test]
    fn test_search_flavors() {
        let store = store();
        let roast = store
            .create_flavor(&flavor_input("sarcastic-roast", Some("Dry humor")))
            .unwrap();
        store
            .create_flavor(&flavor_input("dad-jokes", Some("Wholesome PUNS")))
            .unwrap();

        assert_eq!(store.list_flavors(None).unwrap().len(), 2);
        assert_eq!(store.list_flavors(Some("")).unwrap().len(), 2);

        let by_slug = store.list_flavors(Some("ROAST")).unwrap();
        assert_eq!(by_slug.len(), 1);
        assert_eq!(by_slug[0].id, roast.id);

        let by_description = store.list_flavors(Some("puns")).unwrap();
        assert_eq!(by_description.len(), 1);
        assert_eq!(by_description[0].slug, "dad-jokes");

        let by_id = store.list_flavors(Some(&roast.id.to_string())).unwrap();
        assert!(by_id.iter().any(|f| f.id == roast.id));

        assert!(store.list_flavors(Some("%")).unwrap().is_empty());
    }

    #[test]
    fn test_update_flavor() {
        let store = store();
        let flavor = store.create_flavor(&flavor_input("old", None)).unwrap();

        let updated = store
            .update_flavor(flavor.id, &flavor_input("new", Some("Renamed")))
            .unwrap();
        assert_eq!(updated.slug, "new");
        assert_eq!(updated.description.as_deref(), Some("Renamed"));

        let missing = store.update_flavor(9999, &flavor_input("x", None));
        assert!(matches!(missing, Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_delete_flavor_removes_steps() {
        let store = store();
        let flavor = store.create_flavor(&flavor_input("doomed", None)).unwrap();
        let step = store
            .create_step(flavor.id, &step_input(Some(1), "describe"))
            .unwrap();

        store.delete_flavor(flavor.id).unwrap();

        assert!(matches!(
            store.get_flavor(flavor.id),
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            store.get_step(step.id),
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_flavor(flavor.id),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_steps_are_ordered_with_unordered_last() {
        let store = store();
        let flavor = store.create_flavor(&flavor_input("chain", None)).unwrap();

        store.create_step(flavor.id, &step_input(None, "loose")).unwrap();
        store.create_step(flavor.id, &step_input(Some(2), "second")).unwrap();
        store.create_step(flavor.id, &step_input(Some(1), "first")).unwrap();

        let steps = store.list_steps(flavor.id).unwrap();
        let descriptions: Vec<_> = steps
            .iter()
            .map(|s| s.description.clone().unwrap())
            .collect();
        assert_eq!(descriptions, vec!["first", "second", "loose"]);

        assert_eq!(store.get_flavor(flavor.id).unwrap().step_count, 3);
    }

    #[test]
    fn test_create_step_normalizes_and_checks_flavor() {
        let store = store();
        let flavor = store.create_flavor(&flavor_input("prompts", None)).unwrap();

        let step = store
            .create_step(
                flavor.id,
                &StepInput {
                    llm_temperature: Some(0.9),
                    llm_system_prompt: Some(String::new()),
                    llm_user_prompt: Some("Write a caption".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(step.humor_flavor_id, flavor.id);
        assert_eq!(step.llm_temperature, Some(0.9));
        assert!(step.llm_system_prompt.is_none());
        assert_eq!(step.llm_user_prompt.as_deref(), Some("Write a caption"));

        let orphan = store.create_step(4242, &StepInput::default());
        assert!(matches!(orphan, Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_update_and_delete_step() {
        let store = store();
        let flavor = store.create_flavor(&flavor_input("edit", None)).unwrap();
        let step = store
            .create_step(flavor.id, &step_input(Some(1), "draft"))
            .unwrap();

        let updated = store
            .update_step(
                step.id,
                &StepInput {
                    order_by: Some(5),
                    llm_model_id: Some(3),
                    description: Some("final".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.order_by, Some(5));
        assert_eq!(updated.llm_model_id, Some(3));
        assert_eq!(updated.description.as_deref(), Some("final"));

        store.delete_step(step.id).unwrap();
        assert!(matches!(
            store.delete_step(step.id),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_steps_for_missing_flavor() {
        assert!(matches!(
            store().list_steps(77),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_lookups() {
        let store = store();
        store
            .add_lookup(
                LookupKind::LlmModels,
                &LookupInput {
                    name: Some("zeta-large".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .add_lookup(
                LookupKind::LlmModels,
                &LookupInput {
                    name: Some("alpha-small".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let models = store.list_lookups(LookupKind::LlmModels).unwrap();
        let names: Vec<_> = models.iter().map(|m| m.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["alpha-small", "zeta-large"]);

        assert!(store.list_lookups(LookupKind::StepTypes).unwrap().is_empty());

        let invalid = store.add_lookup(LookupKind::InputTypes, &LookupInput::default());
        assert!(matches!(invalid, Err(CatalogError::Validation(_))));
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        let id = {
            let store = SqliteFlavorStore::new(&path).unwrap();
            store.create_flavor(&flavor_input("kept", None)).unwrap().id
        };

        let reopened = SqliteFlavorStore::new(&path).unwrap();
        assert_eq!(reopened.get_flavor(id).unwrap().slug, "kept");
    }
}
