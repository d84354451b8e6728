//! Flavor catalog - humor flavors, their ordered prompt steps, and the
//! lookup tables those steps reference.

mod sqlite;
mod types;

pub use sqlite::SqliteFlavorStore;
pub use types::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Storage for the flavor catalog.
pub trait FlavorStore: Send + Sync {
    /// List flavors ordered by id.
    ///
    /// `search` matches case-insensitively against slug, description, or id.
    fn list_flavors(&self, search: Option<&str>) -> Result<Vec<Flavor>, CatalogError>;

    fn get_flavor(&self, id: i64) -> Result<Flavor, CatalogError>;

    /// Create a flavor. The slug must be non-blank and unique.
    fn create_flavor(&self, input: &FlavorInput) -> Result<Flavor, CatalogError>;

    fn update_flavor(&self, id: i64, input: &FlavorInput) -> Result<Flavor, CatalogError>;

    /// Delete a flavor together with its steps.
    fn delete_flavor(&self, id: i64) -> Result<(), CatalogError>;

    /// Steps of a flavor in execution order: `order_by` ascending with
    /// unordered steps last, ties broken by id.
    fn list_steps(&self, flavor_id: i64) -> Result<Vec<FlavorStep>, CatalogError>;

    fn get_step(&self, id: i64) -> Result<FlavorStep, CatalogError>;

    fn create_step(&self, flavor_id: i64, input: &StepInput) -> Result<FlavorStep, CatalogError>;

    fn update_step(&self, id: i64, input: &StepInput) -> Result<FlavorStep, CatalogError>;

    fn delete_step(&self, id: i64) -> Result<(), CatalogError>;

    fn list_lookups(&self, kind: LookupKind) -> Result<Vec<LookupItem>, CatalogError>;

    fn add_lookup(&self, kind: LookupKind, input: &LookupInput)
        -> Result<LookupItem, CatalogError>;
}
