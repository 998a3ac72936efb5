//! Migration configuration.
//!
//! Everything a run needs is read from environment variables (optionally loaded from a
//! `.env` file by the binary):
//!
//! - `MIGRATION_MODE`: `export`, `import` or `migrate` (default: migrate)
//! - `SOURCE_API_URL` / `SOURCE_API_TOKEN`: source store, required for export
//! - `TARGET_API_URL` / `TARGET_API_TOKEN`: target store, required for import
//! - `SNAPSHOT_DIR`: snapshot root (default: ./export)
//! - `MEDIA_SOURCE_DIR`: local blob directory copied on export (default: unset)
//! - `MIGRATION_COLLECTIONS`: comma-separated collection names, in import order
//! - `MIGRATION_RELATIONS`: comma-separated `collection.field[=target]` entries
//! - `MIGRATION_MEDIA_FIELDS`: comma-separated `collection.field` entries
//! - `MIGRATION_EXPORT_MEDIA`: whether export fetches media (default: true)
//! - `MIGRATION_ID_FIELD`: identifier field of records and media assets (default: id)
//! - `RESET_PAGE_SIZE`: page size of the reset listing (default: 1000)
//! - `HTTP_TIMEOUT_SECS`: per-request timeout (default: 30)
//! - `HTTP_MAX_RETRIES`: retries of transient failures (default: 3)

pub mod dependencies;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use content_migrate_repository::config::{
    DEFAULT_ID_FIELD, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
};
use content_migrate_repository::StoreConfig;

use crate::errors::MigrationError;

const DEFAULT_SNAPSHOT_DIR: &str = "./export";
const DEFAULT_RESET_PAGE_SIZE: u32 = 1000;

/// What a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Source store to snapshot.
    Export,
    /// Snapshot to target store.
    Import,
    /// Export followed by import.
    Migrate,
}

impl RunMode {
    pub fn exports(self) -> bool {
        matches!(self, Self::Export | Self::Migrate)
    }

    pub fn imports(self) -> bool {
        matches!(self, Self::Import | Self::Migrate)
    }
}

impl FromStr for RunMode {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "export" => Ok(Self::Export),
            "import" => Ok(Self::Import),
            "migrate" => Ok(Self::Migrate),
            other => Err(MigrationError::config(format!(
                "MIGRATION_MODE must be export, import or migrate, got '{}'",
                other
            ))),
        }
    }
}

/// A relation field and the collection its values point into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationField {
    pub field: String,
    pub target: String,
}

impl RelationField {
    pub fn new(field: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            target: target.into(),
        }
    }
}

/// One collection to migrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    pub name: String,
    /// Top-level fields restored in the relation phase.
    pub relations: Vec<RelationField>,
    /// Field names holding media references, matched at any depth.
    pub media_fields: Vec<String>,
}

impl CollectionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relations: Vec::new(),
            media_fields: Vec::new(),
        }
    }

    /// Declare a relation field pointing into `target`.
    pub fn with_relation(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations.push(RelationField::new(field, target));
        self
    }

    /// Declare a relation field pointing back into this collection.
    pub fn with_self_relation(self, field: impl Into<String>) -> Self {
        let target = self.name.clone();
        self.with_relation(field, target)
    }

    pub fn with_media_field(mut self, field: impl Into<String>) -> Self {
        self.media_fields.push(field.into());
        self
    }

    pub fn has_relations(&self) -> bool {
        !self.relations.is_empty()
    }

    pub fn is_relation_field(&self, field: &str) -> bool {
        self.relations.iter().any(|relation| relation.field == field)
    }

    pub fn is_media_field(&self, field: &str) -> bool {
        self.media_fields.iter().any(|media| media == field)
    }
}

/// Settings of the import phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Field carrying record and file identifiers in store responses.
    pub id_field: String,
    /// Page size of the listing that drives a collection reset.
    pub reset_page_size: u32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            reset_page_size: DEFAULT_RESET_PAGE_SIZE,
        }
    }
}

/// Complete configuration of one run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub mode: RunMode,
    pub source: Option<StoreConfig>,
    pub target: Option<StoreConfig>,
    pub snapshot_dir: PathBuf,
    pub media_source_dir: Option<PathBuf>,
    pub export_media: bool,
    pub collections: Vec<CollectionConfig>,
    pub import: ImportConfig,
}

impl MigrationConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, MigrationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which returns the value of a variable.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MigrationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mode = match get("MIGRATION_MODE") {
            Some(value) => value.parse()?,
            None => RunMode::Migrate,
        };

        let timeout = Duration::from_secs(parse_number(
            "HTTP_TIMEOUT_SECS",
            get("HTTP_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        )?);
        let max_retries = parse_number("HTTP_MAX_RETRIES", get("HTTP_MAX_RETRIES"), DEFAULT_MAX_RETRIES)?;
        let id_field = get("MIGRATION_ID_FIELD").unwrap_or_else(|| DEFAULT_ID_FIELD.to_string());
        let store = |url: Option<String>, token: Option<String>| {
            url.map(|url| {
                StoreConfig::new(url)
                    .with_token(token.unwrap_or_default())
                    .with_timeout(timeout)
                    .with_max_retries(max_retries)
                    .with_id_field(id_field.as_str())
            })
        };

        let source = store(get("SOURCE_API_URL"), get("SOURCE_API_TOKEN"));
        let target = store(get("TARGET_API_URL"), get("TARGET_API_TOKEN"));
        if mode.exports() && source.is_none() {
            return Err(MigrationError::config(format!(
                "SOURCE_API_URL is required in {:?} mode",
                mode
            )));
        }
        if mode.imports() && target.is_none() {
            return Err(MigrationError::config(format!(
                "TARGET_API_URL is required in {:?} mode",
                mode
            )));
        }

        let mut collections: Vec<CollectionConfig> = split_list(get("MIGRATION_COLLECTIONS"))
            .map(CollectionConfig::new)
            .collect();
        if collections.is_empty() {
            return Err(MigrationError::config("MIGRATION_COLLECTIONS must name at least one collection"));
        }

        for entry in split_list(get("MIGRATION_RELATIONS")) {
            let (collection, rest) = split_field_entry("MIGRATION_RELATIONS", &entry)?;
            let (field, target) = match rest.split_once('=') {
                Some((field, target)) => (field.trim(), target.trim()),
                None => (rest, collection),
            };
            if field.is_empty() || target.is_empty() {
                return Err(MigrationError::config(format!(
                    "MIGRATION_RELATIONS entry '{}' must be collection.field[=target]",
                    entry
                )));
            }
            if !collections.iter().any(|c| c.name == target) {
                return Err(MigrationError::config(format!(
                    "Relation '{}' points into '{}', which is not in MIGRATION_COLLECTIONS",
                    entry, target
                )));
            }
            let config = find_collection(&mut collections, "MIGRATION_RELATIONS", collection)?;
            config.relations.push(RelationField::new(field, target));
        }

        for entry in split_list(get("MIGRATION_MEDIA_FIELDS")) {
            let (collection, field) = split_field_entry("MIGRATION_MEDIA_FIELDS", &entry)?;
            let config = find_collection(&mut collections, "MIGRATION_MEDIA_FIELDS", collection)?;
            config.media_fields.push(field.to_string());
        }

        let export_media = match get("MIGRATION_EXPORT_MEDIA") {
            Some(value) => parse_bool("MIGRATION_EXPORT_MEDIA", &value)?,
            None => true,
        };
        let reset_page_size = parse_number("RESET_PAGE_SIZE", get("RESET_PAGE_SIZE"), DEFAULT_RESET_PAGE_SIZE)?;
        if reset_page_size == 0 {
            return Err(MigrationError::config("RESET_PAGE_SIZE must be at least 1"));
        }

        Ok(Self {
            mode,
            source,
            target,
            snapshot_dir: PathBuf::from(
                get("SNAPSHOT_DIR").unwrap_or_else(|| DEFAULT_SNAPSHOT_DIR.to_string()),
            ),
            media_source_dir: get("MEDIA_SOURCE_DIR").map(PathBuf::from),
            export_media,
            collections,
            import: ImportConfig {
                id_field,
                reset_page_size,
            },
        })
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.name == name)
    }
}

fn split_list(value: Option<String>) -> impl Iterator<Item = String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .into_iter()
}

fn split_field_entry<'a>(variable: &str, entry: &'a str) -> Result<(&'a str, &'a str), MigrationError> {
    match entry.split_once('.') {
        Some((collection, field)) if !collection.trim().is_empty() && !field.trim().is_empty() => {
            Ok((collection.trim(), field.trim()))
        }
        _ => Err(MigrationError::config(format!(
            "{} entry '{}' must be collection.field",
            variable, entry
        ))),
    }
}

fn find_collection<'a>(
    collections: &'a mut [CollectionConfig],
    variable: &str,
    name: &str,
) -> Result<&'a mut CollectionConfig, MigrationError> {
    collections
        .iter_mut()
        .find(|c| c.name == name)
        .ok_or_else(|| {
            MigrationError::config(format!(
                "{} names '{}', which is not in MIGRATION_COLLECTIONS",
                variable, name
            ))
        })
}

fn parse_number<T: FromStr>(variable: &str, value: Option<String>, default: T) -> Result<T, MigrationError> {
    match value {
        Some(value) => value.parse().map_err(|_| {
            MigrationError::config(format!("{} must be a non-negative integer, got '{}'", variable, value))
        }),
        None => Ok(default),
    }
}

fn parse_bool(variable: &str, value: &str) -> Result<bool, MigrationError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(MigrationError::config(format!(
            "{} must be true or false, got '{}'",
            variable, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const MINIMAL: [(&str, &str); 3] = [
        ("SOURCE_API_URL", "http://source:1337/api"),
        ("TARGET_API_URL", "http://target:1337/api"),
        ("MIGRATION_COLLECTIONS", "navigation-items, artikels"),
    ];

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::from_lookup(lookup(&MINIMAL)).unwrap();

        assert_eq!(config.mode, RunMode::Migrate);
        assert_eq!(config.snapshot_dir, PathBuf::from("./export"));
        assert!(config.export_media);
        assert!(config.media_source_dir.is_none());
        assert_eq!(config.import, ImportConfig::default());
        assert_eq!(config.import.reset_page_size, 1000);
        assert_eq!(
            config.collections.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["navigation-items", "artikels"]
        );

        let target = config.target.unwrap();
        assert_eq!(target.timeout, Duration::from_secs(30));
        assert_eq!(target.max_retries, 3);
        assert!(target.token.is_none());
    }

    #[test]
    fn test_relations_and_media_fields() {
        let mut vars = MINIMAL.to_vec();
        vars.push((
            "MIGRATION_RELATIONS",
            "navigation-items.navigation_item, navigation-items.navigation_items, artikels.navigation_item=navigation-items",
        ));
        vars.push(("MIGRATION_MEDIA_FIELDS", "artikels.cover,artikels.thumbnail"));

        let config = MigrationConfig::from_lookup(lookup(&vars)).unwrap();
        let nav = config.collection("navigation-items").unwrap();
        let artikels = config.collection("artikels").unwrap();

        assert_eq!(
            nav.relations,
            vec![
                RelationField::new("navigation_item", "navigation-items"),
                RelationField::new("navigation_items", "navigation-items"),
            ]
        );
        assert_eq!(
            artikels.relations,
            vec![RelationField::new("navigation_item", "navigation-items")]
        );
        assert!(artikels.is_media_field("cover"));
        assert!(artikels.is_media_field("thumbnail"));
        assert!(!nav.is_media_field("cover"));
    }

    #[test]
    fn test_mode_requires_its_endpoints() {
        let export_only = lookup(&[
            ("MIGRATION_MODE", "export"),
            ("SOURCE_API_URL", "http://source:1337/api"),
            ("MIGRATION_COLLECTIONS", "artikels"),
        ]);
        let config = MigrationConfig::from_lookup(export_only).unwrap();
        assert_eq!(config.mode, RunMode::Export);
        assert!(config.target.is_none());

        let import_without_target = lookup(&[
            ("MIGRATION_MODE", "Import"),
            ("SOURCE_API_URL", "http://source:1337/api"),
            ("MIGRATION_COLLECTIONS", "artikels"),
        ]);
        assert!(matches!(
            MigrationConfig::from_lookup(import_without_target),
            Err(MigrationError::ConfigError(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let cases: Vec<(&str, &str)> = vec![
            ("MIGRATION_MODE", "sync"),
            ("MIGRATION_COLLECTIONS", " , "),
            ("MIGRATION_RELATIONS", "artikels.parent=unknown"),
            ("MIGRATION_RELATIONS", "unknown.parent"),
            ("MIGRATION_RELATIONS", "artikels"),
            ("MIGRATION_MEDIA_FIELDS", "pages.cover"),
            ("MIGRATION_EXPORT_MEDIA", "sometimes"),
            ("RESET_PAGE_SIZE", "0"),
            ("HTTP_TIMEOUT_SECS", "-5"),
        ];

        for (key, value) in cases {
            let mut vars: Vec<(&str, &str)> = MINIMAL
                .iter()
                .copied()
                .filter(|(k, _)| *k != key)
                .collect();
            vars.push((key, value));
            assert!(
                MigrationConfig::from_lookup(lookup(&vars)).is_err(),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_store_settings_apply_to_both_endpoints() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("SOURCE_API_TOKEN", "source-token"));
        vars.push(("HTTP_TIMEOUT_SECS", "5"));
        vars.push(("HTTP_MAX_RETRIES", "0"));
        vars.push(("MIGRATION_EXPORT_MEDIA", "false"));

        let config = MigrationConfig::from_lookup(lookup(&vars)).unwrap();
        let source = config.source.unwrap();
        let target = config.target.unwrap();

        assert_eq!(source.token.as_deref(), Some("source-token"));
        assert_eq!(source.timeout, Duration::from_secs(5));
        assert_eq!(target.max_retries, 0);
        assert!(!config.export_media);
    }

    #[test]
    fn test_id_field_reaches_import_and_both_stores() {
        let config = MigrationConfig::from_lookup(lookup(&MINIMAL)).unwrap();
        assert_eq!(config.import.id_field, "id");
        assert_eq!(config.source.unwrap().id_field, "id");

        let mut vars = MINIMAL.to_vec();
        vars.push(("MIGRATION_ID_FIELD", "documentId"));
        let config = MigrationConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.import.id_field, "documentId");
        assert_eq!(config.source.unwrap().id_field, "documentId");
        assert_eq!(config.target.unwrap().id_field, "documentId");
    }

    #[test]
    fn test_collection_builder() {
        let nav = CollectionConfig::new("navigation-items")
            .with_self_relation("navigation_items")
            .with_relation("page", "pages")
            .with_media_field("icon");

        assert!(nav.has_relations());
        assert!(nav.is_relation_field("navigation_items"));
        assert_eq!(nav.relations[0].target, "navigation-items");
        assert!(!CollectionConfig::new("pages").has_relations());
    }
}
