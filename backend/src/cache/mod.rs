//! Spec Registry - Store and reuse reviewed mapping specs
//!
//! Saves specs to disk as JSON and matches them to input files by their
//! source columns.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RegistryError, RegistryResult};
use crate::transform::dsl::MappingSpec;

/// Directory where specs are stored (relative to current dir)
pub const DEFAULT_REGISTRY_DIR: &str = ".fieldmap/specs";

/// Minimum share of stored source columns an input must have to be compatible
const COMPATIBILITY_THRESHOLD: f64 = 0.5;

/// A stored spec with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSpec {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// The mapping rules
    pub spec: MappingSpec,
    /// Input columns this spec reads
    pub source_columns: Vec<String>,
    /// Output columns this spec writes
    pub target_columns: Vec<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last time this spec was used
    pub last_used: Option<String>,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Number of times used
    pub use_count: u32,
}

/// Registry for managing mapping specs
pub struct SpecRegistry {
    /// Directory where specs are stored
    registry_dir: PathBuf,
    /// Loaded specs (id -> spec)
    specs: HashMap<String, StoredSpec>,
}

impl SpecRegistry {
    /// Create a registry in the default directory, loading existing specs
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_REGISTRY_DIR)
    }

    /// Create a registry with a custom directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut registry = Self {
            registry_dir: PathBuf::from(dir.as_ref()),
            specs: HashMap::new(),
        };
        registry.load_all();
        registry
    }

    pub fn dir(&self) -> &Path {
        &self.registry_dir
    }

    /// Load every spec file from the registry directory; unreadable files are skipped
    fn load_all(&mut self) {
        let entries = match fs::read_dir(&self.registry_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let loaded = fs::read_to_string(&path)
                .map_err(RegistryError::from)
                .and_then(|content| Ok(serde_json::from_str::<StoredSpec>(&content)?));
            match loaded {
                Ok(stored) => {
                    self.specs.insert(stored.id.clone(), stored);
                }
                Err(e) => warn!("Skipping registry file {}: {}", path.display(), e),
            }
        }
        debug!(
            "Loaded {} spec(s) from {}",
            self.specs.len(),
            self.registry_dir.display()
        );
    }

    /// All stored specs, sorted by name
    pub fn list(&self) -> Vec<&StoredSpec> {
        let mut specs: Vec<&StoredSpec> = self.specs.values().collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        specs
    }

    /// Get a spec by ID
    pub fn get(&self, id: &str) -> Option<&StoredSpec> {
        self.specs.get(id)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Find specs whose source columns match the given input columns.
    /// Returns specs sorted by compatibility score times success rate.
    pub fn find_compatible(&self, columns: &[String]) -> Vec<(&StoredSpec, f64)> {
        let mut compatible: Vec<_> = self
            .specs
            .values()
            .filter_map(|s| {
                let score = calculate_compatibility(&s.source_columns, columns);
                (score > COMPATIBILITY_THRESHOLD).then_some((s, score))
            })
            .collect();

        compatible.sort_by(|a, b| {
            let score_a = a.1 * a.0.success_rate;
            let score_b = b.1 * b.0.success_rate;
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.name.cmp(&b.0.name))
        });

        compatible
    }

    /// Save a spec under a new ID and return the ID
    pub fn save(&mut self, spec: MappingSpec, name: &str) -> RegistryResult<String> {
        fs::create_dir_all(&self.registry_dir)?;

        let id = self.generate_id(name);
        let stored = StoredSpec {
            id: id.clone(),
            name: name.to_string(),
            source_columns: spec.source_fields(),
            target_columns: spec.target_fields(),
            spec,
            created_at: chrono::Utc::now().to_rfc3339(),
            last_used: None,
            success_rate: 1.0,
            use_count: 0,
        };

        self.write(&stored)?;
        debug!("Saved spec '{}' as {}", name, id);
        self.specs.insert(id.clone(), stored);
        Ok(id)
    }

    /// Import a CSV or JSON mapping file. The name defaults to the file stem.
    pub fn import(&mut self, path: &Path, name: Option<&str>) -> RegistryResult<String> {
        let spec = MappingSpec::load(path)?;
        let spec_name = name.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("imported")
        });
        self.save(spec, spec_name)
    }

    /// Record one use of a spec and its outcome
    pub fn record_use(&mut self, id: &str, success: bool) -> RegistryResult<()> {
        let stored = self
            .specs
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        // Exponential moving average
        stored.success_rate = if success {
            stored.success_rate * 0.9 + 0.1
        } else {
            stored.success_rate * 0.9
        };
        stored.last_used = Some(chrono::Utc::now().to_rfc3339());
        stored.use_count += 1;

        let stored = stored.clone();
        self.write(&stored)
    }

    /// Delete a spec from the registry
    ///
    /// The entry stays registered when its file cannot be removed.
    pub fn delete(&mut self, id: &str) -> RegistryResult<()> {
        if !self.specs.contains_key(id) {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        fs::remove_file(self.path_for(id))?;
        self.specs.remove(id);
        Ok(())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.registry_dir.join(format!("{}.json", id))
    }

    fn write(&self, stored: &StoredSpec) -> RegistryResult<()> {
        let content = serde_json::to_string_pretty(stored)?;
        fs::write(self.path_for(&stored.id), content)?;
        Ok(())
    }

    /// Generate a unique ID from a name
    fn generate_id(&self, name: &str) -> String {
        let slug: String = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        let slug = if slug.is_empty() { "spec".to_string() } else { slug };

        let timestamp = chrono::Utc::now().timestamp_millis();
        let base = format!("{}-{}", slug, timestamp);

        // Two saves of one name within the same millisecond
        let mut id = base.clone();
        let mut n = 1;
        while self.specs.contains_key(&id) {
            n += 1;
            id = format!("{}-{}", base, n);
        }
        id
    }
}

impl Default for SpecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Share of stored columns present in the input, compared case-insensitively
fn calculate_compatibility(stored: &[String], columns: &[String]) -> f64 {
    if stored.is_empty() {
        return 0.0;
    }

    let columns_lower: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();
    let match_count = stored
        .iter()
        .filter(|col| columns_lower.contains(&col.to_lowercase()))
        .count();

    match_count as f64 / stored.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::dsl::example_spec;
    use tempfile::tempdir;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compatibility_score() {
        let stored = cols(&["Name", "Email", "Age"]);
        let input = cols(&["Name", "Email", "Phone"]);
        let score = calculate_compatibility(&stored, &input);
        assert!((score - 0.666).abs() < 0.01); // 2/3 match
    }

    #[test]
    fn test_case_insensitive_match() {
        let stored = cols(&["name", "EMAIL"]);
        let input = cols(&["NAME", "email"]);
        assert!((calculate_compatibility(&stored, &input) - 1.0).abs() < 0.01);
        assert_eq!(calculate_compatibility(&[], &input), 0.0);
    }

    #[test]
    fn test_save_reload_and_delete() {
        let dir = tempdir().unwrap();
        let id = {
            let mut registry = SpecRegistry::with_dir(dir.path());
            registry.save(example_spec(), "Customer Export").unwrap()
        };
        assert!(id.starts_with("customer-export-"));

        let mut registry = SpecRegistry::with_dir(dir.path());
        let stored = registry.get(&id).unwrap();
        assert_eq!(stored.spec, example_spec());
        assert_eq!(stored.source_columns, cols(&["Name", "Email", "Age"]));
        assert_eq!(stored.target_columns, cols(&["FullName", "Domain", "AgeGroup"]));

        registry.delete(&id).unwrap();
        assert!(registry.get(&id).is_none());
        assert!(SpecRegistry::with_dir(dir.path()).is_empty());
        assert!(matches!(registry.delete(&id), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_failed_delete_keeps_entry() {
        let dir = tempdir().unwrap();
        let mut registry = SpecRegistry::with_dir(dir.path());
        let id = registry.save(example_spec(), "customers").unwrap();
        fs::remove_file(dir.path().join(format!("{}.json", id))).unwrap();

        assert!(matches!(registry.delete(&id), Err(RegistryError::IoError(_))));
        assert!(registry.get(&id).is_some());
    }

    #[test]
    fn test_list_sorted_by_name() {
        let dir = tempdir().unwrap();
        let mut registry = SpecRegistry::with_dir(dir.path());
        registry.save(example_spec(), "zeta").unwrap();
        registry.save(example_spec(), "alpha").unwrap();
        registry.save(example_spec(), "alpha").unwrap();

        let names: Vec<&str> = registry.list().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "alpha", "zeta"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_find_compatible() {
        let dir = tempdir().unwrap();
        let mut registry = SpecRegistry::with_dir(dir.path());
        let good = registry.save(example_spec(), "customers").unwrap();
        let worn = registry.save(example_spec(), "older").unwrap();
        registry.save(MappingSpec::new().with_rule("sku", "code", "direct"), "products").unwrap();

        registry.record_use(&worn, false).unwrap();

        let found = registry.find_compatible(&cols(&["name", "email", "age", "phone"]));
        let ids: Vec<&str> = found.iter().map(|(s, _)| s.id.as_str()).collect();
        assert_eq!(ids, vec![good.as_str(), worn.as_str()]);
        assert!((found[0].1 - 1.0).abs() < 1e-9);

        // Half of the columns is not enough
        let spec = MappingSpec::new()
            .with_rule("a", "x", "direct")
            .with_rule("b", "y", "direct");
        let half = registry.save(spec, "half").unwrap();
        let found = registry.find_compatible(&cols(&["a"]));
        assert!(found.iter().all(|(s, _)| s.id != half));
    }

    #[test]
    fn test_record_use_persists() {
        let dir = tempdir().unwrap();
        let mut registry = SpecRegistry::with_dir(dir.path());
        let id = registry.save(example_spec(), "customers").unwrap();

        registry.record_use(&id, false).unwrap();
        registry.record_use(&id, true).unwrap();

        let reloaded = SpecRegistry::with_dir(dir.path());
        let stored = reloaded.get(&id).unwrap();
        assert_eq!(stored.use_count, 2);
        assert!((stored.success_rate - 0.91).abs() < 1e-9);
        assert!(stored.last_used.is_some());

        assert!(matches!(
            registry.record_use("nope", true),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_import_csv_and_invalid_file() {
        let dir = tempdir().unwrap();
        let table = dir.path().join("crm.csv");
        fs::write(&table, "source_field,target_field,transform_rule\nmail,domain,extract_domain\n").unwrap();

        let mut registry = SpecRegistry::with_dir(dir.path().join("store"));
        let id = registry.import(&table, None).unwrap();
        let stored = registry.get(&id).unwrap();
        assert_eq!(stored.name, "crm");
        assert_eq!(stored.spec.len(), 1);

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"[{"source_field":"a"}]"#).unwrap();
        assert!(matches!(
            registry.import(&bad, Some("bad")),
            Err(RegistryError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_corrupt_file_is_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("junk.json"), "{ not json").unwrap();
        assert!(SpecRegistry::with_dir(dir.path()).is_empty());
    }
}
