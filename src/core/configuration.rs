//! Attribute-scoped dependency configurations.
//!
//! A port has three dependency sets:
//!
//! - `implementation`: what the manifest declares. Neither resolvable nor
//!   consumable.
//! - `consumedAars`: resolvable. Pulls the archives of declared dependencies.
//! - `exportedAars`: consumable. Carries this port's own archive.
//!
//! Both attributed sets inherit the declarations and are tagged with
//! `artifactType = "aar"`. A consumer only ever matches variants carrying the
//! same tag, so unrelated artifacts in a larger build never leak in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Attribute key that discriminates the packaging format.
pub const ARTIFACT_TYPE: &str = "artifactType";
/// The value of [`ARTIFACT_TYPE`] for prefab AARs.
pub const AAR_ARTIFACT_TYPE: &str = "aar";
/// File name of the publication record inside a port's build directory.
pub const PUBLICATION_FILE: &str = "publication.json";

pub const IMPLEMENTATION: &str = "implementation";
pub const CONSUMED_AARS: &str = "consumedAars";
pub const EXPORTED_AARS: &str = "exportedAars";

/// Errors from misusing a configuration's capabilities.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ConfigurationError {
    #[error("configuration `{0}` cannot be resolved")]
    #[diagnostic(code(ndkports::configuration::not_resolvable))]
    NotResolvable(String),

    #[error("configuration `{0}` cannot be consumed")]
    #[diagnostic(code(ndkports::configuration::not_consumable))]
    NotConsumable(String),
}

/// A set of string attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Attributes(BTreeMap::new())
    }

    /// The attribute set identifying prefab AARs.
    pub fn aar() -> Self {
        Attributes::new().with(ARTIFACT_TYPE, AAR_ARTIFACT_TYPE)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where a declared dependency comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyOrigin {
    /// Another port project; its publication record names its archives.
    Project(PathBuf),
    /// A prebuilt archive on disk.
    Archive(PathBuf),
}

/// A dependency as declared by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub name: String,
    pub origin: DependencyOrigin,
}

/// One artifact of a published module, with the attributes it was published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub attributes: Attributes,
    pub file: PathBuf,
}

/// What a port exports: written after packaging, read by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub module: String,
    pub version: String,
    pub variants: Vec<Variant>,
}

impl Publication {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read publication: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse publication: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::util::fs::write_string(path, &json)
    }
}

/// A named dependency set with explicit capabilities.
#[derive(Debug, Clone)]
pub struct Configuration {
    name: String,
    can_be_resolved: bool,
    can_be_consumed: bool,
    attributes: Attributes,
    dependencies: Vec<DeclaredDependency>,
}

impl Configuration {
    /// A plain declaration set.
    pub fn declarations(name: impl Into<String>, dependencies: Vec<DeclaredDependency>) -> Self {
        Configuration {
            name: name.into(),
            can_be_resolved: false,
            can_be_consumed: false,
            attributes: Attributes::new(),
            dependencies,
        }
    }

    /// A set that can be resolved into artifacts.
    pub fn resolvable(name: impl Into<String>, attributes: Attributes) -> Self {
        Configuration {
            name: name.into(),
            can_be_resolved: true,
            can_be_consumed: false,
            attributes,
            dependencies: Vec::new(),
        }
    }

    /// A set that other builds can consume.
    pub fn consumable(name: impl Into<String>, attributes: Attributes) -> Self {
        Configuration {
            name: name.into(),
            can_be_resolved: false,
            can_be_consumed: true,
            attributes,
            dependencies: Vec::new(),
        }
    }

    /// Inherit the declarations of `parent`.
    pub fn extends_from(mut self, parent: &Configuration) -> Self {
        self.dependencies.extend(parent.dependencies.iter().cloned());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn can_be_resolved(&self) -> bool {
        self.can_be_resolved
    }

    pub fn can_be_consumed(&self) -> bool {
        self.can_be_consumed
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn dependencies(&self) -> &[DeclaredDependency] {
        &self.dependencies
    }

    /// Whether a variant satisfies this configuration's request.
    ///
    /// A request without an artifact type never matches.
    pub fn matches(&self, variant: &Variant) -> bool {
        if self.attributes.get(ARTIFACT_TYPE).is_none() {
            return false;
        }
        self.attributes
            .0
            .iter()
            .all(|(key, value)| variant.attributes.get(key) == Some(value.as_str()))
    }

    /// Pick the variants of a publication this configuration accepts.
    pub fn select<'a>(
        &self,
        publication: &'a Publication,
    ) -> Result<Vec<&'a Variant>, ConfigurationError> {
        if !self.can_be_resolved {
            return Err(ConfigurationError::NotResolvable(self.name.clone()));
        }
        Ok(publication
            .variants
            .iter()
            .filter(|variant| self.matches(variant))
            .collect())
    }

    /// Publish an artifact under this configuration's attributes.
    pub fn publish(
        &self,
        module: &str,
        version: &str,
        file: PathBuf,
    ) -> Result<Publication, ConfigurationError> {
        if !self.can_be_consumed {
            return Err(ConfigurationError::NotConsumable(self.name.clone()));
        }
        Ok(Publication {
            module: module.to_string(),
            version: version.to_string(),
            variants: vec![Variant {
                attributes: self.attributes.clone(),
                file,
            }],
        })
    }
}

/// The three dependency sets of one port.
#[derive(Debug, Clone)]
pub struct DependencyConfigurations {
    pub implementation: Configuration,
    pub consumed_aars: Configuration,
    pub exported_aars: Configuration,
}

impl DependencyConfigurations {
    pub fn new(declared: Vec<DeclaredDependency>) -> Self {
        let implementation = Configuration::declarations(IMPLEMENTATION, declared);
        let consumed_aars =
            Configuration::resolvable(CONSUMED_AARS, Attributes::aar()).extends_from(&implementation);
        let exported_aars =
            Configuration::consumable(EXPORTED_AARS, Attributes::aar()).extends_from(&implementation);

        DependencyConfigurations {
            implementation,
            consumed_aars,
            exported_aars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> Vec<DeclaredDependency> {
        vec![DeclaredDependency {
            name: "zlib".to_string(),
            origin: DependencyOrigin::Archive(PathBuf::from("zlib.aar")),
        }]
    }

    #[test]
    fn test_capabilities() {
        let configs = DependencyConfigurations::new(declared());

        assert!(!configs.implementation.can_be_resolved());
        assert!(!configs.implementation.can_be_consumed());
        assert!(configs.consumed_aars.can_be_resolved());
        assert!(!configs.consumed_aars.can_be_consumed());
        assert!(configs.exported_aars.can_be_consumed());
        assert!(!configs.exported_aars.can_be_resolved());

        assert_eq!(configs.consumed_aars.dependencies().len(), 1);
        assert_eq!(configs.exported_aars.dependencies().len(), 1);
        assert_eq!(
            configs.consumed_aars.attributes().get(ARTIFACT_TYPE),
            Some(AAR_ARTIFACT_TYPE)
        );
    }

    #[test]
    fn test_published_variant_matches_consumer() {
        let configs = DependencyConfigurations::new(Vec::new());
        let publication = configs
            .exported_aars
            .publish("curl", "7.79.1", PathBuf::from("curl.aar"))
            .unwrap();

        let selected = configs.consumed_aars.select(&publication).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].file, PathBuf::from("curl.aar"));
    }

    #[test]
    fn test_consumer_without_artifact_type_never_matches() {
        let configs = DependencyConfigurations::new(Vec::new());
        let publication = configs
            .exported_aars
            .publish("curl", "7.79.1", PathBuf::from("curl.aar"))
            .unwrap();

        let untagged = Configuration::resolvable("runtimeClasspath", Attributes::new());
        assert!(untagged.select(&publication).unwrap().is_empty());

        let other = Configuration::resolvable(
            "jars",
            Attributes::new().with(ARTIFACT_TYPE, "jar"),
        );
        assert!(other.select(&publication).unwrap().is_empty());
    }

    #[test]
    fn test_capability_misuse() {
        let configs = DependencyConfigurations::new(Vec::new());
        let publication = configs
            .exported_aars
            .publish("curl", "1", PathBuf::from("curl.aar"))
            .unwrap();

        assert!(matches!(
            configs.exported_aars.select(&publication),
            Err(ConfigurationError::NotResolvable(_))
        ));
        assert!(matches!(
            configs
                .consumed_aars
                .publish("curl", "1", PathBuf::from("curl.aar")),
            Err(ConfigurationError::NotConsumable(_))
        ));
    }

    #[test]
    fn test_publication_save_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(PUBLICATION_FILE);
        let configs = DependencyConfigurations::new(Vec::new());
        let publication = configs
            .exported_aars
            .publish("zlib", "1.2.13", PathBuf::from("/out/zlib-1.2.13.aar"))
            .unwrap();

        publication.save(&path).unwrap();
        assert_eq!(Publication::load(&path).unwrap(), publication);
    }
}
