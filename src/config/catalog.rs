//! Target dimension catalog

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{Result, LogoError};

/// One requested output image: its size and the file name it is written to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSpec {
    pub width: u32,
    pub height: u32,
    /// Output file name, extension included
    pub name: String,
}

impl DimensionSpec {
    pub fn new<S: Into<String>>(width: u32, height: u32, name: S) -> Self {
        Self {
            width,
            height,
            name: name.into(),
        }
    }

    /// Validate a single record
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LogoError::config(format!(
                "{:?}: width and height must be greater than 0 (got {}x{})",
                self.name, self.width, self.height
            )));
        }
        if self.name.trim().is_empty() {
            return Err(LogoError::config("Output name must not be empty"));
        }
        Ok(())
    }
}

/// TOML cannot hold a bare top-level array, so TOML catalogs use `[[dimensions]]`
#[derive(Serialize, Deserialize)]
struct TomlCatalog {
    dimensions: Vec<DimensionSpec>,
}

/// Ordered list of target dimensions
///
/// Order is preserved exactly as loaded. It only matters for reporting:
/// workers run concurrently and may finish in any order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionCatalog {
    specs: Vec<DimensionSpec>,
}

impl DimensionCatalog {
    /// Build a catalog from an explicit list
    pub fn new(specs: Vec<DimensionSpec>) -> Self {
        Self { specs }
    }

    /// App and store icon set: the square PNG logos a desktop app bundle expects
    pub fn app_icons() -> Self {
        let specs = [
            (310, "Square310x310Logo.png"),
            (284, "Square284x284Logo.png"),
            (150, "Square150x150Logo.png"),
            (142, "Square142x142Logo.png"),
            (107, "Square107x107Logo.png"),
            (89, "Square89x89Logo.png"),
            (71, "Square71x71Logo.png"),
            (44, "Square44x44Logo.png"),
            (30, "Square30x30Logo.png"),
            (512, "icon.png"),
            (256, "128x128@2x.png"),
            (50, "StoreLogo.png"),
            (128, "128x128.png"),
            (32, "32x32.png"),
        ]
        .into_iter()
        .map(|(side, name)| DimensionSpec::new(side, side, name))
        .collect();

        Self { specs }
    }

    /// Load a catalog from a `.json`, `.yaml`/`.yml` or `.toml` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LogoError::config(
                format!("Failed to read dimensions file {:?}: {}", path, e)
            ))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let catalog = Self::parse(&content, extension)
            .map_err(|e| LogoError::config(format!("{:?}: {}", path, e.user_message())))?;

        tracing::debug!("Loaded {} target dimensions from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Parse catalog text in the format named by `extension`
    pub fn parse(content: &str, extension: &str) -> Result<Self> {
        let specs: Vec<DimensionSpec> = match extension.to_lowercase().as_str() {
            "json" => serde_json::from_str(content)?,
            "yaml" | "yml" => serde_yaml::from_str(content)?,
            "toml" => toml::from_str::<TomlCatalog>(content)?.dimensions,
            other => {
                return Err(LogoError::config(format!(
                    "Unsupported dimensions file format {:?}. Use .json, .yaml or .toml",
                    other
                )))
            }
        };

        let catalog = Self { specs };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Save the catalog in the format named by the file extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let content = match extension.to_lowercase().as_str() {
            "json" => serde_json::to_string_pretty(&self.specs)
                .map_err(|e| LogoError::config(format!("JSON serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(&self.specs)
                .map_err(|e| LogoError::config(format!("YAML serialization failed: {}", e)))?,
            "toml" => toml::to_string_pretty(&TomlCatalog { dimensions: self.specs.clone() })
                .map_err(|e| LogoError::config(format!("TOML serialization failed: {}", e)))?,
            other => {
                return Err(LogoError::config(format!(
                    "Unsupported dimensions file format {:?}. Use .json, .yaml or .toml",
                    other
                )))
            }
        };

        std::fs::write(path, content)
            .map_err(|e| LogoError::config(
                format!("Failed to write dimensions file {:?}: {}", path, e)
            ))?;

        Ok(())
    }

    /// Validate every record; an empty catalog is valid here
    pub fn validate(&self) -> Result<()> {
        for (index, spec) in self.specs.iter().enumerate() {
            spec.validate()
                .map_err(|e| LogoError::config(format!("Invalid dimension #{}: {}", index, e.user_message())))?;
        }
        Ok(())
    }

    pub fn specs(&self) -> &[DimensionSpec] {
        &self.specs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DimensionSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl From<Vec<DimensionSpec>> for DimensionCatalog {
    fn from(specs: Vec<DimensionSpec>) -> Self {
        Self::new(specs)
    }
}

impl<'a> IntoIterator for &'a DimensionCatalog {
    type Item = &'a DimensionSpec;
    type IntoIter = std::slice::Iter<'a, DimensionSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_json_preserves_order() {
        let json = r#"[
            {"width": 100, "height": 100, "name": "a.png"},
            {"width": 50, "height": 200, "name": "b.png"}
        ]"#;
        let catalog = DimensionCatalog::parse(json, "json").unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.specs()[0], DimensionSpec::new(100, 100, "a.png"));
        assert_eq!(catalog.specs()[1], DimensionSpec::new(50, 200, "b.png"));
    }

    #[test]
    fn test_parse_yaml_and_toml() {
        let yaml = "- width: 32\n  height: 32\n  name: 32x32.png\n";
        let catalog = DimensionCatalog::parse(yaml, "yml").unwrap();
        assert_eq!(catalog.specs()[0].name, "32x32.png");

        let toml = "[[dimensions]]\nwidth = 64\nheight = 48\nname = \"wide.gif\"\n";
        let catalog = DimensionCatalog::parse(toml, "TOML").unwrap();
        assert_eq!(catalog.specs()[0], DimensionSpec::new(64, 48, "wide.gif"));
    }

    #[test]
    fn test_empty_catalog_is_not_a_parse_error() {
        let catalog = DimensionCatalog::parse("[]", "json").unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_malformed_catalogs() {
        assert!(matches!(
            DimensionCatalog::parse("{not json", "json"),
            Err(LogoError::ConfigError { .. })
        ));
        assert!(DimensionCatalog::parse(r#"[{"width": 10, "name": "a.png"}]"#, "json").is_err());
        assert!(DimensionCatalog::parse(r#"[{"width": -1, "height": 10, "name": "a.png"}]"#, "json").is_err());
        assert!(DimensionCatalog::parse("[]", "ini").is_err());

        let err = DimensionCatalog::parse(r#"[{"width": 0, "height": 10, "name": "a.png"}]"#, "json")
            .unwrap_err();
        assert!(err.to_string().contains("#0"));

        assert!(DimensionCatalog::parse(r#"[{"width": 5, "height": 10, "name": " "}]"#, "json").is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = DimensionCatalog::from_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(LogoError::ConfigError { .. })));
    }

    #[test]
    fn test_file_io_all_formats() {
        let dir = TempDir::new().unwrap();
        let catalog = DimensionCatalog::app_icons();

        for name in ["dims.json", "dims.yaml", "dims.toml"] {
            let path = dir.path().join(name);
            catalog.to_file(&path).unwrap();
            assert_eq!(DimensionCatalog::from_file(&path).unwrap(), catalog);
        }

        assert!(catalog.to_file(dir.path().join("dims.txt")).is_err());
    }

    #[test]
    fn test_app_icons() {
        let catalog = DimensionCatalog::app_icons();
        assert!(catalog.validate().is_ok());
        assert!(catalog.iter().all(|spec| spec.width == spec.height));
        assert!(catalog.iter().all(|spec| spec.name.ends_with(".png")));
        assert_eq!(catalog.specs()[0].name, "Square310x310Logo.png");
    }
}
