//! Configuration parsing and validation
//!
//! This module handles loading the pipeconv project configuration.
//!
//! # Configuration Files
//!
//! - `pipeconv.yaml` - Project root configuration
//! - `<input_dir>/*.yaml|*.json` - Pipeline documents to convert

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::pipeline::PipelineDocument;

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "pipeconv.yaml";

/// Root project configuration from `pipeconv.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_name")]
    pub name: String,

    /// Directory holding pipeline documents, relative to the project root
    #[serde(default = "default_input_dir")]
    pub input_dir: String,

    /// Directory receiving generated controllers, relative to the project root
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Code generation settings
    #[serde(default)]
    pub codegen: CodegenConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            codegen: CodegenConfig::default(),
        }
    }
}

fn default_name() -> String {
    "pipeconv".to_string()
}

fn default_input_dir() -> String {
    "pipelines".to_string()
}

fn default_output_dir() -> String {
    "cartridge/controllers".to_string()
}

/// Settings that shape the emitted JavaScript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodegenConfig {
    /// Spaces per indentation level
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,

    /// Import statement flavour
    #[serde(default)]
    pub module_style: ModuleStyle,

    /// Module prefix for calls into other controllers
    #[serde(default = "default_controller_prefix")]
    pub controller_prefix: String,

    /// Mark exported non-private starts with `.public = true`
    #[serde(default = "default_true")]
    pub export_public: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            indent_width: default_indent_width(),
            module_style: ModuleStyle::default(),
            controller_prefix: default_controller_prefix(),
            export_public: true,
        }
    }
}

fn default_indent_width() -> usize {
    4
}

fn default_controller_prefix() -> String {
    "~/cartridge/controllers/".to_string()
}

fn default_true() -> bool {
    true
}

/// How imports are written in the generated module
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStyle {
    /// `var OrderMgr = require('dw/order/OrderMgr');`
    #[default]
    CommonJs,
    /// `import OrderMgr from 'dw/order/OrderMgr';`
    Esm,
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory or a `pipeconv.yaml` path
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./storefront")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(CONFIG_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;
        project.validate()?;

        tracing::debug!("Loaded configuration from {}", config_path.display());
        Ok(Self { project, base_path })
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(Error::ConfigNotFound { path: missing }) => {
                tracing::debug!("No configuration at {}, using defaults", missing);
                let base_path = if path.is_dir() {
                    path.to_path_buf()
                } else {
                    path.parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .unwrap_or(Path::new("."))
                        .to_path_buf()
                };
                Ok(Self {
                    project: ProjectConfig::default(),
                    base_path,
                })
            }
            other => other,
        }
    }

    /// Absolute-or-relative path of the input directory
    pub fn input_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.input_dir)
    }

    /// Absolute-or-relative path of the output directory
    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.output_dir)
    }

    /// Load all pipeline documents from the input directory, sorted by path
    pub fn load_documents(&self) -> Result<Vec<PipelineDocument>> {
        let input_dir = self.input_dir();
        if !input_dir.exists() {
            return Ok(vec![]);
        }

        let mut entries: Vec<_> = std::fs::read_dir(&input_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| PipelineDocument::is_document_path(&e.path()))
            .collect();
        entries.sort_by_key(|e| e.path());

        let mut documents = Vec::new();
        for entry in entries {
            documents.push(PipelineDocument::load(entry.path())?);
        }
        Ok(documents)
    }
}

impl ProjectConfig {
    /// Reject values the generator cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.codegen.indent_width == 0 || self.codegen.indent_width > 8 {
            return Err(Error::ConfigInvalid {
                message: format!(
                    "codegen.indent_width must be between 1 and 8, got {}",
                    self.codegen.indent_width
                ),
            });
        }
        if self.output_dir.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                message: "output_dir must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_module_style() {
        assert_eq!(ModuleStyle::default(), ModuleStyle::CommonJs);
    }

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
name: storefront
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "storefront");
        assert_eq!(config.input_dir, "pipelines");
        assert_eq!(config.output_dir, "cartridge/controllers");
        assert_eq!(config.codegen, CodegenConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
name: storefront
input_dir: legacy
output_dir: out
codegen:
  indent_width: 2
  module_style: esm
  controller_prefix: "app_storefront/cartridge/controllers/"
  export_public: false
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.input_dir, "legacy");
        assert_eq!(config.codegen.indent_width, 2);
        assert_eq!(config.codegen.module_style, ModuleStyle::Esm);
        assert!(!config.codegen.export_public);
    }

    #[test]
    fn test_validate_rejects_zero_indent() {
        let mut config = ProjectConfig::default();
        config.codegen.indent_width = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(dir.path());
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(config.project.name, "pipeconv");
        assert_eq!(config.base_path, dir.path());
    }
}
