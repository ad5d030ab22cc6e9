//! # Deployment Template
//!
//! Loads the ARM template for the dbt job from disk and checks a parameter set
//! against the template's declared `parameters` block.
//!
//! The template is looked up next to the running executable unless
//! `DBT_JOB_TEMPLATE_DIR` points somewhere else.

use crate::config::JobConfig;
use crate::error::TemplateError;
use crate::params::ParameterSet;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parsed ARM template
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentTemplate {
    path: PathBuf,
    document: Value,
}

/// Directory of the running executable
///
/// # Errors
/// Returns `TemplateError::InstallDir` when the executable path cannot be determined.
pub fn install_dir() -> Result<PathBuf, TemplateError> {
    let exe = std::env::current_exe().map_err(|e| TemplateError::InstallDir(e.to_string()))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| TemplateError::InstallDir(exe.display().to_string()))
}

/// Location of the template file for this run
///
/// # Errors
/// Returns `TemplateError::InstallDir` when no template directory is configured
/// and the executable's directory cannot be determined.
pub fn resolve_path(config: &JobConfig) -> Result<PathBuf, TemplateError> {
    let dir = match &config.template_dir {
        Some(dir) => dir.clone(),
        None => install_dir()?,
    };
    Ok(dir.join(&config.template_file_name))
}

impl DeploymentTemplate {
    /// Read and parse a template file
    ///
    /// # Errors
    /// - `TemplateError::NotFound` when the file does not exist
    /// - `TemplateError::Read` on other I/O failures
    /// - `TemplateError::Parse` when the file is not valid JSON
    /// - `TemplateError::Empty` when the document is `null` or `{}`
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let path_display = path.display().to_string();
        info!("Loading ARM template from: {}", path_display);

        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TemplateError::NotFound(path_display.clone())
            } else {
                TemplateError::Read {
                    path: path_display.clone(),
                    message: e.to_string(),
                }
            }
        })?;
        let document: Value =
            serde_json::from_str(&content).map_err(|e| TemplateError::Parse {
                path: path_display.clone(),
                message: e.to_string(),
            })?;

        let is_empty = match &document {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if is_empty {
            return Err(TemplateError::Empty(path_display));
        }

        debug!("Loaded ARM template {}", path_display);
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    #[must_use]
    pub fn into_document(self) -> Value {
        self.document
    }

    /// Declared parameters, `None` when the template has no `parameters` block
    fn declared(&self) -> Option<&serde_json::Map<String, Value>> {
        self.document.get("parameters").and_then(Value::as_object)
    }

    /// Check a parameter set against the declared parameters
    ///
    /// Templates without a `parameters` block are not checked.
    ///
    /// # Errors
    /// - `TemplateError::UndeclaredParameters` when the set contains names the
    ///   template does not declare
    /// - `TemplateError::MissingParameters` when a declared parameter without a
    ///   `defaultValue` is not supplied
    pub fn validate_parameters(&self, parameters: &ParameterSet) -> Result<(), TemplateError> {
        let Some(declared) = self.declared() else {
            debug!("ARM template declares no parameters, skipping validation");
            return Ok(());
        };

        let undeclared: Vec<String> = parameters
            .names()
            .filter(|name| !declared.contains_key(*name))
            .map(ToString::to_string)
            .collect();
        if !undeclared.is_empty() {
            return Err(TemplateError::UndeclaredParameters(undeclared));
        }

        let supplied: BTreeSet<&str> = parameters.names().collect();
        let missing: Vec<String> = declared
            .iter()
            .filter(|(name, declaration)| {
                declaration.get("defaultValue").is_none() && !supplied.contains(name.as_str())
            })
            .map(|(name, _)| name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(TemplateError::MissingParameters(missing));
        }

        Ok(())
    }
}
