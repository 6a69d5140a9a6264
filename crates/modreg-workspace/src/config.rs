//! Angular workspace configuration
//!
//! Reads `/angular.json` from the store and resolves the root module file of a
//! project by following its build target's main file to the module passed to
//! `bootstrapModule(...)`.

use crate::tree::{normalize_path, StoreError, VirtualTree};
use modreg_source::{walk, SourceFile, Syntax, SyntaxVisitor, Walk};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Location of the workspace configuration in the store
pub const WORKSPACE_CONFIG_PATH: &str = "/angular.json";

/// Errors resolving project configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `/angular.json` is absent
    #[error("could not find Angular workspace configuration at {path}")]
    ConfigurationMissing { path: String },

    /// `/angular.json` is not valid JSON for the workspace schema
    #[error("invalid workspace configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// No project could be selected
    #[error("project not found: {name}")]
    ProjectNotFound { name: String },

    /// The build target does not lead to a root module
    #[error("cannot resolve root module of project '{project}': {reason}")]
    TargetNotResolvable { project: String, reason: String },

    /// A file named by the configuration is absent
    #[error("could not find file for path: {path}")]
    FileNotFound { path: String },
}

/// Top level of `angular.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Schema version
    #[serde(default)]
    pub version: Option<u32>,
    /// Directory new projects are generated into
    #[serde(default)]
    pub new_project_root: Option<String>,
    /// Project used when none is named
    #[serde(default)]
    pub default_project: Option<String>,
    /// Projects by name
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,
}

/// One project entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// `application` or `library`
    #[serde(default)]
    pub project_type: Option<String>,
    /// Project root directory
    #[serde(default)]
    pub root: String,
    /// Source root directory
    #[serde(default)]
    pub source_root: Option<String>,
    /// Component selector prefix
    #[serde(default)]
    pub prefix: Option<String>,
    /// Build targets by name
    #[serde(default, alias = "targets")]
    pub architect: BTreeMap<String, TargetConfig>,
}

/// One architect target
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// Builder identifier
    #[serde(default)]
    pub builder: Option<String>,
    /// Default options
    #[serde(default)]
    pub options: TargetOptions,
}

/// Target options the reader cares about; everything else is kept raw
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOptions {
    /// Main entry file (webpack builder)
    #[serde(default)]
    pub main: Option<String>,
    /// Main entry file (application builder)
    #[serde(default)]
    pub browser: Option<String>,
    /// Remaining options
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl WorkspaceConfig {
    /// Parse `angular.json` content
    ///
    /// # Errors
    /// [`ConfigError::InvalidConfiguration`] on malformed JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidConfiguration {
            reason: e.to_string(),
        })
    }

    /// Read and parse `/angular.json` from the store
    ///
    /// # Errors
    /// [`ConfigError::ConfigurationMissing`] when absent or not UTF-8,
    /// [`ConfigError::InvalidConfiguration`] on malformed JSON
    pub fn from_store(store: &impl VirtualTree) -> Result<Self, ConfigError> {
        let text = store
            .read_text(WORKSPACE_CONFIG_PATH)
            .map_err(|_| ConfigError::ConfigurationMissing {
                path: WORKSPACE_CONFIG_PATH.to_string(),
            })?;
        Self::from_json(&text)
    }

    /// Select a project: the named one, else `defaultProject`, else the only one
    ///
    /// # Errors
    /// [`ConfigError::ProjectNotFound`] when the choice is missing or ambiguous
    pub fn project(&self, name: Option<&str>) -> Result<(&str, &ProjectConfig), ConfigError> {
        let wanted = name.or(self.default_project.as_deref());
        let found = match wanted {
            Some(wanted) => self.projects.get_key_value(wanted),
            None if self.projects.len() == 1 => self.projects.iter().next(),
            None => None,
        };
        found
            .map(|(key, project)| (key.as_str(), project))
            .ok_or_else(|| ConfigError::ProjectNotFound {
                name: wanted.unwrap_or("<default>").to_string(),
            })
    }
}

impl ProjectConfig {
    /// Main file of the `build` target
    #[must_use]
    pub fn main_file(&self) -> Option<&str> {
        let options = &self.architect.get("build")?.options;
        options.main.as_deref().or(options.browser.as_deref())
    }
}

struct BootstrapFinder<'s> {
    source: &'s SourceFile,
    module: Option<String>,
}

impl<'t> SyntaxVisitor<'t> for BootstrapFinder<'t> {
    fn visit(&mut self, syntax: Syntax<'t>) -> Walk {
        let Syntax::Call(call) = syntax else {
            return Walk::Descend;
        };
        let is_bootstrap = call
            .child_by_field_name("function")
            .and_then(|callee| match callee.kind() {
                "member_expression" => callee.child_by_field_name("property"),
                "identifier" => Some(callee),
                _ => None,
            })
            .is_some_and(|name| self.source.node_text(name) == "bootstrapModule");
        if !is_bootstrap {
            return Walk::Descend;
        }
        let mut cursor = call.walk();
        let argument = call
            .child_by_field_name("arguments")
            .and_then(|args| args.named_children(&mut cursor).find(|a| a.kind() == "identifier"));
        match argument {
            Some(argument) => {
                self.module = Some(self.source.node_text(argument).to_string());
                Walk::Stop
            }
            None => Walk::Descend,
        }
    }
}

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

/// Resolve the root module file of a project
///
/// # Errors
/// [`ConfigError`] for every step that cannot be completed
pub fn resolve_root_module_path(
    store: &impl VirtualTree,
    project: Option<&str>,
) -> Result<String, ConfigError> {
    let config = WorkspaceConfig::from_store(store)?;
    let (name, project) = config.project(project)?;
    let unresolvable = |reason: String| ConfigError::TargetNotResolvable {
        project: name.to_string(),
        reason,
    };

    let main = project.main_file().ok_or_else(|| {
        unresolvable(format!(
            "no main file in build options ({})",
            project.source_root.as_deref().unwrap_or(&project.root)
        ))
    })?;
    let main = normalize_path(main);

    let text = store.read_text(&main).map_err(|e| match e {
        StoreError::FileNotFound { path } => ConfigError::FileNotFound { path },
        other => unresolvable(other.to_string()),
    })?;
    let source = SourceFile::parse(main.as_str(), text).map_err(|e| unresolvable(e.to_string()))?;

    let mut finder = BootstrapFinder {
        source: &source,
        module: None,
    };
    walk(source.root(), &mut finder);
    let module = finder
        .module
        .ok_or_else(|| unresolvable(format!("no bootstrapModule call in {main}")))?;

    let specifier = source
        .imports()
        .module_of(&module)
        .filter(|m| m.starts_with('.'))
        .ok_or_else(|| {
            unresolvable(format!("'{module}' is not imported from a relative path in {main}"))
        })?;

    let resolved = normalize_path(&format!("{}/{specifier}.ts", parent_dir(&main)));
    tracing::debug!(project = name, %main, %resolved, "resolved root module");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MemoryTree;
    use pretty_assertions::assert_eq;

    const ANGULAR_JSON: &str = r#"{
        "version": 1,
        "newProjectRoot": "projects",
        "defaultProject": "shop",
        "projects": {
            "shop": {
                "projectType": "application",
                "root": "",
                "sourceRoot": "src",
                "prefix": "app",
                "architect": {
                    "build": {
                        "builder": "@angular-devkit/build-angular:browser",
                        "options": { "main": "src/main.ts", "tsConfig": "tsconfig.app.json" }
                    }
                }
            },
            "admin": {
                "root": "projects/admin",
                "targets": {
                    "build": { "options": { "browser": "projects/admin/src/main.ts" } }
                }
            }
        }
    }"#;

    const MAIN_TS: &str = "\
import { platformBrowserDynamic } from '@angular/platform-browser-dynamic';
import { AppModule } from './app/app.module';

platformBrowserDynamic().bootstrapModule(AppModule)
  .catch(err => console.error(err));
";

    fn store() -> MemoryTree {
        MemoryTree::new()
            .with_file("/angular.json", ANGULAR_JSON)
            .with_file("/src/main.ts", MAIN_TS)
    }

    #[test]
    fn parses_workspace_config() {
        let config = WorkspaceConfig::from_json(ANGULAR_JSON).unwrap();

        assert_eq!(config.default_project.as_deref(), Some("shop"));
        let (_, shop) = config.project(None).unwrap();
        assert_eq!(shop.main_file(), Some("src/main.ts"));
        assert!(shop.architect["build"].options.extra.contains_key("tsConfig"));
        let (_, admin) = config.project(Some("admin")).unwrap();
        assert_eq!(admin.main_file(), Some("projects/admin/src/main.ts"));
    }

    #[test]
    fn resolves_root_module() {
        let path = resolve_root_module_path(&store(), None).unwrap();

        assert_eq!(path, "/src/app/app.module.ts");
    }

    #[test]
    fn missing_configuration() {
        let result = resolve_root_module_path(&MemoryTree::new(), None);

        assert!(matches!(result, Err(ConfigError::ConfigurationMissing { .. })));
    }

    #[test]
    fn invalid_configuration() {
        let tree = MemoryTree::new().with_file("/angular.json", "{ not json");

        let result = resolve_root_module_path(&tree, None);

        assert!(matches!(result, Err(ConfigError::InvalidConfiguration { .. })));
    }

    #[test]
    fn unknown_project() {
        let result = resolve_root_module_path(&store(), Some("blog"));

        assert_eq!(
            result,
            Err(ConfigError::ProjectNotFound {
                name: "blog".to_string()
            })
        );
    }

    #[test]
    fn single_project_is_the_default() {
        let config = WorkspaceConfig::from_json(r#"{"projects": {"only": {}}}"#).unwrap();

        assert_eq!(config.project(None).unwrap().0, "only");
    }

    #[test]
    fn missing_main_file() {
        let tree = MemoryTree::new().with_file("/angular.json", ANGULAR_JSON);

        let result = resolve_root_module_path(&tree, None);

        assert_eq!(
            result,
            Err(ConfigError::FileNotFound {
                path: "/src/main.ts".to_string()
            })
        );
    }

    #[test]
    fn build_options_without_entry_point() {
        let json = r#"{
            "projects": {
                "shop": {
                    "root": "",
                    "sourceRoot": "src",
                    "architect": { "build": { "options": {} } }
                }
            }
        }"#;
        let tree = MemoryTree::new().with_file("/angular.json", json);

        let result = resolve_root_module_path(&tree, None);

        assert_eq!(
            result,
            Err(ConfigError::TargetNotResolvable {
                project: "shop".to_string(),
                reason: "no main file in build options (src)".to_string(),
            })
        );
    }

    #[test]
    fn main_without_bootstrap() {
        let tree = store().with_file("/src/main.ts", "console.log('hi');\n");

        let result = resolve_root_module_path(&tree, None);

        assert!(matches!(result, Err(ConfigError::TargetNotResolvable { .. })));
    }
}
