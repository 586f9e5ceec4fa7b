//! Transform configuration.
//!
//! Everything here is plain data that can be loaded from JSON. The only
//! programmatic piece, the `shouldRewrite` hook, lives on
//! [`crate::TransformBuilder`].

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::oracle::TypeRef;

// ═══════════════════════════════════════════════════════════════════════════════
// FRAMEWORK DESCRIPTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Names that identify the host UI framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameworkConfig {
    /// Exact specifier of the framework entry module. Modules that never
    /// import it are skipped.
    pub module: String,
    /// Object of the `extends <Root>.<Base>` heritage clause.
    pub root_identifier: String,
    /// Member of the `extends <Root>.<Base>` heritage clause.
    pub base_component: String,
    /// Nominal return type of a function component.
    pub element_type: ElementType,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            module: "react".to_string(),
            root_identifier: "React".to_string(),
            base_component: "Component".to_string(),
            element_type: ElementType::default(),
        }
    }
}

/// A namespaced type name such as `JSX.Element`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementType {
    pub namespace: String,
    pub name: String,
}

impl Default for ElementType {
    fn default() -> Self {
        Self {
            namespace: "JSX".to_string(),
            name: "Element".to_string(),
        }
    }
}

impl ElementType {
    /// Nominal match: symbol name and enclosing namespace, never structure.
    pub fn matches(&self, ty: &TypeRef) -> bool {
        ty.name == self.name && ty.namespace.as_deref() == Some(self.namespace.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORM OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    pub framework: FrameworkConfig,
    /// Source text of the expression that wraps each loader.
    pub wrapper_factory: String,
    /// Source text of an import statement prepended to every rewritten
    /// statement, e.g. `import loadable from "@loadable/component";`.
    pub injected_import: Option<String>,
    /// Only default bindings may become lazy.
    pub only_default_exports: bool,
    /// Leave a statement alone unless every binding it declares goes lazy.
    pub only_rewrite_if_fully_removable: bool,
    /// Specifier patterns to rewrite. Empty means every specifier.
    pub include: Vec<String>,
    /// Specifier patterns never to rewrite.
    pub exclude: Vec<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            framework: FrameworkConfig::default(),
            wrapper_factory: "React.lazy".to_string(),
            injected_import: None,
            only_default_exports: false,
            only_rewrite_if_fully_removable: false,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl TransformOptions {
    pub fn from_json(json: &str) -> Result<Self, TransformError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPECIFIER FILTER
// Default `shouldRewrite` predicate built from include/exclude
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub(crate) struct SpecifierFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl SpecifierFilter {
    pub(crate) fn compile(options: &TransformOptions) -> Result<Self, TransformError> {
        let compile_all = |patterns: &[String]| -> Result<Vec<Regex>, TransformError> {
            patterns
                .iter()
                .map(|p| Regex::new(p).map_err(TransformError::from))
                .collect()
        };
        Ok(Self {
            include: compile_all(&options.include)?,
            exclude: compile_all(&options.exclude)?,
        })
    }

    pub(crate) fn allows(&self, specifier: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|re| re.is_match(specifier));
        included && !self.exclude.iter().any(|re| re.is_match(specifier))
    }
}
