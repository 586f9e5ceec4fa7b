//! Module gate and import candidate selection.
//!
//! Purely syntactic: nothing here consults the oracle.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use oxc_ast::ast::{ImportDeclaration, ImportDeclarationSpecifier, ModuleExportName, Program, Statement};

use crate::exports::export_name;
use crate::options::FrameworkConfig;

lazy_static! {
    static ref DECLARATION_FILE_RE: Regex = Regex::new(r"\.d\.[cm]?ts$").unwrap();
}

/// Why a whole module was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// The module never imports the framework entry module.
    NoFrameworkImport,
    /// The module carries type information only.
    DeclarationFile,
}

/// Decide whether `program` is walked at all.
pub fn module_gate(
    program: &Program<'_>,
    path: &Path,
    framework: &FrameworkConfig,
) -> Option<SkipReason> {
    let is_declaration_file = program.source_type.is_typescript_definition()
        || DECLARATION_FILE_RE.is_match(&path.to_string_lossy());
    if is_declaration_file {
        return Some(SkipReason::DeclarationFile);
    }

    let imports_framework = program.body.iter().any(|stmt| {
        matches!(stmt, Statement::ImportDeclaration(decl) if decl.source.value.as_str() == framework.module)
    });
    if !imports_framework {
        return Some(SkipReason::NoFrameworkImport);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// CANDIDATES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Default,
    Named {
        imported: String,
        /// `{ "kebab-name" as Local }`
        string_literal: bool,
        type_only: bool,
    },
    Namespace,
}

/// One local name bound by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local: String,
    pub kind: BindingKind,
}

impl ImportBinding {
    /// Uppercase-led runtime binding that could name a component.
    pub fn is_plausible(&self) -> bool {
        let uppercase = self.local.chars().next().is_some_and(char::is_uppercase);
        let runtime = match &self.kind {
            BindingKind::Default => true,
            BindingKind::Named { type_only, .. } => !type_only,
            BindingKind::Namespace => false,
        };
        uppercase && runtime
    }

    /// Plausible and allowed through the `onlyDefaultExports` switch.
    pub fn is_classifiable(&self, only_default_exports: bool) -> bool {
        self.is_plausible()
            && (!only_default_exports || matches!(self.kind, BindingKind::Default))
    }

    /// Name of the export this binding reads from the target module.
    pub fn export_name(&self) -> Option<&str> {
        match &self.kind {
            BindingKind::Default => Some("default"),
            BindingKind::Named { imported, .. } => Some(imported),
            BindingKind::Namespace => None,
        }
    }
}

/// A top-level import statement worth classifying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCandidate {
    /// Position in the module's top-level statement list.
    pub index: usize,
    pub specifier: String,
    /// Every binding of the statement, in source order.
    pub bindings: Vec<ImportBinding>,
}

pub fn select_candidates(program: &Program<'_>) -> Vec<ImportCandidate> {
    program
        .body
        .iter()
        .enumerate()
        .filter_map(|(index, stmt)| match stmt {
            Statement::ImportDeclaration(decl) => candidate(index, decl),
            _ => None,
        })
        .collect()
}

fn candidate(index: usize, decl: &ImportDeclaration<'_>) -> Option<ImportCandidate> {
    if decl.import_kind.is_type() {
        return None;
    }
    let bindings: Vec<ImportBinding> = decl
        .specifiers
        .as_ref()?
        .iter()
        .map(import_binding)
        .collect();
    if !bindings.iter().any(ImportBinding::is_plausible) {
        return None;
    }

    let specifier = decl.source.value.to_string();
    tracing::trace!(
        "candidate import of '{}' at statement {} ({} bindings)",
        specifier,
        index,
        bindings.len()
    );
    Some(ImportCandidate {
        index,
        specifier,
        bindings,
    })
}

fn import_binding(spec: &ImportDeclarationSpecifier<'_>) -> ImportBinding {
    match spec {
        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => ImportBinding {
            local: s.local.name.to_string(),
            kind: BindingKind::Default,
        },
        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => ImportBinding {
            local: s.local.name.to_string(),
            kind: BindingKind::Namespace,
        },
        ImportDeclarationSpecifier::ImportSpecifier(s) => ImportBinding {
            local: s.local.name.to_string(),
            kind: BindingKind::Named {
                imported: export_name(&s.imported),
                string_literal: matches!(s.imported, ModuleExportName::StringLiteral(_)),
                type_only: s.import_kind.is_type(),
            },
        },
    }
}

/// Local name bound by an import specifier.
pub(crate) fn specifier_local<'s>(spec: &'s ImportDeclarationSpecifier<'_>) -> &'s str {
    match spec {
        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => s.local.name.as_str(),
        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => s.local.name.as_str(),
        ImportDeclarationSpecifier::ImportSpecifier(s) => s.local.name.as_str(),
    }
}
