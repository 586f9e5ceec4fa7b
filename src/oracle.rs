//! Symbol/type oracle port.
//!
//! The transform never resolves modules or computes types itself. Whatever
//! host compiles the program implements [`SymbolOracle`]; the crate ships
//! [`crate::ProgramHost`] as a reference host.
//!
//! Declarations cross this boundary as owned shapes, detached from any
//! syntax-tree arena, so an oracle may index its program once and answer
//! queries from many modules concurrently.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::OracleError;

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARATION SHAPES
// ═══════════════════════════════════════════════════════════════════════════════

/// A declaration reachable through an exported name of a target module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportedDeclaration {
    Class(ClassShape),
    Function(CallableShape),
    Variable(VariableShape),
    /// `export default <expression>`
    DefaultExpression(ValueShape),
    /// Enums, namespaces and namespace re-exports.
    Other(OtherKind),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassShape {
    pub name: Option<String>,
    /// The immediate `extends` clause only.
    pub heritage: Option<Heritage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Heritage {
    /// `extends Object.Property`
    Member { object: String, property: String },
    /// `extends Identifier`
    Identifier { name: String },
    Other,
}

/// One declarator of a `const`/`let`/`var` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableShape {
    pub name: String,
    /// Number of declarators in the enclosing statement.
    pub declarator_count: usize,
    pub init: Option<ValueShape>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValueShape {
    Callable(CallableShape),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallableKind {
    FunctionDeclaration,
    FunctionExpression,
    Arrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OtherKind {
    Enum,
    Namespace,
}

/// A function-valued declaration together with its signature syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallableShape {
    pub kind: CallableKind,
    /// Overload signatures in declaration order (bodiless `function` heads).
    pub overloads: Vec<SignatureSyntax>,
    /// The signature of the body-carrying declaration, if any.
    pub implementation: Option<SignatureSyntax>,
}

impl CallableShape {
    pub fn new(kind: CallableKind, signature: SignatureSyntax, has_body: bool) -> Self {
        if has_body {
            Self {
                kind,
                overloads: Vec::new(),
                implementation: Some(signature),
            }
        } else {
            Self {
                kind,
                overloads: vec![signature],
                implementation: None,
            }
        }
    }

    /// Signatures visible to callers: the overloads when present, otherwise
    /// the implementation.
    pub fn visible_signatures(&self) -> Vec<&SignatureSyntax> {
        if self.overloads.is_empty() {
            self.implementation.iter().collect()
        } else {
            self.overloads.iter().collect()
        }
    }

    /// Fold another declaration of the same function into this one.
    pub fn merge(&mut self, other: CallableShape) {
        self.overloads.extend(other.overloads);
        if other.implementation.is_some() {
            self.implementation = other.implementation;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureSyntax {
    /// Declared parameters, a rest parameter counting as one. `this` is not a
    /// parameter.
    pub parameter_count: usize,
    pub return_annotation: Option<TypeAnnotation>,
    /// Every return path yields a JSX element or fragment.
    pub returns_jsx: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TypeAnnotation {
    Reference(TypeRef),
    Other,
}

/// A named type and the namespace that immediately encloses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub namespace: Option<String>,
    pub name: String,
}

impl TypeRef {
    pub fn simple(name: &str) -> Self {
        Self {
            namespace: None,
            name: name.to_string(),
        }
    }

    pub fn qualified(namespace: &str, name: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARED TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredType {
    /// Call signatures in declaration order.
    pub call_signatures: Vec<CallSignature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSignature {
    pub parameter_count: usize,
    /// `None` when the return type is not a named type.
    pub return_type: Option<TypeRef>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedExport {
    pub name: String,
    pub declarations: Vec<ExportedDeclaration>,
}

/// Ordered exports of one module, re-export chains already followed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleExports {
    pub entries: Vec<ResolvedExport>,
}

impl ModuleExports {
    pub fn get(&self, name: &str) -> Option<&ResolvedExport> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Whole-program symbol and type resolution, read-only for the duration of a
/// transform pass.
pub trait SymbolOracle: Send + Sync {
    /// Exports of the module `specifier` as seen from `importer`.
    fn module_exports(&self, importer: &Path, specifier: &str)
        -> Result<ModuleExports, OracleError>;

    /// Declared type of a function-valued declaration.
    fn declared_type(&self, callable: &CallableShape) -> DeclaredType;

    /// Resolve one exported name to exactly one declaration.
    fn resolve_export(
        &self,
        importer: &Path,
        specifier: &str,
        name: &str,
    ) -> Result<ExportedDeclaration, OracleError> {
        let exports = self.module_exports(importer, specifier)?;
        let entry = exports.get(name).ok_or_else(|| OracleError::ExportNotFound {
            module: importer.join(specifier),
            name: name.to_string(),
        })?;
        single_declaration(specifier, name, entry.declarations.clone())
    }
}

/// Enforce the "exactly one declaration" rule.
pub fn single_declaration(
    specifier: &str,
    name: &str,
    mut declarations: Vec<ExportedDeclaration>,
) -> Result<ExportedDeclaration, OracleError> {
    if declarations.len() == 1 {
        if let Some(declaration) = declarations.pop() {
            return Ok(declaration);
        }
    }
    Err(OracleError::Ambiguous {
        specifier: specifier.to_string(),
        name: name.to_string(),
        count: declarations.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(parameter_count: usize) -> SignatureSyntax {
        SignatureSyntax {
            parameter_count,
            return_annotation: None,
            returns_jsx: true,
        }
    }

    #[test]
    fn test_overloads_hide_implementation() {
        let mut shape = CallableShape::new(CallableKind::FunctionDeclaration, signature(3), false);
        shape.merge(CallableShape::new(
            CallableKind::FunctionDeclaration,
            signature(1),
            true,
        ));

        let visible = shape.visible_signatures();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].parameter_count, 3);
        assert_eq!(shape.implementation.as_ref().unwrap().parameter_count, 1);
    }

    #[test]
    fn test_single_declaration_rejects_ambiguity() {
        let decl = ExportedDeclaration::Other(OtherKind::Namespace);
        assert!(single_declaration("./a", "A", vec![decl.clone()]).is_ok());

        let err = single_declaration("./a", "A", vec![decl.clone(), decl]).unwrap_err();
        assert!(matches!(err, OracleError::Ambiguous { count: 2, .. }));

        let err = single_declaration("./a", "A", vec![]).unwrap_err();
        assert!(matches!(err, OracleError::Ambiguous { count: 0, .. }));
    }
}
