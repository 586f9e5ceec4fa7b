//! Component classification.
//!
//! A binding is a component when the declaration behind it, resolved from the
//! importing module, matches one of two structural rules:
//!
//! - **Class rule**: `class X extends <Root>.<Base>`. Only the immediate
//!   heritage clause is inspected; intermediate subclasses are not followed.
//! - **Function rule**: a callable value whose first call signature takes one
//!   or two parameters and returns the framework element type, matched by
//!   name and enclosing namespace.
//!
//! Anything the oracle cannot resolve to exactly one declaration is not a
//! component.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::options::FrameworkConfig;
use crate::oracle::{
    CallableShape, ExportedDeclaration, Heritage, SymbolOracle, ValueShape,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    Class,
    Function,
}

pub struct ComponentClassifier<'o> {
    oracle: &'o dyn SymbolOracle,
    framework: &'o FrameworkConfig,
}

impl<'o> ComponentClassifier<'o> {
    pub fn new(oracle: &'o dyn SymbolOracle, framework: &'o FrameworkConfig) -> Self {
        Self { oracle, framework }
    }

    pub fn is_component(&self, importer: &Path, specifier: &str, exported: &str) -> bool {
        self.classify(importer, specifier, exported).is_some()
    }

    /// Resolve `exported` of `specifier` as seen from `importer` and classify it.
    pub fn classify(
        &self,
        importer: &Path,
        specifier: &str,
        exported: &str,
    ) -> Option<ComponentKind> {
        let declaration = match self.oracle.resolve_export(importer, specifier, exported) {
            Ok(declaration) => declaration,
            Err(err) => {
                tracing::debug!(
                    "'{}' from '{}' is not a component: {}",
                    exported,
                    specifier,
                    err
                );
                return None;
            }
        };

        let verdict = self.classify_declaration(&declaration);
        tracing::debug!(
            "'{}' from '{}' classified as {:?}",
            exported,
            specifier,
            verdict
        );
        verdict
    }

    pub fn classify_declaration(&self, declaration: &ExportedDeclaration) -> Option<ComponentKind> {
        if self.extends_base_component(declaration) {
            return Some(ComponentKind::Class);
        }
        let callable = callable_value(declaration)?;
        self.returns_element(callable).then_some(ComponentKind::Function)
    }

    fn extends_base_component(&self, declaration: &ExportedDeclaration) -> bool {
        let ExportedDeclaration::Class(class) = declaration else {
            return false;
        };
        matches!(
            &class.heritage,
            Some(Heritage::Member { object, property })
                if *object == self.framework.root_identifier
                    && *property == self.framework.base_component
        )
    }

    fn returns_element(&self, callable: &CallableShape) -> bool {
        let declared = self.oracle.declared_type(callable);
        // Overloaded callables are judged by their first signature only
        let Some(signature) = declared.call_signatures.first() else {
            return false;
        };
        if !(1..=2).contains(&signature.parameter_count) {
            return false;
        }
        signature
            .return_type
            .as_ref()
            .is_some_and(|ty| self.framework.element_type.matches(ty))
    }
}

/// Reduce a declaration to the function value it denotes, if any.
///
/// Covers function declarations, a single-declarator variable initialised
/// with a function or arrow expression, and `export default` of one.
pub fn callable_value(declaration: &ExportedDeclaration) -> Option<&CallableShape> {
    match declaration {
        ExportedDeclaration::Function(callable) => Some(callable),
        ExportedDeclaration::Variable(variable) if variable.declarator_count == 1 => {
            match &variable.init {
                Some(ValueShape::Callable(callable)) => Some(callable),
                _ => None,
            }
        }
        ExportedDeclaration::DefaultExpression(ValueShape::Callable(callable)) => Some(callable),
        _ => None,
    }
}
