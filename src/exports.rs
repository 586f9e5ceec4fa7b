//! Export indexing for the reference program host.
//!
//! Each module is parsed once into a fresh arena and reduced to an owned
//! [`ModuleSummary`]: what it exports, what it declares at top level and
//! what it imports. Re-export chains are followed later by the host.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrowFunctionExpression, BindingPattern, Class, Declaration, ExportDefaultDeclarationKind,
    Expression, FormalParameters, Function, FunctionBody, ImportDeclarationSpecifier,
    ModuleExportName, ReturnStatement, Statement, TSModuleDeclarationName, TSType, TSTypeName,
    VariableDeclaration,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashMap;
use std::path::Path;

use crate::oracle::{
    CallableKind, CallableShape, ClassShape, ExportedDeclaration, Heritage, OtherKind,
    SignatureSyntax, TypeAnnotation, TypeRef, ValueShape, VariableShape,
};

// ═══════════════════════════════════════════════════════════════════════════════
// SUMMARY TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ExportTarget {
    /// Declared in place (`export function`, `export default class`, ...).
    Declared(ExportedDeclaration),
    /// `export { local as name }` / `export default local`
    Local(String),
    /// `export { name as alias } from "specifier"`
    Forward { specifier: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImportedName {
    Default,
    Named(String),
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportedBinding {
    pub specifier: String,
    pub name: ImportedName,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ModuleSummary {
    /// Exported names in source order. A name may repeat (overloads,
    /// declaration merging).
    pub exports: Vec<(String, ExportTarget)>,
    /// `export * from "specifier"`
    pub star_exports: Vec<String>,
    /// Top-level value declarations by binding name.
    pub locals: HashMap<String, Vec<ExportedDeclaration>>,
    /// Runtime import bindings by local name.
    pub imports: HashMap<String, ImportedBinding>,
    pub parse_error: Option<String>,
}

/// Add a declaration to a list, folding function overloads into one.
pub(crate) fn push_declaration(list: &mut Vec<ExportedDeclaration>, decl: ExportedDeclaration) {
    if let ExportedDeclaration::Function(incoming) = decl {
        for existing in list.iter_mut() {
            if let ExportedDeclaration::Function(shape) = existing {
                shape.merge(incoming);
                return;
            }
        }
        list.push(ExportedDeclaration::Function(incoming));
    } else {
        list.push(decl);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE INDEXING
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn summarize(path: &Path, source: &str) -> ModuleSummary {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::tsx());
    let ret = Parser::new(&allocator, source, source_type).parse();

    if ret.panicked {
        return ModuleSummary {
            parse_error: Some(format!("{:?}", ret.errors)),
            ..Default::default()
        };
    }
    if !ret.errors.is_empty() {
        tracing::debug!(
            "indexing {} despite {} parse errors",
            path.display(),
            ret.errors.len()
        );
    }

    let mut summary = ModuleSummary::default();
    for stmt in &ret.program.body {
        summary.index_statement(stmt);
    }
    summary
}

impl ModuleSummary {
    fn index_statement(&mut self, stmt: &Statement<'_>) {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                if decl.import_kind.is_type() {
                    return;
                }
                let Some(specifiers) = &decl.specifiers else {
                    return;
                };
                let specifier = decl.source.value.to_string();
                for spec in specifiers {
                    let (local, name) = match spec {
                        ImportDeclarationSpecifier::ImportSpecifier(s) => {
                            if s.import_kind.is_type() {
                                continue;
                            }
                            (
                                s.local.name.to_string(),
                                ImportedName::Named(export_name(&s.imported)),
                            )
                        }
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            (s.local.name.to_string(), ImportedName::Default)
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            (s.local.name.to_string(), ImportedName::Namespace)
                        }
                    };
                    self.imports.insert(
                        local,
                        ImportedBinding {
                            specifier: specifier.clone(),
                            name,
                        },
                    );
                }
            }
            Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                    let shape = ExportedDeclaration::Function(function_shape(
                        func,
                        CallableKind::FunctionDeclaration,
                    ));
                    if let Some(id) = &func.id {
                        self.add_local(id.name.to_string(), shape.clone());
                    }
                    self.add_export("default", ExportTarget::Declared(shape));
                }
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    let shape = ExportedDeclaration::Class(class_shape(class));
                    if let Some(id) = &class.id {
                        self.add_local(id.name.to_string(), shape.clone());
                    }
                    self.add_export("default", ExportTarget::Declared(shape));
                }
                ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {}
                kind => {
                    if let Some(expr) = kind.as_expression() {
                        let target = match unparenthesize(expr) {
                            Expression::Identifier(ident) => {
                                ExportTarget::Local(ident.name.to_string())
                            }
                            other => ExportTarget::Declared(
                                ExportedDeclaration::DefaultExpression(value_shape(other)),
                            ),
                        };
                        self.add_export("default", target);
                    }
                }
            },
            Statement::ExportNamedDeclaration(decl) => {
                if decl.export_kind.is_type() {
                    return;
                }
                if let Some(declaration) = &decl.declaration {
                    for (name, shape) in declared_names(declaration) {
                        self.add_local(name.clone(), shape.clone());
                        self.add_export(&name, ExportTarget::Declared(shape));
                    }
                }
                for spec in &decl.specifiers {
                    if spec.export_kind.is_type() {
                        continue;
                    }
                    let exported = export_name(&spec.exported);
                    let local = export_name(&spec.local);
                    let target = match &decl.source {
                        Some(source) => ExportTarget::Forward {
                            specifier: source.value.to_string(),
                            name: local,
                        },
                        None => ExportTarget::Local(local),
                    };
                    self.add_export(&exported, target);
                }
            }
            Statement::ExportAllDeclaration(decl) => {
                if decl.export_kind.is_type() {
                    return;
                }
                match &decl.exported {
                    Some(name) => self.add_export(
                        &export_name(name),
                        ExportTarget::Declared(ExportedDeclaration::Other(OtherKind::Namespace)),
                    ),
                    None => self.star_exports.push(decl.source.value.to_string()),
                }
            }
            Statement::VariableDeclaration(var) => {
                for (name, shape) in variable_shapes(var) {
                    self.add_local(name, shape);
                }
            }
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    let shape = ExportedDeclaration::Function(function_shape(
                        func,
                        CallableKind::FunctionDeclaration,
                    ));
                    self.add_local(id.name.to_string(), shape);
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    self.add_local(
                        id.name.to_string(),
                        ExportedDeclaration::Class(class_shape(class)),
                    );
                }
            }
            Statement::TSEnumDeclaration(decl) => {
                self.add_local(
                    decl.id.name.to_string(),
                    ExportedDeclaration::Other(OtherKind::Enum),
                );
            }
            Statement::TSModuleDeclaration(decl) => {
                if let TSModuleDeclarationName::Identifier(id) = &decl.id {
                    self.add_local(
                        id.name.to_string(),
                        ExportedDeclaration::Other(OtherKind::Namespace),
                    );
                }
            }
            _ => {}
        }
    }

    fn add_local(&mut self, name: String, decl: ExportedDeclaration) {
        push_declaration(self.locals.entry(name).or_default(), decl);
    }

    fn add_export(&mut self, name: &str, target: ExportTarget) {
        self.exports.push((name.to_string(), target));
    }
}

/// Value declarations introduced by an `export <declaration>`.
/// Interfaces and type aliases carry no runtime value and are skipped.
fn declared_names(declaration: &Declaration<'_>) -> Vec<(String, ExportedDeclaration)> {
    match declaration {
        Declaration::VariableDeclaration(var) => variable_shapes(var),
        Declaration::FunctionDeclaration(func) => func
            .id
            .as_ref()
            .map(|id| {
                vec![(
                    id.name.to_string(),
                    ExportedDeclaration::Function(function_shape(
                        func,
                        CallableKind::FunctionDeclaration,
                    )),
                )]
            })
            .unwrap_or_default(),
        Declaration::ClassDeclaration(class) => class
            .id
            .as_ref()
            .map(|id| {
                vec![(
                    id.name.to_string(),
                    ExportedDeclaration::Class(class_shape(class)),
                )]
            })
            .unwrap_or_default(),
        Declaration::TSEnumDeclaration(decl) => vec![(
            decl.id.name.to_string(),
            ExportedDeclaration::Other(OtherKind::Enum),
        )],
        Declaration::TSModuleDeclaration(decl) => match &decl.id {
            TSModuleDeclarationName::Identifier(id) => vec![(
                id.name.to_string(),
                ExportedDeclaration::Other(OtherKind::Namespace),
            )],
            _ => vec![],
        },
        _ => vec![],
    }
}

fn variable_shapes(var: &VariableDeclaration<'_>) -> Vec<(String, ExportedDeclaration)> {
    let declarator_count = var.declarations.len();
    var.declarations
        .iter()
        .filter_map(|d| {
            if let BindingPattern::BindingIdentifier(id) = &d.id {
                let name = id.name.to_string();
                Some((
                    name.clone(),
                    ExportedDeclaration::Variable(VariableShape {
                        name,
                        declarator_count,
                        init: d.init.as_ref().map(value_shape),
                    }),
                ))
            } else {
                // Destructured bindings are never components
                None
            }
        })
        .collect()
}

pub(crate) fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHAPES
// ═══════════════════════════════════════════════════════════════════════════════

fn unparenthesize<'e, 'a>(mut expr: &'e Expression<'a>) -> &'e Expression<'a> {
    while let Expression::ParenthesizedExpression(paren) = expr {
        expr = &paren.expression;
    }
    expr
}

fn value_shape(expr: &Expression<'_>) -> ValueShape {
    match unparenthesize(expr) {
        Expression::ArrowFunctionExpression(arrow) => ValueShape::Callable(arrow_shape(arrow)),
        Expression::FunctionExpression(func) => {
            ValueShape::Callable(function_shape(func, CallableKind::FunctionExpression))
        }
        _ => ValueShape::Other,
    }
}

fn class_shape(class: &Class<'_>) -> ClassShape {
    ClassShape {
        name: class.id.as_ref().map(|id| id.name.to_string()),
        heritage: class.super_class.as_ref().map(|expr| match expr {
            Expression::StaticMemberExpression(member) => match &member.object {
                Expression::Identifier(object) => Heritage::Member {
                    object: object.name.to_string(),
                    property: member.property.name.to_string(),
                },
                _ => Heritage::Other,
            },
            Expression::Identifier(ident) => Heritage::Identifier {
                name: ident.name.to_string(),
            },
            _ => Heritage::Other,
        }),
    }
}

fn function_shape(func: &Function<'_>, kind: CallableKind) -> CallableShape {
    let signature = SignatureSyntax {
        parameter_count: parameter_count(&func.params),
        return_annotation: func
            .return_type
            .as_ref()
            .map(|annotation| type_annotation(&annotation.type_annotation)),
        returns_jsx: func.body.as_ref().is_some_and(|body| body_returns_jsx(body)),
    };
    CallableShape::new(kind, signature, func.body.is_some())
}

fn arrow_shape(arrow: &ArrowFunctionExpression<'_>) -> CallableShape {
    let returns_jsx = if arrow.expression {
        match arrow.body.statements.first() {
            Some(Statement::ExpressionStatement(stmt)) => yields_jsx(&stmt.expression),
            _ => false,
        }
    } else {
        body_returns_jsx(&arrow.body)
    };
    let signature = SignatureSyntax {
        parameter_count: parameter_count(&arrow.params),
        return_annotation: arrow
            .return_type
            .as_ref()
            .map(|annotation| type_annotation(&annotation.type_annotation)),
        returns_jsx,
    };
    CallableShape::new(CallableKind::Arrow, signature, true)
}

fn parameter_count(params: &FormalParameters<'_>) -> usize {
    params.items.len() + usize::from(params.rest.is_some())
}

fn type_annotation(ty: &TSType<'_>) -> TypeAnnotation {
    match ty {
        TSType::TSTypeReference(reference) => type_ref(&reference.type_name)
            .map(TypeAnnotation::Reference)
            .unwrap_or(TypeAnnotation::Other),
        _ => TypeAnnotation::Other,
    }
}

fn type_ref(name: &TSTypeName<'_>) -> Option<TypeRef> {
    match name {
        TSTypeName::IdentifierReference(ident) => Some(TypeRef {
            namespace: None,
            name: ident.name.to_string(),
        }),
        TSTypeName::QualifiedName(qualified) => Some(TypeRef {
            namespace: rightmost_name(&qualified.left),
            name: qualified.right.name.to_string(),
        }),
        _ => None,
    }
}

fn rightmost_name(name: &TSTypeName<'_>) -> Option<String> {
    match name {
        TSTypeName::IdentifierReference(ident) => Some(ident.name.to_string()),
        TSTypeName::QualifiedName(qualified) => Some(qualified.right.name.to_string()),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JSX RETURN INFERENCE
// ═══════════════════════════════════════════════════════════════════════════════

fn yields_jsx(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::JSXElement(_) | Expression::JSXFragment(_) => true,
        Expression::ParenthesizedExpression(paren) => yields_jsx(&paren.expression),
        Expression::ConditionalExpression(cond) => {
            yields_jsx(&cond.consequent) && yields_jsx(&cond.alternate)
        }
        _ => false,
    }
}

fn body_returns_jsx(body: &FunctionBody<'_>) -> bool {
    let mut collector = ReturnCollector {
        returns: Vec::new(),
    };
    collector.visit_function_body(body);
    !collector.returns.is_empty() && collector.returns.iter().all(|r| *r)
}

/// Collects whether each `return` of one function body yields JSX. Nested
/// functions and classes have their own returns and are not entered.
struct ReturnCollector {
    returns: Vec<bool>,
}

impl<'a> Visit<'a> for ReturnCollector {
    fn visit_return_statement(&mut self, stmt: &ReturnStatement<'a>) {
        self.returns
            .push(stmt.argument.as_ref().is_some_and(|arg| yields_jsx(arg)));
    }

    fn visit_function(&mut self, _func: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _arrow: &ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _class: &Class<'a>) {}
}
