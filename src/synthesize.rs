//! Rewrite planning and replacement statement synthesis.
//!
//! Planning is pure data: which bindings go lazy and which stay behind.
//! Synthesis turns a plan into statements allocated in the module's arena,
//! parsing small source templates so the wrapper factory and injected import
//! can be configured as source text.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use oxc_allocator::{Allocator, CloneIn, Vec as ArenaVec};
use oxc_ast::ast::{Expression, ImportDeclaration, Statement};
use oxc_parser::Parser;
use oxc_span::{GetSpanMut, SourceType, SPAN};

use crate::error::TransformError;
use crate::options::TransformOptions;
use crate::select::{specifier_local, BindingKind, ImportCandidate};

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

/// Callee placeholder swapped for the configured wrapper factory.
const FACTORY_PLACEHOLDER: &str = "__lazy_factory__";

// ═══════════════════════════════════════════════════════════════════════════════
// PLANNING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LazySource {
    /// The dynamic import's own default export.
    Default,
    /// A named export remapped onto `default`.
    Named { export: String, string_literal: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LazyBinding {
    pub local: String,
    pub source: LazySource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewritePlan {
    pub specifier: String,
    /// Lazy bindings in source order.
    pub lazy: Vec<LazyBinding>,
    /// Locals kept on the residual import, in source order.
    pub residual: Vec<String>,
}

impl RewritePlan {
    /// Every local name bound by the replacement, excluding the injected import.
    pub fn bound_names(&self) -> Vec<&str> {
        self.lazy
            .iter()
            .map(|b| b.local.as_str())
            .chain(self.residual.iter().map(String::as_str))
            .collect()
    }

    pub fn is_fully_consumed(&self) -> bool {
        self.residual.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanDecision {
    /// No binding of the statement classified as a component.
    NoComponents,
    /// Components found but a residual would remain under
    /// `onlyRewriteIfFullyRemovable`.
    BailedOut { residual: Vec<String> },
    Rewrite(RewritePlan),
}

/// Split `candidate`'s bindings into lazy and residual sets.
pub fn plan_rewrite(
    candidate: &ImportCandidate,
    components: &HashSet<String>,
    only_rewrite_if_fully_removable: bool,
) -> PlanDecision {
    let mut lazy = Vec::new();
    let mut residual = Vec::new();

    for binding in &candidate.bindings {
        if !components.contains(&binding.local) {
            residual.push(binding.local.clone());
            continue;
        }
        let source = match &binding.kind {
            BindingKind::Default => LazySource::Default,
            BindingKind::Named {
                imported,
                string_literal,
                ..
            } => LazySource::Named {
                export: imported.clone(),
                string_literal: *string_literal,
            },
            // Never classified
            BindingKind::Namespace => {
                residual.push(binding.local.clone());
                continue;
            }
        };
        lazy.push(LazyBinding {
            local: binding.local.clone(),
            source,
        });
    }

    if lazy.is_empty() {
        return PlanDecision::NoComponents;
    }
    if !residual.is_empty() && only_rewrite_if_fully_removable {
        return PlanDecision::BailedOut { residual };
    }
    PlanDecision::Rewrite(RewritePlan {
        specifier: candidate.specifier.clone(),
        lazy,
        residual,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATES
// ═══════════════════════════════════════════════════════════════════════════════

/// Validated wrapper factory and injected import source text.
#[derive(Debug, Clone)]
pub struct Templates {
    wrapper_factory: String,
    injected_import: Option<String>,
}

impl Templates {
    /// Templates that skip validation, for exercising synthesis failures.
    #[cfg(test)]
    pub(crate) fn unchecked(wrapper_factory: &str, injected_import: Option<&str>) -> Self {
        Self {
            wrapper_factory: wrapper_factory.to_string(),
            injected_import: injected_import.map(str::to_string),
        }
    }

    pub fn new(options: &TransformOptions) -> Result<Self, TransformError> {
        let scratch = Allocator::default();

        let factory = options.wrapper_factory.trim();
        if factory.is_empty() {
            return Err(TransformError::InvalidWrapperFactory {
                factory: options.wrapper_factory.clone(),
                message: "empty expression".to_string(),
            });
        }
        Parser::new(&scratch, factory, SourceType::tsx())
            .parse_expression()
            .map_err(|errors| TransformError::InvalidWrapperFactory {
                factory: options.wrapper_factory.clone(),
                message: format!("{:?}", errors),
            })?;

        if let Some(import) = &options.injected_import {
            let ret = Parser::new(&scratch, import, SourceType::tsx()).parse();
            let invalid = |message: String| TransformError::InvalidInjectedImport {
                import: import.clone(),
                message,
            };
            if ret.panicked || !ret.errors.is_empty() {
                return Err(invalid(format!("{:?}", ret.errors)));
            }
            let single_import = ret.program.body.len() == 1
                && matches!(ret.program.body.first(), Some(Statement::ImportDeclaration(_)));
            if !single_import {
                return Err(invalid(
                    "expected exactly one import declaration".to_string(),
                ));
            }
        }

        Ok(Self {
            wrapper_factory: factory.to_string(),
            injected_import: options.injected_import.clone(),
        })
    }
}

/// Source text of the lazy declaration for `binding`, calling the factory
/// placeholder.
fn lazy_declaration_source(specifier: &str, binding: &LazyBinding) -> String {
    let loader = format!("import({})", quote(specifier));
    let continuation = match &binding.source {
        LazySource::Default => String::new(),
        LazySource::Named {
            export,
            string_literal,
        } => {
            let access = if !*string_literal && IDENT_RE.is_match(export) {
                format!("module.{}", export)
            } else {
                format!("module[{}]", quote(export))
            };
            format!(".then((module) => ({{ default: {} }}))", access)
        }
    };
    format!(
        "const {} = {}(() => {}{});",
        binding.local, FACTORY_PLACEHOLDER, loader, continuation
    )
}

fn quote(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SYNTHESIS
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Synthesizer<'a, 't> {
    allocator: &'a Allocator,
    templates: &'t Templates,
}

impl<'a, 't> Synthesizer<'a, 't> {
    pub fn new(allocator: &'a Allocator, templates: &'t Templates) -> Self {
        Self {
            allocator,
            templates,
        }
    }

    /// Build the full replacement for `original`. Nothing is spliced until
    /// every statement has been produced.
    pub fn materialize(
        &self,
        plan: &RewritePlan,
        original: &ImportDeclaration<'a>,
    ) -> Result<ArenaVec<'a, Statement<'a>>, TransformError> {
        let mut statements = ArenaVec::new_in(self.allocator);

        if let Some(import) = &self.templates.injected_import {
            for stmt in self.parse_statements(import)? {
                statements.push(stmt);
            }
        }
        for binding in &plan.lazy {
            statements.push(self.lazy_declaration(&plan.specifier, binding)?);
        }
        if !plan.is_fully_consumed() {
            statements.push(self.residual_import(plan, original));
        }

        // Comments are emitted by statement start; the replacement inherits
        // the ones that led the original import
        if let Some(first) = statements.first_mut() {
            *first.span_mut() = original.span;
        }
        Ok(statements)
    }

    fn parse_statements(&self, text: &str) -> Result<ArenaVec<'a, Statement<'a>>, TransformError> {
        let source: &'a str = self.allocator.alloc_str(text);
        let ret = Parser::new(self.allocator, source, SourceType::tsx()).parse();
        if ret.panicked || !ret.errors.is_empty() {
            return Err(TransformError::Synthesis {
                template: text.to_string(),
                message: format!("{:?}", ret.errors),
            });
        }
        Ok(ret.program.body)
    }

    fn factory_expression(&self) -> Result<Expression<'a>, TransformError> {
        let source: &'a str = self.allocator.alloc_str(&self.templates.wrapper_factory);
        Parser::new(self.allocator, source, SourceType::tsx())
            .parse_expression()
            .map_err(|errors| TransformError::Synthesis {
                template: self.templates.wrapper_factory.clone(),
                message: format!("{:?}", errors),
            })
    }

    fn lazy_declaration(
        &self,
        specifier: &str,
        binding: &LazyBinding,
    ) -> Result<Statement<'a>, TransformError> {
        let text = lazy_declaration_source(specifier, binding);
        let malformed = || TransformError::Synthesis {
            template: text.clone(),
            message: "unexpected template shape".to_string(),
        };

        let mut statements = self.parse_statements(&text)?;
        if statements.len() != 1 {
            return Err(malformed());
        }
        let mut stmt = statements.pop().ok_or_else(malformed)?;

        let Statement::VariableDeclaration(decl) = &mut stmt else {
            return Err(malformed());
        };
        let init = decl
            .declarations
            .first_mut()
            .and_then(|declarator| declarator.init.as_mut());
        let Some(Expression::CallExpression(call)) = init else {
            return Err(malformed());
        };
        call.callee = self.factory_expression()?;
        Ok(stmt)
    }

    /// The original statement, narrowed to the residual bindings. Alias
    /// spellings, attributes and specifier order carry over.
    fn residual_import(&self, plan: &RewritePlan, original: &ImportDeclaration<'a>) -> Statement<'a> {
        let mut residual = original.clone_in(self.allocator);
        // Leading comments travel with the first replacement statement
        residual.span = SPAN;
        if let Some(specifiers) = residual.specifiers.as_mut() {
            specifiers.retain(|spec| plan.residual.iter().any(|name| name == specifier_local(spec)));
        }
        Statement::ImportDeclaration(oxc_allocator::Box::new_in(residual, self.allocator))
    }
}
