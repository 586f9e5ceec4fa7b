//! Lazy component transform entry points.
//!
//! [`LazyComponentTransform::transform_program`] is the core pass over one
//! parsed module: gate, select candidates, classify through the oracle, plan,
//! synthesize, splice. The source-level and batch entry points wrap it with
//! parsing and emit.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oxc_allocator::Allocator;
use oxc_ast::ast::{Program, Statement};
use oxc_ast::AstBuilder;
use oxc_ast_visit::VisitMut;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::classify::ComponentClassifier;
use crate::error::{TransformError, TransformResult};
use crate::options::{SpecifierFilter, TransformOptions};
use crate::oracle::SymbolOracle;
use crate::select::{module_gate, select_candidates, ImportCandidate, SkipReason};
use crate::synthesize::{plan_rewrite, PlanDecision, Synthesizer, Templates};
use crate::walker::ImportSplicer;

/// Per-statement opt-out hook: `(specifier, importing file) -> rewrite?`.
pub type RewritePredicate = Arc<dyn Fn(&str, &Path) -> bool + Send + Sync>;

// ═══════════════════════════════════════════════════════════════════════════════
// REPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Disposition {
    /// Components went lazy and a residual import remains.
    Rewritten,
    /// Every binding went lazy; the import is gone.
    FullyConsumed,
    /// Left unchanged under `onlyRewriteIfFullyRemovable`.
    BailedOut,
    /// `shouldRewrite` declined the statement.
    OptedOut,
    NoComponents,
    /// A replacement template failed to parse; the statement is unchanged.
    SynthesisFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementReport {
    pub specifier: String,
    pub disposition: Disposition,
    /// Locals bound by lazy declarations.
    pub lazy: Vec<String>,
    /// Locals left on an eager import.
    pub residual: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformReport {
    pub path: PathBuf,
    pub skipped: Option<SkipReason>,
    /// One entry per candidate import, in source order.
    pub statements: Vec<StatementReport>,
    /// References to each lazy name found in the rewritten module.
    pub lazy_references: BTreeMap<String, usize>,
}

impl TransformReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Default::default()
        }
    }

    pub fn is_modified(&self) -> bool {
        self.statements.iter().any(|s| {
            matches!(
                s.disposition,
                Disposition::Rewritten | Disposition::FullyConsumed
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub code: String,
    pub report: TransformReport,
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: TransformResult<TransformOutput>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TransformBuilder {
    options: TransformOptions,
    oracle: Option<Arc<dyn SymbolOracle>>,
    should_rewrite: Option<RewritePredicate>,
}

impl TransformBuilder {
    pub fn new(options: TransformOptions) -> Self {
        Self {
            options,
            oracle: None,
            should_rewrite: None,
        }
    }

    pub fn oracle<O: SymbolOracle + 'static>(self, oracle: O) -> Self {
        self.shared_oracle(Arc::new(oracle))
    }

    pub fn shared_oracle(mut self, oracle: Arc<dyn SymbolOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Replace the include/exclude filter with a custom predicate.
    pub fn should_rewrite<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &Path) -> bool + Send + Sync + 'static,
    {
        self.should_rewrite = Some(Arc::new(predicate));
        self
    }

    /// Validate the configuration. Every error here is fatal.
    pub fn build(self) -> TransformResult<LazyComponentTransform> {
        let oracle = self.oracle.ok_or(TransformError::MissingOracle)?;
        let filter = SpecifierFilter::compile(&self.options)?;
        let templates = Templates::new(&self.options)?;
        Ok(LazyComponentTransform {
            options: self.options,
            oracle,
            templates,
            filter,
            should_rewrite: self.should_rewrite,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORM
// ═══════════════════════════════════════════════════════════════════════════════

pub struct LazyComponentTransform {
    options: TransformOptions,
    oracle: Arc<dyn SymbolOracle>,
    templates: Templates,
    filter: SpecifierFilter,
    should_rewrite: Option<RewritePredicate>,
}

impl LazyComponentTransform {
    pub fn builder(options: TransformOptions) -> TransformBuilder {
        TransformBuilder::new(options)
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Rewrite component imports of `program` in place.
    ///
    /// `allocator` must be the arena `program` was parsed into. Statements
    /// that are not rewritten are left untouched.
    pub fn transform_program<'a>(
        &self,
        allocator: &'a Allocator,
        program: &mut Program<'a>,
        path: &Path,
    ) -> TransformReport {
        let mut report = TransformReport::new(path);

        if let Some(reason) = module_gate(program, path, &self.options.framework) {
            tracing::debug!("skipping {}: {:?}", path.display(), reason);
            report.skipped = Some(reason);
            return report;
        }

        let classifier = ComponentClassifier::new(self.oracle.as_ref(), &self.options.framework);
        let synthesizer = Synthesizer::new(allocator, &self.templates);
        let mut splicer = ImportSplicer::new(AstBuilder::new(allocator));

        for candidate in select_candidates(program) {
            let statement =
                self.rewrite_statement(program, path, &candidate, &classifier, &synthesizer, &mut splicer);
            report.statements.push(statement);
        }

        if splicer.has_replacements() {
            splicer.visit_program(program);
            report.lazy_references = splicer.into_references().into_iter().collect();
        }
        report
    }

    fn rewrite_statement<'a>(
        &self,
        program: &Program<'a>,
        path: &Path,
        candidate: &ImportCandidate,
        classifier: &ComponentClassifier<'_>,
        synthesizer: &Synthesizer<'a, '_>,
        splicer: &mut ImportSplicer<'a>,
    ) -> StatementReport {
        let specifier = candidate.specifier.as_str();
        let all_locals = || -> Vec<String> {
            candidate.bindings.iter().map(|b| b.local.clone()).collect()
        };
        let unchanged = |disposition: Disposition| StatementReport {
            specifier: specifier.to_string(),
            disposition,
            lazy: Vec::new(),
            residual: all_locals(),
        };

        if !self.allows(specifier, path) {
            tracing::debug!("'{}' opted out in {}", specifier, path.display());
            return unchanged(Disposition::OptedOut);
        }

        let only_default = self.options.only_default_exports;
        let components: HashSet<String> = candidate
            .bindings
            .iter()
            .filter(|binding| binding.is_classifiable(only_default))
            .filter(|binding| {
                binding
                    .export_name()
                    .is_some_and(|exported| classifier.is_component(path, specifier, exported))
            })
            .map(|binding| binding.local.clone())
            .collect();

        let plan = match plan_rewrite(candidate, &components, self.options.only_rewrite_if_fully_removable) {
            PlanDecision::NoComponents => return unchanged(Disposition::NoComponents),
            PlanDecision::BailedOut { residual } => {
                tracing::debug!(
                    "keeping '{}' in {}: {} bindings are not components",
                    specifier,
                    path.display(),
                    residual.len()
                );
                return unchanged(Disposition::BailedOut);
            }
            PlanDecision::Rewrite(plan) => plan,
        };

        let Some(Statement::ImportDeclaration(original)) = program.body.get(candidate.index) else {
            return unchanged(Disposition::SynthesisFailed {
                message: format!("statement {} is not an import", candidate.index),
            });
        };
        let statements = match synthesizer.materialize(&plan, original) {
            Ok(statements) => statements,
            Err(err) => {
                tracing::warn!("leaving '{}' unchanged in {}: {}", specifier, path.display(), err);
                return unchanged(Disposition::SynthesisFailed {
                    message: err.to_string(),
                });
            }
        };

        let lazy: Vec<String> = plan.lazy.iter().map(|b| b.local.clone()).collect();
        tracing::info!(
            "lazy-loading {:?} from '{}' in {} ({} residual)",
            lazy,
            specifier,
            path.display(),
            plan.residual.len()
        );
        splicer.replace(candidate.index, statements, lazy.iter().cloned());

        StatementReport {
            specifier: specifier.to_string(),
            disposition: if plan.is_fully_consumed() {
                Disposition::FullyConsumed
            } else {
                Disposition::Rewritten
            },
            lazy,
            residual: plan.residual,
        }
    }

    fn allows(&self, specifier: &str, path: &Path) -> bool {
        match &self.should_rewrite {
            Some(predicate) => predicate(specifier, path),
            None => self.filter.allows(specifier),
        }
    }

    /// Parse, transform and emit one module. Unmodified modules come back as
    /// the original text. Once any statement is rewritten the whole module is
    /// reprinted by `oxc_codegen`, so untouched statements keep their syntax
    /// but not their original quoting or blank lines.
    pub fn transform_source(&self, source: &str, path: &Path) -> TransformResult<TransformOutput> {
        let allocator = Allocator::default();
        let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::tsx());
        let ret = Parser::new(&allocator, source, source_type).parse();
        if ret.panicked || !ret.errors.is_empty() {
            return Err(TransformError::Parse {
                path: path.to_path_buf(),
                message: format!("{:?}", ret.errors),
            });
        }

        let mut program = ret.program;
        let report = self.transform_program(&allocator, &mut program, path);
        let code = if report.is_modified() {
            Codegen::new().build(&program).code
        } else {
            source.to_string()
        };
        Ok(TransformOutput { code, report })
    }

    pub fn transform_file(&self, path: &Path) -> TransformResult<TransformOutput> {
        let source = fs::read_to_string(path).map_err(|source| TransformError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.transform_source(&source, path)
    }

    /// Transform many modules in parallel. Each module gets its own arena and
    /// a failure stays with its file.
    pub fn transform_files(&self, paths: &[PathBuf]) -> Vec<FileOutcome> {
        paths
            .par_iter()
            .map(|path| FileOutcome {
                path: path.clone(),
                result: self.transform_file(path),
            })
            .collect()
    }
}
