//! # Lazy Component Imports
//!
//! Compile-time rewrite of eager UI component imports into lazy bindings:
//!
//! ```text
//! import Page, { Foo as Bar, helper } from "./ui";
//! ```
//!
//! becomes
//!
//! ```text
//! const Page = React.lazy(() => import("./ui"));
//! const Bar = React.lazy(() => import("./ui").then((module) => ({ default: module.Foo })));
//! import { helper } from "./ui";
//! ```
//!
//! ## Pipeline Invariants
//!
//! 1. **Gate**: a module is only touched when it imports the framework entry
//!    module by exact specifier and is not a declaration file.
//!
//! 2. **Selection**: only top-level imports with an uppercase-led runtime
//!    binding are candidates. Type-only imports never are.
//!
//! 3. **Classification**: every verdict comes from the [`SymbolOracle`],
//!    resolved from the importing module. Unresolved or ambiguous names are
//!    never components.
//!
//! 4. **Name preservation**: the replacement for an import binds exactly the
//!    names the import bound, no more and no fewer.
//!
//! 5. **Atomic splice**: a statement is replaced only once its whole
//!    replacement has been built. Any failure leaves it as it was.

mod classify;
mod error;
mod exports;
mod host;
mod options;
mod oracle;
mod select;
mod synthesize;
mod transform;
mod walker;

#[cfg(test)]
mod classify_tests;

pub use classify::{callable_value, ComponentClassifier, ComponentKind};
pub use error::{OracleError, TransformError, TransformResult};
pub use host::ProgramHost;
pub use options::{ElementType, FrameworkConfig, TransformOptions};
pub use oracle::{
    single_declaration, CallSignature, CallableKind, CallableShape, ClassShape, DeclaredType,
    ExportedDeclaration, Heritage, ModuleExports, OtherKind, ResolvedExport, SignatureSyntax,
    SymbolOracle, TypeAnnotation, TypeRef, ValueShape, VariableShape,
};
pub use select::{module_gate, select_candidates, BindingKind, ImportBinding, ImportCandidate, SkipReason};
pub use synthesize::{plan_rewrite, LazyBinding, LazySource, PlanDecision, RewritePlan};
pub use transform::{
    Disposition, FileOutcome, LazyComponentTransform, RewritePredicate, StatementReport,
    TransformBuilder, TransformOutput, TransformReport,
};
