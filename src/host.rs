//! Reference program host.
//!
//! Indexes every module of a program up front and answers
//! [`SymbolOracle`] queries from that immutable index, so one host can serve
//! many concurrent module transforms.

use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::error::OracleError;
use crate::exports::{push_declaration, summarize, ExportTarget, ImportedName, ModuleSummary};
use crate::oracle::{
    single_declaration, CallSignature, CallableShape, DeclaredType, ExportedDeclaration,
    ModuleExports, OtherKind, ResolvedExport, SymbolOracle, TypeAnnotation, TypeRef,
};

/// Probe order for extensionless specifiers.
const RESOLVE_EXTENSIONS: &[&str] = &[
    ".tsx", ".ts", ".d.ts", ".jsx", ".js", ".mts", ".cts", ".mjs", ".cjs",
];

/// Files picked up by [`ProgramHost::from_dir`].
const SOURCE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js", "mts", "cts", "mjs", "cjs"];

/// Type of an unannotated expression that yields JSX.
fn inferred_jsx_type() -> TypeRef {
    TypeRef::qualified("JSX", "Element")
}

#[derive(Debug, Default)]
pub struct ProgramHost {
    modules: HashMap<PathBuf, ModuleSummary>,
    aliases: HashMap<String, PathBuf>,
}

type ResolveStack = HashSet<(PathBuf, String)>;

impl ProgramHost {
    /// Index in-memory sources keyed by path.
    pub fn from_sources<I, P, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<PathBuf>,
        S: AsRef<str>,
    {
        let files: Vec<(PathBuf, String)> = sources
            .into_iter()
            .map(|(path, source)| (normalize_path(&path.into()), source.as_ref().to_string()))
            .collect();
        Self::index(files)
    }

    /// Index every source file below `root`, skipping `node_modules`.
    ///
    /// Entries the walk cannot read, such as broken or looping symlinks, are
    /// skipped.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self, OracleError> {
        let mut files = Vec::new();
        let walker = WalkDir::new(root.as_ref())
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != "node_modules");

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("skipping unreadable entry: {}", err);
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || !is_source_file(path) {
                continue;
            }
            let source = fs::read_to_string(path).map_err(|source| OracleError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            files.push((normalize_path(path), source));
        }

        tracing::debug!(
            "indexing {} modules under {}",
            files.len(),
            root.as_ref().display()
        );
        Ok(Self::index(files))
    }

    fn index(files: Vec<(PathBuf, String)>) -> Self {
        let modules = files
            .into_par_iter()
            .map(|(path, source)| {
                let summary = summarize(&path, &source);
                (path, summary)
            })
            .collect();
        Self {
            modules,
            aliases: HashMap::new(),
        }
    }

    /// Map a bare specifier (package name, path alias) to a module path.
    pub fn with_alias(mut self, specifier: &str, target: impl Into<PathBuf>) -> Self {
        self.aliases
            .insert(specifier.to_string(), normalize_path(&target.into()));
        self
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.modules.contains_key(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MODULE RESOLUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Resolve `specifier` as written in `importer` to an indexed module.
    pub fn resolve_module(&self, importer: &Path, specifier: &str) -> Result<PathBuf, OracleError> {
        let base = if is_relative(specifier) {
            let dir = importer.parent().unwrap_or_else(|| Path::new(""));
            Some(normalize_path(&dir.join(specifier)))
        } else {
            self.aliases.get(specifier).cloned()
        };

        base.and_then(|base| self.find_module_file(&base))
            .ok_or_else(|| OracleError::ModuleNotFound {
                specifier: specifier.to_string(),
                importer: importer.to_path_buf(),
            })
    }

    fn find_module_file(&self, base: &Path) -> Option<PathBuf> {
        let mut candidates = vec![base.to_path_buf()];

        // TypeScript sources import siblings by their emitted `.js` name
        let stem = base.to_string_lossy();
        for (emitted, sources) in [(".js", [".ts", ".tsx"]), (".jsx", [".tsx", ".ts"])] {
            if let Some(stripped) = stem.strip_suffix(emitted) {
                candidates.extend(sources.iter().map(|ext| PathBuf::from(format!("{stripped}{ext}"))));
            }
        }

        candidates.extend(RESOLVE_EXTENSIONS.iter().map(|ext| with_suffix(base, ext)));
        let index = base.join("index");
        candidates.extend(RESOLVE_EXTENSIONS.iter().map(|ext| with_suffix(&index, ext)));

        candidates
            .into_iter()
            .find(|candidate| self.modules.contains_key(candidate))
    }

    fn summary(&self, module: &Path) -> Result<&ModuleSummary, OracleError> {
        let summary = self
            .modules
            .get(module)
            .ok_or_else(|| OracleError::ModuleNotFound {
                specifier: module.display().to_string(),
                importer: module.to_path_buf(),
            })?;
        if let Some(message) = &summary.parse_error {
            return Err(OracleError::Parse {
                path: module.to_path_buf(),
                message: message.clone(),
            });
        }
        Ok(summary)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPORT RESOLUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// All declarations behind `name` in `module`, following re-exports.
    fn resolve_name(
        &self,
        module: &Path,
        name: &str,
        stack: &mut ResolveStack,
    ) -> Result<Vec<ExportedDeclaration>, OracleError> {
        let key = (module.to_path_buf(), name.to_string());
        if !stack.insert(key.clone()) {
            return Err(OracleError::ReExportCycle {
                module: module.to_path_buf(),
                name: name.to_string(),
            });
        }
        let result = self.resolve_name_inner(module, name, stack);
        stack.remove(&key);
        result
    }

    fn resolve_name_inner(
        &self,
        module: &Path,
        name: &str,
        stack: &mut ResolveStack,
    ) -> Result<Vec<ExportedDeclaration>, OracleError> {
        let summary = self.summary(module)?;
        let mut found = Vec::new();
        let mut matched = false;

        for (exported, target) in &summary.exports {
            if exported != name {
                continue;
            }
            matched = true;
            let decls = match target {
                ExportTarget::Declared(decl) => vec![decl.clone()],
                ExportTarget::Local(local) => self.resolve_local(module, summary, local, stack)?,
                ExportTarget::Forward { specifier, name } => {
                    let target = self.resolve_module(module, specifier)?;
                    self.resolve_name(&target, name, stack)?
                }
            };
            for decl in decls {
                push_declaration(&mut found, decl);
            }
        }

        // `export *` never forwards a default export
        if !matched && name != "default" {
            for specifier in &summary.star_exports {
                let target = self.resolve_module(module, specifier)?;
                match self.resolve_name(&target, name, stack) {
                    Ok(decls) => {
                        matched = true;
                        found.extend(decls);
                    }
                    Err(OracleError::ExportNotFound { .. }) => {}
                    Err(err) => return Err(err),
                }
            }
        }

        if !matched {
            return Err(OracleError::ExportNotFound {
                module: module.to_path_buf(),
                name: name.to_string(),
            });
        }
        Ok(found)
    }

    fn resolve_local(
        &self,
        module: &Path,
        summary: &ModuleSummary,
        local: &str,
        stack: &mut ResolveStack,
    ) -> Result<Vec<ExportedDeclaration>, OracleError> {
        if let Some(decls) = summary.locals.get(local) {
            return Ok(decls.clone());
        }
        let binding = summary
            .imports
            .get(local)
            .ok_or_else(|| OracleError::ExportNotFound {
                module: module.to_path_buf(),
                name: local.to_string(),
            })?;
        let target = self.resolve_module(module, &binding.specifier)?;
        match &binding.name {
            ImportedName::Default => self.resolve_name(&target, "default", stack),
            ImportedName::Named(name) => self.resolve_name(&target, name, stack),
            ImportedName::Namespace => Ok(vec![ExportedDeclaration::Other(OtherKind::Namespace)]),
        }
    }

    /// Exported names of `module` in source order, star exports last.
    fn export_names(&self, module: &Path, seen: &mut HashSet<PathBuf>) -> Vec<String> {
        if !seen.insert(module.to_path_buf()) {
            return Vec::new();
        }
        let Ok(summary) = self.summary(module) else {
            return Vec::new();
        };

        let mut names: Vec<String> = Vec::new();
        for (name, _) in &summary.exports {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        for specifier in &summary.star_exports {
            let Ok(target) = self.resolve_module(module, specifier) else {
                continue;
            };
            for name in self.export_names(&target, seen) {
                if name != "default" && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

impl SymbolOracle for ProgramHost {
    fn module_exports(
        &self,
        importer: &Path,
        specifier: &str,
    ) -> Result<ModuleExports, OracleError> {
        let module = self.resolve_module(importer, specifier)?;
        self.summary(&module)?;

        let mut entries = Vec::new();
        for name in self.export_names(&module, &mut HashSet::new()) {
            match self.resolve_name(&module, &name, &mut ResolveStack::new()) {
                Ok(declarations) => entries.push(ResolvedExport { name, declarations }),
                Err(err) => tracing::debug!("skipping export '{}' of {}: {}", name, specifier, err),
            }
        }
        Ok(ModuleExports { entries })
    }

    fn declared_type(&self, callable: &CallableShape) -> DeclaredType {
        let call_signatures = callable
            .visible_signatures()
            .into_iter()
            .map(|sig| CallSignature {
                parameter_count: sig.parameter_count,
                return_type: match &sig.return_annotation {
                    Some(TypeAnnotation::Reference(ty)) => Some(ty.clone()),
                    Some(TypeAnnotation::Other) => None,
                    None if sig.returns_jsx => Some(inferred_jsx_type()),
                    None => None,
                },
            })
            .collect();
        DeclaredType { call_signatures }
    }

    fn resolve_export(
        &self,
        importer: &Path,
        specifier: &str,
        name: &str,
    ) -> Result<ExportedDeclaration, OracleError> {
        let module = self.resolve_module(importer, specifier)?;
        let declarations = self.resolve_name(&module, name, &mut ResolveStack::new())?;
        single_declaration(specifier, name, declarations)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATH HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn is_relative(specifier: &str) -> bool {
    matches!(specifier, "." | "..")
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = base.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Lexical normalisation: drops `.` and folds `..` without touching the
/// filesystem.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ValueShape;

    fn host(files: &[(&str, &str)]) -> ProgramHost {
        ProgramHost::from_sources(files.iter().map(|(p, s)| (PathBuf::from(p), *s)))
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/app/src/./pages/../ui/Button")),
            PathBuf::from("/app/src/ui/Button")
        );
    }

    #[test]
    fn test_resolve_module_tries_extensions_and_index() {
        let host = host(&[
            ("/app/ui/Button.tsx", "export default 1;"),
            ("/app/ui/forms/index.ts", "export const x = 1;"),
            ("/app/lib/util.ts", "export const y = 1;"),
        ]);
        let importer = Path::new("/app/pages/Home.tsx");

        assert_eq!(
            host.resolve_module(importer, "../ui/Button").unwrap(),
            PathBuf::from("/app/ui/Button.tsx")
        );
        assert_eq!(
            host.resolve_module(importer, "../ui/forms").unwrap(),
            PathBuf::from("/app/ui/forms/index.ts")
        );
        assert_eq!(
            host.resolve_module(importer, "../lib/util.js").unwrap(),
            PathBuf::from("/app/lib/util.ts")
        );
        assert!(matches!(
            host.resolve_module(importer, "./Missing"),
            Err(OracleError::ModuleNotFound { .. })
        ));
        assert!(matches!(
            host.resolve_module(importer, "design-system"),
            Err(OracleError::ModuleNotFound { .. })
        ));
    }

    #[test]
    fn test_alias_resolution() {
        let host = host(&[(
            "/node/design-system/index.tsx",
            "export const Badge = (p) => <span />;",
        )])
        .with_alias("design-system", "/node/design-system");

        let decl = host
            .resolve_export(Path::new("/app/App.tsx"), "design-system", "Badge")
            .unwrap();
        assert!(matches!(decl, ExportedDeclaration::Variable(_)));
    }

    #[test]
    fn test_reexport_chain_resolves_to_original_declaration() {
        let host = host(&[
            ("/app/ui/Button.tsx", "export default function Button(p) { return <button />; }"),
            ("/app/ui/index.ts", "export { default as Button } from './Button';"),
            ("/app/barrel.ts", "export * from './ui';"),
        ]);

        let decl = host
            .resolve_export(Path::new("/app/App.tsx"), "./barrel", "Button")
            .unwrap();
        match decl {
            ExportedDeclaration::Function(shape) => {
                assert_eq!(shape.implementation.unwrap().parameter_count, 1)
            }
            other => panic!("unexpected declaration: {:?}", other),
        }
    }

    #[test]
    fn test_export_of_imported_binding_is_followed() {
        let host = host(&[
            ("/app/Card.tsx", "export const Card = (p) => <div />;"),
            ("/app/index.ts", "import { Card as Base } from './Card';\nexport default Base;"),
        ]);
        let decl = host
            .resolve_export(Path::new("/app/App.tsx"), "./index", "default")
            .unwrap();
        match decl {
            ExportedDeclaration::Variable(shape) => {
                assert_eq!(shape.name, "Card");
                assert!(matches!(shape.init, Some(ValueShape::Callable(_))));
            }
            other => panic!("unexpected declaration: {:?}", other),
        }
    }

    #[test]
    fn test_star_export_does_not_forward_default() {
        let host = host(&[
            ("/app/a.tsx", "export default () => <div />;"),
            ("/app/b.ts", "export * from './a';"),
        ]);
        assert!(matches!(
            host.resolve_export(Path::new("/app/App.tsx"), "./b", "default"),
            Err(OracleError::ExportNotFound { .. })
        ));
    }

    #[test]
    fn test_reexport_cycle_is_reported() {
        let host = host(&[
            ("/app/a.ts", "export { X } from './b';"),
            ("/app/b.ts", "export { X } from './a';"),
        ]);
        assert!(matches!(
            host.resolve_export(Path::new("/app/App.tsx"), "./a", "X"),
            Err(OracleError::ReExportCycle { .. })
        ));
    }

    #[test]
    fn test_merged_declarations_are_ambiguous() {
        let host = host(&[(
            "/app/Tabs.tsx",
            "export function Tabs(p) { return <div />; }\nexport namespace Tabs { export const x = 1; }",
        )]);
        assert!(matches!(
            host.resolve_export(Path::new("/app/App.tsx"), "./Tabs", "Tabs"),
            Err(OracleError::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn test_module_exports_are_ordered() {
        let host = host(&[
            ("/app/extra.ts", "export const Extra = 1;\nexport default 2;"),
            (
                "/app/mod.tsx",
                "export const B = 1;\nexport function A() {}\nexport default class {}\nexport * from './extra';",
            ),
        ]);
        let exports = host
            .module_exports(Path::new("/app/App.tsx"), "./mod")
            .unwrap();
        let names: Vec<&str> = exports.names().collect();
        assert_eq!(names, vec!["B", "A", "default", "Extra"]);
    }

    #[test]
    fn test_declared_type_prefers_annotation_then_jsx_inference() {
        let host = host(&[(
            "/app/mod.tsx",
            "export const A = (p) => <div />;\n\
             export const B = (p): MyElement => <div />;\n\
             export const C = (p) => 42;",
        )]);
        let importer = Path::new("/app/App.tsx");
        let return_type = |name: &str| {
            let ExportedDeclaration::Variable(shape) =
                host.resolve_export(importer, "./mod", name).unwrap()
            else {
                panic!("expected a variable");
            };
            let Some(ValueShape::Callable(callable)) = shape.init else {
                panic!("expected a callable");
            };
            host.declared_type(&callable).call_signatures[0]
                .return_type
                .clone()
        };
        assert_eq!(return_type("A"), Some(TypeRef::qualified("JSX", "Element")));
        assert_eq!(return_type("B"), Some(TypeRef::simple("MyElement")));
        assert_eq!(return_type("C"), None);
    }

    #[test]
    fn test_from_dir_skips_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("src/Button.tsx"), "export default () => <b />;").unwrap();
        fs::write(root.join("src/notes.md"), "# not source").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "export default 1;").unwrap();

        let host = ProgramHost::from_dir(root).unwrap();
        assert_eq!(host.len(), 1);
        assert!(host.contains(&root.join("src/Button.tsx")));
    }

    #[test]
    fn test_resolve_bare_directory_specifiers() {
        let host = host(&[
            ("/app/ui/index.tsx", "export default 1;"),
            ("/app/ui/forms/Field.tsx", "export default 2;"),
        ]);

        assert_eq!(
            host.resolve_module(Path::new("/app/ui/App.tsx"), ".").unwrap(),
            PathBuf::from("/app/ui/index.tsx")
        );
        assert_eq!(
            host.resolve_module(Path::new("/app/ui/forms/Field.tsx"), "..").unwrap(),
            PathBuf::from("/app/ui/index.tsx")
        );
        // Still package names, not directories
        assert!(host.resolve_module(Path::new("/app/ui/App.tsx"), ".hidden").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_from_dir_skips_symlink_loops() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/Button.tsx"), "export default () => <b />;").unwrap();
        std::os::unix::fs::symlink(root, root.join("src/loop")).unwrap();

        let host = ProgramHost::from_dir(root).unwrap();
        assert!(host.contains(&root.join("src/Button.tsx")));
    }
}
