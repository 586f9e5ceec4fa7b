//! Statement splicing traversal.
//!
//! Replaces each planned top-level import with its replacement statements in
//! a single map-and-flatten pass over the module body, then walks the rest of
//! the tree untouched, counting references to the names that went lazy.

use std::collections::HashMap;

use oxc_allocator::Vec as ArenaVec;
use oxc_ast::ast::{IdentifierReference, Program, Statement};
use oxc_ast::AstBuilder;
use oxc_ast_visit::{walk_mut, VisitMut};

pub struct ImportSplicer<'a> {
    ast: AstBuilder<'a>,
    /// Replacement statements keyed by the index of the import they replace.
    replacements: HashMap<usize, ArenaVec<'a, Statement<'a>>>,
    /// Reference counts for lazy names.
    references: HashMap<String, usize>,
}

impl<'a> ImportSplicer<'a> {
    pub fn new(ast: AstBuilder<'a>) -> Self {
        Self {
            ast,
            replacements: HashMap::new(),
            references: HashMap::new(),
        }
    }

    pub fn replace(
        &mut self,
        index: usize,
        statements: ArenaVec<'a, Statement<'a>>,
        lazy_names: impl IntoIterator<Item = String>,
    ) {
        for name in lazy_names {
            self.references.entry(name).or_insert(0);
        }
        self.replacements.insert(index, statements);
    }

    pub fn has_replacements(&self) -> bool {
        !self.replacements.is_empty()
    }

    /// Reference counts gathered by the walk. Shadowing is not tracked.
    pub fn into_references(self) -> HashMap<String, usize> {
        self.references
    }
}

impl<'a> VisitMut<'a> for ImportSplicer<'a> {
    fn visit_program(&mut self, program: &mut Program<'a>) {
        if !self.replacements.is_empty() {
            let body = std::mem::replace(&mut program.body, self.ast.vec());
            for (index, stmt) in body.into_iter().enumerate() {
                match self.replacements.remove(&index) {
                    Some(replacement) => {
                        for new_stmt in replacement {
                            program.body.push(new_stmt);
                        }
                    }
                    None => program.body.push(stmt),
                }
            }
        }
        walk_mut::walk_program(self, program);
    }

    fn visit_identifier_reference(&mut self, ident: &mut IdentifierReference<'a>) {
        if let Some(count) = self.references.get_mut(ident.name.as_str()) {
            *count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_codegen::Codegen;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    #[test]
    fn test_splice_replaces_by_index_and_counts_references() {
        let allocator = Allocator::default();
        let source = "import a from 'a';\nimport B from './B';\nconst el = <B />;\nuse(B, a);";
        let mut program = Parser::new(&allocator, source, SourceType::tsx())
            .parse()
            .program;

        let replacement = Parser::new(&allocator, "const B = lazy(() => import('./B'));", SourceType::tsx())
            .parse()
            .program
            .body;

        let mut splicer = ImportSplicer::new(AstBuilder::new(&allocator));
        splicer.replace(1, replacement, ["B".to_string()]);
        splicer.visit_program(&mut program);

        let code = Codegen::new().build(&program).code;
        assert!(code.contains("import a from"));
        assert!(code.contains("const B = lazy("));
        assert!(!code.contains("import B"), "{}", code);
        assert_eq!(program.body.len(), 4);

        let references = splicer.into_references();
        // `<B />` and `use(B, a)`
        assert_eq!(references["B"], 2);
    }

    #[test]
    fn test_empty_replacement_drops_statement() {
        let allocator = Allocator::default();
        let mut program = Parser::new(&allocator, "import X from './X';\nfoo();", SourceType::tsx())
            .parse()
            .program;

        let mut splicer = ImportSplicer::new(AstBuilder::new(&allocator));
        splicer.replace(0, ArenaVec::new_in(&allocator), Vec::new());
        splicer.visit_program(&mut program);

        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0], Statement::ExpressionStatement(_)));
    }
}
