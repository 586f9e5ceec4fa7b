//! Component classification tests.
//!
//! Fixtures are small in-memory programs indexed by [`ProgramHost`]; a stub
//! oracle covers the port contract on its own.

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use crate::classify::{callable_value, ComponentClassifier, ComponentKind};
    use crate::error::OracleError;
    use crate::host::ProgramHost;
    use crate::options::FrameworkConfig;
    use crate::oracle::{
        CallSignature, CallableKind, CallableShape, ClassShape, DeclaredType, ExportedDeclaration,
        Heritage, ModuleExports, ResolvedExport, SignatureSyntax, SymbolOracle, TypeRef,
        ValueShape, VariableShape,
    };

    const IMPORTER: &str = "/app/App.tsx";

    fn classify(files: &[(&str, &str)], specifier: &str, name: &str) -> Option<ComponentKind> {
        let host = ProgramHost::from_sources(files.iter().map(|(p, s)| (PathBuf::from(p), *s)));
        let framework = FrameworkConfig::default();
        ComponentClassifier::new(&host, &framework).classify(Path::new(IMPORTER), specifier, name)
    }

    fn classify_one(source: &str, name: &str) -> Option<ComponentKind> {
        classify(&[("/app/mod.tsx", source)], "./mod", name)
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // FUNCTION RULE
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_default_arrow_returning_jsx() {
        assert_eq!(
            classify_one("export default (props) => <div>{props.title}</div>;", "default"),
            Some(ComponentKind::Function)
        );
    }

    #[test]
    fn test_function_declaration_and_expression() {
        let source = "export function Header(props) { if (props.big) { return <h1 />; } return <h2 />; }\n\
                      export const Footer = function (props, context) { return <footer />; };";
        assert_eq!(classify_one(source, "Header"), Some(ComponentKind::Function));
        assert_eq!(classify_one(source, "Footer"), Some(ComponentKind::Function));
    }

    #[test]
    fn test_parameter_count_must_be_one_or_two() {
        let source = "export const None = () => <div />;\n\
                      export const Three = (a, b, c) => <div />;\n\
                      export const Rest = (...args) => <div />;";
        assert_eq!(classify_one(source, "None"), None);
        assert_eq!(classify_one(source, "Three"), None);
        assert_eq!(classify_one(source, "Rest"), Some(ComponentKind::Function));
    }

    #[test]
    fn test_return_type_is_nominal() {
        let source = "type MyElement = JSX.Element;\n\
                      export const Aliased = (p): MyElement => <div />;\n\
                      export const Annotated = (p): JSX.Element => render(p);\n\
                      export const Deep = (p): React.JSX.Element => render(p);\n\
                      export const Plain = (p) => render(p);\n\
                      export const Mixed = (p) => { if (p) { return <div />; } return null; };";
        assert_eq!(classify_one(source, "Aliased"), None, "aliases are not the element type");
        assert_eq!(classify_one(source, "Annotated"), Some(ComponentKind::Function));
        assert_eq!(classify_one(source, "Deep"), Some(ComponentKind::Function));
        assert_eq!(classify_one(source, "Plain"), None);
        assert_eq!(classify_one(source, "Mixed"), None);
    }

    #[test]
    fn test_first_overload_decides() {
        let source = "export function Picker(a: A, b: B, c: C): JSX.Element;\n\
                      export function Picker(props: P): JSX.Element;\n\
                      export function Picker(...args: any[]): JSX.Element { return <div />; }\n\
                      export function Single(props: P): JSX.Element;\n\
                      export function Single(a: A, b: B, c: C): JSX.Element;\n\
                      export function Single(...args: any[]): JSX.Element { return <div />; }";
        assert_eq!(classify_one(source, "Picker"), None);
        assert_eq!(classify_one(source, "Single"), Some(ComponentKind::Function));
    }

    #[test]
    fn test_multi_declarator_variable_is_not_callable() {
        let source = "export const Card = (p) => <div />, count = 1;";
        assert_eq!(classify_one(source, "Card"), None);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // CLASS RULE
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_class_extending_framework_base() {
        let source = "export default class Page extends React.Component { render() { return null; } }\n\
                      export class Bare extends Component {}\n\
                      export class Pure extends React.PureComponent {}\n\
                      export class Derived extends Page {}";
        assert_eq!(classify_one(source, "default"), Some(ComponentKind::Class));
        assert_eq!(classify_one(source, "Bare"), None);
        assert_eq!(classify_one(source, "Pure"), None);
        // Only the immediate heritage clause counts
        assert_eq!(classify_one(source, "Derived"), None);
    }

    #[test]
    fn test_class_rule_follows_framework_config() {
        let host = ProgramHost::from_sources([(
            PathBuf::from("/app/mod.tsx"),
            "export class Widget extends Preact.Component {}",
        )]);
        let framework = FrameworkConfig {
            module: "preact/compat".to_string(),
            root_identifier: "Preact".to_string(),
            ..Default::default()
        };
        let classifier = ComponentClassifier::new(&host, &framework);
        assert!(classifier.is_component(Path::new(IMPORTER), "./mod", "Widget"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // RESOLUTION
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_resolution_through_reexports() {
        let files = [
            ("/app/ui/Button.tsx", "export const Button = (props) => <button />;"),
            ("/app/ui/index.ts", "export * from './Button';"),
        ];
        assert_eq!(classify(&files, "./ui", "Button"), Some(ComponentKind::Function));
    }

    #[test]
    fn test_unresolved_and_ambiguous_fail_closed() {
        let files = [(
            "/app/mod.tsx",
            "export function Tabs(p) { return <div />; }\nexport namespace Tabs { export const x = 1; }",
        )];
        assert_eq!(classify(&files, "./mod", "Tabs"), None);
        assert_eq!(classify(&files, "./mod", "Missing"), None);
        assert_eq!(classify(&files, "./elsewhere", "default"), None);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PORT CONTRACT
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Oracle answering from fixed data, with declared types independent of
    /// the declaration syntax.
    struct StubOracle {
        exports: ModuleExports,
        return_type: Option<TypeRef>,
    }

    impl SymbolOracle for StubOracle {
        fn module_exports(
            &self,
            importer: &Path,
            specifier: &str,
        ) -> Result<ModuleExports, OracleError> {
            if specifier == "./known" {
                Ok(self.exports.clone())
            } else {
                Err(OracleError::ModuleNotFound {
                    specifier: specifier.to_string(),
                    importer: importer.to_path_buf(),
                })
            }
        }

        fn declared_type(&self, callable: &CallableShape) -> DeclaredType {
            DeclaredType {
                call_signatures: callable
                    .visible_signatures()
                    .iter()
                    .map(|sig| CallSignature {
                        parameter_count: sig.parameter_count,
                        return_type: self.return_type.clone(),
                    })
                    .collect(),
            }
        }
    }

    fn arrow(parameter_count: usize) -> CallableShape {
        CallableShape::new(
            CallableKind::Arrow,
            SignatureSyntax {
                parameter_count,
                return_annotation: None,
                returns_jsx: false,
            },
            true,
        )
    }

    #[test]
    fn test_classifier_trusts_oracle_types() {
        let oracle = StubOracle {
            exports: ModuleExports {
                entries: vec![ResolvedExport {
                    name: "default".to_string(),
                    declarations: vec![ExportedDeclaration::DefaultExpression(
                        ValueShape::Callable(arrow(1)),
                    )],
                }],
            },
            return_type: Some(TypeRef::qualified("JSX", "Element")),
        };
        let framework = FrameworkConfig::default();
        let classifier = ComponentClassifier::new(&oracle, &framework);
        let importer = Path::new(IMPORTER);

        assert!(classifier.is_component(importer, "./known", "default"));
        assert!(!classifier.is_component(importer, "./known", "Other"));
        assert!(!classifier.is_component(importer, "./unknown", "default"));
    }

    #[test]
    fn test_callable_value_normalises_declaration_shapes() {
        let function = ExportedDeclaration::Function(arrow(1));
        let variable = ExportedDeclaration::Variable(VariableShape {
            name: "Card".to_string(),
            declarator_count: 1,
            init: Some(ValueShape::Callable(arrow(2))),
        });
        let expression = ExportedDeclaration::DefaultExpression(ValueShape::Callable(arrow(1)));
        let class = ExportedDeclaration::Class(ClassShape {
            name: Some("Page".to_string()),
            heritage: Some(Heritage::Other),
        });
        let uninitialised = ExportedDeclaration::Variable(VariableShape {
            name: "Slot".to_string(),
            declarator_count: 1,
            init: None,
        });

        assert!(callable_value(&function).is_some());
        assert_eq!(
            callable_value(&variable).and_then(|c| c.implementation.as_ref()).map(|s| s.parameter_count),
            Some(2)
        );
        assert!(callable_value(&expression).is_some());
        assert!(callable_value(&class).is_none());
        assert!(callable_value(&uninitialised).is_none());
    }
}
