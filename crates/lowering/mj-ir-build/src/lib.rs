//! Syntax tree → IR building
//!
//! A single forward pass over the syntax tree. Each declaration pushes its
//! own scope, declares its contents, builds its body, freezes the scope and
//! only then publishes its symbol to the parent scope. Names that are not
//! known yet become placeholders that the resolve pass fixes up later.

mod context;
mod declaration;
mod error;
mod expression;
mod module;
mod statement;
mod types;

pub use error::BuildError;

use context::BuildContext;
use mj_diagnostics::DiagnosticList;
use mj_ir::{ExternalModuleLoader, IrModule, ScopeTree, TemplateInstantiation};
use mj_symbol::SymbolTable;
use mj_syntax::SyntaxTree;
use std::rc::Rc;
use tracing::debug;

/// Builder switches taken from the compile options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Fold operators whose operands are both constant
    pub fold_constants: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            fold_constants: true,
        }
    }
}

/// Everything the builder produced for one compilation unit
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub module: Rc<IrModule>,
    pub symbols: SymbolTable,
    pub scopes: ScopeTree,
    pub diagnostics: DiagnosticList,
    /// Template instances created while building, in creation order
    pub instantiations: Vec<TemplateInstantiation>,
}

/// Entry point of the builder
pub struct IrBuilder;

impl IrBuilder {
    /// Build the IR for `tree`. Fails when the tree carries syntax
    /// diagnostics or holds a construct the builder cannot express.
    pub fn program(
        tree: &SyntaxTree,
        loader: &dyn ExternalModuleLoader,
        options: BuildOptions,
    ) -> Result<BuildOutput, BuildError> {
        if tree.has_diagnostics() {
            return Err(BuildError::SyntaxErrors {
                count: tree.diagnostics.len(),
            });
        }

        let mut ctx = BuildContext::new(loader, options);
        let module = module::build_module(&mut ctx, &tree.module)?;
        debug!(
            module = %module.name,
            items = module.items.len(),
            diagnostics = ctx.diagnostics.len(),
            instantiations = ctx.instantiations.len(),
            "built module"
        );

        Ok(BuildOutput {
            module: Rc::new(module),
            symbols: ctx.symbols,
            scopes: ctx.scopes,
            diagnostics: ctx.diagnostics,
            instantiations: ctx.instantiations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use mj_diagnostics::DiagnosticKind;
    use mj_ir::{
        ExternalFunction, ExternalModule, IrItem, IrPrinter, IrStatementKind, ModuleRegistry,
        NullModuleLoader,
    };
    use mj_span::Location;
    use mj_symbol::{ConstantValue, FunctionKind, SymbolName, SymbolRef, VariableId};
    use mj_syntax::{
        BinaryOperator, CodeBlockSyntax, ExpressionSyntax, FunctionSyntax, IfSyntax, LoopKindSyntax,
        LoopSyntax, ModuleSyntax, StatementSyntax, SyntaxDiagnostic, TypeDeclarationSyntax,
        TypeParameterSyntax, TypeSyntax, VariableSyntax,
    };

    fn build(module: ModuleSyntax) -> BuildOutput {
        IrBuilder::program(&module.into_tree(), &NullModuleLoader, BuildOptions::default())
            .expect("module builds")
    }

    fn kinds(output: &BuildOutput) -> Vec<DiagnosticKind> {
        output.diagnostics.iter().map(|diagnostic| diagnostic.kind.clone()).collect()
    }

    fn variable(output: &BuildOutput, name: &str) -> VariableId {
        output
            .scopes
            .try_lookup::<VariableId>(output.module.scope, &SymbolName::new(name))
            .expect("variable is declared")
    }

    fn variable_type(output: &BuildOutput, name: &str) -> String {
        let id = variable(output, name);
        output.symbols.type_name(output.symbols.variable(id).ty)
    }

    fn number(text: &str) -> ExpressionSyntax {
        ExpressionSyntax::number(text)
    }

    #[test]
    fn test_syntax_errors_abort() {
        let mut tree = ModuleSyntax::new("Demo").into_tree();
        tree.diagnostics.push(SyntaxDiagnostic {
            location: Location::at(1, 1),
            message: "unexpected token".to_owned(),
        });

        let error = IrBuilder::program(&tree, &NullModuleLoader, BuildOptions::default()).unwrap_err();
        assert_eq!(error, BuildError::SyntaxErrors { count: 1 });
    }

    #[test]
    fn test_literal_defaults_and_context() {
        let output = build(
            ModuleSyntax::new("Demo")
                .item(VariableSyntax::inferred("a", number("42")))
                .item(VariableSyntax::typed("b", TypeSyntax::named("U8"), Some(number("42")))),
        );

        assert!(output.diagnostics.is_empty());
        assert_eq!(variable_type(&output, "a"), "I64");
        assert_eq!(variable_type(&output, "b"), "U8");
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let output = build(
            ModuleSyntax::new("Demo")
                .item(VariableSyntax::typed("a", TypeSyntax::named("U8"), Some(number("1"))))
                .item(VariableSyntax::inferred("A", ExpressionSyntax::string("x"))),
        );

        assert_eq!(
            kinds(&output),
            vec![DiagnosticKind::AlreadyDeclared { name: "A".to_owned() }]
        );
        assert_eq!(variable_type(&output, "a"), "U8");
    }

    #[test]
    fn test_forward_call_becomes_placeholder() {
        let main = FunctionSyntax::new("main")
            .returns(TypeSyntax::named("I32"))
            .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::invoke(
                "later",
                vec![number("1")],
            )))]);
        let later = FunctionSyntax::new("later")
            .parameter("x", TypeSyntax::named("I32"))
            .returns(TypeSyntax::named("I32"))
            .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::identifier("x")))]);
        let output = build(ModuleSyntax::new("Demo").item(main).item(later));

        assert!(output.diagnostics.is_empty());
        let Some(IrItem::Function(main)) = output.module.items.first() else {
            panic!("expected a function");
        };
        let IrStatementKind::Return(Some(value)) = &main.body.statements[0].kind else {
            panic!("expected a return");
        };
        let invocation = value.as_invocation().expect("call");
        assert_eq!(output.symbols.function(invocation.function).kind, FunctionKind::Unresolved);
    }

    #[test]
    fn test_discard_and_void_values() {
        let log = FunctionSyntax::new("log").parameter("message", TypeSyntax::named("Str"));
        let main = FunctionSyntax::new("main").body(vec![
            StatementSyntax::assign(ExpressionSyntax::identifier("_"), number("1")),
            VariableSyntax::inferred("x", ExpressionSyntax::invoke("log", vec![ExpressionSyntax::string("a")])).into(),
            StatementSyntax::assign(
                ExpressionSyntax::identifier("_"),
                ExpressionSyntax::invoke("log", vec![ExpressionSyntax::string("b")]),
            ),
        ]);
        let output = build(ModuleSyntax::new("Demo").item(log).item(main));

        assert_eq!(
            kinds(&output),
            vec![
                DiagnosticKind::DiscardOnlyInvocation,
                DiagnosticKind::VoidValueUsed { name: "log".to_owned() },
            ]
        );
    }

    #[test]
    fn test_condition_types() {
        let main = FunctionSyntax::new("main").body(vec![
            StatementSyntax::If(IfSyntax::new(number("1"), CodeBlockSyntax::default())),
            StatementSyntax::Loop(LoopSyntax::new(
                LoopKindSyntax::While(ExpressionSyntax::string("x")),
                CodeBlockSyntax::default(),
            )),
            StatementSyntax::Loop(LoopSyntax::new(
                LoopKindSyntax::Count(ExpressionSyntax::boolean(true)),
                CodeBlockSyntax::default(),
            )),
            StatementSyntax::Loop(LoopSyntax::new(LoopKindSyntax::Count(number("3")), CodeBlockSyntax::default())),
        ]);
        let output = build(ModuleSyntax::new("Demo").item(main));

        let kinds = kinds(&output);
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[0], DiagnosticKind::ConditionNotBoolean { .. }));
        assert_eq!(kinds[1], DiagnosticKind::LoopConditionType { actual: "Str".to_owned() });
        assert_eq!(kinds[2], DiagnosticKind::LoopConditionType { actual: "Bool".to_owned() });
    }

    #[test]
    fn test_enum_values_are_consecutive() {
        let color = TypeDeclarationSyntax::new("Color")
            .enum_member("Red", None)
            .enum_member("Green", Some(number("5")))
            .enum_member("Blue", None);
        let bad = TypeDeclarationSyntax::new("Bad").enum_member("A", Some(ExpressionSyntax::string("text")));
        let output = build(
            ModuleSyntax::new("Demo")
                .item(color)
                .item(bad)
                .item(VariableSyntax::inferred(
                    "c",
                    ExpressionSyntax::member(ExpressionSyntax::identifier("Color"), "Blue"),
                )),
        );

        assert_eq!(
            kinds(&output),
            vec![DiagnosticKind::NonConstantEnumValue { name: "A".to_owned() }]
        );
        assert_eq!(variable_type(&output, "c"), "I32");

        let Some(IrItem::Statement(statement)) = output.module.items.get(2) else {
            panic!("expected the variable");
        };
        let IrStatementKind::VariableDeclaration(declaration) = &statement.kind else {
            panic!("expected a declaration");
        };
        let initializer = declaration.initializer.as_ref().expect("initializer");
        assert_eq!(initializer.constant, Some(ConstantValue::Integer(6)));
    }

    #[test]
    fn test_template_instances_are_shared() {
        let add = FunctionSyntax::new("add")
            .type_parameter(TypeParameterSyntax::template("T"))
            .parameter("a", TypeSyntax::named("T"))
            .parameter("b", TypeSyntax::named("T"))
            .returns(TypeSyntax::named("T"))
            .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::binary(
                ExpressionSyntax::identifier("a"),
                BinaryOperator::Add,
                ExpressionSyntax::identifier("b"),
            )))]);
        let call = |first: ExpressionSyntax, second: ExpressionSyntax| ExpressionSyntax::invoke("add", vec![first, second]);
        let output = build(
            ModuleSyntax::new("Demo")
                .item(add)
                .item(VariableSyntax::inferred("one", call(number("1"), number("2"))))
                .item(VariableSyntax::inferred("two", call(number("3"), number("4"))))
                .item(VariableSyntax::inferred(
                    "three",
                    call(ExpressionSyntax::string("a"), ExpressionSyntax::string("b")),
                )),
        );

        assert!(output.diagnostics.is_empty());
        let names: Vec<String> = output
            .instantiations
            .iter()
            .map(|instantiation| output.symbols.name_of(instantiation.instance).full_original_name())
            .collect();
        assert_eq!(names, vec!["add<I64>", "add<Str>"]);
        assert_eq!(variable_type(&output, "one"), "I64");
        assert_eq!(variable_type(&output, "three"), "Str");

        let called: Vec<SymbolRef> = output
            .module
            .items
            .iter()
            .filter_map(|item| match item {
                IrItem::Statement(statement) => match &statement.kind {
                    IrStatementKind::VariableDeclaration(declaration) => declaration.initializer.clone(),
                    _ => None,
                },
                _ => None,
            })
            .filter_map(|initializer| initializer.as_invocation().map(|call| SymbolRef::Function(call.function)))
            .collect();
        assert_eq!(called[0], called[1]);
        assert_ne!(called[0], called[2]);
    }

    #[test]
    fn test_imports_and_exports() {
        let loader = ModuleRegistry::new().with_module(
            ExternalModule::new("Std.Math").with_function(ExternalFunction::new(
                "sqrt",
                &[("value", "F64")],
                Some("F64"),
            )),
        );
        let main = FunctionSyntax::new("main").body(vec![
            VariableSyntax::inferred("root", ExpressionSyntax::invoke("sqrt", vec![number("2.0")])).into(),
        ]);
        let module = ModuleSyntax::new("Demo")
            .uses("Std.Math")
            .uses("Missing")
            .public(&["main", "nothing"])
            .item(main);

        let output = IrBuilder::program(&module.into_tree(), &loader, BuildOptions::default()).expect("module builds");
        assert_eq!(
            kinds(&output),
            vec![
                DiagnosticKind::ModuleNotFound { name: "Missing".to_owned() },
                DiagnosticKind::ExportNotFound { name: "nothing".to_owned() },
            ]
        );
    }

    #[test]
    fn test_dump_function_and_call() {
        let square = FunctionSyntax::new("square")
            .parameter("x", TypeSyntax::named("I32"))
            .returns(TypeSyntax::named("I32"))
            .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::binary(
                ExpressionSyntax::identifier("x"),
                BinaryOperator::Multiply,
                ExpressionSyntax::identifier("x"),
            )))]);
        let output = build(
            ModuleSyntax::new("Demo")
                .item(square)
                .item(VariableSyntax::inferred("result", ExpressionSyntax::invoke("square", vec![number("3")]))),
        );

        assert!(output.diagnostics.is_empty());
        expect![[r#"
            module Demo
            fn square(x: I32): I32
              return (x * x)
            var result: I32 = square(3:I32)
        "#]]
        .assert_eq(&IrPrinter::new(&output.symbols).print(&output.module));
    }
}
