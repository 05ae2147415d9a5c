//! Forward reference resolution
//!
//! The builder makes a single pass, so a type or function used before its
//! declaration is left as a placeholder. This pass runs once the whole
//! module is built and every declaration is visible.
//!
//! # Architecture
//!
//! - **Type placeholders**: forwarded to the declared type in the symbol
//!   table, so every symbol typed with the placeholder follows the link
//!   without being touched
//! - **Forward calls**: bound with the same overload and template logic the
//!   builder uses for ordinary calls
//! - **Retyping**: expressions, returns, assignments and conditions built on
//!   top of a forward reference are typed and checked again
//! - **Rebinding**: a variable whose type was inferred from a forward
//!   reference gets a new symbol, swapped into its scope
//!
//! Anything that is still unknown after the pass is reported once and
//! replaced by the unresolved sentinel type.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mj_resolve::IrResolveSymbolsRewriter;
//!
//! let resolved = IrResolveSymbolsRewriter::new(&mut symbols, &mut scopes, &mut diagnostics)
//!     .resolve(&module);
//! // resolved.instantiations feed the template instantiation pass
//! ```

mod resolver;

pub use resolver::{IrResolveSymbolsRewriter, ResolveOutput};

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use mj_diagnostics::DiagnosticKind;
    use mj_ir::{IrExpressionKind, IrItem, IrPrinter, IrStatementKind, NullModuleLoader};
    use mj_ir_build::{BuildOptions, BuildOutput, IrBuilder};
    use mj_symbol::{SymbolName, VariableId};
    use mj_syntax::{
        BinaryOperator, ExpressionSyntax, FieldInitializerSyntax, FunctionSyntax, ModuleSyntax,
        StatementSyntax, TypeDeclarationSyntax, TypeParameterSyntax, TypeSyntax, VariableSyntax,
    };
    use std::rc::Rc;

    fn build(module: ModuleSyntax) -> BuildOutput {
        IrBuilder::program(&module.into_tree(), &NullModuleLoader, BuildOptions::default())
            .expect("module builds")
    }

    fn resolve(output: &mut BuildOutput) -> ResolveOutput {
        IrResolveSymbolsRewriter::new(&mut output.symbols, &mut output.scopes, &mut output.diagnostics)
            .resolve(&output.module)
    }

    fn kinds(output: &BuildOutput) -> Vec<DiagnosticKind> {
        output.diagnostics.iter().map(|diagnostic| diagnostic.kind.clone()).collect()
    }

    fn variable_type(output: &BuildOutput, name: &str) -> String {
        let id = output
            .scopes
            .try_lookup::<VariableId>(output.module.scope, &SymbolName::new(name))
            .expect("variable is declared");
        output.symbols.type_name(output.symbols.variable(id).ty)
    }

    fn point() -> TypeDeclarationSyntax {
        TypeDeclarationSyntax::new("Point").field("x", TypeSyntax::named("I32"))
    }

    #[test]
    fn test_forward_call_is_bound_and_variables_rebound() {
        let later = FunctionSyntax::new("later")
            .parameter("value", TypeSyntax::named("I32"))
            .returns(TypeSyntax::named("I32"))
            .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::identifier("value")))]);
        let mut output = build(
            ModuleSyntax::new("Demo")
                .item(VariableSyntax::inferred(
                    "x",
                    ExpressionSyntax::invoke("later", vec![ExpressionSyntax::number("1")]),
                ))
                .item(VariableSyntax::inferred(
                    "y",
                    ExpressionSyntax::binary(
                        ExpressionSyntax::identifier("x"),
                        BinaryOperator::Add,
                        ExpressionSyntax::number("1"),
                    ),
                ))
                .item(later),
        );
        assert_eq!(variable_type(&output, "x"), "Unresolved");

        let resolved = resolve(&mut output);
        output.module = resolved.module;

        assert!(output.diagnostics.is_empty());
        assert_eq!(variable_type(&output, "x"), "I32");
        assert_eq!(variable_type(&output, "y"), "I32");
        expect![[r#"
            module Demo
            var x: I32 = later(1:I32)
            var y: I32 = (x + 1:I32)
            fn later(value: I32): I32
              return value
        "#]]
        .assert_eq(&IrPrinter::new(&output.symbols).print(&output.module));
    }

    #[test]
    fn test_forward_type_is_forwarded() {
        let origin = FunctionSyntax::new("origin")
            .returns(TypeSyntax::named("Point"))
            .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::initializer(
                TypeSyntax::named("Point"),
                vec![FieldInitializerSyntax::new("x", ExpressionSyntax::number("0"))],
            )))]);
        let mut output = build(ModuleSyntax::new("Demo").item(origin).item(point()));
        let resolved = resolve(&mut output);

        assert!(output.diagnostics.is_empty());
        let Some(IrItem::Function(origin)) = resolved.module.items.first() else {
            panic!("expected a function");
        };
        assert!(output.symbols.ty(origin.return_type.ty).as_declared().is_some());
        let IrStatementKind::Return(Some(value)) = &origin.body.statements[0].kind else {
            panic!("expected a return");
        };
        let IrExpressionKind::TypeInitializer(initializer) = &value.kind else {
            panic!("expected an initializer");
        };
        assert!(initializer.fields[0].field.is_some());
        assert_eq!(output.symbols.type_name(initializer.fields[0].expression.ty), "I32");
    }

    #[test]
    fn test_forward_member_access() {
        let read = FunctionSyntax::new("read")
            .parameter("p", TypeSyntax::named("Point"))
            .returns(TypeSyntax::named("I32"))
            .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::member(
                ExpressionSyntax::identifier("p"),
                "x",
            )))]);
        let wrong = FunctionSyntax::new("wrong")
            .parameter("p", TypeSyntax::named("Point"))
            .body(vec![StatementSyntax::expression(ExpressionSyntax::member(
                ExpressionSyntax::identifier("p"),
                "y",
            ))]);
        let mut output = build(ModuleSyntax::new("Demo").item(read).item(wrong).item(point()));
        resolve(&mut output);

        assert_eq!(
            kinds(&output),
            vec![DiagnosticKind::FieldNotFoundOnType {
                field: "y".to_owned(),
                type_name: "Point".to_owned(),
            }]
        );
    }

    #[test]
    fn test_unknown_names_are_reported_once() {
        let mut output = build(
            ModuleSyntax::new("Demo")
                .item(VariableSyntax::typed("a", TypeSyntax::named("Missing"), None))
                .item(VariableSyntax::typed("b", TypeSyntax::named("Missing"), None))
                .item(VariableSyntax::inferred(
                    "c",
                    ExpressionSyntax::invoke("nothing", vec![ExpressionSyntax::number("1")]),
                )),
        );
        assert!(output.diagnostics.is_empty());
        resolve(&mut output);

        assert_eq!(
            kinds(&output),
            vec![
                DiagnosticKind::TypeNotFound { name: "Missing".to_owned() },
                DiagnosticKind::FunctionNotFound { name: "nothing".to_owned() },
            ]
        );
        assert_eq!(variable_type(&output, "c"), "Unresolved");
    }

    #[test]
    fn test_forward_template_call_is_instantiated() {
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
        let mut output = build(
            ModuleSyntax::new("Demo")
                .item(VariableSyntax::inferred(
                    "sum",
                    ExpressionSyntax::invoke("add", vec![ExpressionSyntax::number("1"), ExpressionSyntax::number("2")]),
                ))
                .item(add),
        );
        assert!(output.instantiations.is_empty());
        let resolved = resolve(&mut output);

        assert!(output.diagnostics.is_empty());
        let names: Vec<String> = resolved
            .instantiations
            .iter()
            .map(|instantiation| output.symbols.name_of(instantiation.instance).full_original_name())
            .collect();
        assert_eq!(names, vec!["add<I64>"]);
        assert_eq!(variable_type(&output, "sum"), "I64");
    }

    #[test]
    fn test_resolved_module_is_returned_untouched() {
        let square = FunctionSyntax::new("square")
            .parameter("x", TypeSyntax::named("I32"))
            .returns(TypeSyntax::named("I32"))
            .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::binary(
                ExpressionSyntax::identifier("x"),
                BinaryOperator::Multiply,
                ExpressionSyntax::identifier("x"),
            )))]);
        let mut output = build(ModuleSyntax::new("Demo").item(square));
        let resolved = resolve(&mut output);

        assert!(Rc::ptr_eq(&resolved.module, &output.module));
        assert!(resolved.instantiations.is_empty());
    }
}
