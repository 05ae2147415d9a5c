//! Template instantiation pass
//!
//! Gives every template instance its own declaration by deep-copying the
//! template with the type arguments substituted. An instance is created
//! once per distinct argument tuple (the symbol table's registry guarantees
//! it), so the pass emits one declaration per tuple and appends it to the
//! module.

mod instantiator;
mod rewriter;

pub use instantiator::{IrTemplateInstantiator, DEFAULT_MAX_DEPTH};
pub use rewriter::IrTemplateRewriter;

use mj_ir::ScopeError;
use thiserror::Error;

/// Instantiation requests that cannot come from a well-formed module
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstantiateError {
    #[error("'{name}' is not a template and cannot be instantiated")]
    NotATemplate { name: String },

    #[error("no declaration of template '{name}' in the module")]
    MissingDeclaration { name: String },

    #[error("instance of '{name}' is a different kind of symbol than its template")]
    InstanceKind { name: String },

    #[error(transparent)]
    Scope(#[from] ScopeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use mj_diagnostics::DiagnosticKind;
    use mj_ir::{IrExpressionKind, IrItem, IrPrinter, IrStatementKind, NullModuleLoader};
    use mj_ir_build::{BuildOptions, BuildOutput, IrBuilder};
    use mj_symbol::SymbolRef;
    use mj_syntax::{
        BinaryOperator, ExpressionSyntax, FieldInitializerSyntax, FunctionSyntax, ModuleSyntax,
        StatementSyntax, TypeDeclarationSyntax, TypeParameterSyntax, TypeSyntax, VariableSyntax,
    };
    use std::rc::Rc;

    fn build(module: ModuleSyntax) -> BuildOutput {
        IrBuilder::program(&module.into_tree(), &NullModuleLoader, BuildOptions::default())
            .expect("module builds")
    }

    fn instantiate(output: &mut BuildOutput, max_depth: usize) {
        let queued = std::mem::take(&mut output.instantiations);
        output.module = IrTemplateInstantiator::new(&mut output.symbols, &mut output.scopes, &mut output.diagnostics)
            .max_depth(max_depth)
            .add_instantiations(&output.module, queued)
            .expect("instantiation succeeds");
    }

    fn dump(output: &BuildOutput) -> String {
        IrPrinter::new(&output.symbols).print(&output.module)
    }

    /// `add<#T>(a: T, b: T): T`
    fn add() -> FunctionSyntax {
        FunctionSyntax::new("add")
            .type_parameter(TypeParameterSyntax::template("T"))
            .parameter("a", TypeSyntax::named("T"))
            .parameter("b", TypeSyntax::named("T"))
            .returns(TypeSyntax::named("T"))
            .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::binary(
                ExpressionSyntax::identifier("a"),
                BinaryOperator::Add,
                ExpressionSyntax::identifier("b"),
            )))])
    }

    /// `twice<#T>(x: T): T` calling `add`
    fn twice() -> FunctionSyntax {
        FunctionSyntax::new("twice")
            .type_parameter(TypeParameterSyntax::template("T"))
            .parameter("x", TypeSyntax::named("T"))
            .returns(TypeSyntax::named("T"))
            .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::invoke(
                "add",
                vec![ExpressionSyntax::identifier("x"), ExpressionSyntax::identifier("x")],
            )))])
    }

    fn numbers(first: &str, second: &str) -> Vec<ExpressionSyntax> {
        vec![ExpressionSyntax::number(first), ExpressionSyntax::number(second)]
    }

    #[test]
    fn test_one_declaration_per_argument_tuple() {
        let mut output = build(
            ModuleSyntax::new("Demo")
                .item(add())
                .item(VariableSyntax::typed(
                    "small",
                    TypeSyntax::named("U8"),
                    Some(ExpressionSyntax::number("1")),
                ))
                .item(VariableSyntax::inferred("wide", ExpressionSyntax::invoke("add", numbers("1", "2"))))
                .item(VariableSyntax::inferred(
                    "narrow",
                    ExpressionSyntax::invoke(
                        "add",
                        vec![ExpressionSyntax::identifier("small"), ExpressionSyntax::identifier("small")],
                    ),
                ))
                .item(VariableSyntax::inferred("again", ExpressionSyntax::invoke("add", numbers("3", "4")))),
        );
        instantiate(&mut output, DEFAULT_MAX_DEPTH);

        assert!(output.diagnostics.is_empty());
        expect![[r#"
            module Demo
            fn add<#T>(a: T, b: T): T
              return (a + b)
            var small: U8 = 1:U8
            var wide: I64 = add<I64>(1:I64, 2:I64)
            var narrow: U8 = add<U8>(small, small)
            var again: I64 = add<I64>(3:I64, 4:I64)
            fn add<I64>(a: I64, b: I64): I64
              return (a + b)
            fn add<U8>(a: U8, b: U8): U8
              return (a + b)
        "#]]
        .assert_eq(&dump(&output));
    }

    #[test]
    fn test_instances_own_their_trees() {
        let mut output = build(
            ModuleSyntax::new("Demo")
                .item(add())
                .item(VariableSyntax::inferred("wide", ExpressionSyntax::invoke("add", numbers("1", "2"))))
                .item(VariableSyntax::inferred(
                    "text",
                    ExpressionSyntax::invoke(
                        "add",
                        vec![ExpressionSyntax::string("a"), ExpressionSyntax::string("b")],
                    ),
                )),
        );
        instantiate(&mut output, DEFAULT_MAX_DEPTH);

        let functions: Vec<_> = output.module.functions().cloned().collect();
        assert_eq!(functions.len(), 3);
        let (template, first, second) = (&functions[0], &functions[1], &functions[2]);
        assert!(!Rc::ptr_eq(&first.body, &second.body));
        assert!(!Rc::ptr_eq(&first.body, &template.body));
        assert_ne!(first.scope, template.scope);
        assert_ne!(first.body.scope, second.body.scope);
        assert!(first.type_parameters.is_empty());

        // references in the copy point at the instance's own parameters
        let instance_parameters = output.symbols.function(first.symbol).parameters.clone();
        let IrStatementKind::Return(Some(value)) = &first.body.statements[0].kind else {
            panic!("expected a return");
        };
        let IrExpressionKind::Binary { left, .. } = &value.kind else {
            panic!("expected a binary expression");
        };
        let IrExpressionKind::Reference(symbol) = &left.kind else {
            panic!("expected a reference");
        };
        assert_eq!(*symbol, SymbolRef::Parameter(instance_parameters[0]));
        assert_eq!(output.symbols.type_name(value.ty), "I64");
    }

    #[test]
    fn test_nested_template_calls_are_instantiated() {
        let mut output = build(
            ModuleSyntax::new("Demo")
                .item(add())
                .item(twice())
                .item(VariableSyntax::inferred(
                    "result",
                    ExpressionSyntax::invoke("twice", vec![ExpressionSyntax::number("3")]),
                )),
        );
        instantiate(&mut output, DEFAULT_MAX_DEPTH);

        assert!(output.diagnostics.is_empty());
        expect![[r#"
            module Demo
            fn add<#T>(a: T, b: T): T
              return (a + b)
            fn twice<#T>(x: T): T
              return add(x, x)
            var result: I64 = twice<I64>(3:I64)
            fn twice<I64>(x: I64): I64
              return add<I64>(x, x)
            fn add<I64>(a: I64, b: I64): I64
              return (a + b)
        "#]]
        .assert_eq(&dump(&output));
    }

    #[test]
    fn test_nesting_limit() {
        let mut output = build(
            ModuleSyntax::new("Demo")
                .item(add())
                .item(twice())
                .item(VariableSyntax::inferred(
                    "result",
                    ExpressionSyntax::invoke("twice", vec![ExpressionSyntax::number("3")]),
                )),
        );
        instantiate(&mut output, 0);

        let kinds: Vec<DiagnosticKind> = output.diagnostics.iter().map(|diagnostic| diagnostic.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::TemplateDepthExceeded {
                name: "add".to_owned(),
                limit: 0,
            }]
        );
        assert_eq!(output.module.functions().count(), 3);
    }

    #[test]
    fn test_template_type_instance() {
        let boxed = TypeDeclarationSyntax::new("Box")
            .type_parameter(TypeParameterSyntax::template("T"))
            .field("value", TypeSyntax::named("T"));
        let mut output = build(
            ModuleSyntax::new("Demo").item(boxed).item(VariableSyntax::inferred(
                "b",
                ExpressionSyntax::initializer(
                    TypeSyntax::generic("Box", vec![TypeSyntax::named("I32")]),
                    vec![FieldInitializerSyntax::new("value", ExpressionSyntax::number("1"))],
                ),
            )),
        );
        instantiate(&mut output, DEFAULT_MAX_DEPTH);

        assert!(output.diagnostics.is_empty());
        expect![[r#"
            module Demo
            type Box<#T>
              field value: T
            var b: Box<I32> = Box<I32> { value = 1:I32 }
            type Box<I32>
              field value: I32
        "#]]
        .assert_eq(&dump(&output));

        let Some(IrItem::Type(instance)) = output.module.items.last() else {
            panic!("expected the instance declaration last");
        };
        let fields = output.symbols.ty(instance.symbol).as_declared().unwrap().fields.clone();
        assert_eq!(instance.fields[0].symbol, fields[0]);
    }

    #[test]
    fn test_instance_body_is_checked_with_concrete_types() {
        let half = FunctionSyntax::new("half")
            .type_parameter(TypeParameterSyntax::template("T"))
            .parameter("x", TypeSyntax::named("T"))
            .returns(TypeSyntax::named("T"))
            .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::binary(
                ExpressionSyntax::identifier("x"),
                BinaryOperator::Divide,
                ExpressionSyntax::number("2"),
            )))]);
        let mut output = build(
            ModuleSyntax::new("Demo")
                .item(half)
                .item(VariableSyntax::inferred(
                    "number",
                    ExpressionSyntax::invoke("half", vec![ExpressionSyntax::number("8")]),
                ))
                .item(VariableSyntax::inferred(
                    "text",
                    ExpressionSyntax::invoke("half", vec![ExpressionSyntax::string("a")]),
                )),
        );
        assert!(output.diagnostics.is_empty());
        instantiate(&mut output, DEFAULT_MAX_DEPTH);

        assert!(output.diagnostics.any(|kind| matches!(
            kind,
            DiagnosticKind::OperandTypeMismatch { left, .. } if left == "Str"
        )));
        let rendered = dump(&output);
        assert!(rendered.contains("fn half<I64>(x: I64): I64\n  return (x / 2:I64)"));
    }

    #[test]
    fn test_nothing_to_instantiate() {
        let mut output = build(ModuleSyntax::new("Demo").item(add()));
        let before = Rc::clone(&output.module);
        instantiate(&mut output, DEFAULT_MAX_DEPTH);
        assert!(Rc::ptr_eq(&before, &output.module));
    }
}
