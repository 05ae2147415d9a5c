use integration_tests::{compile_module, diagnostic_kinds, variable_type};
use mj_diagnostics::DiagnosticKind;
use mj_ir::{IrItem, IrStatementKind};
use mj_syntax::{
    ArgumentSyntax, ExpressionSyntax, FunctionSyntax, ModuleSyntax, StatementSyntax, TypeSyntax,
    VariableSyntax,
};

/// `fn f(a: I32, b: Str)` and a `main` making the given call
fn call_f(arguments: Vec<ArgumentSyntax>) -> ModuleSyntax {
    let f = FunctionSyntax::new("f")
        .parameter("a", TypeSyntax::named("I32"))
        .parameter("b", TypeSyntax::named("Str"))
        .body(Vec::new());
    let main = FunctionSyntax::new("main").body(vec![StatementSyntax::expression(ExpressionSyntax::invoke_with(
        "f",
        Vec::new(),
        arguments,
    ))]);
    ModuleSyntax::new("Demo").item(f).item(main)
}

#[test]
fn test_named_arguments_bind_by_name() {
    let program = compile_module(call_f(vec![
        ArgumentSyntax::named("b", ExpressionSyntax::string("x")),
        ArgumentSyntax::named("a", ExpressionSyntax::number("1")),
    ]));

    assert!(!program.has_diagnostics(), "{}", program.dump_diagnostics());
    let Some(IrItem::Function(main)) = program.module.items.get(1) else {
        panic!("expected main");
    };
    let IrStatementKind::Expression(call) = &main.body.statements[0].kind else {
        panic!("expected an expression statement");
    };
    let call = call.as_invocation().expect("a call");

    // arguments come back in parameter order
    let bound: Vec<(String, String)> = call
        .arguments
        .iter()
        .map(|argument| {
            let parameter = argument.parameter.expect("argument is paired");
            (
                program.symbols.parameter(parameter).name.full_original_name(),
                program.symbols.type_name(argument.expression.ty),
            )
        })
        .collect();
    assert_eq!(
        bound,
        vec![("a".to_owned(), "I32".to_owned()), ("b".to_owned(), "Str".to_owned())]
    );
}

#[test]
fn test_positional_argument_in_named_call() {
    let program = compile_module(call_f(vec![
        ArgumentSyntax::positional(ExpressionSyntax::number("1")),
        ArgumentSyntax::named("b", ExpressionSyntax::string("x")),
        ArgumentSyntax::positional(ExpressionSyntax::number("2")),
    ]));

    let positional = DiagnosticKind::PositionalArgumentInNamedCall { function: "f".to_owned() };
    assert_eq!(diagnostic_kinds(&program), vec![positional.clone(), positional]);
}

#[test]
fn test_named_argument_problems() {
    let program = compile_module(call_f(vec![
        ArgumentSyntax::named("a", ExpressionSyntax::number("1")),
        ArgumentSyntax::named("a", ExpressionSyntax::number("2")),
        ArgumentSyntax::named("c", ExpressionSyntax::string("x")),
    ]));

    assert_eq!(
        diagnostic_kinds(&program),
        vec![
            DiagnosticKind::DuplicateNamedArgument { argument: "a".to_owned() },
            DiagnosticKind::NoParameterForNamedArgument {
                function: "f".to_owned(),
                argument: "c".to_owned(),
            },
        ]
    );
}

#[test]
fn test_positional_count_mismatch() {
    let program = compile_module(call_f(vec![ArgumentSyntax::positional(ExpressionSyntax::number("1"))]));

    assert_eq!(
        diagnostic_kinds(&program),
        vec![DiagnosticKind::ArgumentCountMismatch {
            name: "f".to_owned(),
            expected: 2,
            actual: 1,
        }]
    );
}

/// `fn pick(x: <ty>): <ty> { return x }`
fn pick(ty: &str) -> FunctionSyntax {
    FunctionSyntax::new("pick")
        .parameter("x", TypeSyntax::named(ty))
        .returns(TypeSyntax::named(ty))
        .body(vec![StatementSyntax::ret(Some(ExpressionSyntax::identifier("x")))])
}

#[test]
fn test_overload_widens_to_the_allowed_candidate() {
    let program = compile_module(
        ModuleSyntax::new("Demo")
            .item(pick("I8"))
            .item(pick("I32"))
            .item(VariableSyntax::typed("small", TypeSyntax::named("I16"), Some(ExpressionSyntax::number("3"))))
            .item(VariableSyntax::inferred(
                "picked",
                ExpressionSyntax::invoke("pick", vec![ExpressionSyntax::identifier("small")]),
            )),
    );

    assert!(!program.has_diagnostics(), "{}", program.dump_diagnostics());
    assert_eq!(variable_type(&program, "picked"), "I32");
}

#[test]
fn test_overload_prefers_exact_match() {
    let program = compile_module(
        ModuleSyntax::new("Demo")
            .item(pick("I32"))
            .item(pick("I16"))
            .item(VariableSyntax::typed("small", TypeSyntax::named("I16"), Some(ExpressionSyntax::number("3"))))
            .item(VariableSyntax::inferred(
                "picked",
                ExpressionSyntax::invoke("pick", vec![ExpressionSyntax::identifier("small")]),
            )),
    );

    assert!(!program.has_diagnostics(), "{}", program.dump_diagnostics());
    assert_eq!(variable_type(&program, "picked"), "I16");
}

#[test]
fn test_overload_ties_go_to_the_first_declared() {
    let program = compile_module(
        ModuleSyntax::new("Demo")
            .item(pick("I32"))
            .item(pick("I64"))
            .item(VariableSyntax::typed("small", TypeSyntax::named("I16"), Some(ExpressionSyntax::number("3"))))
            .item(VariableSyntax::inferred(
                "picked",
                ExpressionSyntax::invoke("pick", vec![ExpressionSyntax::identifier("small")]),
            )),
    );

    assert!(!program.has_diagnostics(), "{}", program.dump_diagnostics());
    assert_eq!(variable_type(&program, "picked"), "I32");
}

#[test]
fn test_literal_defaults_to_i64() {
    let program = compile_module(ModuleSyntax::new("Demo").item(VariableSyntax::inferred("answer", ExpressionSyntax::number("42"))));

    assert!(!program.has_diagnostics());
    assert_eq!(variable_type(&program, "answer"), "I64");
    assert_eq!(program.dump(), "module Demo\nvar answer: I64 = 42:I64\n");
}

#[test]
fn test_literal_takes_the_declared_type() {
    let program = compile_module(
        ModuleSyntax::new("Demo").item(VariableSyntax::typed("byte", TypeSyntax::named("U8"), Some(ExpressionSyntax::number("42")))),
    );

    assert!(!program.has_diagnostics());
    assert_eq!(variable_type(&program, "byte"), "U8");
    assert_eq!(program.dump(), "module Demo\nvar byte: U8 = 42:U8\n");
}
