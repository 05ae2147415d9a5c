//! Validation pass
//!
//! A read-only walk over the finished module. Every node is handed to the
//! registered [`IrValidator`]s, which add diagnostics; the tree itself is
//! never rebuilt, so the walk returns the module it was given.

mod validator;

pub use validator::{IrValidator, MissingReturnValidator, ValidationContext};

use mj_diagnostics::DiagnosticList;
use mj_ir::rewriter::{walk_expression, walk_function, walk_statement};
use mj_ir::{IrDeclarationFunction, IrExpression, IrModule, IrRewriter, IrStatement};
use mj_symbol::SymbolTable;
use std::rc::Rc;
use tracing::debug;

pub struct IrValidationRewriter<'a> {
    symbols: &'a SymbolTable,
    diagnostics: &'a mut DiagnosticList,
    validators: Vec<Box<dyn IrValidator>>,
}

impl<'a> IrValidationRewriter<'a> {
    /// A pass with the built-in validators
    pub fn new(symbols: &'a SymbolTable, diagnostics: &'a mut DiagnosticList) -> Self {
        Self::empty(symbols, diagnostics).with_validator(Box::new(MissingReturnValidator))
    }

    /// A pass without validators
    pub fn empty(symbols: &'a SymbolTable, diagnostics: &'a mut DiagnosticList) -> Self {
        Self {
            symbols,
            diagnostics,
            validators: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Box<dyn IrValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Run every validator over `module`; true when any of them reported
    pub fn validate(&mut self, module: &Rc<IrModule>) -> bool {
        let checkpoint = self.diagnostics.len();
        let walked = self.rewrite_module(module);
        debug_assert!(Rc::ptr_eq(&walked, module), "validation rebuilt the tree");

        let reported = self.diagnostics.len() - checkpoint;
        let validators: Vec<&'static str> = self.validators.iter().map(|validator| validator.name()).collect();
        debug!(module = %module.name, ?validators, reported, "validated module");
        reported > 0
    }

    fn run(&mut self, check: impl Fn(&mut dyn IrValidator, &mut ValidationContext<'_>)) {
        let mut context = ValidationContext {
            symbols: self.symbols,
            diagnostics: &mut *self.diagnostics,
        };
        for validator in &mut self.validators {
            check(validator.as_mut(), &mut context);
        }
    }
}

impl IrRewriter for IrValidationRewriter<'_> {
    fn rewrite_function(&mut self, function: &Rc<IrDeclarationFunction>) -> Rc<IrDeclarationFunction> {
        self.run(|validator, context| validator.check_function(context, function));
        walk_function(self, function)
    }

    fn rewrite_statement(&mut self, statement: &Rc<IrStatement>) -> Rc<IrStatement> {
        self.run(|validator, context| validator.check_statement(context, statement));
        walk_statement(self, statement)
    }

    fn rewrite_expression(&mut self, expression: &Rc<IrExpression>) -> Rc<IrExpression> {
        self.run(|validator, context| validator.check_expression(context, expression));
        walk_expression(self, expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mj_diagnostics::DiagnosticKind;
    use mj_ir::NullModuleLoader;
    use mj_ir_build::{BuildOptions, BuildOutput, IrBuilder};
    use mj_syntax::{
        CodeBlockSyntax, ElseSyntax, ExpressionSyntax, FunctionSyntax, IfSyntax, LoopKindSyntax,
        LoopSyntax, ModuleSyntax, StatementSyntax, TypeSyntax,
    };
    use std::cell::Cell;

    fn build(module: ModuleSyntax) -> BuildOutput {
        IrBuilder::program(&module.into_tree(), &NullModuleLoader, BuildOptions::default())
            .expect("module builds")
    }

    fn returning(name: &str, body: Vec<StatementSyntax>) -> FunctionSyntax {
        FunctionSyntax::new(name)
            .parameter("flag", TypeSyntax::named("Bool"))
            .returns(TypeSyntax::named("I32"))
            .body(body)
    }

    fn ret(value: &str) -> StatementSyntax {
        StatementSyntax::ret(Some(ExpressionSyntax::number(value)))
    }

    fn branch(otherwise: Option<Vec<StatementSyntax>>) -> StatementSyntax {
        let branch = IfSyntax::new(ExpressionSyntax::identifier("flag"), CodeBlockSyntax::new(vec![ret("1")]));
        let branch = match otherwise {
            Some(statements) => branch.otherwise(ElseSyntax::Block(CodeBlockSyntax::new(statements))),
            None => branch,
        };
        StatementSyntax::If(branch)
    }

    #[test]
    fn test_missing_return() {
        let mut output = build(
            ModuleSyntax::new("Demo")
                .item(returning("both", vec![branch(Some(vec![ret("2")]))]))
                .item(returning("only_then", vec![branch(None)]))
                .item(returning("empty", Vec::new()))
                .item(returning(
                    "forever",
                    vec![StatementSyntax::Loop(LoopSyntax::new(
                        LoopKindSyntax::Infinite,
                        CodeBlockSyntax::default(),
                    ))],
                ))
                .item(FunctionSyntax::new("nothing").body(Vec::new())),
        );
        assert!(output.diagnostics.is_empty());

        let reported = IrValidationRewriter::new(&output.symbols, &mut output.diagnostics).validate(&output.module);

        assert!(reported);
        let kinds: Vec<DiagnosticKind> = output.diagnostics.iter().map(|diagnostic| diagnostic.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::MissingReturn {
                    function: "only_then".to_owned(),
                },
                DiagnosticKind::MissingReturn {
                    function: "empty".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn test_walk_keeps_the_tree() {
        let mut output = build(ModuleSyntax::new("Demo").item(returning("both", vec![branch(Some(vec![ret("2")]))])));
        let module = Rc::clone(&output.module);

        let mut pass = IrValidationRewriter::new(&output.symbols, &mut output.diagnostics);
        assert!(!pass.validate(&module));
        assert!(Rc::ptr_eq(&pass.rewrite_module(&module), &module));
    }

    struct CountExpressions(Rc<Cell<usize>>);

    impl IrValidator for CountExpressions {
        fn name(&self) -> &'static str {
            "count-expressions"
        }

        fn check_expression(&mut self, _context: &mut ValidationContext<'_>, _expression: &IrExpression) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_custom_validator_sees_every_expression() {
        let mut output = build(ModuleSyntax::new("Demo").item(returning("both", vec![branch(Some(vec![ret("2")]))])));
        let seen = Rc::new(Cell::new(0));

        let reported = IrValidationRewriter::empty(&output.symbols, &mut output.diagnostics)
            .with_validator(Box::new(CountExpressions(Rc::clone(&seen))))
            .validate(&output.module);

        assert!(!reported);
        // `flag`, `1` and `2`
        assert_eq!(seen.get(), 3);
    }
}
