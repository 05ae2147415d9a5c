//! Validator interface and the built-in validators

use mj_diagnostics::{DiagnosticKind, DiagnosticList};
use mj_ir::{IrDeclarationFunction, IrExpression, IrStatement};
use mj_symbol::SymbolTable;

/// What a validator can read and where it reports
pub struct ValidationContext<'a> {
    pub symbols: &'a SymbolTable,
    pub diagnostics: &'a mut DiagnosticList,
}

/// A check run on every node of a kind while the validation pass walks the
/// tree. Validators only report; they never change the tree.
pub trait IrValidator {
    fn name(&self) -> &'static str;

    fn check_function(&mut self, _context: &mut ValidationContext<'_>, _function: &IrDeclarationFunction) {}

    fn check_statement(&mut self, _context: &mut ValidationContext<'_>, _statement: &IrStatement) {}

    fn check_expression(&mut self, _context: &mut ValidationContext<'_>, _expression: &IrExpression) {}
}

/// Reports functions with a return type that can finish without returning
#[derive(Debug, Default, Clone, Copy)]
pub struct MissingReturnValidator;

impl IrValidator for MissingReturnValidator {
    fn name(&self) -> &'static str {
        "missing-return"
    }

    fn check_function(&mut self, context: &mut ValidationContext<'_>, function: &IrDeclarationFunction) {
        let symbol = context.symbols.function(function.symbol);
        // instances share the template's control flow, which is checked once
        if symbol.instance_of.is_some() {
            return;
        }
        let return_type = function.return_type.ty;
        if context.symbols.ty(return_type).is_void() || context.symbols.is_unresolved_type(return_type) {
            return;
        }
        if !function.body.always_returns() {
            context.diagnostics.add(
                function.location,
                DiagnosticKind::MissingReturn {
                    function: symbol.name.full_original_name(),
                },
            );
        }
    }
}
