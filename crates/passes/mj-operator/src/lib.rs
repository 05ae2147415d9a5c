//! Operator overload lowering
//!
//! Binary operators on types that define them outside the compilation unit
//! become calls. For every binary expression the loader is asked for an
//! operator function keyed by the operator text, the left operand's type
//! name and both operand type names; a hit is imported into the module and
//! the expression is replaced by an invocation of it.

use mj_diagnostics::DiagnosticList;
use mj_ir::loader::import_function;
use mj_ir::rewriter::walk_expression;
use mj_ir::{
    ExternalModuleLoader, IrArgument, IrArgumentMatcher, IrExpression, IrExpressionKind,
    IrInvocation, IrModule, IrRewriter, ScopeId, ScopeTree, TypeArgumentMap,
};
use mj_symbol::{FunctionId, SymbolTable, TypeId};
use rustc_hash::FxHashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Operator text and operand types
type OperatorKey = (&'static str, TypeId, TypeId);

pub struct IrOperatorFunctionRewriter<'a> {
    symbols: &'a mut SymbolTable,
    scopes: &'a ScopeTree,
    diagnostics: &'a mut DiagnosticList,
    loader: &'a dyn ExternalModuleLoader,
    /// Scope operator functions are imported into
    scope: ScopeId,
    /// Loader answers, one import per operator and operand types
    imported: FxHashMap<OperatorKey, Option<FunctionId>>,
    lowered: usize,
}

impl<'a> IrOperatorFunctionRewriter<'a> {
    pub fn new(
        symbols: &'a mut SymbolTable,
        scopes: &'a ScopeTree,
        diagnostics: &'a mut DiagnosticList,
        loader: &'a dyn ExternalModuleLoader,
    ) -> Self {
        let scope = scopes.global();
        Self {
            symbols,
            scopes,
            diagnostics,
            loader,
            scope,
            imported: FxHashMap::default(),
            lowered: 0,
        }
    }

    /// Lower every overloaded operator in `module`. The module comes back
    /// as the same allocation when nothing was lowered.
    pub fn lower(mut self, module: &Rc<IrModule>) -> Rc<IrModule> {
        self.scope = module.scope;
        let lowered = self.rewrite_module(module);
        debug!(module = %module.name, lowered = self.lowered, "lowered operator functions");
        lowered
    }

    fn operator_function(&mut self, key: OperatorKey) -> Option<FunctionId> {
        if let Some(known) = self.imported.get(&key) {
            return *known;
        }
        let (operator, left, right) = key;
        let left_name = self.symbols.type_name(left);
        let right_name = self.symbols.type_name(right);
        let function = self
            .loader
            .lookup_operator(operator, &left_name, &[left_name.as_str(), right_name.as_str()])
            .map(|function| import_function(self.symbols, self.scopes, self.scope, &function));
        if let Some(id) = function {
            trace!(operator, left = %left_name, right = %right_name, function = %self.symbols.function(id).name, "imported operator function");
        }
        self.imported.insert(key, function);
        function
    }
}

impl IrRewriter for IrOperatorFunctionRewriter<'_> {
    fn rewrite_expression(&mut self, expression: &Rc<IrExpression>) -> Rc<IrExpression> {
        let rewritten = walk_expression(self, expression);
        let IrExpressionKind::Binary { left, operator, right } = &rewritten.kind else {
            return rewritten;
        };
        if self.symbols.is_unresolved_type(left.ty) || self.symbols.is_unresolved_type(right.ty) {
            return rewritten;
        }
        let Some(function) = self.operator_function((operator.text(), left.ty, right.ty)) else {
            return rewritten;
        };

        let location = rewritten.location;
        let arguments = [
            IrArgument::new(left.location, None, Rc::clone(left)),
            IrArgument::new(right.location, None, Rc::clone(right)),
        ];
        let arguments = IrArgumentMatcher::new(self.symbols, self.diagnostics).match_arguments(
            location,
            function,
            &TypeArgumentMap::new(),
            &arguments,
        );
        self.lowered += 1;
        Rc::new(IrExpression::new(
            location,
            self.symbols.function(function).return_type,
            IrExpressionKind::Invocation(IrInvocation {
                function,
                type_arguments: Vec::new(),
                arguments,
            }),
        ))
    }
}
