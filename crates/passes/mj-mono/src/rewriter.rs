//! Substituting deep copy of one template declaration

use mj_diagnostics::{DiagnosticKind, DiagnosticList};
use mj_ir::matcher::find_field;
use mj_ir::overload::is_implicitly_convertible;
use mj_ir::rewriter::{
    walk_code_block, walk_expression, walk_function, walk_statement, walk_type_declaration,
    walk_variable_declaration,
};
use mj_ir::{
    IrAssignmentTarget, IrCallBinder, IrCodeBlock, IrDeclarationFunction, IrDeclarationType,
    IrDeclarationVariable, IrExpression, IrExpressionKind, IrExpressionTypeRewriter,
    IrFieldTypeMatcher, IrInvocation, IrRewriter, IrStatement, IrStatementKind, IrTypeInitializer,
    OperatorTyper, RewriteMode, ScopeError, ScopeId, ScopeKind, ScopeTree, TypeArgumentMap,
};
use mj_symbol::{FunctionId, SymbolId, SymbolRef, SymbolTable, TypeId, VariableSymbol};
use rustc_hash::FxHashMap;
use std::rc::Rc;
use tracing::trace;

/// Copies a template declaration for one instance.
///
/// Every node is rebuilt. Types go through the parameter map, locals get
/// fresh symbols declared in fresh scopes, and whatever was typed from a
/// type parameter in the template is typed and checked again now that the
/// parameter has a concrete type: operators, calls, member accesses,
/// initializers, returns and variable initializers.
pub struct IrTemplateRewriter<'a> {
    symbols: &'a mut SymbolTable,
    scopes: &'a mut ScopeTree,
    diagnostics: &'a mut DiagnosticList,
    map: TypeArgumentMap,
    fold_constants: bool,
    /// Template symbol -> its counterpart in the copy
    copies: FxHashMap<SymbolRef, SymbolRef>,
    scope_stack: Vec<ScopeId>,
    /// Instance being copied and its return type
    frame: Option<(FunctionId, TypeId)>,
    /// First scope failure met while copying
    failure: Option<ScopeError>,
}

impl<'a> IrTemplateRewriter<'a> {
    pub fn new(
        symbols: &'a mut SymbolTable,
        scopes: &'a mut ScopeTree,
        diagnostics: &'a mut DiagnosticList,
        map: TypeArgumentMap,
    ) -> Self {
        Self {
            symbols,
            scopes,
            diagnostics,
            map,
            fold_constants: true,
            copies: FxHashMap::default(),
            scope_stack: Vec::new(),
            frame: None,
            failure: None,
        }
    }

    #[must_use]
    pub fn fold_constants(mut self, fold_constants: bool) -> Self {
        self.fold_constants = fold_constants;
        self
    }

    /// Make the copy refer to `instance` wherever the template refers to
    /// `template`
    pub fn bind(&mut self, template: SymbolRef, instance: SymbolRef) {
        self.copies.insert(template, instance);
    }

    /// Copy a template function into `scope`, which must already hold the
    /// instance parameters
    pub fn copy_function(
        &mut self,
        function: &Rc<IrDeclarationFunction>,
        scope: ScopeId,
    ) -> Result<Rc<IrDeclarationFunction>, ScopeError> {
        let instance = self
            .copies
            .get(&SymbolRef::Function(function.symbol))
            .and_then(|symbol| FunctionId::from_ref(*symbol))
            .unwrap_or(function.symbol);
        let return_type = self.map.substitute(self.symbols, function.return_type.ty);

        self.scope_stack.push(scope);
        self.frame = Some((instance, return_type));
        let copied = walk_function(self, function);
        self.frame = None;
        self.scope_stack.pop();
        self.take_failure()?;

        Ok(Rc::new(IrDeclarationFunction {
            scope,
            type_parameters: Vec::new(),
            ..(*copied).clone()
        }))
    }

    /// Copy a template type into `scope`, which must already hold the
    /// instance fields
    pub fn copy_type(
        &mut self,
        declaration: &Rc<IrDeclarationType>,
        scope: ScopeId,
    ) -> Result<Rc<IrDeclarationType>, ScopeError> {
        self.scope_stack.push(scope);
        let copied = walk_type_declaration(self, declaration);
        self.scope_stack.pop();
        self.take_failure()?;

        Ok(Rc::new(IrDeclarationType {
            scope,
            type_parameters: Vec::new(),
            ..(*copied).clone()
        }))
    }

    fn take_failure(&mut self) -> Result<(), ScopeError> {
        self.failure.take().map_or(Ok(()), Err)
    }

    fn scope(&self) -> ScopeId {
        self.scope_stack
            .last()
            .copied()
            .unwrap_or_else(|| self.scopes.global())
    }

    fn mentions_parameter(&self, ty: TypeId) -> bool {
        self.symbols.contains_type_parameter(ty)
    }

    fn unresolved(&self) -> TypeId {
        self.symbols.builtins().unresolved()
    }

    /// Commit `value` to `target`, reporting `TypeMismatch` when it cannot
    /// convert
    fn commit_value(&mut self, value: &Rc<IrExpression>, target: TypeId) -> Rc<IrExpression> {
        let committed = IrExpressionTypeRewriter::new(self.symbols, target).rewrite(value);
        if !is_implicitly_convertible(self.symbols, committed.ty, target) {
            let expected = self.symbols.type_name(target);
            let actual = self.symbols.type_name(committed.ty);
            self.diagnostics
                .add(value.location, DiagnosticKind::TypeMismatch { expected, actual });
        }
        committed
    }

    /// Whether a call in the template depends on its type parameters
    fn needs_rebinding(&self, invocation: &IrInvocation) -> bool {
        self.symbols.is_template_function(invocation.function)
            || invocation
                .type_arguments
                .iter()
                .any(|argument| self.mentions_parameter(argument.ty))
            || invocation
                .arguments
                .iter()
                .any(|argument| self.mentions_parameter(argument.expression.ty))
    }

    /// Bind a call again with the substituted argument types. The overload
    /// may change, and a template callee becomes the instance for the
    /// concrete arguments.
    /// `callee` is the function the template called; a recursive call was
    /// already redirected to this instance by the walk.
    fn rebind_call(
        &mut self,
        expression: &Rc<IrExpression>,
        callee: FunctionId,
        invocation: &IrInvocation,
    ) -> Rc<IrExpression> {
        let location = expression.location;
        let name = self.symbols.function(callee).name.clone();
        let mut candidates = self.scopes.lookup_functions(self.scope(), &name);
        if !candidates.contains(&callee) {
            candidates = vec![callee];
        }
        let explicit: Vec<TypeId> = invocation
            .type_arguments
            .iter()
            .map(|argument| argument.ty)
            .collect();

        let Some(bound) = IrCallBinder::new(self.symbols, self.diagnostics).bind(
            location,
            &name,
            &candidates,
            &explicit,
            &invocation.arguments,
        ) else {
            return Rc::clone(expression);
        };
        trace!(
            %name,
            callee = %self.symbols.function(bound.function).name,
            "rebound call in template instance"
        );

        Rc::new(IrExpression::new(
            location,
            bound.ty,
            IrExpressionKind::Invocation(IrInvocation {
                function: bound.function,
                type_arguments: invocation.type_arguments.clone(),
                arguments: bound.arguments,
            }),
        ))
    }

    fn retype(&mut self, before: &Rc<IrExpression>, after: Rc<IrExpression>) -> Rc<IrExpression> {
        let location = after.location;
        match (&before.kind, &after.kind) {
            (IrExpressionKind::Invocation(template_call), IrExpressionKind::Invocation(invocation))
                if self.needs_rebinding(template_call) =>
            {
                self.rebind_call(&after, template_call.function, invocation)
            }
            (
                IrExpressionKind::Binary {
                    left: left_before,
                    right: right_before,
                    ..
                },
                IrExpressionKind::Binary {
                    left,
                    operator,
                    right,
                },
            ) if self.mentions_parameter(left_before.ty) || self.mentions_parameter(right_before.ty) => {
                let typed = OperatorTyper::new(self.symbols, self.diagnostics)
                    .fold_constants(self.fold_constants)
                    .binary(location, Rc::clone(left), *operator, Rc::clone(right));
                Rc::new(typed)
            }
            (IrExpressionKind::Unary { operand: operand_before, .. }, IrExpressionKind::Unary { operator, operand })
                if self.mentions_parameter(operand_before.ty) =>
            {
                let typed = OperatorTyper::new(self.symbols, self.diagnostics)
                    .fold_constants(self.fold_constants)
                    .unary(location, *operator, Rc::clone(operand));
                Rc::new(typed)
            }
            (
                IrExpressionKind::MemberAccess {
                    target: target_before,
                    ..
                },
                IrExpressionKind::MemberAccess { target, member, .. },
            ) if self.mentions_parameter(target_before.ty) => {
                // the template's field belongs to the template type
                let (field, ty) = match find_field(self.symbols, target.ty, member) {
                    Some((field, ty)) => (Some(field), ty),
                    None => {
                        let type_name = self.symbols.type_name(target.ty);
                        self.diagnostics.add(
                            location,
                            DiagnosticKind::FieldNotFoundOnType {
                                field: member.full_original_name(),
                                type_name,
                            },
                        );
                        (None, self.unresolved())
                    }
                };
                Rc::new(IrExpression::new(
                    location,
                    ty,
                    IrExpressionKind::MemberAccess {
                        target: Rc::clone(target),
                        member: member.clone(),
                        field,
                    },
                ))
            }
            (IrExpressionKind::TypeInitializer(initializer_before), IrExpressionKind::TypeInitializer(initializer))
                if self.mentions_parameter(initializer_before.ty.ty) =>
            {
                let fields = IrFieldTypeMatcher::new(self.symbols, self.diagnostics)
                    .match_fields(initializer.ty.ty, &initializer.fields);
                Rc::new(IrExpression::new(
                    location,
                    initializer.ty.ty,
                    IrExpressionKind::TypeInitializer(IrTypeInitializer {
                        ty: initializer.ty,
                        fields,
                    }),
                ))
            }
            _ => after,
        }
    }

    fn check_return(&mut self, before: &Rc<IrExpression>, value: &Rc<IrExpression>) -> Rc<IrExpression> {
        let Some((function, return_type)) = self.frame else {
            return Rc::clone(value);
        };
        let committed = IrExpressionTypeRewriter::new(self.symbols, return_type).rewrite(value);
        if self.mentions_parameter(before.ty) && !is_implicitly_convertible(self.symbols, committed.ty, return_type) {
            let kind = DiagnosticKind::ReturnTypeMismatch {
                function: self.symbols.function(function).name.full_original_name(),
                expected: self.symbols.type_name(return_type),
                actual: self.symbols.type_name(committed.ty),
            };
            self.diagnostics.add(value.location, kind);
        }
        committed
    }

    fn check_assignment(
        &mut self,
        before: &IrStatementKind,
        target: &IrAssignmentTarget,
        value: &Rc<IrExpression>,
    ) -> Option<IrStatementKind> {
        let IrStatementKind::Assignment {
            target: target_before,
            value: value_before,
        } = before
        else {
            return None;
        };

        match (target_before, target) {
            (IrAssignmentTarget::Symbol(_), IrAssignmentTarget::Symbol(symbol)) => {
                let ty = self.symbols.type_of(*symbol)?;
                if !self.mentions_parameter(value_before.ty) && !self.mentions_parameter(ty) {
                    return None;
                }
                let value = self.commit_value(value, ty);
                Some(IrStatementKind::Assignment {
                    target: target.clone(),
                    value,
                })
            }
            (
                IrAssignmentTarget::Field {
                    target: object_before, ..
                },
                IrAssignmentTarget::Field {
                    target: object, member, ..
                },
            ) if self.mentions_parameter(object_before.ty) => {
                let Some((field, ty)) = find_field(self.symbols, object.ty, member) else {
                    let type_name = self.symbols.type_name(object.ty);
                    self.diagnostics.add(
                        object.location,
                        DiagnosticKind::FieldNotFoundOnType {
                            field: member.full_original_name(),
                            type_name,
                        },
                    );
                    return None;
                };
                let value = self.commit_value(value, ty);
                Some(IrStatementKind::Assignment {
                    target: IrAssignmentTarget::Field {
                        target: Rc::clone(object),
                        member: member.clone(),
                        field: Some(field),
                    },
                    value,
                })
            }
            _ => None,
        }
    }
}

impl IrRewriter for IrTemplateRewriter<'_> {
    fn mode(&self) -> RewriteMode {
        RewriteMode::DeepCopy
    }

    fn rewrite_code_block(&mut self, block: &Rc<IrCodeBlock>) -> Rc<IrCodeBlock> {
        let scope = self.scopes.create(self.scope(), ScopeKind::CodeBlock);
        self.scope_stack.push(scope);
        let copied = walk_code_block(self, block);
        self.scope_stack.pop();
        self.scopes.freeze(scope);

        Rc::new(IrCodeBlock {
            scope,
            ..(*copied).clone()
        })
    }

    fn rewrite_variable_declaration(
        &mut self,
        declaration: &Rc<IrDeclarationVariable>,
    ) -> Rc<IrDeclarationVariable> {
        let copied = walk_variable_declaration(self, declaration);
        let (Some(before), Some(initializer)) = (declaration.initializer.as_ref(), copied.initializer.as_ref()) else {
            return copied;
        };
        let initializer = if self.mentions_parameter(before.ty) || self.mentions_parameter(declaration.ty.ty) {
            self.commit_value(initializer, copied.ty.ty)
        } else {
            Rc::clone(initializer)
        };

        Rc::new(IrDeclarationVariable {
            initializer: Some(initializer),
            ..(*copied).clone()
        })
    }

    fn rewrite_statement(&mut self, statement: &Rc<IrStatement>) -> Rc<IrStatement> {
        let copied = walk_statement(self, statement);
        let kind = match (&statement.kind, &copied.kind) {
            (IrStatementKind::Return(Some(before)), IrStatementKind::Return(Some(value))) => {
                Some(IrStatementKind::Return(Some(self.check_return(before, value))))
            }
            (before, IrStatementKind::Assignment { target, value }) => self.check_assignment(before, target, value),
            _ => None,
        };
        match kind {
            Some(kind) => Rc::new(IrStatement::new(statement.location, kind)),
            None => copied,
        }
    }

    fn rewrite_expression(&mut self, expression: &Rc<IrExpression>) -> Rc<IrExpression> {
        let copied = walk_expression(self, expression);
        self.retype(expression, copied)
    }

    fn rewrite_type_symbol(&mut self, ty: TypeId) -> TypeId {
        self.map.substitute(self.symbols, ty)
    }

    fn rewrite_declared_symbol(&mut self, symbol: SymbolRef) -> SymbolRef {
        if let Some(copy) = self.copies.get(&symbol) {
            return *copy;
        }
        let SymbolRef::Variable(variable) = symbol else {
            // enum members and rules are shared by every instance
            return symbol;
        };

        let original = self.symbols.variable(variable);
        let (name, ty) = (original.name.clone(), original.ty);
        let ty = self.map.substitute(self.symbols, ty);
        let copy = self.symbols.add_variable(VariableSymbol { name, ty });
        let scope = self.scope();
        // a clash was reported when the template itself was built
        if let Err(error) = self.scopes.declare_or_keep(scope, copy.into(), self.symbols) {
            self.failure = self.failure.or(Some(error));
        }
        self.copies.insert(symbol, copy.into());
        copy.into()
    }

    fn rewrite_symbol(&mut self, symbol: SymbolRef) -> SymbolRef {
        self.copies.get(&symbol).copied().unwrap_or(symbol)
    }
}
