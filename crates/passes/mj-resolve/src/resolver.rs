//! The resolve rewriter

use mj_diagnostics::{DiagnosticKind, DiagnosticList};
use mj_ir::inference::committed_type;
use mj_ir::matcher::find_field;
use mj_ir::overload::is_implicitly_convertible;
use mj_ir::rewriter::{
    walk_code_block, walk_expression, walk_function, walk_if, walk_loop, walk_statement,
    walk_type_declaration, walk_variable_declaration,
};
use mj_ir::template::instantiate_type;
use mj_ir::typing::is_integer_type;
use mj_ir::{
    IrAssignmentTarget, IrCallBinder, IrCodeBlock, IrDeclarationFunction, IrDeclarationType,
    IrDeclarationVariable, IrExpression, IrExpressionKind, IrExpressionTypeRewriter,
    IrFieldTypeMatcher, IrIf, IrInvocation, IrLoop, IrLoopKind, IrModule, IrRewriter, IrStatement,
    IrStatementKind, IrType, IrTypeInitializer, OperatorTyper, ScopeId, ScopeTree,
    TemplateInstantiation,
};
use mj_span::Location;
use mj_symbol::{
    FunctionId, FunctionKind, GenericInstance, SymbolRef, SymbolTable, TypeId, TypeKind,
    VariableSymbol,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;
use tracing::{debug, trace};

/// Module after resolution
#[derive(Debug, Clone)]
pub struct ResolveOutput {
    pub module: Rc<IrModule>,
    /// Template instances created while binding forward calls and types
    pub instantiations: Vec<TemplateInstantiation>,
}

/// Fixes up everything the builder left for later.
///
/// Open type placeholders are forwarded to the type their name denotes in
/// the scope of the use, or reported as `TypeNotFound` once and replaced by
/// the unresolved sentinel. Calls to functions that were not declared yet
/// are bound the way the builder binds ordinary calls. Expressions typed
/// from such references are retyped, and variables whose type came from
/// one get a fresh symbol that replaces the old binding.
pub struct IrResolveSymbolsRewriter<'a> {
    symbols: &'a mut SymbolTable,
    scopes: &'a mut ScopeTree,
    diagnostics: &'a mut DiagnosticList,
    fold_constants: bool,
    /// Innermost last
    scope_stack: Vec<ScopeId>,
    /// Function whose body is visited and its return type, innermost last
    frames: Vec<(FunctionId, TypeId)>,
    /// Location of the innermost node visited, for diagnostics raised while
    /// rewriting bare type ids
    location: Location,
    reported: FxHashSet<TypeId>,
    rebound: FxHashMap<SymbolRef, SymbolRef>,
    instantiations: Vec<TemplateInstantiation>,
}

impl<'a> IrResolveSymbolsRewriter<'a> {
    pub fn new(symbols: &'a mut SymbolTable, scopes: &'a mut ScopeTree, diagnostics: &'a mut DiagnosticList) -> Self {
        Self {
            symbols,
            scopes,
            diagnostics,
            fold_constants: true,
            scope_stack: Vec::new(),
            frames: Vec::new(),
            location: Location::default(),
            reported: FxHashSet::default(),
            rebound: FxHashMap::default(),
            instantiations: Vec::new(),
        }
    }

    #[must_use]
    pub fn fold_constants(mut self, fold_constants: bool) -> Self {
        self.fold_constants = fold_constants;
        self
    }

    pub fn resolve(mut self, module: &Rc<IrModule>) -> ResolveOutput {
        let before = self.diagnostics.len();
        self.scope_stack.push(module.scope);
        let resolved = self.rewrite_module(module);
        self.scope_stack.pop();

        debug!(
            module = %module.name,
            changed = !Rc::ptr_eq(&resolved, module),
            rebound = self.rebound.len(),
            diagnostics = self.diagnostics.len() - before,
            "resolved forward references"
        );
        ResolveOutput {
            module: resolved,
            instantiations: self.instantiations,
        }
    }

    fn scope(&self) -> ScopeId {
        self.scope_stack
            .last()
            .copied()
            .unwrap_or_else(|| self.scopes.global())
    }

    fn report(&mut self, location: Location, kind: DiagnosticKind) {
        self.diagnostics.add(location, kind);
    }

    fn unresolved(&self) -> TypeId {
        self.symbols.builtins().unresolved()
    }

    fn is_unresolved(&self, ty: TypeId) -> bool {
        self.symbols.is_unresolved_type(ty)
    }

    /// True when `before` was built from something unresolved and `after`
    /// no longer is
    fn became_known(&self, before: TypeId, after: TypeId) -> bool {
        self.symbols.mentions_unresolved(before) && !self.is_unresolved(after)
    }

    fn resolve_type(&mut self, ty: TypeId) -> TypeId {
        let resolved = self.symbols.resolve_forward(ty);
        if resolved == self.unresolved() || !self.is_unresolved(resolved) {
            return resolved;
        }

        match self.symbols.ty(resolved).kind.clone() {
            TypeKind::Unresolved => self.resolve_placeholder(resolved),
            TypeKind::Instance(instance) => self.resolve_instance(&instance),
            TypeKind::Function(function) => {
                let parameters: Vec<TypeId> = function
                    .parameters
                    .iter()
                    .map(|parameter| self.resolve_type(*parameter))
                    .collect();
                let return_type = self.resolve_type(function.return_type);
                self.symbols.function_type(&parameters, return_type)
            }
            // declared types with unresolved fields are fixed where the
            // fields are declared
            _ => resolved,
        }
    }

    fn resolve_placeholder(&mut self, placeholder: TypeId) -> TypeId {
        let name = self.symbols.ty(placeholder).name.clone();
        match self.scopes.try_lookup::<TypeId>(self.scope(), &name) {
            Some(found) if found != placeholder && !self.symbols.is_open_placeholder(found) => {
                trace!(%name, "forwarded type placeholder");
                self.symbols.forward_placeholder(placeholder, found);
                found
            }
            _ => {
                if self.reported.insert(placeholder) {
                    self.report(
                        self.location,
                        DiagnosticKind::TypeNotFound {
                            name: name.full_original_name(),
                        },
                    );
                }
                self.unresolved()
            }
        }
    }

    /// `Definition<Arguments>` written before `Definition` was declared
    fn resolve_instance(&mut self, instance: &GenericInstance) -> TypeId {
        let definition = self.resolve_type(instance.definition);
        let arguments: Vec<TypeId> = instance
            .type_arguments
            .iter()
            .map(|argument| self.resolve_type(*argument))
            .collect();
        let unresolved = self.unresolved();
        if definition == unresolved || arguments.contains(&unresolved) {
            return unresolved;
        }

        let name = self.symbols.type_name(definition);
        let Some(declared) = self.symbols.ty(definition).as_declared() else {
            self.report(self.location, DiagnosticKind::NotATemplate { name });
            return unresolved;
        };
        let expected = declared.type_parameters.len();
        if expected != arguments.len() {
            self.report(
                self.location,
                DiagnosticKind::TypeArgumentCountMismatch {
                    name,
                    expected,
                    actual: arguments.len(),
                },
            );
            return unresolved;
        }

        let concrete = !arguments
            .iter()
            .any(|argument| self.symbols.contains_type_parameter(*argument));
        if concrete && self.symbols.is_template_type(definition) {
            if let Some((ty, created)) = instantiate_type(self.symbols, definition, &arguments) {
                if created {
                    self.instantiations.push(TemplateInstantiation {
                        location: self.location,
                        template: definition.into(),
                        instance: ty.into(),
                        type_arguments: arguments,
                        depth: 0,
                    });
                }
                return ty;
            }
        }
        self.symbols.generic_instance(definition, arguments)
    }

    fn resolve_invocation(&mut self, expression: &Rc<IrExpression>, invocation: &IrInvocation) -> Rc<IrExpression> {
        let location = expression.location;
        let name = self.symbols.function(invocation.function).name.clone();
        let candidates = self.scopes.lookup_functions(self.scope(), &name);
        let explicit: Vec<TypeId> = invocation
            .type_arguments
            .iter()
            .map(|argument| argument.ty)
            .collect();

        let bound = IrCallBinder::new(self.symbols, self.diagnostics).bind(
            location,
            &name,
            &candidates,
            &explicit,
            &invocation.arguments,
        );
        let Some(bound) = bound else {
            self.report(
                location,
                DiagnosticKind::FunctionNotFound {
                    name: name.full_original_name(),
                },
            );
            return Rc::clone(expression);
        };
        trace!(%name, "bound forward call");
        if let Some(instantiation) = bound.instantiation {
            self.instantiations.push(instantiation);
        }

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

    /// Retype an expression whose children were rewritten, when the
    /// children are known only now
    fn retype(&mut self, before: &Rc<IrExpression>, after: Rc<IrExpression>) -> Rc<IrExpression> {
        let location = after.location;
        match (&before.kind, &after.kind) {
            (_, IrExpressionKind::Invocation(invocation))
                if self.symbols.function(invocation.function).kind == FunctionKind::Unresolved =>
            {
                self.resolve_invocation(&after, invocation)
            }
            (_, IrExpressionKind::Reference(symbol)) if self.is_unresolved(after.ty) => {
                match self.symbols.type_of(*symbol) {
                    Some(ty) if !self.is_unresolved(ty) => Rc::new(IrExpression { ty, ..(*after).clone() }),
                    _ => after,
                }
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
            ) => {
                let was_open = self.symbols.mentions_unresolved(left_before.ty)
                    || self.symbols.mentions_unresolved(right_before.ty);
                if !was_open || self.is_unresolved(left.ty) || self.is_unresolved(right.ty) {
                    return after;
                }
                let typed = OperatorTyper::new(self.symbols, self.diagnostics)
                    .fold_constants(self.fold_constants)
                    .binary(location, Rc::clone(left), *operator, Rc::clone(right));
                Rc::new(typed)
            }
            (IrExpressionKind::Unary { operand: operand_before, .. }, IrExpressionKind::Unary { operator, operand })
                if self.became_known(operand_before.ty, operand.ty) =>
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
                IrExpressionKind::MemberAccess {
                    target,
                    member,
                    field: None,
                },
            ) if self.became_known(target_before.ty, target.ty) => {
                let (field, ty) = match find_field(self.symbols, target.ty, member) {
                    Some((field, ty)) => (Some(field), ty),
                    None => {
                        let type_name = self.symbols.type_name(target.ty);
                        self.report(
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
                if self.became_known(initializer_before.ty.ty, initializer.ty.ty) =>
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

    /// Commit a value that became known to the type it is stored in,
    /// reporting what cannot convert
    fn commit_value(&mut self, value: &Rc<IrExpression>, target: TypeId) -> Rc<IrExpression> {
        let committed = IrExpressionTypeRewriter::new(self.symbols, target).rewrite(value);
        if !is_implicitly_convertible(self.symbols, committed.ty, target) {
            let expected = self.symbols.type_name(target);
            let actual = self.symbols.type_name(committed.ty);
            self.report(value.location, DiagnosticKind::TypeMismatch { expected, actual });
        }
        committed
    }

    fn check_return(&mut self, location: Location, value: &Rc<IrExpression>) -> Rc<IrExpression> {
        let Some((function, return_type)) = self.frames.last().copied() else {
            return Rc::clone(value);
        };
        let committed = IrExpressionTypeRewriter::new(self.symbols, return_type).rewrite(value);
        if !is_implicitly_convertible(self.symbols, committed.ty, return_type) {
            let kind = DiagnosticKind::ReturnTypeMismatch {
                function: self.symbols.function(function).name.full_original_name(),
                expected: self.symbols.type_name(return_type),
                actual: self.symbols.type_name(committed.ty),
            };
            self.report(location, kind);
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

        match target {
            IrAssignmentTarget::Symbol(symbol) if self.became_known(value_before.ty, value.ty) => {
                let ty = self.symbols.type_of(*symbol)?;
                let value = self.commit_value(value, ty);
                Some(IrStatementKind::Assignment {
                    target: target.clone(),
                    value,
                })
            }
            IrAssignmentTarget::Field {
                target: object,
                member,
                field: None,
            } => {
                let IrAssignmentTarget::Field { target: object_before, .. } = target_before else {
                    return None;
                };
                if !self.became_known(object_before.ty, object.ty) {
                    return None;
                }
                let Some((field, ty)) = find_field(self.symbols, object.ty, member) else {
                    let type_name = self.symbols.type_name(object.ty);
                    self.report(
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

impl IrRewriter for IrResolveSymbolsRewriter<'_> {
    fn rewrite_function(&mut self, function: &Rc<IrDeclarationFunction>) -> Rc<IrDeclarationFunction> {
        self.scope_stack.push(function.scope);
        self.location = function.return_type.location;
        let return_type = self.resolve_type(function.return_type.ty);
        self.frames.push((function.symbol, return_type));
        let rewritten = walk_function(self, function);
        self.frames.pop();
        self.scope_stack.pop();
        rewritten
    }

    fn rewrite_type_declaration(&mut self, declaration: &Rc<IrDeclarationType>) -> Rc<IrDeclarationType> {
        self.scope_stack.push(declaration.scope);
        let rewritten = walk_type_declaration(self, declaration);
        self.scope_stack.pop();
        rewritten
    }

    fn rewrite_code_block(&mut self, block: &Rc<IrCodeBlock>) -> Rc<IrCodeBlock> {
        self.scope_stack.push(block.scope);
        let rewritten = walk_code_block(self, block);
        self.scope_stack.pop();
        rewritten
    }

    fn rewrite_variable_declaration(
        &mut self,
        declaration: &Rc<IrDeclarationVariable>,
    ) -> Rc<IrDeclarationVariable> {
        let rewritten = walk_variable_declaration(self, declaration);
        let Some(before) = declaration.initializer.as_ref() else {
            return rewritten;
        };
        let Some(initializer) = rewritten.initializer.clone() else {
            return rewritten;
        };
        if !self.became_known(before.ty, initializer.ty) {
            return rewritten;
        }

        if declaration.ty.ty != self.unresolved() {
            let initializer = self.commit_value(&initializer, rewritten.ty.ty);
            return Rc::new(IrDeclarationVariable {
                initializer: Some(initializer),
                ..(*rewritten).clone()
            });
        }

        // the type was taken from the initializer, which is known only now
        let ty = committed_type(self.symbols, initializer.ty);
        let initializer = IrExpressionTypeRewriter::new(self.symbols, ty).rewrite(&initializer);
        let name = self.symbols.variable(declaration.symbol).name.clone();
        let symbol = self.symbols.add_variable(VariableSymbol { name, ty });
        let old = SymbolRef::Variable(declaration.symbol);
        let scope = self.scope();
        self.scopes.replace(scope, old, symbol.into());
        self.rebound.insert(old, symbol.into());
        trace!(variable = %self.symbols.variable(symbol).name, ty = %self.symbols.type_name(ty), "rebound variable");

        Rc::new(IrDeclarationVariable {
            location: declaration.location,
            symbol,
            ty: IrType::new(rewritten.ty.location, ty),
            initializer: Some(initializer),
        })
    }

    fn rewrite_statement(&mut self, statement: &Rc<IrStatement>) -> Rc<IrStatement> {
        self.location = statement.location;
        let rewritten = walk_statement(self, statement);
        let kind = match (&statement.kind, &rewritten.kind) {
            (IrStatementKind::Return(Some(before)), IrStatementKind::Return(Some(value)))
                if self.became_known(before.ty, value.ty) =>
            {
                Some(IrStatementKind::Return(Some(self.check_return(statement.location, value))))
            }
            (before, IrStatementKind::Assignment { target, value }) => self.check_assignment(before, target, value),
            _ => None,
        };
        match kind {
            Some(kind) => Rc::new(IrStatement::new(statement.location, kind)),
            None => rewritten,
        }
    }

    fn rewrite_if(&mut self, branch: &Rc<IrIf>) -> Rc<IrIf> {
        let rewritten = walk_if(self, branch);
        let condition = &rewritten.condition;
        if self.became_known(branch.condition.ty, condition.ty) {
            let boolean = self.symbols.builtins().bool();
            if !self.symbols.same_type(condition.ty, boolean) {
                let actual = self.symbols.type_name(condition.ty);
                self.report(condition.location, DiagnosticKind::ConditionNotBoolean { actual });
            }
        }
        rewritten
    }

    fn rewrite_loop(&mut self, body: &Rc<IrLoop>) -> Rc<IrLoop> {
        let rewritten = walk_loop(self, body);
        let accepted = match (&body.kind, &rewritten.kind) {
            (IrLoopKind::While(before), IrLoopKind::While(condition)) if self.became_known(before.ty, condition.ty) => {
                let boolean = self.symbols.builtins().bool();
                Some((self.symbols.same_type(condition.ty, boolean), condition))
            }
            (IrLoopKind::Count(before), IrLoopKind::Count(count)) if self.became_known(before.ty, count.ty) => {
                Some((is_integer_type(self.symbols, count.ty), count))
            }
            _ => None,
        };
        if let Some((false, expression)) = accepted {
            let actual = self.symbols.type_name(expression.ty);
            self.report(expression.location, DiagnosticKind::LoopConditionType { actual });
        }
        rewritten
    }

    fn rewrite_expression(&mut self, expression: &Rc<IrExpression>) -> Rc<IrExpression> {
        self.location = expression.location;
        let rewritten = walk_expression(self, expression);
        self.location = expression.location;
        self.retype(expression, rewritten)
    }

    fn rewrite_type(&mut self, ty: IrType) -> IrType {
        self.location = ty.location;
        IrType {
            ty: self.resolve_type(ty.ty),
            ..ty
        }
    }

    fn rewrite_type_symbol(&mut self, ty: TypeId) -> TypeId {
        self.resolve_type(ty)
    }

    fn rewrite_symbol(&mut self, symbol: SymbolRef) -> SymbolRef {
        self.rebound.get(&symbol).copied().unwrap_or(symbol)
    }
}
