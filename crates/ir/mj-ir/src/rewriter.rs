//! Copy-on-write tree rewriting
//!
//! [`IrRewriter`] has one method per node kind. The defaults call the
//! matching `walk_*` function, which rewrites the children and rebuilds the
//! node only when a child came back as a different allocation or id. A pass
//! overrides the few methods it cares about and inherits identity for the
//! rest, so an untouched tree comes back as the very same [`Rc`].
//!
//! In [`RewriteMode::DeepCopy`] every node is rebuilt regardless, which is
//! what template instantiation needs: each instance owns its subtree.

use crate::node::{
    all_ptr_eq, IrArgument, IrAssignmentTarget, IrCodeBlock, IrDeclarationFunction,
    IrDeclarationType, IrDeclarationVariable, IrElse, IrEnumMember, IrExpression,
    IrExpressionKind, IrField, IrIf, IrInvocation, IrItem, IrLoop, IrLoopKind, IrModule,
    IrParameter, IrRule, IrStatement, IrStatementKind, IrType, IrTypeInitializer,
    IrTypeInitializerField, IrTypeParameter,
};
use mj_symbol::{SymbolId, SymbolRef, TypeId};
use std::rc::Rc;

/// Whether unchanged nodes are shared or copied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    CopyOnWrite,
    DeepCopy,
}

/// Tree rewriter with identity-preserving defaults
pub trait IrRewriter {
    fn mode(&self) -> RewriteMode {
        RewriteMode::CopyOnWrite
    }

    fn rewrite_module(&mut self, module: &Rc<IrModule>) -> Rc<IrModule> {
        walk_module(self, module)
    }

    fn rewrite_item(&mut self, item: &IrItem) -> IrItem {
        walk_item(self, item)
    }

    fn rewrite_function(&mut self, function: &Rc<IrDeclarationFunction>) -> Rc<IrDeclarationFunction> {
        walk_function(self, function)
    }

    fn rewrite_type_declaration(&mut self, declaration: &Rc<IrDeclarationType>) -> Rc<IrDeclarationType> {
        walk_type_declaration(self, declaration)
    }

    fn rewrite_variable_declaration(
        &mut self,
        declaration: &Rc<IrDeclarationVariable>,
    ) -> Rc<IrDeclarationVariable> {
        walk_variable_declaration(self, declaration)
    }

    fn rewrite_code_block(&mut self, block: &Rc<IrCodeBlock>) -> Rc<IrCodeBlock> {
        walk_code_block(self, block)
    }

    fn rewrite_statement(&mut self, statement: &Rc<IrStatement>) -> Rc<IrStatement> {
        walk_statement(self, statement)
    }

    fn rewrite_if(&mut self, branch: &Rc<IrIf>) -> Rc<IrIf> {
        walk_if(self, branch)
    }

    fn rewrite_loop(&mut self, body: &Rc<IrLoop>) -> Rc<IrLoop> {
        walk_loop(self, body)
    }

    fn rewrite_expression(&mut self, expression: &Rc<IrExpression>) -> Rc<IrExpression> {
        walk_expression(self, expression)
    }

    fn rewrite_type(&mut self, ty: IrType) -> IrType {
        IrType {
            ty: self.rewrite_type_symbol(ty.ty),
            ..ty
        }
    }

    /// Every type id stored in a node passes through here
    fn rewrite_type_symbol(&mut self, ty: TypeId) -> TypeId {
        ty
    }

    /// Symbol a declaration node introduces
    fn rewrite_declared_symbol(&mut self, symbol: SymbolRef) -> SymbolRef {
        symbol
    }

    /// Symbol referenced from an expression, invocation or assignment
    fn rewrite_symbol(&mut self, symbol: SymbolRef) -> SymbolRef {
        symbol
    }
}

/// Identity rewriter that copies every node
#[derive(Debug, Default, Clone, Copy)]
pub struct IrCopyRewriter;

impl IrRewriter for IrCopyRewriter {
    fn mode(&self) -> RewriteMode {
        RewriteMode::DeepCopy
    }
}

fn reuse<R: IrRewriter + ?Sized>(rewriter: &R, unchanged: bool) -> bool {
    unchanged && rewriter.mode() == RewriteMode::CopyOnWrite
}

/// Rewrite a reference, keeping the id kind. A hook that returns another
/// kind is ignored.
pub fn rewrite_symbol_as<R: IrRewriter + ?Sized, T: SymbolId>(rewriter: &mut R, id: T) -> T {
    T::from_ref(rewriter.rewrite_symbol(id.into())).unwrap_or(id)
}

/// Rewrite a declared symbol, keeping the id kind
pub fn rewrite_declared_as<R: IrRewriter + ?Sized, T: SymbolId>(rewriter: &mut R, id: T) -> T {
    T::from_ref(rewriter.rewrite_declared_symbol(id.into())).unwrap_or(id)
}

pub fn walk_module<R: IrRewriter + ?Sized>(rewriter: &mut R, module: &Rc<IrModule>) -> Rc<IrModule> {
    let items: Vec<IrItem> = module.items.iter().map(|item| rewriter.rewrite_item(item)).collect();
    let unchanged = items
        .iter()
        .zip(&module.items)
        .all(|(new, old)| new.ptr_eq(old));
    if reuse(rewriter, unchanged) {
        return Rc::clone(module);
    }
    Rc::new(IrModule {
        location: module.location,
        name: module.name.clone(),
        scope: module.scope,
        items,
    })
}

pub fn walk_item<R: IrRewriter + ?Sized>(rewriter: &mut R, item: &IrItem) -> IrItem {
    match item {
        IrItem::Function(function) => IrItem::Function(rewriter.rewrite_function(function)),
        IrItem::Type(declaration) => IrItem::Type(rewriter.rewrite_type_declaration(declaration)),
        IrItem::Statement(statement) => IrItem::Statement(rewriter.rewrite_statement(statement)),
    }
}

pub fn walk_function<R: IrRewriter + ?Sized>(
    rewriter: &mut R,
    function: &Rc<IrDeclarationFunction>,
) -> Rc<IrDeclarationFunction> {
    let symbol = rewrite_declared_as(rewriter, function.symbol);
    let type_parameters = walk_type_parameters(rewriter, &function.type_parameters);
    let parameters: Vec<IrParameter> = function
        .parameters
        .iter()
        .map(|parameter| IrParameter {
            location: parameter.location,
            symbol: rewrite_declared_as(rewriter, parameter.symbol),
            ty: rewriter.rewrite_type(parameter.ty),
        })
        .collect();
    let return_type = rewriter.rewrite_type(function.return_type);
    let body = rewriter.rewrite_code_block(&function.body);

    let unchanged = symbol == function.symbol
        && type_parameters == function.type_parameters
        && parameters == function.parameters
        && return_type == function.return_type
        && Rc::ptr_eq(&body, &function.body);
    if reuse(rewriter, unchanged) {
        return Rc::clone(function);
    }
    Rc::new(IrDeclarationFunction {
        location: function.location,
        symbol,
        scope: function.scope,
        type_parameters,
        parameters,
        return_type,
        body,
    })
}

fn walk_type_parameters<R: IrRewriter + ?Sized>(
    rewriter: &mut R,
    parameters: &[IrTypeParameter],
) -> Vec<IrTypeParameter> {
    parameters
        .iter()
        .map(|parameter| IrTypeParameter {
            location: parameter.location,
            ty: rewriter.rewrite_type_symbol(parameter.ty),
        })
        .collect()
}

pub fn walk_type_declaration<R: IrRewriter + ?Sized>(
    rewriter: &mut R,
    declaration: &Rc<IrDeclarationType>,
) -> Rc<IrDeclarationType> {
    let symbol = rewrite_declared_as(rewriter, declaration.symbol);
    let type_parameters = walk_type_parameters(rewriter, &declaration.type_parameters);
    let base_type = declaration.base_type.map(|base| rewriter.rewrite_type(base));

    let mut unchanged = symbol == declaration.symbol
        && type_parameters == declaration.type_parameters
        && base_type == declaration.base_type;

    let enums: Vec<IrEnumMember> = declaration
        .enums
        .iter()
        .map(|member| {
            let symbol = rewrite_declared_as(rewriter, member.symbol);
            let value = member.value.as_ref().map(|value| rewriter.rewrite_expression(value));
            unchanged &= symbol == member.symbol && option_ptr_eq(&value, &member.value);
            IrEnumMember {
                location: member.location,
                symbol,
                value,
            }
        })
        .collect();
    let fields: Vec<IrField> = declaration
        .fields
        .iter()
        .map(|field| IrField {
            location: field.location,
            symbol: rewrite_declared_as(rewriter, field.symbol),
            ty: rewriter.rewrite_type(field.ty),
        })
        .collect();
    let rules: Vec<IrRule> = declaration
        .rules
        .iter()
        .map(|rule| {
            let symbol = rewrite_declared_as(rewriter, rule.symbol);
            let arguments = walk_expressions(rewriter, &rule.arguments);
            unchanged &= symbol == rule.symbol && all_ptr_eq(&arguments, &rule.arguments);
            IrRule {
                location: rule.location,
                symbol,
                arguments,
            }
        })
        .collect();

    if reuse(rewriter, unchanged && fields == declaration.fields) {
        return Rc::clone(declaration);
    }
    Rc::new(IrDeclarationType {
        location: declaration.location,
        symbol,
        scope: declaration.scope,
        type_parameters,
        base_type,
        enums,
        fields,
        rules,
    })
}

pub fn walk_variable_declaration<R: IrRewriter + ?Sized>(
    rewriter: &mut R,
    declaration: &Rc<IrDeclarationVariable>,
) -> Rc<IrDeclarationVariable> {
    let ty = rewriter.rewrite_type(declaration.ty);
    let initializer = declaration
        .initializer
        .as_ref()
        .map(|initializer| rewriter.rewrite_expression(initializer));
    let symbol = rewrite_declared_as(rewriter, declaration.symbol);

    let unchanged = symbol == declaration.symbol
        && ty == declaration.ty
        && option_ptr_eq(&initializer, &declaration.initializer);
    if reuse(rewriter, unchanged) {
        return Rc::clone(declaration);
    }
    Rc::new(IrDeclarationVariable {
        location: declaration.location,
        symbol,
        ty,
        initializer,
    })
}

pub fn walk_code_block<R: IrRewriter + ?Sized>(rewriter: &mut R, block: &Rc<IrCodeBlock>) -> Rc<IrCodeBlock> {
    let statements: Vec<Rc<IrStatement>> = block
        .statements
        .iter()
        .map(|statement| rewriter.rewrite_statement(statement))
        .collect();
    if reuse(rewriter, all_ptr_eq(&statements, &block.statements)) {
        return Rc::clone(block);
    }
    Rc::new(IrCodeBlock {
        location: block.location,
        scope: block.scope,
        statements,
    })
}

pub fn walk_statement<R: IrRewriter + ?Sized>(rewriter: &mut R, statement: &Rc<IrStatement>) -> Rc<IrStatement> {
    let (kind, unchanged) = match &statement.kind {
        IrStatementKind::VariableDeclaration(declaration) => {
            let new = rewriter.rewrite_variable_declaration(declaration);
            let unchanged = Rc::ptr_eq(&new, declaration);
            (IrStatementKind::VariableDeclaration(new), unchanged)
        }
        IrStatementKind::Assignment { target, value } => {
            let (new_target, target_unchanged) = walk_assignment_target(rewriter, target);
            let new_value = rewriter.rewrite_expression(value);
            let unchanged = target_unchanged && Rc::ptr_eq(&new_value, value);
            (
                IrStatementKind::Assignment {
                    target: new_target,
                    value: new_value,
                },
                unchanged,
            )
        }
        IrStatementKind::Expression(expression) => {
            let new = rewriter.rewrite_expression(expression);
            let unchanged = Rc::ptr_eq(&new, expression);
            (IrStatementKind::Expression(new), unchanged)
        }
        IrStatementKind::Return(value) => {
            let new = value.as_ref().map(|value| rewriter.rewrite_expression(value));
            let unchanged = option_ptr_eq(&new, value);
            (IrStatementKind::Return(new), unchanged)
        }
        IrStatementKind::If(branch) => {
            let new = rewriter.rewrite_if(branch);
            let unchanged = Rc::ptr_eq(&new, branch);
            (IrStatementKind::If(new), unchanged)
        }
        IrStatementKind::Loop(body) => {
            let new = rewriter.rewrite_loop(body);
            let unchanged = Rc::ptr_eq(&new, body);
            (IrStatementKind::Loop(new), unchanged)
        }
    };
    if reuse(rewriter, unchanged) {
        return Rc::clone(statement);
    }
    Rc::new(IrStatement::new(statement.location, kind))
}

fn walk_assignment_target<R: IrRewriter + ?Sized>(
    rewriter: &mut R,
    target: &IrAssignmentTarget,
) -> (IrAssignmentTarget, bool) {
    match target {
        IrAssignmentTarget::Symbol(symbol) => {
            let new = rewriter.rewrite_symbol(*symbol);
            (IrAssignmentTarget::Symbol(new), new == *symbol)
        }
        IrAssignmentTarget::Field {
            target,
            member,
            field,
        } => {
            let new_target = rewriter.rewrite_expression(target);
            let new_field = field.map(|field| rewrite_symbol_as(rewriter, field));
            let unchanged = Rc::ptr_eq(&new_target, target) && new_field == *field;
            (
                IrAssignmentTarget::Field {
                    target: new_target,
                    member: member.clone(),
                    field: new_field,
                },
                unchanged,
            )
        }
        IrAssignmentTarget::Discard => (IrAssignmentTarget::Discard, true),
    }
}

pub fn walk_if<R: IrRewriter + ?Sized>(rewriter: &mut R, branch: &Rc<IrIf>) -> Rc<IrIf> {
    let condition = rewriter.rewrite_expression(&branch.condition);
    let then_block = rewriter.rewrite_code_block(&branch.then_block);
    let (else_branch, else_unchanged) = match &branch.else_branch {
        Some(IrElse::If(nested)) => {
            let new = rewriter.rewrite_if(nested);
            let unchanged = Rc::ptr_eq(&new, nested);
            (Some(IrElse::If(new)), unchanged)
        }
        Some(IrElse::Block(block)) => {
            let new = rewriter.rewrite_code_block(block);
            let unchanged = Rc::ptr_eq(&new, block);
            (Some(IrElse::Block(new)), unchanged)
        }
        None => (None, true),
    };

    let unchanged = else_unchanged
        && Rc::ptr_eq(&condition, &branch.condition)
        && Rc::ptr_eq(&then_block, &branch.then_block);
    if reuse(rewriter, unchanged) {
        return Rc::clone(branch);
    }
    Rc::new(IrIf {
        location: branch.location,
        condition,
        then_block,
        else_branch,
    })
}

pub fn walk_loop<R: IrRewriter + ?Sized>(rewriter: &mut R, body: &Rc<IrLoop>) -> Rc<IrLoop> {
    let (kind, kind_unchanged) = match &body.kind {
        IrLoopKind::Infinite => (IrLoopKind::Infinite, true),
        IrLoopKind::While(condition) => {
            let new = rewriter.rewrite_expression(condition);
            let unchanged = Rc::ptr_eq(&new, condition);
            (IrLoopKind::While(new), unchanged)
        }
        IrLoopKind::Count(count) => {
            let new = rewriter.rewrite_expression(count);
            let unchanged = Rc::ptr_eq(&new, count);
            (IrLoopKind::Count(new), unchanged)
        }
    };
    let block = rewriter.rewrite_code_block(&body.body);

    if reuse(rewriter, kind_unchanged && Rc::ptr_eq(&block, &body.body)) {
        return Rc::clone(body);
    }
    Rc::new(IrLoop {
        location: body.location,
        kind,
        body: block,
    })
}

pub fn walk_expression<R: IrRewriter + ?Sized>(
    rewriter: &mut R,
    expression: &Rc<IrExpression>,
) -> Rc<IrExpression> {
    let ty = rewriter.rewrite_type_symbol(expression.ty);
    let (kind, kind_unchanged) = match &expression.kind {
        IrExpressionKind::Literal(value) => (IrExpressionKind::Literal(value.clone()), true),
        IrExpressionKind::Reference(symbol) => {
            let new = rewriter.rewrite_symbol(*symbol);
            (IrExpressionKind::Reference(new), new == *symbol)
        }
        IrExpressionKind::Invocation(invocation) => {
            let (new, unchanged) = walk_invocation(rewriter, invocation);
            (IrExpressionKind::Invocation(new), unchanged)
        }
        IrExpressionKind::TypeInitializer(initializer) => {
            let (new, unchanged) = walk_type_initializer(rewriter, initializer);
            (IrExpressionKind::TypeInitializer(new), unchanged)
        }
        IrExpressionKind::Binary {
            left,
            operator,
            right,
        } => {
            let new_left = rewriter.rewrite_expression(left);
            let new_right = rewriter.rewrite_expression(right);
            let unchanged = Rc::ptr_eq(&new_left, left) && Rc::ptr_eq(&new_right, right);
            (
                IrExpressionKind::Binary {
                    left: new_left,
                    operator: *operator,
                    right: new_right,
                },
                unchanged,
            )
        }
        IrExpressionKind::Unary { operator, operand } => {
            let new = rewriter.rewrite_expression(operand);
            let unchanged = Rc::ptr_eq(&new, operand);
            (
                IrExpressionKind::Unary {
                    operator: *operator,
                    operand: new,
                },
                unchanged,
            )
        }
        IrExpressionKind::MemberAccess {
            target,
            member,
            field,
        } => {
            let new_target = rewriter.rewrite_expression(target);
            let new_field = field.map(|field| rewrite_symbol_as(rewriter, field));
            let unchanged = Rc::ptr_eq(&new_target, target) && new_field == *field;
            (
                IrExpressionKind::MemberAccess {
                    target: new_target,
                    member: member.clone(),
                    field: new_field,
                },
                unchanged,
            )
        }
    };

    if reuse(rewriter, kind_unchanged && ty == expression.ty) {
        return Rc::clone(expression);
    }
    Rc::new(IrExpression {
        location: expression.location,
        ty,
        constant: expression.constant.clone(),
        kind,
    })
}

/// Rewrite the parts of an invocation; the flag is true when nothing changed
pub fn walk_invocation<R: IrRewriter + ?Sized>(
    rewriter: &mut R,
    invocation: &IrInvocation,
) -> (IrInvocation, bool) {
    let function = rewrite_symbol_as(rewriter, invocation.function);
    let type_arguments: Vec<IrType> = invocation
        .type_arguments
        .iter()
        .map(|argument| rewriter.rewrite_type(*argument))
        .collect();
    let mut unchanged = function == invocation.function && type_arguments == invocation.type_arguments;

    let arguments: Vec<IrArgument> = invocation
        .arguments
        .iter()
        .map(|argument| {
            let expression = rewriter.rewrite_expression(&argument.expression);
            let parameter = argument
                .parameter
                .map(|parameter| rewrite_symbol_as(rewriter, parameter));
            unchanged &= Rc::ptr_eq(&expression, &argument.expression) && parameter == argument.parameter;
            IrArgument {
                location: argument.location,
                name: argument.name.clone(),
                parameter,
                expression,
            }
        })
        .collect();

    (
        IrInvocation {
            function,
            type_arguments,
            arguments,
        },
        unchanged,
    )
}

fn walk_type_initializer<R: IrRewriter + ?Sized>(
    rewriter: &mut R,
    initializer: &IrTypeInitializer,
) -> (IrTypeInitializer, bool) {
    let ty = rewriter.rewrite_type(initializer.ty);
    let mut unchanged = ty == initializer.ty;
    let fields: Vec<IrTypeInitializerField> = initializer
        .fields
        .iter()
        .map(|field| {
            let expression = rewriter.rewrite_expression(&field.expression);
            let symbol = field.field.map(|symbol| rewrite_symbol_as(rewriter, symbol));
            unchanged &= Rc::ptr_eq(&expression, &field.expression) && symbol == field.field;
            IrTypeInitializerField {
                location: field.location,
                name: field.name.clone(),
                field: symbol,
                expression,
            }
        })
        .collect();
    (IrTypeInitializer { ty, fields }, unchanged)
}

fn walk_expressions<R: IrRewriter + ?Sized>(
    rewriter: &mut R,
    expressions: &[Rc<IrExpression>],
) -> Vec<Rc<IrExpression>> {
    expressions
        .iter()
        .map(|expression| rewriter.rewrite_expression(expression))
        .collect()
}

fn option_ptr_eq<T>(first: &Option<Rc<T>>, second: &Option<Rc<T>>) -> bool {
    match (first, second) {
        (Some(first), Some(second)) => Rc::ptr_eq(first, second),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeTree;
    use mj_span::Location;
    use mj_symbol::{ConstantValue, PrimitiveType, SymbolTable};
    use mj_syntax::BinaryOperator;

    fn literal(ty: TypeId, value: i128) -> Rc<IrExpression> {
        Rc::new(IrExpression::literal(
            Location::default(),
            ty,
            ConstantValue::Integer(value),
        ))
    }

    fn sample_block(symbols: &SymbolTable) -> Rc<IrCodeBlock> {
        let i64 = symbols.builtins().i64();
        let sum = Rc::new(IrExpression::new(
            Location::default(),
            i64,
            IrExpressionKind::Binary {
                left: literal(i64, 1),
                operator: BinaryOperator::Add,
                right: literal(i64, 2),
            },
        ));
        let statements = vec![
            Rc::new(IrStatement::new(
                Location::default(),
                IrStatementKind::Expression(sum),
            )),
            Rc::new(IrStatement::new(
                Location::default(),
                IrStatementKind::Return(Some(literal(i64, 3))),
            )),
        ];
        Rc::new(IrCodeBlock {
            location: Location::default(),
            scope: ScopeTree::new().global(),
            statements,
        })
    }

    struct Identity;

    impl IrRewriter for Identity {}

    /// Retypes every `I64` literal of value 2 as `U8`
    struct RetypeTwo {
        from: TypeId,
        to: TypeId,
    }

    impl IrRewriter for RetypeTwo {
        fn rewrite_expression(&mut self, expression: &Rc<IrExpression>) -> Rc<IrExpression> {
            if expression.ty == self.from && expression.constant == Some(ConstantValue::Integer(2)) {
                return Rc::new(IrExpression {
                    ty: self.to,
                    ..(**expression).clone()
                });
            }
            walk_expression(self, expression)
        }
    }

    #[test]
    fn test_identity_returns_same_allocation() {
        let symbols = SymbolTable::new();
        let block = sample_block(&symbols);
        let rewritten = Identity.rewrite_code_block(&block);
        assert!(Rc::ptr_eq(&block, &rewritten));
    }

    #[test]
    fn test_deep_copy_reallocates() {
        let symbols = SymbolTable::new();
        let block = sample_block(&symbols);
        let copied = IrCopyRewriter.rewrite_code_block(&block);

        assert!(!Rc::ptr_eq(&block, &copied));
        assert!(!Rc::ptr_eq(&block.statements[1], &copied.statements[1]));
        assert_eq!(copied.statements.len(), 2);
    }

    #[test]
    fn test_change_rebuilds_only_the_path() {
        let symbols = SymbolTable::new();
        let block = sample_block(&symbols);
        let mut rewriter = RetypeTwo {
            from: symbols.builtins().i64(),
            to: symbols.builtins().get(PrimitiveType::U8),
        };
        let rewritten = rewriter.rewrite_code_block(&block);

        assert!(!Rc::ptr_eq(&block, &rewritten));
        assert!(!Rc::ptr_eq(&block.statements[0], &rewritten.statements[0]));
        assert!(Rc::ptr_eq(&block.statements[1], &rewritten.statements[1]));

        let IrStatementKind::Expression(sum) = &rewritten.statements[0].kind else {
            panic!("expected an expression statement");
        };
        let IrExpressionKind::Binary { left, right, .. } = &sum.kind else {
            panic!("expected a binary expression");
        };
        let IrStatementKind::Expression(original) = &block.statements[0].kind else {
            panic!("expected an expression statement");
        };
        let IrExpressionKind::Binary { left: original_left, .. } = &original.kind else {
            panic!("expected a binary expression");
        };
        assert!(Rc::ptr_eq(left, original_left));
        assert_eq!(right.ty, symbols.builtins().get(PrimitiveType::U8));
    }
}
