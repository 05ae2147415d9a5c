//! Statements and code blocks

use crate::context::{symbol_name, BuildContext};
use crate::declaration::{build_variable, commit};
use crate::expression::{build_expression, build_value, undeclared};
use crate::BuildError;
use mj_diagnostics::DiagnosticKind;
use mj_ir::inference::committed_type;
use mj_ir::matcher::find_field;
use mj_ir::overload::is_implicitly_convertible;
use mj_ir::typing::is_integer_type;
use mj_ir::{
    IrAssignmentTarget, IrCodeBlock, IrElse, IrExpression, IrExpressionTypeRewriter, IrIf, IrLoop,
    IrLoopKind, IrStatement, IrStatementKind, ScopeId, ScopeKind,
};
use mj_span::Location;
use mj_symbol::{FunctionId, ParameterId, SymbolName, SymbolRef, TypeId, VariableId};
use mj_syntax::{
    AssignmentSyntax, CodeBlockSyntax, ElseSyntax, ExpressionKind, IfSyntax, LoopKindSyntax,
    LoopSyntax, ReturnSyntax, StatementSyntax,
};
use std::rc::Rc;

pub(crate) fn build_code_block(
    ctx: &mut BuildContext<'_>,
    parent: ScopeId,
    syntax: &CodeBlockSyntax,
) -> Result<Rc<IrCodeBlock>, BuildError> {
    let scope = ctx.push_scope(parent, ScopeKind::CodeBlock);
    let statements = syntax
        .statements
        .iter()
        .map(|statement| build_statement(ctx, scope, statement))
        .collect::<Result<Vec<_>, _>>()?;
    ctx.pop_scope(scope);

    Ok(Rc::new(IrCodeBlock {
        location: syntax.location,
        scope,
        statements,
    }))
}

pub(crate) fn build_statement(
    ctx: &mut BuildContext<'_>,
    scope: ScopeId,
    syntax: &StatementSyntax,
) -> Result<Rc<IrStatement>, BuildError> {
    let kind = match syntax {
        StatementSyntax::Variable(variable) => {
            IrStatementKind::VariableDeclaration(build_variable(ctx, scope, variable)?)
        }
        StatementSyntax::Assignment(assignment) => build_assignment(ctx, scope, assignment)?,
        StatementSyntax::Expression(expression) => {
            IrStatementKind::Expression(build_expression(ctx, scope, expression)?)
        }
        StatementSyntax::Return(ret) => build_return(ctx, scope, ret)?,
        StatementSyntax::If(branch) => IrStatementKind::If(build_if(ctx, scope, branch)?),
        StatementSyntax::Loop(body) => IrStatementKind::Loop(build_loop(ctx, scope, body)?),
    };
    Ok(Rc::new(IrStatement::new(syntax.location(), kind)))
}

fn build_assignment(
    ctx: &mut BuildContext<'_>,
    scope: ScopeId,
    syntax: &AssignmentSyntax,
) -> Result<IrStatementKind, BuildError> {
    if syntax.target.is_discard() {
        let value = build_expression(ctx, scope, &syntax.value)?;
        if !value.is_invocation() {
            ctx.report(syntax.value.location, DiagnosticKind::DiscardOnlyInvocation);
        }
        return Ok(IrStatementKind::Assignment {
            target: IrAssignmentTarget::Discard,
            value,
        });
    }

    let value = build_value(ctx, scope, &syntax.value)?;
    let (target, target_type) = match &syntax.target.kind {
        ExpressionKind::Identifier(name) => {
            let name = symbol_name(name);
            match lookup_assignable(ctx, scope, &name) {
                Some(symbol) => (IrAssignmentTarget::Symbol(symbol), ctx.symbols.type_of(symbol)),
                None => {
                    undeclared(ctx, syntax.target.location, &name);
                    (IrAssignmentTarget::Discard, None)
                }
            }
        }
        ExpressionKind::MemberAccess { target, member } => {
            let target = build_value(ctx, scope, target)?;
            let member = SymbolName::new(&member.text);
            let found = if ctx.symbols.is_unresolved_type(target.ty) {
                None
            } else {
                let found = find_field(&mut ctx.symbols, target.ty, &member);
                if found.is_none() {
                    let type_name = ctx.symbols.type_name(target.ty);
                    ctx.report(
                        syntax.target.location,
                        DiagnosticKind::FieldNotFoundOnType {
                            field: member.full_original_name(),
                            type_name,
                        },
                    );
                }
                found
            };
            (
                IrAssignmentTarget::Field {
                    target,
                    member,
                    field: found.map(|(field, _)| field),
                },
                found.map(|(_, ty)| ty),
            )
        }
        _ => {
            return Err(BuildError::unsupported("assignment target", syntax.target.location));
        }
    };

    let value = match target_type {
        Some(ty) => commit(ctx, ty, &value, syntax.value.location),
        None => value,
    };
    Ok(IrStatementKind::Assignment { target, value })
}

/// A variable, else a parameter visible from `scope`
fn lookup_assignable(ctx: &BuildContext<'_>, scope: ScopeId, name: &SymbolName) -> Option<SymbolRef> {
    ctx.scopes
        .try_lookup::<VariableId>(scope, name)
        .map(SymbolRef::Variable)
        .or_else(|| ctx.scopes.try_lookup::<ParameterId>(scope, name).map(SymbolRef::Parameter))
}

fn build_return(
    ctx: &mut BuildContext<'_>,
    scope: ScopeId,
    syntax: &ReturnSyntax,
) -> Result<IrStatementKind, BuildError> {
    let value = syntax
        .value
        .as_ref()
        .map(|value| build_value(ctx, scope, value))
        .transpose()?;
    let Some(frame) = ctx.frame() else {
        return Ok(IrStatementKind::Return(value));
    };

    let void = ctx.symbols.builtins().void();
    let expects_value = !ctx.symbols.same_type(frame.return_type, void);
    let value = match value {
        Some(value) if expects_value => {
            let committed = IrExpressionTypeRewriter::new(&ctx.symbols, frame.return_type).rewrite(&value);
            if !is_implicitly_convertible(&ctx.symbols, committed.ty, frame.return_type) {
                return_mismatch(ctx, syntax, frame.function, frame.return_type, committed.ty);
            }
            Some(committed)
        }
        Some(value) => {
            return_mismatch(ctx, syntax, frame.function, frame.return_type, value.ty);
            Some(value)
        }
        None if expects_value => {
            return_mismatch(ctx, syntax, frame.function, frame.return_type, void);
            None
        }
        None => None,
    };
    Ok(IrStatementKind::Return(value))
}

fn return_mismatch(
    ctx: &mut BuildContext<'_>,
    syntax: &ReturnSyntax,
    function: FunctionId,
    expected: TypeId,
    actual: TypeId,
) {
    let kind = DiagnosticKind::ReturnTypeMismatch {
        function: ctx.symbols.function(function).name.full_original_name(),
        expected: ctx.symbols.type_name(expected),
        actual: ctx.symbols.type_name(actual),
    };
    ctx.report(syntax.location, kind);
}

fn build_if(ctx: &mut BuildContext<'_>, scope: ScopeId, syntax: &IfSyntax) -> Result<Rc<IrIf>, BuildError> {
    let condition = build_value(ctx, scope, &syntax.condition)?;
    let boolean = ctx.symbols.builtins().bool();
    if !ctx.symbols.same_type(condition.ty, boolean) && !ctx.symbols.is_unresolved_type(condition.ty) {
        let actual = ctx.symbols.type_name(condition.ty);
        ctx.report(syntax.condition.location, DiagnosticKind::ConditionNotBoolean { actual });
    }

    let then_block = build_code_block(ctx, scope, &syntax.then_block)?;
    let else_branch = match &syntax.else_branch {
        Some(ElseSyntax::If(nested)) => Some(IrElse::If(build_if(ctx, scope, nested)?)),
        Some(ElseSyntax::Block(block)) => Some(IrElse::Block(build_code_block(ctx, scope, block)?)),
        None => None,
    };

    Ok(Rc::new(IrIf {
        location: syntax.location,
        condition,
        then_block,
        else_branch,
    }))
}

fn build_loop(ctx: &mut BuildContext<'_>, scope: ScopeId, syntax: &LoopSyntax) -> Result<Rc<IrLoop>, BuildError> {
    let kind = match &syntax.kind {
        LoopKindSyntax::Infinite => IrLoopKind::Infinite,
        LoopKindSyntax::While(condition) => {
            let built = build_value(ctx, scope, condition)?;
            let boolean = ctx.symbols.builtins().bool();
            if !ctx.symbols.same_type(built.ty, boolean) {
                loop_mismatch(ctx, condition.location, &built);
            }
            IrLoopKind::While(built)
        }
        LoopKindSyntax::Count(count) => {
            let built = build_value(ctx, scope, count)?;
            if !is_integer_type(&ctx.symbols, built.ty) {
                loop_mismatch(ctx, count.location, &built);
            }
            let target = committed_type(&ctx.symbols, built.ty);
            IrLoopKind::Count(IrExpressionTypeRewriter::new(&ctx.symbols, target).rewrite(&built))
        }
    };
    let body = build_code_block(ctx, scope, &syntax.body)?;

    Ok(Rc::new(IrLoop {
        location: syntax.location,
        kind,
        body,
    }))
}

fn loop_mismatch(ctx: &mut BuildContext<'_>, location: Location, expression: &IrExpression) {
    if ctx.symbols.is_unresolved_type(expression.ty) {
        return;
    }
    let actual = ctx.symbols.type_name(expression.ty);
    ctx.report(location, DiagnosticKind::LoopConditionType { actual });
}
