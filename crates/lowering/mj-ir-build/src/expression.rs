//! Expressions, invocations and type initializers

use crate::context::{symbol_name, BuildContext};
use crate::types::build_type_reference;
use crate::BuildError;
use mj_diagnostics::DiagnosticKind;
use mj_ir::inference::parse_number;
use mj_ir::matcher::find_field;
use mj_ir::typing::literal;
use mj_ir::{
    IrArgument, IrCallBinder, IrExpression, IrExpressionKind, IrFieldTypeMatcher, IrInvocation,
    IrType, IrTypeInitializer, IrTypeInitializerField, OperatorTyper, ScopeId,
};
use mj_span::Location;
use mj_symbol::{
    ConstantValue, EnumId, FunctionId, FunctionKind, FunctionSymbol, ParameterId, SymbolName,
    SymbolRef, TypeId, VariableId,
};
use mj_syntax::{ArgumentSyntax, ExpressionKind, ExpressionSyntax, FieldInitializerSyntax, QualifiedName, TypeSyntax};
use std::rc::Rc;
use tracing::trace;

pub(crate) fn build_expression(
    ctx: &mut BuildContext<'_>,
    scope: ScopeId,
    syntax: &ExpressionSyntax,
) -> Result<Rc<IrExpression>, BuildError> {
    let location = syntax.location;
    let expression = match &syntax.kind {
        ExpressionKind::Number(text) => {
            let value =
                parse_number(text).ok_or_else(|| BuildError::unsupported(format!("number literal '{text}'"), location))?;
            literal(&mut ctx.symbols, location, value)
        }
        ExpressionKind::String(text) => literal(&mut ctx.symbols, location, ConstantValue::Str(text.clone())),
        ExpressionKind::Bool(value) => literal(&mut ctx.symbols, location, ConstantValue::Bool(*value)),
        ExpressionKind::Identifier(name) => build_reference(ctx, scope, location, name),
        ExpressionKind::Invocation {
            target,
            type_arguments,
            arguments,
        } => build_invocation(ctx, scope, location, target, type_arguments, arguments)?,
        ExpressionKind::TypeInitializer { ty, fields } => build_initializer(ctx, scope, location, ty, fields)?,
        ExpressionKind::Binary {
            left,
            operator,
            right,
        } => {
            let left = build_value(ctx, scope, left)?;
            let right = build_value(ctx, scope, right)?;
            OperatorTyper::new(&mut ctx.symbols, &mut ctx.diagnostics)
                .fold_constants(ctx.options.fold_constants)
                .binary(location, left, *operator, right)
        }
        ExpressionKind::Unary { operator, operand } => {
            let operand = build_value(ctx, scope, operand)?;
            OperatorTyper::new(&mut ctx.symbols, &mut ctx.diagnostics)
                .fold_constants(ctx.options.fold_constants)
                .unary(location, *operator, operand)
        }
        ExpressionKind::MemberAccess { target, member } => {
            if let Some(expression) = build_enum_access(ctx, scope, location, target, &member.text) {
                expression
            } else {
                let target = build_value(ctx, scope, target)?;
                build_member_access(ctx, location, target, SymbolName::new(&member.text))
            }
        }
        ExpressionKind::Parenthesized(inner) => return build_expression(ctx, scope, inner),
    };
    Ok(Rc::new(expression))
}

/// An expression used as a value; a call to a function without a result
/// reports `VoidValueUsed`
pub(crate) fn build_value(
    ctx: &mut BuildContext<'_>,
    scope: ScopeId,
    syntax: &ExpressionSyntax,
) -> Result<Rc<IrExpression>, BuildError> {
    let expression = build_expression(ctx, scope, syntax)?;
    if let Some(invocation) = expression.as_invocation() {
        let void = ctx.symbols.builtins().void();
        if ctx.symbols.same_type(expression.ty, void) {
            let name = ctx.symbols.function(invocation.function).name.full_original_name();
            ctx.report(syntax.location, DiagnosticKind::VoidValueUsed { name });
        }
    }
    Ok(expression)
}

pub(crate) fn undeclared(ctx: &mut BuildContext<'_>, location: Location, name: &SymbolName) {
    ctx.report(
        location,
        DiagnosticKind::UndeclaredVariable {
            name: name.full_original_name(),
        },
    );
}

/// Unresolved-typed stand-in for a name that could not be found
fn unresolved_reference(ctx: &BuildContext<'_>, location: Location) -> IrExpression {
    let unresolved = ctx.symbols.builtins().unresolved();
    IrExpression::new(location, unresolved, IrExpressionKind::Reference(SymbolRef::Type(unresolved)))
}

/// Variable, parameter or enum member
fn build_reference(ctx: &mut BuildContext<'_>, scope: ScopeId, location: Location, name: &QualifiedName) -> IrExpression {
    let name = symbol_name(name);
    let found = ctx
        .scopes
        .try_lookup::<VariableId>(scope, &name)
        .map(SymbolRef::Variable)
        .or_else(|| ctx.scopes.try_lookup::<ParameterId>(scope, &name).map(SymbolRef::Parameter))
        .or_else(|| ctx.scopes.try_lookup::<EnumId>(scope, &name).map(SymbolRef::Enum));

    match found {
        Some(symbol) => reference(ctx, location, symbol),
        None => {
            undeclared(ctx, location, &name);
            unresolved_reference(ctx, location)
        }
    }
}

fn reference(ctx: &BuildContext<'_>, location: Location, symbol: SymbolRef) -> IrExpression {
    let ty = ctx
        .symbols
        .type_of(symbol)
        .unwrap_or_else(|| ctx.symbols.builtins().unresolved());
    let constant = match symbol {
        SymbolRef::Enum(id) => Some(ctx.symbols.enum_member(id).value.clone()),
        _ => None,
    };
    IrExpression::new(location, ty, IrExpressionKind::Reference(symbol)).with_constant(constant)
}

/// `Color.Red` written as a member access on a type name
fn build_enum_access(
    ctx: &mut BuildContext<'_>,
    scope: ScopeId,
    location: Location,
    target: &ExpressionSyntax,
    member: &str,
) -> Option<IrExpression> {
    let ExpressionKind::Identifier(owner) = &target.kind else {
        return None;
    };
    let owner_name = symbol_name(owner);
    let shadowed = ctx.scopes.try_lookup::<VariableId>(scope, &owner_name).is_some()
        || ctx.scopes.try_lookup::<ParameterId>(scope, &owner_name).is_some();
    if shadowed {
        return None;
    }

    let qualified = SymbolName::qualified(owner.parts.clone(), member.to_owned());
    let member = ctx.scopes.try_lookup::<EnumId>(scope, &qualified)?;
    Some(reference(ctx, location, SymbolRef::Enum(member)))
}

/// Field access. A target of unknown type leaves the field for the resolve
/// pass.
fn build_member_access(
    ctx: &mut BuildContext<'_>,
    location: Location,
    target: Rc<IrExpression>,
    member: SymbolName,
) -> IrExpression {
    let unresolved = ctx.symbols.builtins().unresolved();
    let (field, ty) = if ctx.symbols.is_unresolved_type(target.ty) {
        (None, unresolved)
    } else {
        match find_field(&mut ctx.symbols, target.ty, &member) {
            Some((field, ty)) => (Some(field), ty),
            None => {
                let type_name = ctx.symbols.type_name(target.ty);
                ctx.report(
                    location,
                    DiagnosticKind::FieldNotFoundOnType {
                        field: member.full_original_name(),
                        type_name,
                    },
                );
                (None, unresolved)
            }
        }
    };
    IrExpression::new(location, ty, IrExpressionKind::MemberAccess { target, member, field })
}

fn build_initializer(
    ctx: &mut BuildContext<'_>,
    scope: ScopeId,
    location: Location,
    ty: &TypeSyntax,
    fields: &[FieldInitializerSyntax],
) -> Result<IrExpression, BuildError> {
    let ty = build_type_reference(ctx, scope, ty);
    let mut built = Vec::with_capacity(fields.len());
    for field in fields {
        built.push(IrTypeInitializerField {
            location: field.location,
            name: SymbolName::new(&field.name.text),
            field: None,
            expression: build_value(ctx, scope, &field.value)?,
        });
    }
    let fields = IrFieldTypeMatcher::new(&mut ctx.symbols, &mut ctx.diagnostics).match_fields(ty.ty, &built);

    Ok(IrExpression::new(
        location,
        ty.ty,
        IrExpressionKind::TypeInitializer(IrTypeInitializer { ty, fields }),
    ))
}

fn build_invocation(
    ctx: &mut BuildContext<'_>,
    scope: ScopeId,
    location: Location,
    target: &QualifiedName,
    type_arguments: &[TypeSyntax],
    arguments: &[ArgumentSyntax],
) -> Result<IrExpression, BuildError> {
    let name = symbol_name(target);
    let type_arguments: Vec<IrType> = type_arguments
        .iter()
        .map(|argument| build_type_reference(ctx, scope, argument))
        .collect();
    let mut built = Vec::with_capacity(arguments.len());
    for argument in arguments {
        let expression = build_value(ctx, scope, &argument.value)?;
        let name = argument.name.as_ref().map(|name| SymbolName::new(&name.text));
        built.push(IrArgument::new(argument.location, name, expression));
    }

    let candidates = ctx.scopes.lookup_functions(scope, &name);
    if candidates.is_empty() {
        let function = unresolved_function(ctx, &name);
        let unresolved = ctx.symbols.builtins().unresolved();
        return Ok(IrExpression::new(
            location,
            unresolved,
            IrExpressionKind::Invocation(IrInvocation {
                function,
                type_arguments,
                arguments: built,
            }),
        ));
    }

    let explicit: Vec<TypeId> = type_arguments.iter().map(|argument| argument.ty).collect();
    let bound = IrCallBinder::new(&mut ctx.symbols, &mut ctx.diagnostics)
        .bind(location, &name, &candidates, &explicit, &built)
        .ok_or_else(|| BuildError::Invariant {
            message: format!("no candidate left for '{name}'"),
        })?;
    if let Some(instantiation) = bound.instantiation {
        ctx.queue(instantiation);
    }

    Ok(IrExpression::new(
        location,
        bound.ty,
        IrExpressionKind::Invocation(IrInvocation {
            function: bound.function,
            type_arguments,
            arguments: bound.arguments,
        }),
    ))
}

/// Placeholder for a call to a function that is not declared yet
fn unresolved_function(ctx: &mut BuildContext<'_>, name: &SymbolName) -> FunctionId {
    trace!(%name, "forward function reference");
    let unresolved = ctx.symbols.builtins().unresolved();
    let function_type = ctx.symbols.function_type(&[], unresolved);
    ctx.symbols.add_function(FunctionSymbol {
        name: name.clone(),
        type_parameters: Vec::new(),
        parameters: Vec::new(),
        return_type: unresolved,
        function_type,
        kind: FunctionKind::Unresolved,
        instance_of: None,
    })
}
