//! Function, type and variable declarations

use crate::context::{BuildContext, FunctionFrame};
use crate::expression::{build_expression, build_value};
use crate::statement::build_code_block;
use crate::types::build_type_reference;
use crate::BuildError;
use mj_diagnostics::DiagnosticKind;
use mj_ir::inference::committed_type;
use mj_ir::overload::is_implicitly_convertible;
use mj_ir::{
    IrDeclarationFunction, IrDeclarationType, IrDeclarationVariable, IrEnumMember, IrExpression,
    IrExpressionTypeRewriter, IrField, IrParameter, IrRule, IrType, IrTypeParameter, ScopeId,
    ScopeKind,
};
use mj_span::Location;
use mj_symbol::{
    ConstantValue, DeclaredType, EnumSymbol, FieldSymbol, FunctionKind, FunctionSymbol,
    ParameterSymbol, RuleSymbol, SymbolName, TypeId, TypeParameterKind, TypeSymbol, VariableSymbol,
};
use mj_syntax::{
    EnumMemberSyntax, FunctionSyntax, TypeDeclarationSyntax, TypeParameterSyntax,
    TypeParameterSyntaxKind, VariableSyntax,
};
use std::rc::Rc;
use tracing::trace;

pub(crate) fn build_function(
    ctx: &mut BuildContext<'_>,
    parent: ScopeId,
    syntax: &FunctionSyntax,
) -> Result<Rc<IrDeclarationFunction>, BuildError> {
    let scope = ctx.push_scope(parent, ScopeKind::Function);
    let type_parameters = build_type_parameters(ctx, scope, &syntax.type_parameters)?;

    let mut parameters = Vec::with_capacity(syntax.parameters.len());
    for parameter in &syntax.parameters {
        let ty = build_type_reference(ctx, scope, &parameter.ty);
        let symbol = ctx.symbols.add_parameter(ParameterSymbol {
            name: SymbolName::new(&parameter.name.text),
            ty: ty.ty,
        });
        ctx.declare(scope, symbol.into(), parameter.location)?;
        parameters.push(IrParameter {
            location: parameter.location,
            symbol,
            ty,
        });
    }

    let return_type = match &syntax.return_type {
        Some(ty) => build_type_reference(ctx, scope, ty),
        None => IrType::new(syntax.location, ctx.symbols.builtins().void()),
    };

    let parameter_types: Vec<TypeId> = parameters.iter().map(|parameter| parameter.ty.ty).collect();
    let function_type = ctx.symbols.function_type(&parameter_types, return_type.ty);
    let symbol = ctx.symbols.add_function(FunctionSymbol {
        name: SymbolName::new(&syntax.name.text),
        type_parameters: type_parameters.iter().map(|parameter| parameter.ty).collect(),
        parameters: parameters.iter().map(|parameter| parameter.symbol).collect(),
        return_type: return_type.ty,
        function_type,
        kind: FunctionKind::Declared,
        instance_of: None,
    });

    ctx.frames.push(FunctionFrame {
        function: symbol,
        return_type: return_type.ty,
    });
    let body = build_code_block(ctx, scope, &syntax.body);
    ctx.frames.pop();
    let body = body?;
    ctx.pop_scope(scope);

    // published only now, so the body never saw itself
    ctx.declare(parent, symbol.into(), syntax.location)?;
    if ctx.symbols.is_template_function(symbol) {
        ctx.scopes.register_template(parent, symbol.into(), &ctx.symbols);
    }
    trace!(function = %syntax.name, "built function");

    Ok(Rc::new(IrDeclarationFunction {
        location: syntax.location,
        symbol,
        scope,
        type_parameters,
        parameters,
        return_type,
        body,
    }))
}

pub(crate) fn build_type_declaration(
    ctx: &mut BuildContext<'_>,
    parent: ScopeId,
    syntax: &TypeDeclarationSyntax,
) -> Result<Rc<IrDeclarationType>, BuildError> {
    let scope = ctx.push_scope(parent, ScopeKind::Type);
    let type_parameters = build_type_parameters(ctx, scope, &syntax.type_parameters)?;
    let base_type = syntax
        .base_type
        .as_ref()
        .map(|base| build_type_reference(ctx, scope, base));

    let enum_type = base_type.map_or_else(|| ctx.symbols.builtins().i32(), |base| base.ty);
    let mut enums = Vec::with_capacity(syntax.enums.len());
    let mut next = 0;
    for member in &syntax.enums {
        let (built, value) = build_enum_member(ctx, scope, member, enum_type, next)?;
        next = value + 1;
        enums.push(built);
    }

    let mut fields = Vec::with_capacity(syntax.fields.len());
    for field in &syntax.fields {
        let ty = build_type_reference(ctx, scope, &field.ty);
        let symbol = ctx.symbols.add_field(FieldSymbol {
            name: SymbolName::new(&field.name.text),
            ty: ty.ty,
        });
        ctx.declare(scope, symbol.into(), field.location)?;
        fields.push(IrField {
            location: field.location,
            symbol,
            ty,
        });
    }

    let mut rules = Vec::with_capacity(syntax.rules.len());
    for rule in &syntax.rules {
        let arguments = rule
            .arguments
            .iter()
            .map(|argument| build_value(ctx, scope, argument))
            .collect::<Result<Vec<_>, _>>()?;
        let symbol = ctx.symbols.add_rule(RuleSymbol {
            name: SymbolName::new(&rule.name.text),
        });
        rules.push(IrRule {
            location: rule.location,
            symbol,
            arguments,
        });
    }
    ctx.pop_scope(scope);

    let symbol = ctx.symbols.add_type(TypeSymbol::declared(
        SymbolName::new(&syntax.name.text),
        DeclaredType {
            type_parameters: type_parameters.iter().map(|parameter| parameter.ty).collect(),
            base_type: base_type.map(|base| base.ty),
            enums: enums.iter().map(|member: &IrEnumMember| member.symbol).collect(),
            fields: fields.iter().map(|field| field.symbol).collect(),
            rules: rules.iter().map(|rule| rule.symbol).collect(),
            instance_of: None,
        },
    ));
    if ctx.declare(parent, symbol.into(), syntax.location)? {
        ctx.scopes.bind_owner(symbol.into(), scope);
    }
    if ctx.symbols.is_template_type(symbol) {
        ctx.scopes.register_template(parent, symbol.into(), &ctx.symbols);
    }
    trace!(ty = %syntax.name, "built type");

    Ok(Rc::new(IrDeclarationType {
        location: syntax.location,
        symbol,
        scope,
        type_parameters,
        base_type,
        enums,
        fields,
        rules,
    }))
}

/// Enum member and the integer value it took. Without an explicit value a
/// member takes the one after its predecessor.
fn build_enum_member(
    ctx: &mut BuildContext<'_>,
    scope: ScopeId,
    syntax: &EnumMemberSyntax,
    enum_type: TypeId,
    next: i128,
) -> Result<(IrEnumMember, i128), BuildError> {
    let (value, expression) = match &syntax.value {
        Some(value) => {
            let built = build_expression(ctx, scope, value)?;
            let built = IrExpressionTypeRewriter::new(&ctx.symbols, enum_type).rewrite(&built);
            match built.constant.as_ref().and_then(ConstantValue::as_integer) {
                Some(value) => (value, Some(built)),
                None => {
                    ctx.report(
                        value.location,
                        DiagnosticKind::NonConstantEnumValue {
                            name: syntax.name.text.clone(),
                        },
                    );
                    (next, Some(built))
                }
            }
        }
        None => (next, None),
    };

    let symbol = ctx.symbols.add_enum(EnumSymbol {
        name: SymbolName::new(&syntax.name.text),
        value: ConstantValue::Integer(value),
        ty: enum_type,
    });
    ctx.declare(scope, symbol.into(), syntax.location)?;
    Ok((
        IrEnumMember {
            location: syntax.location,
            symbol,
            value: expression,
        },
        value,
    ))
}

fn build_type_parameters(
    ctx: &mut BuildContext<'_>,
    scope: ScopeId,
    parameters: &[TypeParameterSyntax],
) -> Result<Vec<IrTypeParameter>, BuildError> {
    let mut built = Vec::with_capacity(parameters.len());
    for parameter in parameters {
        let kind = match parameter.kind {
            TypeParameterSyntaxKind::Generic => TypeParameterKind::Generic,
            TypeParameterSyntaxKind::Template => TypeParameterKind::Template,
        };
        let ty = ctx
            .symbols
            .add_type(TypeSymbol::parameter(SymbolName::new(&parameter.name.text), kind));
        ctx.declare(scope, ty.into(), parameter.location)?;
        built.push(IrTypeParameter {
            location: parameter.location,
            ty,
        });
    }
    Ok(built)
}

/// Variable with its type either declared or taken from the initializer.
/// An initializer literal is committed to the declared type, or to its
/// preferred candidate when no type is written.
pub(crate) fn build_variable(
    ctx: &mut BuildContext<'_>,
    scope: ScopeId,
    syntax: &VariableSyntax,
) -> Result<Rc<IrDeclarationVariable>, BuildError> {
    let declared = syntax
        .ty
        .as_ref()
        .map(|ty| build_type_reference(ctx, scope, ty));
    let initializer = syntax
        .initializer
        .as_ref()
        .map(|initializer| build_value(ctx, scope, initializer))
        .transpose()?;

    let (ty, initializer) = match (declared, initializer) {
        (Some(declared), Some(initializer)) => {
            let committed = commit(ctx, declared.ty, &initializer, initializer.location);
            (declared, Some(committed))
        }
        (None, Some(initializer)) => {
            let target = committed_type(&ctx.symbols, initializer.ty);
            let committed = IrExpressionTypeRewriter::new(&ctx.symbols, target).rewrite(&initializer);
            (IrType::new(syntax.location, target), Some(committed))
        }
        (Some(declared), None) => (declared, None),
        (None, None) => {
            return Err(BuildError::unsupported(
                format!("variable '{}' without type or initializer", syntax.name),
                syntax.location,
            ));
        }
    };

    let symbol = ctx.symbols.add_variable(VariableSymbol {
        name: SymbolName::new(&syntax.name.text),
        ty: ty.ty,
    });
    ctx.declare(scope, symbol.into(), syntax.location)?;
    trace!(variable = %syntax.name, ty = %ctx.symbols.type_name(ty.ty), "declared variable");

    Ok(Rc::new(IrDeclarationVariable {
        location: syntax.location,
        symbol,
        ty,
        initializer,
    }))
}

/// Commit `value` to `target`, reporting a value that cannot convert
pub(crate) fn commit(
    ctx: &mut BuildContext<'_>,
    target: TypeId,
    value: &Rc<IrExpression>,
    location: Location,
) -> Rc<IrExpression> {
    let committed = IrExpressionTypeRewriter::new(&ctx.symbols, target).rewrite(value);
    if !is_implicitly_convertible(&ctx.symbols, committed.ty, target) {
        let expected = ctx.symbols.type_name(target);
        let actual = ctx.symbols.type_name(committed.ty);
        ctx.report(location, DiagnosticKind::TypeMismatch { expected, actual });
    }
    committed
}
