//! Type references

use crate::context::{symbol_name, BuildContext};
use mj_diagnostics::DiagnosticKind;
use mj_ir::template::instantiate_type;
use mj_ir::{IrType, ScopeId, TemplateInstantiation};
use mj_symbol::{PrimitiveType, SymbolName, TypeId};
use mj_syntax::TypeSyntax;
use tracing::trace;

/// Resolve a written type. Unknown names become placeholders named after
/// the reference; a template applied to concrete arguments becomes its
/// instance.
pub(crate) fn build_type_reference(ctx: &mut BuildContext<'_>, scope: ScopeId, syntax: &TypeSyntax) -> IrType {
    let name = symbol_name(&syntax.name);
    let arguments: Vec<TypeId> = syntax
        .type_arguments
        .iter()
        .map(|argument| build_type_reference(ctx, scope, argument).ty)
        .collect();

    let base = lookup_type(ctx, scope, &name);
    let ty = if arguments.is_empty() {
        base
    } else {
        apply_type_arguments(ctx, syntax, base, arguments)
    };
    IrType::new(syntax.location, ty)
}

/// A primitive, then a declared type, else a fresh placeholder
pub(crate) fn lookup_type(ctx: &mut BuildContext<'_>, scope: ScopeId, name: &SymbolName) -> TypeId {
    if name.namespace().is_empty() {
        if let Some(primitive) = PrimitiveType::from_name(name.value()) {
            return ctx.symbols.builtins().get(primitive);
        }
    }
    if let Some(ty) = ctx.scopes.try_lookup::<TypeId>(scope, name) {
        return ty;
    }
    trace!(%name, "forward type reference");
    ctx.symbols.placeholder_type(name.clone())
}

fn apply_type_arguments(ctx: &mut BuildContext<'_>, syntax: &TypeSyntax, base: TypeId, arguments: Vec<TypeId>) -> TypeId {
    // the definition is not known yet, the resolve pass decides
    if ctx.symbols.is_open_placeholder(base) {
        return ctx.symbols.generic_instance(base, arguments);
    }

    let Some(declared) = ctx.symbols.ty(base).as_declared() else {
        ctx.report(
            syntax.location,
            DiagnosticKind::NotATemplate {
                name: syntax.name.to_string(),
            },
        );
        return base;
    };
    let expected = declared.type_parameters.len();
    if expected != arguments.len() {
        ctx.report(
            syntax.location,
            DiagnosticKind::TypeArgumentCountMismatch {
                name: syntax.name.to_string(),
                expected,
                actual: arguments.len(),
            },
        );
        return ctx.symbols.builtins().unresolved();
    }

    let concrete = !arguments
        .iter()
        .any(|argument| ctx.symbols.contains_type_parameter(*argument));
    if !(concrete && ctx.symbols.is_template_type(base)) {
        return ctx.symbols.generic_instance(base, arguments);
    }

    match instantiate_type(&mut ctx.symbols, base, &arguments) {
        Some((instance, created)) => {
            if created {
                ctx.queue(TemplateInstantiation {
                    location: syntax.location,
                    template: base.into(),
                    instance: instance.into(),
                    type_arguments: arguments,
                    depth: 0,
                });
            }
            instance
        }
        None => ctx.symbols.generic_instance(base, arguments),
    }
}
