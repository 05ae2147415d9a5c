//! Module root: imports, items, exports

use crate::context::{symbol_name, BuildContext};
use crate::declaration::{build_function, build_type_declaration, build_variable};
use crate::statement::build_statement;
use crate::BuildError;
use mj_diagnostics::DiagnosticKind;
use mj_ir::loader::import_module;
use mj_ir::{IrItem, IrModule, IrStatement, IrStatementKind, ScopeId, ScopeKind};
use mj_symbol::{ModuleKind, ModuleSymbol, SymbolName, TypeId, VariableId};
use mj_syntax::{ItemSyntax, ModuleSyntax, UseSyntax};
use std::rc::Rc;
use tracing::debug;

/// Name given to a module without a `module` header
const DEFAULT_MODULE_NAME: &str = "Main";

pub(crate) fn build_module(ctx: &mut BuildContext<'_>, syntax: &ModuleSyntax) -> Result<IrModule, BuildError> {
    let name = syntax
        .name
        .as_ref()
        .map_or_else(|| SymbolName::new(DEFAULT_MODULE_NAME), symbol_name);
    let global = ctx.scopes.global();
    let module_symbol = ctx.symbols.add_module(ModuleSymbol {
        name: name.clone(),
        kind: ModuleKind::Declared,
    });
    ctx.declare(global, module_symbol.into(), syntax.location)?;
    let scope = ctx.push_scope(global, ScopeKind::Module);
    ctx.scopes.bind_owner(module_symbol.into(), scope);

    for directive in &syntax.uses {
        build_use(ctx, scope, directive)?;
    }

    let mut items = Vec::with_capacity(syntax.items.len());
    for item in &syntax.items {
        let built = match item {
            ItemSyntax::Function(function) => IrItem::Function(build_function(ctx, scope, function)?),
            ItemSyntax::Type(declaration) => IrItem::Type(build_type_declaration(ctx, scope, declaration)?),
            ItemSyntax::Variable(variable) => {
                let declaration = build_variable(ctx, scope, variable)?;
                IrItem::Statement(Rc::new(IrStatement::new(
                    variable.location,
                    IrStatementKind::VariableDeclaration(declaration),
                )))
            }
            ItemSyntax::Statement(statement) => IrItem::Statement(build_statement(ctx, scope, statement)?),
        };
        items.push(built);
    }

    for public in &syntax.publics {
        for exported in &public.names {
            let exported_name = symbol_name(exported);
            if !is_declared(ctx, scope, &exported_name) {
                ctx.report(
                    exported.location,
                    DiagnosticKind::ExportNotFound {
                        name: exported.to_string(),
                    },
                );
            }
        }
    }
    ctx.pop_scope(scope);

    Ok(IrModule {
        location: syntax.location,
        name,
        scope,
        items,
    })
}

/// Import the module a `use` names, or every module of the namespace it
/// names. Unknown names are reported and skipped.
fn build_use(ctx: &mut BuildContext<'_>, scope: ScopeId, directive: &UseSyntax) -> Result<(), BuildError> {
    let name = directive.module.to_string();
    let modules = match ctx.loader.lookup_module(&name) {
        Some(module) => vec![module],
        None => ctx.loader.lookup_namespace(&name),
    };
    if modules.is_empty() {
        ctx.report(directive.location, DiagnosticKind::ModuleNotFound { name });
        return Ok(());
    }

    for module in &modules {
        import_module(&mut ctx.symbols, &mut ctx.scopes, scope, module).map_err(|error| BuildError::Invariant {
            message: format!("importing '{}': {error}", module.name),
        })?;
    }
    debug!(module = %name, count = modules.len(), "processed use directive");
    Ok(())
}

fn is_declared(ctx: &BuildContext<'_>, scope: ScopeId, name: &SymbolName) -> bool {
    !ctx.scopes.lookup_functions(scope, name).is_empty()
        || ctx.scopes.try_lookup::<TypeId>(scope, name).is_some()
        || ctx.scopes.try_lookup::<VariableId>(scope, name).is_some()
}
