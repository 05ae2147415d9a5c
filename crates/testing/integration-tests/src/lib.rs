//! Helpers shared by the end-to-end tests in `tests/`

use mj_diagnostics::DiagnosticKind;
use mj_driver::{CompileOptions, compile};
use mj_ir::{ExternalModuleLoader, IrProgram, NullModuleLoader};
use mj_symbol::{SymbolName, VariableId};
use mj_syntax::ModuleSyntax;

/// Run the whole pipeline with default options and no external modules
pub fn compile_module(module: ModuleSyntax) -> IrProgram {
    compile_with(module, &NullModuleLoader)
}

pub fn compile_with(module: ModuleSyntax, loader: &dyn ExternalModuleLoader) -> IrProgram {
    match compile(&module.into_tree(), loader, &CompileOptions::default()) {
        Ok(program) => program,
        Err(error) => panic!("pipeline failed: {error}"),
    }
}

pub fn diagnostic_kinds(program: &IrProgram) -> Vec<DiagnosticKind> {
    program.diagnostics.iter().map(|diagnostic| diagnostic.kind.clone()).collect()
}

/// Type name of a module-level variable
pub fn variable_type(program: &IrProgram, name: &str) -> String {
    let Some(id) = program
        .scopes
        .try_lookup::<VariableId>(program.module.scope, &SymbolName::new(name))
    else {
        panic!("no variable '{name}' in the module scope");
    };
    program.symbols.type_name(program.symbols.variable(id).ty)
}
