//! Compilation driver
//!
//! Runs one syntax tree through the fixed pipeline: build, resolve forward
//! references, instantiate templates, lower overloaded operators and
//! validate. Diagnostics from every stage accumulate on the returned
//! program; only conditions the pipeline cannot continue from are errors.

mod error;
mod options;

pub use error::{CompileError, ConfigError};
pub use options::CompileOptions;

use mj_ir::{ExternalModuleLoader, IrProgram};
use mj_ir_build::IrBuilder;
use mj_mono::IrTemplateInstantiator;
use mj_operator::IrOperatorFunctionRewriter;
use mj_resolve::IrResolveSymbolsRewriter;
use mj_syntax::SyntaxTree;
use mj_validate::IrValidationRewriter;
use std::rc::Rc;
use tracing::{debug, debug_span};

/// Compile `tree` with the given options
pub fn compile(
    tree: &SyntaxTree,
    loader: &dyn ExternalModuleLoader,
    options: &CompileOptions,
) -> Result<IrProgram, CompileError> {
    let built = {
        let _span = debug_span!("build").entered();
        IrBuilder::program(tree, loader, options.build_options())?
    };
    let mut module = built.module;
    let mut symbols = built.symbols;
    let mut scopes = built.scopes;
    let mut diagnostics = built.diagnostics;
    let mut instantiations = built.instantiations;

    if options.resolve {
        let _span = debug_span!("resolve").entered();
        let resolved = IrResolveSymbolsRewriter::new(&mut symbols, &mut scopes, &mut diagnostics)
            .fold_constants(options.fold_constants)
            .resolve(&module);
        module = resolved.module;
        instantiations.extend(resolved.instantiations);
    }

    {
        let _span = debug_span!("instantiate").entered();
        module = IrTemplateInstantiator::new(&mut symbols, &mut scopes, &mut diagnostics)
            .max_depth(options.max_template_depth)
            .fold_constants(options.fold_constants)
            .add_instantiations(&module, instantiations)?;
    }

    if options.lower_operators {
        let _span = debug_span!("lower_operators").entered();
        module = IrOperatorFunctionRewriter::new(&mut symbols, &scopes, &mut diagnostics, loader).lower(&module);
    }

    if options.validate {
        let _span = debug_span!("validate").entered();
        IrValidationRewriter::new(&symbols, &mut diagnostics).validate(&module);
    }

    debug!(module = %module.name, diagnostics = diagnostics.len(), "compiled module");
    Ok(IrProgram {
        syntax: Rc::new(tree.clone()),
        module,
        symbols,
        scopes,
        diagnostics,
    })
}

/// Compile `tree` with options read from TOML text
pub fn compile_with_toml(
    tree: &SyntaxTree,
    loader: &dyn ExternalModuleLoader,
    options: &str,
) -> Result<IrProgram, CompileError> {
    let options = CompileOptions::from_toml(options)?;
    compile(tree, loader, &options)
}
