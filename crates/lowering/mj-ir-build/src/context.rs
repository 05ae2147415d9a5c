//! State threaded through the builder

use crate::{BuildError, BuildOptions};
use mj_diagnostics::{DiagnosticKind, DiagnosticList};
use mj_ir::{ExternalModuleLoader, ScopeError, ScopeId, ScopeKind, ScopeTree, TemplateInstantiation};
use mj_span::Location;
use mj_symbol::{FunctionId, SymbolName, SymbolRef, SymbolTable, TypeId};
use mj_syntax::QualifiedName;
use tracing::trace;

/// The function whose body is being built
#[derive(Debug, Clone, Copy)]
pub(crate) struct FunctionFrame {
    pub function: FunctionId,
    pub return_type: TypeId,
}

/// Context for building one compilation unit. The current scope is never
/// stored here; every build function receives it explicitly.
pub(crate) struct BuildContext<'a> {
    pub symbols: SymbolTable,
    pub scopes: ScopeTree,
    pub diagnostics: DiagnosticList,
    pub loader: &'a dyn ExternalModuleLoader,
    pub options: BuildOptions,
    pub instantiations: Vec<TemplateInstantiation>,
    /// Innermost last
    pub frames: Vec<FunctionFrame>,
}

impl<'a> BuildContext<'a> {
    pub fn new(loader: &'a dyn ExternalModuleLoader, options: BuildOptions) -> Self {
        Self {
            symbols: SymbolTable::new(),
            scopes: ScopeTree::new(),
            diagnostics: DiagnosticList::new(),
            loader,
            options,
            instantiations: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn report(&mut self, location: Location, kind: DiagnosticKind) {
        self.diagnostics.add(location, kind);
    }

    pub fn push_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let scope = self.scopes.create(parent, kind);
        trace!(?scope, ?kind, "push scope");
        scope
    }

    /// Freeze a scope the builder is leaving
    pub fn pop_scope(&mut self, scope: ScopeId) {
        trace!(?scope, "pop scope");
        self.scopes.freeze(scope);
    }

    /// Declare `symbol`, reporting a clash and keeping the first binding.
    /// Returns whether the symbol was bound.
    pub fn declare(&mut self, scope: ScopeId, symbol: SymbolRef, location: Location) -> Result<bool, BuildError> {
        match self.scopes.try_declare(scope, symbol, &self.symbols) {
            Ok(()) => Ok(true),
            Err(ScopeError::AlreadyDeclared { .. }) => {
                let name = self.symbols.name_of(symbol).full_original_name();
                self.report(location, DiagnosticKind::AlreadyDeclared { name });
                Ok(false)
            }
            Err(ScopeError::Frozen) => Err(BuildError::Invariant {
                message: format!(
                    "declaring '{}' into a frozen scope",
                    self.symbols.name_of(symbol)
                ),
            }),
        }
    }

    pub fn frame(&self) -> Option<FunctionFrame> {
        self.frames.last().copied()
    }

    pub fn queue(&mut self, instantiation: TemplateInstantiation) {
        trace!(
            template = %self.symbols.name_of(instantiation.template),
            instance = %self.symbols.name_of(instantiation.instance),
            "queued template instance"
        );
        self.instantiations.push(instantiation);
    }
}

/// `A.B.c` as a symbol name with namespace `[A, B]`
pub(crate) fn symbol_name(name: &QualifiedName) -> SymbolName {
    match name.parts.split_last() {
        Some((last, namespace)) if !namespace.is_empty() => {
            SymbolName::qualified(namespace.to_vec(), last.clone())
        }
        _ => SymbolName::new(name.name()),
    }
}
