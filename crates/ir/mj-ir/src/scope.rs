//! Scope chain used while building and during the fixup passes
//!
//! Scopes form a parent-linked tree stored in an arena. Each scope owns a
//! lazily created name table keyed by canonical name, a list of imported
//! module scopes and a lazily created template registry. A scope is frozen
//! when the builder leaves it; a frozen scope refuses new declarations.

use la_arena::{Arena, Idx};
use mj_symbol::{FunctionId, ModuleId, SymbolId, SymbolName, SymbolRef, SymbolTable, TypeId};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Unique identifier for a scope
pub type ScopeId = Idx<IrScope>;

/// What introduced a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Module,
    Function,
    Type,
    CodeBlock,
}

/// Declaration failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// Same name and kind already declared here; the first one is kept
    #[error("a symbol with the same name is already declared in this scope")]
    AlreadyDeclared { existing: SymbolRef },

    #[error("the scope is frozen and cannot be extended")]
    Frozen,
}

/// One lexical region
#[derive(Debug, Clone)]
pub struct IrScope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    symbols: Option<FxHashMap<String, Vec<SymbolRef>>>,
    imports: Vec<ScopeId>,
    templates: Option<FxHashMap<String, SymbolRef>>,
    frozen: bool,
}

impl IrScope {
    fn new(parent: Option<ScopeId>, kind: ScopeKind) -> Self {
        Self {
            parent,
            kind,
            symbols: None,
            imports: Vec::new(),
            templates: None,
            frozen: false,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Module scopes whose symbols are visible here
    pub fn imports(&self) -> &[ScopeId] {
        &self.imports
    }

    /// Declarations under a canonical key, in declaration order
    pub fn named(&self, key: &str) -> &[SymbolRef] {
        self.symbols
            .as_ref()
            .and_then(|symbols| symbols.get(key))
            .map_or(&[], Vec::as_slice)
    }

    /// Every symbol declared directly in this scope
    pub fn symbols(&self) -> impl Iterator<Item = SymbolRef> + '_ {
        self.symbols
            .iter()
            .flat_map(|symbols| symbols.values())
            .flatten()
            .copied()
    }
}

/// Arena of all scopes of a compilation
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Arena<IrScope>,
    global: ScopeId,
    /// Scopes owned by module and type symbols, for qualified lookup
    owners: FxHashMap<SymbolRef, ScopeId>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Tree holding only the global scope
    pub fn new() -> Self {
        let mut scopes = Arena::new();
        let global = scopes.alloc(IrScope::new(None, ScopeKind::Global));
        Self {
            scopes,
            global,
            owners: FxHashMap::default(),
        }
    }

    pub fn global(&self) -> ScopeId {
        self.global
    }

    /// Create a child scope
    pub fn create(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        self.scopes.alloc(IrScope::new(Some(parent), kind))
    }

    pub fn get(&self, id: ScopeId) -> &IrScope {
        &self.scopes[id]
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id].parent
    }

    /// Closest scope of `kind`, starting at `scope` itself
    pub fn enclosing(&self, scope: ScopeId, kind: ScopeKind) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.scopes[id].kind == kind {
                return Some(id);
            }
            current = self.scopes[id].parent;
        }
        None
    }

    pub fn freeze(&mut self, scope: ScopeId) {
        self.scopes[scope].frozen = true;
    }

    /// Make the symbols of `imported` visible in `scope`
    pub fn add_import(&mut self, scope: ScopeId, imported: ScopeId) -> Result<(), ScopeError> {
        let target = &mut self.scopes[scope];
        if target.frozen {
            return Err(ScopeError::Frozen);
        }
        if !target.imports.contains(&imported) {
            target.imports.push(imported);
        }
        Ok(())
    }

    /// Record the scope a module or type symbol owns
    pub fn bind_owner(&mut self, symbol: SymbolRef, scope: ScopeId) {
        self.owners.insert(symbol, scope);
    }

    pub fn owned_scope(&self, symbol: SymbolRef) -> Option<ScopeId> {
        self.owners.get(&symbol).copied()
    }

    /// Declare `symbol` under its name.
    ///
    /// Two symbols of the same kind conflict, except functions, which only
    /// conflict when their signatures are the same type.
    pub fn try_declare(
        &mut self,
        scope: ScopeId,
        symbol: SymbolRef,
        symbols: &SymbolTable,
    ) -> Result<(), ScopeError> {
        let target = &mut self.scopes[scope];
        if target.frozen {
            return Err(ScopeError::Frozen);
        }

        let key = symbols.name_of(symbol).full_canonical_name();
        let existing = target.named(&key).iter().copied().find(|existing| {
            match (*existing, symbol) {
                (SymbolRef::Function(first), SymbolRef::Function(second)) => symbols.same_type(
                    symbols.function(first).function_type,
                    symbols.function(second).function_type,
                ),
                (existing, symbol) => existing.kind() == symbol.kind(),
            }
        });
        if let Some(existing) = existing {
            return Err(ScopeError::AlreadyDeclared { existing });
        }

        target
            .symbols
            .get_or_insert_with(FxHashMap::default)
            .entry(key)
            .or_default()
            .push(symbol);
        Ok(())
    }

    /// Declare `symbol` unless a conflicting one is already declared, in
    /// which case the existing one stays. Only a frozen scope fails.
    pub fn declare_or_keep(
        &mut self,
        scope: ScopeId,
        symbol: SymbolRef,
        symbols: &SymbolTable,
    ) -> Result<(), ScopeError> {
        match self.try_declare(scope, symbol, symbols) {
            Ok(()) | Err(ScopeError::AlreadyDeclared { .. }) => Ok(()),
            Err(ScopeError::Frozen) => Err(ScopeError::Frozen),
        }
    }

    /// Swap a binding for its fixed-up replacement. Replacing does not
    /// extend the scope, so frozen scopes accept it.
    pub fn replace(&mut self, scope: ScopeId, old: SymbolRef, new: SymbolRef) -> bool {
        let Some(symbols) = self.scopes[scope].symbols.as_mut() else {
            return false;
        };
        for bound in symbols.values_mut().flatten() {
            if *bound == old {
                *bound = new;
                return true;
            }
        }
        false
    }

    /// Find the first symbol of kind `T` visible from `scope`.
    ///
    /// Each scope checks its own table, then its imports, then defers to its
    /// parent. A qualified name resolves its leading segments to a module or
    /// type symbol and looks up the last segment in that symbol's scope only.
    pub fn try_lookup<T: SymbolId>(&self, scope: ScopeId, name: &SymbolName) -> Option<T> {
        if name.namespace().is_empty() {
            return self.find(scope, name.canonical_name(), true);
        }
        let (owner, key) = self.qualified_owner(scope, name)?;
        self.find(owner, &key, false)
    }

    /// The overload group of `name`: every function declared under it in the
    /// innermost scope (or that scope's imports) declaring any.
    pub fn lookup_functions(&self, scope: ScopeId, name: &SymbolName) -> Vec<FunctionId> {
        let (start, key, walk_parents) = if name.namespace().is_empty() {
            (scope, name.canonical_name().to_owned(), true)
        } else {
            match self.qualified_owner(scope, name) {
                Some((owner, key)) => (owner, key, false),
                None => return Vec::new(),
            }
        };

        let mut current = Some(start);
        while let Some(id) = current {
            let group: Vec<FunctionId> = self
                .local(id, &key)
                .filter_map(FunctionId::from_ref)
                .collect();
            if !group.is_empty() || !walk_parents {
                return group;
            }
            current = self.scopes[id].parent;
        }
        Vec::new()
    }

    /// Register a template declaration for on-demand instantiation
    pub fn register_template(&mut self, scope: ScopeId, template: SymbolRef, symbols: &SymbolTable) {
        let key = symbols.name_of(template).full_canonical_name();
        self.scopes[scope]
            .templates
            .get_or_insert_with(FxHashMap::default)
            .insert(key, template);
    }

    /// Find a template by name, walking outward
    pub fn lookup_template(&self, scope: ScopeId, name: &SymbolName) -> Option<SymbolRef> {
        let key = name.full_canonical_name();
        let mut current = Some(scope);
        while let Some(id) = current {
            let found = self.scopes[id]
                .templates
                .as_ref()
                .and_then(|templates| templates.get(&key));
            if let Some(template) = found {
                return Some(*template);
            }
            current = self.scopes[id].parent;
        }
        None
    }

    fn local<'tree>(&'tree self, id: ScopeId, key: &'tree str) -> impl Iterator<Item = SymbolRef> + 'tree {
        let scope = &self.scopes[id];
        let imported = scope
            .imports
            .iter()
            .flat_map(move |import| self.scopes[*import].named(key).iter().copied());
        scope.named(key).iter().copied().chain(imported)
    }

    fn find<T: SymbolId>(&self, scope: ScopeId, key: &str, walk_parents: bool) -> Option<T> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(found) = self.local(id, key).find_map(T::from_ref) {
                return Some(found);
            }
            if !walk_parents {
                return None;
            }
            current = self.scopes[id].parent;
        }
        None
    }

    /// Scope named by the namespace of `name` plus the key to look up in it.
    /// The longest namespace prefix naming a module wins; the remaining
    /// segments descend through owned type scopes.
    fn qualified_owner(&self, scope: ScopeId, name: &SymbolName) -> Option<(ScopeId, String)> {
        let namespace = name.canonical_namespace();
        for split in (1..=namespace.len()).rev() {
            let prefix = namespace[..split].join(".");
            let owner = self
                .find::<ModuleId>(scope, &prefix, true)
                .map(SymbolRef::Module)
                .or_else(|| self.find::<TypeId>(scope, &prefix, true).map(SymbolRef::Type));
            let Some(mut owned) = owner.and_then(|owner| self.owned_scope(owner)) else {
                continue;
            };

            for segment in &namespace[split..] {
                let nested = self
                    .find::<TypeId>(owned, segment, false)
                    .map(SymbolRef::Type)
                    .or_else(|| self.find::<ModuleId>(owned, segment, false).map(SymbolRef::Module))?;
                owned = self.owned_scope(nested)?;
            }
            return Some((owned, name.canonical_name().to_owned()));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mj_symbol::{
        DeclaredType, FunctionKind, FunctionSymbol, ModuleKind, ModuleSymbol, TypeSymbol,
        VariableId, VariableSymbol,
    };

    fn variable(symbols: &mut SymbolTable, name: &str) -> VariableId {
        let ty = symbols.builtins().i32();
        symbols.add_variable(VariableSymbol {
            name: SymbolName::new(name),
            ty,
        })
    }

    fn function(symbols: &mut SymbolTable, name: &str, parameter_types: &[TypeId]) -> FunctionId {
        let void = symbols.builtins().void();
        let function_type = symbols.function_type(parameter_types, void);
        symbols.add_function(FunctionSymbol {
            name: SymbolName::new(name),
            type_parameters: Vec::new(),
            parameters: Vec::new(),
            return_type: void,
            function_type,
            kind: FunctionKind::Declared,
            instance_of: None,
        })
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut symbols = SymbolTable::new();
        let mut scopes = ScopeTree::new();
        let module = scopes.create(scopes.global(), ScopeKind::Module);
        let first = variable(&mut symbols, "count");
        let second = variable(&mut symbols, "Count");

        assert!(scopes.try_declare(module, first.into(), &symbols).is_ok());
        assert_eq!(
            scopes.try_declare(module, second.into(), &symbols),
            Err(ScopeError::AlreadyDeclared {
                existing: first.into()
            })
        );
        assert_eq!(
            scopes.try_lookup::<VariableId>(module, &SymbolName::new("count")),
            Some(first)
        );
    }

    #[test]
    fn test_lookup_walks_parents_and_shadows() {
        let mut symbols = SymbolTable::new();
        let mut scopes = ScopeTree::new();
        let module = scopes.create(scopes.global(), ScopeKind::Module);
        let block = scopes.create(module, ScopeKind::CodeBlock);
        let outer = variable(&mut symbols, "x");
        let inner = variable(&mut symbols, "x");
        let other = variable(&mut symbols, "y");

        scopes.try_declare(module, outer.into(), &symbols).unwrap();
        scopes.try_declare(module, other.into(), &symbols).unwrap();
        scopes.try_declare(block, inner.into(), &symbols).unwrap();

        let x = SymbolName::new("x");
        assert_eq!(scopes.try_lookup::<VariableId>(block, &x), Some(inner));
        assert_eq!(scopes.try_lookup::<VariableId>(module, &x), Some(outer));
        assert_eq!(
            scopes.try_lookup::<VariableId>(block, &SymbolName::new("y")),
            Some(other)
        );
        assert_eq!(scopes.try_lookup::<VariableId>(block, &SymbolName::new("z")), None);
    }

    #[test]
    fn test_overloads_conflict_only_on_signature() {
        let mut symbols = SymbolTable::new();
        let mut scopes = ScopeTree::new();
        let module = scopes.create(scopes.global(), ScopeKind::Module);
        let i8 = symbols.builtins().get(mj_symbol::PrimitiveType::I8);
        let i32 = symbols.builtins().i32();
        let narrow = function(&mut symbols, "f", &[i8]);
        let wide = function(&mut symbols, "f", &[i32]);
        let again = function(&mut symbols, "f", &[i32]);

        scopes.try_declare(module, narrow.into(), &symbols).unwrap();
        scopes.try_declare(module, wide.into(), &symbols).unwrap();
        assert!(scopes.try_declare(module, again.into(), &symbols).is_err());

        let block = scopes.create(module, ScopeKind::CodeBlock);
        assert_eq!(
            scopes.lookup_functions(block, &SymbolName::new("f")),
            vec![narrow, wide]
        );
    }

    #[test]
    fn test_frozen_scope_rejects_declarations() {
        let mut symbols = SymbolTable::new();
        let mut scopes = ScopeTree::new();
        let module = scopes.create(scopes.global(), ScopeKind::Module);
        scopes.freeze(module);

        let late = variable(&mut symbols, "late");
        assert_eq!(
            scopes.try_declare(module, late.into(), &symbols),
            Err(ScopeError::Frozen)
        );
    }

    #[test]
    fn test_declare_or_keep() {
        let mut symbols = SymbolTable::new();
        let mut scopes = ScopeTree::new();
        let module = scopes.create(scopes.global(), ScopeKind::Module);
        let first = variable(&mut symbols, "total");
        let second = variable(&mut symbols, "to_tal");

        assert_eq!(scopes.declare_or_keep(module, first.into(), &symbols), Ok(()));
        assert_eq!(scopes.declare_or_keep(module, second.into(), &symbols), Ok(()));
        assert_eq!(
            scopes.try_lookup::<VariableId>(module, &SymbolName::new("total")),
            Some(first)
        );

        scopes.freeze(module);
        let late = variable(&mut symbols, "late");
        assert_eq!(
            scopes.declare_or_keep(module, late.into(), &symbols),
            Err(ScopeError::Frozen)
        );
    }

    #[test]
    fn test_qualified_lookup_enters_owned_scope() {
        let mut symbols = SymbolTable::new();
        let mut scopes = ScopeTree::new();
        let module = scopes.create(scopes.global(), ScopeKind::Module);

        let math = symbols.add_module(ModuleSymbol {
            name: SymbolName::new("Std.Math"),
            kind: ModuleKind::External,
        });
        let math_scope = scopes.create(scopes.global(), ScopeKind::Module);
        let pi = variable(&mut symbols, "pi");
        scopes.try_declare(math_scope, pi.into(), &symbols).unwrap();
        scopes.bind_owner(math.into(), math_scope);
        scopes.try_declare(module, math.into(), &symbols).unwrap();

        let color = symbols.add_type(TypeSymbol::declared(
            SymbolName::new("Color"),
            DeclaredType::default(),
        ));
        let color_scope = scopes.create(module, ScopeKind::Type);
        let red = variable(&mut symbols, "Red");
        scopes.try_declare(color_scope, red.into(), &symbols).unwrap();
        scopes.bind_owner(color.into(), color_scope);
        scopes.try_declare(module, color.into(), &symbols).unwrap();

        assert_eq!(
            scopes.try_lookup::<VariableId>(module, &SymbolName::new("Std.Math.pi")),
            Some(pi)
        );
        assert_eq!(
            scopes.try_lookup::<VariableId>(module, &SymbolName::new("Color.red")),
            Some(red)
        );
        assert_eq!(scopes.try_lookup::<VariableId>(module, &SymbolName::new("pi")), None);
    }

    #[test]
    fn test_imports_are_searched_before_parent() {
        let mut symbols = SymbolTable::new();
        let mut scopes = ScopeTree::new();
        let module = scopes.create(scopes.global(), ScopeKind::Module);
        let imported = scopes.create(scopes.global(), ScopeKind::Module);
        let global_x = variable(&mut symbols, "x");
        let imported_x = variable(&mut symbols, "x");

        let global = scopes.global();
        scopes.try_declare(global, global_x.into(), &symbols).unwrap();
        scopes.try_declare(imported, imported_x.into(), &symbols).unwrap();
        scopes.add_import(module, imported).unwrap();

        assert_eq!(
            scopes.try_lookup::<VariableId>(module, &SymbolName::new("x")),
            Some(imported_x)
        );
    }

    #[test]
    fn test_template_registry() {
        let mut symbols = SymbolTable::new();
        let mut scopes = ScopeTree::new();
        let module = scopes.create(scopes.global(), ScopeKind::Module);
        let block = scopes.create(module, ScopeKind::CodeBlock);
        let add = function(&mut symbols, "add", &[]);

        scopes.register_template(module, add.into(), &symbols);
        assert_eq!(
            scopes.lookup_template(block, &SymbolName::new("Add")),
            Some(SymbolRef::Function(add))
        );
    }
}
