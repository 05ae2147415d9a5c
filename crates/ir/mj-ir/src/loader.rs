//! External module interface
//!
//! Imports and operator overloads come from outside the compilation unit. The
//! loader describes them with plain descriptors naming types by text; the
//! helpers here turn a descriptor into symbols declared in a module scope.

use crate::scope::{ScopeError, ScopeId, ScopeKind, ScopeTree};
use indexmap::IndexMap;
use mj_symbol::{
    FunctionId, FunctionKind, FunctionSymbol, ModuleId, ModuleKind, ModuleSymbol, ParameterSymbol,
    PrimitiveType, SymbolId, SymbolName, SymbolTable, TypeId,
};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalParameter {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalFunction {
    pub name: String,
    pub parameters: Vec<ExternalParameter>,
    /// `None` for functions returning nothing
    pub return_type: Option<String>,
}

impl ExternalFunction {
    pub fn new(name: &str, parameters: &[(&str, &str)], return_type: Option<&str>) -> Self {
        Self {
            name: name.to_owned(),
            parameters: parameters
                .iter()
                .map(|(name, type_name)| ExternalParameter {
                    name: (*name).to_owned(),
                    type_name: (*type_name).to_owned(),
                })
                .collect(),
            return_type: return_type.map(str::to_owned),
        }
    }
}

/// A module known to the loader, with a dotted name such as `Std.Math`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalModule {
    pub name: String,
    pub functions: Vec<ExternalFunction>,
}

impl ExternalModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            functions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_function(mut self, function: ExternalFunction) -> Self {
        self.functions.push(function);
        self
    }
}

/// Source of external modules and operator-overload functions.
///
/// The compiler does not cache answers and may ask the same question
/// repeatedly.
pub trait ExternalModuleLoader {
    fn lookup_module(&self, name: &str) -> Option<ExternalModule>;

    /// Modules directly inside the namespace `namespace`
    fn lookup_namespace(&self, namespace: &str) -> Vec<ExternalModule>;

    /// Function implementing `operator` for `target_type` applied to
    /// `operand_types`
    fn lookup_operator(&self, operator: &str, target_type: &str, operand_types: &[&str]) -> Option<ExternalFunction>;
}

/// Loader that knows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullModuleLoader;

impl ExternalModuleLoader for NullModuleLoader {
    fn lookup_module(&self, _name: &str) -> Option<ExternalModule> {
        None
    }

    fn lookup_namespace(&self, _namespace: &str) -> Vec<ExternalModule> {
        Vec::new()
    }

    fn lookup_operator(&self, _operator: &str, _target_type: &str, _operand_types: &[&str]) -> Option<ExternalFunction> {
        None
    }
}

type OperatorKey = (String, String, Vec<String>);

/// In-memory loader
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: IndexMap<String, ExternalModule>,
    operators: IndexMap<OperatorKey, ExternalFunction>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_module(mut self, module: ExternalModule) -> Self {
        let key = SymbolName::new(&module.name).full_canonical_name();
        self.modules.insert(key, module);
        self
    }

    #[must_use]
    pub fn with_operator(
        mut self,
        operator: &str,
        target_type: &str,
        operand_types: &[&str],
        function: ExternalFunction,
    ) -> Self {
        self.operators
            .insert(operator_key(operator, target_type, operand_types), function);
        self
    }
}

fn operator_key(operator: &str, target_type: &str, operand_types: &[&str]) -> OperatorKey {
    (
        operator.to_owned(),
        SymbolName::new(target_type).full_canonical_name(),
        operand_types
            .iter()
            .map(|ty| SymbolName::new(ty).full_canonical_name())
            .collect(),
    )
}

impl ExternalModuleLoader for ModuleRegistry {
    fn lookup_module(&self, name: &str) -> Option<ExternalModule> {
        self.modules
            .get(&SymbolName::new(name).full_canonical_name())
            .cloned()
    }

    fn lookup_namespace(&self, namespace: &str) -> Vec<ExternalModule> {
        let namespace = SymbolName::new(namespace).full_canonical_name();
        self.modules
            .values()
            .filter(|module| SymbolName::new(&module.name).canonical_namespace().join(".") == namespace)
            .cloned()
            .collect()
    }

    fn lookup_operator(&self, operator: &str, target_type: &str, operand_types: &[&str]) -> Option<ExternalFunction> {
        self.operators
            .get(&operator_key(operator, target_type, operand_types))
            .cloned()
    }
}

/// Type named by a descriptor: a primitive, else a type visible from
/// `scope`, else the unresolved sentinel
fn external_type(symbols: &SymbolTable, scopes: &ScopeTree, scope: ScopeId, type_name: &str) -> TypeId {
    if let Some(primitive) = PrimitiveType::from_name(type_name) {
        return symbols.builtins().get(primitive);
    }
    scopes
        .try_lookup::<TypeId>(scope, &SymbolName::new(type_name))
        .unwrap_or_else(|| symbols.builtins().unresolved())
}

/// Allocate the symbols for an external function. Declaring it is up to the
/// caller.
pub fn import_function(
    symbols: &mut SymbolTable,
    scopes: &ScopeTree,
    scope: ScopeId,
    function: &ExternalFunction,
) -> FunctionId {
    let mut parameter_types = Vec::with_capacity(function.parameters.len());
    let parameters = function
        .parameters
        .iter()
        .map(|parameter| {
            let ty = external_type(symbols, scopes, scope, &parameter.type_name);
            parameter_types.push(ty);
            symbols.add_parameter(ParameterSymbol {
                name: SymbolName::new(&parameter.name),
                ty,
            })
        })
        .collect();
    let return_type = function
        .return_type
        .as_deref()
        .map_or(symbols.builtins().void(), |name| external_type(symbols, scopes, scope, name));
    let function_type = symbols.function_type(&parameter_types, return_type);

    symbols.add_function(FunctionSymbol {
        name: SymbolName::new(&function.name),
        type_parameters: Vec::new(),
        parameters,
        return_type,
        function_type,
        kind: FunctionKind::External,
        instance_of: None,
    })
}

/// Declare `module` globally (once) and make its functions visible from
/// `importing_scope`.
pub fn import_module(
    symbols: &mut SymbolTable,
    scopes: &mut ScopeTree,
    importing_scope: ScopeId,
    module: &ExternalModule,
) -> Result<ModuleId, ScopeError> {
    let global = scopes.global();
    let name = SymbolName::new(&module.name);
    let existing = scopes
        .get(global)
        .named(&name.full_canonical_name())
        .iter()
        .copied()
        .find_map(ModuleId::from_ref);

    let (module_id, module_scope) = match existing.and_then(|id| Some((id, scopes.owned_scope(id.into())?))) {
        Some(found) => found,
        None => {
            let module_id = symbols.add_module(ModuleSymbol {
                name,
                kind: ModuleKind::External,
            });
            scopes.try_declare(global, module_id.into(), symbols)?;
            let module_scope = scopes.create(global, ScopeKind::Module);
            for function in &module.functions {
                let function = import_function(symbols, scopes, module_scope, function);
                // identical signatures: the first one stays visible
                scopes.declare_or_keep(module_scope, function.into(), symbols)?;
            }
            scopes.freeze(module_scope);
            scopes.bind_owner(module_id.into(), module_scope);
            debug!(module = %module.name, functions = module.functions.len(), "imported module");
            (module_id, module_scope)
        }
    };

    scopes.add_import(importing_scope, module_scope)?;
    Ok(module_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn math() -> ExternalModule {
        ExternalModule::new("Std.Math")
            .with_function(ExternalFunction::new("sqrt", &[("value", "F64")], Some("F64")))
            .with_function(ExternalFunction::new("abs", &[("value", "i32")], Some("I32")))
    }

    #[test]
    fn test_registry_lookups() {
        let registry = ModuleRegistry::new()
            .with_module(math())
            .with_module(ExternalModule::new("Std.Text"))
            .with_module(ExternalModule::new("Other"))
            .with_operator(
                "+",
                "Money",
                &["Money", "Money"],
                ExternalFunction::new("add_money", &[("a", "Money"), ("b", "Money")], Some("Money")),
            );

        assert!(registry.lookup_module("std.math").is_some());
        assert!(registry.lookup_module("Std.Io").is_none());
        assert_eq!(registry.lookup_namespace("Std").len(), 2);
        assert!(registry.lookup_operator("+", "money", &["MONEY", "money"]).is_some());
        assert!(registry.lookup_operator("-", "Money", &["Money", "Money"]).is_none());
        assert!(NullModuleLoader.lookup_module("Std.Math").is_none());
    }

    #[test]
    fn test_operator_lookup_ignores_underscores() {
        let registry = ModuleRegistry::new().with_operator(
            "+",
            "MoneyValue",
            &["MoneyValue", "MoneyValue"],
            ExternalFunction::new("add_money", &[("a", "MoneyValue"), ("b", "MoneyValue")], Some("MoneyValue")),
        );

        let found = registry.lookup_operator("+", "Money_Value", &["Money_Value", "money_value"]);
        assert_eq!(found.map(|function| function.name), Some("add_money".to_owned()));
        assert!(registry.lookup_operator("+", "Money_Value", &["Money_Value", "I64"]).is_none());
    }

    #[test]
    fn test_import_makes_functions_visible() {
        let mut symbols = SymbolTable::new();
        let mut scopes = ScopeTree::new();
        let module_scope = scopes.create(scopes.global(), ScopeKind::Module);

        let first = import_module(&mut symbols, &mut scopes, module_scope, &math()).unwrap();
        let second = import_module(&mut symbols, &mut scopes, module_scope, &math()).unwrap();
        assert_eq!(first, second);

        let sqrt = scopes.lookup_functions(module_scope, &SymbolName::new("sqrt"));
        assert_eq!(sqrt.len(), 1);
        let function = symbols.function(sqrt[0]);
        assert_eq!(function.kind, FunctionKind::External);
        assert_eq!(symbols.type_name(function.function_type), "Fn<(F64):F64>");

        let qualified = scopes.lookup_functions(module_scope, &SymbolName::new("Std.Math.abs"));
        assert_eq!(qualified.len(), 1);
    }

    #[test]
    fn test_import_keeps_first_of_identical_signatures() {
        let mut symbols = SymbolTable::new();
        let mut scopes = ScopeTree::new();
        let module_scope = scopes.create(scopes.global(), ScopeKind::Module);
        let module = ExternalModule::new("Std.Dup")
            .with_function(ExternalFunction::new("round", &[("value", "F64")], Some("I64")))
            .with_function(ExternalFunction::new("round", &[("amount", "F64")], Some("I64")));

        assert!(import_module(&mut symbols, &mut scopes, module_scope, &module).is_ok());

        let round = scopes.lookup_functions(module_scope, &SymbolName::new("round"));
        assert_eq!(round.len(), 1);
        let parameter = symbols.function(round[0]).parameters[0];
        assert_eq!(symbols.parameter(parameter).name.canonical_name(), "value");
    }
}
