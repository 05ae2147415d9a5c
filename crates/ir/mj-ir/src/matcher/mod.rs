//! Argument-to-parameter and field-initializer matching
//!
//! Both matchers pair call-site values with declared slots, substitute type
//! arguments into the declared types and commit literals to the result.

mod argument;
mod field;

pub use argument::IrArgumentMatcher;
pub use field::{find_field, IrFieldTypeMatcher};

use indexmap::IndexMap;
use mj_symbol::{SymbolTable, TypeId, TypeKind};

/// Type parameter -> type argument bindings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeArgumentMap {
    bindings: IndexMap<TypeId, TypeId>,
}

impl TypeArgumentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind parameters to arguments pairwise
    pub fn from_parameters(parameters: &[TypeId], arguments: &[TypeId]) -> Self {
        Self {
            bindings: parameters.iter().copied().zip(arguments.iter().copied()).collect(),
        }
    }

    pub fn insert(&mut self, parameter: TypeId, argument: TypeId) {
        self.bindings.insert(parameter, argument);
    }

    pub fn get(&self, parameter: TypeId) -> Option<TypeId> {
        self.bindings.get(&parameter).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Arguments for `parameters` in order, `None` if any is unbound
    pub fn arguments_for(&self, parameters: &[TypeId]) -> Option<Vec<TypeId>> {
        parameters.iter().map(|parameter| self.get(*parameter)).collect()
    }

    /// Replace bound parameters inside `ty`; function signatures and generic
    /// instances are re-interned with their substituted parts. A template
    /// type applied to concrete arguments becomes its template instance.
    pub fn substitute(&self, symbols: &mut SymbolTable, ty: TypeId) -> TypeId {
        if self.bindings.is_empty() {
            return ty;
        }
        let resolved = symbols.resolve_forward(ty);
        if let Some(argument) = self.get(resolved) {
            return argument;
        }

        match symbols.ty(resolved).kind.clone() {
            TypeKind::Function(function) => {
                let parameters: Vec<TypeId> = function
                    .parameters
                    .iter()
                    .map(|parameter| self.substitute(symbols, *parameter))
                    .collect();
                let return_type = self.substitute(symbols, function.return_type);
                if parameters == function.parameters && return_type == function.return_type {
                    return ty;
                }
                symbols.function_type(&parameters, return_type)
            }
            TypeKind::Instance(instance) => {
                let arguments: Vec<TypeId> = instance
                    .type_arguments
                    .iter()
                    .map(|argument| self.substitute(symbols, *argument))
                    .collect();
                if arguments == instance.type_arguments {
                    return ty;
                }
                let concrete = !arguments.iter().any(|argument| symbols.contains_type_parameter(*argument));
                if concrete && symbols.is_template_type(instance.definition) {
                    return crate::template::instantiate_type(symbols, instance.definition, &arguments)
                        .map_or(ty, |(instance, _)| instance);
                }
                symbols.generic_instance(instance.definition, arguments)
            }
            _ => ty,
        }
    }

    /// Bind the type parameters in `pattern` by structurally matching it
    /// against `actual`. Existing bindings are kept.
    pub fn infer(&mut self, symbols: &SymbolTable, pattern: TypeId, actual: TypeId) {
        let pattern = symbols.resolve_forward(pattern);
        match &symbols.ty(pattern).kind {
            TypeKind::Parameter(_) => {
                if !self.bindings.contains_key(&pattern) && !symbols.is_unresolved_type(actual) {
                    let committed = crate::inference::committed_type(symbols, actual);
                    self.bindings.insert(pattern, committed);
                }
            }
            TypeKind::Instance(expected) => {
                if let TypeKind::Instance(found) = &symbols.ty(actual).kind {
                    for (expected, found) in expected.type_arguments.iter().zip(&found.type_arguments) {
                        self.infer(symbols, *expected, *found);
                    }
                }
            }
            TypeKind::Function(expected) => {
                if let TypeKind::Function(found) = &symbols.ty(actual).kind {
                    for (expected, found) in expected.parameters.iter().zip(&found.parameters) {
                        self.infer(symbols, *expected, *found);
                    }
                    self.infer(symbols, expected.return_type, found.return_type);
                }
            }
            _ => {}
        }
    }
}
