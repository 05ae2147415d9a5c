//! Call binding
//!
//! Turns a call site with a known candidate set into a bound invocation:
//! overload choice, type-argument binding, template instance lookup and
//! argument matching. The builder binds calls whose target is already
//! declared; the resolve pass binds the forward ones with the same code.

use crate::matcher::{IrArgumentMatcher, TypeArgumentMap};
use crate::node::IrArgument;
use crate::overload::{FunctionOverloadPicker, OverloadArgument};
use crate::template::{instantiate_function, TemplateInstantiation};
use mj_diagnostics::{DiagnosticKind, DiagnosticList};
use mj_span::Location;
use mj_symbol::{FunctionId, FunctionSymbol, SymbolName, SymbolTable, TypeId};

/// Result of binding one call
#[derive(Debug, Clone)]
pub struct BoundCall {
    /// The picked overload, or its template instance
    pub function: FunctionId,
    /// In parameter order, see [`IrArgumentMatcher::match_arguments`]
    pub arguments: Vec<IrArgument>,
    /// Return type with the type arguments substituted
    pub ty: TypeId,
    /// Set when binding created a new template instance
    pub instantiation: Option<TemplateInstantiation>,
}

pub struct IrCallBinder<'a> {
    symbols: &'a mut SymbolTable,
    diagnostics: &'a mut DiagnosticList,
    depth: usize,
}

impl<'a> IrCallBinder<'a> {
    pub fn new(symbols: &'a mut SymbolTable, diagnostics: &'a mut DiagnosticList) -> Self {
        Self {
            symbols,
            diagnostics,
            depth: 0,
        }
    }

    /// Instantiation depth recorded on instances this binder creates
    #[must_use]
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Bind a call to `name` among `candidates`; `None` when there are none
    pub fn bind(
        &mut self,
        location: Location,
        name: &SymbolName,
        candidates: &[FunctionId],
        explicit: &[TypeId],
        arguments: &[IrArgument],
    ) -> Option<BoundCall> {
        let function = self.pick_overload(name, candidates, arguments)?;
        let (function, map, instantiation) = self.bind_type_arguments(location, function, explicit, arguments);

        let arguments =
            IrArgumentMatcher::new(self.symbols, self.diagnostics).match_arguments(location, function, &map, arguments);
        let return_type = self.symbols.function(function).return_type;
        let ty = map.substitute(self.symbols, return_type);

        Some(BoundCall {
            function,
            arguments,
            ty,
            instantiation,
        })
    }

    /// Best overload for the arguments. When nothing ranks, the first
    /// candidate with the right arity (else the first candidate) is kept so
    /// the matcher reports what is wrong with the call.
    fn pick_overload(
        &self,
        name: &SymbolName,
        candidates: &[FunctionId],
        arguments: &[IrArgument],
    ) -> Option<FunctionId> {
        let overload_arguments: Vec<OverloadArgument> = arguments
            .iter()
            .map(|argument| OverloadArgument {
                name: argument.name.clone(),
                ty: argument.expression.ty,
            })
            .collect();
        if let Some(picked) = FunctionOverloadPicker::new(self.symbols).pick(name, candidates, &overload_arguments) {
            return Some(picked);
        }
        candidates
            .iter()
            .copied()
            .find(|candidate| self.symbols.function(*candidate).parameters.len() == arguments.len())
            .or_else(|| candidates.first().copied())
    }

    /// Bind the type parameters of `function` from explicit type arguments
    /// or from the argument types. A template with every argument concrete
    /// is swapped for its instance, which needs no further substitution.
    fn bind_type_arguments(
        &mut self,
        location: Location,
        function: FunctionId,
        explicit: &[TypeId],
        arguments: &[IrArgument],
    ) -> (FunctionId, TypeArgumentMap, Option<TemplateInstantiation>) {
        let symbol = self.symbols.function(function).clone();
        if symbol.type_parameters.is_empty() {
            if !explicit.is_empty() {
                self.diagnostics.add(
                    location,
                    DiagnosticKind::NotATemplate {
                        name: symbol.name.full_original_name(),
                    },
                );
            }
            return (function, TypeArgumentMap::new(), None);
        }

        let map = if explicit.is_empty() {
            infer_type_arguments(self.symbols, &symbol, arguments)
        } else {
            if explicit.len() != symbol.type_parameters.len() {
                self.diagnostics.add(
                    location,
                    DiagnosticKind::TypeArgumentCountMismatch {
                        name: symbol.name.full_original_name(),
                        expected: symbol.type_parameters.len(),
                        actual: explicit.len(),
                    },
                );
            }
            TypeArgumentMap::from_parameters(&symbol.type_parameters, explicit)
        };

        if !self.symbols.is_template_function(function) {
            return (function, map, None);
        }
        let Some(type_arguments) = map.arguments_for(&symbol.type_parameters) else {
            return (function, map, None);
        };
        let concrete = !type_arguments.iter().any(|argument| {
            self.symbols.contains_type_parameter(*argument) || self.symbols.is_unresolved_type(*argument)
        });
        if !concrete {
            return (function, map, None);
        }

        let (instance, created) = instantiate_function(self.symbols, function, &type_arguments);
        let instantiation = created.then(|| TemplateInstantiation {
            location,
            template: function.into(),
            instance: instance.into(),
            type_arguments,
            depth: self.depth,
        });
        (instance, TypeArgumentMap::new(), instantiation)
    }
}

/// Type arguments of `function` inferred from call arguments, matched by
/// name when the call names them and by position otherwise
pub fn infer_type_arguments(
    symbols: &SymbolTable,
    function: &FunctionSymbol,
    arguments: &[IrArgument],
) -> TypeArgumentMap {
    let named = arguments.iter().any(|argument| argument.name.is_some());
    let mut map = TypeArgumentMap::new();
    for (index, parameter) in function.parameters.iter().enumerate() {
        let parameter = symbols.parameter(*parameter);
        let argument = if named {
            arguments
                .iter()
                .find(|argument| argument.name.as_ref() == Some(&parameter.name))
        } else {
            arguments.get(index)
        };
        if let Some(argument) = argument {
            map.infer(symbols, parameter.ty, argument.expression.ty);
        }
    }
    map
}
