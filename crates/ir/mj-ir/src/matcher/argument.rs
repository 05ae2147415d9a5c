//! Call argument matching

use super::TypeArgumentMap;
use crate::expression_type::IrExpressionTypeRewriter;
use crate::node::IrArgument;
use crate::overload::is_implicitly_convertible;
use mj_diagnostics::{DiagnosticKind, DiagnosticList};
use mj_span::Location;
use mj_symbol::{FunctionId, ParameterId, SymbolTable};
use std::rc::Rc;

/// Pairs call arguments with parameters.
///
/// A call is matched by position unless any argument is named, in which case
/// every argument must be named. A positional argument inside such a call
/// reports `PositionalArgumentInNamedCall`.
pub struct IrArgumentMatcher<'a> {
    symbols: &'a mut SymbolTable,
    diagnostics: &'a mut DiagnosticList,
}

impl<'a> IrArgumentMatcher<'a> {
    pub fn new(symbols: &'a mut SymbolTable, diagnostics: &'a mut DiagnosticList) -> Self {
        Self {
            symbols,
            diagnostics,
        }
    }

    /// Arguments in parameter order with their parameter set and literals
    /// committed to the (substituted) parameter types. Arguments that could
    /// not be paired follow, without a parameter.
    pub fn match_arguments(
        &mut self,
        location: Location,
        function: FunctionId,
        type_arguments: &TypeArgumentMap,
        arguments: &[IrArgument],
    ) -> Vec<IrArgument> {
        let parameters = self.symbols.function(function).parameters.clone();
        let slots = if arguments.iter().any(|argument| argument.name.is_some()) {
            self.pair_by_name(location, function, &parameters, arguments)
        } else {
            self.pair_by_position(location, function, &parameters, arguments)
        };

        let mut matched = Vec::with_capacity(arguments.len());
        let mut used = vec![false; arguments.len()];
        for (parameter, slot) in parameters.iter().zip(slots) {
            if let Some(index) = slot {
                used[index] = true;
                matched.push(self.commit(*parameter, &arguments[index], type_arguments));
            }
        }
        matched.extend(
            arguments
                .iter()
                .zip(used)
                .filter(|(_, used)| !used)
                .map(|(argument, _)| argument.clone()),
        );
        matched
    }

    fn function_name(&self, function: FunctionId) -> String {
        self.symbols.function(function).name.full_original_name()
    }

    fn pair_by_position(
        &mut self,
        location: Location,
        function: FunctionId,
        parameters: &[ParameterId],
        arguments: &[IrArgument],
    ) -> Vec<Option<usize>> {
        let name = self.function_name(function);
        if parameters.len() != arguments.len() {
            self.diagnostics.add(
                location,
                DiagnosticKind::ArgumentCountMismatch {
                    name,
                    expected: parameters.len(),
                    actual: arguments.len(),
                },
            );
        }
        (0..parameters.len())
            .map(|index| (index < arguments.len()).then_some(index))
            .collect()
    }

    fn pair_by_name(
        &mut self,
        location: Location,
        function: FunctionId,
        parameters: &[ParameterId],
        arguments: &[IrArgument],
    ) -> Vec<Option<usize>> {
        let name_of_function = self.function_name(function);
        let mut slots: Vec<Option<usize>> = vec![None; parameters.len()];
        let mut reported = false;

        for (index, argument) in arguments.iter().enumerate() {
            let Some(name) = &argument.name else {
                self.diagnostics.add(
                    argument.location,
                    DiagnosticKind::PositionalArgumentInNamedCall {
                        function: name_of_function.clone(),
                    },
                );
                reported = true;
                continue;
            };

            let position = parameters.iter().position(|parameter| {
                self.symbols.parameter(*parameter).name.canonical_name() == name.canonical_name()
            });
            match position {
                None => {
                    self.diagnostics.add(
                        argument.location,
                        DiagnosticKind::NoParameterForNamedArgument {
                            function: name_of_function.clone(),
                            argument: name.value().to_owned(),
                        },
                    );
                    reported = true;
                }
                Some(slot) if slots[slot].is_some() => {
                    self.diagnostics.add(
                        argument.location,
                        DiagnosticKind::DuplicateNamedArgument {
                            argument: name.value().to_owned(),
                        },
                    );
                    reported = true;
                }
                Some(slot) => slots[slot] = Some(index),
            }
        }

        if !reported && slots.iter().any(Option::is_none) {
            self.diagnostics.add(
                location,
                DiagnosticKind::ArgumentCountMismatch {
                    name: name_of_function,
                    expected: parameters.len(),
                    actual: arguments.len(),
                },
            );
        }
        slots
    }

    fn commit(
        &mut self,
        parameter: ParameterId,
        argument: &IrArgument,
        type_arguments: &TypeArgumentMap,
    ) -> IrArgument {
        let declared = self.symbols.parameter(parameter).ty;
        let target = type_arguments.substitute(self.symbols, declared);

        let expression = if self.symbols.contains_type_parameter(target) {
            Rc::clone(&argument.expression)
        } else {
            let committed = IrExpressionTypeRewriter::new(self.symbols, target).rewrite(&argument.expression);
            if !is_implicitly_convertible(self.symbols, committed.ty, target) {
                self.diagnostics.add(
                    argument.location,
                    DiagnosticKind::ArgumentTypeMismatch {
                        parameter: self.symbols.parameter(parameter).name.full_original_name(),
                        expected: self.symbols.type_name(target),
                        actual: self.symbols.type_name(committed.ty),
                    },
                );
            }
            committed
        };

        IrArgument {
            location: argument.location,
            name: argument.name.clone(),
            parameter: Some(parameter),
            expression,
        }
    }
}
