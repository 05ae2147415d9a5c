//! Overload selection
//!
//! Candidates are first filtered strictly: same base name, same arity and
//! every argument type either equal by name to its parameter type, an
//! uncommitted literal whose candidates include the parameter type, or bound
//! to a type parameter. When nothing passes, candidates are ranked with the
//! implicit widening table and the best total wins. Equal totals resolve to
//! the candidate declared first.

use mj_symbol::{FunctionId, PrimitiveType, SymbolName, SymbolTable, TypeId};
use tracing::trace;

pub const RANK_SAME: i32 = 100;
pub const RANK_TYPE_PARAMETER: i32 = 90;
pub const RANK_WIDEN: i32 = 75;
pub const RANK_SIGNED_WIDEN: i32 = 50;
pub const RANK_INTEGER_TO_FLOAT: i32 = 25;
pub const RANK_DISALLOWED: i32 = -100;

/// Rank of the implicit conversion `from -> to`
pub fn conversion_rank(from: PrimitiveType, to: PrimitiveType) -> i32 {
    if from == to {
        return RANK_SAME;
    }
    let wider = to.size_in_bytes() > from.size_in_bytes();
    if wider
        && ((from.is_signed() && to.is_signed())
            || (from.is_unsigned() && to.is_unsigned())
            || (from.is_float() && to.is_float()))
    {
        return RANK_WIDEN;
    }
    if wider && from.is_unsigned() && to.is_signed() {
        return RANK_SIGNED_WIDEN;
    }
    if from.is_integer() && to.is_float() {
        return RANK_INTEGER_TO_FLOAT;
    }
    RANK_DISALLOWED
}

/// Argument as seen by overload selection
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadArgument {
    pub name: Option<SymbolName>,
    pub ty: TypeId,
}

impl OverloadArgument {
    pub fn positional(ty: TypeId) -> Self {
        Self { name: None, ty }
    }
}

pub struct FunctionOverloadPicker<'a> {
    symbols: &'a SymbolTable,
}

impl<'a> FunctionOverloadPicker<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self { symbols }
    }

    /// Candidates that match without any implicit conversion
    pub fn select_candidates(
        &self,
        name: &SymbolName,
        candidates: &[FunctionId],
        arguments: &[OverloadArgument],
    ) -> Vec<FunctionId> {
        candidates
            .iter()
            .copied()
            .filter(|candidate| self.is_named(*candidate, name))
            .filter(|candidate| {
                self.pair_ranks(*candidate, arguments).is_some_and(|ranks| {
                    ranks
                        .iter()
                        .all(|rank| *rank == RANK_SAME || *rank == RANK_TYPE_PARAMETER)
                })
            })
            .collect()
    }

    /// Total rank of a candidate, `None` when any argument is disallowed
    pub fn rank(&self, candidate: FunctionId, arguments: &[OverloadArgument]) -> Option<i32> {
        let ranks = self.pair_ranks(candidate, arguments)?;
        if ranks.iter().any(|rank| *rank <= RANK_DISALLOWED) {
            return None;
        }
        Some(ranks.iter().sum())
    }

    /// Best candidate: strict matches first, then the ranked fallback
    pub fn pick(
        &self,
        name: &SymbolName,
        candidates: &[FunctionId],
        arguments: &[OverloadArgument],
    ) -> Option<FunctionId> {
        let strict = self.select_candidates(name, candidates, arguments);
        let pool: Vec<FunctionId> = if strict.is_empty() {
            candidates
                .iter()
                .copied()
                .filter(|candidate| self.is_named(*candidate, name))
                .collect()
        } else {
            strict
        };

        let mut best: Option<(FunctionId, i32)> = None;
        for candidate in pool {
            let Some(total) = self.rank(candidate, arguments) else {
                continue;
            };
            trace!(candidate = %self.symbols.function(candidate).name, total, "ranked overload");
            if best.is_none_or(|(_, best_total)| total > best_total) {
                best = Some((candidate, total));
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    fn is_named(&self, candidate: FunctionId, name: &SymbolName) -> bool {
        self.symbols.function(candidate).name.base_canonical_name() == name.base_canonical_name()
    }

    /// Per-parameter ranks, `None` when arity or argument names do not fit
    fn pair_ranks(&self, candidate: FunctionId, arguments: &[OverloadArgument]) -> Option<Vec<i32>> {
        let function = self.symbols.function(candidate);
        if function.parameters.len() != arguments.len() {
            return None;
        }

        let named = arguments.iter().any(|argument| argument.name.is_some());
        function
            .parameters
            .iter()
            .enumerate()
            .map(|(index, parameter)| {
                let parameter = self.symbols.parameter(*parameter);
                let argument = if named {
                    arguments.iter().find(|argument| {
                        argument
                            .name
                            .as_ref()
                            .is_some_and(|name| name.canonical_name() == parameter.name.canonical_name())
                    })?
                } else {
                    &arguments[index]
                };
                Some(self.pair_rank(argument.ty, parameter.ty))
            })
            .collect()
    }

    fn pair_rank(&self, argument: TypeId, parameter: TypeId) -> i32 {
        if self.symbols.contains_type_parameter(parameter) {
            return RANK_TYPE_PARAMETER;
        }
        if self.symbols.same_type(argument, parameter) {
            return RANK_SAME;
        }
        if self.symbols.is_unresolved_type(argument) {
            return 0;
        }

        let Some(target) = self.symbols.primitive(parameter) else {
            return RANK_DISALLOWED;
        };
        if let Some(candidates) = self.symbols.ty(argument).inferred_candidates() {
            if candidates.contains(&target) {
                return RANK_SAME;
            }
            return candidates
                .iter()
                .map(|candidate| conversion_rank(*candidate, target))
                .max()
                .unwrap_or(RANK_DISALLOWED);
        }
        self.symbols
            .primitive(argument)
            .map_or(RANK_DISALLOWED, |source| conversion_rank(source, target))
    }
}

/// True when a value of type `from` may be passed where `to` is expected.
/// Unresolved types and types mentioning a type parameter always convert;
/// the former were reported already and the latter are checked per instance.
pub fn is_implicitly_convertible(symbols: &SymbolTable, from: TypeId, to: TypeId) -> bool {
    if symbols.same_type(from, to) || symbols.is_unresolved_type(from) || symbols.is_unresolved_type(to) {
        return true;
    }
    if symbols.contains_type_parameter(from) || symbols.contains_type_parameter(to) {
        return true;
    }
    match (symbols.primitive(from), symbols.primitive(to)) {
        (Some(from), Some(to)) => conversion_rank(from, to) > 0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mj_symbol::{FunctionKind, FunctionSymbol, ParameterSymbol};

    fn declare(symbols: &mut SymbolTable, name: &str, parameters: &[(&str, PrimitiveType)]) -> FunctionId {
        let parameter_ids: Vec<_> = parameters
            .iter()
            .map(|(name, primitive)| {
                let ty = symbols.builtins().get(*primitive);
                symbols.add_parameter(ParameterSymbol {
                    name: SymbolName::new(name),
                    ty,
                })
            })
            .collect();
        let types: Vec<TypeId> = parameters
            .iter()
            .map(|(_, primitive)| symbols.builtins().get(*primitive))
            .collect();
        let void = symbols.builtins().void();
        let function_type = symbols.function_type(&types, void);
        symbols.add_function(FunctionSymbol {
            name: SymbolName::new(name),
            type_parameters: Vec::new(),
            parameters: parameter_ids,
            return_type: void,
            function_type,
            kind: FunctionKind::Declared,
            instance_of: None,
        })
    }

    #[test]
    fn test_rank_table() {
        assert_eq!(conversion_rank(PrimitiveType::I8, PrimitiveType::I16), RANK_WIDEN);
        assert_eq!(conversion_rank(PrimitiveType::I16, PrimitiveType::I16), RANK_SAME);
        assert_eq!(conversion_rank(PrimitiveType::I16, PrimitiveType::I8), RANK_DISALLOWED);
        assert_eq!(conversion_rank(PrimitiveType::U8, PrimitiveType::I16), RANK_SIGNED_WIDEN);
        assert_eq!(conversion_rank(PrimitiveType::U8, PrimitiveType::I8), RANK_DISALLOWED);
        assert_eq!(conversion_rank(PrimitiveType::I32, PrimitiveType::F64), RANK_INTEGER_TO_FLOAT);
        assert_eq!(conversion_rank(PrimitiveType::Str, PrimitiveType::I32), RANK_DISALLOWED);
    }

    #[test]
    fn test_i16_argument_picks_i32_overload() {
        let mut symbols = SymbolTable::new();
        let narrow = declare(&mut symbols, "f", &[("x", PrimitiveType::I8)]);
        let wide = declare(&mut symbols, "f", &[("x", PrimitiveType::I32)]);
        let i16 = symbols.builtins().get(PrimitiveType::I16);
        let picker = FunctionOverloadPicker::new(&symbols);
        let arguments = [OverloadArgument::positional(i16)];

        assert!(picker
            .select_candidates(&SymbolName::new("f"), &[narrow, wide], &arguments)
            .is_empty());
        assert_eq!(picker.rank(narrow, &arguments), None);
        assert_eq!(picker.rank(wide, &arguments), Some(RANK_WIDEN));
        assert_eq!(
            picker.pick(&SymbolName::new("f"), &[narrow, wide], &arguments),
            Some(wide)
        );
    }

    #[test]
    fn test_literal_matches_strictly() {
        let mut symbols = SymbolTable::new();
        let byte = declare(&mut symbols, "f", &[("x", PrimitiveType::U8)]);
        let text = declare(&mut symbols, "f", &[("x", PrimitiveType::Str)]);
        let literal = crate::inference::literal_type(&mut symbols, &mj_symbol::ConstantValue::Integer(7));
        let picker = FunctionOverloadPicker::new(&symbols);
        let arguments = [OverloadArgument::positional(literal)];

        assert_eq!(
            picker.select_candidates(&SymbolName::new("f"), &[byte, text], &arguments),
            vec![byte]
        );
    }

    #[test]
    fn test_equal_rank_resolves_to_first_declared() {
        let mut symbols = SymbolTable::new();
        let first = declare(&mut symbols, "g", &[("x", PrimitiveType::I32), ("y", PrimitiveType::I64)]);
        let second = declare(&mut symbols, "g", &[("x", PrimitiveType::I64), ("y", PrimitiveType::I32)]);
        let i16 = symbols.builtins().get(PrimitiveType::I16);
        let picker = FunctionOverloadPicker::new(&symbols);
        let arguments = [OverloadArgument::positional(i16), OverloadArgument::positional(i16)];

        assert_eq!(
            picker.pick(&SymbolName::new("g"), &[first, second], &arguments),
            Some(first)
        );
        assert_eq!(
            picker.pick(&SymbolName::new("g"), &[second, first], &arguments),
            Some(second)
        );
    }

    #[test]
    fn test_named_arguments_reorder() {
        let mut symbols = SymbolTable::new();
        let function = declare(&mut symbols, "f", &[("a", PrimitiveType::I32), ("b", PrimitiveType::Str)]);
        let i32 = symbols.builtins().i32();
        let text = symbols.builtins().str();
        let picker = FunctionOverloadPicker::new(&symbols);
        let arguments = [
            OverloadArgument {
                name: Some(SymbolName::new("b")),
                ty: text,
            },
            OverloadArgument {
                name: Some(SymbolName::new("a")),
                ty: i32,
            },
        ];

        assert_eq!(picker.rank(function, &arguments), Some(2 * RANK_SAME));
    }
}
