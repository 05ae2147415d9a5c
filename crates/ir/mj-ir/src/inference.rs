//! Numeric literal inference
//!
//! A numeric literal starts out with the set of primitive types able to hold
//! its value, in [`PrimitiveType::LITERAL_PRIORITY`] order. Context commits
//! it to one of them; with no context the first candidate wins.

use mj_symbol::{ConstantValue, PrimitiveType, SymbolTable, TypeId};

/// Parse literal text: decimal, `0x`/`0o`/`0b` integers, floats with a
/// fraction or exponent. Underscore separators are ignored.
pub fn parse_number(text: &str) -> Option<ConstantValue> {
    let cleaned: String = text.chars().filter(|ch| *ch != '_').collect();
    let lower = cleaned.to_ascii_lowercase();

    let radix = [("0x", 16), ("0o", 8), ("0b", 2)]
        .into_iter()
        .find_map(|(prefix, radix)| lower.strip_prefix(prefix).map(|digits| (digits, radix)));
    if let Some((digits, radix)) = radix {
        return i128::from_str_radix(digits, radix)
            .ok()
            .map(ConstantValue::Integer);
    }

    if lower.contains(['.', 'e']) {
        return lower.parse::<f64>().ok().map(ConstantValue::Float);
    }
    lower.parse::<i128>().ok().map(ConstantValue::Integer)
}

/// Every type able to hold the value, in priority order
pub fn literal_candidates(value: &ConstantValue) -> Vec<PrimitiveType> {
    match value {
        ConstantValue::Integer(integer) => PrimitiveType::LITERAL_PRIORITY
            .into_iter()
            .filter(|primitive| primitive.can_hold_integer(*integer))
            .collect(),
        ConstantValue::Float(float) => PrimitiveType::LITERAL_PRIORITY
            .into_iter()
            .filter(|primitive| primitive.is_float() && primitive.can_hold_float(*float))
            .collect(),
        ConstantValue::Bool(_) => vec![PrimitiveType::Bool],
        ConstantValue::Str(_) => vec![PrimitiveType::Str],
    }
}

/// Highest-priority candidate
pub fn preferred_type(candidates: &[PrimitiveType]) -> Option<PrimitiveType> {
    PrimitiveType::LITERAL_PRIORITY
        .into_iter()
        .find(|primitive| candidates.contains(primitive))
}

/// Type a literal starts with
pub fn literal_type(symbols: &mut SymbolTable, value: &ConstantValue) -> TypeId {
    symbols.inferred_type(literal_candidates(value))
}

/// The type an uncommitted literal defaults to; other types pass through
pub fn committed_type(symbols: &SymbolTable, ty: TypeId) -> TypeId {
    symbols
        .ty(ty)
        .inferred_candidates()
        .and_then(preferred_type)
        .map_or(ty, |primitive| symbols.builtins().get(primitive))
}

/// Candidates present in both sets, in priority order
pub fn intersect(first: &[PrimitiveType], second: &[PrimitiveType]) -> Vec<PrimitiveType> {
    PrimitiveType::LITERAL_PRIORITY
        .into_iter()
        .filter(|primitive| first.contains(primitive) && second.contains(primitive))
        .collect()
}
