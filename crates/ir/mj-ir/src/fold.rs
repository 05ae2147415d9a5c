//! Compile-time folding of constant operands

use mj_symbol::ConstantValue;
use mj_syntax::{BinaryOperator, UnaryOperator};

pub fn fold_unary(operator: UnaryOperator, operand: &ConstantValue) -> Option<ConstantValue> {
    match (operator, operand) {
        (UnaryOperator::Negate, ConstantValue::Integer(value)) => value.checked_neg().map(ConstantValue::Integer),
        (UnaryOperator::Negate, ConstantValue::Float(value)) => Some(ConstantValue::Float(-value)),
        (UnaryOperator::Not, ConstantValue::Bool(value)) => Some(ConstantValue::Bool(!value)),
        (UnaryOperator::BitNot, ConstantValue::Integer(value)) => Some(ConstantValue::Integer(!value)),
        _ => None,
    }
}

/// Fold two constants. Division by zero and overflow do not fold.
pub fn fold_binary(
    operator: BinaryOperator,
    left: &ConstantValue,
    right: &ConstantValue,
) -> Option<ConstantValue> {
    use ConstantValue::{Bool, Float, Integer};

    let folded = match (left, right) {
        (Integer(left), Integer(right)) => fold_integers(operator, *left, *right),
        (Bool(left), Bool(right)) => match operator {
            BinaryOperator::And => Some(Bool(*left && *right)),
            BinaryOperator::Or => Some(Bool(*left || *right)),
            BinaryOperator::Equals => Some(Bool(left == right)),
            BinaryOperator::NotEquals => Some(Bool(left != right)),
            _ => None,
        },
        _ if left.is_numeric() && right.is_numeric() => {
            let (left, right) = (left.as_float()?, right.as_float()?);
            fold_floats(operator, left, right)
        }
        _ => None,
    };
    folded.filter(|value| !matches!(value, Float(float) if !float.is_finite()))
}

fn fold_integers(operator: BinaryOperator, left: i128, right: i128) -> Option<ConstantValue> {
    use ConstantValue::{Bool, Integer};

    let value = match operator {
        BinaryOperator::Add => Integer(left.checked_add(right)?),
        BinaryOperator::Subtract => Integer(left.checked_sub(right)?),
        BinaryOperator::Multiply => Integer(left.checked_mul(right)?),
        BinaryOperator::Divide => Integer(left.checked_div(right)?),
        BinaryOperator::Modulo => Integer(left.checked_rem(right)?),
        BinaryOperator::Power => Integer(left.checked_pow(u32::try_from(right).ok()?)?),
        BinaryOperator::BitAnd => Integer(left & right),
        BinaryOperator::BitOr => Integer(left | right),
        BinaryOperator::BitXor => Integer(left ^ right),
        BinaryOperator::ShiftLeft => Integer(left.checked_shl(u32::try_from(right).ok()?)?),
        BinaryOperator::ShiftRight => Integer(left.checked_shr(u32::try_from(right).ok()?)?),
        BinaryOperator::Equals => Bool(left == right),
        BinaryOperator::NotEquals => Bool(left != right),
        BinaryOperator::Less => Bool(left < right),
        BinaryOperator::LessOrEqual => Bool(left <= right),
        BinaryOperator::Greater => Bool(left > right),
        BinaryOperator::GreaterOrEqual => Bool(left >= right),
        BinaryOperator::And | BinaryOperator::Or => return None,
    };
    Some(value)
}

fn fold_floats(operator: BinaryOperator, left: f64, right: f64) -> Option<ConstantValue> {
    use ConstantValue::{Bool, Float};

    let value = match operator {
        BinaryOperator::Add => Float(left + right),
        BinaryOperator::Subtract => Float(left - right),
        BinaryOperator::Multiply => Float(left * right),
        BinaryOperator::Divide if right != 0.0 => Float(left / right),
        BinaryOperator::Power => Float(left.powf(right)),
        BinaryOperator::Less => Bool(left < right),
        BinaryOperator::LessOrEqual => Bool(left <= right),
        BinaryOperator::Greater => Bool(left > right),
        BinaryOperator::GreaterOrEqual => Bool(left >= right),
        _ => return None,
    };
    Some(value)
}
