//! Top-down literal commitment
//!
//! Type information for literals flows from context into the leaves: a
//! declared variable type, a parameter type or the other operand decides
//! which candidate an uncommitted literal takes. [`IrExpressionTypeRewriter`]
//! pushes a target type down an expression and retypes every uncommitted
//! literal on the way. Expressions whose type is already concrete are left
//! alone, as are targets a literal cannot take (a float literal never
//! becomes an integer); the caller reports the mismatch.

use crate::node::{IrExpression, IrExpressionKind};
use crate::rewriter::IrRewriter;
use mj_symbol::{ConstantValue, PrimitiveType, SymbolTable, TypeId};
use std::rc::Rc;
use tracing::trace;

pub struct IrExpressionTypeRewriter<'a> {
    symbols: &'a SymbolTable,
    target: TypeId,
}

impl<'a> IrExpressionTypeRewriter<'a> {
    pub fn new(symbols: &'a SymbolTable, target: TypeId) -> Self {
        Self { symbols, target }
    }

    /// Commit `expression` to the target type where possible
    pub fn rewrite(&mut self, expression: &Rc<IrExpression>) -> Rc<IrExpression> {
        self.rewrite_expression(expression)
    }

    fn target_primitive(&self, candidates: &[PrimitiveType]) -> Option<PrimitiveType> {
        let target = self.symbols.primitive(self.target)?;
        if candidates.contains(&target) {
            return Some(target);
        }
        let integer_literal = candidates.iter().any(|candidate| candidate.is_integer());
        let accepts = target.is_float() || (target.is_integer() && integer_literal);
        accepts.then_some(target)
    }
}

impl IrRewriter for IrExpressionTypeRewriter<'_> {
    fn rewrite_expression(&mut self, expression: &Rc<IrExpression>) -> Rc<IrExpression> {
        let Some(candidates) = self.symbols.ty(expression.ty).inferred_candidates() else {
            return Rc::clone(expression);
        };
        let Some(target) = self.target_primitive(candidates) else {
            return Rc::clone(expression);
        };

        let kind = match &expression.kind {
            IrExpressionKind::Literal(value) => IrExpressionKind::Literal(convert(value, target)),
            IrExpressionKind::Binary {
                left,
                operator,
                right,
            } => IrExpressionKind::Binary {
                left: self.rewrite_expression(left),
                operator: *operator,
                right: self.rewrite_expression(right),
            },
            IrExpressionKind::Unary { operator, operand } => IrExpressionKind::Unary {
                operator: *operator,
                operand: self.rewrite_expression(operand),
            },
            other => other.clone(),
        };
        trace!(ty = target.name(), "committed literal type");

        Rc::new(IrExpression {
            location: expression.location,
            ty: self.symbols.builtins().get(target),
            constant: expression.constant.as_ref().map(|value| convert(value, target)),
            kind,
        })
    }
}

/// Integer constants committed to a float type become floats
fn convert(value: &ConstantValue, target: PrimitiveType) -> ConstantValue {
    match value {
        ConstantValue::Integer(integer) if target.is_float() => ConstantValue::Float(*integer as f64),
        other => other.clone(),
    }
}
