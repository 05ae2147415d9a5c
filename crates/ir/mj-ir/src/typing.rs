//! Operator typing
//!
//! Shared by the builder and the resolve pass, which retypes operators whose
//! operands only became known after forward references were fixed up.

use crate::expression_type::IrExpressionTypeRewriter;
use crate::fold::{fold_binary, fold_unary};
use crate::inference::{committed_type, intersect, literal_type};
use crate::node::{IrExpression, IrExpressionKind};
use crate::overload::conversion_rank;
use mj_diagnostics::{DiagnosticKind, DiagnosticList};
use mj_span::Location;
use mj_symbol::{ConstantValue, PrimitiveType, SymbolTable, TypeId};
use mj_syntax::{BinaryOperator, OperatorCategory, UnaryOperator};
use std::rc::Rc;
use tracing::trace;

/// Computes result types of binary and unary expressions, committing
/// uncommitted literal operands and folding constants on the way.
pub struct OperatorTyper<'a> {
    symbols: &'a mut SymbolTable,
    diagnostics: &'a mut DiagnosticList,
    fold_constants: bool,
}

impl<'a> OperatorTyper<'a> {
    pub fn new(symbols: &'a mut SymbolTable, diagnostics: &'a mut DiagnosticList) -> Self {
        Self {
            symbols,
            diagnostics,
            fold_constants: true,
        }
    }

    #[must_use]
    pub fn fold_constants(mut self, fold_constants: bool) -> Self {
        self.fold_constants = fold_constants;
        self
    }

    /// Typed binary expression. An unresolved operand makes the result
    /// unresolved without a diagnostic; the operand already reported.
    pub fn binary(
        &mut self,
        location: Location,
        left: Rc<IrExpression>,
        operator: BinaryOperator,
        right: Rc<IrExpression>,
    ) -> IrExpression {
        if self.symbols.is_unresolved_type(left.ty) || self.symbols.is_unresolved_type(right.ty) {
            let unresolved = self.symbols.builtins().unresolved();
            return IrExpression::new(
                location,
                unresolved,
                IrExpressionKind::Binary {
                    left,
                    operator,
                    right,
                },
            );
        }

        let category = operator.category();
        let (left, right, operand_type) = if category == OperatorCategory::Logical {
            let boolean = self.symbols.builtins().bool();
            if !self.symbols.same_type(left.ty, boolean) || !self.symbols.same_type(right.ty, boolean) {
                self.mismatch(location, operator, &left, &right);
            }
            (left, right, Some(boolean))
        } else {
            self.unify(left, right)
        };

        let result = match operand_type {
            Some(operand_type) => {
                let is_bool = self.symbols.same_type(operand_type, self.symbols.builtins().bool());
                if is_bool && matches!(category, OperatorCategory::Arithmetic | OperatorCategory::Bitwise) {
                    self.mismatch(location, operator, &left, &right);
                }
                if category == OperatorCategory::Comparison {
                    self.symbols.builtins().bool()
                } else {
                    operand_type
                }
            }
            None => {
                self.mismatch(location, operator, &left, &right);
                self.symbols.builtins().unresolved()
            }
        };

        let constant = match (&left.constant, &right.constant) {
            (Some(first), Some(second)) if self.fold_constants && operand_type.is_some() => {
                fold_binary(operator, first, second)
            }
            _ => None,
        };
        // a folded literal result may no longer fit every operand candidate
        let ty = match &constant {
            Some(value) if self.symbols.ty(result).inferred_candidates().is_some() => {
                literal_type(self.symbols, value)
            }
            _ => result,
        };

        IrExpression::new(
            location,
            ty,
            IrExpressionKind::Binary {
                left,
                operator,
                right,
            },
        )
        .with_constant(constant)
    }

    /// Typed unary expression. Negating a numeric literal yields a literal.
    pub fn unary(&mut self, location: Location, operator: UnaryOperator, operand: Rc<IrExpression>) -> IrExpression {
        if let (UnaryOperator::Negate, IrExpressionKind::Literal(value)) = (operator, &operand.kind) {
            if let Some(negated) = fold_unary(operator, value) {
                let ty = if self.symbols.ty(operand.ty).inferred_candidates().is_some() {
                    literal_type(self.symbols, &negated)
                } else {
                    operand.ty
                };
                return IrExpression::literal(location, ty, negated);
            }
        }

        if operator == UnaryOperator::Not && !self.symbols.is_unresolved_type(operand.ty) {
            let boolean = self.symbols.builtins().bool();
            if !self.symbols.same_type(operand.ty, boolean) {
                self.diagnostics.add(
                    location,
                    DiagnosticKind::TypeMismatch {
                        expected: self.symbols.type_name(boolean),
                        actual: self.symbols.type_name(operand.ty),
                    },
                );
            }
        }

        let constant = operand
            .constant
            .as_ref()
            .filter(|_| self.fold_constants)
            .and_then(|value| fold_unary(operator, value));
        IrExpression::new(
            location,
            operand.ty,
            IrExpressionKind::Unary { operator, operand },
        )
        .with_constant(constant)
    }

    fn mismatch(&mut self, location: Location, operator: BinaryOperator, left: &IrExpression, right: &IrExpression) {
        self.diagnostics.add(
            location,
            DiagnosticKind::OperandTypeMismatch {
                operator: operator.text().to_owned(),
                left: self.symbols.type_name(left.ty),
                right: self.symbols.type_name(right.ty),
            },
        );
    }

    /// Common operand type, committing literals to the concrete side and
    /// widening numeric primitives
    fn unify(
        &mut self,
        left: Rc<IrExpression>,
        right: Rc<IrExpression>,
    ) -> (Rc<IrExpression>, Rc<IrExpression>, Option<TypeId>) {
        if self.symbols.same_type(left.ty, right.ty) {
            let ty = left.ty;
            return (left, right, Some(ty));
        }
        // checked again on every instance, once the parameter is substituted
        if self.symbols.contains_type_parameter(left.ty) {
            let ty = left.ty;
            return (left, right, Some(ty));
        }
        if self.symbols.contains_type_parameter(right.ty) {
            let ty = right.ty;
            return (left, right, Some(ty));
        }

        let left_candidates = self.symbols.ty(left.ty).inferred_candidates().map(<[_]>::to_vec);
        let right_candidates = self.symbols.ty(right.ty).inferred_candidates().map(<[_]>::to_vec);
        match (left_candidates, right_candidates) {
            (Some(first), Some(second)) => {
                let common = intersect(&first, &second);
                if common.is_empty() {
                    return (left, right, None);
                }
                let ty = self.symbols.inferred_type(common);
                let left = self.commit(&left, ty);
                let right = self.commit(&right, ty);
                (left, right, Some(ty))
            }
            (Some(_), None) => {
                let left = self.commit_or_default(&left, right.ty);
                let ty = self.widen(left.ty, right.ty);
                (left, right, ty)
            }
            (None, Some(_)) => {
                let right = self.commit_or_default(&right, left.ty);
                let ty = self.widen(left.ty, right.ty);
                (left, right, ty)
            }
            (None, None) => {
                let ty = self.widen(left.ty, right.ty);
                (left, right, ty)
            }
        }
    }

    fn commit(&self, expression: &Rc<IrExpression>, target: TypeId) -> Rc<IrExpression> {
        if self.symbols.primitive(target).is_none() {
            return Rc::clone(expression);
        }
        IrExpressionTypeRewriter::new(self.symbols, target).rewrite(expression)
    }

    /// Commit to `target`, or to the literal's preferred type when `target`
    /// cannot take it
    fn commit_or_default(&self, expression: &Rc<IrExpression>, target: TypeId) -> Rc<IrExpression> {
        let committed = self.commit(expression, target);
        if self.symbols.ty(committed.ty).inferred_candidates().is_none() {
            return committed;
        }
        let preferred = committed_type(self.symbols, committed.ty);
        trace!(ty = %self.symbols.type_name(target), "literal kept its preferred type");
        self.commit(&committed, preferred)
    }

    fn widen(&self, left: TypeId, right: TypeId) -> Option<TypeId> {
        if self.symbols.same_type(left, right) {
            return Some(left);
        }
        let (first, second) = (self.symbols.primitive(left)?, self.symbols.primitive(right)?);
        if !first.is_numeric() || !second.is_numeric() {
            return None;
        }
        if conversion_rank(first, second) > 0 {
            Some(right)
        } else if conversion_rank(second, first) > 0 {
            Some(left)
        } else {
            None
        }
    }
}

/// True when `ty` is a primitive integer or an uncommitted integer literal
pub fn is_integer_type(symbols: &SymbolTable, ty: TypeId) -> bool {
    match symbols.ty(ty).inferred_candidates() {
        Some(candidates) => candidates.iter().any(|candidate| candidate.is_integer()),
        None => symbols.primitive(ty).is_some_and(PrimitiveType::is_integer),
    }
}

/// Typed literal with its constant attached
pub fn literal(symbols: &mut SymbolTable, location: Location, value: ConstantValue) -> IrExpression {
    let ty = literal_type(symbols, &value);
    IrExpression::literal(location, ty, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integer(symbols: &mut SymbolTable, value: i128) -> Rc<IrExpression> {
        Rc::new(literal(symbols, Location::default(), ConstantValue::Integer(value)))
    }

    #[test]
    fn test_literals_fold_and_stay_uncommitted() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = DiagnosticList::new();
        let left = integer(&mut symbols, 100);
        let right = integer(&mut symbols, 100);

        let sum = OperatorTyper::new(&mut symbols, &mut diagnostics).binary(
            Location::default(),
            left,
            BinaryOperator::Add,
            right,
        );

        assert!(diagnostics.is_empty());
        assert_eq!(sum.constant, Some(ConstantValue::Integer(200)));
        let candidates = symbols.ty(sum.ty).inferred_candidates().unwrap();
        assert!(!candidates.contains(&PrimitiveType::I8));
        assert!(candidates.contains(&PrimitiveType::U8));
    }

    #[test]
    fn test_literal_commits_to_concrete_operand() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = DiagnosticList::new();
        let u16 = symbols.builtins().get(PrimitiveType::U16);
        let value = Rc::new(IrExpression::new(
            Location::default(),
            u16,
            IrExpressionKind::Literal(ConstantValue::Integer(7)),
        ));
        let one = integer(&mut symbols, 1);

        let sum = OperatorTyper::new(&mut symbols, &mut diagnostics)
            .fold_constants(false)
            .binary(Location::default(), value, BinaryOperator::Add, one);

        assert!(diagnostics.is_empty());
        assert_eq!(sum.ty, u16);
        assert_eq!(sum.constant, None);
        let IrExpressionKind::Binary { right, .. } = &sum.kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(right.ty, u16);
    }

    #[test]
    fn test_comparison_is_bool_and_widens() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = DiagnosticList::new();
        let i8 = symbols.builtins().get(PrimitiveType::I8);
        let i32 = symbols.builtins().i32();
        let left = Rc::new(IrExpression::new(
            Location::default(),
            i8,
            IrExpressionKind::Literal(ConstantValue::Integer(1)),
        ));
        let right = Rc::new(IrExpression::new(
            Location::default(),
            i32,
            IrExpressionKind::Literal(ConstantValue::Integer(2)),
        ));

        let compared = OperatorTyper::new(&mut symbols, &mut diagnostics).binary(
            Location::default(),
            left,
            BinaryOperator::Less,
            right,
        );

        assert!(diagnostics.is_empty());
        assert_eq!(compared.ty, symbols.builtins().bool());
    }

    #[test]
    fn test_mismatched_operands_are_reported() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = DiagnosticList::new();
        let text = Rc::new(literal(
            &mut symbols,
            Location::default(),
            ConstantValue::Str("a".to_owned()),
        ));
        let flag = Rc::new(literal(&mut symbols, Location::default(), ConstantValue::Bool(true)));
        let number = integer(&mut symbols, 3);

        let mut typer = OperatorTyper::new(&mut symbols, &mut diagnostics);
        let sum = typer.binary(Location::default(), Rc::clone(&text), BinaryOperator::Add, number);
        typer.binary(Location::default(), text, BinaryOperator::And, flag);

        assert_eq!(sum.ty, symbols.builtins().unresolved());
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.any(|kind| matches!(kind, DiagnosticKind::OperandTypeMismatch { operator, .. } if operator == "and")));
    }

    #[test]
    fn test_negative_literal_folds_into_literal() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = DiagnosticList::new();
        let operand = integer(&mut symbols, 128);

        let negated = OperatorTyper::new(&mut symbols, &mut diagnostics).unary(
            Location::default(),
            UnaryOperator::Negate,
            operand,
        );

        assert!(matches!(negated.kind, IrExpressionKind::Literal(ConstantValue::Integer(-128))));
        let candidates = symbols.ty(negated.ty).inferred_candidates().unwrap();
        assert!(candidates.contains(&PrimitiveType::I8));
        assert!(!candidates.contains(&PrimitiveType::U8));
    }

    #[test]
    fn test_type_parameter_operand_defers_checking() {
        use mj_symbol::{SymbolName, SymbolRef, TypeParameterKind, TypeSymbol};

        let mut symbols = SymbolTable::new();
        let mut diagnostics = DiagnosticList::new();
        let parameter = symbols.add_type(TypeSymbol::parameter(
            SymbolName::new("T"),
            TypeParameterKind::Template,
        ));
        let value = Rc::new(IrExpression::new(
            Location::default(),
            parameter,
            IrExpressionKind::Reference(SymbolRef::Type(parameter)),
        ));
        let one = integer(&mut symbols, 1);

        let sum = OperatorTyper::new(&mut symbols, &mut diagnostics).binary(
            Location::default(),
            value,
            BinaryOperator::Add,
            Rc::clone(&one),
        );

        assert!(diagnostics.is_empty());
        assert_eq!(sum.ty, parameter);
        let IrExpressionKind::Binary { right, .. } = &sum.kind else {
            panic!("expected a binary expression");
        };
        assert!(Rc::ptr_eq(right, &one));
    }
}
