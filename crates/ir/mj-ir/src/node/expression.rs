//! Expression nodes

use super::IrType;
use mj_span::Location;
use mj_symbol::{ConstantValue, FieldId, FunctionId, ParameterId, SymbolName, SymbolRef, TypeId};
use mj_syntax::{BinaryOperator, UnaryOperator};
use std::rc::Rc;

/// Typed expression with an optional folded constant
#[derive(Debug, Clone)]
pub struct IrExpression {
    pub location: Location,
    pub ty: TypeId,
    pub constant: Option<ConstantValue>,
    pub kind: IrExpressionKind,
}

#[derive(Debug, Clone)]
pub enum IrExpressionKind {
    Literal(ConstantValue),
    /// Variable, parameter, enum member or function used as a value
    Reference(SymbolRef),
    Invocation(IrInvocation),
    TypeInitializer(IrTypeInitializer),
    Binary {
        left: Rc<IrExpression>,
        operator: BinaryOperator,
        right: Rc<IrExpression>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Rc<IrExpression>,
    },
    /// `target.member`; `field` stays empty until the target type is known
    MemberAccess {
        target: Rc<IrExpression>,
        member: SymbolName,
        field: Option<FieldId>,
    },
}

#[derive(Debug, Clone)]
pub struct IrInvocation {
    pub function: FunctionId,
    pub type_arguments: Vec<IrType>,
    /// In parameter order once matched, call order before that
    pub arguments: Vec<IrArgument>,
}

#[derive(Debug, Clone)]
pub struct IrArgument {
    pub location: Location,
    pub name: Option<SymbolName>,
    /// Parameter the argument was matched to
    pub parameter: Option<ParameterId>,
    pub expression: Rc<IrExpression>,
}

#[derive(Debug, Clone)]
pub struct IrTypeInitializer {
    pub ty: IrType,
    pub fields: Vec<IrTypeInitializerField>,
}

#[derive(Debug, Clone)]
pub struct IrTypeInitializerField {
    pub location: Location,
    pub name: SymbolName,
    pub field: Option<FieldId>,
    pub expression: Rc<IrExpression>,
}

impl IrExpression {
    pub fn new(location: Location, ty: TypeId, kind: IrExpressionKind) -> Self {
        Self {
            location,
            ty,
            constant: None,
            kind,
        }
    }

    pub fn literal(location: Location, ty: TypeId, value: ConstantValue) -> Self {
        Self {
            location,
            ty,
            constant: Some(value.clone()),
            kind: IrExpressionKind::Literal(value),
        }
    }

    #[must_use]
    pub fn with_constant(mut self, constant: Option<ConstantValue>) -> Self {
        self.constant = constant;
        self
    }

    pub fn is_invocation(&self) -> bool {
        matches!(self.kind, IrExpressionKind::Invocation(_))
    }

    pub fn as_invocation(&self) -> Option<&IrInvocation> {
        match &self.kind {
            IrExpressionKind::Invocation(invocation) => Some(invocation),
            _ => None,
        }
    }
}

impl IrArgument {
    pub fn new(location: Location, name: Option<SymbolName>, expression: Rc<IrExpression>) -> Self {
        Self {
            location,
            name,
            parameter: None,
            expression,
        }
    }
}
