//! Declaration nodes

use super::{IrCodeBlock, IrExpression, IrType};
use crate::scope::ScopeId;
use mj_span::Location;
use mj_symbol::{EnumId, FieldId, FunctionId, ParameterId, RuleId, TypeId, VariableId};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrTypeParameter {
    pub location: Location,
    pub ty: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrParameter {
    pub location: Location,
    pub symbol: ParameterId,
    pub ty: IrType,
}

/// Function declaration; `scope` holds its type parameters and parameters
#[derive(Debug, Clone)]
pub struct IrDeclarationFunction {
    pub location: Location,
    pub symbol: FunctionId,
    pub scope: ScopeId,
    pub type_parameters: Vec<IrTypeParameter>,
    pub parameters: Vec<IrParameter>,
    pub return_type: IrType,
    pub body: Rc<IrCodeBlock>,
}

#[derive(Debug, Clone)]
pub struct IrEnumMember {
    pub location: Location,
    pub symbol: EnumId,
    pub value: Option<Rc<IrExpression>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrField {
    pub location: Location,
    pub symbol: FieldId,
    pub ty: IrType,
}

#[derive(Debug, Clone)]
pub struct IrRule {
    pub location: Location,
    pub symbol: RuleId,
    pub arguments: Vec<Rc<IrExpression>>,
}

/// Type declaration; `scope` holds its type parameters, enums and fields
#[derive(Debug, Clone)]
pub struct IrDeclarationType {
    pub location: Location,
    pub symbol: TypeId,
    pub scope: ScopeId,
    pub type_parameters: Vec<IrTypeParameter>,
    pub base_type: Option<IrType>,
    pub enums: Vec<IrEnumMember>,
    pub fields: Vec<IrField>,
    pub rules: Vec<IrRule>,
}

#[derive(Debug, Clone)]
pub struct IrDeclarationVariable {
    pub location: Location,
    pub symbol: VariableId,
    pub ty: IrType,
    pub initializer: Option<Rc<IrExpression>>,
}
