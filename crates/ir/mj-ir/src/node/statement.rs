//! Statement nodes

use super::{IrDeclarationVariable, IrExpression};
use crate::scope::ScopeId;
use mj_span::Location;
use mj_symbol::{FieldId, SymbolName, SymbolRef};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct IrStatement {
    pub location: Location,
    pub kind: IrStatementKind,
}

#[derive(Debug, Clone)]
pub enum IrStatementKind {
    VariableDeclaration(Rc<IrDeclarationVariable>),
    Assignment {
        target: IrAssignmentTarget,
        value: Rc<IrExpression>,
    },
    Expression(Rc<IrExpression>),
    Return(Option<Rc<IrExpression>>),
    If(Rc<IrIf>),
    Loop(Rc<IrLoop>),
}

/// Left-hand side of an assignment
#[derive(Debug, Clone)]
pub enum IrAssignmentTarget {
    /// Variable or parameter
    Symbol(SymbolRef),
    /// `target.member = value`; `field` stays empty until the target type
    /// is known
    Field {
        target: Rc<IrExpression>,
        member: SymbolName,
        field: Option<FieldId>,
    },
    /// `_ = f()`
    Discard,
}

#[derive(Debug, Clone)]
pub struct IrIf {
    pub location: Location,
    pub condition: Rc<IrExpression>,
    pub then_block: Rc<IrCodeBlock>,
    pub else_branch: Option<IrElse>,
}

#[derive(Debug, Clone)]
pub enum IrElse {
    If(Rc<IrIf>),
    Block(Rc<IrCodeBlock>),
}

#[derive(Debug, Clone)]
pub struct IrLoop {
    pub location: Location,
    pub kind: IrLoopKind,
    pub body: Rc<IrCodeBlock>,
}

#[derive(Debug, Clone)]
pub enum IrLoopKind {
    Infinite,
    While(Rc<IrExpression>),
    Count(Rc<IrExpression>),
}

/// Statements of a body with the scope they were declared in
#[derive(Debug, Clone)]
pub struct IrCodeBlock {
    pub location: Location,
    pub scope: ScopeId,
    pub statements: Vec<Rc<IrStatement>>,
}

impl IrStatement {
    pub fn new(location: Location, kind: IrStatementKind) -> Self {
        Self { location, kind }
    }
}

impl IrCodeBlock {
    /// True when every path through the block ends in a `return` or never
    /// leaves an infinite loop
    pub fn always_returns(&self) -> bool {
        self.statements.iter().any(|statement| statement.always_returns())
    }
}

impl IrStatement {
    pub fn always_returns(&self) -> bool {
        match &self.kind {
            IrStatementKind::Return(_) => true,
            IrStatementKind::If(branch) => branch.always_returns(),
            IrStatementKind::Loop(body) => matches!(body.kind, IrLoopKind::Infinite),
            _ => false,
        }
    }
}

impl IrIf {
    pub fn always_returns(&self) -> bool {
        let otherwise = match &self.else_branch {
            Some(IrElse::If(branch)) => branch.always_returns(),
            Some(IrElse::Block(block)) => block.always_returns(),
            None => false,
        };
        otherwise && self.then_block.always_returns()
    }
}
