//! IR node set
//!
//! Nodes are immutable and shared through [`Rc`]. A pass that changes a node
//! builds a new one; unchanged subtrees keep their allocation, so old and new
//! trees share everything the pass did not touch. Every node keeps the
//! [`Location`] of the syntax it was built from.

mod declaration;
mod expression;
mod statement;

pub use declaration::{
    IrDeclarationFunction, IrDeclarationType, IrDeclarationVariable, IrEnumMember, IrField,
    IrParameter, IrRule, IrTypeParameter,
};
pub use expression::{
    IrArgument, IrExpression, IrExpressionKind, IrInvocation, IrTypeInitializer,
    IrTypeInitializerField,
};
pub use statement::{
    IrAssignmentTarget, IrCodeBlock, IrElse, IrIf, IrLoop, IrLoopKind, IrStatement,
    IrStatementKind,
};

use crate::scope::ScopeId;
use mj_span::Location;
use mj_symbol::{SymbolName, TypeId};
use std::rc::Rc;

/// A type reference written in source, or synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrType {
    pub location: Location,
    pub ty: TypeId,
}

impl IrType {
    pub fn new(location: Location, ty: TypeId) -> Self {
        Self { location, ty }
    }
}

/// Module-level entry
#[derive(Debug, Clone)]
pub enum IrItem {
    Function(Rc<IrDeclarationFunction>),
    Type(Rc<IrDeclarationType>),
    Statement(Rc<IrStatement>),
}

impl IrItem {
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Function(first), Self::Function(second)) => Rc::ptr_eq(first, second),
            (Self::Type(first), Self::Type(second)) => Rc::ptr_eq(first, second),
            (Self::Statement(first), Self::Statement(second)) => Rc::ptr_eq(first, second),
            _ => false,
        }
    }
}

/// Root of the IR tree
#[derive(Debug, Clone)]
pub struct IrModule {
    pub location: Location,
    pub name: SymbolName,
    pub scope: ScopeId,
    /// Declarations and statements in source order, followed by template
    /// instances
    pub items: Vec<IrItem>,
}

impl IrModule {
    pub fn functions(&self) -> impl Iterator<Item = &Rc<IrDeclarationFunction>> {
        self.items.iter().filter_map(|item| match item {
            IrItem::Function(function) => Some(function),
            _ => None,
        })
    }

    pub fn types(&self) -> impl Iterator<Item = &Rc<IrDeclarationType>> {
        self.items.iter().filter_map(|item| match item {
            IrItem::Type(declaration) => Some(declaration),
            _ => None,
        })
    }
}

/// Pointer equality over two lists of shared nodes
pub fn all_ptr_eq<T>(first: &[Rc<T>], second: &[Rc<T>]) -> bool {
    first.len() == second.len()
        && first
            .iter()
            .zip(second)
            .all(|(left, right)| Rc::ptr_eq(left, right))
}
