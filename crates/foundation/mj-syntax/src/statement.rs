//! Statement nodes

use crate::{ExpressionSyntax, Location, VariableSyntax};

/// `{ ... }` body of a function, branch or loop
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeBlockSyntax {
    pub location: Location,
    pub statements: Vec<StatementSyntax>,
}

impl CodeBlockSyntax {
    pub fn new(statements: Vec<StatementSyntax>) -> Self {
        Self {
            location: Location::default(),
            statements,
        }
    }
}

/// Statement variants
#[derive(Debug, Clone, PartialEq)]
pub enum StatementSyntax {
    Variable(VariableSyntax),
    Assignment(AssignmentSyntax),
    Expression(ExpressionSyntax),
    Return(ReturnSyntax),
    If(IfSyntax),
    Loop(LoopSyntax),
}

impl StatementSyntax {
    pub fn location(&self) -> Location {
        match self {
            Self::Variable(variable) => variable.location,
            Self::Assignment(assignment) => assignment.location,
            Self::Expression(expression) => expression.location,
            Self::Return(ret) => ret.location,
            Self::If(branch) => branch.location,
            Self::Loop(lp) => lp.location,
        }
    }

    /// `target = value`; a `_` target discards the value
    pub fn assign(target: ExpressionSyntax, value: ExpressionSyntax) -> Self {
        Self::Assignment(AssignmentSyntax {
            location: target.location,
            target,
            value,
        })
    }

    pub fn ret(value: Option<ExpressionSyntax>) -> Self {
        Self::Return(ReturnSyntax {
            location: Location::default(),
            value,
        })
    }

    pub fn expression(expression: ExpressionSyntax) -> Self {
        Self::Expression(expression)
    }
}

impl From<VariableSyntax> for StatementSyntax {
    fn from(variable: VariableSyntax) -> Self {
        Self::Variable(variable)
    }
}

/// Assignment to a variable, a field (`a.b = v`) or the discard (`_ = f()`)
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentSyntax {
    pub location: Location,
    pub target: ExpressionSyntax,
    pub value: ExpressionSyntax,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSyntax {
    pub location: Location,
    pub value: Option<ExpressionSyntax>,
}

/// `if cond { } else if cond { } else { }`
#[derive(Debug, Clone, PartialEq)]
pub struct IfSyntax {
    pub location: Location,
    pub condition: ExpressionSyntax,
    pub then_block: CodeBlockSyntax,
    pub else_branch: Option<ElseSyntax>,
}

impl IfSyntax {
    pub fn new(condition: ExpressionSyntax, then_block: CodeBlockSyntax) -> Self {
        Self {
            location: condition.location,
            condition,
            then_block,
            else_branch: None,
        }
    }

    #[must_use]
    pub fn otherwise(mut self, else_branch: ElseSyntax) -> Self {
        self.else_branch = Some(else_branch);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseSyntax {
    If(Box<IfSyntax>),
    Block(CodeBlockSyntax),
}

/// `loop { }`, `loop cond { }` or `loop count { }`
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSyntax {
    pub location: Location,
    pub kind: LoopKindSyntax,
    pub body: CodeBlockSyntax,
}

impl LoopSyntax {
    pub fn new(kind: LoopKindSyntax, body: CodeBlockSyntax) -> Self {
        Self {
            location: Location::default(),
            kind,
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopKindSyntax {
    Infinite,
    While(ExpressionSyntax),
    Count(ExpressionSyntax),
}
