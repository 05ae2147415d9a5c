//! Expression nodes

use crate::{Identifier, Location, QualifiedName, TypeSyntax};
use std::fmt;

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionSyntax {
    pub location: Location,
    pub kind: ExpressionKind,
}

/// Expression variants
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// Numeric literal exactly as written (`42`, `0x2A`, `3.14`, `1_000`)
    Number(String),
    /// String literal without quotes
    String(String),
    /// `true` / `false`
    Bool(bool),
    /// Reference to a variable, parameter or enum member
    Identifier(QualifiedName),
    /// `target<TypeArgs>(arguments)`
    Invocation {
        target: QualifiedName,
        type_arguments: Vec<TypeSyntax>,
        arguments: Vec<ArgumentSyntax>,
    },
    /// `Type { field = value, ... }`
    TypeInitializer {
        ty: TypeSyntax,
        fields: Vec<FieldInitializerSyntax>,
    },
    Binary {
        left: Box<ExpressionSyntax>,
        operator: BinaryOperator,
        right: Box<ExpressionSyntax>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<ExpressionSyntax>,
    },
    /// `target.member`
    MemberAccess {
        target: Box<ExpressionSyntax>,
        member: Identifier,
    },
    Parenthesized(Box<ExpressionSyntax>),
}

/// Call argument, optionally named (`name: value`)
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSyntax {
    pub location: Location,
    pub name: Option<Identifier>,
    pub value: ExpressionSyntax,
}

impl ArgumentSyntax {
    pub fn positional(value: ExpressionSyntax) -> Self {
        Self {
            location: value.location,
            name: None,
            value,
        }
    }

    pub fn named(name: &str, value: ExpressionSyntax) -> Self {
        Self {
            location: value.location,
            name: Some(Identifier::new(name)),
            value,
        }
    }
}

/// `field = value` inside a type initializer
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInitializerSyntax {
    pub location: Location,
    pub name: Identifier,
    pub value: ExpressionSyntax,
}

impl FieldInitializerSyntax {
    pub fn new(name: &str, value: ExpressionSyntax) -> Self {
        Self {
            location: value.location,
            name: Identifier::new(name),
            value,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equals,
    NotEquals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
}

/// Families of binary operators that share typing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCategory {
    Arithmetic,
    Comparison,
    Logical,
    Bitwise,
}

impl BinaryOperator {
    /// Source text, also the key used for operator-function lookup
    pub fn text(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Power => "**",
            Self::Equals => "=",
            Self::NotEquals => "<>",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
        }
    }

    pub fn category(self) -> OperatorCategory {
        match self {
            Self::Add
            | Self::Subtract
            | Self::Multiply
            | Self::Divide
            | Self::Modulo
            | Self::Power => OperatorCategory::Arithmetic,
            Self::Equals
            | Self::NotEquals
            | Self::Less
            | Self::LessOrEqual
            | Self::Greater
            | Self::GreaterOrEqual => OperatorCategory::Comparison,
            Self::And | Self::Or => OperatorCategory::Logical,
            Self::BitAnd | Self::BitOr | Self::BitXor | Self::ShiftLeft | Self::ShiftRight => {
                OperatorCategory::Bitwise
            }
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.text())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
    Not,
    BitNot,
}

impl UnaryOperator {
    pub fn text(self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "not",
            Self::BitNot => "~",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.text())
    }
}

impl ExpressionSyntax {
    pub fn new(kind: ExpressionKind) -> Self {
        Self {
            location: Location::default(),
            kind,
        }
    }

    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn number(text: &str) -> Self {
        Self::new(ExpressionKind::Number(text.to_owned()))
    }

    pub fn string(text: &str) -> Self {
        Self::new(ExpressionKind::String(text.to_owned()))
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ExpressionKind::Bool(value))
    }

    pub fn identifier(name: &str) -> Self {
        Self::new(ExpressionKind::Identifier(QualifiedName::parse(name)))
    }

    /// Call with positional arguments only
    pub fn invoke(target: &str, arguments: Vec<ExpressionSyntax>) -> Self {
        Self::invoke_with(
            target,
            Vec::new(),
            arguments.into_iter().map(ArgumentSyntax::positional).collect(),
        )
    }

    pub fn invoke_with(
        target: &str,
        type_arguments: Vec<TypeSyntax>,
        arguments: Vec<ArgumentSyntax>,
    ) -> Self {
        Self::new(ExpressionKind::Invocation {
            target: QualifiedName::parse(target),
            type_arguments,
            arguments,
        })
    }

    pub fn initializer(ty: TypeSyntax, fields: Vec<FieldInitializerSyntax>) -> Self {
        Self::new(ExpressionKind::TypeInitializer { ty, fields })
    }

    pub fn binary(left: Self, operator: BinaryOperator, right: Self) -> Self {
        Self::new(ExpressionKind::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    pub fn unary(operator: UnaryOperator, operand: Self) -> Self {
        Self::new(ExpressionKind::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    pub fn member(target: Self, member: &str) -> Self {
        Self::new(ExpressionKind::MemberAccess {
            target: Box::new(target),
            member: Identifier::new(member),
        })
    }

    pub fn parenthesized(inner: Self) -> Self {
        Self::new(ExpressionKind::Parenthesized(Box::new(inner)))
    }

    /// Identifier `_`
    pub fn is_discard(&self) -> bool {
        matches!(&self.kind, ExpressionKind::Identifier(name) if !name.is_qualified() && name.name() == "_")
    }
}
