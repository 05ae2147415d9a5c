//! Declaration nodes

use crate::{CodeBlockSyntax, ExpressionSyntax, Identifier, Location, QualifiedName, StatementSyntax};

/// Module-level entry
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSyntax {
    Function(FunctionSyntax),
    Type(TypeDeclarationSyntax),
    Variable(VariableSyntax),
    Statement(StatementSyntax),
}

impl From<FunctionSyntax> for ItemSyntax {
    fn from(function: FunctionSyntax) -> Self {
        Self::Function(function)
    }
}

impl From<TypeDeclarationSyntax> for ItemSyntax {
    fn from(declaration: TypeDeclarationSyntax) -> Self {
        Self::Type(declaration)
    }
}

impl From<VariableSyntax> for ItemSyntax {
    fn from(variable: VariableSyntax) -> Self {
        Self::Variable(variable)
    }
}

impl From<StatementSyntax> for ItemSyntax {
    fn from(statement: StatementSyntax) -> Self {
        Self::Statement(statement)
    }
}

/// Type reference, `Name` or `Name<Arg, ...>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSyntax {
    pub location: Location,
    pub name: QualifiedName,
    pub type_arguments: Vec<TypeSyntax>,
}

impl TypeSyntax {
    pub fn named(name: &str) -> Self {
        Self::generic(name, Vec::new())
    }

    pub fn generic(name: &str, type_arguments: Vec<TypeSyntax>) -> Self {
        Self {
            location: Location::default(),
            name: QualifiedName::parse(name),
            type_arguments,
        }
    }
}

/// Whether a type parameter is substituted at compile time or kept generic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeParameterSyntaxKind {
    /// `T`
    Generic,
    /// `#T`
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameterSyntax {
    pub location: Location,
    pub name: Identifier,
    pub kind: TypeParameterSyntaxKind,
}

impl TypeParameterSyntax {
    pub fn generic(name: &str) -> Self {
        Self {
            location: Location::default(),
            name: Identifier::new(name),
            kind: TypeParameterSyntaxKind::Generic,
        }
    }

    pub fn template(name: &str) -> Self {
        Self {
            location: Location::default(),
            name: Identifier::new(name),
            kind: TypeParameterSyntaxKind::Template,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSyntax {
    pub location: Location,
    pub name: Identifier,
    pub ty: TypeSyntax,
}

/// `name<T>(params): Ret { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSyntax {
    pub location: Location,
    pub name: Identifier,
    pub type_parameters: Vec<TypeParameterSyntax>,
    pub parameters: Vec<ParameterSyntax>,
    pub return_type: Option<TypeSyntax>,
    pub body: CodeBlockSyntax,
}

impl FunctionSyntax {
    pub fn new(name: &str) -> Self {
        Self {
            location: Location::default(),
            name: Identifier::new(name),
            type_parameters: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            body: CodeBlockSyntax::default(),
        }
    }

    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self.name.location = location;
        self
    }

    #[must_use]
    pub fn type_parameter(mut self, parameter: TypeParameterSyntax) -> Self {
        self.type_parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn parameter(mut self, name: &str, ty: TypeSyntax) -> Self {
        self.parameters.push(ParameterSyntax {
            location: Location::default(),
            name: Identifier::new(name),
            ty,
        });
        self
    }

    #[must_use]
    pub fn returns(mut self, ty: TypeSyntax) -> Self {
        self.return_type = Some(ty);
        self
    }

    #[must_use]
    pub fn body(mut self, statements: Vec<StatementSyntax>) -> Self {
        self.body = CodeBlockSyntax::new(statements);
        self
    }
}

/// `name [: Type] [= initializer]`; `name := value` has no type
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSyntax {
    pub location: Location,
    pub name: Identifier,
    pub ty: Option<TypeSyntax>,
    pub initializer: Option<ExpressionSyntax>,
}

impl VariableSyntax {
    /// `name := value`
    pub fn inferred(name: &str, initializer: ExpressionSyntax) -> Self {
        Self {
            location: Location::default(),
            name: Identifier::new(name),
            ty: None,
            initializer: Some(initializer),
        }
    }

    /// `name: Type = value` (or without initializer)
    pub fn typed(name: &str, ty: TypeSyntax, initializer: Option<ExpressionSyntax>) -> Self {
        Self {
            location: Location::default(),
            name: Identifier::new(name),
            ty: Some(ty),
            initializer,
        }
    }

    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self.name.location = location;
        self
    }
}

/// Enum member, `Red` or `Green = 3`
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberSyntax {
    pub location: Location,
    pub name: Identifier,
    pub value: Option<ExpressionSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSyntax {
    pub location: Location,
    pub name: Identifier,
    pub ty: TypeSyntax,
}

/// Type rule, `#range(0, 100)`
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSyntax {
    pub location: Location,
    pub name: Identifier,
    pub arguments: Vec<ExpressionSyntax>,
}

/// Type declaration with optional base type, enum members, fields and rules
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclarationSyntax {
    pub location: Location,
    pub name: Identifier,
    pub type_parameters: Vec<TypeParameterSyntax>,
    pub base_type: Option<TypeSyntax>,
    pub enums: Vec<EnumMemberSyntax>,
    pub fields: Vec<FieldSyntax>,
    pub rules: Vec<RuleSyntax>,
}

impl TypeDeclarationSyntax {
    pub fn new(name: &str) -> Self {
        Self {
            location: Location::default(),
            name: Identifier::new(name),
            type_parameters: Vec::new(),
            base_type: None,
            enums: Vec::new(),
            fields: Vec::new(),
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn type_parameter(mut self, parameter: TypeParameterSyntax) -> Self {
        self.type_parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn base(mut self, ty: TypeSyntax) -> Self {
        self.base_type = Some(ty);
        self
    }

    #[must_use]
    pub fn field(mut self, name: &str, ty: TypeSyntax) -> Self {
        self.fields.push(FieldSyntax {
            location: Location::default(),
            name: Identifier::new(name),
            ty,
        });
        self
    }

    #[must_use]
    pub fn enum_member(mut self, name: &str, value: Option<ExpressionSyntax>) -> Self {
        self.enums.push(EnumMemberSyntax {
            location: Location::default(),
            name: Identifier::new(name),
            value,
        });
        self
    }

    #[must_use]
    pub fn rule(mut self, name: &str, arguments: Vec<ExpressionSyntax>) -> Self {
        self.rules.push(RuleSyntax {
            location: Location::default(),
            name: Identifier::new(name),
            arguments,
        });
        self
    }
}
