//! Syntax tree consumed by the IR builder
//!
//! Lexing and parsing live outside this workspace; whatever front end is used
//! hands over a [`SyntaxTree`]. The node shapes here are the contract the
//! builder depends on: a module header, `use`/`pub` directive lists and the
//! ordered list of declarations and statements, each node with a
//! [`Location`].
//!
//! Nodes can be created directly or with the small constructor helpers on
//! each type, which fill in `Location::default()`.

mod expression;
mod item;
mod statement;

pub use expression::{
    ArgumentSyntax, BinaryOperator, ExpressionKind, ExpressionSyntax, FieldInitializerSyntax,
    OperatorCategory, UnaryOperator,
};
pub use item::{
    EnumMemberSyntax, FieldSyntax, FunctionSyntax, ItemSyntax, ParameterSyntax, RuleSyntax,
    TypeDeclarationSyntax, TypeParameterSyntax, TypeParameterSyntaxKind, TypeSyntax,
    VariableSyntax,
};
pub use mj_span::Location;
pub use statement::{
    AssignmentSyntax, CodeBlockSyntax, ElseSyntax, IfSyntax, LoopKindSyntax, LoopSyntax,
    ReturnSyntax, StatementSyntax,
};

use std::fmt;

/// Parsed compilation unit plus any syntax-level diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    /// Root node
    pub module: ModuleSyntax,
    /// Errors reported by the parser
    pub diagnostics: Vec<SyntaxDiagnostic>,
}

impl SyntaxTree {
    /// Wrap a module that parsed without errors
    pub fn new(module: ModuleSyntax) -> Self {
        Self {
            module,
            diagnostics: Vec::new(),
        }
    }

    /// True when the parser reported anything
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Parser error attached to a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxDiagnostic {
    pub location: Location,
    pub message: String,
}

/// A single identifier token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub location: Location,
    pub text: String,
}

impl Identifier {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            location: Location::default(),
            text: text.into(),
        }
    }

    /// The discard identifier `_`
    pub fn is_discard(&self) -> bool {
        self.text == "_"
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.text)
    }
}

/// Dot separated name (`Std.Math.sqrt`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub location: Location,
    pub parts: Vec<String>,
}

impl QualifiedName {
    /// Split dotted text into parts
    pub fn parse(text: &str) -> Self {
        Self {
            location: Location::default(),
            parts: text.split('.').map(str::to_owned).collect(),
        }
    }

    /// Last segment
    pub fn name(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    pub fn is_qualified(&self) -> bool {
        self.parts.len() > 1
    }

    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.parts.join("."))
    }
}

/// `use Std.Math`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseSyntax {
    pub location: Location,
    pub module: QualifiedName,
}

/// `pub name1, name2`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicSyntax {
    pub location: Location,
    pub names: Vec<QualifiedName>,
}

/// Compilation unit root
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSyntax {
    pub location: Location,
    /// `module` header, absent for anonymous modules
    pub name: Option<QualifiedName>,
    pub uses: Vec<UseSyntax>,
    pub publics: Vec<PublicSyntax>,
    /// Declarations and statements in source order
    pub items: Vec<ItemSyntax>,
}

impl ModuleSyntax {
    /// Empty module with the given header name
    pub fn new(name: &str) -> Self {
        Self {
            location: Location::default(),
            name: Some(QualifiedName::parse(name)),
            uses: Vec::new(),
            publics: Vec::new(),
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn uses(mut self, module: &str) -> Self {
        self.uses.push(UseSyntax {
            location: Location::default(),
            module: QualifiedName::parse(module),
        });
        self
    }

    #[must_use]
    pub fn public(mut self, names: &[&str]) -> Self {
        self.publics.push(PublicSyntax {
            location: Location::default(),
            names: names.iter().map(|name| QualifiedName::parse(name)).collect(),
        });
        self
    }

    #[must_use]
    pub fn item(mut self, item: impl Into<ItemSyntax>) -> Self {
        self.items.push(item.into());
        self
    }

    /// Finish into a tree with no syntax diagnostics
    pub fn into_tree(self) -> SyntaxTree {
        SyntaxTree::new(self)
    }
}
