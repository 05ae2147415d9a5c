//! Semantic diagnostics
//!
//! Every problem a program author can cause is reported as a [`Diagnostic`]
//! and appended to a [`DiagnosticList`]; building and the later passes keep
//! going so one run surfaces as many independent problems as possible.
//! There are no severity levels: a diagnostic is a diagnostic.

use mj_span::Location;
use std::fmt;
use thiserror::Error;

/// What went wrong. The `Display` text is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    /// Copied from the parser
    #[error("syntax error: {message}")]
    SyntaxError { message: String },

    /// Second declaration of a name in the same scope; the first one is kept
    #[error("'{name}' is already declared")]
    AlreadyDeclared { name: String },

    #[error("variable '{name}' is not declared")]
    UndeclaredVariable { name: String },

    #[error("type '{name}' was not found")]
    TypeNotFound { name: String },

    #[error("function '{name}' was not found")]
    FunctionNotFound { name: String },

    #[error("field '{field}' was not found on type '{type_name}'")]
    FieldNotFoundOnType { field: String, type_name: String },

    #[error("module '{name}' was not found")]
    ModuleNotFound { name: String },

    #[error("exported name '{name}' is not declared in this module")]
    ExportNotFound { name: String },

    #[error("'{name}' expects {expected} argument(s) but {actual} were given")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("'{name}' expects {expected} type argument(s) but {actual} were given")]
    TypeArgumentCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("'{function}' has no parameter named '{argument}'")]
    NoParameterForNamedArgument { function: String, argument: String },

    #[error("positional argument in a call to '{function}' that uses named arguments")]
    PositionalArgumentInNamedCall { function: String },

    #[error("argument '{argument}' is given more than once")]
    DuplicateNamedArgument { argument: String },

    #[error("argument for '{parameter}' expects type '{expected}' but got '{actual}'")]
    ArgumentTypeMismatch {
        parameter: String,
        expected: String,
        actual: String,
    },

    #[error("expected type '{expected}' but got '{actual}'")]
    TypeMismatch { expected: String, actual: String },

    #[error("operator '{operator}' cannot combine '{left}' and '{right}'")]
    OperandTypeMismatch {
        operator: String,
        left: String,
        right: String,
    },

    #[error("value of enum member '{name}' is not a constant")]
    NonConstantEnumValue { name: String },

    #[error("'{name}' does not return a value")]
    VoidValueUsed { name: String },

    #[error("only a function invocation can be assigned to the discard '_'")]
    DiscardOnlyInvocation,

    #[error("condition must be of type 'Bool' but is '{actual}'")]
    ConditionNotBoolean { actual: String },

    #[error("loop expression must be 'Bool' or an integer but is '{actual}'")]
    LoopConditionType { actual: String },

    #[error("function '{function}' returns '{expected}' but the value is '{actual}'")]
    ReturnTypeMismatch {
        function: String,
        expected: String,
        actual: String,
    },

    #[error("function '{function}' does not return a value on every path")]
    MissingReturn { function: String },

    #[error("'{name}' is not a template and takes no type arguments")]
    NotATemplate { name: String },

    #[error("template instantiation of '{name}' exceeds the nesting limit of {limit}")]
    TemplateDepthExceeded { name: String, limit: usize },
}

/// A located diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Location,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(location: Location, kind: DiagnosticKind) -> Self {
        Self { location, kind }
    }

    /// Message text without the location
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.location, self.kind)
    }
}

/// Append-only aggregate shared by the builder and every pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticList {
    items: Vec<Diagnostic>,
}

impl DiagnosticList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, location: Location, kind: DiagnosticKind) {
        self.items.push(Diagnostic::new(location, kind));
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics appended after a `len()` checkpoint
    pub fn since(&self, checkpoint: usize) -> &[Diagnostic] {
        self.items.get(checkpoint..).unwrap_or(&[])
    }

    /// True when any diagnostic matches `predicate`
    pub fn any(&self, predicate: impl Fn(&DiagnosticKind) -> bool) -> bool {
        self.items.iter().any(|diagnostic| predicate(&diagnostic.kind))
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Extend<Diagnostic> for DiagnosticList {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<'list> IntoIterator for &'list DiagnosticList {
    type Item = &'list Diagnostic;
    type IntoIter = std::slice::Iter<'list, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
