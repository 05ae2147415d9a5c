//! Intermediate representation
//!
//! The IR is the semantically resolved tree built from a [`mj_syntax::SyntaxTree`].
//! Nodes are immutable and shared through `Rc`; passes derive from
//! [`IrRewriter`] and only reallocate the paths they change. Symbols live in
//! a [`mj_symbol::SymbolTable`], scopes in a [`ScopeTree`], and both are
//! referred to by id.
//!
//! Besides the node set this crate holds what the builder and every pass
//! share: literal inference and commitment, operator typing, argument and
//! field matching, overload selection, symbol-level template instantiation
//! and the external module interface.

pub mod call;
pub mod expression_type;
pub mod fold;
pub mod inference;
pub mod loader;
pub mod matcher;
pub mod node;
pub mod overload;
pub mod program;
pub mod rewriter;
pub mod scope;
pub mod template;
pub mod typing;

pub use call::{BoundCall, IrCallBinder};
pub use expression_type::IrExpressionTypeRewriter;
pub use loader::{
    ExternalFunction, ExternalModule, ExternalModuleLoader, ExternalParameter, ModuleRegistry,
    NullModuleLoader,
};
pub use matcher::{IrArgumentMatcher, IrFieldTypeMatcher, TypeArgumentMap};
pub use node::*;
pub use overload::{FunctionOverloadPicker, OverloadArgument};
pub use program::{IrPrinter, IrProgram};
pub use rewriter::{IrCopyRewriter, IrRewriter, RewriteMode};
pub use scope::{IrScope, ScopeError, ScopeId, ScopeKind, ScopeTree};
pub use template::TemplateInstantiation;
pub use typing::OperatorTyper;
