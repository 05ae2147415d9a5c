//! Symbol model
//!
//! Named language entities (types, functions, variables, parameters, fields,
//! enum members, rules and modules) live in per-kind arenas inside a
//! [`SymbolTable`]. Everything else refers to them through small `Copy` ids,
//! so a function symbol referenced from many call sites never forms an
//! ownership cycle with the parameters it owns.
//!
//! Entries are never changed after allocation. A pass that needs a symbol
//! with different contents allocates a new one and rewrites the references.

mod name;
mod primitive;
mod symbol;
mod table;
mod types;

pub use name::SymbolName;
pub use primitive::PrimitiveType;
pub use symbol::{
    ConstantValue, EnumId, EnumSymbol, FieldId, FieldSymbol, FunctionId, FunctionKind,
    FunctionSymbol, ModuleId, ModuleKind, ModuleSymbol, ParameterId, ParameterSymbol, RuleId,
    RuleSymbol, SymbolId, SymbolKind, SymbolRef, TemplateOrigin, VariableId, VariableSymbol,
};
pub use table::{Builtins, SymbolTable};
pub use types::{
    DeclaredType, FunctionType, GenericInstance, TypeId, TypeKind, TypeParameterKind, TypeSymbol,
};
