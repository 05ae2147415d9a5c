//! Non-type symbols and the tagged symbol reference

use crate::{SymbolName, TypeId};
use la_arena::Idx;
use std::fmt;

pub type FunctionId = Idx<FunctionSymbol>;
pub type VariableId = Idx<VariableSymbol>;
pub type ParameterId = Idx<ParameterSymbol>;
pub type FieldId = Idx<FieldSymbol>;
pub type EnumId = Idx<EnumSymbol>;
pub type RuleId = Idx<RuleSymbol>;
pub type ModuleId = Idx<ModuleSymbol>;

/// Reference to any symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolRef {
    Type(TypeId),
    Function(FunctionId),
    Variable(VariableId),
    Parameter(ParameterId),
    Field(FieldId),
    Enum(EnumId),
    Rule(RuleId),
    Module(ModuleId),
}

/// Kind of symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Type,
    TypeParameter,
    Function,
    Variable,
    Parameter,
    Field,
    Enum,
    Rule,
    Module,
    Discard,
}

impl SymbolRef {
    /// Kind as used for scope declaration conflicts. Type parameters report
    /// `Type`; see `SymbolTable::symbol_kind` for the finer answer.
    pub fn kind(self) -> SymbolKind {
        match self {
            Self::Type(_) => SymbolKind::Type,
            Self::Function(_) => SymbolKind::Function,
            Self::Variable(_) => SymbolKind::Variable,
            Self::Parameter(_) => SymbolKind::Parameter,
            Self::Field(_) => SymbolKind::Field,
            Self::Enum(_) => SymbolKind::Enum,
            Self::Rule(_) => SymbolKind::Rule,
            Self::Module(_) => SymbolKind::Module,
        }
    }
}

/// Typed access to one variant of [`SymbolRef`]
pub trait SymbolId: Copy + Into<SymbolRef> {
    const KIND: SymbolKind;

    fn from_ref(symbol: SymbolRef) -> Option<Self>;
}

macro_rules! symbol_id {
    ($id:ty, $variant:ident) => {
        impl From<$id> for SymbolRef {
            fn from(id: $id) -> Self {
                Self::$variant(id)
            }
        }

        impl SymbolId for $id {
            const KIND: SymbolKind = SymbolKind::$variant;

            fn from_ref(symbol: SymbolRef) -> Option<Self> {
                match symbol {
                    SymbolRef::$variant(id) => Some(id),
                    _ => None,
                }
            }
        }
    };
}

symbol_id!(TypeId, Type);
symbol_id!(FunctionId, Function);
symbol_id!(VariableId, Variable);
symbol_id!(ParameterId, Parameter);
symbol_id!(FieldId, Field);
symbol_id!(EnumId, Enum);
symbol_id!(RuleId, Rule);
symbol_id!(ModuleId, Module);

/// Compile-time constant value of an expression
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Integer(i128),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl ConstantValue {
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric value widened to `f64`
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value:?}"),
            Self::Bool(value) => write!(formatter, "{value}"),
            Self::Str(value) => write!(formatter, "\"{value}\""),
        }
    }
}

/// Template and type arguments a declaration was instantiated from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateOrigin {
    pub template: SymbolRef,
    pub type_arguments: Vec<TypeId>,
}

/// Where a function comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Declared in the module being compiled
    Declared,
    /// Imported through the module loader
    External,
    /// Forward reference placeholder
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSymbol {
    pub name: SymbolName,
    pub type_parameters: Vec<TypeId>,
    pub parameters: Vec<ParameterId>,
    pub return_type: TypeId,
    /// Interned signature type, the overload key
    pub function_type: TypeId,
    pub kind: FunctionKind,
    pub instance_of: Option<TemplateOrigin>,
}

impl FunctionSymbol {
    pub fn is_unresolved(&self) -> bool {
        self.kind == FunctionKind::Unresolved
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableSymbol {
    pub name: SymbolName,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSymbol {
    pub name: SymbolName,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSymbol {
    pub name: SymbolName,
    pub ty: TypeId,
}

/// Enum member with its folded value
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSymbol {
    pub name: SymbolName,
    pub value: ConstantValue,
    pub ty: TypeId,
}

/// Type rule (`#range(0, 100)`)
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSymbol {
    pub name: SymbolName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Declared,
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSymbol {
    pub name: SymbolName,
    pub kind: ModuleKind,
}
