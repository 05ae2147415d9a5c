//! Type symbols

use crate::{EnumId, FieldId, PrimitiveType, RuleId, SymbolName, TemplateOrigin};
use la_arena::Idx;

/// Type ID for arena allocation
pub type TypeId = Idx<TypeSymbol>;

/// A named type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSymbol {
    pub name: SymbolName,
    pub kind: TypeKind,
}

/// Kind of type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Built-in type
    Primitive(PrimitiveType),
    /// User declared type
    Declared(DeclaredType),
    /// Type parameter of a declared type or function
    Parameter(TypeParameterKind),
    /// Structural function signature
    Function(FunctionType),
    /// Numeric literal type not yet committed, candidates in priority order
    Inferred(Vec<PrimitiveType>),
    /// Generic (non-template) type applied to type arguments
    Instance(GenericInstance),
    /// Forward reference placeholder, or the sentinel substituted after an
    /// error
    Unresolved,
}

/// How a type parameter is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeParameterKind {
    /// Kept polymorphic
    Generic,
    /// Substituted at compile time, one copy per argument tuple
    Template,
}

/// Contents of a user declared type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclaredType {
    pub type_parameters: Vec<TypeId>,
    pub base_type: Option<TypeId>,
    pub enums: Vec<EnumId>,
    pub fields: Vec<FieldId>,
    pub rules: Vec<RuleId>,
    /// Set on template instances
    pub instance_of: Option<TemplateOrigin>,
}

/// Function signature, interned by its rendered name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub parameters: Vec<TypeId>,
    pub return_type: TypeId,
}

/// `definition<type_arguments>` for a generic declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericInstance {
    pub definition: TypeId,
    pub type_arguments: Vec<TypeId>,
}

impl TypeSymbol {
    pub fn primitive(primitive: PrimitiveType) -> Self {
        Self {
            name: SymbolName::new(primitive.name()),
            kind: TypeKind::Primitive(primitive),
        }
    }

    pub fn declared(name: SymbolName, declared: DeclaredType) -> Self {
        Self {
            name,
            kind: TypeKind::Declared(declared),
        }
    }

    pub fn parameter(name: SymbolName, kind: TypeParameterKind) -> Self {
        Self {
            name,
            kind: TypeKind::Parameter(kind),
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self.kind {
            TypeKind::Primitive(primitive) => Some(primitive),
            _ => None,
        }
    }

    pub fn as_declared(&self) -> Option<&DeclaredType> {
        match &self.kind {
            TypeKind::Declared(declared) => Some(declared),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match &self.kind {
            TypeKind::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Candidates of an uncommitted literal type
    pub fn inferred_candidates(&self) -> Option<&[PrimitiveType]> {
        match &self.kind {
            TypeKind::Inferred(candidates) => Some(candidates),
            _ => None,
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, TypeKind::Parameter(_))
    }

    pub fn is_template_parameter(&self) -> bool {
        matches!(self.kind, TypeKind::Parameter(TypeParameterKind::Template))
    }

    pub fn is_void(&self) -> bool {
        self.as_primitive() == Some(PrimitiveType::Void)
    }
}
