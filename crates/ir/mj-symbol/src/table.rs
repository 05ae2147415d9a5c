//! Arena storage for every symbol of a compilation

use crate::{
    EnumId, EnumSymbol, FieldId, FieldSymbol, FunctionId, FunctionSymbol, FunctionType,
    GenericInstance, ModuleId, ModuleSymbol, ParameterId, ParameterSymbol, PrimitiveType, RuleId,
    RuleSymbol, SymbolKind, SymbolName, SymbolRef, TypeId, TypeKind, TypeSymbol, VariableId,
    VariableSymbol,
};
use indexmap::IndexMap;
use la_arena::Arena;
use rustc_hash::{FxHashMap, FxHashSet};

/// Ids of the types every table starts with
#[derive(Debug, Clone)]
pub struct Builtins {
    primitives: [TypeId; PrimitiveType::ALL.len()],
    unresolved: TypeId,
}

impl Builtins {
    pub fn get(&self, primitive: PrimitiveType) -> TypeId {
        self.primitives[primitive as usize]
    }

    pub fn void(&self) -> TypeId {
        self.get(PrimitiveType::Void)
    }

    pub fn bool(&self) -> TypeId {
        self.get(PrimitiveType::Bool)
    }

    pub fn i32(&self) -> TypeId {
        self.get(PrimitiveType::I32)
    }

    pub fn i64(&self) -> TypeId {
        self.get(PrimitiveType::I64)
    }

    pub fn str(&self) -> TypeId {
        self.get(PrimitiveType::Str)
    }

    /// Sentinel type substituted wherever resolution failed
    pub fn unresolved(&self) -> TypeId {
        self.unresolved
    }
}

/// Symbol arenas plus the interning maps for structural types.
///
/// Function signatures, literal candidate sets, generic instances and
/// forward-reference placeholders are interned by name, so building the
/// same one twice yields the same [`TypeId`].
#[derive(Debug, Clone)]
pub struct SymbolTable {
    types: Arena<TypeSymbol>,
    functions: Arena<FunctionSymbol>,
    variables: Arena<VariableSymbol>,
    parameters: Arena<ParameterSymbol>,
    fields: Arena<FieldSymbol>,
    enums: Arena<EnumSymbol>,
    rules: Arena<RuleSymbol>,
    modules: Arena<ModuleSymbol>,
    builtins: Builtins,
    function_types: FxHashMap<String, TypeId>,
    inferred_types: FxHashMap<Vec<PrimitiveType>, TypeId>,
    generic_instances: FxHashMap<(TypeId, Vec<TypeId>), TypeId>,
    placeholders: FxHashMap<SymbolName, TypeId>,
    /// Placeholder -> the type it turned out to name
    forwards: FxHashMap<TypeId, TypeId>,
    /// (template, type arguments) -> instance, in creation order
    instances: IndexMap<(SymbolRef, Vec<TypeId>), SymbolRef>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Table holding only the built-in types
    pub fn new() -> Self {
        let mut types = Arena::new();
        let primitives = PrimitiveType::ALL.map(|primitive| types.alloc(TypeSymbol::primitive(primitive)));
        let unresolved = types.alloc(TypeSymbol {
            name: SymbolName::new("Unresolved"),
            kind: TypeKind::Unresolved,
        });

        Self {
            types,
            functions: Arena::new(),
            variables: Arena::new(),
            parameters: Arena::new(),
            fields: Arena::new(),
            enums: Arena::new(),
            rules: Arena::new(),
            modules: Arena::new(),
            builtins: Builtins {
                primitives,
                unresolved,
            },
            function_types: FxHashMap::default(),
            inferred_types: FxHashMap::default(),
            generic_instances: FxHashMap::default(),
            placeholders: FxHashMap::default(),
            forwards: FxHashMap::default(),
            instances: IndexMap::new(),
        }
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    pub fn add_type(&mut self, symbol: TypeSymbol) -> TypeId {
        self.types.alloc(symbol)
    }

    pub fn add_function(&mut self, symbol: FunctionSymbol) -> FunctionId {
        self.functions.alloc(symbol)
    }

    pub fn add_variable(&mut self, symbol: VariableSymbol) -> VariableId {
        self.variables.alloc(symbol)
    }

    pub fn add_parameter(&mut self, symbol: ParameterSymbol) -> ParameterId {
        self.parameters.alloc(symbol)
    }

    pub fn add_field(&mut self, symbol: FieldSymbol) -> FieldId {
        self.fields.alloc(symbol)
    }

    pub fn add_enum(&mut self, symbol: EnumSymbol) -> EnumId {
        self.enums.alloc(symbol)
    }

    pub fn add_rule(&mut self, symbol: RuleSymbol) -> RuleId {
        self.rules.alloc(symbol)
    }

    pub fn add_module(&mut self, symbol: ModuleSymbol) -> ModuleId {
        self.modules.alloc(symbol)
    }

    /// Type entry, following a resolved placeholder to its target
    pub fn ty(&self, id: TypeId) -> &TypeSymbol {
        &self.types[self.resolve_forward(id)]
    }

    pub fn function(&self, id: FunctionId) -> &FunctionSymbol {
        &self.functions[id]
    }

    pub fn variable(&self, id: VariableId) -> &VariableSymbol {
        &self.variables[id]
    }

    pub fn parameter(&self, id: ParameterId) -> &ParameterSymbol {
        &self.parameters[id]
    }

    pub fn field(&self, id: FieldId) -> &FieldSymbol {
        &self.fields[id]
    }

    pub fn enum_member(&self, id: EnumId) -> &EnumSymbol {
        &self.enums[id]
    }

    pub fn rule(&self, id: RuleId) -> &RuleSymbol {
        &self.rules[id]
    }

    pub fn module(&self, id: ModuleId) -> &ModuleSymbol {
        &self.modules[id]
    }

    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &FunctionSymbol)> {
        self.functions.iter()
    }

    pub fn name_of(&self, symbol: SymbolRef) -> &SymbolName {
        match symbol {
            SymbolRef::Type(id) => &self.ty(id).name,
            SymbolRef::Function(id) => &self.functions[id].name,
            SymbolRef::Variable(id) => &self.variables[id].name,
            SymbolRef::Parameter(id) => &self.parameters[id].name,
            SymbolRef::Field(id) => &self.fields[id].name,
            SymbolRef::Enum(id) => &self.enums[id].name,
            SymbolRef::Rule(id) => &self.rules[id].name,
            SymbolRef::Module(id) => &self.modules[id].name,
        }
    }

    /// Type of the value a reference to `symbol` produces
    pub fn type_of(&self, symbol: SymbolRef) -> Option<TypeId> {
        match symbol {
            SymbolRef::Function(id) => Some(self.functions[id].function_type),
            SymbolRef::Variable(id) => Some(self.variables[id].ty),
            SymbolRef::Parameter(id) => Some(self.parameters[id].ty),
            SymbolRef::Field(id) => Some(self.fields[id].ty),
            SymbolRef::Enum(id) => Some(self.enums[id].ty),
            SymbolRef::Type(_) | SymbolRef::Rule(_) | SymbolRef::Module(_) => None,
        }
    }

    /// Like [`SymbolRef::kind`] but tells type parameters and the discard
    /// apart
    pub fn symbol_kind(&self, symbol: SymbolRef) -> SymbolKind {
        if self.name_of(symbol).is_discard() {
            return SymbolKind::Discard;
        }
        match symbol {
            SymbolRef::Type(id) if self.ty(id).is_parameter() => SymbolKind::TypeParameter,
            _ => symbol.kind(),
        }
    }

    /// Full original spelling of a type name
    pub fn type_name(&self, id: TypeId) -> String {
        self.ty(id).name.full_original_name()
    }

    pub fn primitive(&self, id: TypeId) -> Option<PrimitiveType> {
        self.ty(id).as_primitive()
    }

    /// Type equality by name, the convention the overload key uses
    pub fn same_type(&self, first: TypeId, second: TypeId) -> bool {
        let first = self.resolve_forward(first);
        let second = self.resolve_forward(second);
        first == second || self.types[first].name == self.types[second].name
    }

    /// Interned `Fn<(P1,P2):R>` signature type
    pub fn function_type(&mut self, parameters: &[TypeId], return_type: TypeId) -> TypeId {
        let rendered: Vec<String> = parameters.iter().map(|ty| self.type_name(*ty)).collect();
        let name = format!("Fn<({}):{}>", rendered.join(","), self.type_name(return_type));
        let name = SymbolName::new(&name);
        let key = name.full_canonical_name();
        if let Some(id) = self.function_types.get(&key) {
            return *id;
        }

        let id = self.types.alloc(TypeSymbol {
            name,
            kind: TypeKind::Function(FunctionType {
                parameters: parameters.to_vec(),
                return_type,
            }),
        });
        self.function_types.insert(key, id);
        id
    }

    /// Interned literal type. A single candidate is that primitive itself.
    pub fn inferred_type(&mut self, candidates: Vec<PrimitiveType>) -> TypeId {
        match candidates.as_slice() {
            [] => return self.builtins.unresolved,
            [only] => return self.builtins.get(*only),
            _ => {}
        }
        if let Some(id) = self.inferred_types.get(&candidates) {
            return *id;
        }

        let names: Vec<&str> = candidates.iter().map(|primitive| primitive.name()).collect();
        let id = self.types.alloc(TypeSymbol {
            name: SymbolName::new(&format!("{{{}}}", names.join("|"))),
            kind: TypeKind::Inferred(candidates.clone()),
        });
        self.inferred_types.insert(candidates, id);
        id
    }

    /// Interned generic instance `Definition<A,B>`
    pub fn generic_instance(&mut self, definition: TypeId, type_arguments: Vec<TypeId>) -> TypeId {
        let key = (definition, type_arguments);
        if let Some(id) = self.generic_instances.get(&key) {
            return *id;
        }

        let argument_names: Vec<SymbolName> =
            key.1.iter().map(|ty| self.ty(*ty).name.clone()).collect();
        let argument_refs: Vec<&SymbolName> = argument_names.iter().collect();
        let name = self.ty(definition).name.with_type_arguments(&argument_refs);
        let id = self.types.alloc(TypeSymbol {
            name,
            kind: TypeKind::Instance(GenericInstance {
                definition,
                type_arguments: key.1.clone(),
            }),
        });
        self.generic_instances.insert(key, id);
        id
    }

    /// Placeholder for a type referenced before its declaration
    pub fn placeholder_type(&mut self, name: SymbolName) -> TypeId {
        if let Some(id) = self.placeholders.get(&name) {
            return *id;
        }
        let id = self.types.alloc(TypeSymbol {
            name: name.clone(),
            kind: TypeKind::Unresolved,
        });
        self.placeholders.insert(name, id);
        id
    }

    /// True for a placeholder that has not been forwarded yet
    pub fn is_open_placeholder(&self, id: TypeId) -> bool {
        id != self.builtins.unresolved
            && !self.forwards.contains_key(&id)
            && matches!(self.types[id].kind, TypeKind::Unresolved)
    }

    /// Point a placeholder at the type it names. Entries stay untouched;
    /// lookups through [`Self::ty`] follow the link.
    pub fn forward_placeholder(&mut self, placeholder: TypeId, target: TypeId) {
        if self.is_open_placeholder(placeholder) && placeholder != target {
            self.forwards.insert(placeholder, target);
        }
    }

    pub fn resolve_forward(&self, id: TypeId) -> TypeId {
        let mut current = id;
        while let Some(next) = self.forwards.get(&current) {
            current = *next;
        }
        current
    }

    /// True when the type, or any type it is made of, is unresolved
    pub fn is_unresolved_type(&self, id: TypeId) -> bool {
        self.unresolved_within(id, &mut FxHashSet::default())
    }

    fn unresolved_within(&self, id: TypeId, visited: &mut FxHashSet<TypeId>) -> bool {
        let id = self.resolve_forward(id);
        if !visited.insert(id) {
            return false;
        }

        match &self.types[id].kind {
            TypeKind::Unresolved => true,
            TypeKind::Primitive(_) | TypeKind::Parameter(_) | TypeKind::Inferred(_) => false,
            TypeKind::Function(function) => {
                let parts: Vec<TypeId> = function
                    .parameters
                    .iter()
                    .copied()
                    .chain(Some(function.return_type))
                    .collect();
                parts.into_iter().any(|ty| self.unresolved_within(ty, visited))
            }
            TypeKind::Instance(instance) => {
                let parts: Vec<TypeId> = Some(instance.definition)
                    .into_iter()
                    .chain(instance.type_arguments.iter().copied())
                    .collect();
                parts.into_iter().any(|ty| self.unresolved_within(ty, visited))
            }
            TypeKind::Declared(declared) => {
                let parts: Vec<TypeId> = declared
                    .type_parameters
                    .iter()
                    .copied()
                    .chain(declared.base_type)
                    .chain(declared.fields.iter().map(|field| self.fields[*field].ty))
                    .collect();
                parts.into_iter().any(|ty| self.unresolved_within(ty, visited))
            }
        }
    }

    /// Like [`Self::is_unresolved_type`] but without following forwards, so
    /// a type built from a placeholder still answers true once the
    /// placeholder is resolved
    pub fn mentions_unresolved(&self, id: TypeId) -> bool {
        self.mentions_within(id, &mut FxHashSet::default())
    }

    fn mentions_within(&self, id: TypeId, visited: &mut FxHashSet<TypeId>) -> bool {
        if !visited.insert(id) {
            return false;
        }
        match &self.types[id].kind {
            TypeKind::Unresolved => true,
            TypeKind::Function(function) => {
                let parts: Vec<TypeId> = function
                    .parameters
                    .iter()
                    .copied()
                    .chain(Some(function.return_type))
                    .collect();
                parts.into_iter().any(|ty| self.mentions_within(ty, visited))
            }
            TypeKind::Instance(instance) => {
                let parts: Vec<TypeId> = Some(instance.definition)
                    .into_iter()
                    .chain(instance.type_arguments.iter().copied())
                    .collect();
                parts.into_iter().any(|ty| self.mentions_within(ty, visited))
            }
            _ => false,
        }
    }

    /// True when a type parameter occurs anywhere in the type
    pub fn contains_type_parameter(&self, id: TypeId) -> bool {
        match &self.ty(id).kind {
            TypeKind::Parameter(_) => true,
            TypeKind::Function(function) => {
                function
                    .parameters
                    .iter()
                    .any(|ty| self.contains_type_parameter(*ty))
                    || self.contains_type_parameter(function.return_type)
            }
            TypeKind::Instance(instance) => instance
                .type_arguments
                .iter()
                .any(|ty| self.contains_type_parameter(*ty)),
            _ => false,
        }
    }

    /// A declared type is a template when any of its type parameters is
    pub fn is_template_type(&self, id: TypeId) -> bool {
        self.ty(id).as_declared().is_some_and(|declared| {
            declared
                .type_parameters
                .iter()
                .any(|parameter| self.ty(*parameter).is_template_parameter())
        })
    }

    pub fn is_template_function(&self, id: FunctionId) -> bool {
        self.functions[id]
            .type_parameters
            .iter()
            .any(|parameter| self.ty(*parameter).is_template_parameter())
    }

    pub fn is_template(&self, symbol: SymbolRef) -> bool {
        match symbol {
            SymbolRef::Type(id) => self.is_template_type(id),
            SymbolRef::Function(id) => self.is_template_function(id),
            _ => false,
        }
    }

    /// Record the instance built for a template and argument tuple
    pub fn register_instance(
        &mut self,
        template: SymbolRef,
        type_arguments: Vec<TypeId>,
        instance: SymbolRef,
    ) {
        self.instances.insert((template, type_arguments), instance);
    }

    pub fn lookup_instance(&self, template: SymbolRef, type_arguments: &[TypeId]) -> Option<SymbolRef> {
        self.instances
            .get(&(template, type_arguments.to_vec()))
            .copied()
    }

    /// Every registered `(template, type arguments, instance)` in creation order
    pub fn instances(&self) -> impl Iterator<Item = (SymbolRef, &[TypeId], SymbolRef)> {
        self.instances
            .iter()
            .map(|((template, arguments), instance)| (*template, arguments.as_slice(), *instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeclaredType, FunctionKind};

    #[test]
    fn test_builtins() {
        let table = SymbolTable::new();
        let i16 = table.builtins().get(PrimitiveType::I16);

        assert_eq!(table.type_name(i16), "I16");
        assert_eq!(table.primitive(i16), Some(PrimitiveType::I16));
        assert!(table.is_unresolved_type(table.builtins().unresolved()));
        assert!(!table.is_unresolved_type(i16));
    }

    #[test]
    fn test_function_type_interning() {
        let mut table = SymbolTable::new();
        let i32 = table.builtins().i32();
        let text = table.builtins().str();
        let boolean = table.builtins().bool();

        let first = table.function_type(&[i32, text], boolean);
        let second = table.function_type(&[i32, text], boolean);
        let other = table.function_type(&[text, i32], boolean);

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(table.type_name(first), "Fn<(I32,Str):Bool>");
    }

    #[test]
    fn test_function_type_interned_by_canonical_name() {
        let mut table = SymbolTable::new();
        let spaced = table.add_type(TypeSymbol::declared(SymbolName::new("Money_Value"), DeclaredType::default()));
        let joined = table.add_type(TypeSymbol::declared(SymbolName::new("MoneyValue"), DeclaredType::default()));
        let boolean = table.builtins().bool();

        let first = table.function_type(&[spaced], boolean);
        let second = table.function_type(&[joined], boolean);

        assert_eq!(first, second);
        assert_eq!(table.type_name(first), "Fn<(Money_Value):Bool>");
    }

    #[test]
    fn test_inferred_single_candidate_is_primitive() {
        let mut table = SymbolTable::new();
        let only = table.inferred_type(vec![PrimitiveType::U8]);
        assert_eq!(only, table.builtins().get(PrimitiveType::U8));

        let many = table.inferred_type(vec![PrimitiveType::I64, PrimitiveType::I32]);
        assert_eq!(
            table.ty(many).inferred_candidates(),
            Some(&[PrimitiveType::I64, PrimitiveType::I32][..])
        );
    }

    #[test]
    fn test_placeholder_forwarding() {
        let mut table = SymbolTable::new();
        let placeholder = table.placeholder_type(SymbolName::new("Point"));
        assert_eq!(placeholder, table.placeholder_type(SymbolName::new("point")));
        assert!(table.is_open_placeholder(placeholder));

        let point = table.add_type(TypeSymbol::declared(
            SymbolName::new("Point"),
            DeclaredType::default(),
        ));
        table.forward_placeholder(placeholder, point);

        assert!(!table.is_open_placeholder(placeholder));
        assert!(!table.is_unresolved_type(placeholder));
        assert_eq!(table.resolve_forward(placeholder), point);
        assert!(table.same_type(placeholder, point));
        assert!(table.mentions_unresolved(placeholder));
        assert!(!table.mentions_unresolved(point));
    }

    #[test]
    fn test_self_referencing_type_is_resolved() {
        let mut table = SymbolTable::new();
        let placeholder = table.placeholder_type(SymbolName::new("Node"));
        let next = table.add_field(FieldSymbol {
            name: SymbolName::new("next"),
            ty: placeholder,
        });
        let node = table.add_type(TypeSymbol::declared(
            SymbolName::new("Node"),
            DeclaredType {
                fields: vec![next],
                ..DeclaredType::default()
            },
        ));
        assert!(table.is_unresolved_type(node));

        table.forward_placeholder(placeholder, node);
        assert!(!table.is_unresolved_type(node));
    }

    #[test]
    fn test_instance_registry() {
        let mut table = SymbolTable::new();
        let u8 = table.builtins().get(PrimitiveType::U8);
        let void = table.builtins().void();
        let function_type = table.function_type(&[], void);
        let template = table.add_function(FunctionSymbol {
            name: SymbolName::new("add"),
            type_parameters: Vec::new(),
            parameters: Vec::new(),
            return_type: void,
            function_type,
            kind: FunctionKind::Declared,
            instance_of: None,
        });
        let instance = table.add_function(FunctionSymbol {
            name: SymbolName::new("add<U8>"),
            ..table.function(template).clone()
        });

        table.register_instance(template.into(), vec![u8], instance.into());
        assert_eq!(
            table.lookup_instance(template.into(), &[u8]),
            Some(SymbolRef::Function(instance))
        );
        assert_eq!(table.lookup_instance(template.into(), &[void]), None);
    }
}
