//! Symbol-level template instantiation
//!
//! Instantiating a template allocates the instance symbols with every type
//! parameter substituted and registers them in the [`SymbolTable`] under
//! `(template, type arguments)`, so asking twice for the same tuple yields the
//! same instance. Copying the template's declaration tree for the instance is
//! left to the instantiation pass, which finds the work in
//! [`SymbolTable::instances`].

use crate::matcher::TypeArgumentMap;
use mj_span::Location;
use mj_symbol::{
    DeclaredType, FieldSymbol, FunctionId, FunctionKind, FunctionSymbol, ParameterSymbol,
    SymbolName, SymbolRef, SymbolTable, TemplateOrigin, TypeId, TypeKind, TypeSymbol,
};
use tracing::trace;

/// A use of a template with concrete type arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInstantiation {
    pub location: Location,
    pub template: SymbolRef,
    pub instance: SymbolRef,
    pub type_arguments: Vec<TypeId>,
    /// 0 for uses in ordinary code, one more per enclosing instance
    pub depth: usize,
}

/// `name<A,B>` for the given type arguments
pub fn instance_name(symbols: &SymbolTable, name: &SymbolName, type_arguments: &[TypeId]) -> SymbolName {
    let argument_names: Vec<SymbolName> = type_arguments
        .iter()
        .map(|argument| symbols.ty(*argument).name.clone())
        .collect();
    let argument_refs: Vec<&SymbolName> = argument_names.iter().collect();
    name.with_type_arguments(&argument_refs)
}

/// Instance of a template function. The flag is true when the instance was
/// created by this call rather than found in the registry.
pub fn instantiate_function(
    symbols: &mut SymbolTable,
    template: FunctionId,
    type_arguments: &[TypeId],
) -> (FunctionId, bool) {
    if let Some(SymbolRef::Function(existing)) = symbols.lookup_instance(template.into(), type_arguments) {
        return (existing, false);
    }

    let function = symbols.function(template).clone();
    let map = TypeArgumentMap::from_parameters(&function.type_parameters, type_arguments);
    let parameters: Vec<_> = function
        .parameters
        .iter()
        .map(|parameter| {
            let parameter = symbols.parameter(*parameter).clone();
            let ty = map.substitute(symbols, parameter.ty);
            symbols.add_parameter(ParameterSymbol {
                name: parameter.name,
                ty,
            })
        })
        .collect();
    let parameter_types: Vec<TypeId> = parameters
        .iter()
        .map(|parameter| symbols.parameter(*parameter).ty)
        .collect();
    let return_type = map.substitute(symbols, function.return_type);
    let function_type = symbols.function_type(&parameter_types, return_type);
    let name = instance_name(symbols, &function.name, type_arguments);

    trace!(instance = %name, "instantiated template function");
    let instance = symbols.add_function(FunctionSymbol {
        name,
        type_parameters: Vec::new(),
        parameters,
        return_type,
        function_type,
        kind: FunctionKind::Declared,
        instance_of: Some(TemplateOrigin {
            template: template.into(),
            type_arguments: type_arguments.to_vec(),
        }),
    });
    symbols.register_instance(template.into(), type_arguments.to_vec(), instance.into());
    (instance, true)
}

/// Instance of a template type, `None` when `template` is not a declared
/// type. The flag is true when the instance was created by this call.
pub fn instantiate_type(
    symbols: &mut SymbolTable,
    template: TypeId,
    type_arguments: &[TypeId],
) -> Option<(TypeId, bool)> {
    let template = symbols.resolve_forward(template);
    if let Some(SymbolRef::Type(existing)) = symbols.lookup_instance(template.into(), type_arguments) {
        return Some((existing, false));
    }

    let symbol = symbols.ty(template).clone();
    let declared = symbol.as_declared()?.clone();
    let name = instance_name(symbols, &symbol.name, type_arguments);

    // self references inside the fields reach the instance through this
    // placeholder, forwarded once the instance exists
    let placeholder = symbols.add_type(TypeSymbol {
        name: name.clone(),
        kind: TypeKind::Unresolved,
    });
    symbols.register_instance(template.into(), type_arguments.to_vec(), placeholder.into());

    let map = TypeArgumentMap::from_parameters(&declared.type_parameters, type_arguments);
    let fields = declared
        .fields
        .iter()
        .map(|field| {
            let field = symbols.field(*field).clone();
            let ty = map.substitute(symbols, field.ty);
            symbols.add_field(FieldSymbol { name: field.name, ty })
        })
        .collect();
    let base_type = declared.base_type.map(|base| map.substitute(symbols, base));

    trace!(instance = %name, "instantiated template type");
    let filled = symbols.add_type(TypeSymbol::declared(
        name,
        DeclaredType {
            type_parameters: Vec::new(),
            base_type,
            enums: declared.enums,
            fields,
            rules: declared.rules,
            instance_of: Some(TemplateOrigin {
                template: template.into(),
                type_arguments: type_arguments.to_vec(),
            }),
        },
    ));
    symbols.forward_placeholder(placeholder, filled);
    symbols.register_instance(template.into(), type_arguments.to_vec(), filled.into());
    Some((filled, true))
}
