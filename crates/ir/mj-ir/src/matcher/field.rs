//! Type-initializer field matching

use super::TypeArgumentMap;
use crate::expression_type::IrExpressionTypeRewriter;
use crate::node::IrTypeInitializerField;
use crate::overload::is_implicitly_convertible;
use mj_diagnostics::{DiagnosticKind, DiagnosticList};
use mj_symbol::{FieldId, SymbolName, SymbolTable, TypeId, TypeKind};
use rustc_hash::FxHashSet;

/// Field named `name` on `ty` (or one of its base types) together with the
/// field type after substituting the type arguments of a generic instance
pub fn find_field(symbols: &mut SymbolTable, ty: TypeId, name: &SymbolName) -> Option<(FieldId, TypeId)> {
    let mut visited = FxHashSet::default();
    let mut current = Some(symbols.resolve_forward(ty));

    while let Some(ty) = current.take() {
        if !visited.insert(ty) {
            return None;
        }
        let (fields, map, base_type) = match &symbols.ty(ty).kind {
            TypeKind::Declared(declared) => (
                declared.fields.clone(),
                TypeArgumentMap::new(),
                declared.base_type,
            ),
            TypeKind::Instance(instance) => {
                let definition = symbols.ty(instance.definition).as_declared()?;
                (
                    definition.fields.clone(),
                    TypeArgumentMap::from_parameters(&definition.type_parameters, &instance.type_arguments),
                    definition.base_type,
                )
            }
            _ => return None,
        };

        let found = fields
            .into_iter()
            .find(|field| symbols.field(*field).name.canonical_name() == name.canonical_name());
        if let Some(field) = found {
            let declared = symbols.field(field).ty;
            return Some((field, map.substitute(symbols, declared)));
        }
        current = base_type.map(|base| symbols.resolve_forward(base));
    }
    None
}

/// Binds the fields of a type initializer (`Point { x = 1 }`) to the field
/// symbols of the initialized type and commits the values to the field types.
///
/// Initializers of types that are still unresolved are returned untouched;
/// resolution runs the matcher again once the type is known.
pub struct IrFieldTypeMatcher<'a> {
    symbols: &'a mut SymbolTable,
    diagnostics: &'a mut DiagnosticList,
}

impl<'a> IrFieldTypeMatcher<'a> {
    pub fn new(symbols: &'a mut SymbolTable, diagnostics: &'a mut DiagnosticList) -> Self {
        Self {
            symbols,
            diagnostics,
        }
    }

    pub fn match_fields(&mut self, ty: TypeId, fields: &[IrTypeInitializerField]) -> Vec<IrTypeInitializerField> {
        if self.symbols.is_unresolved_type(ty) {
            return fields.to_vec();
        }

        fields
            .iter()
            .map(|initializer| self.match_field(ty, initializer))
            .collect()
    }

    fn match_field(&mut self, ty: TypeId, initializer: &IrTypeInitializerField) -> IrTypeInitializerField {
        let Some((field, field_type)) = find_field(self.symbols, ty, &initializer.name) else {
            self.diagnostics.add(
                initializer.location,
                DiagnosticKind::FieldNotFoundOnType {
                    field: initializer.name.value().to_owned(),
                    type_name: self.symbols.type_name(ty),
                },
            );
            return IrTypeInitializerField {
                field: None,
                ..initializer.clone()
            };
        };

        let expression = IrExpressionTypeRewriter::new(self.symbols, field_type).rewrite(&initializer.expression);
        if !is_implicitly_convertible(self.symbols, expression.ty, field_type) {
            self.diagnostics.add(
                initializer.location,
                DiagnosticKind::TypeMismatch {
                    expected: self.symbols.type_name(field_type),
                    actual: self.symbols.type_name(expression.ty),
                },
            );
        }

        IrTypeInitializerField {
            location: initializer.location,
            name: initializer.name.clone(),
            field: Some(field),
            expression,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::literal_type;
    use crate::node::IrExpression;
    use mj_span::Location;
    use mj_symbol::{ConstantValue, DeclaredType, FieldSymbol, PrimitiveType, TypeParameterKind, TypeSymbol};
    use std::rc::Rc;

    /// `type Point<T> { x: T }`
    fn declare_point(symbols: &mut SymbolTable) -> (TypeId, TypeId) {
        let parameter = symbols.add_type(TypeSymbol::parameter(
            SymbolName::new("T"),
            TypeParameterKind::Generic,
        ));
        let x = symbols.add_field(FieldSymbol {
            name: SymbolName::new("x"),
            ty: parameter,
        });
        let point = symbols.add_type(TypeSymbol::declared(
            SymbolName::new("Point"),
            DeclaredType {
                type_parameters: vec![parameter],
                fields: vec![x],
                ..DeclaredType::default()
            },
        ));
        (point, parameter)
    }

    fn initializer(symbols: &mut SymbolTable, name: &str, value: ConstantValue) -> IrTypeInitializerField {
        let ty = literal_type(symbols, &value);
        IrTypeInitializerField {
            location: Location::default(),
            name: SymbolName::new(name),
            field: None,
            expression: Rc::new(IrExpression::literal(Location::default(), ty, value)),
        }
    }

    #[test]
    fn test_find_field_substitutes_instance_arguments() {
        let mut symbols = SymbolTable::new();
        let (point, _) = declare_point(&mut symbols);
        let u8 = symbols.builtins().get(PrimitiveType::U8);
        let instance = symbols.generic_instance(point, vec![u8]);

        let (_, ty) = find_field(&mut symbols, instance, &SymbolName::new("X")).unwrap();
        assert_eq!(ty, u8);
        assert!(find_field(&mut symbols, instance, &SymbolName::new("y")).is_none());
    }

    #[test]
    fn test_commits_literal_to_field_type() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = DiagnosticList::new();
        let (point, _) = declare_point(&mut symbols);
        let u8 = symbols.builtins().get(PrimitiveType::U8);
        let instance = symbols.generic_instance(point, vec![u8]);
        let fields = vec![initializer(&mut symbols, "x", ConstantValue::Integer(1))];

        let matched = IrFieldTypeMatcher::new(&mut symbols, &mut diagnostics).match_fields(instance, &fields);

        assert!(diagnostics.is_empty());
        assert!(matched[0].field.is_some());
        assert_eq!(matched[0].expression.ty, u8);
    }

    #[test]
    fn test_unknown_field_and_mismatch() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = DiagnosticList::new();
        let (point, _) = declare_point(&mut symbols);
        let u8 = symbols.builtins().get(PrimitiveType::U8);
        let instance = symbols.generic_instance(point, vec![u8]);
        let fields = vec![
            initializer(&mut symbols, "x", ConstantValue::Str("one".to_owned())),
            initializer(&mut symbols, "z", ConstantValue::Integer(2)),
        ];

        let matched = IrFieldTypeMatcher::new(&mut symbols, &mut diagnostics).match_fields(instance, &fields);

        assert!(diagnostics.any(|kind| matches!(kind, DiagnosticKind::TypeMismatch { expected, actual } if expected == "U8" && actual == "Str")));
        assert!(diagnostics.any(|kind| matches!(kind, DiagnosticKind::FieldNotFoundOnType { field, type_name } if field == "z" && type_name == "Point<U8>")));
        assert!(matched[1].field.is_none());
    }
}
