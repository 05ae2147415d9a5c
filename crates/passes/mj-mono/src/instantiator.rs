//! The instantiation queue

use crate::rewriter::IrTemplateRewriter;
use crate::InstantiateError;
use mj_diagnostics::{DiagnosticKind, DiagnosticList};
use mj_ir::{
    IrDeclarationFunction, IrDeclarationType, IrItem, IrModule, ScopeId, ScopeKind, ScopeTree,
    TemplateInstantiation, TypeArgumentMap,
};
use mj_span::Location;
use mj_symbol::{FunctionId, SymbolRef, SymbolTable, TypeId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, trace};

/// Nesting limit used when none is configured
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Template declaration of the module, by template symbol
#[derive(Debug, Clone)]
enum Template {
    Function(Rc<IrDeclarationFunction>),
    Type(Rc<IrDeclarationType>),
}

/// Emits the declaration of every template instance.
///
/// Instances are created at the symbol level wherever the builder or a pass
/// meets a template applied to concrete type arguments; this pass gives each
/// one a body. The queue starts with the instantiations handed in, followed
/// by any instance in the symbol table's registry that nobody queued. Copying
/// a template can create further instances, which are queued one level
/// deeper; an instance nested deeper than the limit is reported and left
/// without a declaration.
pub struct IrTemplateInstantiator<'a> {
    symbols: &'a mut SymbolTable,
    scopes: &'a mut ScopeTree,
    diagnostics: &'a mut DiagnosticList,
    max_depth: usize,
    fold_constants: bool,
}

impl<'a> IrTemplateInstantiator<'a> {
    pub fn new(symbols: &'a mut SymbolTable, scopes: &'a mut ScopeTree, diagnostics: &'a mut DiagnosticList) -> Self {
        Self {
            symbols,
            scopes,
            diagnostics,
            max_depth: DEFAULT_MAX_DEPTH,
            fold_constants: true,
        }
    }

    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn fold_constants(mut self, fold_constants: bool) -> Self {
        self.fold_constants = fold_constants;
        self
    }

    /// Append the declarations of all pending instances to `module`. The
    /// module is returned as is when there is nothing to emit.
    pub fn add_instantiations(
        mut self,
        module: &Rc<IrModule>,
        queued: Vec<TemplateInstantiation>,
    ) -> Result<Rc<IrModule>, InstantiateError> {
        let templates = self.collect_templates(module);
        let mut seen: FxHashSet<SymbolRef> = queued.iter().map(|instantiation| instantiation.instance).collect();
        let mut pending: VecDeque<TemplateInstantiation> = queued.into();
        let unqueued = self.registered_since(0, &mut seen, module.location, 0);
        pending.extend(unqueued);

        let mut items = Vec::new();
        let mut exceeded = 0;
        while let Some(instantiation) = pending.pop_front() {
            if instantiation.depth > self.max_depth {
                let name = self.symbols.name_of(instantiation.template).full_original_name();
                self.diagnostics.add(
                    instantiation.location,
                    DiagnosticKind::TemplateDepthExceeded {
                        name,
                        limit: self.max_depth,
                    },
                );
                exceeded += 1;
                continue;
            }

            let mark = self.symbols.instances().count();
            items.push(self.instantiate(&templates, &instantiation)?);
            let nested = self.registered_since(mark, &mut seen, instantiation.location, instantiation.depth + 1);
            pending.extend(nested);
        }

        debug!(
            module = %module.name,
            instances = items.len(),
            exceeded,
            "added template instantiations"
        );
        if items.is_empty() {
            return Ok(Rc::clone(module));
        }
        let mut all = module.items.clone();
        all.extend(items);
        Ok(Rc::new(IrModule {
            location: module.location,
            name: module.name.clone(),
            scope: module.scope,
            items: all,
        }))
    }

    fn collect_templates(&self, module: &IrModule) -> FxHashMap<SymbolRef, Template> {
        module
            .items
            .iter()
            .filter_map(|item| match item {
                IrItem::Function(function) if self.symbols.is_template_function(function.symbol) => {
                    Some((function.symbol.into(), Template::Function(Rc::clone(function))))
                }
                IrItem::Type(declaration) if self.symbols.is_template_type(declaration.symbol) => {
                    Some((declaration.symbol.into(), Template::Type(Rc::clone(declaration))))
                }
                _ => None,
            })
            .collect()
    }

    /// Registry entries from position `mark` on that were not queued yet
    fn registered_since(
        &self,
        mark: usize,
        seen: &mut FxHashSet<SymbolRef>,
        location: Location,
        depth: usize,
    ) -> Vec<TemplateInstantiation> {
        self.symbols
            .instances()
            .skip(mark)
            .filter(|(_, _, instance)| seen.insert(*instance))
            .map(|(template, type_arguments, instance)| TemplateInstantiation {
                location,
                template,
                instance,
                type_arguments: type_arguments.to_vec(),
                depth,
            })
            .collect()
    }

    fn instantiate(
        &mut self,
        templates: &FxHashMap<SymbolRef, Template>,
        instantiation: &TemplateInstantiation,
    ) -> Result<IrItem, InstantiateError> {
        let name = self.symbols.name_of(instantiation.template).full_original_name();
        let Some(template) = templates.get(&instantiation.template) else {
            return Err(if self.symbols.is_template(instantiation.template) {
                InstantiateError::MissingDeclaration { name }
            } else {
                InstantiateError::NotATemplate { name }
            });
        };
        trace!(
            instance = %self.symbols.name_of(instantiation.instance),
            depth = instantiation.depth,
            "copying template"
        );

        match (template, instantiation.instance) {
            (Template::Function(function), SymbolRef::Function(instance)) => Ok(IrItem::Function(
                self.instantiate_function(function, instance, &instantiation.type_arguments)?,
            )),
            (Template::Type(declaration), SymbolRef::Type(instance)) => Ok(IrItem::Type(self.instantiate_type(
                declaration,
                instance,
                &instantiation.type_arguments,
            )?)),
            _ => Err(InstantiateError::InstanceKind { name }),
        }
    }

    /// Fresh scope beside the template's own, under the same parent
    fn sibling_scope(&mut self, template_scope: ScopeId, kind: ScopeKind) -> ScopeId {
        let parent = self
            .scopes
            .parent(template_scope)
            .unwrap_or_else(|| self.scopes.global());
        self.scopes.create(parent, kind)
    }

    fn instantiate_function(
        &mut self,
        template: &Rc<IrDeclarationFunction>,
        instance: FunctionId,
        type_arguments: &[TypeId],
    ) -> Result<Rc<IrDeclarationFunction>, InstantiateError> {
        let type_parameters = self.symbols.function(template.symbol).type_parameters.clone();
        let parameters = self.symbols.function(instance).parameters.clone();
        let scope = self.sibling_scope(template.scope, ScopeKind::Function);
        for parameter in &parameters {
            // the template's own parameters were already checked for clashes
            self.scopes.declare_or_keep(scope, (*parameter).into(), self.symbols)?;
        }

        let map = TypeArgumentMap::from_parameters(&type_parameters, type_arguments);
        let mut rewriter =
            IrTemplateRewriter::new(self.symbols, self.scopes, self.diagnostics, map).fold_constants(self.fold_constants);
        rewriter.bind(template.symbol.into(), instance.into());
        for (original, copy) in template.parameters.iter().zip(&parameters) {
            rewriter.bind(original.symbol.into(), (*copy).into());
        }
        let copied = rewriter.copy_function(template, scope)?;

        self.scopes.bind_owner(instance.into(), scope);
        self.scopes.freeze(scope);
        Ok(copied)
    }

    fn instantiate_type(
        &mut self,
        template: &Rc<IrDeclarationType>,
        instance: TypeId,
        type_arguments: &[TypeId],
    ) -> Result<Rc<IrDeclarationType>, InstantiateError> {
        let type_parameters = self
            .symbols
            .ty(template.symbol)
            .as_declared()
            .map(|declared| declared.type_parameters.clone())
            .unwrap_or_default();
        let fields = self
            .symbols
            .ty(instance)
            .as_declared()
            .map(|declared| declared.fields.clone())
            .unwrap_or_default();
        let scope = self.sibling_scope(template.scope, ScopeKind::Type);
        for field in &fields {
            self.scopes.declare_or_keep(scope, (*field).into(), self.symbols)?;
        }
        for member in &template.enums {
            self.scopes.declare_or_keep(scope, member.symbol.into(), self.symbols)?;
        }

        let map = TypeArgumentMap::from_parameters(&type_parameters, type_arguments);
        let mut rewriter =
            IrTemplateRewriter::new(self.symbols, self.scopes, self.diagnostics, map).fold_constants(self.fold_constants);
        rewriter.bind(template.symbol.into(), instance.into());
        for (original, copy) in template.fields.iter().zip(&fields) {
            rewriter.bind(original.symbol.into(), (*copy).into());
        }
        let copied = rewriter.copy_type(template, scope)?;

        self.scopes.bind_owner(instance.into(), scope);
        self.scopes.freeze(scope);
        Ok(copied)
    }
}
