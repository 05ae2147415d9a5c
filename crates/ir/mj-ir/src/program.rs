//! Compiled program and its text dump

use crate::node::{
    IrAssignmentTarget, IrCodeBlock, IrDeclarationFunction, IrDeclarationType, IrElse,
    IrExpression, IrExpressionKind, IrIf, IrItem, IrLoopKind, IrModule, IrStatement,
    IrStatementKind,
};
use crate::scope::ScopeTree;
use mj_diagnostics::DiagnosticList;
use mj_symbol::{SymbolRef, SymbolTable, TypeId};
use mj_syntax::SyntaxTree;
use std::rc::Rc;

/// Result of a compilation: the input tree, the final IR and everything the
/// IR refers to
#[derive(Debug, Clone)]
pub struct IrProgram {
    pub syntax: Rc<SyntaxTree>,
    pub module: Rc<IrModule>,
    pub symbols: SymbolTable,
    pub scopes: ScopeTree,
    pub diagnostics: DiagnosticList,
}

impl IrProgram {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Indented text rendering of the module
    pub fn dump(&self) -> String {
        IrPrinter::new(&self.symbols).print(&self.module)
    }

    /// One `line:column: message` per diagnostic
    pub fn dump_diagnostics(&self) -> String {
        self.diagnostics
            .iter()
            .map(|diagnostic| format!("{diagnostic}\n"))
            .collect()
    }
}

/// Renders IR as indented text, two spaces per nesting level
pub struct IrPrinter<'a> {
    symbols: &'a SymbolTable,
    indent: usize,
    output: String,
}

impl<'a> IrPrinter<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            indent: 0,
            output: String::new(),
        }
    }

    pub fn print(mut self, module: &IrModule) -> String {
        self.line(&format!("module {}", module.name.full_original_name()));
        for item in &module.items {
            match item {
                IrItem::Function(function) => self.print_function(function),
                IrItem::Type(declaration) => self.print_type(declaration),
                IrItem::Statement(statement) => self.print_statement(statement),
            }
        }
        self.output
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn nested(&mut self, print: impl FnOnce(&mut Self)) {
        self.indent += 1;
        print(self);
        self.indent -= 1;
    }

    fn type_name(&self, ty: TypeId) -> String {
        self.symbols.type_name(ty)
    }

    fn symbol_name(&self, symbol: SymbolRef) -> String {
        self.symbols.name_of(symbol).full_original_name()
    }

    fn type_parameters(&self, parameters: impl Iterator<Item = TypeId>) -> String {
        let rendered: Vec<String> = parameters
            .map(|parameter| {
                let marker = if self.symbols.ty(parameter).is_template_parameter() { "#" } else { "" };
                format!("{marker}{}", self.type_name(parameter))
            })
            .collect();
        if rendered.is_empty() {
            String::new()
        } else {
            format!("<{}>", rendered.join(", "))
        }
    }

    fn print_function(&mut self, function: &IrDeclarationFunction) {
        let symbol = self.symbols.function(function.symbol);
        let parameters: Vec<String> = function
            .parameters
            .iter()
            .map(|parameter| {
                format!(
                    "{}: {}",
                    self.symbol_name(parameter.symbol.into()),
                    self.type_name(parameter.ty.ty)
                )
            })
            .collect();
        let return_type = if self.symbols.ty(function.return_type.ty).is_void() {
            String::new()
        } else {
            format!(": {}", self.type_name(function.return_type.ty))
        };
        let header = format!(
            "fn {}{}({}){}",
            symbol.name.full_original_name(),
            self.type_parameters(function.type_parameters.iter().map(|parameter| parameter.ty)),
            parameters.join(", "),
            return_type
        );
        self.line(&header);
        self.nested(|printer| printer.print_block(&function.body));
    }

    fn print_type(&mut self, declaration: &IrDeclarationType) {
        let base = declaration
            .base_type
            .map(|base| format!(": {}", self.type_name(base.ty)))
            .unwrap_or_default();
        let header = format!(
            "type {}{}{}",
            self.type_name(declaration.symbol),
            self.type_parameters(declaration.type_parameters.iter().map(|parameter| parameter.ty)),
            base
        );
        self.line(&header);
        self.nested(|printer| {
            for member in &declaration.enums {
                let symbol = printer.symbols.enum_member(member.symbol);
                let text = format!("enum {} = {}", symbol.name.full_original_name(), symbol.value);
                printer.line(&text);
            }
            for field in &declaration.fields {
                let text = format!(
                    "field {}: {}",
                    printer.symbol_name(field.symbol.into()),
                    printer.type_name(field.ty.ty)
                );
                printer.line(&text);
            }
            for rule in &declaration.rules {
                let arguments: Vec<String> = rule
                    .arguments
                    .iter()
                    .map(|argument| printer.expression(argument))
                    .collect();
                let text = format!(
                    "rule {}({})",
                    printer.symbol_name(rule.symbol.into()),
                    arguments.join(", ")
                );
                printer.line(&text);
            }
        });
    }

    fn print_block(&mut self, block: &IrCodeBlock) {
        for statement in &block.statements {
            self.print_statement(statement);
        }
    }

    fn print_statement(&mut self, statement: &IrStatement) {
        match &statement.kind {
            IrStatementKind::VariableDeclaration(variable) => {
                let mut text = format!(
                    "var {}: {}",
                    self.symbol_name(variable.symbol.into()),
                    self.type_name(variable.ty.ty)
                );
                if let Some(initializer) = &variable.initializer {
                    text.push_str(" = ");
                    text.push_str(&self.expression(initializer));
                }
                self.line(&text);
            }
            IrStatementKind::Assignment { target, value } => {
                let target = match target {
                    IrAssignmentTarget::Symbol(symbol) => self.symbol_name(*symbol),
                    IrAssignmentTarget::Field { target, member, .. } => {
                        format!("{}.{}", self.expression(target), member.value())
                    }
                    IrAssignmentTarget::Discard => "_".to_owned(),
                };
                let text = format!("{target} = {}", self.expression(value));
                self.line(&text);
            }
            IrStatementKind::Expression(expression) => {
                let text = self.expression(expression);
                self.line(&text);
            }
            IrStatementKind::Return(value) => {
                let text = match value {
                    Some(value) => format!("return {}", self.expression(value)),
                    None => "return".to_owned(),
                };
                self.line(&text);
            }
            IrStatementKind::If(branch) => self.print_if(branch, "if"),
            IrStatementKind::Loop(body) => {
                let header = match &body.kind {
                    IrLoopKind::Infinite => "loop".to_owned(),
                    IrLoopKind::While(condition) => format!("loop while {}", self.expression(condition)),
                    IrLoopKind::Count(count) => format!("loop count {}", self.expression(count)),
                };
                self.line(&header);
                self.nested(|printer| printer.print_block(&body.body));
            }
        }
    }

    fn print_if(&mut self, branch: &IrIf, keyword: &str) {
        let header = format!("{keyword} {}", self.expression(&branch.condition));
        self.line(&header);
        self.nested(|printer| printer.print_block(&branch.then_block));
        match &branch.else_branch {
            Some(IrElse::If(nested)) => self.print_if(nested, "else if"),
            Some(IrElse::Block(block)) => {
                self.line("else");
                self.nested(|printer| printer.print_block(block));
            }
            None => {}
        }
    }

    fn expression(&self, expression: &Rc<IrExpression>) -> String {
        match &expression.kind {
            IrExpressionKind::Literal(value) => format!("{value}:{}", self.type_name(expression.ty)),
            IrExpressionKind::Reference(symbol) => self.symbol_name(*symbol),
            IrExpressionKind::Invocation(invocation) => {
                let arguments: Vec<String> = invocation
                    .arguments
                    .iter()
                    .map(|argument| match &argument.name {
                        Some(name) => format!("{}: {}", name.value(), self.expression(&argument.expression)),
                        None => self.expression(&argument.expression),
                    })
                    .collect();
                format!(
                    "{}({})",
                    self.symbol_name(invocation.function.into()),
                    arguments.join(", ")
                )
            }
            IrExpressionKind::TypeInitializer(initializer) => {
                let fields: Vec<String> = initializer
                    .fields
                    .iter()
                    .map(|field| format!("{} = {}", field.name.value(), self.expression(&field.expression)))
                    .collect();
                format!("{} {{ {} }}", self.type_name(initializer.ty.ty), fields.join(", "))
            }
            IrExpressionKind::Binary {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                self.expression(left),
                operator.text(),
                self.expression(right)
            ),
            IrExpressionKind::Unary { operator, operand } => {
                let separator = if operator.text().chars().all(char::is_alphabetic) { " " } else { "" };
                format!("({}{separator}{})", operator.text(), self.expression(operand))
            }
            IrExpressionKind::MemberAccess { target, member, .. } => {
                format!("{}.{}", self.expression(target), member.value())
            }
        }
    }
}
