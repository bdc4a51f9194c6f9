use crate::config::FrontendOptions;
use crate::language::{
    ast::*,
    errors::{Diagnostic, DiagnosticKind, FrontendError, FrontendResult, ScopeFault},
    lexer::lex,
    scope::{
        Entity, FunctionEntity, PolymorphicScopeHandle, Resolution, ScopeChain, ScopeId, ScopeKind,
        ScopeStats, ScopeTree, TypeParameter, VariableEntity,
    },
    span::Span,
    token::{Token, TokenKind},
    types::{BuiltinType, CheckedPointerKind, TypeAnnotation, TypeExpr, TypeParamRef},
};
use std::{collections::HashMap, fmt};

mod decl;
mod expr;
mod for_any;
mod stmt;

#[cfg(test)]
mod tests;

pub use for_any::{ForAnyState, ForAnyTransition};

/// Everything the front end learned about one translation unit.
#[derive(Debug)]
pub struct Analysis {
    pub unit: TranslationUnit,
    pub scopes: ScopeTree,
    pub stats: ScopeStats,
    pub diagnostics: Vec<Diagnostic>,
    pub transitions: Vec<ForAnyTransition>,
}

impl Analysis {
    pub fn file_scope(&self) -> ScopeId {
        self.scopes.root()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics_with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |diag| diag.code() == code)
    }
}

pub fn parse_translation_unit(
    name: &str,
    source: &str,
    options: &FrontendOptions,
) -> FrontendResult<Analysis> {
    let tokens = lex(source, options.checked_extension).map_err(FrontendError::Lex)?;
    Parser::new(name, tokens, *options).parse()
}

/// Lexes and parses `source`, returning only its diagnostics.
pub fn check_source(source: &str, options: &FrontendOptions) -> FrontendResult<Vec<Diagnostic>> {
    parse_translation_unit("<source>", source, options).map(|analysis| analysis.diagnostics)
}

/// Name lookup result as seen from the current parse position.
#[derive(Clone, Debug)]
enum Binding {
    TypeParam(TypeParamRef),
    Function(FunctionEntity),
    Variable,
}

struct Parser {
    unit_name: String,
    tokens: Vec<Token>,
    pos: usize,
    options: FrontendOptions,
    scopes: ScopeChain,
    diagnostics: Vec<Diagnostic>,
    transitions: Vec<ForAnyTransition>,
    fault: Option<ScopeFault>,
    /// Function whose body is being parsed, with the scope it will be bound
    /// into. Its name is usable inside its own body.
    pending: Option<(FunctionEntity, ScopeId)>,
}

impl Parser {
    fn new(name: &str, tokens: Vec<Token>, options: FrontendOptions) -> Self {
        Self {
            unit_name: name.to_string(),
            tokens,
            pos: 0,
            options,
            scopes: ScopeChain::new(options.trace),
            diagnostics: Vec::new(),
            transitions: Vec::new(),
            fault: None,
            pending: None,
        }
    }

    fn parse(mut self) -> FrontendResult<Analysis> {
        let mut items = Vec::new();

        while !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }

            match self.parse_external_decl() {
                Ok(item) => items.push(item),
                Err(err) => {
                    self.report(err);
                    self.synchronize_item();
                }
            }
            if self.fault.is_some() {
                break;
            }
        }

        if let Some(fault) = self.fault.take() {
            return Err(FrontendError::Internal(fault));
        }
        let stats = self.scopes.stats();
        self.trace(format_args!(
            "{}: {} scope(s) opened, {} closed, {} diagnostic(s)",
            self.unit_name,
            stats.opened,
            stats.closed,
            self.diagnostics.len()
        ));
        let (scopes, stats) = self.scopes.finish()?;
        Ok(Analysis {
            unit: TranslationUnit {
                name: self.unit_name,
                items,
            },
            scopes,
            stats,
            diagnostics: self.diagnostics,
            transitions: self.transitions,
        })
    }

    /// Runs `f` with a fresh scope of `kind` innermost and closes it again,
    /// whatever `f` returns.
    fn within_scope<T>(&mut self, kind: ScopeKind, f: impl FnOnce(&mut Self, ScopeId) -> T) -> T {
        let id = self.scopes.open_scope(kind);
        let result = f(self, id);
        if let Err(fault) = self.scopes.close_scope(id) {
            self.record_fault(fault);
        }
        result
    }

    fn close_polymorphic(&mut self, handle: PolymorphicScopeHandle) {
        if let Err(fault) = self.scopes.close_polymorphic_scope(handle) {
            self.record_fault(fault);
        }
    }

    fn record_fault(&mut self, fault: ScopeFault) {
        self.fault.get_or_insert(fault);
    }

    fn resolve(&self, name: &str) -> Option<Binding> {
        let found = self.scopes.resolve(name);
        if let Some((pending, bound_in)) = &self.pending {
            if pending.name == name {
                let shadowed = match found {
                    Some(Resolution::TypeParam(_, scope)) | Some(Resolution::Entity(_, scope)) => {
                        scope != *bound_in
                            && self.scopes.tree().is_ancestor_or_self(*bound_in, scope)
                    }
                    None => false,
                };
                if !shadowed {
                    return Some(Binding::Function(pending.clone()));
                }
            }
        }
        match found? {
            Resolution::TypeParam(param, scope) => Some(Binding::TypeParam(TypeParamRef {
                name: param.name.clone(),
                scope,
                index: param.index,
            })),
            Resolution::Entity(entity, _) => match entity {
                Entity::Function(function) => Some(Binding::Function(function.clone())),
                Entity::Variable(_) => Some(Binding::Variable),
            },
        }
    }

    fn is_type_param_name(&self, name: &str) -> bool {
        matches!(self.resolve(name), Some(Binding::TypeParam(_)))
    }

    fn bind_variable(&mut self, scope: ScopeId, name: &Identifier, ty: &TypeExpr) {
        let entity = VariableEntity {
            name: name.name.clone(),
            ty: ty.clone(),
            span: name.span,
        };
        if let Err(kind) = self.scopes.bind_variable(scope, entity) {
            self.report(Diagnostic::new(kind, name.span));
        }
    }

    fn trace(&self, args: fmt::Arguments<'_>) {
        if self.options.trace {
            eprintln!("[forany-debug] {args}");
        }
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<Identifier, Diagnostic> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                let span = self.advance().span;
                Ok(Identifier { name, span })
            }
            _ => Err(self.error_here(msg)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, Diagnostic> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            let found = self
                .peek_kind()
                .map(|tk| tk.describe())
                .unwrap_or_else(|| "end of file".into());
            Err(self.error_here(&format!("expected `{}`, found {}", kind.spelling(), found)))
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        matches!(self.peek_kind(), Some(tk) if tk == kind)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind.clone())
    }

    fn peek_kind_n(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind.clone())
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len().saturating_sub(1));
        self.pos = (self.pos + 1).min(self.tokens.len());
        &self.tokens[index]
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn previous_span(&self) -> Span {
        if self.pos == 0 {
            self.current_span()
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    fn error_here(&self, message: &str) -> Diagnostic {
        Diagnostic::syntax(message.to_string(), self.current_span())
    }

    fn report(&mut self, err: Diagnostic) {
        self.trace(format_args!("diagnostic {}: {}", err.code(), err.message()));
        self.diagnostics.push(err);
    }

    fn report_kind(&mut self, kind: DiagnosticKind, span: Span) {
        self.report(Diagnostic::new(kind, span));
    }

    /// Skips to the end of the current external declaration: past a `;` at
    /// brace depth zero or past the `}` that closes a body.
    fn synchronize_item(&mut self) {
        let mut depth = 0usize;
        while !self.is_eof() {
            match self.peek_kind() {
                Some(TokenKind::Semi) if depth == 0 => {
                    self.advance();
                    return;
                }
                Some(TokenKind::ForAny) if depth == 0 => return,
                Some(TokenKind::LBrace) => depth += 1,
                Some(TokenKind::RBrace) => {
                    if depth <= 1 {
                        self.advance();
                        return;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Statement-level recovery inside a block. Leaves a closing `}` of the
    /// enclosing block in place.
    fn synchronize_statement(&mut self) {
        let mut depth = 0usize;
        while !self.is_eof() {
            match self.peek_kind() {
                Some(TokenKind::Semi) if depth == 0 => {
                    self.advance();
                    return;
                }
                Some(TokenKind::LBrace) => depth += 1,
                Some(TokenKind::RBrace) => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }
}

fn duplicate_names<'a>(names: impl Iterator<Item = &'a Identifier>) -> Vec<(&'a Identifier, Span)> {
    let mut first_seen: HashMap<&str, Span> = HashMap::new();
    let mut duplicates = Vec::new();
    for ident in names {
        match first_seen.get(ident.name.as_str()) {
            Some(first) => duplicates.push((ident, *first)),
            None => {
                first_seen.insert(ident.name.as_str(), ident.span);
            }
        }
    }
    duplicates
}
