use super::*;

/// Progress of one `_For_any` declaration through the front end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForAnyState {
    ParsingParamList,
    ScopeOpened,
    ParsingSignature,
    ParsingBody,
    ScopeClosed,
    Bound,
    Done,
    Error(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForAnyTransition {
    /// Span of the `_For_any` keyword of the declaration.
    pub specifier: Span,
    pub state: ForAnyState,
}

impl Parser {
    pub(super) fn transition(&mut self, specifier: Span, state: ForAnyState) {
        self.trace(format_args!("_For_any@{}: {:?}", specifier.start, state));
        self.transitions.push(ForAnyTransition { specifier, state });
    }

    /// Parses `_For_any(...)` and the function declaration or definition it
    /// governs. The function is bound into the scope that was innermost when
    /// the keyword was seen, after the polymorphic scope has been closed.
    pub(super) fn parse_generic_function(&mut self) -> Result<FunctionDecl, Diagnostic> {
        let keyword = self.expect(TokenKind::ForAny)?.span;
        let enclosing = self.scopes.current();

        self.transition(keyword, ForAnyState::ParsingParamList);
        let (type_params, malformed) = match self.parse_type_parameter_list(keyword) {
            Ok(params) => (params, false),
            Err(diag) => {
                self.report(diag);
                (Vec::new(), true)
            }
        };

        let handle = match self
            .scopes
            .open_polymorphic_scope(enclosing, type_params.clone())
        {
            Ok(handle) => handle,
            Err(fault) => {
                self.record_fault(fault);
                return Err(Diagnostic::syntax("internal scope fault", keyword));
            }
        };
        let poly = handle.id();
        if malformed {
            self.scopes.poison(poly);
        }
        self.transition(keyword, ForAnyState::ScopeOpened);

        let specifier = ForAnySpecifier {
            keyword,
            type_params,
            scope: poly,
            span: Span::new(keyword.start, self.previous_span().end),
        };
        let result = self.parse_generic_signature_and_body(keyword, enclosing, specifier);

        if let Err(err) = &result {
            self.transition(keyword, ForAnyState::Error(err.code()));
        }
        self.close_polymorphic(handle);
        self.transition(keyword, ForAnyState::ScopeClosed);
        let decl = result?;

        self.bind_function_decl(&decl);
        self.transition(keyword, ForAnyState::Bound);
        self.transition(keyword, ForAnyState::Done);
        Ok(decl)
    }

    fn parse_generic_signature_and_body(
        &mut self,
        keyword: Span,
        enclosing: ScopeId,
        specifier: ForAnySpecifier,
    ) -> Result<FunctionDecl, Diagnostic> {
        if self.check(TokenKind::ForAny) {
            let nested = self.advance().span;
            self.report_kind(DiagnosticKind::MultipleForAnySpecifiers, nested);
            // The nested list is parsed for recovery only; its names are not
            // bound anywhere.
            if let Err(diag) = self.parse_type_parameter_list(nested) {
                self.report(diag);
            }
            self.scopes.poison(specifier.scope);
        }

        self.transition(keyword, ForAnyState::ParsingSignature);
        let start = keyword.start;
        let base = self.parse_decl_specifier()?;
        let (return_ty, name) = self.parse_declarator_head(&base)?;
        if !self.check(TokenKind::LParen) {
            return Err(self
                .error_here("`_For_any` must be followed by a function declaration")
                .with_help("generic variables are not supported; declare a function"));
        }
        self.parse_function_rest(start, enclosing, Some(specifier), return_ty, name)
    }

    /// `( ident {, ident} )`. Duplicate names are reported and dropped; any
    /// other defect fails the whole list after skipping what remains of it.
    pub(super) fn parse_type_parameter_list(
        &mut self,
        keyword: Span,
    ) -> Result<Vec<TypeParameter>, Diagnostic> {
        if !self.matches(TokenKind::LParen) {
            return Err(malformed("expected `(` after `_For_any`", self.current_span()));
        }
        let open = self.previous_span();
        if self.matches(TokenKind::RParen) {
            return Err(malformed(
                "type parameter list is empty",
                open.union(self.previous_span()),
            ));
        }

        let mut params: Vec<TypeParameter> = Vec::new();
        loop {
            let ident = match self.expect_identifier("expected a type parameter name") {
                Ok(ident) => ident,
                Err(_) => {
                    let diag = malformed("expected a type parameter name", self.current_span());
                    self.skip_type_parameter_list();
                    return Err(diag);
                }
            };
            match params.iter().find(|param| param.name == ident.name) {
                Some(first) => {
                    let first = first.span;
                    self.report(
                        Diagnostic::new(
                            DiagnosticKind::DuplicateTypeParameter {
                                name: ident.name.clone(),
                                first,
                            },
                            ident.span,
                        )
                        .with_help("each type parameter of a `_For_any` list needs a distinct name"),
                    );
                }
                None => params.push(TypeParameter {
                    name: ident.name,
                    span: ident.span,
                    index: params.len(),
                    specifier: keyword,
                }),
            }

            if self.matches(TokenKind::Comma) {
                if self.check(TokenKind::RParen) {
                    let comma = self.previous_span();
                    self.advance();
                    return Err(malformed("trailing comma in type parameter list", comma));
                }
                continue;
            }
            if self.matches(TokenKind::RParen) {
                break;
            }
            let diag = malformed("expected `,` or `)`", self.current_span());
            self.skip_type_parameter_list();
            return Err(diag);
        }
        Ok(params)
    }

    /// Skips to the `)` closing the list and eats it. Gives up at tokens that
    /// cannot appear before it (`;`, braces, end of file).
    fn skip_type_parameter_list(&mut self) {
        while !self.is_eof() {
            match self.peek_kind() {
                Some(TokenKind::RParen) => {
                    self.advance();
                    return;
                }
                Some(TokenKind::Semi) | Some(TokenKind::LBrace) | Some(TokenKind::RBrace) => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

fn malformed(reason: &str, span: Span) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::MalformedParameterList {
            reason: reason.to_string(),
        },
        span,
    )
}
