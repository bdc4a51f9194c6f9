use super::*;

impl Parser {
    pub(super) fn parse_external_decl(&mut self) -> Result<ExternalDecl, Diagnostic> {
        if self.check(TokenKind::ForAny) {
            return self.parse_generic_function().map(ExternalDecl::Function);
        }

        let start = self.current_span().start;
        let enclosing = self.scopes.current();
        let base = self.parse_decl_specifier()?;
        let (ty, name) = self.parse_declarator_head(&base)?;
        if self.check(TokenKind::LParen) {
            let decl = self.parse_function_rest(start, enclosing, None, ty, name)?;
            self.bind_function_decl(&decl);
            return Ok(ExternalDecl::Function(decl));
        }
        self.parse_var_decl_rest(start, &base, ty, name)
            .map(ExternalDecl::Variables)
    }

    /// A builtin type keyword, a checked pointer `_Ptr<type>`, or the name of a
    /// type parameter visible from the current scope.
    pub(super) fn parse_decl_specifier(&mut self) -> Result<TypeAnnotation, Diagnostic> {
        let span = self.current_span();
        let kind = self.peek_kind();
        let ty = if let Some(builtin) = kind.as_ref().and_then(builtin_type) {
            self.advance();
            TypeExpr::Builtin(builtin)
        } else if let Some(pointer) = kind.as_ref().and_then(checked_pointer_kind) {
            self.advance();
            self.expect(TokenKind::Lt)?;
            let pointee = self.parse_type_name()?;
            self.expect(TokenKind::Gt)?;
            TypeExpr::Checked {
                kind: pointer,
                pointee: Box::new(pointee.ty),
            }
        } else if let Some(TokenKind::Identifier(name)) = kind {
            self.advance();
            self.resolve_type_name(&name, span)
        } else {
            return Err(self.error_here("expected a type"));
        };
        Ok(TypeAnnotation {
            ty,
            span: span.union(self.previous_span()),
        })
    }

    fn resolve_type_name(&mut self, name: &str, span: Span) -> TypeExpr {
        if let Some(Binding::TypeParam(param)) = self.resolve(name) {
            return TypeExpr::TypeParam(param);
        }
        // A malformed `_For_any` list was already reported; its would-be
        // parameters are not reported again.
        if !self.scopes.in_poisoned_scope() {
            self.report(
                Diagnostic::new(
                    DiagnosticKind::UnresolvedTypeParameterReference {
                        name: name.to_string(),
                    },
                    span,
                )
                .with_help(format!("declare it with `_For_any({name})` on the enclosing function")),
            );
        }
        TypeExpr::Error
    }

    /// Specifier followed by abstract `*` declarators, as in type arguments.
    pub(super) fn parse_type_name(&mut self) -> Result<TypeAnnotation, Diagnostic> {
        let mut annotation = self.parse_decl_specifier()?;
        while self.matches(TokenKind::Star) {
            annotation.ty = annotation.ty.pointer_to();
            annotation.span = annotation.span.union(self.previous_span());
        }
        Ok(annotation)
    }

    pub(super) fn parse_declarator_head(
        &mut self,
        base: &TypeAnnotation,
    ) -> Result<(TypeAnnotation, Identifier), Diagnostic> {
        let mut ty = base.clone();
        while self.matches(TokenKind::Star) {
            ty.ty = ty.ty.pointer_to();
            ty.span = ty.span.union(self.previous_span());
        }
        let name = self.expect_identifier("expected a declarator name")?;
        Ok((ty, name))
    }

    /// Parameter list plus `;` or a body. The caller binds the result.
    pub(super) fn parse_function_rest(
        &mut self,
        start: usize,
        enclosing: ScopeId,
        for_any: Option<ForAnySpecifier>,
        return_ty: TypeAnnotation,
        name: Identifier,
    ) -> Result<FunctionDecl, Diagnostic> {
        let params = self.parse_params()?;

        if self.matches(TokenKind::Semi) {
            self.report_duplicate_params(&params);
            return Ok(FunctionDecl {
                name,
                for_any,
                return_ty,
                params,
                body: None,
                bound_in: enclosing,
                span: Span::new(start, self.previous_span().end),
            });
        }
        if !self.check(TokenKind::LBrace) {
            return Err(self.error_here("expected `;` or a function body after the parameter list"));
        }

        if let Some(spec) = &for_any {
            self.transition(spec.keyword, ForAnyState::ParsingBody);
        }
        let signature = function_entity(&name, for_any.as_ref(), &return_ty, &params, true);
        self.pending = Some((signature, enclosing));
        let body = self.within_scope(ScopeKind::FunctionBody, |p, scope| {
            for param in params.params() {
                if let Some(param_name) = &param.name {
                    p.bind_variable(scope, param_name, &param.ty.ty);
                }
            }
            p.parse_block_contents()
                .map(|block| FunctionBody { scope, block })
        });
        self.pending = None;
        let body = body?;

        let end = body.block.span.end;
        Ok(FunctionDecl {
            name,
            for_any,
            return_ty,
            params,
            body: Some(body),
            bound_in: enclosing,
            span: Span::new(start, end),
        })
    }

    fn parse_params(&mut self) -> Result<ParamList, Diagnostic> {
        self.expect(TokenKind::LParen)?;
        if self.matches(TokenKind::RParen) {
            return Ok(ParamList::Unspecified);
        }
        if self.check(TokenKind::Void) && self.peek_kind_n(1) == Some(TokenKind::RParen) {
            self.advance();
            self.advance();
            return Ok(ParamList::Prototype(Vec::new()));
        }

        let mut params = Vec::new();
        loop {
            let base = self.parse_decl_specifier()?;
            let mut ty = base;
            while self.matches(TokenKind::Star) {
                ty.ty = ty.ty.pointer_to();
                ty.span = ty.span.union(self.previous_span());
            }
            if ty.ty.is_void() {
                return Err(Diagnostic::syntax(
                    "`void` must be the only entry of a parameter list",
                    ty.span,
                ));
            }
            let name = match self.peek_kind() {
                Some(TokenKind::Identifier(_)) => Some(self.expect_identifier("expected parameter name")?),
                _ => None,
            };
            let span = name
                .as_ref()
                .map(|ident| ty.span.union(ident.span))
                .unwrap_or(ty.span);
            params.push(Param { name, ty, span });
            if self.matches(TokenKind::Comma) {
                continue;
            }
            break;
        }
        self.expect(TokenKind::RParen)?;
        Ok(ParamList::Prototype(params))
    }

    fn report_duplicate_params(&mut self, params: &ParamList) {
        let duplicates: Vec<(Identifier, Span)> =
            duplicate_names(params.params().iter().filter_map(|param| param.name.as_ref()))
                .into_iter()
                .map(|(ident, first)| (ident.clone(), first))
                .collect();
        for (ident, previous) in duplicates {
            self.report_kind(
                DiagnosticKind::DuplicateDeclaration {
                    name: ident.name,
                    previous,
                },
                ident.span,
            );
        }
    }

    pub(super) fn bind_function_decl(&mut self, decl: &FunctionDecl) {
        let entity = function_entity(
            &decl.name,
            decl.for_any.as_ref(),
            &decl.return_ty,
            &decl.params,
            decl.is_definition(),
        );
        if let Err(kind) = self.scopes.bind_function(decl.bound_in, entity) {
            self.report_kind(kind, decl.name.span);
        }
    }

    /// Remaining declarators of `int a = 0, *b;` after the first name. Each
    /// name is bound into the innermost scope before its initializer parses.
    pub(super) fn parse_var_decl_rest(
        &mut self,
        start: usize,
        base: &TypeAnnotation,
        ty: TypeAnnotation,
        name: Identifier,
    ) -> Result<VarDecl, Diagnostic> {
        let scope = self.scopes.current();
        let mut declarators = Vec::new();
        let mut next = Some((ty, name));
        while let Some((ty, name)) = next.take() {
            if self.check(TokenKind::LParen) {
                return Err(self.error_here("function declarators must be declared on their own"));
            }
            if ty.ty.is_void() {
                return Err(Diagnostic::syntax(
                    format!("variable `{}` has incomplete type `void`", name.name),
                    name.span,
                ));
            }
            self.bind_variable(scope, &name, &ty.ty);
            let init = if self.matches(TokenKind::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarators.push(Declarator { name, ty, init });
            if self.matches(TokenKind::Comma) {
                next = Some(self.parse_declarator_head(base)?);
            }
        }
        let end = self.expect(TokenKind::Semi)?.span.end;
        Ok(VarDecl {
            declarators,
            span: Span::new(start, end),
        })
    }
}

fn function_entity(
    name: &Identifier,
    for_any: Option<&ForAnySpecifier>,
    return_ty: &TypeAnnotation,
    params: &ParamList,
    defined: bool,
) -> FunctionEntity {
    FunctionEntity {
        name: name.name.clone(),
        span: name.span,
        type_params: for_any
            .map(|spec| spec.type_params.clone())
            .unwrap_or_default(),
        poly_scope: for_any.map(|spec| spec.scope),
        return_ty: return_ty.ty.clone(),
        params: match params {
            ParamList::Unspecified => None,
            ParamList::Prototype(params) => {
                Some(params.iter().map(|param| param.ty.ty.clone()).collect())
            }
        },
        defined,
    }
}

fn builtin_type(kind: &TokenKind) -> Option<BuiltinType> {
    match kind {
        TokenKind::Void => Some(BuiltinType::Void),
        TokenKind::CharKw => Some(BuiltinType::Char),
        TokenKind::Short => Some(BuiltinType::Short),
        TokenKind::Int => Some(BuiltinType::Int),
        TokenKind::Long => Some(BuiltinType::Long),
        TokenKind::Float => Some(BuiltinType::Float),
        TokenKind::Double => Some(BuiltinType::Double),
        _ => None,
    }
}

fn checked_pointer_kind(kind: &TokenKind) -> Option<CheckedPointerKind> {
    match kind {
        TokenKind::Ptr => Some(CheckedPointerKind::Ptr),
        TokenKind::ArrayPtr => Some(CheckedPointerKind::ArrayPtr),
        TokenKind::NtArrayPtr => Some(CheckedPointerKind::NtArrayPtr),
        _ => None,
    }
}
