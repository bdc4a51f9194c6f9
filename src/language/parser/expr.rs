use super::*;

impl Parser {
    pub(super) fn parse_expression(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_assignment()
    }

    /// Assignment is right associative and binds loosest.
    pub(super) fn parse_assignment(&mut self) -> Result<Expr, Diagnostic> {
        let target = self.parse_binary(0)?;
        if self.matches(TokenKind::Eq) {
            let value = self.parse_assignment()?;
            let span = expr_span(&target).union(expr_span(&value));
            return Ok(Expr::Binary {
                op: BinaryOp::Assign,
                left: Box::new(target),
                right: Box::new(value),
                span,
            });
        }
        Ok(target)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_unary()?;
        while let Some((op, prec)) = self.peek_kind().as_ref().and_then(binary_op) {
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            let span = expr_span(&left).union(expr_span(&right));
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            Some(TokenKind::Bang) => Some(UnaryOp::Not),
            Some(TokenKind::Ampersand) => Some(UnaryOp::AddrOf),
            Some(TokenKind::Star) => Some(UnaryOp::Deref),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.advance().span;
            let expr = self.parse_unary()?;
            let span = start.union(expr_span(&expr));
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
                span,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check(TokenKind::LParen) {
                expr = self.finish_call(expr, None)?;
            } else if self.check(TokenKind::Lt) && self.is_generic_callee(&expr) {
                let type_args = self.parse_type_arguments()?;
                if !self.check(TokenKind::LParen) {
                    return Err(self.error_here("expected `(` after type arguments"));
                }
                expr = self.finish_call(expr, Some(type_args))?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let span = self.current_span();
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                self.advance();
                match self.resolve(&name) {
                    Some(Binding::TypeParam(_)) => {
                        return Err(Diagnostic::syntax(
                            format!("type parameter `{name}` cannot be used as a value"),
                            span,
                        ));
                    }
                    None => self.report_kind(
                        DiagnosticKind::UndeclaredIdentifier { name: name.clone() },
                        span,
                    ),
                    Some(_) => {}
                }
                Ok(Expr::Identifier(Identifier { name, span }))
            }
            Some(TokenKind::Integer(value)) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(value, span)))
            }
            Some(TokenKind::Char(value)) => {
                self.advance();
                Ok(Expr::Literal(Literal::Char(value, span)))
            }
            Some(TokenKind::String(value)) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(value, span)))
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(self.error_here("expected an expression")),
        }
    }

    fn is_generic_callee(&self, callee: &Expr) -> bool {
        match callee {
            Expr::Identifier(ident) => matches!(
                self.resolve(&ident.name),
                Some(Binding::Function(function)) if function.is_generic()
            ),
            _ => false,
        }
    }

    /// `< type-name {, type-name} >`. An empty list is accepted here and
    /// rejected by the arity check.
    fn parse_type_arguments(&mut self) -> Result<Vec<TypeAnnotation>, Diagnostic> {
        self.expect(TokenKind::Lt)?;
        let mut args = Vec::new();
        if self.matches(TokenKind::Gt) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_type_name()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Gt)?;
        Ok(args)
    }

    fn finish_call(
        &mut self,
        callee: Expr,
        type_args: Option<Vec<TypeAnnotation>>,
    ) -> Result<Expr, Diagnostic> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_assignment()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RParen)?.span;
        let span = expr_span(&callee).union(close);
        self.check_call(&callee, type_args.as_deref(), args.len(), span);
        Ok(Expr::Call {
            callee: Box::new(callee),
            type_args,
            args,
            span,
        })
    }

    /// Checks type-argument arity for generic callees, then the argument
    /// count against the (instantiated) prototype when there is one.
    fn check_call(
        &mut self,
        callee: &Expr,
        type_args: Option<&[TypeAnnotation]>,
        arg_count: usize,
        span: Span,
    ) {
        let Expr::Identifier(ident) = callee else {
            return;
        };
        let Some(Binding::Function(function)) = self.resolve(&ident.name) else {
            return;
        };

        let params = match type_args {
            Some(args) => {
                let types: Vec<TypeExpr> = args.iter().map(|arg| arg.ty.clone()).collect();
                match function.check_instantiation(&types) {
                    Ok(instantiation) => {
                        self.trace(format_args!(
                            "instantiated `{}` returning {}",
                            function.name, instantiation.return_ty
                        ));
                        instantiation.params
                    }
                    Err(kind) => {
                        self.report(Diagnostic::new(kind, span).with_help(format!(
                            "`{}` is declared with {} type parameter(s)",
                            function.name,
                            function.type_parameters().len()
                        )));
                        return;
                    }
                }
            }
            None if function.is_generic() && self.options.require_type_arguments => {
                self.report(
                    Diagnostic::new(
                        DiagnosticKind::InstantiationArityMismatch {
                            name: function.name.clone(),
                            expected: function.type_parameters().len(),
                            found: 0,
                        },
                        span,
                    )
                    .with_help(format!(
                        "supply type arguments, as in `{}<int>(...)`",
                        function.name
                    )),
                );
                return;
            }
            None => function.params.clone(),
        };

        if let Some(params) = params {
            if params.len() != arg_count {
                self.report_kind(
                    DiagnosticKind::ArgumentCountMismatch {
                        name: function.name.clone(),
                        expected: params.len(),
                        found: arg_count,
                    },
                    span,
                );
            }
        }
    }
}

fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    let op = match kind {
        TokenKind::PipePipe => (BinaryOp::Or, 3),
        TokenKind::AmpersandAmpersand => (BinaryOp::And, 4),
        TokenKind::EqEq => (BinaryOp::Eq, 5),
        TokenKind::BangEq => (BinaryOp::NotEq, 5),
        TokenKind::Lt => (BinaryOp::Lt, 9),
        TokenKind::LtEq => (BinaryOp::LtEq, 9),
        TokenKind::Gt => (BinaryOp::Gt, 9),
        TokenKind::GtEq => (BinaryOp::GtEq, 9),
        TokenKind::Plus => (BinaryOp::Add, 10),
        TokenKind::Minus => (BinaryOp::Sub, 10),
        TokenKind::Star => (BinaryOp::Mul, 20),
        TokenKind::Slash => (BinaryOp::Div, 20),
        TokenKind::Percent => (BinaryOp::Rem, 20),
        _ => return None,
    };
    Some(op)
}
