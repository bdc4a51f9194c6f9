use super::*;

impl Parser {
    /// `{ statement* }` in whatever scope the caller opened for it. A statement
    /// that fails to parse is reported and skipped.
    pub(super) fn parse_block_contents(&mut self) -> Result<Block, Diagnostic> {
        let open = self.expect(TokenKind::LBrace)?.span;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) => {
                    self.report(err);
                    self.synchronize_statement();
                }
            }
            if self.fault.is_some() {
                break;
            }
        }
        let close = self.expect(TokenKind::RBrace)?.span;
        Ok(Block {
            statements,
            span: open.union(close),
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, Diagnostic> {
        let start = self.current_span();
        match self.peek_kind() {
            Some(TokenKind::LBrace) => self.parse_nested_block(),
            Some(TokenKind::Checked) | Some(TokenKind::Unchecked) => {
                self.advance();
                if !self.check(TokenKind::LBrace) {
                    return Err(self.error_here("expected `{` to open a checked scope"));
                }
                self.parse_nested_block()
            }
            Some(TokenKind::Semi) => {
                self.advance();
                Ok(Statement::Empty(start))
            }
            Some(TokenKind::Return) => {
                self.advance();
                let value = if self.check(TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                let end = self.expect(TokenKind::Semi)?.span;
                Ok(Statement::Return(value, start.union(end)))
            }
            Some(TokenKind::If) => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let condition = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                let then_branch = Box::new(self.parse_statement()?);
                let else_branch = if self.matches(TokenKind::Else) {
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                    span: start.union(self.previous_span()),
                })
            }
            Some(TokenKind::While) => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let condition = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                let body = Box::new(self.parse_statement()?);
                Ok(Statement::While {
                    condition,
                    body,
                    span: start.union(self.previous_span()),
                })
            }
            Some(TokenKind::ForAny) => Err(Diagnostic::new(
                DiagnosticKind::ForAnyOutsideFileScope,
                start,
            )
            .with_help("move the generic function to file scope")),
            _ if self.starts_declaration() => self.parse_local_decl().map(Statement::Decl),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semi)?;
                Ok(Statement::Expr(expr))
            }
        }
    }

    fn parse_nested_block(&mut self) -> Result<Statement, Diagnostic> {
        self.within_scope(ScopeKind::Block, |p, scope| {
            p.parse_block_contents()
                .map(|block| Statement::Block(scope, block))
        })
    }

    /// Type keywords always start a declaration. An identifier does when it
    /// names a type parameter, or when another identifier follows it (`U x;`),
    /// so unknown type names are reported as such.
    fn starts_declaration(&self) -> bool {
        match self.peek_kind() {
            Some(kind) if kind.is_builtin_type() || kind.is_checked_pointer() => true,
            Some(TokenKind::Identifier(name)) => {
                self.is_type_param_name(&name)
                    || matches!(self.peek_kind_n(1), Some(TokenKind::Identifier(_)))
            }
            _ => false,
        }
    }

    fn parse_local_decl(&mut self) -> Result<VarDecl, Diagnostic> {
        let start = self.current_span().start;
        let base = self.parse_decl_specifier()?;
        let (ty, name) = self.parse_declarator_head(&base)?;
        if self.check(TokenKind::LParen) {
            return Err(self.error_here("functions cannot be declared inside a block"));
        }
        self.parse_var_decl_rest(start, &base, ty, name)
    }
}
