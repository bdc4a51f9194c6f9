use crate::language::{
    scope::{ScopeId, TypeParameter},
    span::Span,
    types::TypeAnnotation,
};

#[derive(Clone, Debug)]
pub struct TranslationUnit {
    pub name: String,
    pub items: Vec<ExternalDecl>,
}

impl TranslationUnit {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.items.iter().filter_map(|item| match item {
            ExternalDecl::Function(function) => Some(function),
            ExternalDecl::Variables(_) => None,
        })
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions().find(|function| function.name.name == name)
    }
}

#[derive(Clone, Debug)]
pub enum ExternalDecl {
    Function(FunctionDecl),
    Variables(VarDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ForAnySpecifier {
    pub keyword: Span,
    pub type_params: Vec<TypeParameter>,
    /// The scope that held the type parameters while the declaration parsed.
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub name: Identifier,
    pub for_any: Option<ForAnySpecifier>,
    pub return_ty: TypeAnnotation,
    pub params: ParamList,
    pub body: Option<FunctionBody>,
    /// Scope the function name was bound into.
    pub bound_in: ScopeId,
    pub span: Span,
}

impl FunctionDecl {
    pub fn is_definition(&self) -> bool {
        self.body.is_some()
    }
}

#[derive(Clone, Debug)]
pub enum ParamList {
    /// `f()`: no prototype, calls are not arity checked.
    Unspecified,
    /// `f(void)` or a named list.
    Prototype(Vec<Param>),
}

impl ParamList {
    pub fn params(&self) -> &[Param] {
        match self {
            ParamList::Unspecified => &[],
            ParamList::Prototype(params) => params,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: Option<Identifier>,
    pub ty: TypeAnnotation,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct FunctionBody {
    pub scope: ScopeId,
    pub block: Block,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct VarDecl {
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Declarator {
    pub name: Identifier,
    pub ty: TypeAnnotation,
    pub init: Option<Expr>,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Decl(VarDecl),
    Expr(Expr),
    Return(Option<Expr>, Span),
    If {
        condition: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
        span: Span,
    },
    While {
        condition: Expr,
        body: Box<Statement>,
        span: Span,
    },
    Block(ScopeId, Block),
    Empty(Span),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Assign,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    AddrOf,
    Deref,
}

#[derive(Clone, Debug)]
pub enum Literal {
    Int(i128, Span),
    Char(char, Span),
    String(String, Span),
}

#[derive(Clone, Debug)]
pub enum Expr {
    Identifier(Identifier),
    Literal(Literal),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        type_args: Option<Vec<TypeAnnotation>>,
        args: Vec<Expr>,
        span: Span,
    },
}

pub fn expr_span(expr: &Expr) -> Span {
    match expr {
        Expr::Identifier(ident) => ident.span,
        Expr::Literal(Literal::Int(_, span))
        | Expr::Literal(Literal::Char(_, span))
        | Expr::Literal(Literal::String(_, span)) => *span,
        Expr::Binary { span, .. } => *span,
        Expr::Unary { span, .. } => *span,
        Expr::Call { span, .. } => *span,
    }
}
