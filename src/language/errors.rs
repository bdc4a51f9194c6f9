use crate::language::{lexer::LexError, scope::ScopeId, span::Span};
use thiserror::Error;

pub const CODE_SYNTAX: &str = "forany.syntax";
pub const CODE_MALFORMED_PARAMETER_LIST: &str = "forany.malformedParameterList";
pub const CODE_DUPLICATE_TYPE_PARAMETER: &str = "forany.duplicateTypeParameter";
pub const CODE_DUPLICATE_DECLARATION: &str = "forany.duplicateDeclaration";
pub const CODE_UNRESOLVED_TYPE_PARAMETER: &str = "forany.unresolvedTypeParameterReference";
pub const CODE_ARITY_MISMATCH: &str = "forany.instantiationArityMismatch";
pub const CODE_UNDECLARED_IDENTIFIER: &str = "forany.undeclaredIdentifier";
pub const CODE_ARGUMENT_COUNT: &str = "forany.argumentCountMismatch";
pub const CODE_MULTIPLE_FOR_ANY: &str = "forany.multipleForAnySpecifiers";
pub const CODE_FOR_ANY_OUTSIDE_FILE_SCOPE: &str = "forany.forAnyOutsideFileScope";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DiagnosticKind {
    #[error("{message}")]
    Syntax { message: String },
    #[error("malformed `_For_any` parameter list: {reason}")]
    MalformedParameterList { reason: String },
    #[error("duplicate type parameter `{name}`")]
    DuplicateTypeParameter { name: String, first: Span },
    #[error("redeclaration of `{name}` conflicts with previous declaration")]
    DuplicateDeclaration { name: String, previous: Span },
    #[error("unknown type name `{name}`; no enclosing `_For_any` declares it")]
    UnresolvedTypeParameterReference { name: String },
    #[error("`{name}` expects {expected} type argument(s) but {found} were supplied")]
    InstantiationArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("use of undeclared identifier `{name}`")]
    UndeclaredIdentifier { name: String },
    #[error("`{name}` expects {expected} argument(s) but {found} were supplied")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("a declaration may carry only one `_For_any` specifier")]
    MultipleForAnySpecifiers,
    #[error("`_For_any` declarations are only allowed at file scope")]
    ForAnyOutsideFileScope,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::Syntax { .. } => CODE_SYNTAX,
            DiagnosticKind::MalformedParameterList { .. } => CODE_MALFORMED_PARAMETER_LIST,
            DiagnosticKind::DuplicateTypeParameter { .. } => CODE_DUPLICATE_TYPE_PARAMETER,
            DiagnosticKind::DuplicateDeclaration { .. } => CODE_DUPLICATE_DECLARATION,
            DiagnosticKind::UnresolvedTypeParameterReference { .. } => {
                CODE_UNRESOLVED_TYPE_PARAMETER
            }
            DiagnosticKind::InstantiationArityMismatch { .. } => CODE_ARITY_MISMATCH,
            DiagnosticKind::UndeclaredIdentifier { .. } => CODE_UNDECLARED_IDENTIFIER,
            DiagnosticKind::ArgumentCountMismatch { .. } => CODE_ARGUMENT_COUNT,
            DiagnosticKind::MultipleForAnySpecifiers => CODE_MULTIPLE_FOR_ANY,
            DiagnosticKind::ForAnyOutsideFileScope => CODE_FOR_ANY_OUTSIDE_FILE_SCOPE,
        }
    }

    pub fn label(&self) -> String {
        match self {
            DiagnosticKind::DuplicateTypeParameter { .. } => "declared again here".into(),
            DiagnosticKind::DuplicateDeclaration { .. } => "conflicting declaration".into(),
            DiagnosticKind::InstantiationArityMismatch { expected, .. } => {
                format!("expected {expected} type argument(s)")
            }
            other => other.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: Span) -> Self {
        Self {
            kind,
            span,
            help: None,
        }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(
            DiagnosticKind::Syntax {
                message: message.into(),
            },
            span,
        )
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Scope push/pop went out of balance. Never recoverable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScopeFault {
    #[error("scope {scope:?} is not innermost (innermost is {top:?})")]
    NotInnermost { scope: ScopeId, top: ScopeId },
    #[error("scope {scope:?} is a {found} scope, expected {expected}")]
    WrongKind {
        scope: ScopeId,
        expected: &'static str,
        found: &'static str,
    },
    #[error("attempted to close the translation-unit scope")]
    RootClosed,
    #[error("{open} scope(s) still open after parsing")]
    Unbalanced { open: usize },
}

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("{} lexical error(s)", .0.len())]
    Lex(Vec<LexError>),
    #[error("internal scope fault: {0}")]
    Internal(#[from] ScopeFault),
}

pub type FrontendResult<T> = Result<T, FrontendError>;
