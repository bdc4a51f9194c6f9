use crate::language::{
    errors::{Diagnostic as FrontendDiagnostic, DiagnosticKind, FrontendError},
    lexer::LexError,
};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, NamedSource, Report, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct ForAnyDiagnostic {
    #[source_code]
    src: NamedSource,
    #[label("{label}")]
    span: SourceSpan,
    #[label("first declared here")]
    previous: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl ForAnyDiagnostic {
    pub fn from_diagnostic(name: &str, source: &str, diag: &FrontendDiagnostic) -> Self {
        let previous = match &diag.kind {
            DiagnosticKind::DuplicateTypeParameter { first, .. } => Some(*first),
            DiagnosticKind::DuplicateDeclaration { previous, .. } => Some(*previous),
            _ => None,
        };
        Self {
            src: NamedSource::new(name, source.to_string()),
            span: diag.span.into(),
            previous: previous.map(SourceSpan::from),
            help: diag.help.clone(),
            message: diag.message(),
            label: diag.kind.label(),
        }
    }

    pub fn from_lex_error(name: &str, source: &str, err: &LexError) -> Self {
        Self {
            src: NamedSource::new(name, source.to_string()),
            span: err.span.into(),
            previous: None,
            help: None,
            message: err.message.clone(),
            label: "here".into(),
        }
    }
}

pub fn emit_diagnostics(name: &str, source: &str, diagnostics: &[FrontendDiagnostic]) {
    for diag in diagnostics {
        let diagnostic = ForAnyDiagnostic::from_diagnostic(name, source, diag);
        eprintln!("{:?}", Report::new(diagnostic));
    }
}

pub fn report_frontend_error(name: &str, source: &str, error: &FrontendError) {
    match error {
        FrontendError::Lex(errors) => {
            for err in errors {
                let diagnostic = ForAnyDiagnostic::from_lex_error(name, source, err);
                eprintln!("{:?}", Report::new(diagnostic));
            }
        }
        FrontendError::Internal(_) => eprintln!("{name}: {error}"),
    }
}

/// Plain-text rendering with source snippets and no colour codes.
pub fn render_diagnostics(name: &str, source: &str, diagnostics: &[FrontendDiagnostic]) -> String {
    let handler =
        GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor()).with_width(100);
    let mut out = String::new();
    for diag in diagnostics {
        let diagnostic = ForAnyDiagnostic::from_diagnostic(name, source, diag);
        if handler.render_report(&mut out, &diagnostic).is_err() {
            out.push_str(&diagnostic.to_string());
        }
        out.push('\n');
    }
    out
}
