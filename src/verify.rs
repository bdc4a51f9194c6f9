//! `-verify` style checking: a source file states the diagnostics it expects
//! in comments and the produced ones are compared against them.
//!
//! ```c
//! int f(U x); // expected-error {{unknown type name `U`}}
//! // expected-error@+1 {{use of undeclared identifier}}
//! ```
//!
//! An expectation matches a diagnostic reported on the same line (shifted by
//! `@+N`/`@-N`) whose message contains the quoted text.

use crate::language::errors::Diagnostic;
use nom::{
    IResult, Parser as NomParser,
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{char, digit1, space0},
    combinator::{map_res, opt},
    sequence::delimited,
};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expectation {
    pub line: usize,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unexpected {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("line {line}: malformed verification directive")]
    MalformedDirective { line: usize },
    #[error("`expected-no-diagnostics` cannot be combined with `expected-error` directives")]
    ConflictingDirectives,
    #[error("no verification directives found; add `expected-no-diagnostics` or `expected-error`")]
    NoDirectives,
    #[error("{}", mismatch_summary(.unexpected, .missing))]
    Mismatch {
        unexpected: Vec<Unexpected>,
        missing: Vec<Expectation>,
    },
}

fn mismatch_summary(unexpected: &[Unexpected], missing: &[Expectation]) -> String {
    let mut out = format!(
        "{} unexpected and {} missing diagnostic(s)",
        unexpected.len(),
        missing.len()
    );
    for item in unexpected {
        out.push_str(&format!("\n  line {}: unexpected: {}", item.line, item.message));
    }
    for item in missing {
        out.push_str(&format!("\n  line {}: expected but not seen: {}", item.line, item.text));
    }
    out
}

#[derive(Debug, PartialEq)]
enum Directive {
    NoDiagnostics,
    Error { offset: i64, text: String },
}

fn no_diagnostics(input: &str) -> IResult<&str, Directive> {
    let (input, _) = tag("expected-no-diagnostics")(input)?;
    Ok((input, Directive::NoDiagnostics))
}

fn line_offset(input: &str) -> IResult<&str, i64> {
    let (input, _) = tag("@")(input)?;
    let (input, sign) = alt((char('+'), char('-'))).parse(input)?;
    let (input, amount) = map_res(digit1, |s: &str| s.parse::<i64>()).parse(input)?;
    Ok((input, if sign == '-' { -amount } else { amount }))
}

fn expected_error(input: &str) -> IResult<&str, Directive> {
    let (input, _) = tag("expected-error")(input)?;
    let (input, offset) = opt(line_offset).parse(input)?;
    let (input, _) = space0(input)?;
    let (input, text) = delimited(tag("{{"), take_until("}}"), tag("}}")).parse(input)?;
    Ok((
        input,
        Directive::Error {
            offset: offset.unwrap_or(0),
            text: text.trim().to_string(),
        },
    ))
}

fn directive(input: &str) -> IResult<&str, Directive> {
    alt((no_diagnostics, expected_error)).parse(input)
}

const DIRECTIVE_NAMES: [&str; 2] = ["expected-error", "expected-no-diagnostics"];

fn comment_start(line: &str) -> Option<usize> {
    match (line.find("//"), line.find("/*")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Collects the `expected-error` directives of `source`. An empty list means
/// the file declared `expected-no-diagnostics`.
pub fn expectations(source: &str) -> Result<Vec<Expectation>, VerifyError> {
    let mut expected = Vec::new();
    let mut no_diagnostics = false;

    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        let Some(start) = comment_start(line) else {
            continue;
        };
        let mut rest = &line[start..];
        while let Some(pos) = rest.find("expected-") {
            let candidate = &rest[pos..];
            if !DIRECTIVE_NAMES.iter().any(|name| candidate.starts_with(name)) {
                rest = &candidate["expected-".len()..];
                continue;
            }
            let (remaining, found) = directive(candidate)
                .map_err(|_| VerifyError::MalformedDirective { line: line_no })?;
            match found {
                Directive::NoDiagnostics => no_diagnostics = true,
                Directive::Error { offset, text } => {
                    let target = line_no as i64 + offset;
                    if target < 1 {
                        return Err(VerifyError::MalformedDirective { line: line_no });
                    }
                    expected.push(Expectation {
                        line: target as usize,
                        text,
                    });
                }
            }
            rest = remaining;
        }
    }

    match (no_diagnostics, expected.is_empty()) {
        (true, false) => Err(VerifyError::ConflictingDirectives),
        (false, true) => Err(VerifyError::NoDirectives),
        _ => Ok(expected),
    }
}

pub fn verify(source: &str, diagnostics: &[Diagnostic]) -> Result<(), VerifyError> {
    let mut missing = expectations(source)?;
    let mut unexpected = Vec::new();

    for diag in diagnostics {
        let line = diag.span.line_in(source);
        let message = diag.message();
        let matched = missing
            .iter()
            .position(|exp| exp.line == line && message.contains(&exp.text));
        match matched {
            Some(index) => {
                missing.remove(index);
            }
            None => unexpected.push(Unexpected { line, message }),
        }
    }

    if unexpected.is_empty() && missing.is_empty() {
        Ok(())
    } else {
        Err(VerifyError::Mismatch {
            unexpected,
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{errors::DiagnosticKind, span::Span};

    fn undeclared(name: &str, span: Span) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::UndeclaredIdentifier { name: name.into() }, span)
    }

    #[test]
    fn parses_directives_with_line_offsets() {
        let source = "\
int a; // expected-error {{first}}
// expected-error@+1 {{second}}
int b;
int c; /* expected-error@-2 {{ third }} */
";
        assert_eq!(
            expectations(source),
            Ok(vec![
                Expectation { line: 1, text: "first".into() },
                Expectation { line: 3, text: "second".into() },
                Expectation { line: 2, text: "third".into() },
            ])
        );
    }

    #[test]
    fn text_outside_comments_is_ignored() {
        let source = "char *s = \"expected-error\";\n// expected-no-diagnostics\n";
        assert_eq!(expectations(source), Ok(Vec::new()));
    }

    #[test]
    fn other_expected_words_are_not_directives() {
        let source = "int v; // the expected-value is zero\n// expected-error {{real}} not expected-ly\n";
        assert_eq!(
            expectations(source),
            Ok(vec![Expectation { line: 2, text: "real".into() }])
        );
    }

    #[test]
    fn directive_errors() {
        assert_eq!(
            expectations("// expected-error {{never closed\n"),
            Err(VerifyError::MalformedDirective { line: 1 })
        );
        assert_eq!(
            expectations("// expected-error@-3 {{before the file}}\n"),
            Err(VerifyError::MalformedDirective { line: 1 })
        );
        assert_eq!(
            expectations("// expected-no-diagnostics\nint x; // expected-error {{x}}\n"),
            Err(VerifyError::ConflictingDirectives)
        );
        assert_eq!(expectations("int x;\n"), Err(VerifyError::NoDirectives));
    }

    #[test]
    fn matching_diagnostics_pass() {
        let source = "int f(void) {\n  return nope; // expected-error {{undeclared identifier `nope`}}\n}\n";
        let offset = source.find("nope").expect("present");
        let diags = [undeclared("nope", Span::new(offset, offset + 4))];
        assert_eq!(verify(source, &diags), Ok(()));
    }

    #[test]
    fn mismatches_list_both_sides() {
        let source = "// expected-error {{wanted}}\nint x;\n";
        let diags = [undeclared("x", Span::new(30, 31))];
        let err = verify(source, &diags).expect_err("mismatch");
        assert_eq!(
            err,
            VerifyError::Mismatch {
                unexpected: vec![Unexpected {
                    line: 2,
                    message: "use of undeclared identifier `x`".into(),
                }],
                missing: vec![Expectation { line: 1, text: "wanted".into() }],
            }
        );
        let text = err.to_string();
        assert!(text.starts_with("1 unexpected and 1 missing diagnostic(s)"), "{text}");
        assert!(text.contains("line 1: expected but not seen: wanted"), "{text}");
    }
}
