use super::*;
use crate::language::errors::{
    CODE_ARGUMENT_COUNT, CODE_ARITY_MISMATCH, CODE_DUPLICATE_DECLARATION,
    CODE_DUPLICATE_TYPE_PARAMETER, CODE_FOR_ANY_OUTSIDE_FILE_SCOPE, CODE_MALFORMED_PARAMETER_LIST,
    CODE_MULTIPLE_FOR_ANY, CODE_SYNTAX, CODE_UNDECLARED_IDENTIFIER, CODE_UNRESOLVED_TYPE_PARAMETER,
};

const FIXTURE: &str = include_str!("../../../tests/fixtures/forany_parsing.c");

const SCENARIO: &str = "\
_For_any(T) _Ptr<T> F(void) { _Ptr<T> r; return r; }
int g() { int x=0; F<int>(); return 0; }
";

fn analyze(source: &str) -> Analysis {
    analyze_with(source, FrontendOptions::default())
}

fn analyze_with(source: &str, options: FrontendOptions) -> Analysis {
    parse_translation_unit("test.c", source, &options).expect("parse")
}

fn codes(analysis: &Analysis) -> Vec<&'static str> {
    analysis.diagnostics.iter().map(Diagnostic::code).collect()
}

fn states_for(analysis: &Analysis, function: &str) -> Vec<ForAnyState> {
    let keyword = analysis
        .unit
        .function(function)
        .and_then(|decl| decl.for_any.as_ref())
        .map(|spec| spec.keyword)
        .expect("generic function");
    analysis
        .transitions
        .iter()
        .filter(|transition| transition.specifier == keyword)
        .map(|transition| transition.state.clone())
        .collect()
}

#[test]
fn fixture_parses_without_diagnostics() {
    let analysis = analyze(FIXTURE);
    assert!(analysis.is_clean(), "{:?}", analysis.diagnostics);
    assert!(analysis.stats.is_balanced());
    assert_eq!(analysis.stats.polymorphic_opened, 4);

    let root = analysis.scopes.get(analysis.file_scope());
    for name in [
        "TestDefinitionWithNoParameter",
        "TestDefinitionWithParameter",
        "TestDeclarationWithNoParameter",
        "TestDeclarationWithParameter",
        "callPolymorphicTypes",
    ] {
        assert!(root.function(name).is_some(), "`{name}` missing from file scope");
    }
    let two = root.function("TestDefinitionWithParameter").expect("bound");
    let names: Vec<&str> = two.type_parameters().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["T", "S"]);
}

#[test]
fn generic_definition_binds_outside_its_polymorphic_scope() {
    let analysis = analyze(SCENARIO);
    assert!(analysis.is_clean(), "{:?}", analysis.diagnostics);

    let root = analysis.file_scope();
    let f = analysis.unit.function("F").expect("F parsed");
    let spec = f.for_any.as_ref().expect("specifier");
    let body = f.body.as_ref().expect("body");

    assert_eq!(f.bound_in, root);
    assert_eq!(analysis.scopes.parent(spec.scope), Some(root));
    assert_eq!(analysis.scopes.parent(body.scope), Some(spec.scope));
    assert_eq!(analysis.scopes.get(spec.scope).kind, ScopeKind::Polymorphic);
    assert!(analysis.scopes.get(root).function("F").is_some());
    assert!(analysis.scopes.get(spec.scope).entity("F").is_none());

    let t = analysis
        .scopes
        .resolve_type_param_from(body.scope, "T")
        .expect("T visible in body");
    assert_eq!(t.scope, spec.scope);
    assert_eq!(t.index, 0);
    assert!(analysis.scopes.resolve_type_param_from(root, "T").is_none());

    let Statement::Decl(local) = &body.block.statements[0] else {
        panic!("expected a declaration, got {:?}", body.block.statements[0]);
    };
    assert_eq!(
        local.declarators[0].ty.ty,
        TypeExpr::Checked {
            kind: CheckedPointerKind::Ptr,
            pointee: Box::new(TypeExpr::TypeParam(t)),
        }
    );

    let g = analysis.unit.function("g").expect("g parsed");
    let g_body = g.body.as_ref().expect("g body");
    assert!(analysis.scopes.lookup_from(g_body.scope, "F").is_some());
}

#[test]
fn prototype_opens_no_body_scope() {
    let analysis = analyze("_For_any(Q) _Ptr<Q> P(_Ptr<Q> a);\n");
    assert!(analysis.is_clean());
    assert_eq!(analysis.stats.opened, 1);
    assert_eq!(analysis.stats.polymorphic_opened, 1);
    assert_eq!(
        states_for(&analysis, "P"),
        vec![
            ForAnyState::ParsingParamList,
            ForAnyState::ScopeOpened,
            ForAnyState::ParsingSignature,
            ForAnyState::ScopeClosed,
            ForAnyState::Bound,
            ForAnyState::Done,
        ]
    );
    let spec = analysis.unit.function("P").and_then(|f| f.for_any.as_ref()).expect("spec");
    assert!(analysis.scopes.get(spec.scope).children.is_empty());
}

#[test]
fn definition_passes_through_body_state() {
    let analysis = analyze("_For_any(T) T id(T x) { return x; }\n");
    assert!(analysis.is_clean());
    assert_eq!(
        states_for(&analysis, "id"),
        vec![
            ForAnyState::ParsingParamList,
            ForAnyState::ScopeOpened,
            ForAnyState::ParsingSignature,
            ForAnyState::ParsingBody,
            ForAnyState::ScopeClosed,
            ForAnyState::Bound,
            ForAnyState::Done,
        ]
    );
}

#[test]
fn declared_prototype_can_be_called_with_matching_arity() {
    let source = "\
_For_any(Q) _Ptr<Q> P(_Ptr<Q> a);
int main(void) { int n = 0; P<int>(&n); return 0; }
";
    assert!(analyze(source).is_clean());

    let mismatched = source.replace("P<int>", "P<int, int>");
    let analysis = analyze(&mismatched);
    assert_eq!(codes(&analysis), vec![CODE_ARITY_MISMATCH]);
    assert_eq!(
        analysis.diagnostics[0].kind,
        DiagnosticKind::InstantiationArityMismatch {
            name: "P".into(),
            expected: 1,
            found: 2,
        }
    );
}

#[test]
fn duplicate_type_parameter_is_reported_and_first_kept() {
    let analysis = analyze("_For_any(T, T) T id(T x) { return x; }\n");
    assert_eq!(codes(&analysis), vec![CODE_DUPLICATE_TYPE_PARAMETER]);
    assert_eq!(
        analysis.diagnostics[0].kind,
        DiagnosticKind::DuplicateTypeParameter {
            name: "T".into(),
            first: Span::new(9, 10),
        }
    );
    assert_eq!(analysis.diagnostics[0].span, Span::new(12, 13));

    let spec = analysis.unit.function("id").and_then(|f| f.for_any.as_ref()).expect("spec");
    assert_eq!(spec.type_params.len(), 1);
    assert_eq!(spec.type_params[0].span, Span::new(9, 10));
}

#[test]
fn malformed_lists_are_reported_once_and_stay_balanced() {
    for source in [
        "_For_any() int f(void);",
        "_For_any(T,) int f(void);",
        "_For_any(1) int f(void);",
        "_For_any(T U) int f(void);",
        "_For_any(,T) int f(void);",
    ] {
        let analysis = analyze(source);
        assert_eq!(codes(&analysis), vec![CODE_MALFORMED_PARAMETER_LIST], "{source}");
        assert!(analysis.stats.is_balanced(), "{source}");
        assert!(
            analysis.scopes.get(analysis.file_scope()).function("f").is_some(),
            "{source}"
        );
    }
}

#[test]
fn missing_parenthesis_still_closes_the_scope() {
    let analysis = analyze("_For_any T int f(void);\nint ok(void);\n");
    assert_eq!(analysis.diagnostics[0].code(), CODE_MALFORMED_PARAMETER_LIST);
    assert!(analysis.stats.is_balanced());
    assert_eq!(analysis.stats.polymorphic_closed, 1);
    assert!(analysis.scopes.get(analysis.file_scope()).function("ok").is_some());
}

#[test]
fn poisoned_scope_suppresses_unresolved_names() {
    let analysis = analyze("_For_any(T,) T f(T x) { T y = x; return y; }\n");
    assert_eq!(codes(&analysis), vec![CODE_MALFORMED_PARAMETER_LIST]);
    let spec = analysis.unit.function("f").and_then(|f| f.for_any.as_ref()).expect("spec");
    assert!(analysis.scopes.get(spec.scope).is_poisoned());
}

#[test]
fn type_parameters_do_not_leak_past_their_declaration() {
    let analysis = analyze("_For_any(T) T id(T x) { return x; }\nT leak;\n");
    assert_eq!(codes(&analysis), vec![CODE_UNRESOLVED_TYPE_PARAMETER]);

    let analysis = analyze("int f(U x);\n");
    assert_eq!(
        analysis.diagnostics[0].kind,
        DiagnosticKind::UnresolvedTypeParameterReference { name: "U".into() }
    );
}

#[test]
fn nested_specifier_is_rejected() {
    let analysis = analyze("_For_any(T) _For_any(U) T f(T x);\n");
    assert_eq!(codes(&analysis), vec![CODE_MULTIPLE_FOR_ANY]);
    let f = analysis.unit.function("f").expect("still parsed");
    let spec = f.for_any.as_ref().expect("outer specifier");
    assert_eq!(spec.type_params.len(), 1);
    assert!(analysis.scopes.get(spec.scope).is_poisoned());
    assert!(analysis.stats.is_balanced());
}

#[test]
fn for_any_inside_a_block_is_rejected() {
    let analysis = analyze(
        "int main(void) { _For_any(T) T id(T x) { return x; } return 0; }\n",
    );
    assert_eq!(codes(&analysis), vec![CODE_FOR_ANY_OUTSIDE_FILE_SCOPE]);
    assert_eq!(analysis.stats.polymorphic_opened, 0);
    assert!(analysis.stats.is_balanced());
}

#[test]
fn generic_function_can_call_itself() {
    let analysis = analyze("_For_any(T) T id(T x) { return id<T>(x); }\n");
    assert!(analysis.is_clean(), "{:?}", analysis.diagnostics);
}

#[test]
fn sibling_declarations_get_independent_scopes() {
    let analysis = analyze(
        "_For_any(T) T a(T x) { return x; }\n_For_any(T) T b(T x) { return x; }\n",
    );
    assert!(analysis.is_clean());

    let scope_of = |name: &str| {
        let decl = analysis.unit.function(name).expect("parsed");
        let body = decl.body.as_ref().expect("body").scope;
        let param = analysis
            .scopes
            .resolve_type_param_from(body, "T")
            .expect("T in body");
        (decl.for_any.as_ref().expect("spec").scope, param.scope)
    };
    let (a_poly, a_param) = scope_of("a");
    let (b_poly, b_param) = scope_of("b");
    assert_ne!(a_poly, b_poly);
    assert_eq!(a_param, a_poly);
    assert_eq!(b_param, b_poly);
}

#[test]
fn independent_parses_do_not_share_state() {
    let source = "_For_any(T) T id(T x);\n";
    let first = analyze(source);
    let second = analyze(source);
    assert_eq!(first.scopes.len(), second.scopes.len());
    assert_eq!(first.stats, second.stats);
    assert_eq!(first.transitions, second.transitions);
}

#[test]
fn calls_without_type_arguments_follow_the_option() {
    let source = "_For_any(T) T id(T x);\nint main(void) { return id(1); }\n";
    let analysis = analyze(source);
    assert_eq!(
        analysis.diagnostics[0].kind,
        DiagnosticKind::InstantiationArityMismatch {
            name: "id".into(),
            expected: 1,
            found: 0,
        }
    );

    let relaxed = FrontendOptions {
        require_type_arguments: false,
        ..FrontendOptions::default()
    };
    assert!(analyze_with(source, relaxed).is_clean());
}

#[test]
fn argument_count_is_checked_after_instantiation() {
    let analysis = analyze(
        "_For_any(T) T id(T x);\nint main(void) { return id<int>(1, 2); }\n",
    );
    assert_eq!(codes(&analysis), vec![CODE_ARGUMENT_COUNT]);
}

#[test]
fn unprototyped_functions_accept_any_argument_count() {
    assert!(analyze("int f();\nint main(void) { return f(1, 2, 3); }\n").is_clean());
}

#[test]
fn redeclaration_may_rename_type_parameters() {
    let analysis = analyze("_For_any(T) T id(T x);\n_For_any(U) U id(U y) { return y; }\n");
    assert!(analysis.is_clean(), "{:?}", analysis.diagnostics);

    let definition = analysis
        .unit
        .functions()
        .find(|decl| decl.is_definition())
        .expect("definition");
    let bound = analysis
        .scopes
        .get(analysis.file_scope())
        .function("id")
        .expect("bound");
    assert!(bound.defined);
    assert_eq!(
        bound.poly_scope,
        definition.for_any.as_ref().map(|spec| spec.scope)
    );
}

fn instantiate_bound(analysis: &Analysis, name: &str, args: &[TypeExpr]) -> (String, Vec<String>) {
    let bound = analysis
        .scopes
        .get(analysis.file_scope())
        .function(name)
        .expect("bound");
    let inst = bound.check_instantiation(args).expect("arity");
    let params = inst
        .params
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect();
    (inst.return_ty.to_string(), params)
}

#[test]
fn merged_definition_instantiates_its_signature() {
    let analysis = analyze(
        "_For_any(T) _Ptr<T> id(_Ptr<T> x);
_For_any(U) _Ptr<U> id(_Ptr<U> y) { return y; }
",
    );
    assert!(analysis.is_clean(), "{:?}", analysis.diagnostics);
    let (ret, params) = instantiate_bound(&analysis, "id", &[TypeExpr::int()]);
    assert_eq!(ret, "_Ptr<int>");
    assert_eq!(params, vec!["_Ptr<int>".to_string()]);
}

#[test]
fn unprototyped_definition_keeps_prototype_parameters() {
    let analysis = analyze(
        "_For_any(T) _Ptr<T> id(_Ptr<T> x);
_For_any(U) _Ptr<U> id() { _Ptr<U> r; return r; }
",
    );
    assert!(analysis.is_clean(), "{:?}", analysis.diagnostics);
    let (ret, params) = instantiate_bound(&analysis, "id", &[TypeExpr::int()]);
    assert_eq!(ret, "_Ptr<int>");
    assert_eq!(params, vec!["_Ptr<int>".to_string()]);
}

#[test]
fn late_prototype_parameters_follow_the_first_scope() {
    let analysis = analyze("_For_any(T) _Ptr<T> id();
_For_any(U) _Ptr<U> id(_Ptr<U> y);
");
    assert!(analysis.is_clean(), "{:?}", analysis.diagnostics);
    let (ret, params) = instantiate_bound(&analysis, "id", &[TypeExpr::int()]);
    assert_eq!(ret, "_Ptr<int>");
    assert_eq!(params, vec!["_Ptr<int>".to_string()]);
}

#[test]
fn conflicting_redeclaration_shadows_the_first() {
    let analysis = analyze("_For_any(T) T id(T x);\n_For_any(T, U) T id(T x);\n");
    assert_eq!(codes(&analysis), vec![CODE_DUPLICATE_DECLARATION]);
    let bound = analysis
        .scopes
        .get(analysis.file_scope())
        .function("id")
        .expect("bound");
    assert_eq!(bound.type_parameters().len(), 2);
}

#[test]
fn duplicate_parameter_names_in_prototype() {
    let analysis = analyze("int f(int a, int a);\n");
    assert_eq!(codes(&analysis), vec![CODE_DUPLICATE_DECLARATION]);
}

#[test]
fn undeclared_identifiers_are_reported() {
    let analysis = analyze("int main(void) { return missing; }\n");
    assert_eq!(codes(&analysis), vec![CODE_UNDECLARED_IDENTIFIER]);
}

#[test]
fn type_parameter_is_not_a_value() {
    let analysis = analyze("_For_any(T) int f(void) { return T; }\n");
    assert_eq!(codes(&analysis), vec![CODE_SYNTAX]);
    assert!(analysis.stats.is_balanced());
}

#[test]
fn failed_signature_records_error_state() {
    let analysis = analyze("_For_any(T) T;\nint after(void);\n");
    assert_eq!(codes(&analysis), vec![CODE_SYNTAX]);
    assert!(analysis.stats.is_balanced());
    let states: Vec<ForAnyState> = analysis
        .transitions
        .iter()
        .map(|transition| transition.state.clone())
        .collect();
    assert!(states.contains(&ForAnyState::Error(CODE_SYNTAX)));
    assert!(!states.contains(&ForAnyState::Bound));
    assert!(analysis.scopes.get(analysis.file_scope()).function("after").is_some());
}

#[test]
fn checked_blocks_open_their_own_scope() {
    let analysis = analyze(
        "_For_any(T) int f(_Ptr<T> p) { _Checked { _Ptr<T> q = p; } _Unchecked { int q; } return 0; }\n",
    );
    assert!(analysis.is_clean(), "{:?}", analysis.diagnostics);
    assert_eq!(analysis.stats.opened, 4);
}

#[test]
fn lexer_failures_surface_as_errors() {
    let err = parse_translation_unit("bad.c", "int x = @;", &FrontendOptions::default())
        .expect_err("lex error");
    assert!(matches!(err, FrontendError::Lex(errors) if errors.len() == 1));
}

#[test]
fn check_source_returns_only_diagnostics() {
    let diagnostics =
        check_source("int main(void) { return nope; }", &FrontendOptions::default()).expect("parse");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message(), "use of undeclared identifier `nope`");
}
