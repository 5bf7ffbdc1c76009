//! Boundary scenarios exercised through the public API, source text in,
//! IR or first error out.

use pamela_compiler::ast::{LvarTable, Model};
use pamela_compiler::{StmtKind, build_model, parse_source, validate};

fn compile_str(src: &str) -> Result<Model, pamela_compiler::CompileError> {
    let forms = parse_source(src, 0).expect("parse failed");
    let model = build_model(&forms, &mut LvarTable::new())?;
    validate(model)
}

fn first_error(src: &str) -> String {
    compile_str(src).expect_err("expected an error").to_string()
}

#[test]
fn scenario_args_not_a_vector() {
    assert_eq!(
        first_error("(defpclass bad-args :not-a-vector)"),
        "defpclass expects a vector of args."
    );
}

#[test]
fn scenario_args_must_be_symbols() {
    assert_eq!(
        first_error("(defpclass no-sym-args [:a 123])"),
        "All defpclass args must be symbols"
    );
}

#[test]
fn scenario_bad_meta_key() {
    assert!(
        first_error("(defpclass bad-meta-key [] :meta {:foo :bar})")
            .starts_with("defpclass meta key \":foo\" invalid")
    );
}

#[test]
fn scenario_meta_version_type() {
    assert_eq!(
        first_error("(defpclass bad-meta-ver [] :meta {:version 1.0})"),
        "defpclass meta :version must be a string (not \"1.0\")"
    );
}

#[test]
fn scenario_depends_version_mismatch() {
    let src = "(defpclass thing [] :meta {:version \"0.2.0\"})
               (defpclass bad-meta-depends-wrong-version []
                 :meta {:depends [[thing \"1.0\"]]})";
    assert_eq!(
        first_error(src),
        "defpclass meta :depends upon [thing \"1.0\"] but the available version is: \"0.2.0\""
    );
}

#[test]
fn scenario_zero_arg_call_to_one_arg_method() {
    let src = "(defpclass sw []
                 :methods [(defpmethod m [x])
                           (defpmethod run [] (sequence (m)))])";
    assert_eq!(first_error(src), "m has 0 args, but expects 1 arg");
}

#[test]
fn scenario_initial_mode_not_declared() {
    let src = "(defpclass bad-initializer [] :modes [:high :low])
               (defpclass holder []
                 :fields {it (bad-initializer :initial :medium)})";
    assert_eq!(
        first_error(src),
        "pclass :initial mode :medium is not one of the defined modes: [:high :low]"
    );
}

#[test]
fn scenario_empty_source_is_empty_model() {
    let model = compile_str("").expect("empty source should compile");
    assert!(model.pclasses.is_empty());
    assert!(model.lvars.is_empty());
}

#[test]
fn scenario_slack_sequence_desugar() {
    let src = "(defpclass sw []
                 :methods [(defpmethod go [])
                           (defpmethod halt [])
                           (defpmethod run [] (slack-sequence (go) (halt)))])";
    let model = compile_str(src).expect("compile failed");
    let root = &model.pclasses["sw"].methods["run"][0].body[0];

    // sequence [default-delay (go) default-delay (halt) default-delay]
    assert_eq!(root.kind, StmtKind::Sequence);
    assert_eq!(root.body.len(), 5);
    assert_eq!(root.body[0].kind, StmtKind::Delay);
    assert_eq!(root.body[2].kind, StmtKind::Delay);
    assert_eq!(root.body[4].kind, StmtKind::Delay);
    assert!(matches!(root.body[1].kind, StmtKind::PlantFnSymbol { .. }));
    assert!(matches!(root.body[3].kind, StmtKind::PlantFnSymbol { .. }));
}

#[test]
fn validated_ir_is_stable_under_revalidation() {
    let src = "(defpclass pwrvals [] :modes [:high :none])
               (defpclass plant []
                 :fields {pwr (pwrvals :initial :none)}
                 :modes {:hot (= pwr :high)}
                 :methods [(defpmethod run []
                             (when (= pwr :high) (sequence (delay))))])";
    let once = compile_str(src).expect("compile failed");
    let twice = validate(once.clone()).expect("revalidation failed");
    assert_eq!(once, twice);
}
