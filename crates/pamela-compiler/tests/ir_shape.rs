//! Shape of the serialized IR: kind tags, ordered maps, and the
//! distinguished top-level entries.

use pamela_compiler::ast::LvarTable;
use pamela_compiler::{build_model, parse_source, serialize_model, validate};

fn model_json(src: &str) -> serde_json::Value {
    let forms = parse_source(src, 0).expect("parse failed");
    let model = build_model(&forms, &mut LvarTable::new()).expect("build failed");
    let model = validate(model).expect("validate failed");
    serde_json::from_str(&serialize_model(&model).expect("serialize failed")).expect("json")
}

#[test]
fn pclass_entries_keep_declaration_order() {
    let json = model_json(
        "(defpclass zulu []) (defpclass alpha []) (defpclass mike [])",
    );
    let names: Vec<&String> = json["pclasses"]
        .as_object()
        .expect("pclasses object")
        .keys()
        .collect();
    assert_eq!(names, ["zulu", "alpha", "mike"]);
}

#[test]
fn condition_references_carry_kind_tags() {
    let json = model_json(
        "(defpclass pwrvals [] :modes [:high :none])
         (defpclass plant []
           :fields {pwr (pwrvals :initial :none)}
           :modes {:hot (= pwr :high)})",
    );
    let hot = &json["pclasses"]["plant"]["modes"]["hot"];
    assert_eq!(hot["kind"], "equal");
    assert_eq!(hot["args"][0]["kind"], "field-reference");
    assert_eq!(hot["args"][0]["pclass"], "this");
    assert_eq!(hot["args"][0]["field"], "pwr");
    assert_eq!(hot["args"][1]["kind"], "mode-reference");
    assert_eq!(hot["args"][1]["pclass"], "pwrvals");
    assert_eq!(hot["args"][1]["mode"], "high");
}

#[test]
fn lvars_appear_under_the_distinguished_key() {
    let json = model_json("(defpclass sw [] :fields {pfail (lvar \"pfail\" 0.01)})");
    assert_eq!(json["pamela/lvars"]["pfail"]["value"]["float"], 0.01);

    let bare = model_json("(defpclass sw [])");
    assert!(bare.get("pamela/lvars").is_none());
}

#[test]
fn state_variables_are_hoisted_to_the_top_level() {
    let json = model_json("(defpclass sw [] :modes {:armed (= door-open true)})");
    let state_vars = json["state-variables"].as_array().expect("array");
    assert_eq!(state_vars.len(), 1);
    assert_eq!(state_vars[0], "door-open");
}

#[test]
fn body_statements_flatten_kind_and_decorations() {
    let json = model_json(
        "(defpclass sw []
           :methods [(defpmethod go [])
                     (defpmethod run []
                       (sequence :label :main
                         (go)
                         (delay :bounds [1 :infinity])))])",
    );
    let root = &json["pclasses"]["sw"]["methods"]["run"][0]["body"][0];
    assert_eq!(root["kind"], "sequence");
    assert_eq!(root["label"], "main");
    assert_eq!(root["body"][0]["kind"], "plant-fn-symbol");
    assert_eq!(root["body"][0]["name"], "this");
    assert_eq!(root["body"][0]["method"], "go");
    let delay = &root["body"][1];
    assert_eq!(delay["kind"], "delay");
    assert_eq!(delay["temporal-constraints"][0]["lower"], 1.0);
    assert_eq!(delay["temporal-constraints"][0]["upper"], "infinity");
}

#[test]
fn primitive_methods_serialize_without_body() {
    let json = model_json(
        "(defpclass sw [] :methods [(defpmethod halt {:doc \"stop now\"} [])])",
    );
    let halt = &json["pclasses"]["sw"]["methods"]["halt"][0];
    assert_eq!(halt["primitive"], true);
    assert_eq!(halt["doc"], "stop now");
    assert!(halt.get("body").is_none());
}
