use pretty_assertions::assert_eq;
use serde_json::json;
use tether_convert::{OutputContext, StateOrigin};
use tether_import::{ImportError, Severity, import_inputs};
use tether_schema::{
    AttributeDeclaration, BlockDeclaration, BridgeConfig, Capabilities, ProviderDeclaration,
    ResourceDeclaration, ResourceSchema, SchemaBuilder,
};
use tether_types::{ForeignValue, PropertyMap, PropertyPath, PropertyValue};

const TOKEN: &str = "example_database";

fn non_empty(value: &ForeignValue) -> Result<(), String> {
    match value {
        ForeignValue::String(s) if s.is_empty() => Err("name must not be empty".to_string()),
        _ => Ok(()),
    }
}

fn looks_like_host(value: &ForeignValue) -> Result<(), String> {
    match value {
        ForeignValue::String(s) if !s.contains('.') => Err(format!("{s:?} is not a fully qualified host")),
        _ => Ok(()),
    }
}

fn positive(value: &ForeignValue) -> Result<(), String> {
    match value {
        ForeignValue::Int(n) if *n <= 0 => Err(format!("must be positive, got {n}")),
        _ => Ok(()),
    }
}

fn valid_port(value: &ForeignValue) -> Result<(), String> {
    match value {
        ForeignValue::Int(n) if !(1..=65535).contains(n) => Err(format!("port {n} out of range")),
        _ => Ok(()),
    }
}

fn always_rejects(_: &ForeignValue) -> Result<(), String> {
    Err("never valid".to_string())
}

fn make_schema() -> ResourceSchema {
    let param = BlockDeclaration::new([
        ("name", AttributeDeclaration::string().required()),
        ("value", AttributeDeclaration::string().optional()),
    ]);
    let resource = ResourceDeclaration::new([
        ("name", AttributeDeclaration::string().required()),
        ("endpoint", AttributeDeclaration::string().optional().computed()),
        ("engine", AttributeDeclaration::string().optional().default_value(json!("postgres"))),
        ("port", AttributeDeclaration::int().optional().default_value(json!(5432))),
        ("storage_gb", AttributeDeclaration::int().optional()),
        ("replicas", AttributeDeclaration::int().optional()),
        ("ports", AttributeDeclaration::set_of(AttributeDeclaration::int()).optional()),
        ("param", AttributeDeclaration::block_list(param).optional()),
        ("arn", AttributeDeclaration::string().computed()),
    ]);
    let mut decl = ProviderDeclaration::default();
    decl.resources.insert(TOKEN.to_string(), resource);

    let mut caps = Capabilities::new();
    caps.resource(TOKEN)
        .validator("name", non_empty)
        .validator("endpoint", looks_like_host)
        .validator("storage_gb", positive)
        .validator("ports[*]", valid_port)
        .validator("param[*].name", always_rejects);

    let provider = SchemaBuilder::new(&decl, &caps, &BridgeConfig::default())
        .build()
        .unwrap();
    provider.resource(TOKEN).unwrap().clone()
}

fn read_ctx() -> OutputContext<'static> {
    OutputContext::new(StateOrigin::Read)
}

fn props<const N: usize>(entries: [(&str, PropertyValue); N]) -> PropertyMap {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

// ── Validation policy ────────────────────────────────────────────

#[test]
fn failing_computed_attribute_is_dropped_with_warning() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("name", ForeignValue::string("main")),
        ("endpoint", ForeignValue::string("localhost")),
        ("arn", ForeignValue::string("arn:db:1")),
    ]);

    let outcome = import_inputs(&schema, &state, &read_ctx()).unwrap();

    assert_eq!(outcome.dropped, vec![PropertyPath::root("endpoint")]);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].severity, Severity::Warning);
    assert_eq!(outcome.diagnostics[0].message, "\"localhost\" is not a fully qualified host");
    assert!(!outcome.has_errors());
    assert_eq!(outcome.outputs.get("endpoint"), Some(&PropertyValue::Null));
    assert_eq!(outcome.outputs.get("arn"), Some(&PropertyValue::string("arn:db:1")));
    assert_eq!(outcome.inputs, props([("name", PropertyValue::string("main"))]));
}

#[test]
fn valid_computed_attribute_becomes_an_input() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("name", ForeignValue::string("main")),
        ("endpoint", ForeignValue::string("db.internal")),
    ]);

    let outcome = import_inputs(&schema, &state, &read_ctx()).unwrap();

    assert!(outcome.diagnostics.is_empty());
    assert!(outcome.dropped.is_empty());
    assert_eq!(
        outcome.inputs,
        props([
            ("endpoint", PropertyValue::string("db.internal")),
            ("name", PropertyValue::string("main")),
        ])
    );
}

#[test]
fn failing_required_attribute_is_kept_as_error() {
    let schema = make_schema();
    let state = ForeignValue::map([("name", ForeignValue::string(""))]);

    let outcome = import_inputs(&schema, &state, &read_ctx()).unwrap();

    assert!(outcome.has_errors());
    assert!(outcome.dropped.is_empty());
    assert_eq!(outcome.diagnostics[0].path, PropertyPath::root("name"));
    assert_eq!(outcome.diagnostics[0].severity, Severity::Error);
    assert_eq!(outcome.diagnostics[0].message, "name must not be empty");
    // Required inputs survive pruning even when empty.
    assert_eq!(outcome.inputs.get("name"), Some(&PropertyValue::string("")));
}

#[test]
fn failing_optional_input_is_kept_as_error() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("name", ForeignValue::string("main")),
        ("storage_gb", ForeignValue::Int(-1)),
    ]);

    let outcome = import_inputs(&schema, &state, &read_ctx()).unwrap();

    assert!(outcome.has_errors());
    assert_eq!(outcome.diagnostics[0].path, PropertyPath::root("storageGb"));
    assert_eq!(outcome.diagnostics[0].message, "must be positive, got -1");
    assert_eq!(outcome.inputs.get("storageGb"), Some(&PropertyValue::Number(-1.0)));
}

#[test]
fn unknown_values_are_not_validated() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("name", ForeignValue::string("main")),
        ("endpoint", ForeignValue::Unknown),
    ]);

    let outcome = import_inputs(&schema, &state, &read_ctx()).unwrap();

    assert!(outcome.diagnostics.is_empty());
    assert_eq!(outcome.outputs.get("endpoint"), Some(&PropertyValue::Computed));
}

// ── Element validators ───────────────────────────────────────────

#[test]
fn scalar_elements_are_validated_one_by_one() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("name", ForeignValue::string("main")),
        ("ports", ForeignValue::Set(vec![ForeignValue::Int(80), ForeignValue::Int(70000)])),
    ]);

    let outcome = import_inputs(&schema, &state, &read_ctx()).unwrap();

    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].path, PropertyPath::root("ports"));
    assert_eq!(outcome.diagnostics[0].severity, Severity::Error);
    assert_eq!(outcome.diagnostics[0].message, "port 70000 out of range");
}

#[test]
fn valid_scalar_elements_pass() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("name", ForeignValue::string("main")),
        ("ports", ForeignValue::Set(vec![ForeignValue::Int(443), ForeignValue::Int(80)])),
    ]);

    let outcome = import_inputs(&schema, &state, &read_ctx()).unwrap();

    assert!(outcome.diagnostics.is_empty());
    let ports = outcome.inputs.get("ports").and_then(PropertyValue::as_array).unwrap();
    assert_eq!(ports.len(), 2);
}

#[test]
fn block_elements_are_not_validated() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("name", ForeignValue::string("main")),
        (
            "param",
            ForeignValue::List(vec![ForeignValue::map([
                ("name", ForeignValue::string("max_connections")),
                ("value", ForeignValue::string("200")),
            ])]),
        ),
    ]);

    let outcome = import_inputs(&schema, &state, &read_ctx()).unwrap();

    assert!(outcome.diagnostics.is_empty());
    assert_eq!(
        outcome.inputs.get("param"),
        Some(&PropertyValue::Array(vec![PropertyValue::object([
            ("name", PropertyValue::string("max_connections")),
            ("value", PropertyValue::string("200")),
        ])]))
    );
}

// ── Input generation ─────────────────────────────────────────────

#[test]
fn defaults_and_zero_values_are_pruned() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("name", ForeignValue::string("main")),
        ("engine", ForeignValue::string("postgres")),
        ("port", ForeignValue::Int(5432)),
        ("storage_gb", ForeignValue::Int(20)),
        ("replicas", ForeignValue::Int(0)),
        ("ports", ForeignValue::Set(vec![])),
        ("arn", ForeignValue::string("arn:db:1")),
    ]);

    let outcome = import_inputs(&schema, &state, &read_ctx()).unwrap();

    assert_eq!(
        outcome.inputs,
        props([
            ("name", PropertyValue::string("main")),
            ("storageGb", PropertyValue::Number(20.0)),
        ])
    );
}

#[test]
fn non_default_values_are_kept() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("name", ForeignValue::string("main")),
        ("engine", ForeignValue::string("mysql")),
        ("port", ForeignValue::Int(3306)),
    ]);

    let outcome = import_inputs(&schema, &state, &read_ctx()).unwrap();

    assert_eq!(
        outcome.inputs,
        props([
            ("engine", PropertyValue::string("mysql")),
            ("name", PropertyValue::string("main")),
            ("port", PropertyValue::Number(3306.0)),
        ])
    );
}

#[test]
fn non_object_state_is_rejected() {
    let schema = make_schema();
    let err = import_inputs(&schema, &ForeignValue::List(vec![]), &read_ctx()).unwrap_err();
    assert!(matches!(err, ImportError::InvalidState("list")));
    assert_eq!(err.to_string(), "imported state must be an object, found list");
}
