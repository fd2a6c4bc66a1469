use pretty_assertions::assert_eq;
use tether_convert::{ConvertError, OutputContext, StateOrigin, to_destination, value_to_destination};
use tether_schema::{
    AttributeDeclaration, BlockDeclaration, BridgeConfig, Capabilities, FieldOverride,
    ProviderDeclaration, ResourceDeclaration, ResourceSchema, SchemaBuilder,
};
use tether_types::{ForeignValue, PropertyMap, PropertyValue};

const TOKEN: &str = "example_server";

fn make_declaration() -> ProviderDeclaration {
    let disk = BlockDeclaration::new([
        ("size_gb", AttributeDeclaration::int().required()),
        ("labels", AttributeDeclaration::map_of(AttributeDeclaration::string()).optional()),
        ("mounts", AttributeDeclaration::list_of(AttributeDeclaration::string()).optional()),
    ]);
    let network = BlockDeclaration::new([
        ("subnet_id", AttributeDeclaration::string().optional()),
        ("public_ip", AttributeDeclaration::bool().optional()),
    ]);
    let resource = ResourceDeclaration::new([
        ("name", AttributeDeclaration::string().required()),
        ("instance_count", AttributeDeclaration::int().optional()),
        ("cpu_ratio", AttributeDeclaration::float().optional()),
        ("enabled", AttributeDeclaration::bool().optional()),
        ("admin_password", AttributeDeclaration::string().optional().sensitive()),
        ("tags", AttributeDeclaration::map_of(AttributeDeclaration::string()).optional()),
        ("security_groups", AttributeDeclaration::set_of(AttributeDeclaration::string()).optional()),
        ("disk", AttributeDeclaration::block_list(disk).optional()),
        ("network", AttributeDeclaration::block_list(network).optional().max_items(1)),
        ("arn", AttributeDeclaration::string().computed()),
    ]);
    let mut decl = ProviderDeclaration::default();
    decl.resources.insert(TOKEN.to_string(), resource);
    decl
}

fn make_schema_with(config: &BridgeConfig) -> ResourceSchema {
    let provider = SchemaBuilder::new(&make_declaration(), &Capabilities::new(), config)
        .build()
        .unwrap();
    provider.resource(TOKEN).unwrap().clone()
}

fn make_schema() -> ResourceSchema {
    make_schema_with(&BridgeConfig::default())
}

fn read(schema: &ResourceSchema, state: ForeignValue) -> PropertyMap {
    to_destination(schema, &state, &OutputContext::new(StateOrigin::Read)).unwrap()
}

fn empty_object() -> PropertyValue {
    PropertyValue::Object(PropertyMap::new())
}

// ── Shape ────────────────────────────────────────────────────────

#[test]
fn every_field_is_present_and_renamed() {
    let schema = make_schema();
    let out = read(&schema, ForeignValue::map([("name", ForeignValue::string("web"))]));

    let keys: Vec<&str> = out.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "adminPassword",
            "arn",
            "cpuRatio",
            "disk",
            "enabled",
            "instanceCount",
            "name",
            "network",
            "securityGroups",
            "tags",
        ]
    );
    assert_eq!(out["name"], PropertyValue::string("web"));
    assert_eq!(out["instanceCount"], PropertyValue::Null);
}

#[test]
fn scalars_convert_to_numbers_and_bools() {
    let schema = make_schema();
    let out = read(
        &schema,
        ForeignValue::map([
            ("instance_count", ForeignValue::Int(3)),
            ("cpu_ratio", ForeignValue::Float(0.5)),
            ("enabled", ForeignValue::Bool(true)),
        ]),
    );
    assert_eq!(out["instanceCount"], PropertyValue::Number(3.0));
    assert_eq!(out["cpuRatio"], PropertyValue::Number(0.5));
    assert_eq!(out["enabled"], PropertyValue::Bool(true));
}

#[test]
fn null_state_yields_all_null_fields() {
    let schema = make_schema();
    let out = read(&schema, ForeignValue::Null);
    assert!(out.values().all(PropertyValue::is_null));
}

#[test]
fn non_object_state_is_rejected() {
    let schema = make_schema();
    let err = to_destination(&schema, &ForeignValue::Int(1), &OutputContext::new(StateOrigin::Read)).unwrap_err();
    assert!(matches!(err, ConvertError::TypeMismatch { expected: "object", found: "int", .. }));
}

#[test]
fn nested_blocks_rename_fields_but_not_map_keys() {
    let schema = make_schema();
    let out = read(
        &schema,
        ForeignValue::map([(
            "disk",
            ForeignValue::List(vec![ForeignValue::map([
                ("size_gb", ForeignValue::Int(20)),
                ("labels", ForeignValue::map([("cost_center", ForeignValue::string("ops"))])),
            ])]),
        )]),
    );
    let expected = PropertyValue::Array(vec![PropertyValue::object([
        ("sizeGb", PropertyValue::Number(20.0)),
        ("labels", PropertyValue::object([("cost_center", PropertyValue::string("ops"))])),
        ("mounts", PropertyValue::Array(vec![])),
    ])]);
    assert_eq!(out["disk"], expected);
}

// ── Null versus empty ────────────────────────────────────────────

#[test]
fn top_level_empty_map_without_input_is_null() {
    let schema = make_schema();
    let out = read(&schema, ForeignValue::map([("tags", ForeignValue::map::<&str>([]))]));
    assert_eq!(out["tags"], PropertyValue::Null);
}

#[test]
fn nested_absent_map_is_empty() {
    let schema = make_schema();
    let out = read(
        &schema,
        ForeignValue::map([(
            "disk",
            ForeignValue::List(vec![ForeignValue::map([("size_gb", ForeignValue::Int(10))])]),
        )]),
    );
    let disk = out["disk"].as_array().unwrap();
    assert_eq!(disk[0].as_object().unwrap()["labels"], empty_object());
}

#[test]
fn nested_empty_map_is_empty() {
    let schema = make_schema();
    let out = read(
        &schema,
        ForeignValue::map([(
            "disk",
            ForeignValue::List(vec![ForeignValue::map([
                ("size_gb", ForeignValue::Int(10)),
                ("labels", ForeignValue::map::<&str>([])),
            ])]),
        )]),
    );
    let disk = out["disk"].as_array().unwrap();
    assert_eq!(disk[0].as_object().unwrap()["labels"], empty_object());
}

#[test]
fn create_response_preserves_empty_collections() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("tags", ForeignValue::map::<&str>([])),
        ("security_groups", ForeignValue::Set(vec![])),
    ]);
    let out = to_destination(&schema, &state, &OutputContext::new(StateOrigin::CreateResponse)).unwrap();
    assert_eq!(out["tags"], empty_object());
    assert_eq!(out["securityGroups"], PropertyValue::Array(vec![]));
    assert_eq!(out["disk"], PropertyValue::Null);
}

#[test]
fn explicit_empty_input_keeps_empty_collection() {
    let schema = make_schema();
    let inputs = PropertyMap::from([("tags".to_string(), empty_object())]);
    let ctx = OutputContext::new(StateOrigin::Read).with_inputs(&inputs);
    let out = to_destination(&schema, &ForeignValue::map([("name", ForeignValue::string("web"))]), &ctx).unwrap();
    assert_eq!(out["tags"], empty_object());
    assert_eq!(out["securityGroups"], PropertyValue::Null);
}

// ── Sets ─────────────────────────────────────────────────────────

#[test]
fn set_order_is_independent_of_foreign_order() {
    let schema = make_schema();
    let groups = |items: &[&str]| {
        ForeignValue::map([(
            "security_groups",
            ForeignValue::Set(items.iter().map(|s| ForeignValue::string(*s)).collect()),
        )])
    };
    let first = read(&schema, groups(&["sg-b", "sg-a", "sg-c"]));
    let second = read(&schema, groups(&["sg-c", "sg-b", "sg-a"]));
    assert_eq!(first["securityGroups"], second["securityGroups"]);

    let mut members: Vec<&str> = first["securityGroups"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(PropertyValue::as_str)
        .collect();
    members.sort_unstable();
    assert_eq!(members, vec!["sg-a", "sg-b", "sg-c"]);
}

// ── Singleton collapse ───────────────────────────────────────────

#[test]
fn singleton_list_unwraps_to_element() {
    let schema = make_schema();
    let out = read(
        &schema,
        ForeignValue::map([(
            "network",
            ForeignValue::List(vec![ForeignValue::map([("subnet_id", ForeignValue::string("subnet-1"))])]),
        )]),
    );
    assert_eq!(
        out["network"],
        PropertyValue::object([
            ("publicIp", PropertyValue::Null),
            ("subnetId", PropertyValue::string("subnet-1")),
        ])
    );
}

#[test]
fn empty_singleton_list_is_null() {
    let schema = make_schema();
    let out = read(&schema, ForeignValue::map([("network", ForeignValue::List(vec![]))]));
    assert_eq!(out["network"], PropertyValue::Null);
}

#[test]
fn singleton_list_with_two_elements_is_an_error() {
    let schema = make_schema();
    let state = ForeignValue::map([(
        "network",
        ForeignValue::List(vec![ForeignValue::map::<&str>([]), ForeignValue::map::<&str>([])]),
    )]);
    let err = to_destination(&schema, &state, &OutputContext::new(StateOrigin::Read)).unwrap_err();
    match err {
        ConvertError::TooManyElements { path, count } => {
            assert_eq!(path.to_string(), "network");
            assert_eq!(count, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn collapse_override_expands_singleton() {
    let mut config = BridgeConfig::default();
    config.override_field(
        TOKEN,
        "network",
        FieldOverride {
            collapse_singleton: Some(false),
            ..FieldOverride::default()
        },
    );
    let schema = make_schema_with(&config);
    let out = read(
        &schema,
        ForeignValue::map([("network", ForeignValue::List(vec![ForeignValue::map::<&str>([])]))]),
    );
    assert!(out["network"].is_array());
}

// ── Secrets and unknowns ─────────────────────────────────────────

#[test]
fn sensitive_values_are_wrapped() {
    let schema = make_schema();
    let out = read(&schema, ForeignValue::map([("admin_password", ForeignValue::string("hunter2"))]));
    assert_eq!(out["adminPassword"], PropertyValue::secret(PropertyValue::string("hunter2")));
}

#[test]
fn null_sensitive_values_are_not_wrapped() {
    let schema = make_schema();
    let out = read(&schema, ForeignValue::map::<&str>([]));
    assert_eq!(out["adminPassword"], PropertyValue::Null);
}

#[test]
fn secrets_can_be_disabled() {
    let schema = make_schema();
    let ctx = OutputContext::new(StateOrigin::Read).with_secrets(false);
    let out = to_destination(&schema, &ForeignValue::map([("admin_password", ForeignValue::string("x"))]), &ctx).unwrap();
    assert_eq!(out["adminPassword"], PropertyValue::string("x"));
}

#[test]
fn secret_override_marks_field() {
    let mut config = BridgeConfig::default();
    config.override_field(
        TOKEN,
        "name",
        FieldOverride {
            secret: Some(true),
            ..FieldOverride::default()
        },
    );
    let schema = make_schema_with(&config);
    let out = read(&schema, ForeignValue::map([("name", ForeignValue::string("web"))]));
    assert!(out["name"].is_secret());
}

#[test]
fn unknown_becomes_computed() {
    let schema = make_schema();
    let out = read(&schema, ForeignValue::map([("arn", ForeignValue::Unknown)]));
    assert_eq!(out["arn"], PropertyValue::Computed);
}

// ── Coercion and mismatches ──────────────────────────────────────

#[test]
fn strings_are_coerced_to_declared_scalars() {
    let schema = make_schema();
    let out = read(
        &schema,
        ForeignValue::map([
            ("enabled", ForeignValue::string("true")),
            ("instance_count", ForeignValue::string("3")),
            ("cpu_ratio", ForeignValue::string("")),
        ]),
    );
    assert_eq!(out["enabled"], PropertyValue::Bool(true));
    assert_eq!(out["instanceCount"], PropertyValue::Number(3.0));
    assert_eq!(out["cpuRatio"], PropertyValue::Null);
}

#[test]
fn unparsable_string_is_a_type_mismatch() {
    let schema = make_schema();
    let state = ForeignValue::map([("instance_count", ForeignValue::string("many"))]);
    let err = to_destination(&schema, &state, &OutputContext::new(StateOrigin::Read)).unwrap_err();
    match err {
        ConvertError::TypeMismatch { path, expected, found } => {
            assert_eq!(path.to_string(), "instanceCount");
            assert_eq!(expected, "int");
            assert_eq!(found, "string");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn mismatch_reports_nested_path() {
    let schema = make_schema();
    let state = ForeignValue::map([(
        "disk",
        ForeignValue::List(vec![ForeignValue::map([("size_gb", ForeignValue::Bool(true))])]),
    )]);
    let err = to_destination(&schema, &state, &OutputContext::new(StateOrigin::Read)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "type mismatch at disk[0].sizeGb: expected int, found bool"
    );
}

#[test]
fn single_values_convert_as_nested() {
    let schema = make_schema();
    let tags = schema.field("tags").unwrap().node;
    let value = value_to_destination(
        &schema,
        tags,
        &ForeignValue::map::<&str>([]),
        &OutputContext::new(StateOrigin::Read),
    )
    .unwrap();
    assert_eq!(value, empty_object());
}
