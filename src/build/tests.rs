//! Tests for the step builder

use super::*;
use crate::node::{Key, Node};
use crate::step::StepDetail;
use crate::typesys::testing::*;
use crate::value::{DeferredValue, Value};

// ============================================================================
// Helper Functions
// ============================================================================

/// An ordered map node from (key, value) pairs
fn m(entries: Vec<(&str, Node)>) -> Node {
    Node::map(
        entries
            .into_iter()
            .map(|(k, v)| (Key::new(k), v))
            .collect(),
    )
}

/// A type system with one registered gateway object type
fn gateway_types() -> TestTypes {
    TestTypes::new().with_object(object(
        "Aws::Gateway",
        vec![
            ("region", scalar("String")),
            ("vpcId", scalar("String")),
            ("tags", optional(hash(scalar("String"), scalar("String")))),
            ("gatewayId", scalar("String")),
        ],
    ))
}

/// A minimal resource node declaring its type structurally
fn gateway_resource(state: Vec<(&str, Node)>) -> Node {
    m(vec![("Aws::Gateway", m(state))])
}

fn build(types: &TestTypes, name: &str, node: &Node) -> Result<Step, BuildError> {
    let ctx = Context::new(types, "workflows/attach.yaml");
    build_step(&ctx, name, node)
}

fn param<'a>(step: &'a Step, name: &str) -> &'a Parameter {
    step.parameters
        .iter()
        .find(|p| p.name == name)
        .unwrap_or_else(|| panic!("no parameter '{name}'"))
}

// ============================================================================
// Resource Steps
// ============================================================================

#[test]
fn test_resource_state_references_become_deferred() {
    let types = gateway_types();
    let node = gateway_resource(vec![
        ("region", Node::str("$region")),
        ("vpcId", Node::str("vpc-1234")),
    ]);
    let step = build(&types, "gw", &node).unwrap();

    assert_eq!(step.kind(), StepKind::Resource);
    let StepDetail::Resource { state, .. } = &step.detail else {
        panic!("not a resource");
    };
    assert_eq!(state.state_type.name(), "Aws::Gateway");
    assert_eq!(
        state.attributes["region"],
        Value::Deferred(DeferredValue::reference("region"))
    );
    assert_eq!(state.attributes["vpcId"], Value::from("vpc-1234"));
}

#[test]
fn test_resource_infers_typed_parameters_from_state() {
    let types = gateway_types();
    let node = gateway_resource(vec![("region", Node::str("$region"))]);
    let step = build(&types, "gw", &node).unwrap();

    assert_eq!(step.parameters.len(), 1);
    assert_eq!(param(&step, "region").ptype.name(), "String");
}

#[test]
fn test_resource_repeated_reference_inferred_once() {
    let types = gateway_types();
    let node = gateway_resource(vec![
        ("region", Node::str("$r")),
        ("vpcId", Node::str("$r")),
    ]);
    let step = build(&types, "gw", &node).unwrap();
    assert_eq!(step.parameters.len(), 1);
    assert_eq!(param(&step, "r").ptype.name(), "String");
}

#[test]
fn test_resource_unknown_attribute_fails() {
    let types = gateway_types();
    let node = gateway_resource(vec![("flavor", Node::str("large"))]);
    let err = build(&types, "gw", &node).unwrap_err();
    match err.root_cause() {
        BuildError::AttributeNotFound {
            type_name,
            attribute,
        } => {
            assert_eq!(type_name, "Aws::Gateway");
            assert_eq!(attribute, "flavor");
        }
        other => panic!("unexpected cause: {other}"),
    }
}

#[test]
fn test_resource_explicit_type_property() {
    let types = gateway_types();
    let node = m(vec![
        ("type", Node::str("Aws::Gateway")),
        ("state", m(vec![("region", Node::str("eu-west-1"))])),
    ]);
    let step = build(&types, "gw", &node).unwrap();
    let StepDetail::Resource { state, .. } = &step.detail else {
        panic!("not a resource");
    };
    assert_eq!(state.state_type.name(), "Aws::Gateway");
}

#[test]
fn test_resource_invalid_explicit_type_name_fails() {
    let types = gateway_types();
    let node = m(vec![
        ("type", Node::str("aws::gateway")),
        ("state", m(vec![])),
    ]);
    let err = build(&types, "gw", &node).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        BuildError::InvalidTypeName { .. }
    ));
}

#[test]
fn test_resource_unresolved_type_fails() {
    let types = gateway_types();
    let node = m(vec![("Aws::Missing", m(vec![]))]);
    let err = build(&types, "gw", &node).unwrap_err();
    match err.root_cause() {
        BuildError::UnresolvedType { type_name } => assert_eq!(type_name, "Aws::Missing"),
        other => panic!("unexpected cause: {other}"),
    }
}

#[test]
fn test_resource_external_id() {
    let types = gateway_types();
    let node = m(vec![
        ("Aws::Gateway", m(vec![])),
        ("external_id", Node::str("igw-1")),
    ]);
    let step = build(&types, "gw", &node).unwrap();
    let StepDetail::Resource { external_id, .. } = &step.detail else {
        panic!("not a resource");
    };
    assert_eq!(external_id.as_deref(), Some("igw-1"));
}

#[test]
fn test_resource_returns_names_take_attribute_types() {
    let types = gateway_types();
    let node = m(vec![
        ("Aws::Gateway", m(vec![])),
        ("returns", Node::str("gatewayId")),
    ]);
    let step = build(&types, "gw", &node).unwrap();
    assert_eq!(step.returns.len(), 1);
    assert_eq!(step.returns[0].name, "gatewayId");
    assert_eq!(step.returns[0].ptype.name(), "String");
    assert!(step.returns[0].alias.is_none());
}

#[test]
fn test_resource_returns_alias_maps_to_attribute() {
    let types = gateway_types();
    let node = m(vec![
        ("Aws::Gateway", m(vec![])),
        ("returns", m(vec![("gwId", Node::str("gatewayId"))])),
    ]);
    let step = build(&types, "gw", &node).unwrap();
    let r = &step.returns[0];
    assert_eq!(r.name, "gwId");
    assert_eq!(r.alias.as_deref(), Some("gatewayId"));
    assert_eq!(r.ptype.name(), "String");
}

#[test]
fn test_resource_returns_list_unknown_attribute_fails() {
    let types =
        TestTypes::new().with_object(object("Aws::Vpc", vec![("cidr", scalar("String"))]));
    let node = m(vec![
        ("Aws::Vpc", m(vec![])),
        ("returns", Node::list(vec![Node::str("vpcId")])),
    ]);
    let err = build(&types, "vpc", &node).unwrap_err();
    match err.root_cause() {
        BuildError::AttributeNotFound {
            type_name,
            attribute,
        } => {
            assert_eq!(type_name, "Aws::Vpc");
            assert_eq!(attribute, "vpcId");
        }
        other => panic!("unexpected cause: {other}"),
    }
}

#[test]
fn test_resource_state_with_nested_tag_reference() {
    let types = gateway_types();
    let node = gateway_resource(vec![
        ("region", Node::str("$region")),
        ("tags", m(vec![("a", Node::str("$anno"))])),
    ]);
    let step = build(&types, "gw", &node).unwrap();

    assert_eq!(param(&step, "region").ptype.name(), "String");
    assert_eq!(param(&step, "anno").ptype.name(), "String");
    let StepDetail::Resource { state, .. } = &step.detail else {
        panic!("not a resource");
    };
    let Value::Map(tags) = &state.attributes["tags"] else {
        panic!("tags is not a map");
    };
    assert_eq!(tags["a"], Value::Deferred(DeferredValue::reference("anno")));
}

#[test]
fn test_resource_returns_unknown_alias_fails() {
    let types = gateway_types();
    let node = m(vec![
        ("Aws::Gateway", m(vec![])),
        ("returns", m(vec![("gwId", Node::str("bogus"))])),
    ]);
    let err = build(&types, "gw", &node).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        BuildError::AttributeNotFound { .. }
    ));
}

// ============================================================================
// Parameter Declarations
// ============================================================================

#[test]
fn test_parameters_list_of_names() {
    let types = gateway_types();
    let node = m(vec![
        ("Aws::Gateway", m(vec![])),
        (
            "parameters",
            Node::list(vec![Node::str("region"), Node::str("vpcId")]),
        ),
    ]);
    let step = build(&types, "gw", &node).unwrap();
    assert_eq!(step.parameters.len(), 2);
    assert!(param(&step, "region").ptype.is_any());
}

#[test]
fn test_parameters_map_with_type_names() {
    let types = gateway_types();
    let node = m(vec![
        ("Aws::Gateway", m(vec![])),
        ("parameters", m(vec![("region", Node::str("String"))])),
    ]);
    let step = build(&types, "gw", &node).unwrap();
    assert_eq!(param(&step, "region").ptype.name(), "String");
}

#[test]
fn test_parameters_structured_declaration_with_default() {
    let types = gateway_types();
    let node = m(vec![
        ("Aws::Gateway", m(vec![])),
        (
            "parameters",
            m(vec![(
                "region",
                m(vec![
                    ("type", Node::str("String")),
                    ("value", Node::str("eu-west-1")),
                ]),
            )]),
        ),
    ]);
    let step = build(&types, "gw", &node).unwrap();
    let p = param(&step, "region");
    assert_eq!(p.ptype.name(), "String");
    assert_eq!(p.value, Some(Value::from("eu-west-1")));
}

#[test]
fn test_parameters_lookup_declaration() {
    let types = gateway_types();
    let node = m(vec![
        ("Aws::Gateway", m(vec![])),
        (
            "parameters",
            m(vec![(
                "keyName",
                m(vec![
                    ("type", Node::str("String")),
                    ("lookup", Node::str("aws.keyname")),
                ]),
            )]),
        ),
    ]);
    let step = build(&types, "gw", &node).unwrap();
    assert_eq!(
        param(&step, "keyName").value,
        Some(Value::Deferred(DeferredValue::lookup(vec![Value::from(
            "aws.keyname"
        )])))
    );
}

#[test]
fn test_parameters_duplicate_names_fail() {
    let types = gateway_types();
    let decl = Node::map(vec![
        (Key::new("region"), Node::str("String")),
        (Key::new("region"), Node::str("String")),
    ]);
    let node = m(vec![("Aws::Gateway", m(vec![])), ("parameters", decl)]);
    let err = build(&types, "gw", &node).unwrap_err();
    match err.root_cause() {
        BuildError::BadParameter { name, field } => {
            assert_eq!(name, "region");
            assert_eq!(field, "parameters");
        }
        other => panic!("unexpected cause: {other}"),
    }
}

#[test]
fn test_parameters_alias_outside_aliased_context_fails() {
    let types = gateway_types();
    let node = m(vec![
        ("Aws::Gateway", m(vec![])),
        ("parameters", m(vec![("gwId", Node::str("gatewayId"))])),
    ]);
    let err = build(&types, "gw", &node).unwrap_err();
    assert!(matches!(err.root_cause(), BuildError::BadParameter { .. }));
}

#[test]
fn test_parameters_bad_shape_fails() {
    let types = gateway_types();
    let node = m(vec![("Aws::Gateway", m(vec![])), ("parameters", Node::int(3))]);
    let err = build(&types, "gw", &node).unwrap_err();
    assert!(matches!(err.root_cause(), BuildError::ShapeMismatch { .. }));
}

// ============================================================================
// Workflow Steps and Nesting
// ============================================================================

#[test]
fn test_workflow_builds_children_in_order() {
    let types = gateway_types();
    let node = m(vec![(
        "steps",
        m(vec![
            ("gw", gateway_resource(vec![])),
            ("notify", m(vec![("call", Node::str("notifier"))])),
        ]),
    )]);
    let step = build(&types, "wf", &node).unwrap();

    assert_eq!(step.kind(), StepKind::Workflow);
    assert_eq!(step.steps().len(), 2);
    assert_eq!(step.steps()[0].name, "gw");
    assert_eq!(step.steps()[0].kind(), StepKind::Resource);
    assert_eq!(step.steps()[1].name, "notify");
    assert_eq!(step.steps()[1].kind(), StepKind::Reference);
}

#[test]
fn test_workflow_keeps_leaf_of_qualified_name() {
    let types = gateway_types();
    let node = m(vec![("steps", m(vec![]))]);
    let step = build(&types, "mymod::attach", &node).unwrap();
    assert_eq!(step.name, "attach");
}

#[test]
fn test_workflow_when_guard() {
    let types = gateway_types();
    let node = m(vec![
        ("when", Node::str("region =~ /^eu-/")),
        ("steps", m(vec![])),
    ]);
    let step = build(&types, "wf", &node).unwrap();
    assert_eq!(step.when.as_deref(), Some("region =~ /^eu-/"));
}

#[test]
fn test_workflow_scalar_child_is_not_a_step() {
    let types = gateway_types();
    let node = m(vec![("steps", m(vec![("gw", Node::str("oops"))]))]);
    let err = build(&types, "wf", &node).unwrap_err();
    assert!(matches!(err.root_cause(), BuildError::NotAStep { .. }));
}

#[test]
fn test_typespace_inherited_from_enclosing_workflow() {
    let types = gateway_types();
    let node = m(vec![
        ("typespace", Node::str("Aws")),
        (
            "steps",
            m(vec![("Gateway", m(vec![("state", m(vec![]))]))]),
        ),
    ]);
    let step = build(&types, "wf", &node).unwrap();
    let StepDetail::Resource { state, .. } = &step.steps()[0].detail else {
        panic!("not a resource");
    };
    assert_eq!(state.state_type.name(), "Aws::Gateway");
}

#[test]
fn test_nested_typespace_shadows_outer() {
    let inner = object("K8s::Gateway", vec![("port", scalar("Integer"))]);
    let types = gateway_types().with_object(inner);
    let node = m(vec![
        ("typespace", Node::str("Aws")),
        (
            "steps",
            m(vec![(
                "k8s",
                m(vec![
                    ("typespace", Node::str("K8s")),
                    (
                        "steps",
                        m(vec![("Gateway", m(vec![("state", m(vec![]))]))]),
                    ),
                ]),
            )]),
        ),
    ]);
    let step = build(&types, "wf", &node).unwrap();
    let StepDetail::Resource { state, .. } = &step.steps()[0].steps()[0].detail else {
        panic!("not a resource");
    };
    assert_eq!(state.state_type.name(), "K8s::Gateway");
}

// ============================================================================
// Error Wrapping
// ============================================================================

#[test]
fn test_errors_carry_qualified_label_and_location() {
    let types = gateway_types();
    let node = m(vec![(
        "steps",
        m(vec![("gw", gateway_resource(vec![("flavor", Node::str("x"))]))]),
    )]);
    let err = build(&types, "wf", &node).unwrap_err();

    let text = err.to_string();
    assert!(text.contains("failed to build workflow step 'wf'"));
    assert!(text.contains("failed to build resource step 'wf/gw'"));
    assert!(text.contains("workflows/attach.yaml:1:1"));
    assert!(text.contains("attribute 'flavor' not found"));

    assert_eq!(err.innermost_step(), Some("wf/gw"));
    assert!(matches!(
        err.root_cause(),
        BuildError::AttributeNotFound { .. }
    ));
}

#[test]
fn test_unclassifiable_root_is_not_wrapped() {
    let types = gateway_types();
    let err = build(&types, "wf", &Node::str("nope")).unwrap_err();
    assert!(matches!(err, BuildError::NotAStep { .. }));
    assert!(err.innermost_step().is_none());
}

#[test]
fn test_step_error_chains_through_source() {
    use std::error::Error;
    let types = gateway_types();
    let node = m(vec![("Aws::Missing", m(vec![]))]);
    let err = build(&types, "gw", &node).unwrap_err();
    let source = err.source().expect("wrapped error has a source");
    assert!(source.to_string().contains("Aws::Missing"));
}

// ============================================================================
// Iterator Steps
// ============================================================================

#[test]
fn test_iterator_wraps_its_producer() {
    let types = gateway_types();
    let node = m(vec![
        ("times", Node::int(3)),
        ("as", Node::str("i")),
        ("step", gateway_resource(vec![])),
    ]);
    let step = build(&types, "gw", &node).unwrap();

    assert_eq!(step.kind(), StepKind::Iterator);
    let StepDetail::Iterator {
        style,
        over,
        variables,
        producer,
        ..
    } = &step.detail
    else {
        panic!("not an iterator");
    };
    assert_eq!(*style, IterationStyle::Times);
    assert_eq!(*over, Value::Int(3));
    assert_eq!(variables.len(), 1);
    assert_eq!(variables[0].name, "i");
    let producer = producer.as_ref().expect("producer");
    assert_eq!(producer.kind(), StepKind::Resource);
    assert_eq!(producer.name, "gw");
}

#[test]
fn test_iterator_over_reference_is_deferred_and_inferred() {
    let types = gateway_types();
    let node = m(vec![("each", Node::str("$regions")), ("as", Node::str("r"))]);
    let step = build(&types, "gw", &node).unwrap();
    let StepDetail::Iterator { over, .. } = &step.detail else {
        panic!("not an iterator");
    };
    assert_eq!(*over, Value::Deferred(DeferredValue::reference("regions")));
    assert_eq!(param(&step, "regions").name, "regions");
}

#[test]
fn test_iterator_directive_priority_order() {
    let types = gateway_types();
    let node = m(vec![
        ("range", Node::int(9)),
        ("each", Node::list(vec![Node::int(1)])),
    ]);
    let step = build(&types, "gw", &node).unwrap();
    let StepDetail::Iterator { style, over, .. } = &step.detail else {
        panic!("not an iterator");
    };
    assert_eq!(*style, IterationStyle::Each);
    assert_eq!(*over, Value::List(vec![Value::Int(1)]));
}

#[test]
fn test_iterator_into() {
    let types = gateway_types();
    let node = m(vec![
        ("eachPair", Node::str("$tags")),
        ("as", Node::list(vec![Node::str("k"), Node::str("v")])),
        ("into", Node::str("applied")),
    ]);
    let step = build(&types, "gw", &node).unwrap();
    let StepDetail::Iterator {
        style,
        variables,
        into,
        ..
    } = &step.detail
    else {
        panic!("not an iterator");
    };
    assert_eq!(*style, IterationStyle::EachPair);
    assert_eq!(variables.len(), 2);
    assert_eq!(into.as_deref(), Some("applied"));
}

// ============================================================================
// Reference Steps
// ============================================================================

#[test]
fn test_reference_explicit_target() {
    let types = gateway_types();
    let node = m(vec![("call", Node::str("mymod::notifier"))]);
    let step = build(&types, "notify", &node).unwrap();
    let StepDetail::Reference { target } = &step.detail else {
        panic!("not a reference");
    };
    assert_eq!(target, "mymod::notifier");
}

#[test]
fn test_reference_empty_target_defaults_to_own_name() {
    let types = gateway_types();
    let node = m(vec![("reference", Node::str(""))]);
    let step = build(&types, "notify", &node).unwrap();
    let StepDetail::Reference { target } = &step.detail else {
        panic!("not a reference");
    };
    assert_eq!(target, "notify");
}

#[test]
fn test_reference_parameters_allow_aliases() {
    let types = gateway_types();
    let node = m(vec![
        ("call", Node::str("notifier")),
        ("parameters", m(vec![("msg", Node::str("message"))])),
    ]);
    let step = build(&types, "notify", &node).unwrap();
    let p = param(&step, "msg");
    assert_eq!(p.alias.as_deref(), Some("message"));
    assert!(p.ptype.is_any());
}

// ============================================================================
// Handler Steps
// ============================================================================

fn lifecycle_body(name: &str, formals: Vec<crate::ast::FormalParam>) -> Node {
    use crate::crud::InvokeError;
    use indexmap::IndexMap;
    use std::sync::Arc;
    Node::body(FunctionDecl::new(
        name,
        formals,
        Arc::new(|_: &IndexMap<String, Value>| Ok::<_, InvokeError>(Value::Null)),
    ))
}

#[test]
fn test_handler_bare_body() {
    let types = gateway_types();
    let node = lifecycle_body("gw", vec![FormalParam::new("region", Some("String"))]);
    let step = build(&types, "gw", &node).unwrap();

    assert_eq!(step.kind(), StepKind::Handler);
    assert_eq!(param(&step, "region").ptype.name(), "String");
    let StepDetail::Handler { handler } = &step.detail else {
        panic!("not a handler");
    };
    assert_eq!(handler.operations(), vec!["do"]);
}

#[test]
fn test_handler_crud_block() {
    let types = gateway_types();
    let node = m(vec![
        ("create", lifecycle_body("create", vec![])),
        ("read", lifecycle_body("read", vec![])),
        ("delete", lifecycle_body("delete", vec![])),
    ])
    .with_style(crate::ast::StepStyle::Handler);
    let step = build(&types, "gw", &node).unwrap();
    let StepDetail::Handler { handler } = &step.detail else {
        panic!("not a handler");
    };
    assert_eq!(handler.operations(), vec!["create", "read", "delete"]);
}

#[test]
fn test_handler_crud_block_missing_read_fails() {
    let types = gateway_types();
    let node = m(vec![
        ("create", lifecycle_body("create", vec![])),
        ("delete", lifecycle_body("delete", vec![])),
    ])
    .with_style(crate::ast::StepStyle::Handler);
    let err = build(&types, "gw", &node).unwrap_err();
    match err.root_cause() {
        BuildError::MissingRequiredFunction { function } => assert_eq!(*function, "read"),
        other => panic!("unexpected cause: {other}"),
    }
}

#[test]
fn test_handler_declared_returns() {
    use crate::crud::InvokeError;
    use indexmap::IndexMap;
    use std::sync::Arc;
    let types = gateway_types();
    let decl = FunctionDecl::new(
        "gw",
        vec![],
        Arc::new(|_: &IndexMap<String, Value>| Ok::<_, InvokeError>(Value::Null)),
    )
    .with_returns(vec![("gatewayId".to_string(), "String".to_string())]);
    let step = build(&types, "gw", &Node::body(decl)).unwrap();
    assert_eq!(step.returns.len(), 1);
    assert_eq!(step.returns[0].name, "gatewayId");
    assert_eq!(step.returns[0].ptype.name(), "String");
}
