//! Integration tests for the mapping database: the built-in table, user
//! layers and their effect on a conversion.

use flowbridge::convert::{ConversionOptions, convert_workflow};
use flowbridge::mapping::{
    MappingDatabase, MappingResolver, MappingTables, Resolution, base_tables,
    round_trip_violations,
};
use flowbridge::platform::{Direction, Platform};
use serde_json::json;

#[test]
fn base_table_maps_back_to_where_it_came_from() {
    let tables = base_tables();
    assert!(round_trip_violations(&tables).is_empty());
    for (source, entry) in &tables.n8n_to_make {
        let back = &tables.make_to_n8n[&entry.target_type];
        assert_eq!(&back.target_type, source);
    }
}

#[test]
fn user_tables_load_from_json() {
    let tables = MappingTables::from_json(
        r#"{
            "n8nToMake": {
                "acme.crm": {
                    "targetType": "acme:CreateLead",
                    "targetVersion": 2,
                    "parameterMap": { "email": "contact", "profile.company": "org" },
                    "accuracy": 65
                }
            }
        }"#,
    )
    .expect("Should load");
    let entry = &tables.n8n_to_make["acme.crm"];
    assert_eq!(entry.source_type, "acme.crm");
    assert_eq!(entry.target_version, Some(2));
    assert_eq!(entry.parameter_map["profile.company"], "org");
    assert!(tables.make_to_n8n.is_empty());
}

#[test]
fn user_tables_reject_bad_entries() {
    let err = MappingTables::from_json(r#"{ "n8nToMake": { "a": { "targetType": " " } } }"#)
        .unwrap_err();
    assert!(err.to_string().contains("empty target type"));

    let err =
        MappingTables::from_json(r#"{ "makeToN8n": { "m:X": { "targetType": "b", "accuracy": 150 } } }"#)
            .unwrap_err();
    assert!(err.to_string().contains("150"));

    assert!(MappingTables::from_json("not json").is_err());
}

#[test]
fn user_layer_wins_and_is_marked() {
    let mut db = MappingDatabase::with_base_tables();
    let user = MappingTables::from_json(
        r#"{ "n8nToMake": { "n8n-nodes-base.httpRequest": { "targetType": "http:ActionSendDataBasicAuth" } } }"#,
    )
    .expect("Should load");
    db.set_user_tables(user);

    let resolver = MappingResolver::from_provider(&db);
    let entry = resolver
        .resolve("n8n-nodes-base.httpRequest", Direction::N8nToMake)
        .expect("Should resolve");
    assert_eq!(entry.target_type, "http:ActionSendDataBasicAuth");
    assert!(entry.user_defined);

    // The reverse direction still comes from the base layer.
    let back = resolver
        .resolve("http:ActionSendData", Direction::MakeToN8n)
        .expect("Should resolve");
    assert!(!back.user_defined);
}

#[test]
fn plugins_layer_in_registration_order() {
    let mut db = MappingDatabase::with_base_tables();
    let first = MappingTables::from_json(r#"{ "n8nToMake": { "acme.crm": { "targetType": "acme:V1" } } }"#)
        .expect("Should load");
    let second = MappingTables::from_json(r#"{ "n8nToMake": { "acme.crm": { "targetType": "acme:V2" } } }"#)
        .expect("Should load");
    db.register_plugin("first", first);
    db.register_plugin("second", second);
    assert_eq!(db.plugin_names().collect::<Vec<_>>(), vec!["first", "second"]);

    let resolver = MappingResolver::from_provider(&db);
    match resolver.resolve_with_accuracy("acme.crm", Direction::N8nToMake, 100) {
        Resolution::Found(entry) => assert_eq!(entry.target_type, "acme:V2"),
        other => panic!("expected a mapping, got {:?}", other),
    }
}

#[test]
fn custom_resolver_drives_conversion() {
    let mut db = MappingDatabase::with_base_tables();
    db.register_plugin(
        "acme",
        MappingTables::from_json(
            r#"{ "n8nToMake": { "acme.crm": {
                "targetType": "acme:CreateLead",
                "parameterMap": { "email": "contact" }
            } } }"#,
        )
        .expect("Should load"),
    );
    let resolver = MappingResolver::from_provider(&db);
    let workflow = json!({
        "name": "crm",
        "nodes": [{
            "id": "a",
            "name": "Lead",
            "type": "acme.crm",
            "position": [0, 0],
            "parameters": { "email": "ada@example.com", "tag": "vip" }
        }],
        "connections": {}
    });

    let result = convert_workflow(
        &workflow,
        Platform::N8n,
        Platform::Make,
        &ConversionOptions::default(),
        &resolver,
    );
    let module = &result.converted_workflow["flow"][0];
    assert_eq!(module["module"], "acme:CreateLead");
    assert_eq!(module["version"], 1);
    assert_eq!(module["mapper"], json!({ "contact": "ada@example.com", "tag": "vip" }));
    assert!(result.unmapped_nodes.is_empty());
}
