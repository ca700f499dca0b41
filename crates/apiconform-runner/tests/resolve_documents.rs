//! Resolving API documents from disk.

mod common;

use apiconform_runner::{Dialect, ResolveError, find_schema, resolve};
use common::{SWAGGER_YAML, openapi_developers, write_file};
use serde_json::json;

#[test]
fn swagger_yaml_resolves_definitions_and_operations() {
    let dir = tempfile::tempdir().unwrap();
    let doc = resolve(&write_file(dir.path(), "openapi.yaml", SWAGGER_YAML)).unwrap();

    assert_eq!(doc.dialect, Dialect::Swagger);
    let names: Vec<&str> = doc.schemas.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        ["DeveloperResource", "Error", "GameResource", "ReviewResource", "SelfLink"]
    );
    assert_eq!(doc.operations.len(), 6);

    let game = find_schema(&doc, "GameResource").unwrap();
    let attributes = &game.schema["properties"]["attributes"]["properties"];
    assert_eq!(attributes["releaseDate"]["anyOf"][1], json!({"type": "null"}));
    assert!(attributes["score"].get("anyOf").is_none());
    // $ref to SelfLink is inlined
    assert_eq!(
        game.schema["properties"]["links"]["properties"]["self"]["type"],
        "string"
    );

    let by_id = doc.operation("GET", "/developers/42").unwrap();
    assert_eq!(by_id.path, "/developers/{developerId}");
    assert!(by_id.declares_status(404));
    assert!(by_id.declares_status(400));

    let reviews = doc.operation("GET", "/reviews").unwrap();
    assert_eq!(reviews.path, "/reviews");
    assert!(!reviews.declares_status(404));
}

#[test]
fn resolving_twice_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "openapi.yaml", SWAGGER_YAML);
    let first = resolve(&path).unwrap();
    let second = resolve(&path).unwrap();
    assert_eq!(first.schemas, second.schemas);
}

#[test]
fn nullable_conventions_normalize_identically() {
    let dir = tempfile::tempdir().unwrap();
    let v30 = resolve(&write_file(
        dir.path(),
        "v30.json",
        &openapi_developers("3.0.3").to_string(),
    ))
    .unwrap();
    let v31 = resolve(&write_file(
        dir.path(),
        "v31.json",
        &openapi_developers("3.1.0").to_string(),
    ))
    .unwrap();

    assert_eq!(v30.dialect, Dialect::OpenApiV3 { minor: 0 });
    assert_eq!(v31.dialect, Dialect::OpenApiV3 { minor: 1 });
    let a = &v30.schemas["DeveloperResource"];
    let b = &v31.schemas["DeveloperResource"];
    assert_eq!(
        a.schema["properties"]["attributes"]["properties"]["website"],
        b.schema["properties"]["attributes"]["properties"]["website"]
    );
}

#[test]
fn external_refs_resolve_relative_to_the_document() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("schemas")).unwrap();
    write_file(
        &dir.path().join("schemas"),
        "common.yaml",
        "Link:\n  type: object\n  properties:\n    self:\n      type: string\n",
    );
    let document = json!({
        "openapi": "3.0.1",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "components": {"schemas": {
            "Thing": {
                "type": "object",
                "properties": {"links": {"$ref": "schemas/common.yaml#/Link"}}
            }
        }}
    });
    let doc = resolve(&write_file(dir.path(), "api.json", &document.to_string())).unwrap();
    assert_eq!(
        doc.schemas["Thing"].schema["properties"]["links"]["properties"]["self"]["type"],
        "string"
    );
}

#[test]
fn broken_documents_are_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let missing = resolve(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(missing, ResolveError::Io(_)));

    let garbage = resolve(&write_file(dir.path(), "bad.yaml", "paths: [unclosed")).unwrap_err();
    assert!(matches!(garbage, ResolveError::Parse(_)));

    let unknown = resolve(&write_file(dir.path(), "raml.yaml", "raml: '1.0'\n")).unwrap_err();
    assert!(matches!(unknown, ResolveError::DialectUnknown));

    let dangling = json!({
        "swagger": "2.0",
        "definitions": {"A": {"$ref": "#/definitions/Nope"}}
    });
    let dangling =
        resolve(&write_file(dir.path(), "dangling.json", &dangling.to_string())).unwrap_err();
    assert!(matches!(dangling, ResolveError::RefNotFound(_)));

    let cycle = json!({
        "swagger": "2.0",
        "definitions": {
            "A": {"$ref": "#/definitions/B"},
            "B": {"$ref": "#/definitions/A"}
        }
    });
    let cycle = resolve(&write_file(dir.path(), "cycle.json", &cycle.to_string())).unwrap_err();
    assert!(matches!(cycle, ResolveError::CircularRef(_)));
}
