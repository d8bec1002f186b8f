use apidoc_synth::{
    cli::{self, CliArgs},
    endpoint::HttpMethod,
    manifest::Manifest,
    serializer::{serialize_json, serialize_yaml},
    source_types::load_catalog,
};
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

const MANIFEST: &str = include_str!("fixtures/todo_api.yaml");

/// Helper function to create a temporary project with the fixture sources
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

fn todo_project() -> TempDir {
    create_test_project(vec![
        ("src/models/todo.rs", include_str!("fixtures/todo_models.rs")),
        ("src/models/shapes.rs", include_str!("fixtures/shapes.rs")),
        ("api.yaml", MANIFEST),
    ])
}

/// Generates the fixture document and returns it as JSON.
fn generate_document() -> Value {
    let project = todo_project();
    let catalog = load_catalog(&project.path().join("src")).expect("Failed to collect types");
    let manifest = Manifest::from_yaml_str(MANIFEST).expect("Failed to read manifest");
    let service = manifest.into_service(catalog).expect("Failed to prepare service");

    let document = service.generate();
    serde_json::from_str(&serialize_json(&document).unwrap()).unwrap()
}

fn parameter<'a>(operation: &'a Value, name: &str) -> &'a Value {
    operation["parameters"]
        .as_array()
        .and_then(|params| params.iter().find(|p| p["name"] == name))
        .unwrap_or_else(|| panic!("parameter {} not found in {}", name, operation))
}

#[test]
fn test_end_to_end_generation() {
    let doc = generate_document();

    assert_eq!(doc["openapi"], "3.0.1");
    assert_eq!(doc["info"]["title"], "Todo API");
    assert_eq!(doc["info"]["description"], "Lists and tasks");

    let mut paths: Vec<&str> = doc["paths"].as_object().unwrap().keys().map(String::as_str).collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "/lists",
            "/lists/{id}/attachments",
            "/lists/{id}/tasks",
            "/lists/{slug}",
            "/shapes",
            "/shapes/second",
        ]
    );

    let lists = doc["paths"]["/lists"].as_object().unwrap();
    let mut methods: Vec<&str> = lists.keys().map(String::as_str).collect();
    methods.sort();
    assert_eq!(methods, vec!["get", "post", "put"]);
    assert_eq!(lists["get"]["operationId"], "list_todo_lists");
    assert_eq!(lists["get"]["tags"], json!(["lists"]));

    // Every named type appears exactly once; enums stay inline.
    let mut schemas: Vec<&str> = doc["components"]["schemas"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    schemas.sort();
    assert_eq!(
        schemas,
        vec!["BaseType", "SubType1", "SubType2", "TodoList", "TodoTask"]
    );
}

#[test]
fn test_parameter_sources() {
    let doc = generate_document();

    // Services and request-bound types are never documented.
    let list_all = &doc["paths"]["/lists"]["get"];
    assert_eq!(list_all["parameters"].as_array().unwrap().len(), 1);
    let visibility = parameter(list_all, "visibility");
    assert_eq!(visibility["in"], "query");
    assert_eq!(visibility["required"], false);
    assert_eq!(visibility["schema"]["enum"], json!(["private", "shared_with_team"]));
    assert_eq!(visibility["schema"]["nullable"], true);

    let get_list = &doc["paths"]["/lists/{slug}"]["get"];
    assert_eq!(get_list["parameters"].as_array().unwrap().len(), 1);
    let slug = parameter(get_list, "slug");
    assert_eq!(slug["in"], "path");
    assert_eq!(slug["required"], true);
    assert_eq!(slug["schema"], json!({"type": "string"}));

    let search = &doc["paths"]["/lists/{id}/tasks"]["get"];
    let id = parameter(search, "id");
    assert_eq!(id["in"], "path");
    assert_eq!(id["schema"]["type"], "integer");
    assert_eq!(id["schema"]["minimum"], 1.0);

    let ids = parameter(search, "ids");
    assert_eq!(ids["in"], "query");
    assert_eq!(ids["schema"]["type"], "array");
    assert_eq!(ids["schema"]["items"]["format"], "int32");

    let page = parameter(search, "p");
    assert_eq!(page["in"], "query");
    assert_eq!(page["required"], false);
    assert_eq!(page["schema"]["default"], 1);

    // A complex type on a GET endpoint is not a body.
    assert_eq!(search["parameters"].as_array().unwrap().len(), 3);
    assert!(search.get("requestBody").is_none());
}

#[test]
fn test_request_bodies() {
    let doc = generate_document();

    for method in ["post", "put"] {
        let body = &doc["paths"]["/lists"][method]["requestBody"];
        assert_eq!(body["required"], true);
        assert_eq!(
            body["content"]["application/json"]["schema"],
            json!({"$ref": "#/components/schemas/TodoList"})
        );
    }

    let upload = &doc["paths"]["/lists/{id}/attachments"]["post"];
    let form = &upload["requestBody"]["content"]["multipart/form-data"]["schema"];
    assert_eq!(form["type"], "object");
    assert_eq!(
        form["properties"]["file"],
        json!({"type": "string", "format": "binary"})
    );
    assert_eq!(form["properties"]["thumbnails"]["type"], "array");
    assert_eq!(form["properties"]["thumbnails"]["items"]["format"], "binary");
    assert_eq!(form["required"], json!(["file", "thumbnails"]));
    assert_eq!(parameter(upload, "id")["in"], "path");
}

#[test]
fn test_responses() {
    let doc = generate_document();

    let get_list = &doc["paths"]["/lists/{slug}"]["get"]["responses"];
    assert_eq!(get_list["200"]["description"], "OK");
    assert_eq!(
        get_list["200"]["content"]["application/json"]["schema"],
        json!({"allOf": [{"$ref": "#/components/schemas/TodoList"}], "nullable": true})
    );
    assert_eq!(get_list["404"], json!({"description": "Not Found"}));

    let created = &doc["paths"]["/lists"]["post"]["responses"];
    assert!(created.get("200").is_none());
    assert_eq!(created["201"]["description"], "Created");

    let list_all = &doc["paths"]["/lists"]["get"]["responses"]["200"]["content"];
    assert_eq!(
        list_all["application/json"]["schema"],
        json!({"type": "array", "items": {"$ref": "#/components/schemas/TodoList"}})
    );

    let upload = &doc["paths"]["/lists/{id}/attachments"]["post"]["responses"];
    assert_eq!(upload["200"], json!({"description": "OK"}));
}

#[test]
fn test_recursive_types() {
    let doc = generate_document();
    let schemas = &doc["components"]["schemas"];

    let list = &schemas["TodoList"];
    assert_eq!(list["description"], "A named list of tasks.");
    assert_eq!(
        list["properties"]["tasks"]["items"],
        json!({"$ref": "#/components/schemas/TodoTask"})
    );
    assert_eq!(list["required"], json!(["id", "name", "tasks"]));

    let task = &schemas["TodoTask"];
    let properties = task["properties"].as_object().unwrap();
    let mut names: Vec<&str> = properties.keys().map(String::as_str).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["dueDate", "id", "isComplete", "list", "priority", "title"]
    );
    assert_eq!(properties["id"]["readOnly"], true);
    assert_eq!(properties["dueDate"]["format"], "date");
    assert_eq!(properties["priority"]["type"], "integer");
    assert_eq!(properties["priority"]["enum"], json!([1, 2, 3]));
    assert_eq!(properties["list"]["allOf"], json!([{"$ref": "#/components/schemas/TodoList"}]));
    assert_eq!(properties["list"]["nullable"], true);
    assert_eq!(properties["list"]["description"], "The list this task belongs to");
    assert_eq!(task["required"], json!(["id", "title", "isComplete", "priority"]));
}

#[test]
fn test_polymorphic_types() {
    let doc = generate_document();
    let one_of = json!([
        {"$ref": "#/components/schemas/BaseType"},
        {"$ref": "#/components/schemas/SubType1"},
        {"$ref": "#/components/schemas/SubType2"},
    ]);

    let shapes = &doc["paths"]["/shapes"]["get"]["responses"]["200"]["content"]["application/json"];
    assert_eq!(shapes["schema"]["items"]["oneOf"], one_of);

    let schemas = &doc["components"]["schemas"];
    assert_eq!(schemas["BaseType"]["properties"]["name"]["type"], "string");

    let sub1 = &schemas["SubType1"];
    assert_eq!(sub1["allOf"], json!([{"$ref": "#/components/schemas/BaseType"}]));
    assert_eq!(sub1["properties"], json!({"sides": {"type": "integer", "format": "int32"}}));
    assert_eq!(sub1["required"], json!(["sides"]));

    let sub2 = &schemas["SubType2"];
    assert_eq!(sub2["allOf"], json!([{"$ref": "#/components/schemas/BaseType"}]));
    assert_eq!(sub2["properties"]["parent"]["oneOf"], one_of);
    assert_eq!(sub2["properties"]["parent"]["nullable"], true);
    assert!(sub2["properties"].get("name").is_none());

    let second = &doc["paths"]["/shapes/second"]["get"]["responses"]["200"]["content"];
    assert_eq!(
        second["application/json"]["schema"],
        json!({"$ref": "#/components/schemas/SubType2"})
    );
}

#[test]
fn test_security_schemes() {
    let doc = generate_document();
    let schemes = &doc["components"]["securitySchemes"];

    assert_eq!(
        schemes["Bearer"],
        json!({"type": "http", "scheme": "bearer", "bearerFormat": "JWT"})
    );
    assert_eq!(
        schemes["Session"],
        json!({"type": "apiKey", "name": "todo_session", "in": "cookie"})
    );

    let login = &schemes["Login"];
    assert_eq!(login["type"], "oauth2");
    assert_eq!(login["x-tokenName"], "id_token");
    let flow = &login["flows"]["authorizationCode"];
    assert_eq!(flow["authorizationUrl"], "https://auth.example.com/authorize");
    assert_eq!(flow["tokenUrl"], "https://auth.example.com/token");
    assert_eq!(flow["scopes"], json!({"openid": "openid", "profile": "profile"}));
}

#[test]
fn test_generation_is_repeatable() {
    let project = todo_project();
    let catalog = load_catalog(&project.path().join("src")).unwrap();
    let service = Manifest::from_yaml_str(MANIFEST)
        .unwrap()
        .into_service(catalog)
        .unwrap();

    let first = service.generate();
    let second = service.generate();
    assert_eq!(first.to_json_bytes().unwrap(), second.to_json_bytes().unwrap());
    assert_eq!(first.operation_count(), 8);
    assert!(service.current().is_some());
    assert!(first.operation("/broken", HttpMethod::Post).is_none());
    assert!(first.unresolved_references().is_empty());
}

#[test]
fn test_yaml_output_matches_json() {
    let project = todo_project();
    let catalog = load_catalog(&project.path().join("src")).unwrap();
    let document = Manifest::from_yaml_str(MANIFEST)
        .unwrap()
        .into_service(catalog)
        .unwrap()
        .generate();

    let yaml = serialize_yaml(&document).unwrap();
    assert!(yaml.contains("openapi: 3.0.1"));
    assert!(yaml.contains("securitySchemes:"));

    let from_yaml: Value = serde_yaml::from_str(&yaml).unwrap();
    let from_json: Value = serde_json::from_str(&serialize_json(&document).unwrap()).unwrap();
    assert_eq!(from_yaml, from_json);
}

#[test]
fn test_cli_writes_document() {
    let project = todo_project();
    let manifest = project.path().join("api.yaml");
    let source = project.path().join("src");
    let output = project.path().join("docs/openapi.json");

    let args = CliArgs::try_parse_from([
        "apidoc-synth",
        manifest.to_str().unwrap(),
        "-s",
        source.to_str().unwrap(),
        "-f",
        "json",
        "-o",
        output.to_str().unwrap(),
        "--api-version",
        "2.0",
    ])
    .unwrap();
    let args = cli::parse_args_from_parsed(args).unwrap();
    cli::run(args).unwrap();

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["info"]["title"], "Todo API");
    assert_eq!(written["info"]["version"], "2.0");
    assert!(written["components"]["schemas"]["TodoTask"].is_object());
}

#[test]
fn test_cli_rejects_derived_types_without_sources() {
    let project = todo_project();
    let manifest = project.path().join("api.yaml");

    let args = CliArgs::try_parse_from(["apidoc-synth", manifest.to_str().unwrap(), "-f", "json"])
        .unwrap();
    // Without sources the derived-type table has no root to attach to.
    let err = cli::generate(&args).unwrap_err();
    assert!(format!("{:#}", err).contains("BaseType"));
}
