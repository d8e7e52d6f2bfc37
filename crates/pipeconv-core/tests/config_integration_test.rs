//! Integration tests for project loading
//!
//! Tests use temporary directories with real file fixtures to verify:
//! - Project config loading from a directory or file path
//! - Pipeline document discovery and ordering
//! - Error reporting for malformed inputs

use pipeconv_core::config::CONFIG_FILE;
use pipeconv_core::{Config, Error, ModuleStyle, NodeKindDocument};
use rstest::rstest;
use tempfile::TempDir;

/// Helper to create a temporary project directory with standard structure.
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("pipelines")).unwrap();
    dir
}

#[test]
fn test_load_project_and_documents() {
    let dir = setup_project();

    std::fs::write(
        dir.path().join(CONFIG_FILE),
        r#"
name: storefront
codegen:
  module_style: esm
"#,
    )
    .unwrap();

    std::fs::write(
        dir.path().join("pipelines/Order.yaml"),
        r#"
name: Order
nodes:
  - { id: s, type: start, name: Show }
  - { id: e, type: end }
transitions:
  - { from: s, to: e }
"#,
    )
    .unwrap();

    std::fs::write(
        dir.path().join("pipelines/Cart.json"),
        r#"{"name": "Cart", "nodes": [{"id": "s", "type": "start", "name": "Show"}]}"#,
    )
    .unwrap();

    // Not a pipeline document
    std::fs::write(dir.path().join("pipelines/README.md"), "notes").unwrap();

    let config = Config::load(dir.path()).unwrap();
    assert_eq!(config.project.name, "storefront");
    assert_eq!(config.project.codegen.module_style, ModuleStyle::Esm);

    let documents = config.load_documents().unwrap();
    assert_eq!(documents.len(), 2);
    // Sorted by path: Cart.json before Order.yaml
    assert_eq!(documents[0].name, "Cart");
    assert_eq!(documents[1].name, "Order");
    assert!(matches!(
        documents[1].nodes[0].kind,
        NodeKindDocument::Start { .. }
    ));
}

#[test]
fn test_load_from_config_file_path() {
    let dir = setup_project();
    let config_path = dir.path().join(CONFIG_FILE);
    std::fs::write(&config_path, "name: by-file\noutput_dir: out\n").unwrap();

    let config = Config::load(&config_path).unwrap();
    assert_eq!(config.project.name, "by-file");
    assert_eq!(config.output_dir(), dir.path().join("out"));
}

#[test]
fn test_missing_input_dir_yields_no_documents() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE), "name: empty\n").unwrap();

    let config = Config::load(dir.path()).unwrap();
    assert!(config.load_documents().unwrap().is_empty());
}

#[test]
fn test_malformed_document_is_an_error() {
    let dir = setup_project();
    std::fs::write(dir.path().join(CONFIG_FILE), "name: broken\n").unwrap();
    std::fs::write(dir.path().join("pipelines/Bad.yaml"), "nodes: [").unwrap();

    let config = Config::load(dir.path()).unwrap();
    assert!(matches!(config.load_documents(), Err(Error::Yaml(_))));
}

#[rstest]
#[case("name: wide\ncodegen:\n  indent_width: 12\n")]
#[case("name: flat\ncodegen:\n  indent_width: 0\n")]
#[case("name: nowhere\noutput_dir: \"  \"\n")]
fn test_invalid_config_is_rejected(#[case] contents: &str) {
    let dir = setup_project();
    std::fs::write(dir.path().join(CONFIG_FILE), contents).unwrap();

    assert!(matches!(
        Config::load(dir.path()),
        Err(Error::ConfigInvalid { .. })
    ));
}
