//! Test: path templates resolved through the declaration

use sitepipe::core::config::SiteConfig;
use sitepipe::core::paths::{resolve, PathConfig, TemplateError};

#[test]
fn test_nested_tokens_resolve_transitively() {
    let paths: PathConfig = [
        ("root", "../../"),
        ("baseDir", "template"),
        ("src", "assets"),
        ("baseAssets", "<%= path.root %><%= path.baseDir %>/<%= path.src %>"),
    ]
    .into_iter()
    .collect();

    assert_eq!(
        resolve("<%= path.baseAssets %>/css/base.css", &paths).unwrap(),
        "../../template/assets/css/base.css"
    );
    // Whitespace inside the delimiters is optional
    assert_eq!(resolve("<%=path.src%>", &paths).unwrap(), "assets");
    assert_eq!(resolve("no tokens here", &paths).unwrap(), "no tokens here");
}

#[test]
fn test_token_cycle_fails_instead_of_looping() {
    let paths: PathConfig = [("a", "<%= path.b %>/x"), ("b", "<%= path.a %>/y")]
        .into_iter()
        .collect();

    match resolve("<%= path.a %>", &paths) {
        Err(TemplateError::CyclicReference { chain }) => {
            assert_eq!(chain, vec!["a", "b", "a"]);
        }
        other => panic!("Expected cyclic reference, got {:?}", other),
    }
}

#[test]
fn test_unknown_reference() {
    let paths = PathConfig::new();
    assert!(matches!(
        resolve("<%= path.ftpHost %>", &paths),
        Err(TemplateError::UnknownReference { ref name, .. }) if name == "ftpHost"
    ));
}

#[test]
fn test_resolution_is_deterministic() {
    let config = SiteConfig::builtin().unwrap();
    let first = config.paths.resolve_all().unwrap();
    let second = config.paths.resolve_all().unwrap();
    assert_eq!(first, second);
    assert_eq!(first["sourceAssets"], "../../source/assets");
}

#[test]
fn test_overrides_flow_into_operations() {
    let mut config = SiteConfig::builtin().unwrap();
    config.apply_path_overrides(&[
        ("ftpHost".to_string(), "ftp.example.com".to_string()),
        ("root".to_string(), "/srv/site/".to_string()),
    ]);

    let registry = config.to_registry(false).unwrap();
    let operations = registry.flatten("ftp-deploy:deploy").unwrap();
    match &operations[0] {
        sitepipe::core::Operation::UploadTree { local, host, .. } => {
            assert_eq!(host, "ftp.example.com");
            assert_eq!(local, "/srv/site/deploy");
        }
        other => panic!("Expected upload-tree, got {:?}", other),
    }
}

#[test]
fn test_declaration_with_path_cycle_is_rejected() {
    let yaml = r#"
paths:
  a: "<%= path.b %>"
  b: "<%= path.a %>"
"#;
    let err = SiteConfig::from_yaml(yaml).unwrap_err();
    assert!(format!("{:#}", err).contains("Cyclic path reference"));
}

#[test]
fn test_declaration_with_misspelled_token_is_rejected() {
    let yaml = r#"
paths:
  root: "../../"
tasks:
  "clean:prepare":
    - op: remove-paths
      force: true
      paths: ["<%= paht.root %>.git"]
"#;
    let err = SiteConfig::from_yaml(yaml).unwrap_err();
    assert!(format!("{:#}", err).contains("paht.root"));
}
