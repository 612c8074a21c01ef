use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sdx_config::{ReflectionConfig, DEFAULT_TYPE_SUFFIX};
use sdx_reflect::{Lookup, LookupMode, Reflector};
use sdx_types::{ClassDef, ClassId, ClassKind, Type, TypeStore};
use tempfile::TempDir;

fn plugins() -> (Arc<TypeStore>, ClassId) {
    let mut store = TypeStore::default();
    let plugin = store.add_class(ClassDef::new("com.example.plugins.Plugin", ClassKind::Interface));
    store.add_class(ClassDef {
        interfaces: vec![Type::raw(plugin)],
        ..ClassDef::new("com.example.plugins.Echo", ClassKind::Class)
    });
    (Arc::new(store), plugin)
}

fn scanned(reflector: &Reflector, plugin: ClassId) -> Vec<String> {
    reflector
        .scan_instantiable_subtypes("com.example", plugin)
        .map(|class| reflector.types().class_name(class).unwrap().to_string())
        .collect()
}

#[test]
fn default_config_scans_the_registered_classes() {
    let (store, plugin) = plugins();
    let config = ReflectionConfig::load_from_str("").unwrap();
    sdx_config::init_tracing(&config.logging);

    let reflector = Reflector::from_config(store, &config);
    assert_eq!(reflector.lookup(), Lookup::default());
    assert_eq!(scanned(&reflector, plugin), vec!["com.example.plugins.Echo"]);
}

#[test]
fn lookup_and_suffix_come_from_the_config() {
    let (store, plugin) = plugins();
    let config = ReflectionConfig::load_from_str(
        r#"
[lookup]
class = "com.example.plugins.Host"
mode = "package"

[scan]
type_suffix = ".kls"
"#,
    )
    .unwrap();

    let reflector = Reflector::from_config(store, &config);
    assert_eq!(
        reflector.lookup(),
        Lookup::in_class("com.example.plugins.Host").with_mode(LookupMode::Package)
    );
    assert_eq!(scanned(&reflector, plugin), vec!["com.example.plugins.Echo"]);
}

#[test]
fn scan_roots_switch_to_the_directory_loader() {
    let (store, plugin) = plugins();
    let tmp = TempDir::new().unwrap();
    let package = tmp.path().join("com/example/plugins");
    fs::create_dir_all(&package).unwrap();
    fs::write(package.join("Echo.kls"), b"").unwrap();
    // Wrong suffix for this configuration.
    fs::write(package.join(format!("Plugin{DEFAULT_TYPE_SUFFIX}")), b"").unwrap();

    let mut config = ReflectionConfig::default();
    config.scan.type_suffix = ".kls".to_string();
    config.scan.roots = vec![tmp.path().to_path_buf()];

    let reflector = Reflector::from_config(Arc::clone(&store), &config);
    assert_eq!(scanned(&reflector, plugin), vec!["com.example.plugins.Echo"]);

    fs::remove_file(package.join("Echo.kls")).unwrap();
    assert!(scanned(&reflector, plugin).is_empty());
}
