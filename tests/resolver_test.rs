//! Dotted-path resolution and lazy namespace loading

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use taller::catalog::Catalog;
use taller::resolver::TypeResolver;
use taller::Error;

#[derive(Debug, Default, PartialEq)]
struct CsvLoader {
    delimiter: char,
}

#[derive(Debug, Default)]
struct ParquetLoader;

fn resolver_with_counter() -> (TypeResolver, Arc<AtomicUsize>) {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let mut resolver = TypeResolver::new();
    resolver.namespace("app.Pipelines", move |ns| {
        counter.fetch_add(1, Ordering::SeqCst);
        ns.export_default::<CsvLoader>("CsvLoader")
            .export_default::<ParquetLoader>("ParquetLoader");
    });
    (resolver, loads)
}

#[test]
fn test_resolve_constructs_fresh_instances() {
    let (resolver, _) = resolver_with_counter();
    let a = resolver.resolve("app.Pipelines.CsvLoader").unwrap();
    let b = resolver.resolve("app.Pipelines.CsvLoader").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(*a.downcast::<CsvLoader>().unwrap(), CsvLoader::default());
}

#[test]
fn test_namespace_loads_once_on_first_use() {
    let (resolver, loads) = resolver_with_counter();
    assert!(!resolver.is_loaded("app.Pipelines"));
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    resolver.resolve("app.Pipelines.CsvLoader").unwrap();
    resolver.resolve("app.Pipelines.ParquetLoader").unwrap();
    let _ = resolver.resolve("app.Pipelines.Missing");

    assert!(resolver.is_loaded("app.Pipelines"));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_missing_namespace() {
    let (resolver, _) = resolver_with_counter();
    let err = resolver.resolve("app.Nowhere.CsvLoader").unwrap_err();
    assert!(matches!(&err, Error::Resolution { path, .. } if path == "app.Nowhere.CsvLoader"));
    assert!(err.to_string().contains("no module named 'app.Nowhere'"));
}

#[test]
fn test_missing_type() {
    let (resolver, _) = resolver_with_counter();
    let err = resolver.resolve("app.Pipelines.JsonLoader").unwrap_err();
    assert!(err
        .to_string()
        .contains("module 'app.Pipelines' has no attribute 'JsonLoader'"));
}

#[test]
fn test_path_without_namespace_is_rejected() {
    let (resolver, _) = resolver_with_counter();
    for path in ["CsvLoader", ".CsvLoader", "app.Pipelines.", ""] {
        let err = resolver.resolve(path).unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }), "path {path:?}");
    }
}

#[test]
fn test_type_names_are_case_sensitive() {
    let (resolver, _) = resolver_with_counter();
    assert!(resolver.resolve("app.Pipelines.csvloader").is_err());
}

#[test]
fn test_constructor_failure_is_resolution_error() {
    let mut resolver = TypeResolver::new();
    resolver.namespace("app.Pipelines", |ns| {
        ns.export_with("Remote", || -> anyhow::Result<CsvLoader> {
            anyhow::bail!("connection refused")
        });
    });
    let err = resolver.resolve("app.Pipelines.Remote").unwrap_err();
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn test_catalog_reregister_replaces_hook() {
    let mut catalog: Catalog<u32> = Catalog::new();
    catalog.register("ns", |ns| {
        ns.export("a", 1);
    });
    catalog.register("ns", |ns| {
        ns.export("a", 2);
    });
    assert_eq!(catalog.lookup("ns", "a"), Ok(&2));
    assert_eq!(catalog.exports("ns").unwrap().names(), ["a"]);
}
