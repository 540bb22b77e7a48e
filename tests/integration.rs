//! End-to-end tests for the YAML runner
//!
//! These tests run the fixture corpus under `tests/fixtures/corpus` against
//! an in-memory index service assembled from an [`OperationRegistry`], and
//! check the totals, the failures and the state left behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use conformance::client::{ClientError, ErrorKind, Request, Response};
use conformance::{Error, Flavor, OperationRegistry, RunSummary, TestRunner};
use serde_json::{json, Value};

/// Indices and their documents, keyed by id
type Cluster = Arc<Mutex<BTreeMap<String, BTreeMap<String, Value>>>>;

fn corpus_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("corpus")
}

fn param(req: &Request, name: &str) -> Result<String, ClientError> {
    match req.param(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(ClientError::argument(format!("missing parameter '{}'", name))),
    }
}

fn not_found(what: &str) -> ClientError {
    ClientError::from_status(404, &format!("{{\"error\":\"{} not found\"}}", what))
}

/// A tiny index service: create, delete, exists, index, get and count
fn service(flavor: Flavor) -> (OperationRegistry, Cluster) {
    let cluster: Cluster = Arc::default();

    let create = cluster.clone();
    let delete = cluster.clone();
    let exists = cluster.clone();
    let index = cluster.clone();
    let get = cluster.clone();
    let count = cluster.clone();

    let registry = OperationRegistry::new()
        .with_flavor(flavor)
        .register("indices.create", move |req| {
            let name = param(req, "index")?;
            let mut cluster = create.lock().unwrap();
            if cluster.contains_key(&name) {
                return Err(ClientError::from_status(
                    409,
                    "resource_already_exists_exception",
                ));
            }
            cluster.insert(name.clone(), BTreeMap::new());
            Ok(Response::ok(
                200,
                json!({"acknowledged": true, "index": name}),
            ))
        })
        .register("indices.delete", move |req| {
            let name = param(req, "index")?;
            match delete.lock().unwrap().remove(&name) {
                Some(_) => Ok(Response::ok(200, json!({"acknowledged": true}))),
                None => Err(not_found(&name)),
            }
        })
        .register("indices.exists", move |req| {
            let name = param(req, "index")?;
            Ok(Response::Boolean(exists.lock().unwrap().contains_key(&name)))
        })
        .register("index", move |req| {
            let name = param(req, "index")?;
            let id = param(req, "id")?;
            let body = req.param("body").cloned().unwrap_or(Value::Null);
            let mut cluster = index.lock().unwrap();
            let docs = cluster.entry(name.clone()).or_default();
            let result = if docs.insert(id.clone(), body).is_some() {
                "updated"
            } else {
                "created"
            };
            Ok(Response::ok(
                201,
                json!({"_index": name, "_id": id, "result": result}),
            ))
        })
        .register("get", move |req| {
            let name = param(req, "index")?;
            let id = param(req, "id")?;
            let cluster = get.lock().unwrap();
            let source = cluster
                .get(&name)
                .and_then(|docs| docs.get(&id))
                .ok_or_else(|| not_found(&id))?;
            Ok(Response::ok(
                200,
                json!({"_index": name, "_id": id, "found": true, "_source": source}),
            ))
        })
        .register("count", move |req| {
            let name = param(req, "index")?;
            let cluster = count.lock().unwrap();
            let docs = cluster.get(&name).ok_or_else(|| not_found(&name))?;
            Ok(Response::ok(200, json!({"count": docs.len()})))
        });

    (registry, cluster)
}

async fn run(flavor: Flavor, selection: &[&str]) -> (RunSummary, Arc<OperationRegistry>, Cluster) {
    let (registry, cluster) = service(flavor);
    let client = Arc::new(registry);
    let runner = TestRunner::new(client.clone(), corpus_dir());
    let selection: Vec<String> = selection.iter().map(|s| s.to_string()).collect();
    let summary = runner.run(&selection).await.expect("run should complete");
    (summary, client, cluster)
}

fn failed_tests(summary: &RunSummary) -> Vec<(String, Option<String>)> {
    summary
        .failures
        .iter()
        .map(|f| (f.file.clone(), f.test.clone()))
        .collect()
}

#[tokio::test]
async fn test_full_corpus_against_stack() {
    let (summary, _, cluster) = run(Flavor::Stack, &[]).await;

    assert_eq!(summary.tests, 8);
    assert_eq!(summary.skipped_documents, 1);
    assert_eq!(
        failed_tests(&summary),
        vec![
            ("broken/40_no_requires.yml".to_string(), None),
            (
                "docs/30_scoping.yml".to_string(),
                Some("Variables do not leak between tests".to_string())
            ),
            ("docs/30_scoping.yml".to_string(), Some("Wrong count".to_string())),
        ]
    );
    assert_eq!(summary.passed(), 5);
    assert!(!summary.success());

    // Teardown removed `books` after each case; nothing tore down `scratch`
    let cluster = cluster.lock().unwrap();
    assert!(!cluster.contains_key("books"));
    assert!(cluster.contains_key("scratch"));
}

#[tokio::test]
async fn test_serverless_runs_its_own_documents() {
    let (summary, _, _) = run(Flavor::Serverless, &[]).await;

    assert_eq!(summary.tests, 5);
    assert_eq!(summary.skipped_documents, 1);
    let failed = failed_tests(&summary);
    assert_eq!(failed.len(), 2);
    assert_eq!(
        failed[1],
        (
            "docs/20_serverless_only.yml".to_string(),
            Some("Serverless projects hide missing documents".to_string())
        )
    );
    assert!(matches!(
        summary.failures[1].error.root(),
        Error::Client(e) if e.kind == ErrorKind::NotFound
    ));
}

#[tokio::test]
async fn test_serverless_only_document_is_skipped_on_stack() {
    let (summary, client, _) = run(Flavor::Stack, &["docs/20_serverless_only.yml"]).await;

    assert_eq!(summary.tests, 0);
    assert!(summary.success());
    assert_eq!(summary.skipped_documents, 1);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_setup_and_teardown_wrap_every_case() {
    let (summary, client, _) = run(Flavor::Stack, &["indices"]).await;

    assert!(summary.success(), "unexpected failures: {:?}", summary.failures);
    assert_eq!(summary.tests, 4);
    assert_eq!(
        client.operations(),
        vec![
            "indices.create",
            "indices.create",
            "indices.exists",
            "indices.delete",
            "indices.create",
            "index",
            "get",
            "indices.delete",
        ]
    );

    // `$doc_id` was replaced before the request reached the service
    let get = client
        .calls()
        .into_iter()
        .find(|r| r.operation == "get")
        .unwrap();
    assert_eq!(get.param("id"), Some(&json!("1")));
}

#[tokio::test]
async fn test_variables_are_scoped_to_one_case() {
    let (summary, _, _) = run(Flavor::Stack, &["docs/30_scoping.yml"]).await;

    let leak = summary
        .failures
        .iter()
        .find(|f| f.test.as_deref() == Some("Variables do not leak between tests"))
        .expect("unbound variable should fail");
    assert!(matches!(leak.error.root(), Error::UnboundVariable(name) if name == "created_index"));

    let count = summary
        .failures
        .iter()
        .find(|f| f.test.as_deref() == Some("Wrong count"))
        .unwrap();
    assert!(matches!(count.error.root(), Error::MatchFailed { path, .. } if path == "count"));
}

fn write_document(dir: &Path, name: &str, content: &str) {
    let path = dir.join("suite").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_teardown_runs_after_failing_body() {
    let dir = tempfile::tempdir().unwrap();
    write_document(
        dir.path(),
        "10_teardown.yml",
        r#"
requires: { stack: true }
---
setup:
  - do: { indices.create: { index: temp } }
---
teardown:
  - do: { indices.delete: { index: temp } }
---
"Body fails halfway":
  - do: { count: { index: temp } }
  - match: { count: 1 }
  - do: { count: { index: temp } }
"#,
    );

    let (registry, cluster) = service(Flavor::Stack);
    let client = Arc::new(registry);
    let summary = TestRunner::new(client.clone(), dir.path())
        .run(&[])
        .await
        .unwrap();

    assert_eq!(summary.tests, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(
        client.operations(),
        vec!["indices.create", "count", "indices.delete"]
    );
    assert!(cluster.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_setup_skips_body_but_not_teardown() {
    let dir = tempfile::tempdir().unwrap();
    write_document(
        dir.path(),
        "10_setup.yml",
        r#"
requires: { stack: true }
---
setup:
  - do: { indices.delete: { index: absent } }
---
teardown:
  - do: { indices.exists: { index: absent } }
---
"Never reached":
  - do: { count: { index: absent } }
"#,
    );

    let (registry, _) = service(Flavor::Stack);
    let client = Arc::new(registry);
    let summary = TestRunner::new(client.clone(), dir.path())
        .run(&[])
        .await
        .unwrap();

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].error.action(), Some("setup do indices.delete"));
    assert_eq!(
        client.operations(),
        vec!["indices.delete", "indices.exists"]
    );
}

#[tokio::test]
async fn test_flavor_override_wins_over_client() {
    let (registry, _) = service(Flavor::Stack);
    let runner = TestRunner::new(Arc::new(registry), corpus_dir())
        .with_flavor(Some(Flavor::Serverless));
    let summary = runner
        .run(&["docs/30_scoping.yml".to_string()])
        .await
        .unwrap();
    assert_eq!(summary.skipped_documents, 1);
    assert_eq!(summary.tests, 0);
}

#[tokio::test]
async fn test_malformed_steps_in_skipped_document_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    write_document(
        dir.path(),
        "10_serverless_length.yml",
        r#"
requires: { serverless: true }
---
"Length from a variable":
  - do: { count: { index: temp } }
  - set: { count: expected }
  - length: { hits.hits: $expected }
"#,
    );

    let (registry, _) = service(Flavor::Stack);
    let client = Arc::new(registry);
    let summary = TestRunner::new(client.clone(), dir.path())
        .run(&[])
        .await
        .unwrap();
    assert_eq!(summary.tests, 0);
    assert_eq!(summary.skipped_documents, 1);
    assert!(summary.success());
    assert!(client.calls().is_empty());

    // The same document is malformed where it runs
    let (registry, _) = service(Flavor::Serverless);
    let summary = TestRunner::new(Arc::new(registry), dir.path())
        .run(&[])
        .await
        .unwrap();
    assert_eq!(summary.skipped_documents, 0);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].test.is_none());
    assert!(matches!(summary.failures[0].error, Error::Document(_)));
}
