use std::time::Duration;

use envkit::{EnvLoader, Error, ErrorPolicy, NativeValue, TargetEnv, VaultOptions, fetch_secret};

const SECRET_BODY: &str = r#"{
  "data": {
    "data": {
      "DB_USER": "app",
      "DB_PASS": "s3cret",
      "DB_URL": "postgres://${DB_USER}@db:5432",
      "POOL": 10
    },
    "metadata": { "version": 3 }
  }
}"#;

#[test]
fn fetches_secret_data() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v1/secret/data/app")
        .match_header("X-Vault-Token", "test-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SECRET_BODY)
        .create();

    let options = VaultOptions::new()
        .secret("secret/data/app")
        .token("test-token")
        .addr(server.url());
    let mapping = fetch_secret(&options).expect("fetch should succeed");

    mock.assert();
    assert_eq!(mapping["DB_USER"], "app");
    assert_eq!(mapping["DB_URL"], "postgres://${DB_USER}@db:5432");
    assert_eq!(mapping["POOL"], "10");
    assert_eq!(mapping.len(), 4);
}

#[test]
fn non_success_status_is_an_error() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v1/secret/data/app")
        .with_status(403)
        .with_body("permission denied")
        .create();

    let options = VaultOptions::new()
        .secret("secret/data/app")
        .token("bad-token")
        .addr(server.url());

    match fetch_secret(&options) {
        Err(Error::VaultResponse { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "permission denied");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn malformed_payload_is_an_error() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v1/secret/data/app")
        .with_status(200)
        .with_body(r#"{"data": {}}"#)
        .create();

    let options = VaultOptions::new()
        .secret("secret/data/app")
        .token("test-token")
        .addr(server.url());

    assert!(matches!(fetch_secret(&options), Err(Error::VaultPayload(_))));
}

#[test]
fn missing_secret_or_address_fail_before_any_request() {
    let no_secret = VaultOptions::new().token("t").addr("http://127.0.0.1:1");
    assert!(matches!(fetch_secret(&no_secret), Err(Error::VaultSecretNotFound)));

    let no_addr = VaultOptions::new().secret("secret/data/app").token("t");
    assert!(matches!(fetch_secret(&no_addr), Err(Error::VaultAddressNotFound)));
}

#[test]
fn loader_merges_secret_without_overriding() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v1/secret/data/app")
        .with_status(200)
        .with_body(SECRET_BODY)
        .create();

    let mut initial = std::collections::BTreeMap::new();
    initial.insert("DB_PASS".to_string(), "from_env".to_string());
    let mut loader = EnvLoader::new().target(TargetEnv::from_memory(initial));

    let report = loader
        .load_from_vault(
            VaultOptions::new()
                .secret("secret/data/app")
                .token("test-token")
                .addr(server.url()),
        )
        .expect("vault load should succeed");

    assert_eq!(report.loaded, 3);
    assert_eq!(report.skipped_existing, 1);
    assert_eq!(loader.get_raw("DB_PASS").as_deref(), Some("from_env"));
    assert_eq!(loader.get_raw("DB_URL").as_deref(), Some("postgres://app@db:5432"));
    assert_eq!(loader.get("POOL"), NativeValue::Number(10.0));
}

#[test]
fn loader_applies_error_policy_to_vault_failures() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v1/secret/data/app")
        .with_status(500)
        .create();
    let options = || {
        VaultOptions::new()
            .secret("secret/data/app")
            .token("test-token")
            .addr(server.url())
            .timeout(Duration::from_secs(1))
    };

    let mut silent = EnvLoader::new().target(TargetEnv::memory());
    let report = silent
        .load_from_vault(options())
        .expect("silent policy should not fail");
    assert_eq!(report.loaded, 0);

    let mut strict = EnvLoader::new()
        .error_policy(ErrorPolicy::Throw)
        .target(TargetEnv::memory());
    let err = strict
        .load_from_vault(options())
        .expect_err("throw policy should fail");
    assert!(matches!(err, Error::VaultResponse { status: 500, .. }));
}

#[test]
fn bootstrap_loads_configured_secret_before_files() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v1/secret/data/app")
        .with_status(200)
        .with_body(SECRET_BODY)
        .create();

    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join(".env"), "DB_USER=from_file\nAPP=web\n").expect("write fixture");

    let mut loader = EnvLoader::new()
        .dir(dir.path())
        .path(".env")
        .vault(
            VaultOptions::new()
                .secret("secret/data/app")
                .token("test-token")
                .addr(server.url()),
        )
        .target(TargetEnv::memory());
    loader
        .bootstrap(std::iter::empty::<&str>())
        .expect("bootstrap should succeed");

    assert_eq!(loader.get_raw("DB_USER").as_deref(), Some("app"));
    assert_eq!(loader.get_raw("APP").as_deref(), Some("web"));
}
