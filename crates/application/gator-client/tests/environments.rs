mod support;

use gator_client::ClientError;
use gator_config::ClientSettings;
use gator_core::{ChangeSource, EnvironmentChange, EnvironmentChangeKind};
use reqwest::Method;
use serde_json::json;
use support::*;
use tokio::sync::broadcast::error::TryRecvError;

#[tokio::test]
async fn create_polls_the_accepted_task_until_done() {
    let transport = ScriptedTransport::new();
    transport.on(Method::POST, "/conda/environments", accepted("/conda/tasks/7"));
    transport.on(Method::GET, "/conda/tasks/7", ok(json!({ "path": "/opt/envs/myenv" })));

    let envs = client(transport.clone());
    let mut changes = envs.subscribe();

    envs.create("myenv", Some("python3")).await.unwrap();

    assert_eq!(
        transport.log(),
        vec![
            (Method::POST, "/conda/environments".to_string()),
            (Method::GET, "/conda/tasks/7".to_string()),
        ]
    );
    assert_eq!(
        body_of(&transport.requests()[0]),
        json!({ "name": "myenv", "packages": ["python=3", "ipykernel"] })
    );
    assert_eq!(
        changes.try_recv().unwrap(),
        EnvironmentChange {
            name: "myenv".into(),
            kind: EnvironmentChangeKind::Create,
            source: Some(ChangeSource::Packages(vec![
                "python=3".into(),
                "ipykernel".into()
            ])),
        }
    );
}

#[tokio::test]
async fn unknown_type_is_read_as_package_list() {
    let transport = ScriptedTransport::new();
    transport.on(Method::POST, "/conda/environments", ok(json!({})));

    let envs = client(transport.clone());
    envs.create("data", Some("numpy  pandas")).await.unwrap();

    assert_eq!(
        body_of(&transport.requests()[0]),
        json!({ "name": "data", "packages": ["numpy", "pandas"] })
    );
}

#[tokio::test]
async fn failed_create_reports_message_and_emits_nothing() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::POST,
        "/conda/environments",
        server_error("CondaValueError: prefix already exists"),
    );

    let envs = client(transport);
    let mut changes = envs.subscribe();

    let err = envs.create("base", Some("python3")).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "An error occurred while creating environment \"base\"."
    );
    match err {
        ClientError::Failed { source, .. } => {
            assert!(source.to_string().contains("prefix already exists"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(changes.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn empty_names_are_ignored() {
    let transport = ScriptedTransport::new();
    let envs = client(transport.clone());

    envs.create("", Some("python3")).await.unwrap();
    envs.clone_environment("base", "").await.unwrap();
    envs.import("", "name: x", None).await.unwrap();
    envs.remove("").await.unwrap();

    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn clone_sends_twin_and_reports_source() {
    let transport = ScriptedTransport::new();
    transport.on(Method::POST, "/conda/environments", ok(json!({})));

    let envs = client(transport.clone());
    let mut changes = envs.subscribe();
    envs.clone_environment("base", "base-copy").await.unwrap();

    assert_eq!(
        body_of(&transport.requests()[0]),
        json!({ "name": "base-copy", "twin": "base" })
    );
    let change = changes.try_recv().unwrap();
    assert_eq!(change.kind, EnvironmentChangeKind::Clone);
    assert_eq!(change.source, Some(ChangeSource::Text("base".into())));
}

#[tokio::test]
async fn import_and_update_send_file_content() {
    let transport = ScriptedTransport::new();
    transport.on(Method::POST, "/conda/environments", ok(json!({})));
    transport.on(Method::PATCH, "/conda/environments/dev", ok(json!({})));

    let envs = client(transport.clone());
    let mut changes = envs.subscribe();
    let spec = "name: dev\ndependencies:\n  - python\n";

    envs.import("dev", spec, Some("environment.yml")).await.unwrap();
    envs.update("dev", spec, None).await.unwrap();

    let requests = transport.requests();
    assert_eq!(
        body_of(&requests[0]),
        json!({ "name": "dev", "file": spec, "filename": "environment.yml" })
    );
    assert_eq!(body_of(&requests[1]), json!({ "file": spec }));

    assert_eq!(changes.try_recv().unwrap().kind, EnvironmentChangeKind::Import);
    assert_eq!(changes.try_recv().unwrap().kind, EnvironmentChangeKind::Update);
}

#[tokio::test]
async fn remove_emits_change_without_source() {
    let transport = ScriptedTransport::new();
    transport.on(Method::DELETE, "/conda/environments/old", accepted("/conda/tasks/2"));
    transport.on(Method::GET, "/conda/tasks/2", ok(json!({})));

    let envs = client(transport.clone());
    let mut changes = envs.subscribe();
    envs.remove("old").await.unwrap();

    assert_eq!(
        changes.try_recv().unwrap(),
        EnvironmentChange {
            name: "old".into(),
            kind: EnvironmentChangeKind::Remove,
            source: None,
        }
    );
}

#[tokio::test]
async fn export_returns_raw_text() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::GET,
        "/conda/environments/base?download=1&history=1",
        ok_text("name: base\n"),
    );

    let envs = client(transport);
    let text = envs.export("base", Some(true)).await.unwrap();

    assert_eq!(text, "name: base\n");
}

#[tokio::test]
async fn export_defaults_to_configured_history_flag() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::GET,
        "/conda/environments/base?download=1&history=1",
        ok_text("name: base\n"),
    );

    let settings = ClientSettings {
        from_history: true,
        ..ClientSettings::default()
    };
    let envs = client_with(transport, settings);

    assert!(envs.export("base", None).await.is_ok());
}

#[tokio::test]
async fn refresh_honours_whitelist_and_caches_result() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::GET,
        "/conda/environments?whitelist=1",
        ok(json!({
            "environments": [
                { "name": "base", "dir": "/opt/conda", "is_default": true },
                { "name": "dev", "dir": "/opt/conda/envs/dev" }
            ]
        })),
    );

    let settings = ClientSettings {
        whitelist: true,
        ..ClientSettings::default()
    };
    let envs = client_with(transport, settings);
    assert!(envs.cached_environments().is_empty());

    let listed = envs.environments().await.unwrap();

    assert_eq!(listed.len(), 2);
    assert!(listed[0].is_default);
    assert_eq!(listed[1].directory_path, "/opt/conda/envs/dev");
    assert_eq!(envs.cached_environments(), listed);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_cache() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::GET,
        "/conda/environments?whitelist=0",
        ok(json!({ "environments": [{ "name": "base", "dir": "/opt/conda" }] })),
    );
    transport.on(
        Method::GET,
        "/conda/environments?whitelist=0",
        Reply::Fail("connection refused".into()),
    );

    let envs = client(transport);
    envs.refresh().await.unwrap();
    let err = envs.refresh().await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "An error occurred while listing Conda environments."
    );
    assert_eq!(envs.cached_environments().len(), 1);
}

#[tokio::test]
async fn channels_are_returned_as_mapping() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::GET,
        "/conda/channels",
        ok(json!({
            "channels": {
                "conda-forge": ["https://conda.anaconda.org/conda-forge"],
                "defaults": ["https://repo.anaconda.com/pkgs/main"]
            }
        })),
    );

    let envs = client(transport);
    let channels = envs.channels("base").await.unwrap();

    assert_eq!(channels.len(), 2);
    assert_eq!(
        channels["defaults"],
        vec!["https://repo.anaconda.com/pkgs/main".to_string()]
    );
}

#[tokio::test]
async fn environment_types_come_from_settings() {
    let envs = client(ScriptedTransport::new());

    assert_eq!(envs.environment_types(), vec!["python3", "r"]);
    assert_eq!(envs.environment_from_type("r"), vec!["r-base", "r-essentials"]);
    assert!(envs.environment_from_type("").is_empty());
}

#[tokio::test]
async fn package_manager_is_shared_and_retargeted() {
    let envs = client(ScriptedTransport::new());

    let first = envs.package_manager(Some("base"));
    let second = envs.package_manager(Some("dev"));

    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(first.environment().as_deref(), Some("dev"));
}
