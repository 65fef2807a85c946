use super::*;
use httpmock::prelude::*;
use reqwest::Client;
use reqwest_middleware::ClientBuilder;
use serde_json::json;

const DOCUMENTS_PATH: &str = "/v1/projects/p/databases/(default)/documents";

fn store(server: &MockServer) -> DeviceStore {
    let client = ClientBuilder::new(Client::new()).build();
    DeviceStore::new(FirebaseFirestore::new_with_client(
        client,
        server.url(DOCUMENTS_PATH),
    ))
}

fn device_json(id: &str, on: bool) -> serde_json::Value {
    json!({
        "name": format!("projects/p/databases/(default)/documents/users/alice/devices/{id}"),
        "fields": {
            "type": { "stringValue": "action.devices.types.LIGHT" },
            "name": { "stringValue": format!("{id} light") },
            "hwVersion": { "stringValue": "1.0" },
            "states": { "mapValue": { "fields": { "on": { "booleanValue": on } } } }
        }
    })
}

#[test]
fn test_device_path_parse() {
    assert_eq!(
        DevicePath::parse("users/alice/devices/lamp"),
        Some(DevicePath::new("alice", "lamp"))
    );
    assert_eq!(
        DevicePath::parse("documents/users/alice/devices/lamp"),
        Some(DevicePath::new("alice", "lamp"))
    );
    assert_eq!(
        DevicePath::parse("projects/p/databases/(default)/documents/users/alice/devices/lamp"),
        Some(DevicePath::new("alice", "lamp"))
    );
    assert_eq!(DevicePath::parse("users/alice"), None);
    assert_eq!(DevicePath::parse("users/alice/settings/lamp"), None);
    assert_eq!(DevicePath::parse("rooms/kitchen/users/alice/devices/lamp"), None);
    assert_eq!(DevicePath::parse("users//devices/lamp"), None);
    assert_eq!(
        DevicePath::new("alice", "lamp").to_string(),
        "users/alice/devices/lamp"
    );
}

#[test]
fn test_device_path_rejects_invalid_ids() {
    assert!(DevicePath::try_new("alice", "lamp").is_ok());
    for id in ["", ".", "..", "a/b", "../../bob/devices/lamp", "__name__"] {
        let err = DevicePath::try_new("alice", id).unwrap_err();
        assert!(matches!(err, DeviceStoreError::InvalidId(ref bad) if bad == id));
        assert!(DevicePath::try_new(id, "lamp").is_err());
    }
    assert!(DevicePath::try_new("alice", "_lamp_").is_ok());
    assert_eq!(DevicePath::parse("users/alice/devices/.."), None);
    assert_eq!(DevicePath::parse("users/__x__/devices/lamp"), None);
}

#[tokio::test]
async fn test_invalid_device_path_sends_no_request() {
    let server = MockServer::start();
    let store = store(&server);

    let any = server.mock(|when, then| {
        when.path_includes("/v1/");
        then.status(200).json_body(device_json("lamp", true));
    });

    let path = DevicePath::new("alice", "../../bob/devices/lamp");
    let err = store.device_states(&path).await.unwrap_err();
    assert!(matches!(err, DeviceStoreError::InvalidId(_)));
    let err = store.set_state(&path, "on", json!(true)).await.unwrap_err();
    assert!(matches!(err, DeviceStoreError::InvalidId(_)));
    let events: Vec<_> = store.observe(&path).collect().await;
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], Err(DeviceStoreError::InvalidId(_))));
    assert!(matches!(
        store.user_exists("..").await,
        Err(DeviceStoreError::InvalidId(_))
    ));

    any.assert_calls(0);
}

#[test]
fn test_field_path_segment() {
    assert_eq!(field_path_segment("on"), "on");
    assert_eq!(field_path_segment("night_mode2"), "night_mode2");
    assert_eq!(field_path_segment("2fast"), "`2fast`");
    assert_eq!(field_path_segment("fan.speed"), "`fan.speed`");
    assert_eq!(field_path_segment("a`b"), "`a\\`b`");
}

#[tokio::test]
async fn test_user_exists() {
    let server = MockServer::start();
    let store = store(&server);

    server.mock(|when, then| {
        when.method(GET).path(format!("{}/users/alice", DOCUMENTS_PATH));
        then.status(200).json_body(json!({
            "name": "projects/p/databases/(default)/documents/users/alice",
            "fields": {}
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/users/bob", DOCUMENTS_PATH));
        then.status(404).json_body(json!({
            "error": { "code": 404, "message": "not found", "status": "NOT_FOUND" }
        }));
    });

    assert!(store.user_exists("alice").await.unwrap());
    assert!(!store.user_exists("bob").await.unwrap());
}

#[tokio::test]
async fn test_list_devices() {
    let server = MockServer::start();
    let store = store(&server);

    server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/users/alice/devices", DOCUMENTS_PATH));
        then.status(200).json_body(json!({
            "documents": [device_json("lamp", true), device_json("fan", false)]
        }));
    });

    let devices = store.list_devices("alice").await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].0, "lamp");
    assert_eq!(
        devices[0].1.device_type.as_deref(),
        Some("action.devices.types.LIGHT")
    );
    assert_eq!(devices[0].1.hw_version.as_deref(), Some("1.0"));
    assert_eq!(devices[0].1.traits, None);
    assert_eq!(devices[1].0, "fan");
    assert_eq!(devices[1].1.states.as_ref().unwrap()["on"], json!(false));
}

#[tokio::test]
async fn test_device_states() {
    let server = MockServer::start();
    let store = store(&server);

    server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/users/alice/devices/lamp", DOCUMENTS_PATH));
        then.status(200).json_body(device_json("lamp", true));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/users/alice/devices/ghost", DOCUMENTS_PATH));
        then.status(404);
    });

    let states = store
        .device_states(&DevicePath::new("alice", "lamp"))
        .await
        .unwrap();
    assert_eq!(states, Some(json!({ "on": true })));

    let err = store
        .device_states(&DevicePath::new("alice", "ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceStoreError::DeviceNotFound(p) if p.device_id == "ghost"));
}

#[tokio::test]
async fn test_set_state() {
    let server = MockServer::start();
    let store = store(&server);

    let mock = server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("{}/users/alice/devices/lamp", DOCUMENTS_PATH))
            .query_param("updateMask.fieldPaths", "states.on")
            .query_param("currentDocument.exists", "true")
            .json_body(json!({
                "fields": {
                    "states": { "mapValue": { "fields": { "on": { "booleanValue": true } } } }
                }
            }));
        then.status(200).json_body(device_json("lamp", true));
    });

    store
        .set_state(&DevicePath::new("alice", "lamp"), "on", json!(true))
        .await
        .unwrap();
    mock.assert();
}

#[tokio::test]
async fn test_set_state_missing_device() {
    let server = MockServer::start();
    let store = store(&server);

    server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("{}/users/alice/devices/ghost", DOCUMENTS_PATH));
        then.status(404);
    });

    let err = store
        .set_state(&DevicePath::new("alice", "ghost"), "on", json!(true))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceStoreError::DeviceNotFound(_)));
}

#[tokio::test]
async fn test_observe_reports_existing_then_deleted() {
    let server = MockServer::start();
    let store = store(&server);

    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/projects/p/databases/(default)/documents:listen");
        then.status(200).body(format!(
            "[{},{},{},{}]",
            json!({ "targetChange": { "targetChangeType": "ADD", "targetIds": [1] } }),
            json!({ "documentChange": { "document": device_json("lamp", true), "targetIds": [1] } }),
            json!({ "targetChange": { "targetChangeType": "CURRENT", "targetIds": [1] } }),
            json!({ "documentDelete": {
                "document": "projects/p/databases/(default)/documents/users/alice/devices/lamp"
            } }),
        ));
    });

    let events: Vec<_> = store
        .observe(&DevicePath::new("alice", "lamp"))
        .take(2)
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    let first = events[0].as_ref().unwrap().as_ref().unwrap();
    assert_eq!(first.name.as_deref(), Some("lamp light"));
    assert!(events[1].as_ref().unwrap().is_none());
}

#[tokio::test]
async fn test_observe_missing_document() {
    let server = MockServer::start();
    let store = store(&server);

    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/projects/p/databases/(default)/documents:listen");
        then.status(200).body(format!(
            "[{}]",
            json!({ "targetChange": { "targetChangeType": "CURRENT", "targetIds": [1] } }),
        ));
    });

    let events: Vec<_> = store
        .observe(&DevicePath::new("alice", "ghost"))
        .take(1)
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    assert!(events[0].as_ref().unwrap().is_none());
}

#[tokio::test]
async fn test_observe_listen_failure() {
    let server = MockServer::start();
    let store = store(&server);

    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/projects/p/databases/(default)/documents:listen");
        then.status(403).json_body(json!({
            "error": { "code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED" }
        }));
    });

    let events: Vec<_> = store
        .observe(&DevicePath::new("alice", "lamp"))
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    let err = events[0].as_ref().unwrap_err();
    assert!(err.to_string().contains("insufficient permissions"));
}

#[tokio::test]
async fn test_observe_reopens_closed_listen_from_resume_token() {
    let server = MockServer::start();
    let store = store(&server);

    let first = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/projects/p/databases/(default)/documents:listen")
            .body_excludes("resumeToken");
        then.status(200).body(format!(
            "[{},{}]",
            json!({ "documentChange": { "document": device_json("lamp", true), "targetIds": [1] } }),
            json!({ "targetChange": {
                "targetChangeType": "CURRENT",
                "targetIds": [1],
                "resumeToken": "dG9rLTE="
            } }),
        ));
    });
    let resumed = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/projects/p/databases/(default)/documents:listen")
            .body_includes("\"resumeToken\":\"dG9rLTE=\"");
        then.status(200).body(format!(
            "[{}]",
            json!({ "documentDelete": {
                "document": "projects/p/databases/(default)/documents/users/alice/devices/lamp"
            } }),
        ));
    });

    let events: Vec<_> = store
        .observe(&DevicePath::new("alice", "lamp"))
        .take(2)
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    assert!(events[0].as_ref().unwrap().is_some());
    assert!(events[1].as_ref().unwrap().is_none());
    first.assert_calls(1);
    resumed.assert();
}
