use super::*;
use crate::firestore::FirebaseFirestore;
use http::HeaderValue;
use httpmock::prelude::*;
use reqwest::Client;
use reqwest_middleware::ClientBuilder;
use serde_json::json;

const DOCUMENTS_PATH: &str = "/v1/projects/p/databases/(default)/documents";
const USER: &str = "google-oauth2|42";

fn app(server: &MockServer) -> SmartHomeApp {
    let firestore = FirebaseFirestore::new_with_client(
        ClientBuilder::new(Client::new()).build(),
        server.url(DOCUMENTS_PATH),
    );
    let profiles = ProfileClient::new_with_client(
        ClientBuilder::new(Client::new()).build(),
        server.base_url(),
    );
    SmartHomeApp::new(DeviceStore::new(firestore), profiles)
}

fn auth_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_static("Bearer 123ABC"));
    headers
}

fn mock_profile(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/userinfo")
            .header("authorization", "Bearer 123ABC");
        then.status(200).json_body(json!({ "sub": USER }));
    });
}

fn device_path(id: &str) -> String {
    format!("{}/users/{}/devices/{}", DOCUMENTS_PATH, USER, id)
}

fn request(body: serde_json::Value) -> SmartHomeRequest {
    serde_json::from_value(body).unwrap()
}

fn light_document(id: &str, on: bool) -> serde_json::Value {
    json!({
        "name": format!("projects/p/databases/(default)/documents/users/{USER}/devices/{id}"),
        "fields": {
            "type": { "stringValue": "action.devices.types.LIGHT" },
            "traits": { "arrayValue": { "values": [
                { "stringValue": "action.devices.traits.OnOff" }
            ] } },
            "defaultNames": { "arrayValue": { "values": [
                { "stringValue": "Gizmo light" }
            ] } },
            "name": { "stringValue": format!("{id} light") },
            "nicknames": { "arrayValue": { "values": [
                { "stringValue": "reading lamp" }
            ] } },
            "manufacturer": { "stringValue": "Gizmo Inc" },
            "model": { "stringValue": "g-100" },
            "hwVersion": { "stringValue": "1.0" },
            "swVersion": { "stringValue": "2.3.1" },
            "states": { "mapValue": { "fields": {
                "on": { "booleanValue": on },
                "online": { "booleanValue": true }
            } } }
        }
    })
}

#[tokio::test]
async fn test_sync_without_account_returns_empty_object() {
    let server = MockServer::start();
    mock_profile(&server);
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/users/{}", DOCUMENTS_PATH, USER));
        then.status(404);
    });
    let list = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/users/{}/devices", DOCUMENTS_PATH, USER));
        then.status(200).json_body(json!({}));
    });

    let response = app(&server)
        .handle(
            &request(json!({
                "requestId": "sync-1",
                "inputs": [{ "intent": "action.devices.SYNC" }]
            })),
            &auth_headers(),
        )
        .await
        .unwrap();

    assert_eq!(serde_json::to_value(&response).unwrap(), json!({}));
    list.assert_calls(0);
}

#[tokio::test]
async fn test_sync_maps_every_device() {
    let server = MockServer::start();
    mock_profile(&server);
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/users/{}", DOCUMENTS_PATH, USER));
        then.status(200).json_body(json!({
            "name": format!("projects/p/databases/(default)/documents/users/{USER}"),
            "fields": {}
        }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/users/{}/devices", DOCUMENTS_PATH, USER));
        then.status(200).json_body(json!({
            "documents": [
                light_document("desk", true),
                {
                    "name": format!("projects/p/databases/(default)/documents/users/{USER}/devices/bare"),
                    "fields": { "type": { "stringValue": "action.devices.types.SWITCH" } }
                }
            ]
        }));
    });

    let response = app(&server)
        .handle(
            &request(json!({
                "requestId": "sync-2",
                "inputs": [{ "intent": "action.devices.SYNC" }]
            })),
            &auth_headers(),
        )
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "requestId": "sync-2",
            "payload": {
                "agentUserId": USER,
                "devices": [
                    {
                        "id": "desk",
                        "type": "action.devices.types.LIGHT",
                        "traits": ["action.devices.traits.OnOff"],
                        "name": {
                            "defaultNames": ["Gizmo light"],
                            "name": "desk light",
                            "nicknames": ["reading lamp"]
                        },
                        "deviceInfo": {
                            "manufacturer": "Gizmo Inc",
                            "model": "g-100",
                            "hwVersion": "1.0",
                            "swVersion": "2.3.1"
                        }
                    },
                    {
                        "id": "bare",
                        "type": "action.devices.types.SWITCH",
                        "name": {},
                        "deviceInfo": {}
                    }
                ]
            }
        })
    );
}

#[tokio::test]
async fn test_query_returns_states_by_device_id() {
    let server = MockServer::start();
    mock_profile(&server);
    server.mock(|when, then| {
        when.method(GET).path(device_path("desk"));
        then.status(200).json_body(light_document("desk", true));
    });
    server.mock(|when, then| {
        when.method(GET).path(device_path("porch"));
        then.status(200).json_body(light_document("porch", false));
    });

    let response = app(&server)
        .handle(
            &request(json!({
                "requestId": "query-1",
                "inputs": [{
                    "intent": "action.devices.QUERY",
                    "payload": { "devices": [{ "id": "desk" }, { "id": "porch" }] }
                }]
            })),
            &auth_headers(),
        )
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "requestId": "query-1",
            "payload": {
                "devices": {
                    "desk": { "on": true, "online": true },
                    "porch": { "on": false, "online": true }
                }
            }
        })
    );
}

#[tokio::test]
async fn test_query_unknown_device_fails() {
    let server = MockServer::start();
    mock_profile(&server);
    server.mock(|when, then| {
        when.method(GET).path(device_path("ghost"));
        then.status(404);
    });

    let err = app(&server)
        .handle(
            &request(json!({
                "requestId": "query-2",
                "inputs": [{
                    "intent": "action.devices.QUERY",
                    "payload": { "devices": [{ "id": "ghost" }] }
                }]
            })),
            &auth_headers(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SmartHomeError::DeviceStore(DeviceStoreError::DeviceNotFound(_))
    ));
    assert!(!err.is_unauthorized());
    assert!(!err.is_bad_request());
}

#[tokio::test]
async fn test_execute_on_off_writes_state() {
    let server = MockServer::start();
    mock_profile(&server);
    let update = server.mock(|when, then| {
        when.method(PATCH)
            .path(device_path("desk"))
            .query_param("updateMask.fieldPaths", "states.on")
            .json_body(json!({
                "fields": {
                    "states": { "mapValue": { "fields": { "on": { "booleanValue": true } } } }
                }
            }));
        then.status(200).json_body(light_document("desk", true));
    });

    let response = app(&server)
        .handle(
            &request(json!({
                "requestId": "exec-1",
                "inputs": [{
                    "intent": "action.devices.EXECUTE",
                    "payload": {
                        "commands": [{
                            "devices": [{ "id": "desk" }],
                            "execution": [{
                                "command": "action.devices.commands.OnOff",
                                "params": { "on": true }
                            }]
                        }]
                    }
                }]
            })),
            &auth_headers(),
        )
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "requestId": "exec-1",
            "payload": {
                "commands": [{
                    "ids": ["desk"],
                    "status": "SUCCESS",
                    "states": { "online": true, "on": true }
                }]
            }
        })
    );
    update.assert();
}

#[tokio::test]
async fn test_execute_unknown_command_is_ignored() {
    let server = MockServer::start();
    mock_profile(&server);
    let update = server.mock(|when, then| {
        when.method(PATCH).path(device_path("desk"));
        then.status(200).json_body(light_document("desk", true));
    });

    let response = app(&server)
        .handle(
            &request(json!({
                "requestId": "exec-2",
                "inputs": [{
                    "intent": "action.devices.EXECUTE",
                    "payload": {
                        "commands": [{
                            "devices": [{ "id": "desk" }],
                            "execution": [{
                                "command": "action.devices.commands.BrightnessAbsolute",
                                "params": { "brightness": 40 }
                            }]
                        }]
                    }
                }]
            })),
            &auth_headers(),
        )
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "requestId": "exec-2",
            "payload": {
                "commands": [{
                    "ids": ["desk"],
                    "status": "SUCCESS",
                    "states": { "online": true }
                }]
            }
        })
    );
    update.assert_calls(0);
}

#[tokio::test]
async fn test_execute_reports_last_applied_value() {
    let server = MockServer::start();
    mock_profile(&server);
    let update = server.mock(|when, then| {
        when.method(PATCH).path_matches(".*/devices/.*");
        then.status(200).json_body(json!({ "name": "ignored", "fields": {} }));
    });

    let response = app(&server)
        .on_execute(
            &request(json!({
                "requestId": "exec-3",
                "inputs": [{
                    "intent": "action.devices.EXECUTE",
                    "payload": {
                        "commands": [
                            {
                                "devices": [{ "id": "desk" }, { "id": "porch" }],
                                "execution": [{
                                    "command": "action.devices.commands.OnOff",
                                    "params": { "on": true }
                                }]
                            },
                            {
                                "devices": [{ "id": "desk" }],
                                "execution": [{
                                    "command": "action.devices.commands.OnOff",
                                    "params": { "on": false }
                                }]
                            }
                        ]
                    }
                }]
            })),
            &auth_headers(),
        )
        .await
        .unwrap();

    let result = &response.payload.commands[0];
    assert_eq!(result.ids, vec!["desk", "porch", "desk"]);
    assert_eq!(result.states.on, Some(false));
    update.assert_calls(3);
}

#[tokio::test]
async fn test_execute_on_missing_device_fails() {
    let server = MockServer::start();
    mock_profile(&server);
    server.mock(|when, then| {
        when.method(PATCH).path(device_path("ghost"));
        then.status(404);
    });

    let err = app(&server)
        .handle(
            &request(json!({
                "requestId": "exec-4",
                "inputs": [{
                    "intent": "action.devices.EXECUTE",
                    "payload": {
                        "commands": [{
                            "devices": [{ "id": "ghost" }],
                            "execution": [{
                                "command": "action.devices.commands.OnOff",
                                "params": { "on": true }
                            }]
                        }]
                    }
                }]
            })),
            &auth_headers(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SmartHomeError::DeviceStore(DeviceStoreError::DeviceNotFound(_))
    ));
}

#[tokio::test]
async fn test_device_id_cannot_reach_another_user() {
    let server = MockServer::start();
    mock_profile(&server);
    let victim = server.mock(|when, then| {
        when.path_includes("/users/victim/");
        then.status(200).json_body(light_document("lamp", true));
    });
    let writes = server.mock(|when, then| {
        when.method(PATCH);
        then.status(200).json_body(light_document("lamp", true));
    });
    let app = app(&server);

    for id in ["../../victim/devices/lamp", "..", "a/b", ""] {
        let err = app
            .handle(
                &request(json!({
                    "requestId": "query-x",
                    "inputs": [{
                        "intent": "action.devices.QUERY",
                        "payload": { "devices": [{ "id": id }] }
                    }]
                })),
                &auth_headers(),
            )
            .await
            .unwrap_err();
        assert!(err.is_bad_request(), "{err}");

        let err = app
            .handle(
                &request(json!({
                    "requestId": "exec-x",
                    "inputs": [{
                        "intent": "action.devices.EXECUTE",
                        "payload": {
                            "commands": [{
                                "devices": [{ "id": id }],
                                "execution": [{
                                    "command": "action.devices.commands.OnOff",
                                    "params": { "on": true }
                                }]
                            }]
                        }
                    }]
                })),
                &auth_headers(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SmartHomeError::DeviceStore(DeviceStoreError::InvalidId(ref bad)) if bad == id
        ));
    }

    victim.assert_calls(0);
    writes.assert_calls(0);
}

#[tokio::test]
async fn test_missing_authorization_is_unauthorized() {
    let server = MockServer::start();

    let err = app(&server)
        .handle(
            &request(json!({
                "requestId": "sync-3",
                "inputs": [{ "intent": "action.devices.SYNC" }]
            })),
            &HeaderMap::new(),
        )
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_unknown_intent_and_empty_inputs() {
    let server = MockServer::start();
    let app = app(&server);

    let err = app
        .handle(
            &request(json!({
                "requestId": "x",
                "inputs": [{ "intent": "action.devices.DISCONNECT" }]
            })),
            &auth_headers(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SmartHomeError::UnsupportedIntent(ref i) if i == "action.devices.DISCONNECT"
    ));
    assert!(err.is_bad_request());

    let err = app
        .handle(&request(json!({ "requestId": "y", "inputs": [] })), &auth_headers())
        .await
        .unwrap_err();
    assert!(matches!(err, SmartHomeError::InvalidRequest(_)));
}

#[test]
fn test_parse_device_command() {
    let execution: models::Execution = serde_json::from_value(json!({
        "command": "action.devices.commands.OnOff",
        "params": { "on": false }
    }))
    .unwrap();
    assert_eq!(
        DeviceCommand::parse(&execution).unwrap(),
        DeviceCommand::OnOff { on: false }
    );

    let execution: models::Execution = serde_json::from_value(json!({
        "command": "action.devices.commands.OnOff",
        "params": { "on": "yes" }
    }))
    .unwrap();
    assert!(matches!(
        DeviceCommand::parse(&execution),
        Err(SmartHomeError::InvalidParams { .. })
    ));

    let execution: models::Execution = serde_json::from_value(json!({
        "command": "action.devices.commands.ColorAbsolute"
    }))
    .unwrap();
    assert_eq!(
        DeviceCommand::parse(&execution).unwrap(),
        DeviceCommand::Unsupported("action.devices.commands.ColorAbsolute".to_string())
    );
}
