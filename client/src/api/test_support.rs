use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::{json, Value};

use crate::api::{ApiClient, Role, UserIdentity};
use crate::session::Session;

pub const NINE_AM: &str = "2025-01-02T09:00:00Z";

/// Client pointed at `server` with an empty session.
pub fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new_with_base_url(server.url("/api"), Session::in_memory())
}

/// Client with a signed-in regular user (`test-token`).
pub async fn seeded_client(server: &MockServer) -> ApiClient {
    let api = client_for(server);
    api.session()
        .persist_login("test-token", &alice())
        .await
        .unwrap();
    api
}

/// Client with a signed-in admin (`admin-token`).
pub async fn seeded_admin_client(server: &MockServer) -> ApiClient {
    let api = client_for(server);
    let admin = UserIdentity {
        id: "a1".into(),
        username: "root".into(),
        email: "root@example.com".into(),
        role: Role::Admin,
        profile_image: None,
    };
    api.session()
        .persist_login("admin-token", &admin)
        .await
        .unwrap();
    api
}

pub async fn authed_client(server: &MockServer) -> ApiClient {
    seeded_client(server).await
}

pub fn alice() -> UserIdentity {
    serde_json::from_value(alice_json()).unwrap()
}

pub fn alice_json() -> Value {
    json!({
        "_id": "u1",
        "username": "alice",
        "email": "alice@example.com",
        "role": "user"
    })
}

pub fn no_record_status() -> Value {
    json!({ "attendance": null, "canCheckin": true, "canCheckout": false })
}

pub fn open_status() -> Value {
    json!({
        "attendance": {
            "_id": "a1",
            "checkinTime": NINE_AM,
            "checkoutTime": null,
            "checkinLocation": { "latitude": 24.86, "longitude": 67.0, "address": "HQ" }
        },
        "canCheckin": false,
        "canCheckout": true
    })
}

pub fn closed_status(total_hours: f64) -> Value {
    json!({
        "attendance": {
            "_id": "a1",
            "checkinTime": NINE_AM,
            "checkoutTime": "2025-01-02T17:15:00Z",
            "totalHours": total_hours
        },
        "canCheckin": false,
        "canCheckout": false
    })
}

pub async fn mock_today(server: &MockServer, body: Value) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/attendance/today");
            then.status(200).json_body(body);
        })
        .await
}
