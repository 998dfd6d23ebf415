use indoc::indoc;
use integration_tests::*;
use serde_json::json;

fn admission(address: &str, real_ip: Option<&str>, status: &str) -> serde_json::Value {
    let mut payload = json!({
        "client": {
            "address": address,
            "port": 29291,
            "user_agent": "Mozilla/5.0"
        },
        "request": {
            "direction": "outgoing",
            "protocol": "webrtc",
            "status": status,
            "url": "ws://ome.example.com:3333/app/stream",
            "time": "2026-03-01T21:05:03.000+09:00"
        }
    });

    if let Some(real_ip) = real_ip {
        payload["client"]["real_ip"] = json!(real_ip);
    }

    payload
}

async fn teamspeak() -> FakeTeamspeak {
    FakeTeamspeak::spawn(vec![
        FakeClient::new(1, "A", "10.0.0.1").groups(&[6]),
        FakeClient::new(2, "B", "10.0.0.2").groups(&[3]),
    ])
    .await
}

#[tokio::test]
async fn opening_authorized() {
    let teamspeak = teamspeak().await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let response = server
        .client
        .post("/ome/admission", &admission("10.0.0.1", None, "opening"))
        .await;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "allowed": true,
      "lifetime": 0
    }
    "#);
}

#[tokio::test]
async fn opening_rejected() {
    let teamspeak = teamspeak().await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let body: serde_json::Value = server
        .client
        .post("/ome/admission", &admission("10.0.0.2", None, "opening"))
        .await
        .json()
        .await
        .unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "allowed": false,
      "reason": "IP address not authorized"
    }
    "#);
}

#[tokio::test]
async fn real_ip_takes_precedence() {
    let teamspeak = teamspeak().await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let body: serde_json::Value = server
        .client
        .post("/ome/admission", &admission("10.0.0.2", Some("10.0.0.1"), "opening"))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["allowed"], true);

    let body: serde_json::Value = server
        .client
        .post("/ome/admission", &admission("10.0.0.1", Some("10.0.0.2"), "opening"))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["allowed"], false);
}

#[tokio::test]
async fn closing_returns_empty_object() {
    let teamspeak = teamspeak().await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let body: serde_json::Value = server
        .client
        .post("/ome/admission", &admission("10.0.0.2", None, "closing"))
        .await
        .json()
        .await
        .unwrap();

    insta::assert_json_snapshot!(body, @"{}");
}

#[tokio::test]
async fn subnet_is_admitted() {
    let config = indoc! {r#"
        [authorization]
        authorized_subnets = ["172.16.0.0/12"]
    "#};

    let teamspeak = teamspeak().await;
    let server = TestServer::builder().teamspeak(&teamspeak).build(config).await;

    let body: serde_json::Value = server
        .client
        .post("/ome/admission", &admission("172.20.0.5", None, "opening"))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn malformed_payload() {
    let teamspeak = teamspeak().await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let response = server
        .client
        .post("/ome/admission", &json!({ "client": { "address": "10.0.0.1" } }))
        .await;

    assert_eq!(response.status(), 422);
}
