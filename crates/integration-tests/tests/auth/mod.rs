mod client_ip;

use indoc::indoc;
use integration_tests::*;

/// A in group 6, B only in the unrelated group 3, C in groups 9 and 3.
fn group_scenario() -> Vec<FakeClient> {
    vec![
        FakeClient::new(1, "A", "10.0.0.1").groups(&[6]),
        FakeClient::new(2, "B", "10.0.0.2").groups(&[3]),
        FakeClient::new(3, "C", "10.0.0.3").groups(&[9, 3]),
    ]
}

#[tokio::test]
async fn authorizes_member_of_required_group() {
    let teamspeak = FakeTeamspeak::spawn(group_scenario()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let response = server.forward_auth("10.0.0.1").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-auth-user"], "A");

    let body: serde_json::Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "ip": "10.0.0.1",
      "status": "authorized",
      "user": "A"
    }
    "#);
}

#[tokio::test]
async fn any_required_group_is_enough() {
    let teamspeak = FakeTeamspeak::spawn(group_scenario()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let response = server.forward_auth("10.0.0.3").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-auth-user"], "C");
}

#[tokio::test]
async fn rejects_member_of_other_groups() {
    let teamspeak = FakeTeamspeak::spawn(group_scenario()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let response = server.forward_auth("10.0.0.2").await;

    assert_eq!(response.status(), 403);
    assert!(response.headers().get("x-auth-user").is_none());

    let body: serde_json::Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "detail": "Forbidden: IP address not authorized"
    }
    "#);
}

#[tokio::test]
async fn rejects_unknown_address() {
    let teamspeak = FakeTeamspeak::spawn(group_scenario()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let response = server.forward_auth("198.51.100.20").await;

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn accepts_any_method() {
    let teamspeak = FakeTeamspeak::spawn(group_scenario()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let mut statuses = Vec::new();

    for method in [
        reqwest::Method::GET,
        reqwest::Method::POST,
        reqwest::Method::PUT,
        reqwest::Method::DELETE,
        reqwest::Method::PATCH,
        reqwest::Method::HEAD,
    ] {
        let response = server
            .client
            .request(method.clone(), "/auth")
            .header("X-Forwarded-For", "10.0.0.1")
            .send()
            .await
            .unwrap();

        statuses.push(format!("{method} {}", response.status().as_u16()));
    }

    insta::assert_debug_snapshot!(statuses, @r#"
    [
        "GET 200",
        "POST 200",
        "PUT 200",
        "DELETE 200",
        "PATCH 200",
        "HEAD 200",
    ]
    "#);
}

#[tokio::test]
async fn later_client_wins_shared_address() {
    let teamspeak = FakeTeamspeak::spawn(vec![
        FakeClient::new(4, "D", "10.0.0.5").groups(&[6]),
        FakeClient::new(5, "E", "10.0.0.5").groups(&[9]),
    ])
    .await;

    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let response = server.forward_auth("10.0.0.5").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-auth-user"], "E");
    assert_eq!(server.status().await["authorized_users_count"], 1);
}

#[tokio::test]
async fn query_clients_are_never_authorized() {
    let teamspeak = FakeTeamspeak::spawn(vec![
        FakeClient::new(7, "bot", "10.0.0.7").groups(&[6]).query(),
        FakeClient::new(8, "joining", "10.0.0.8").groups(&[6]).without_ip(),
    ])
    .await;

    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    assert_eq!(server.forward_auth("10.0.0.7").await.status(), 403);
    assert_eq!(server.status().await["authorized_users_count"], 0);
}

#[tokio::test]
async fn custom_required_groups() {
    let config = indoc! {r#"
        [authorization]
        required_server_groups = "3"
    "#};

    let teamspeak = FakeTeamspeak::spawn(group_scenario()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build(config).await;

    assert_eq!(server.forward_auth("10.0.0.1").await.status(), 403);
    assert_eq!(server.forward_auth("10.0.0.2").await.status(), 200);
    assert_eq!(server.forward_auth("10.0.0.3").await.status(), 200);
}

#[tokio::test]
async fn authorized_subnet_without_teamspeak_user() {
    let config = indoc! {r#"
        [authorization]
        authorized_subnets = ["192.168.0.0/16"]
    "#};

    let teamspeak = FakeTeamspeak::spawn(group_scenario()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build(config).await;

    let response = server.forward_auth("192.168.20.4").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-auth-user"], "localuser");

    let body: serde_json::Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "ip": "192.168.20.4",
      "status": "authorized",
      "user": "localuser"
    }
    "#);
}

#[tokio::test]
async fn subnet_works_while_teamspeak_is_down() {
    let config = indoc! {r#"
        [authorization]
        authorized_subnets = ["10.10.0.0/16"]
    "#};

    let server = TestServer::builder().unreachable_teamspeak().await.build(config).await;

    assert_eq!(server.forward_auth("10.10.1.1").await.status(), 200);
    assert_eq!(server.forward_auth("10.0.0.1").await.status(), 403);
}

#[tokio::test]
async fn nickname_with_spaces_and_pipes() {
    let teamspeak = FakeTeamspeak::spawn(vec![FakeClient::new(1, "Ann | Ops/Team", "10.0.0.1").groups(&[6])]).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let response = server.forward_auth("10.0.0.1").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-auth-user"], "Ann | Ops/Team");
}
