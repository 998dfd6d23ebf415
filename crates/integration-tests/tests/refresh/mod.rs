use std::time::Duration;

use integration_tests::*;

#[tokio::test]
async fn refresh_picks_up_new_clients() {
    let teamspeak = FakeTeamspeak::spawn(vec![]).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    assert_eq!(server.forward_auth("10.0.0.1").await.status(), 403);

    teamspeak.set_clients(vec![FakeClient::new(1, "A", "10.0.0.1").groups(&[6])]);

    let (status, body) = server.refresh().await;
    assert_eq!(status, 200);

    insta::assert_json_snapshot!(body, { ".cache_age_seconds" => "[age]" }, @r#"
    {
      "authorized_users_count": 1,
      "cache_age_seconds": "[age]",
      "status": "refreshed"
    }
    "#);

    assert_eq!(server.forward_auth("10.0.0.1").await.status(), 200);
}

#[tokio::test]
async fn refresh_drops_disconnected_clients() {
    let teamspeak = FakeTeamspeak::spawn(vec![
        FakeClient::new(1, "A", "10.0.0.1").groups(&[6]),
        FakeClient::new(3, "C", "10.0.0.3").groups(&[9]),
    ])
    .await;

    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;
    assert_eq!(server.forward_auth("10.0.0.3").await.status(), 200);

    teamspeak.set_clients(vec![FakeClient::new(1, "A", "10.0.0.1").groups(&[6])]);
    server.refresh().await;

    assert_eq!(server.forward_auth("10.0.0.3").await.status(), 403);
    assert_eq!(server.forward_auth("10.0.0.1").await.status(), 200);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let teamspeak = FakeTeamspeak::spawn(vec![
        FakeClient::new(1, "A", "10.0.0.1").groups(&[6]),
        FakeClient::new(2, "B", "10.0.0.2").groups(&[3]),
        FakeClient::new(3, "C", "10.0.0.3").groups(&[9, 3]),
    ])
    .await;

    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let before = server.status().await;
    assert_eq!(before["authorized_users_count"], 2);

    teamspeak.set_failing(true);

    let (status, body) = server.refresh().await;
    assert_eq!(status, 502);

    insta::assert_json_snapshot!(body, @r#"
    {
      "detail": "Refresh failed: TeamSpeak query failed: Command 'clientlist' failed (2568): insufficient client permissions"
    }
    "#);

    let after = server.status().await;

    assert_eq!(after["authorized_users_count"], 2);
    assert_eq!(after["last_refresh"], before["last_refresh"]);
    assert!(after["cache_age_seconds"].as_f64().unwrap() >= before["cache_age_seconds"].as_f64().unwrap());

    assert_eq!(server.forward_auth("10.0.0.3").await.status(), 200);
}

#[tokio::test]
async fn recovers_after_failed_refresh() {
    let teamspeak = FakeTeamspeak::spawn(vec![FakeClient::new(1, "A", "10.0.0.1").groups(&[6])]).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    teamspeak.set_failing(true);
    assert_eq!(server.refresh().await.0, 502);

    teamspeak.set_failing(false);
    teamspeak.set_clients(vec![FakeClient::new(2, "B", "10.0.0.2").groups(&[9])]);

    let (status, body) = server.refresh().await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "refreshed");
    assert_eq!(server.forward_auth("10.0.0.2").await.status(), 200);

    // The failed session was dropped and a new one opened.
    assert_eq!(teamspeak.connections(), 2);
}

#[tokio::test]
async fn session_is_reused() {
    let teamspeak = FakeTeamspeak::spawn(vec![FakeClient::new(1, "A", "10.0.0.1").groups(&[6])]).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    server.refresh().await;
    server.refresh().await;

    assert_eq!(teamspeak.connections(), 1);

    let commands = teamspeak.commands();

    insta::assert_debug_snapshot!(commands, @r#"
    [
        "login client_login_name=serveradmin client_login_password=***",
        "use sid=1",
        "clientlist -ip",
        "servergroupsbyclientid cldbid=101",
        "clientlist -ip",
        "servergroupsbyclientid cldbid=101",
        "clientlist -ip",
        "servergroupsbyclientid cldbid=101",
    ]
    "#);
}

#[tokio::test]
async fn concurrent_refresh_is_coalesced() {
    let teamspeak = FakeTeamspeak::spawn(vec![FakeClient::new(1, "A", "10.0.0.1").groups(&[6])]).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    teamspeak.set_listing_delay(Some(Duration::from_millis(500)));

    let first = server.refresh();
    let second = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        server.refresh().await
    };

    let ((first_status, first), (second_status, second)) = tokio::join!(first, second);

    assert_eq!(first_status, 200);
    assert_eq!(first["status"], "refreshed");

    assert_eq!(second_status, 200);
    assert_eq!(second["status"], "already_refreshing");
    assert_eq!(second["authorized_users_count"], 1);
}

#[tokio::test]
async fn unreachable_server_at_startup() {
    let server = TestServer::builder().unreachable_teamspeak().await.build("").await;

    let body = server.status().await;

    insta::assert_json_snapshot!(body, @r#"
    {
      "authorized_users_count": 0,
      "cache_age_seconds": null,
      "cache_ttl_seconds": 30,
      "last_refresh": null,
      "status": "running"
    }
    "#);

    assert_eq!(server.forward_auth("10.0.0.1").await.status(), 403);

    let (status, body) = server.refresh().await;
    assert_eq!(status, 502);
    assert!(body["detail"].as_str().unwrap().starts_with("Refresh failed: TeamSpeak server unavailable"));
}

#[tokio::test]
async fn wrong_credentials() {
    let teamspeak = FakeTeamspeak::spawn(vec![FakeClient::new(1, "A", "10.0.0.1").groups(&[6])]).await;

    let config = indoc::formatdoc! {r#"
        [teamspeak]
        host = "127.0.0.1"
        port = {}
        password = "wrong"
    "#, teamspeak.config().lines().find_map(|line| line.strip_prefix("port = ")).unwrap()};

    let server = TestServer::builder().build(&config).await;

    let (status, body) = server.refresh().await;

    assert_eq!(status, 502);

    insta::assert_json_snapshot!(body, @r#"
    {
      "detail": "Refresh failed: TeamSpeak server unavailable: Authentication failed (520): invalid loginname or password"
    }
    "#);
}
