use indoc::indoc;
use integration_tests::*;

#[tokio::test]
async fn root_lists_endpoints() {
    let server = TestServer::builder().unreachable_teamspeak().await.build("").await;

    let response = server.client.get("/").await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "endpoints": {
        "/auth": "ForwardAuth endpoint for reverse proxies (Traefik, etc.)",
        "/auth/check": "Check if requesting IP is authorized",
        "/auth/check/{ip}": "Check if specific IP is authorized",
        "/auth/refresh": "Refresh authorized users now",
        "/ome/admission": "OvenMediaEngine Admission Webhook endpoint",
        "/status": "Service status and statistics"
      },
      "service": "tsauth",
      "version": "0.1.0"
    }
    "#);
}

#[tokio::test]
async fn status_after_refresh() {
    let config = indoc! {r#"
        [cache]
        ttl = "2m"
    "#};

    let teamspeak = FakeTeamspeak::spawn(vec![
        FakeClient::new(1, "A", "10.0.0.1").groups(&[6]),
        FakeClient::new(2, "B", "10.0.0.2").groups(&[9]),
    ])
    .await;

    let server = TestServer::builder().teamspeak(&teamspeak).build(config).await;

    let body = server.status().await;

    insta::assert_json_snapshot!(body, {
        ".cache_age_seconds" => "[age]",
        ".last_refresh" => "[timestamp]",
    }, @r#"
    {
      "authorized_users_count": 2,
      "cache_age_seconds": "[age]",
      "cache_ttl_seconds": 120,
      "last_refresh": "[timestamp]",
      "status": "running"
    }
    "#);

    assert!(body["cache_age_seconds"].as_f64().unwrap() < 120.0);
    assert!(body["last_refresh"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn age_grows_between_refreshes() {
    let teamspeak = FakeTeamspeak::spawn(vec![FakeClient::new(1, "A", "10.0.0.1").groups(&[6])]).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let first = server.status().await["cache_age_seconds"].as_f64().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let second = server.status().await["cache_age_seconds"].as_f64().unwrap();

    assert!(second >= first);

    server.refresh().await;
    let third = server.status().await["cache_age_seconds"].as_f64().unwrap();

    assert!(third < second);
}
