use indoc::indoc;
use integration_tests::*;

fn clients() -> Vec<FakeClient> {
    vec![
        FakeClient::new(1, "Origin", "203.0.113.7").groups(&[6]),
        FakeClient::new(2, "Proxy", "198.51.100.1").groups(&[6]),
        FakeClient::new(3, "Local", "127.0.0.1").groups(&[6]),
    ]
}

async fn user_for(server: &TestServer, headers: &[(&str, &str)]) -> Option<String> {
    let mut request = server.client.request(reqwest::Method::GET, "/auth");

    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request.send().await.unwrap();

    response
        .headers()
        .get("x-auth-user")
        .map(|value| value.to_str().unwrap().to_string())
}

#[tokio::test]
async fn leftmost_forwarded_for_by_default() {
    let teamspeak = FakeTeamspeak::spawn(clients()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let user = user_for(&server, &[("X-Forwarded-For", "203.0.113.7, 198.51.100.1")]).await;
    assert_eq!(user.as_deref(), Some("Origin"));
}

#[tokio::test]
async fn peer_without_headers() {
    let teamspeak = FakeTeamspeak::spawn(clients()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build("").await;

    let user = user_for(&server, &[]).await;
    assert_eq!(user.as_deref(), Some("Local"));
}

#[tokio::test]
async fn trusted_hops() {
    let config = indoc! {r#"
        [server.client_ip]
        trusted_hops = 1
    "#};

    let teamspeak = FakeTeamspeak::spawn(clients()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build(config).await;

    // The rightmost entry was added by our own trusted proxy.
    let user = user_for(&server, &[("X-Forwarded-For", "6.6.6.6, 198.51.100.1, 10.0.0.254")]).await;
    assert_eq!(user.as_deref(), Some("Proxy"));
}

#[tokio::test]
async fn x_real_ip() {
    let config = indoc! {r#"
        [server.client_ip]
        x_real_ip = true
    "#};

    let teamspeak = FakeTeamspeak::spawn(clients()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build(config).await;

    let user = user_for(
        &server,
        &[("X-Real-IP", "198.51.100.1"), ("X-Forwarded-For", "203.0.113.7")],
    )
    .await;

    assert_eq!(user.as_deref(), Some("Proxy"));
}

#[tokio::test]
async fn forwarded_for_disabled() {
    let config = indoc! {r#"
        [server.client_ip]
        x_forwarded_for = false
    "#};

    let teamspeak = FakeTeamspeak::spawn(clients()).await;
    let server = TestServer::builder().teamspeak(&teamspeak).build(config).await;

    let user = user_for(&server, &[("X-Forwarded-For", "203.0.113.7")]).await;
    assert_eq!(user.as_deref(), Some("Local"));
}
