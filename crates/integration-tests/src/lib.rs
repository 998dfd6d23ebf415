pub mod teamspeak;

use std::{net::SocketAddr, time::Duration};

use config::Config;
use server::ServeConfig;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use teamspeak::{FakeClient, FakeTeamspeak};

/// Test client for making HTTP requests to the test server
#[derive(Clone)]
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }

    /// Send a GET request to the given path, returning Result instead of panicking
    pub async fn try_get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client.get(format!("{}{}", self.base_url, path)).send().await
    }

    /// Send a POST request with a JSON body
    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Create a request with the given method and path
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    /// Configuration used by this test server
    pub config: Config,
    /// Handle to the main tsauth server task
    _server_task_handle: tokio::task::JoinHandle<()>,
    /// Shutdown signal for the main tsauth server
    shutdown_signal: CancellationToken,
}

impl TestServer {
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder::default()
    }

    /// Start a new test server with the given TOML configuration
    async fn start(config_toml: &str) -> Self {
        // Write config to a temporary file and use the proper loader to ensure validation
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("tsauth.toml");
        std::fs::write(&config_path, config_toml).unwrap();

        let config = Config::load(&config_path).unwrap();

        // Find an available port
        let mut listener = TcpListener::bind("127.0.0.1:0").await;

        #[allow(clippy::panic)]
        while let Err(e) = listener {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                listener = TcpListener::bind("127.0.0.1:0").await;
            } else {
                panic!("Failed to bind to address: {e}");
            }
        }

        let listener = listener.unwrap();
        let address = listener.local_addr().unwrap();

        let shutdown_signal = CancellationToken::new();

        let serve_config = ServeConfig {
            listen_address: address,
            config: config.clone(),
            shutdown_signal: shutdown_signal.clone(),
            log_filter: "server=debug,authorization=debug,serverquery=debug,config=debug,integration_tests=debug"
                .to_string(),
        };

        // Start the server in a background task
        let (tx, mut rx) = tokio::sync::oneshot::channel();

        let server_task_handle = tokio::spawn(async move {
            // Drop the listener so the server can bind to the address
            drop(listener);

            let _ = tx.send(server::serve(serve_config).await);
        });

        let client = TestClient::new(format!("http://{address}"));

        // Verify the server is actually running by making a simple request
        let mut retries = 50;
        let mut last_error = None;

        while retries > 0 {
            #[allow(clippy::panic)]
            if let Ok(Err(e)) = rx.try_recv() {
                panic!("Server failed to start: {e}");
            }

            match client.try_get("/").await {
                Ok(_) => break,
                Err(e) => {
                    last_error = Some(e);
                }
            }

            retries -= 1;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        if retries == 0 {
            #[allow(clippy::panic)]
            if let Some(e) = last_error {
                panic!("Server failed to become ready after 50 retries. Last error: {e}");
            } else {
                panic!("Server failed to become ready after 50 retries. No specific error.");
            }
        }

        TestServer {
            client,
            address,
            config,
            _server_task_handle: server_task_handle,
            shutdown_signal,
        }
    }

    /// ForwardAuth request as a reverse proxy would send it for `client_ip`.
    pub async fn forward_auth(&self, client_ip: &str) -> reqwest::Response {
        self.client
            .request(reqwest::Method::GET, "/auth")
            .header("X-Forwarded-For", client_ip)
            .header("X-Forwarded-Method", "GET")
            .header("X-Forwarded-Uri", "/dashboard")
            .send()
            .await
            .unwrap()
    }

    /// Trigger an on-demand refresh and return status code and body.
    pub async fn refresh(&self) -> (u16, serde_json::Value) {
        let response = self
            .client
            .request(reqwest::Method::POST, "/auth/refresh")
            .send()
            .await
            .unwrap();

        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    pub async fn status(&self) -> serde_json::Value {
        let response = self.client.get("/status").await;
        assert_eq!(response.status(), 200);

        response.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // We can't wait for the task to complete in Drop, but cancelling triggers
        // graceful shutdown of the HTTP server and the refresh loop.
        self.shutdown_signal.cancel();
    }
}

#[derive(Default)]
pub struct TestServerBuilder {
    config: String,
}

impl TestServerBuilder {
    /// Point the server at a fake ServerQuery endpoint.
    pub fn teamspeak(mut self, teamspeak: &FakeTeamspeak) -> Self {
        self.config.push_str(&teamspeak.config());
        self
    }

    /// Point the server at a port nobody listens on.
    pub async fn unreachable_teamspeak(mut self) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        self.config.push_str(&indoc::formatdoc! {r#"

            [teamspeak]
            host = "{}"
            port = {}
            timeout = "1s"
        "#, address.ip(), address.port()});

        self
    }

    pub async fn build(self, config: &str) -> TestServer {
        let mut final_config = config.to_string();

        final_config.push('\n');
        final_config.push_str(&self.config);

        TestServer::start(&final_config).await
    }
}
