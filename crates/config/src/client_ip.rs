/// Configuration for extracting the client IP of a forwarded request from headers.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientIpConfig {
    /// Whether X-Real-IP header should be used.
    pub x_real_ip: bool,
    /// Whether X-Forwarded-For header should be used.
    pub x_forwarded_for: bool,
    /// How many trusted hops to skip from the right of X-Forwarded-For.
    /// If None, the leftmost (originating) address is used.
    pub trusted_hops: Option<usize>,
}

impl Default for ClientIpConfig {
    fn default() -> Self {
        Self {
            x_real_ip: false,
            x_forwarded_for: true,
            trusted_hops: None,
        }
    }
}
