use std::net::IpAddr;

use ipnet::IpNet;

/// Networks whose members are authorized without a TeamSpeak presence.
#[derive(Debug, Clone, Default)]
pub struct SubnetAllowlist {
    networks: Vec<IpNet>,
}

impl SubnetAllowlist {
    pub fn new(networks: Vec<IpNet>) -> Self {
        Self { networks }
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// The first configured network containing `ip`.
    pub fn find(&self, ip: IpAddr) -> Option<&IpNet> {
        let ip = ip.to_canonical();
        self.networks.iter().find(|network| network.contains(&ip))
    }
}
