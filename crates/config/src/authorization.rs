//! Authorization rules: required server groups and always-allowed networks.

use std::{collections::BTreeSet, fmt};

use ipnet::IpNet;
use serde::{
    Deserialize, Deserializer,
    de::{self, SeqAccess, Visitor},
};

/// Which server groups and networks are authorized.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorizationConfig {
    /// Server group ids granting access. A connected client must belong to at least one.
    #[serde(deserialize_with = "deserialize_group_ids")]
    pub required_server_groups: BTreeSet<String>,
    /// Networks that are authorized without a matching TeamSpeak client.
    pub authorized_subnets: Vec<IpNet>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            required_server_groups: ["6", "9"].into_iter().map(String::from).collect(),
            authorized_subnets: Vec::new(),
        }
    }
}

/// Group ids are numeric on the wire, but we compare them as strings. Accept both forms in TOML.
fn deserialize_group_ids<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct GroupIdsVisitor;

    impl<'de> Visitor<'de> for GroupIdsVisitor {
        type Value = BTreeSet<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a list of server group ids")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut groups = BTreeSet::new();

            while let Some(group) = seq.next_element::<GroupId>()? {
                groups.insert(group.0);
            }

            Ok(groups)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| GroupId::parse(s).map(|id| id.0).map_err(E::custom))
                .collect()
        }
    }

    deserializer.deserialize_any(GroupIdsVisitor)
}

struct GroupId(String);

impl GroupId {
    fn parse(value: &str) -> Result<Self, String> {
        match value.parse::<u64>() {
            Ok(id) => Ok(GroupId(id.to_string())),
            Err(_) => Err(format!("invalid server group id '{value}'")),
        }
    }
}

impl<'de> Deserialize<'de> for GroupId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct GroupIdVisitor;

        impl Visitor<'_> for GroupIdVisitor {
            type Value = GroupId;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a server group id as integer or string")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(value)
                    .map(|id| GroupId(id.to_string()))
                    .map_err(|_| E::custom(format!("invalid server group id '{value}'")))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(GroupId(value.to_string()))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                GroupId::parse(value.trim()).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(GroupIdVisitor)
    }
}
