use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use kns_types::ConnectClusterName;
use kns_types::defaults::CONNECTOR_CLASS_KEY;

/// key added by the connect runtime to every connector config
pub const CONNECTOR_NAME_KEY: &str = "name";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSpec {
    pub connect_cluster: ConnectClusterName,
    /// empty string values are kept, they differ from a missing key
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

impl ConnectorSpec {
    pub fn new(connect_cluster: impl Into<String>) -> Self {
        Self {
            connect_cluster: connect_cluster.into(),
            config: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn connector_class(&self) -> Option<&str> {
        self.config.get(CONNECTOR_CLASS_KEY).map(String::as_str)
    }

    pub fn is_sink(&self) -> bool {
        self.config.contains_key("topics") || self.config.contains_key("topics.regex")
    }

    /// compare with a config reported by the connect runtime
    pub fn same_config(&self, actual: &BTreeMap<String, String>) -> bool {
        let without_name = |config: &BTreeMap<String, String>| {
            config
                .iter()
                .filter(|(key, _)| key.as_str() != CONNECTOR_NAME_KEY)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<BTreeMap<_, _>>()
        };
        without_name(&self.config) == without_name(actual)
    }
}

#[cfg(test)]
mod test {

    use std::collections::BTreeMap;

    use super::ConnectorSpec;

    #[test]
    fn test_same_config_ignores_name() {
        let spec = ConnectorSpec::new("local")
            .with_config("connector.class", "FileStreamSink")
            .with_config("file", "");
        let actual = BTreeMap::from([
            ("connector.class".to_owned(), "FileStreamSink".to_owned()),
            ("file".to_owned(), String::new()),
            ("name".to_owned(), "ns1-sink".to_owned()),
        ]);
        assert!(spec.same_config(&actual));

        let missing_key = BTreeMap::from([
            ("connector.class".to_owned(), "FileStreamSink".to_owned()),
            ("name".to_owned(), "ns1-sink".to_owned()),
        ]);
        assert!(!spec.same_config(&missing_key));
    }
}
