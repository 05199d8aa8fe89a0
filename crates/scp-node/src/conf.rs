//! SCC Core configuration file (`SCC.conf`) support.

use crate::error::{Error, Result};
use scp_indexer::protocol::parse_number;
use std::collections::HashMap;
use std::path::Path;

/// `key=value` settings of an SCC Core node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeConf {
    values: HashMap<String, String>,
}

/// Problems found in a [`NodeConf`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Settings the indexer can not run without.
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl NodeConf {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ReadConf {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Parses `key=value` lines. Blank lines, `#` comments and lines without `=` are
    /// skipped, the last occurrence of a key wins.
    pub fn parse(content: &str) -> Self {
        let values = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        Self { values }
    }

    /// Returns the non-empty value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Whether `key` is set to a value numerically equal to 1.
    pub fn is_enabled(&self, key: &str) -> bool {
        self.get(key).and_then(parse_number) == Some(1.0)
    }

    /// Checks the node settings the indexer depends on.
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::default();

        if !self.is_enabled("txindex") {
            diagnostics
                .errors
                .push("No txindex enabled, set txindex=1".to_string());
        }
        if !self.is_enabled("server") {
            diagnostics
                .errors
                .push("No RPC server enabled, set server=1".to_string());
        }
        if !self.is_enabled("addressindex") {
            diagnostics.warnings.push(
                "No address index, set addressindex=1 to use address-related queries".to_string(),
            );
        }

        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCC_CONF: &str = "
# SCC Core
txindex=1
server = 1
rpcuser=scp
rpcpassword=secret=with=equals
rpcport=39999
addressindex=0
daemon
";

    #[test]
    fn parse_key_value_lines() {
        let conf = NodeConf::parse(SCC_CONF);
        assert_eq!(conf.get("rpcuser"), Some("scp"));
        assert_eq!(conf.get("rpcpassword"), Some("secret=with=equals"));
        assert_eq!(conf.get("server"), Some("1"));
        assert_eq!(conf.get("daemon"), None);
        assert_eq!(conf.get("# SCC Core"), None);
    }

    #[test]
    fn last_occurrence_wins() {
        let conf = NodeConf::parse("txindex=0\ntxindex=1\nrpcuser=\n");
        assert!(conf.is_enabled("txindex"));
        assert_eq!(conf.get("rpcuser"), None);
    }

    #[test]
    fn enabled_flags_follow_numeric_comparison() {
        let conf = NodeConf::parse("a=1\nb=1.0\nc=true\nd=01\ne=2");
        assert!(conf.is_enabled("a"));
        assert!(conf.is_enabled("b"));
        assert!(!conf.is_enabled("c"));
        assert!(conf.is_enabled("d"));
        assert!(!conf.is_enabled("e"));
        assert!(!conf.is_enabled("missing"));
    }

    #[test]
    fn diagnostics_report_missing_indexes() {
        let diagnostics = NodeConf::parse(SCC_CONF).diagnostics();
        assert!(diagnostics.errors.is_empty());
        assert_eq!(diagnostics.warnings.len(), 1);

        let diagnostics = NodeConf::parse("server=1").diagnostics();
        assert_eq!(diagnostics.errors, vec![
            "No txindex enabled, set txindex=1".to_string()
        ]);
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SCC.conf");
        std::fs::write(&path, SCC_CONF).unwrap();
        assert_eq!(NodeConf::load(&path).unwrap(), NodeConf::parse(SCC_CONF));

        assert!(matches!(
            NodeConf::load(&dir.path().join("missing.conf")),
            Err(Error::ReadConf { .. })
        ));
    }
}
