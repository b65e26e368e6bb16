use crate::error::ConfigError;
use crate::rules::{Policy, TableRules};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Health check configuration
///
/// Loaded from an optional TOML file; every field has a default matching the
/// standard Homestead deployment. The server error tolerance is not part of
/// the file: it is the tool's one required command-line argument.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Classification policy for the Cx result codes
    pub policy: Policy,
    /// Read the tables of a pass concurrently
    pub parallel_reads: bool,
    /// Connection to the local SNMP agent
    pub snmp: SnmpConfig,
}

/// How to reach the SNMP agent exposing the Cx statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SnmpConfig {
    pub host: String,
    /// Community string; unset means the default for the configured policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
    /// SNMP protocol version passed to the tools ("1" or "2c")
    pub version: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    pub retries: u32,
    /// Walk tool, e.g. a full path to `snmpwalk`
    pub walk_command: String,
    /// Get tool, e.g. a full path to `snmpget`
    pub get_command: String,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            community: None,
            version: "2c".to_string(),
            timeout_seconds: 5,
            retries: 1,
            walk_command: "snmpwalk".to_string(),
            get_command: "snmpget".to_string(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read, and a parse
    /// or validation error if its contents are invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable before any counter is read
    pub fn validate(&self) -> Result<(), ConfigError> {
        let snmp = &self.snmp;

        for (name, value) in [
            ("snmp.host", Some(&snmp.host)),
            ("snmp.community", snmp.community.as_ref()),
            ("snmp.walk_command", Some(&snmp.walk_command)),
            ("snmp.get_command", Some(&snmp.get_command)),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{} must not be empty",
                    name
                )));
            }
        }

        if !matches!(snmp.version.as_str(), "1" | "2c") {
            return Err(ConfigError::ValidationError(format!(
                "snmp.version must be \"1\" or \"2c\", got \"{}\"",
                snmp.version
            )));
        }

        if snmp.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "snmp.timeout_seconds must be greater than zero".to_string(),
            ));
        }

        self.policy.table_rules()?;
        Ok(())
    }

    /// Rule sets for the monitored tables under the configured policy
    pub fn table_rules(&self) -> Result<Vec<TableRules>, ConfigError> {
        self.policy.table_rules()
    }

    /// SNMP settings with the community filled in from the policy if unset
    pub fn resolved_snmp(&self) -> SnmpConfig {
        let mut snmp = self.snmp.clone();
        snmp.community
            .get_or_insert_with(|| self.policy.default_community().to_string());
        snmp
    }
}

/// Parse the server error tolerance given on the command line
///
/// # Errors
///
/// Returns `ConfigError::InvalidTolerance` for anything that is not a
/// non-negative integer.
pub fn parse_tolerance(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidTolerance(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy, Policy::ClassBased);
        assert_eq!(config.snmp.host, "localhost");
        assert_eq!(config.snmp.version, "2c");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            policy = "explicit-codes"
            parallel_reads = true

            [snmp]
            community = "clearwater"
            retries = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.policy, Policy::ExplicitCodes);
        assert!(config.parallel_reads);
        assert_eq!(config.snmp.community.as_deref(), Some("clearwater"));
        assert_eq!(config.snmp.retries, 3);
        assert_eq!(config.snmp.host, "localhost");
    }

    #[test]
    fn test_community_defaults_follow_policy() {
        let config = Config::default();
        assert_eq!(
            config.resolved_snmp().community.as_deref(),
            Some("clearwater-internal")
        );

        let config = Config::from_toml_str("policy = \"explicit-codes\"").unwrap();
        assert_eq!(config.snmp.community, None);
        assert_eq!(config.resolved_snmp().community.as_deref(), Some("clearwater"));

        let config =
            Config::from_toml_str("policy = \"explicit-codes\"\n[snmp]\ncommunity = \"hs\"")
                .unwrap();
        assert_eq!(config.resolved_snmp().community.as_deref(), Some("hs"));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let result = Config::from_toml_str("policy = \"loose\"");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = Config::from_toml_str("tolerance = 10");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            "[snmp]\nhost = \"\"",
            "[snmp]\nversion = \"3\"",
            "[snmp]\ntimeout_seconds = 0",
            "[snmp]\nwalk_command = \"  \"",
            "[snmp]\ncommunity = \"\"",
        ];
        for case in cases {
            let result = Config::from_toml_str(case);
            assert!(
                matches!(result, Err(ConfigError::ValidationError(_))),
                "expected validation error for {:?}",
                case
            );
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[snmp]\nhost = \"10.0.0.1\"").unwrap();
        file.flush().unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.snmp.host, "10.0.0.1");
    }

    #[test]
    fn test_from_missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/cx_health.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_parse_tolerance() {
        assert_eq!(parse_tolerance("10").unwrap(), 10);
        assert_eq!(parse_tolerance(" 0 ").unwrap(), 0);

        for bad in ["-1", "ten", "", "1.5"] {
            assert!(
                matches!(parse_tolerance(bad), Err(ConfigError::InvalidTolerance(_))),
                "expected {:?} to be rejected",
                bad
            );
        }
    }
}
