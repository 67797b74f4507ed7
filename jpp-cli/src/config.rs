//! CLI configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! network = "test"
//! currency = "BTC"
//! strict_ssl = true
//! timeout_secs = 30
//!
//! [headers]
//! x-partner = "$JPP_PARTNER"
//!
//! [trusted_keys.mh65MN7drqmwpCRZcEeBEE9ceQCQ95HtZc]
//! owner = "BitPay (TESTNET ONLY - DO NOT TRUST FOR ACTUAL BITCOIN)"
//! networks = ["test"]
//! domains = ["test.bitpay.com"]
//! publicKey = "03159069584176096f1c89763488b94dbc8d5e1fa7bf91f50b42f4befe4e45295a"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use http::{HeaderName, HeaderValue};
use jpp::KeyRegistry;
use jpp_http::ClientOptions;
use serde::{Deserialize, Serialize};

/// Top-level CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Network payments are expected on (default: `main`).
    #[serde(default = "default_network")]
    pub network: String,

    /// Currency payments are expected in (default: `BTC`).
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Whether TLS certificates are verified (default: `true`).
    #[serde(default = "default_strict_ssl")]
    pub strict_ssl: bool,

    /// Timeout for each request, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Extra headers sent with every request, e.g. partner identification.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Identities trusted to sign payment requests.
    #[serde(default)]
    pub trusted_keys: KeyRegistry,
}

fn default_network() -> String {
    "main".to_owned()
}

fn default_currency() -> String {
    "BTC".to_owned()
}

const fn default_strict_ssl() -> bool {
    true
}

impl CliConfig {
    /// Loads configuration from a file path.
    ///
    /// A missing file yields the defaults, which trust no keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = if path.exists() {
            std::fs::read_to_string(path)?
        } else {
            String::new()
        };
        Self::parse(&content)
    }

    /// Parses configuration from TOML text, expanding environment variables
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a trusted key is invalid.
    pub fn parse(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    /// Builds the HTTP client options.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured header name or value is invalid.
    pub fn client_options(&self) -> Result<ClientOptions, Box<dyn std::error::Error>> {
        let mut options = ClientOptions::new().with_tls_verification(self.strict_ssl);
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| format!("Invalid header name {name:?}: {e}"))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| format!("Invalid value for header {name}: {e}"))?;
            options = options.with_header(name, value);
        }
        if let Some(secs) = self.timeout_secs {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        Ok(options)
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment variables.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(dollar) = rest.find('$') {
        result.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        // (name, bytes the reference occupies after the `$`)
        let (name, len) = match after.strip_prefix('{') {
            Some(braced) => braced.find('}').map_or(("", 0), |end| (&braced[..end], end + 2)),
            None => {
                let end = after
                    .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };

        match Some(name).filter(|name| !name.is_empty()).and_then(&lookup) {
            Some(value) => {
                result.push_str(&value);
                rest = &after[len..];
            }
            None => {
                // Unresolved references are copied through untouched.
                result.push('$');
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
network = "test"
currency = "BTC"
strict_ssl = false
timeout_secs = 15

[headers]
x-partner = "${PARTNER}"

[trusted_keys.mh65MN7drqmwpCRZcEeBEE9ceQCQ95HtZc]
owner = "BitPay (TESTNET ONLY - DO NOT TRUST FOR ACTUAL BITCOIN)"
networks = ["test"]
domains = ["test.bitpay.com"]
publicKey = "03159069584176096f1c89763488b94dbc8d5e1fa7bf91f50b42f4befe4e45295a"
"#;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "PARTNER" => Some("acme".to_owned()),
            "HOME" => Some("/home/payer".to_owned()),
            _ => None,
        }
    }

    #[test]
    fn test_expansion() {
        assert_eq!(expand_with("${PARTNER}-$HOME/x", lookup), "acme-/home/payer/x");
        assert_eq!(expand_with("$UNSET and ${UNSET}", lookup), "$UNSET and ${UNSET}");
        assert_eq!(expand_with("cost: 5$", lookup), "cost: 5$");
        assert_eq!(expand_with("${PARTNER", lookup), "${PARTNER");
        assert_eq!(expand_with("$$PARTNER", lookup), "$acme");
    }

    #[test]
    fn test_parse_full_config() {
        let config: CliConfig = toml::from_str(&expand_with(CONFIG, lookup)).unwrap();
        assert_eq!(config.network, "test");
        assert!(!config.strict_ssl);
        assert_eq!(config.headers["x-partner"], "acme");

        let key = config
            .trusted_keys
            .get("mh65MN7drqmwpCRZcEeBEE9ceQCQ95HtZc")
            .unwrap();
        assert!(key.trusts_domain("test.bitpay.com"));
        assert!(key.trusts_network("test"));

        let options = config.client_options().unwrap();
        assert!(!options.verify_tls());
        assert_eq!(options.headers()["x-partner"], "acme");
        assert_eq!(options.timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_defaults() {
        let config = CliConfig::parse("").unwrap();
        assert_eq!(config.network, "main");
        assert_eq!(config.currency, "BTC");
        assert!(config.strict_ssl);
        assert!(config.trusted_keys.is_empty());
    }

    #[test]
    fn test_invalid_key_fails_to_load() {
        let err = CliConfig::parse(
            r#"
[trusted_keys.someone]
owner = "x"
publicKey = "02abcd"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("expected 33 bytes"));
    }

    #[test]
    fn test_invalid_header_is_reported() {
        let config = CliConfig::parse("[headers]\n\"bad header\" = \"x\"\n").unwrap();
        assert!(config.client_options().is_err());
    }
}
