use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::rpc::connector::endpoint_label;
use crate::rpc::{parse_rpc_urls, ChainEndpoint};
use crate::scanner::ScanPolicy;
use crate::types::ChainRole;

/// Upper bound for a role's scan window
pub const MAX_SCAN_WINDOW: u64 = 10_000;

/// Main configuration for the warden
#[derive(Clone)]
pub struct Config {
    /// External contract metadata store
    pub contract_info_path: PathBuf,
    pub source: ChainConfig,
    pub destination: ChainConfig,
    pub scan_tail_blocks: u64,
    pub relay_gas_limit: u64,
    pub rpc_timeout_ms: u64,
    pub metrics_textfile: Option<PathBuf>,
    warden_private_key: String,
}

/// Custom Debug that redacts the warden key.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("contract_info_path", &self.contract_info_path)
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("scan_tail_blocks", &self.scan_tail_blocks)
            .field("relay_gas_limit", &self.relay_gas_limit)
            .field("rpc_timeout_ms", &self.rpc_timeout_ms)
            .field("metrics_textfile", &self.metrics_textfile)
            .field("warden_private_key", &"<redacted>")
            .finish()
    }
}

/// Per-chain configuration
#[derive(Clone)]
pub struct ChainConfig {
    pub role: ChainRole,
    /// Primary first, then fallbacks
    pub rpc_urls: Vec<String>,
    pub scan_window: u64,
    pub poa_compat: bool,
}

/// Custom Debug that shows RPC hosts only (URL paths often embed API keys).
impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let urls: Vec<String> = self.rpc_urls.iter().map(|u| endpoint_label(u)).collect();
        f.debug_struct("ChainConfig")
            .field("role", &self.role)
            .field("rpc_urls", &urls)
            .field("scan_window", &self.scan_window)
            .field("poa_compat", &self.poa_compat)
            .finish()
    }
}

impl ChainConfig {
    pub fn endpoint(&self) -> ChainEndpoint {
        ChainEndpoint::new(self.rpc_urls.clone(), self.poa_compat)
    }

    pub fn scan_policy(&self, tail_blocks: u64) -> ScanPolicy {
        ScanPolicy {
            window_blocks: self.scan_window,
            tail_blocks,
        }
    }

    fn env_prefix(role: ChainRole) -> &'static str {
        match role {
            ChainRole::Source => "SOURCE",
            ChainRole::Destination => "DESTINATION",
        }
    }

    fn load_from_env(role: ChainRole) -> Result<Self> {
        let prefix = Self::env_prefix(role);
        let rpc_var = format!("{}_RPC_URL", prefix);

        let raw_urls = env::var(&rpc_var).unwrap_or_else(|_| default_rpc_url(role).to_string());
        let rpc_urls = parse_rpc_urls(&raw_urls);
        if rpc_urls.is_empty() {
            return Err(eyre!("{} cannot be empty", rpc_var));
        }

        Ok(Self {
            role,
            rpc_urls,
            scan_window: env_or(&format!("{}_SCAN_WINDOW", prefix), default_scan_window())?,
            poa_compat: env_bool(&format!("{}_POA_COMPAT", prefix), true)?,
        })
    }
}

/// Default functions
fn default_rpc_url(role: ChainRole) -> &'static str {
    match role {
        // Avalanche Fuji C-chain
        ChainRole::Source => "https://api.avax-test.network/ext/bc/C/rpc",
        // BSC testnet
        ChainRole::Destination => "https://data-seed-prebsc-1-s1.binance.org:8545/",
    }
}

fn default_contract_info_path() -> PathBuf {
    PathBuf::from("contract_info.json")
}

fn default_scan_window() -> u64 {
    crate::scanner::DEFAULT_WINDOW_BLOCKS
}

fn default_scan_tail_blocks() -> u64 {
    crate::scanner::DEFAULT_TAIL_BLOCKS
}

fn default_relay_gas_limit() -> u64 {
    crate::dispatcher::DEFAULT_GAS_LIMIT
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

/// Parse `name` if set, otherwise use `default`
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| eyre!("{} is invalid: {}", name, e)),
        Err(_) => Ok(default),
    }
}

fn env_bool(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(eyre!("{} must be a boolean, got '{}'", name, other)),
        },
        Err(_) => Ok(default),
    }
}

/// Accepts the key with or without 0x
fn normalize_key(raw: &str) -> String {
    let key = raw.trim();
    if key.starts_with("0x") || key.starts_with("0X") {
        format!("0x{}", &key[2..])
    } else {
        format!("0x{}", key)
    }
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let key_sources = (env::var("WARDEN_PRIVATE_KEY"), env::var("WARDEN_KEY_FILE"));
        let warden_private_key = match key_sources {
            (Ok(key), _) => normalize_key(&key),
            (Err(_), Ok(path)) => {
                let key = std::fs::read_to_string(&path)
                    .wrap_err_with(|| format!("Failed to read WARDEN_KEY_FILE {}", path))?;
                normalize_key(&key)
            }
            (Err(_), Err(_)) => {
                return Err(eyre!(
                    "WARDEN_PRIVATE_KEY or WARDEN_KEY_FILE environment variable is required"
                ))
            }
        };

        let config = Config {
            contract_info_path: env::var("CONTRACT_INFO_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_contract_info_path()),
            source: ChainConfig::load_from_env(ChainRole::Source)?,
            destination: ChainConfig::load_from_env(ChainRole::Destination)?,
            scan_tail_blocks: env_or("SCAN_TAIL_BLOCKS", default_scan_tail_blocks())?,
            relay_gas_limit: env_or("RELAY_GAS_LIMIT", default_relay_gas_limit())?,
            rpc_timeout_ms: env_or("RPC_TIMEOUT_MS", default_rpc_timeout_ms())?,
            metrics_textfile: env::var("METRICS_TEXTFILE")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            warden_private_key,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn warden_private_key(&self) -> &str {
        &self.warden_private_key
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let key = &self.warden_private_key;
        if key.len() != 66 || hex::decode(&key[2..]).is_err() {
            return Err(eyre!("warden private key must be 66 chars (0x + 64 hex chars)"));
        }

        for chain in [&self.source, &self.destination] {
            if chain.rpc_urls.is_empty() {
                return Err(eyre!("{} RPC URL cannot be empty", chain.role));
            }
            if chain.scan_window > MAX_SCAN_WINDOW {
                return Err(eyre!(
                    "{} scan window {} exceeds maximum {}",
                    chain.role,
                    chain.scan_window,
                    MAX_SCAN_WINDOW
                ));
            }
        }

        if self.scan_tail_blocks == 0 {
            return Err(eyre!("SCAN_TAIL_BLOCKS must be at least 1"));
        }

        if self.relay_gas_limit < 21_000 {
            return Err(eyre!("RELAY_GAS_LIMIT must be at least 21000"));
        }

        if self.rpc_timeout_ms == 0 {
            return Err(eyre!("RPC_TIMEOUT_MS must be greater than 0"));
        }

        if self.contract_info_path.as_os_str().is_empty() {
            return Err(eyre!("CONTRACT_INFO_PATH cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TEST_PRIVATE_KEY;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "CONTRACT_INFO_PATH",
        "SOURCE_RPC_URL",
        "DESTINATION_RPC_URL",
        "SOURCE_SCAN_WINDOW",
        "DESTINATION_SCAN_WINDOW",
        "SCAN_TAIL_BLOCKS",
        "SOURCE_POA_COMPAT",
        "DESTINATION_POA_COMPAT",
        "WARDEN_PRIVATE_KEY",
        "WARDEN_KEY_FILE",
        "RELAY_GAS_LIMIT",
        "RPC_TIMEOUT_MS",
        "METRICS_TEXTFILE",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn test_config() -> Config {
        Config {
            contract_info_path: default_contract_info_path(),
            source: ChainConfig {
                role: ChainRole::Source,
                rpc_urls: vec!["http://localhost:8545".to_string()],
                scan_window: 20,
                poa_compat: true,
            },
            destination: ChainConfig {
                role: ChainRole::Destination,
                rpc_urls: vec!["http://localhost:8546".to_string()],
                scan_window: 20,
                poa_compat: true,
            },
            scan_tail_blocks: 5,
            relay_gas_limit: 300_000,
            rpc_timeout_ms: 10_000,
            metrics_textfile: None,
            warden_private_key: TEST_PRIVATE_KEY.to_string(),
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(default_scan_window(), 20);
        assert_eq!(default_scan_tail_blocks(), 5);
        assert_eq!(default_relay_gas_limit(), 300_000);
        assert_eq!(default_rpc_timeout_ms(), 10_000);
        assert_eq!(default_contract_info_path(), PathBuf::from("contract_info.json"));
    }

    #[test]
    fn test_validation() {
        let mut config = test_config();
        assert!(config.validate().is_ok());

        config.warden_private_key = "0x123".to_string();
        assert!(config.validate().is_err());

        config.warden_private_key = format!("0x{}", "zz".repeat(32));
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.source.scan_window = MAX_SCAN_WINDOW + 1;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.destination.rpc_urls.clear();
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.scan_tail_blocks = 0;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.relay_gas_limit = 20_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = test_config();
        config.source.rpc_urls = vec!["https://avax.example.com/ext/secret-api-key".to_string()];
        let debug = format!("{:?}", config);
        assert!(!debug.contains(&TEST_PRIVATE_KEY[2..]));
        assert!(!debug.contains("secret-api-key"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("avax.example.com"));
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(" abcd\n"), "0xabcd");
        assert_eq!(normalize_key("0xabcd"), "0xabcd");
        assert_eq!(normalize_key("0Xabcd"), "0xabcd");
    }

    #[test]
    #[serial]
    fn test_load_from_env_defaults() {
        clear_env();
        env::set_var("WARDEN_PRIVATE_KEY", TEST_PRIVATE_KEY);

        let config = Config::load_from_env().unwrap();
        assert_eq!(config.contract_info_path, PathBuf::from("contract_info.json"));
        assert_eq!(
            config.source.rpc_urls,
            vec!["https://api.avax-test.network/ext/bc/C/rpc"]
        );
        assert_eq!(
            config.destination.rpc_urls,
            vec!["https://data-seed-prebsc-1-s1.binance.org:8545/"]
        );
        assert_eq!(config.source.scan_window, 20);
        assert!(config.source.poa_compat);
        assert!(config.destination.poa_compat);
        assert_eq!(config.scan_tail_blocks, 5);
        assert_eq!(config.relay_gas_limit, 300_000);
        assert_eq!(config.metrics_textfile, None);
        assert_eq!(config.warden_private_key(), TEST_PRIVATE_KEY);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_from_env_overrides() {
        clear_env();
        env::set_var("WARDEN_PRIVATE_KEY", &TEST_PRIVATE_KEY[2..]);
        env::set_var("SOURCE_RPC_URL", "http://a:8545, http://b:8545");
        env::set_var("DESTINATION_SCAN_WINDOW", "100");
        env::set_var("DESTINATION_POA_COMPAT", "false");
        env::set_var("RELAY_GAS_LIMIT", "250000");
        env::set_var("METRICS_TEXTFILE", "/tmp/warden.prom");

        let config = Config::load_from_env().unwrap();
        assert_eq!(config.source.rpc_urls, vec!["http://a:8545", "http://b:8545"]);
        assert_eq!(config.destination.scan_window, 100);
        assert!(!config.destination.poa_compat);
        assert_eq!(config.relay_gas_limit, 250_000);
        assert_eq!(config.metrics_textfile, Some(PathBuf::from("/tmp/warden.prom")));
        assert_eq!(config.warden_private_key(), TEST_PRIVATE_KEY);

        let policy = config.destination.scan_policy(config.scan_tail_blocks);
        assert_eq!(policy.window_blocks, 100);
        assert_eq!(policy.tail_blocks, 5);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_key_is_error() {
        clear_env();
        let err = Config::load_from_env().unwrap_err();
        assert!(err.to_string().contains("WARDEN_PRIVATE_KEY"));
    }

    #[test]
    #[serial]
    fn test_key_file() {
        clear_env();
        let path = env::temp_dir().join(format!("warden-key-{}", std::process::id()));
        std::fs::write(&path, format!("{}\n", &TEST_PRIVATE_KEY[2..])).unwrap();
        env::set_var("WARDEN_KEY_FILE", &path);

        let config = Config::load_from_env().unwrap();
        assert_eq!(config.warden_private_key(), TEST_PRIVATE_KEY);

        std::fs::remove_file(&path).ok();
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_errors() {
        clear_env();
        env::set_var("WARDEN_PRIVATE_KEY", TEST_PRIVATE_KEY);

        env::set_var("SOURCE_SCAN_WINDOW", "twenty");
        assert!(Config::load_from_env().is_err());
        env::remove_var("SOURCE_SCAN_WINDOW");

        env::set_var("SOURCE_POA_COMPAT", "maybe");
        assert!(Config::load_from_env().is_err());
        env::remove_var("SOURCE_POA_COMPAT");

        env::set_var("DESTINATION_RPC_URL", " , ");
        assert!(Config::load_from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_from_dotenv_file() {
        clear_env();
        let path = env::temp_dir().join(format!("warden-test-{}.env", std::process::id()));
        std::fs::write(
            &path,
            format!(
                "WARDEN_PRIVATE_KEY={}\nCONTRACT_INFO_PATH=/etc/warden/contracts.json\n",
                TEST_PRIVATE_KEY
            ),
        )
        .unwrap();

        let config = Config::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(
            config.contract_info_path,
            PathBuf::from("/etc/warden/contracts.json")
        );

        std::fs::remove_file(&path).ok();
        clear_env();
    }
}
