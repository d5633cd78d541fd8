//! Configuration for the claim workflow.
//!
//! Values are loaded from environment variables with defaults and handed to
//! components at construction time; nothing reads configuration globally.

use std::time::Duration;

use zeroize::Zeroizing;

/// Default deadline for a single ledger, publisher or chain call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Gas ceiling for `safeMint` (observed cost is around 170k units).
pub const DEFAULT_MINT_GAS_LIMIT: u64 = 300_000;

/// EIP-712 domain fields the claim signature is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainConfig {
    pub name: String,
    pub version: String,
    /// Handed to wallets in the signing payload, never hashed into the separator.
    pub salt: String,
    pub chain_id: u64,
    pub verifying_contract: String,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            name: "Engage".to_string(),
            version: "1".to_string(),
            salt: String::new(),
            chain_id: 137,
            verifying_contract: "0x0000000000000000000000000000000000000000".to_string(),
        }
    }
}

impl DomainConfig {
    /// Load domain settings from the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: std::env::var("EIP712_NAME").unwrap_or(defaults.name),
            version: std::env::var("EIP712_VERSION").unwrap_or(defaults.version),
            salt: std::env::var("EIP712_SALT").unwrap_or(defaults.salt),
            chain_id: env_parse("CHAIN_ID").unwrap_or(defaults.chain_id),
            verifying_contract: std::env::var("NFT_VERIFYING_CONTRACT")
                .unwrap_or(defaults.verifying_contract),
        }
    }
}

/// Chain node and minting settings.
#[derive(Clone)]
pub struct ChainConfig {
    /// JSON-RPC endpoint of the chain node.
    pub rpc_url: String,
    /// NFT contract (proxy) address: mint calls go here and events come from here.
    pub contract_address: String,
    /// Hex-encoded broker private key that signs and pays for mints.
    pub broker_private_key: Option<Zeroizing<String>>,
    pub gas_limit: u64,
    pub timeout: Duration,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: "0x0000000000000000000000000000000000000000".to_string(),
            broker_private_key: None,
            gas_limit: DEFAULT_MINT_GAS_LIMIT,
            timeout: Duration::from_secs(10),
        }
    }
}

impl std::fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field(
                "broker_private_key",
                &self.broker_private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("gas_limit", &self.gas_limit)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ChainConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rpc_url: std::env::var("CHAIN_RPC_URL").unwrap_or(defaults.rpc_url),
            contract_address: std::env::var("NFT_CONTRACT_ADDRESS")
                .unwrap_or(defaults.contract_address),
            broker_private_key: std::env::var("BROKER_PRIVATE_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .map(Zeroizing::new),
            gas_limit: env_parse("MINT_GAS_LIMIT").unwrap_or(defaults.gas_limit),
            timeout: env_parse("CHAIN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// IPFS HTTP API settings for metadata uploads.
#[derive(Clone)]
pub struct IpfsConfig {
    pub api_endpoint: String,
    pub project_key: Option<String>,
    pub project_secret: Option<Zeroizing<String>>,
    pub timeout: Duration,
    /// Extra attempts after a connection failure. Zero means a single attempt.
    pub connect_retries: u32,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://ipfs.infura.io:5001".to_string(),
            project_key: None,
            project_secret: None,
            timeout: Duration::from_secs(10),
            connect_retries: 0,
        }
    }
}

impl std::fmt::Debug for IpfsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpfsConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("project_key", &self.project_key)
            .field(
                "project_secret",
                &self.project_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .field("connect_retries", &self.connect_retries)
            .finish()
    }
}

impl IpfsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_endpoint: std::env::var("IPFS_API_ENDPOINT").unwrap_or(defaults.api_endpoint),
            project_key: std::env::var("IPFS_PROJECT_KEY").ok().filter(|k| !k.is_empty()),
            project_secret: std::env::var("IPFS_PROJECT_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .map(Zeroizing::new),
            timeout: env_parse("IPFS_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            connect_retries: env_parse("IPFS_CONNECT_RETRIES").unwrap_or(defaults.connect_retries),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct EngageConfig {
    pub domain: DomainConfig,
    pub chain: ChainConfig,
    pub ipfs: IpfsConfig,
    /// Deadline applied to every collaborator call in the orchestrator.
    pub call_timeout: Duration,
}

impl Default for EngageConfig {
    fn default() -> Self {
        Self {
            domain: DomainConfig::default(),
            chain: ChainConfig::default(),
            ipfs: IpfsConfig::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl EngageConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            domain: DomainConfig::from_env(),
            chain: ChainConfig::from_env(),
            ipfs: IpfsConfig::from_env(),
            call_timeout: env_parse("CALL_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CALL_TIMEOUT),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
