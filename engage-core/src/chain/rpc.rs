//! EVM JSON-RPC chain client.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::abi::encode_safe_mint;
use super::tx::LegacyTransaction;
use super::{
    parse_quantity, parse_word, ChainError, ChainMinter, MintSubmission, ReceiptLog,
    TransactionReceipt, TxOptions,
};
use crate::address::Address;
use crate::broker::BrokerKey;
use crate::category::CategoryId;
use crate::config::ChainConfig;

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RawReceipt {
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

#[derive(Deserialize)]
struct RawLog {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
}

impl TryFrom<RawReceipt> for TransactionReceipt {
    type Error = ChainError;

    fn try_from(raw: RawReceipt) -> Result<Self, Self::Error> {
        let status = match raw.status {
            Some(s) => u64::try_from(parse_quantity(&s)?)
                .map_err(|_| ChainError::Decode(format!("receipt status out of range: {s}")))?,
            None => 0,
        };

        let logs = raw
            .logs
            .into_iter()
            .map(|log| {
                let address = log
                    .address
                    .parse()
                    .map_err(|e| ChainError::Decode(format!("log address: {e}")))?;
                let topics = log
                    .topics
                    .iter()
                    .map(|t| parse_word(t))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ReceiptLog { address, topics })
            })
            .collect::<Result<Vec<_>, ChainError>>()?;

        Ok(Self { status, logs })
    }
}

/// Talks to a node over HTTP JSON-RPC and signs mints with the broker key.
pub struct JsonRpcChain {
    client: Client,
    url: String,
    contract: Address,
    broker: BrokerKey,
    chain_id: OnceCell<u64>,
    next_id: AtomicU64,
}

impl JsonRpcChain {
    pub fn new(config: &ChainConfig) -> Result<Self, ChainError> {
        let key = config
            .broker_private_key
            .as_ref()
            .ok_or_else(|| ChainError::Config("BROKER_PRIVATE_KEY is not set".into()))?;
        let broker =
            BrokerKey::from_hex(key).map_err(|e| ChainError::Config(e.to_string()))?;
        Self::with_broker(config, broker)
    }

    /// Build a client for read-only use or with an explicit broker key.
    pub fn with_broker(config: &ChainConfig, broker: BrokerKey) -> Result<Self, ChainError> {
        let contract = config
            .contract_address
            .parse()
            .map_err(|e| ChainError::Config(format!("NFT_CONTRACT_ADDRESS: {e}")))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChainError::Config(format!("Failed to create HTTP client: {e}")))?;

        info!(broker = %broker.address(), contract = %contract, "Chain client ready");

        Ok(Self {
            client,
            url: config.rpc_url.clone(),
            contract,
            broker,
            chain_id: OnceCell::new(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Transport(format!("{method} returned HTTP {status}")));
        }

        let parsed: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| ChainError::Decode(format!("{method}: {e}")))?;

        if let Some(err) = parsed.error {
            warn!(method, code = err.code, message = %err.message, "RPC error");
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(parsed.result)
    }

    async fn call_quantity(&self, method: &str, params: Value) -> Result<u128, ChainError> {
        let value: String = self
            .call(method, params)
            .await?
            .ok_or_else(|| ChainError::Decode(format!("{method}: empty result")))?;
        parse_quantity(&value)
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.chain_id
            .get_or_try_init(|| async {
                let id = self.call_quantity("eth_chainId", json!([])).await?;
                u64::try_from(id).map_err(|_| ChainError::Decode("chain id out of range".into()))
            })
            .await
            .copied()
    }
}

#[async_trait]
impl ChainMinter for JsonRpcChain {
    fn broker_address(&self) -> Address {
        self.broker.address()
    }

    fn contract_address(&self) -> Address {
        self.contract
    }

    async fn pending_nonce(&self, account: Address) -> Result<u64, ChainError> {
        let nonce = self
            .call_quantity(
                "eth_getTransactionCount",
                json!([account.to_lower_hex(), "pending"]),
            )
            .await?;
        u64::try_from(nonce).map_err(|_| ChainError::Decode("nonce out of range".into()))
    }

    async fn suggested_gas_price(&self) -> Result<u64, ChainError> {
        let price = self.call_quantity("eth_gasPrice", json!([])).await?;
        u64::try_from(price).map_err(|_| ChainError::Decode("gas price out of range".into()))
    }

    #[instrument(skip_all, fields(recipient = %recipient, nonce = opts.nonce))]
    async fn mint(
        &self,
        opts: &TxOptions,
        recipient: Address,
        token_uri: &str,
        category_id: CategoryId,
    ) -> Result<MintSubmission, ChainError> {
        if opts.from != self.broker.address() {
            return Err(ChainError::Signing(format!(
                "sender {} is not the broker account",
                opts.from
            )));
        }

        let chain_id = self.chain_id().await?;
        let tx = LegacyTransaction {
            nonce: opts.nonce,
            gas_price: opts.gas_price,
            gas_limit: opts.gas_limit,
            to: self.contract,
            value: opts.value,
            data: encode_safe_mint(recipient, token_uri, category_id),
        };
        let signed = tx
            .sign(&self.broker, chain_id)
            .map_err(|e| ChainError::Signing(e.to_string()))?;

        let returned: Option<String> = self
            .call("eth_sendRawTransaction", json!([signed.raw_hex()]))
            .await?;

        let tx_hash = signed.hash_hex();
        if let Some(node_hash) = returned.filter(|h| !h.eq_ignore_ascii_case(&tx_hash)) {
            warn!(local = %tx_hash, node = %node_hash, "Node reported a different transaction hash");
        }
        debug!(tx_hash = %tx_hash, "Mint transaction submitted");

        Ok(MintSubmission {
            tx_hash,
            gas_price: opts.gas_price,
        })
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        let raw: Option<RawReceipt> = self
            .call("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        raw.map(TransactionReceipt::try_from).transpose()
    }

    async fn balance(&self, account: Address) -> Result<u128, ChainError> {
        self.call_quantity("eth_getBalance", json!([account.to_lower_hex(), "latest"]))
            .await
    }
}
