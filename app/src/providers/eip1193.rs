//! [`InjectedProvider`] over any EIP-1193 `request({method, params})` transport.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    InjectedProvider, LiveProviderState, ProviderError, ProviderIdentity, ProviderResult,
    TransactionRequest,
};
use crate::blockchain::Address;
use crate::chain::{ChainId, TargetChain};
use crate::session::WalletKind;

const USER_REJECTED: i64 = 4001;
const UNAUTHORIZED: i64 = 4100;
const UNSUPPORTED_METHOD: i64 = 4200;
const DISCONNECTED: i64 = 4900;
const CHAIN_DISCONNECTED: i64 = 4901;
const UNRECOGNIZED_CHAIN: i64 = 4902;
const METHOD_NOT_FOUND: i64 = -32601;
const REQUEST_PENDING: i64 = -32002;

/// Error object a provider rejects a request with.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Some wallets wrap the real code in `data.originalError.code`.
    fn effective_code(&self) -> i64 {
        self.data
            .as_ref()
            .and_then(|data| data.get("originalError"))
            .and_then(|original| original.get("code"))
            .and_then(Value::as_i64)
            .unwrap_or(self.code)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// No provider object is injected into the page.
    NotInjected,
    Rpc(RpcErrorObject),
}

#[async_trait]
pub trait Eip1193Transport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError>;
}

pub struct Eip1193Provider<T> {
    transport: T,
    name: String,
}

impl<T: Eip1193Transport> Eip1193Provider<T> {
    pub fn new(transport: T, name: impl Into<String>) -> Self {
        Self {
            transport,
            name: name.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call(&self, method: &str, params: Value) -> ProviderResult<Value> {
        self.transport
            .request(method, params)
            .await
            .map_err(|err| classify(method, err))
    }

    async fn read_chain_id(&self) -> ProviderResult<ChainId> {
        let raw = self.call("eth_chainId", json!([])).await?;
        ChainId::from_json(&raw).map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    async fn first_account(&self, method: &str) -> ProviderResult<Option<Address>> {
        let raw = self.call(method, json!([])).await?;
        let accounts = raw
            .as_array()
            .ok_or_else(|| ProviderError::Malformed(format!("{} did not return a list", method)))?;

        match accounts.first() {
            None => Ok(None),
            Some(Value::String(account)) => Address::from_string(account)
                .map(Some)
                .map_err(|e| ProviderError::Malformed(e.to_string())),
            Some(other) => Err(ProviderError::Malformed(format!(
                "unexpected account entry {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl<T: Eip1193Transport> InjectedProvider for Eip1193Provider<T> {
    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity::new(WalletKind::InjectedProvider, self.name.clone())
    }

    async fn connect(&self) -> ProviderResult<LiveProviderState> {
        let address = self
            .first_account("eth_requestAccounts")
            .await?
            .ok_or_else(|| ProviderError::Unavailable("No accounts found".to_string()))?;
        let chain_id = self.read_chain_id().await?;
        Ok(LiveProviderState::authenticated(address, Some(chain_id)))
    }

    async fn silent_reconnect(&self) -> ProviderResult<LiveProviderState> {
        match self.first_account("eth_accounts").await? {
            Some(address) => {
                let chain_id = self.read_chain_id().await?;
                Ok(LiveProviderState::authenticated(address, Some(chain_id)))
            }
            None => Ok(LiveProviderState::signed_out()),
        }
    }

    async fn switch_chain(&self, chain_id: ChainId) -> ProviderResult<()> {
        self.call(
            "wallet_switchEthereumChain",
            json!([{ "chainId": chain_id.to_hex() }]),
        )
        .await
        .map(|_| ())
    }

    async fn add_chain(&self, chain: &TargetChain) -> ProviderResult<()> {
        self.call("wallet_addEthereumChain", json!([chain.add_chain_params()]))
            .await
            .map(|_| ())
    }

    async fn disconnect(&self) -> ProviderResult<()> {
        let result = self
            .transport
            .request(
                "wallet_revokePermissions",
                json!([{ "eth_accounts": {} }]),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            // Wallets without permission revocation keep the grant; local state is still cleared.
            Err(TransportError::Rpc(err))
                if matches!(err.code, UNSUPPORTED_METHOD | METHOD_NOT_FOUND) =>
            {
                log::debug!("{} does not support wallet_revokePermissions", self.name);
                Ok(())
            }
            Err(err) => Err(classify("wallet_revokePermissions", err)),
        }
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> ProviderResult<String> {
        let raw = self
            .call("eth_sendTransaction", json!([tx.to_json()]))
            .await?;
        raw.as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Malformed("transaction hash was not a string".into()))
    }
}

fn classify(method: &str, err: TransportError) -> ProviderError {
    let err = match err {
        TransportError::NotInjected => {
            return ProviderError::Unavailable(
                "Wallet is not installed or not accessible".to_string(),
            )
        }
        TransportError::Rpc(err) => err,
    };

    match err.effective_code() {
        USER_REJECTED => ProviderError::UserRejected(err.message),
        UNRECOGNIZED_CHAIN => ProviderError::UnrecognizedChain(err.message),
        UNAUTHORIZED | UNSUPPORTED_METHOD | DISCONNECTED | CHAIN_DISCONNECTED => {
            ProviderError::Unavailable(err.message)
        }
        REQUEST_PENDING => ProviderError::Unavailable(format!(
            "A {} request is already pending in the wallet",
            method
        )),
        code => ProviderError::Rpc {
            code,
            message: err.message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays canned answers and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        answers: Mutex<VecDeque<Result<Value, TransportError>>>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl ScriptedTransport {
        fn with(answers: Vec<Result<Value, TransportError>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                calls: Mutex::default(),
            }
        }

        fn methods(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
        }
    }

    #[async_trait]
    impl Eip1193Transport for ScriptedTransport {
        async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
            self.calls.lock().push((method.to_string(), params));
            self.answers
                .lock()
                .pop_front()
                .unwrap_or(Err(TransportError::NotInjected))
        }
    }

    const ACCOUNT: &str = "0x00000000000000000000000000000000000000d1";

    #[tokio::test]
    async fn connect_reads_account_and_chain() {
        let provider = Eip1193Provider::new(
            ScriptedTransport::with(vec![Ok(json!([ACCOUNT])), Ok(json!("0xab5"))]),
            "MetaMask",
        );
        let state = provider.connect().await.unwrap();
        assert!(state.is_authenticated);
        assert_eq!(state.address.unwrap().to_hex(), ACCOUNT);
        assert_eq!(state.chain_id, Some(ChainId::ABSTRACT));
        assert_eq!(
            provider.transport().methods(),
            vec!["eth_requestAccounts", "eth_chainId"]
        );
        assert_eq!(provider.identity().kind, WalletKind::InjectedProvider);
    }

    #[tokio::test]
    async fn connect_with_no_accounts_is_unavailable() {
        let provider =
            Eip1193Provider::new(ScriptedTransport::with(vec![Ok(json!([]))]), "MetaMask");
        assert!(matches!(
            provider.connect().await,
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn missing_provider_is_unavailable() {
        let provider = Eip1193Provider::new(ScriptedTransport::default(), "MetaMask");
        assert!(matches!(
            provider.connect().await,
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn garbage_payload_is_malformed() {
        let provider = Eip1193Provider::new(
            ScriptedTransport::with(vec![Ok(json!({"accounts": ACCOUNT}))]),
            "MetaMask",
        );
        assert!(matches!(
            provider.connect().await,
            Err(ProviderError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn rejection_codes_are_classified() {
        let provider = Eip1193Provider::new(
            ScriptedTransport::with(vec![
                Err(TransportError::Rpc(RpcErrorObject::new(4001, "User rejected"))),
                Err(TransportError::Rpc(RpcErrorObject::new(4902, "Unrecognized chain"))),
                Err(TransportError::Rpc(RpcErrorObject {
                    code: -32603,
                    message: "Internal error".into(),
                    data: Some(json!({"originalError": {"code": 4902}})),
                })),
            ]),
            "MetaMask",
        );
        assert!(matches!(
            provider.connect().await,
            Err(ProviderError::UserRejected(_))
        ));
        assert!(matches!(
            provider.switch_chain(ChainId::ABSTRACT).await,
            Err(ProviderError::UnrecognizedChain(_))
        ));
        assert!(matches!(
            provider.switch_chain(ChainId::ABSTRACT).await,
            Err(ProviderError::UnrecognizedChain(_))
        ));
    }

    #[tokio::test]
    async fn switch_and_add_send_hex_chain_params() {
        let provider = Eip1193Provider::new(
            ScriptedTransport::with(vec![Ok(Value::Null), Ok(Value::Null)]),
            "MetaMask",
        );
        provider.switch_chain(ChainId::ABSTRACT).await.unwrap();
        provider
            .add_chain(&TargetChain::abstract_mainnet())
            .await
            .unwrap();
        let calls = provider.transport().calls.lock().clone();
        assert_eq!(calls[0].1, json!([{ "chainId": "0xab5" }]));
        assert_eq!(calls[1].0, "wallet_addEthereumChain");
        assert_eq!(calls[1].1[0]["chainName"], "Abstract");
    }

    #[tokio::test]
    async fn silent_reconnect_without_accounts_is_signed_out() {
        let provider =
            Eip1193Provider::new(ScriptedTransport::with(vec![Ok(json!([]))]), "MetaMask");
        let state = provider.silent_reconnect().await.unwrap();
        assert!(!state.is_authenticated);
        assert_eq!(provider.transport().methods(), vec!["eth_accounts"]);
    }

    #[tokio::test]
    async fn disconnect_tolerates_missing_revoke_support() {
        let provider = Eip1193Provider::new(
            ScriptedTransport::with(vec![Err(TransportError::Rpc(RpcErrorObject::new(
                -32601,
                "method not found",
            )))]),
            "MetaMask",
        );
        provider.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn send_transaction_returns_hash() {
        let provider = Eip1193Provider::new(
            ScriptedTransport::with(vec![Ok(json!("0xfeed"))]),
            "MetaMask",
        );
        let tx = TransactionRequest {
            from: Address::from_string(ACCOUNT).unwrap(),
            to: Address::ZERO,
            value: crate::blockchain::Amount::from_wei(1),
            data: vec![],
        };
        assert_eq!(provider.send_transaction(&tx).await.unwrap(), "0xfeed");
    }
}
