use serde::{Deserialize, Serialize};
use std::fmt;

use crate::blockchain::Address;

/// Which wallet source authenticated the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WalletKind {
    #[default]
    None,
    /// Browser-extension wallet reached through the injected request/event interface.
    InjectedProvider,
    /// Smart-contract account wallet reached through the vendor SDK; bound to the target chain.
    EmbeddedWalletSdk,
}

impl WalletKind {
    /// Value written to the persisted `walletType` field.
    pub fn storage_tag(self) -> Option<&'static str> {
        match self {
            WalletKind::None => None,
            WalletKind::InjectedProvider => Some("metamask"),
            WalletKind::EmbeddedWalletSdk => Some("abstract"),
        }
    }

    /// Inverse of [`WalletKind::storage_tag`]; `None` for tags this build does not know.
    pub fn from_storage_tag(tag: Option<&str>) -> Option<Self> {
        match tag.map(|t| t.trim().to_ascii_lowercase()) {
            None => Some(WalletKind::None),
            Some(tag) => match tag.as_str() {
                "metamask" | "injected" => Some(WalletKind::InjectedProvider),
                "abstract" => Some(WalletKind::EmbeddedWalletSdk),
                _ => None,
            },
        }
    }

    pub fn is_none(self) -> bool {
        self == WalletKind::None
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WalletKind::None => "none",
            WalletKind::InjectedProvider => "injected provider",
            WalletKind::EmbeddedWalletSdk => "embedded wallet",
        };
        f.write_str(label)
    }
}

/// The one application-level view of the wallet connection.
///
/// `address` is present exactly when `wallet_kind` is not `None`; the
/// constructors are the only way to change the pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedSession {
    wallet_kind: WalletKind,
    address: Option<Address>,
    is_on_required_network: bool,
    is_busy: bool,
    last_error: Option<String>,
}

impl UnifiedSession {
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// A connected session. Embedded-wallet sessions are always on the required network.
    pub fn connected(kind: WalletKind, address: Address, on_required_network: bool) -> Self {
        match kind {
            WalletKind::None => Self::disconnected(),
            WalletKind::EmbeddedWalletSdk => Self {
                wallet_kind: kind,
                address: Some(address),
                is_on_required_network: true,
                ..Self::default()
            },
            WalletKind::InjectedProvider => Self {
                wallet_kind: kind,
                address: Some(address),
                is_on_required_network: on_required_network,
                ..Self::default()
            },
        }
    }

    pub fn wallet_kind(&self) -> WalletKind {
        self.wallet_kind
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn is_on_required_network(&self) -> bool {
        self.is_on_required_network
    }

    pub fn is_busy(&self) -> bool {
        self.is_busy
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        !self.wallet_kind.is_none()
    }

    /// Connected and able to transact on the target chain.
    pub fn is_ready(&self) -> bool {
        self.is_connected() && self.is_on_required_network
    }

    /// Same connection identity, ignoring the transient busy/error fields.
    pub fn same_connection(&self, other: &UnifiedSession) -> bool {
        self.wallet_kind == other.wallet_kind
            && self.address == other.address
            && self.is_on_required_network == other.is_on_required_network
    }

    /// Replace the connection fields as one group, keeping busy/error state.
    pub(crate) fn replace_connection(&mut self, next: UnifiedSession) {
        self.wallet_kind = next.wallet_kind;
        self.address = next.address;
        self.is_on_required_network = next.is_on_required_network;
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.is_busy = busy;
    }

    pub(crate) fn set_last_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::from_string("0x00000000000000000000000000000000000000b1").unwrap()
    }

    #[test]
    fn storage_tags_round_trip() {
        for kind in [
            WalletKind::None,
            WalletKind::InjectedProvider,
            WalletKind::EmbeddedWalletSdk,
        ] {
            assert_eq!(WalletKind::from_storage_tag(kind.storage_tag()), Some(kind));
        }
        assert_eq!(
            WalletKind::from_storage_tag(Some("MetaMask")),
            Some(WalletKind::InjectedProvider)
        );
        assert_eq!(WalletKind::from_storage_tag(Some("coinbase")), None);
    }

    #[test]
    fn embedded_sessions_are_always_on_network() {
        let session = UnifiedSession::connected(WalletKind::EmbeddedWalletSdk, addr(), false);
        assert!(session.is_on_required_network());
        assert!(session.is_ready());
    }

    #[test]
    fn none_kind_never_carries_an_address() {
        let session = UnifiedSession::connected(WalletKind::None, addr(), true);
        assert_eq!(session, UnifiedSession::disconnected());
        assert!(session.address().is_none());
        assert!(!session.is_on_required_network());
    }

    #[test]
    fn replace_connection_keeps_transient_fields() {
        let mut session = UnifiedSession::disconnected();
        session.set_busy(true);
        session.set_last_error(Some("boom".into()));
        session.replace_connection(UnifiedSession::connected(
            WalletKind::InjectedProvider,
            addr(),
            false,
        ));
        assert!(session.is_busy());
        assert_eq!(session.last_error(), Some("boom"));
        assert_eq!(session.wallet_kind(), WalletKind::InjectedProvider);
        assert!(!session.is_ready());
    }

    #[test]
    fn serializes_camel_case() {
        let session = UnifiedSession::connected(WalletKind::InjectedProvider, addr(), true);
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["walletKind"], "InjectedProvider");
        assert_eq!(json["isOnRequiredNetwork"], true);
        assert_eq!(
            json["address"],
            "0x00000000000000000000000000000000000000b1"
        );
    }
}
