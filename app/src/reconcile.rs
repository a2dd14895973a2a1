//! Merges the persisted intent and both live wallet sources into one session.
//!
//! [`decide`] is pure: the coordinator feeds it a snapshot of everything it
//! knows and applies the returned [`Decision`]. Precedence:
//!
//! 1. An authenticated embedded wallet wins, and is always on the target chain.
//! 2. Otherwise an authenticated injected provider is used, unless the user
//!    explicitly chose the embedded wallet during this page lifetime.
//! 3. Otherwise a record left by the previous page lifetime earns exactly one
//!    silent reconnection attempt against the matching source.

use crate::blockchain::Address;
use crate::chain::TargetChain;
use crate::connection_store::ConnectionRecord;
use crate::providers::LiveProviderState;
use crate::session::{UnifiedSession, WalletKind};

#[derive(Debug, Clone, Copy)]
pub struct ReconcileInputs<'a> {
    pub injected: &'a LiveProviderState,
    pub embedded: &'a LiveProviderState,
    pub startup_record: Option<&'a ConnectionRecord>,
    /// The wallet kind the user picked through `connect` in this page lifetime.
    pub explicit_choice: Option<WalletKind>,
    pub explicit_disconnect: bool,
    pub reconnect_attempted: bool,
    pub target: &'a TargetChain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Embedded { address: Address },
    Injected { address: Address, on_required_network: bool },
    /// A passive injected detection must not override the user's embedded-wallet choice.
    Retain,
    /// Try the one-shot silent reconnection for this source.
    Reconnect(WalletKind),
    Disconnected,
}

impl Decision {
    /// Session the decision resolves to, or `None` when the current one is kept.
    pub fn session(&self) -> Option<UnifiedSession> {
        match self {
            Decision::Embedded { address } => Some(UnifiedSession::connected(
                WalletKind::EmbeddedWalletSdk,
                *address,
                true,
            )),
            Decision::Injected {
                address,
                on_required_network,
            } => Some(UnifiedSession::connected(
                WalletKind::InjectedProvider,
                *address,
                *on_required_network,
            )),
            Decision::Disconnected => Some(UnifiedSession::disconnected()),
            Decision::Retain | Decision::Reconnect(_) => None,
        }
    }
}

pub fn decide(inputs: &ReconcileInputs<'_>) -> Decision {
    if let Some(address) = inputs.embedded.authenticated_address() {
        return Decision::Embedded { address };
    }

    if let Some(address) = inputs.injected.authenticated_address() {
        if inputs.explicit_choice == Some(WalletKind::EmbeddedWalletSdk) {
            return Decision::Retain;
        }
        return Decision::Injected {
            address,
            on_required_network: inputs.target.matches(inputs.injected.chain_id),
        };
    }

    if !inputs.explicit_disconnect && !inputs.reconnect_attempted {
        if let Some(record) = inputs.startup_record {
            if !record.wallet_kind().is_none() {
                return Decision::Reconnect(record.wallet_kind());
            }
        }
    }

    Decision::Disconnected
}
