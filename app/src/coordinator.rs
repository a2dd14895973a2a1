//! The wallet session coordinator.
//!
//! Owns the single [`UnifiedSession`] of the application, reconciles it with
//! both wallet sources and the persisted record, and runs the user-facing
//! connect / disconnect / network-switch actions.
//!
//! State lives behind one mutex that is never held across an `await`. Provider
//! calls run unlocked; their results are applied only if no disconnect or
//! teardown happened meanwhile (tracked by `epoch`). One action runs at a
//! time: a second action while `is_busy` is set is skipped, not queued.
//! Disconnect is the exception and always runs.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use crate::blockchain::{Address, Amount};
use crate::chain::TargetChain;
use crate::connection_store::{ConnectionRecord, ConnectionStore};
use crate::errors::{WalletError, WalletResult};
use crate::notices::Notice;
use crate::providers::{
    EmbeddedWallet, InjectedProvider, LiveProviderState, ProviderError, TransactionRequest,
};
use crate::reconcile::{decide, Decision, ReconcileInputs};
use crate::session::{UnifiedSession, WalletKind};

const NOTICE_CAPACITY: usize = 32;

/// Result of a coordinator action. Failures have already been recorded in
/// `last_error` and announced as a [`Notice`].
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// Another action was in flight; nothing was done.
    Skipped,
    /// A disconnect or teardown happened while the action was in flight; its result was dropped.
    Superseded,
    Failed(WalletError),
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed)
    }

    pub fn error(&self) -> Option<&WalletError> {
        match self {
            ActionOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct CoordinatorState {
    session: UnifiedSession,
    injected: LiveProviderState,
    embedded: LiveProviderState,
    startup_record: Option<ConnectionRecord>,
    explicit_choice: Option<WalletKind>,
    explicit_disconnect: bool,
    reconnect_attempted: bool,
    epoch: u64,
    next_op: u64,
    busy_op: Option<u64>,
}

impl CoordinatorState {
    fn claim_busy(&mut self) -> u64 {
        self.next_op += 1;
        self.busy_op = Some(self.next_op);
        self.session.set_busy(true);
        self.next_op
    }

    fn inputs<'a>(&'a self, target: &'a TargetChain) -> ReconcileInputs<'a> {
        ReconcileInputs {
            injected: &self.injected,
            embedded: &self.embedded,
            startup_record: self.startup_record.as_ref(),
            explicit_choice: self.explicit_choice,
            explicit_disconnect: self.explicit_disconnect,
            reconnect_attempted: self.reconnect_attempted,
            target,
        }
    }
}

/// Clears `is_busy` when the owning action finishes, however it finishes.
struct OperationGuard<'a> {
    coordinator: &'a SessionCoordinator,
    op: u64,
    epoch: u64,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.coordinator.state.lock();
        if state.busy_op == Some(self.op) {
            state.busy_op = None;
            state.session.set_busy(false);
            self.coordinator.publish(&state);
        }
    }
}

pub struct SessionCoordinator {
    injected: Arc<dyn InjectedProvider>,
    embedded: Arc<dyn EmbeddedWallet>,
    store: ConnectionStore,
    target: TargetChain,
    state: Mutex<CoordinatorState>,
    session_tx: watch::Sender<UnifiedSession>,
    notices: broadcast::Sender<Notice>,
}

impl SessionCoordinator {
    pub fn new(
        injected: Arc<dyn InjectedProvider>,
        embedded: Arc<dyn EmbeddedWallet>,
        store: ConnectionStore,
        target: TargetChain,
    ) -> Self {
        let (session_tx, _) = watch::channel(UnifiedSession::disconnected());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            injected,
            embedded,
            store,
            target,
            state: Mutex::new(CoordinatorState::default()),
            session_tx,
            notices,
        }
    }

    /// Hydrate from storage and run the first reconciliation. Call once on app mount.
    pub async fn start(&self) {
        let record = self.store.load();
        if let Some(record) = &record {
            log::info!(
                "Restoring wallet connection intent: kind={} on_required_network={}",
                record.wallet_kind(),
                record.on_required_network()
            );
        }
        {
            let mut state = self.state.lock();
            state.startup_record = record;
        }
        self.reconcile().await;
    }

    /// Reset in-memory state on unmount. The persisted record is kept for the next mount.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;
        state.busy_op = None;
        state.session = UnifiedSession::disconnected();
        state.injected = LiveProviderState::signed_out();
        state.embedded = LiveProviderState::signed_out();
        state.explicit_choice = None;
        self.publish(&state);
    }

    pub fn session(&self) -> UnifiedSession {
        self.state.lock().session.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UnifiedSession> {
        self.session_tx.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn target(&self) -> &TargetChain {
        &self.target
    }

    pub fn notify(&self, notice: Notice) {
        if notice.is_error() {
            log::warn!("{}: {}", notice.title, notice.message);
        }
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }

    /// Feed a change reported by the injected provider (accounts or chain changed).
    pub async fn observe_injected(&self, live: LiveProviderState) {
        {
            let mut state = self.state.lock();
            state.injected = live;
        }
        self.reconcile().await;
    }

    /// Feed a change reported by the embedded wallet SDK (login state changed).
    pub async fn observe_embedded(&self, live: LiveProviderState) {
        {
            let mut state = self.state.lock();
            let signed_out = state.embedded.is_authenticated && !live.is_authenticated;
            if signed_out && state.explicit_choice == Some(WalletKind::EmbeddedWalletSdk) {
                // The embedded choice is honored only until that wallet signs out.
                state.explicit_choice = None;
            }
            state.embedded = live;
        }
        self.reconcile().await;
    }

    /// Recompute the session from everything currently known. Idempotent; the
    /// silent reconnection it may perform happens at most once per coordinator.
    pub async fn reconcile(&self) {
        loop {
            let (kind, epoch) = {
                let mut state = self.state.lock();
                let decision = decide(&state.inputs(&self.target));
                match decision {
                    Decision::Reconnect(kind) => {
                        state.reconnect_attempted = true;
                        (kind, state.epoch)
                    }
                    decision => {
                        self.apply_decision(&mut state, decision);
                        return;
                    }
                }
            };

            log::info!("Attempting silent reconnection to {}", kind);
            let restored = self.silent_reconnect(kind).await;

            let mut state = self.state.lock();
            if state.epoch != epoch {
                log::debug!("Discarding silent reconnection result after disconnect");
                return;
            }
            match restored {
                Ok(Some(live)) => match kind {
                    WalletKind::EmbeddedWalletSdk => state.embedded = live,
                    _ => state.injected = live,
                },
                Ok(None) => {
                    log::info!("No {} session to restore, clearing stored connection", kind);
                    state.startup_record = None;
                    self.store.clear();
                }
                Err(err) => {
                    log::warn!("Silent reconnection to {} failed: {}", kind, err);
                    state.startup_record = None;
                    self.store.clear();
                }
            }
        }
    }

    pub async fn connect(&self, kind: WalletKind) -> ActionOutcome {
        if kind.is_none() {
            return ActionOutcome::Failed(crate::wallet_error!(
                ValidationError,
                "Cannot connect to wallet kind none"
            ));
        }

        let Some(op) = self.begin_operation() else {
            log::debug!("connect({}) ignored: another wallet action is in flight", kind);
            return ActionOutcome::Skipped;
        };

        let previous_choice = {
            let mut state = self.state.lock();
            state.explicit_choice.replace(kind)
        };

        let outcome = match kind {
            WalletKind::EmbeddedWalletSdk => self.connect_embedded(&op).await,
            _ => self.connect_injected(&op).await,
        };

        if let ActionOutcome::Failed(_) = outcome {
            let mut state = self.state.lock();
            if state.epoch == op.epoch {
                state.explicit_choice = previous_choice;
                self.apply_decision_from_state(&mut state);
            }
        }
        outcome
    }

    /// Always honored locally, even when the provider call fails.
    pub async fn disconnect(&self) -> ActionOutcome {
        let (kind, op) = {
            let mut state = self.state.lock();
            state.epoch += 1;
            state.explicit_disconnect = true;
            state.explicit_choice = None;
            let op = state.claim_busy();
            self.publish(&state);
            let guard = OperationGuard {
                coordinator: self,
                op,
                epoch: state.epoch,
            };
            (state.session.wallet_kind(), guard)
        };

        let result = match kind {
            WalletKind::InjectedProvider => self.injected.disconnect().await,
            WalletKind::EmbeddedWalletSdk => self.embedded.logout().await,
            WalletKind::None => Ok(()),
        };
        if let Err(err) = result {
            log::warn!(
                "Provider disconnect for {} failed, clearing local session anyway: {}",
                kind,
                err
            );
        }

        {
            let mut state = self.state.lock();
            match kind {
                WalletKind::InjectedProvider => state.injected = LiveProviderState::signed_out(),
                WalletKind::EmbeddedWalletSdk => state.embedded = LiveProviderState::signed_out(),
                WalletKind::None => {}
            }
            state.session = UnifiedSession::disconnected();
            state.busy_op = None;
            state.session.set_busy(false);
            self.publish(&state);
        }
        self.store.clear();
        drop(op);

        if !kind.is_none() {
            self.notify(Notice::info(
                "Disconnected",
                "Your wallet has been disconnected",
            ));
        }
        ActionOutcome::Completed
    }

    pub async fn ensure_required_network(&self) -> ActionOutcome {
        let Some(op) = self.begin_operation() else {
            return ActionOutcome::Skipped;
        };

        let (kind, on_network) = {
            let state = self.state.lock();
            (
                state.session.wallet_kind(),
                state.session.is_on_required_network(),
            )
        };

        match kind {
            WalletKind::None => self.fail(&op, "Wallet Not Connected", WalletError::NotConnected),
            WalletKind::EmbeddedWalletSdk => ActionOutcome::Completed,
            WalletKind::InjectedProvider if on_network => ActionOutcome::Completed,
            WalletKind::InjectedProvider => {
                let switched = self.request_target_network().await;
                self.finish_network_switch(&op, switched)
            }
        }
    }

    /// Send a transaction through whichever wallet is active.
    /// Requires a connected session on the required network.
    pub async fn submit_transaction(
        &self,
        to: Address,
        value: Amount,
        data: Vec<u8>,
    ) -> WalletResult<String> {
        let Some(op) = self.begin_operation() else {
            return Err(WalletError::Busy);
        };

        let (kind, from, on_network, chain_id) = {
            let state = self.state.lock();
            (
                state.session.wallet_kind(),
                state.session.address().copied(),
                state.session.is_on_required_network(),
                state.injected.chain_id,
            )
        };

        let Some(from) = from else {
            return Err(self.record_error(&op, WalletError::NotConnected));
        };
        if !on_network {
            return Err(self.record_error(
                &op,
                WalletError::WrongNetwork {
                    expected: self.target.chain_id.value(),
                    actual: chain_id.map(|c| c.value()),
                },
            ));
        }

        let tx = TransactionRequest {
            from,
            to,
            value,
            data,
        };
        let result = match kind {
            WalletKind::EmbeddedWalletSdk => self.embedded.send_transaction(&tx).await,
            _ => self.injected.send_transaction(&tx).await,
        };

        match result {
            Ok(hash) => {
                let mut state = self.state.lock();
                if state.epoch == op.epoch {
                    state.session.set_last_error(None);
                    self.publish(&state);
                }
                Ok(hash)
            }
            Err(err) => Err(self.record_error(&op, err.into())),
        }
    }

    async fn connect_embedded(&self, op: &OperationGuard<'_>) -> ActionOutcome {
        let address = match self.embedded.login().await {
            Ok(address) => address,
            Err(err) => return self.fail(op, "Connection Failed", err.into()),
        };

        {
            let mut state = self.state.lock();
            if state.epoch != op.epoch {
                return ActionOutcome::Superseded;
            }
            state.embedded = LiveProviderState::authenticated(address, Some(self.target.chain_id));
            state.explicit_disconnect = false;
            state.session.set_last_error(None);
            self.apply_decision_from_state(&mut state);
        }

        log::info!("Connected embedded wallet {}", address);
        self.notify(Notice::info(
            "Connected",
            format!("Successfully connected to {}", self.embedded.identity().name),
        ));
        ActionOutcome::Completed
    }

    async fn connect_injected(&self, op: &OperationGuard<'_>) -> ActionOutcome {
        let live = match self.injected.connect().await {
            Ok(live) => live,
            Err(err) => return self.fail(op, "Connection Failed", err.into()),
        };
        let Some(address) = live.authenticated_address() else {
            return self.fail(
                op,
                "Connection Failed",
                WalletError::ProviderUnavailable("No accounts found".to_string()),
            );
        };
        let needs_switch = !self.target.matches(live.chain_id);

        {
            let mut state = self.state.lock();
            if state.epoch != op.epoch {
                return ActionOutcome::Superseded;
            }
            state.injected = live;
            state.explicit_disconnect = false;
            state.session.set_last_error(None);
            self.apply_decision_from_state(&mut state);
        }
        log::info!("Connected injected provider account {}", address);

        if !needs_switch {
            self.notify(Notice::info(
                "Connected",
                format!("Successfully connected to {}", self.injected.identity().name),
            ));
            return ActionOutcome::Completed;
        }

        let switched = self.request_target_network().await;
        match self.finish_network_switch(op, switched) {
            // The account stays connected; the switch failure is already reported.
            ActionOutcome::Failed(_) => ActionOutcome::Completed,
            other => other,
        }
    }

    /// Switch the injected provider to the target chain, adding it first when unknown.
    async fn request_target_network(&self) -> WalletResult<()> {
        log::info!("Requesting switch to {} ({})", self.target.name, self.target.chain_id);
        match self.injected.switch_chain(self.target.chain_id).await {
            Ok(()) => Ok(()),
            Err(ProviderError::UnrecognizedChain(msg)) => {
                log::info!("Chain not known to wallet ({}), adding {}", msg, self.target.name);
                self.injected
                    .add_chain(&self.target)
                    .await
                    .map_err(WalletError::from)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn finish_network_switch(
        &self,
        op: &OperationGuard<'_>,
        switched: WalletResult<()>,
    ) -> ActionOutcome {
        match switched {
            Ok(()) => {
                {
                    let mut state = self.state.lock();
                    if state.epoch != op.epoch {
                        return ActionOutcome::Superseded;
                    }
                    state.injected.chain_id = Some(self.target.chain_id);
                    state.session.set_last_error(None);
                    self.apply_decision_from_state(&mut state);
                }
                self.notify(Notice::info(
                    "Network Switched",
                    format!("Connected to {}", self.target.name),
                ));
                ActionOutcome::Completed
            }
            Err(err) => self.fail(op, "Network Switch Failed", err),
        }
    }

    async fn silent_reconnect(&self, kind: WalletKind) -> WalletResult<Option<LiveProviderState>> {
        match kind {
            WalletKind::EmbeddedWalletSdk => {
                let restored = self.embedded.restore_session().await?;
                Ok(restored.map(|address| {
                    LiveProviderState::authenticated(address, Some(self.target.chain_id))
                }))
            }
            WalletKind::InjectedProvider => {
                let live = self.injected.silent_reconnect().await?;
                Ok(live.authenticated_address().map(|_| live))
            }
            WalletKind::None => Ok(None),
        }
    }

    fn begin_operation(&self) -> Option<OperationGuard<'_>> {
        let mut state = self.state.lock();
        if state.busy_op.is_some() {
            return None;
        }
        let op = state.claim_busy();
        self.publish(&state);
        Some(OperationGuard {
            coordinator: self,
            op,
            epoch: state.epoch,
        })
    }

    /// Record a failed action in `last_error` and announce it.
    fn fail(&self, op: &OperationGuard<'_>, title: &str, err: WalletError) -> ActionOutcome {
        {
            let mut state = self.state.lock();
            if state.epoch != op.epoch {
                return ActionOutcome::Superseded;
            }
            state.session.set_last_error(Some(err.user_message()));
            self.publish(&state);
        }
        self.notify(Notice::error(title, err.user_message()));
        ActionOutcome::Failed(err)
    }

    fn record_error(&self, op: &OperationGuard<'_>, err: WalletError) -> WalletError {
        let mut state = self.state.lock();
        if state.epoch == op.epoch {
            state.session.set_last_error(Some(err.user_message()));
            self.publish(&state);
        }
        err
    }

    fn apply_decision_from_state(&self, state: &mut CoordinatorState) {
        let decision = decide(&state.inputs(&self.target));
        self.apply_decision(state, decision);
    }

    fn apply_decision(&self, state: &mut CoordinatorState, decision: Decision) {
        if let Some(next) = decision.session() {
            if !state.session.same_connection(&next) {
                log::info!(
                    "Wallet session now {} (address={:?}, on_required_network={})",
                    next.wallet_kind(),
                    next.address(),
                    next.is_on_required_network()
                );
            }
            state.session.replace_connection(next);
        }

        if state.session.is_connected() {
            self.store.save(
                state.session.wallet_kind(),
                state.session.is_on_required_network(),
            );
        }
        self.publish(state);
    }

    fn publish(&self, state: &CoordinatorState) {
        self.session_tx.send_replace(state.session.clone());
    }
}
