//! Simulated pipeline world.
//!
//! One shared state stands in for every external collaborator: container
//! lifecycle, the test chain, the message bus, and the event store behind the
//! query API. [`FakeRuntime`] and [`FakeDriver`] mutate it through the
//! harness traits; the fake API in `api.rs` reads it over HTTP.
//!
//! Fault switches make the pipeline misbehave in the ways the scenarios
//! are designed to catch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ingest_chaos_chain_driver::{ChainDriver, ChainDriverError};
use ingest_chaos_core::types::{Chain, LifecycleState, ObservedEvent, TransactionRecord};
use ingest_chaos_service_control::{ControlError, ExecOutput, ServiceRuntime};
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const CHAIN_SERVICE: &str = "anvil";
pub const BUS_SERVICE: &str = "redis";
pub const API_SERVICE: &str = "api";
pub const POLLER_SERVICE: &str = "rust";
pub const STORE_SERVICE: &str = "postgres";

pub const SENDER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// Ways the simulated pipeline can break its delivery contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct Faults {
    /// Events produced while the bus is down are dropped instead of retried.
    pub lose_during_bus_outage: bool,
    /// Restarting the API re-ingests (duplicates) every stored event.
    pub duplicate_on_api_restart: bool,
    /// After a chain reset the poller stops delivering.
    pub lose_after_chain_reset: bool,
    /// Stored events carry the wrong event type.
    pub corrupt_event_type: bool,
    /// The store truncate command exits non-zero.
    pub failing_truncate: bool,
    /// Restarting the chain service leaves it down.
    pub chain_stays_down: bool,
}

#[derive(Debug, Default)]
struct State {
    running: HashMap<String, bool>,
    chain_epoch: u64,
    tx_counter: u64,
    recipient_counter: u64,
    /// Produced while the bus was down, published on bus start.
    pending_bus: Vec<ObservedEvent>,
    /// Persisted events, oldest first.
    store: Vec<ObservedEvent>,
    /// Raw events received by the pipeline, oldest first.
    received: Vec<ObservedEvent>,
    faults: Faults,
    calls: Vec<String>,
}

/// Shared handle to the simulated pipeline.
#[derive(Debug, Clone, Default)]
pub struct World {
    state: Arc<Mutex<State>>,
}

impl World {
    /// A healthy world with every service running.
    pub fn healthy() -> Self {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> Self {
        let running = [
            CHAIN_SERVICE,
            BUS_SERVICE,
            API_SERVICE,
            POLLER_SERVICE,
            STORE_SERVICE,
        ]
        .into_iter()
        .map(|s| (s.to_owned(), true))
        .collect();
        Self {
            state: Arc::new(Mutex::new(State {
                running,
                faults,
                ..State::default()
            })),
        }
    }

    pub async fn is_running(&self, service: &str) -> bool {
        self.state
            .lock()
            .await
            .running
            .get(service)
            .copied()
            .unwrap_or(false)
    }

    pub async fn set_running(&self, service: &str, running: bool) {
        self.state
            .lock()
            .await
            .running
            .insert(service.to_owned(), running);
    }

    /// Lifecycle calls in order, e.g. `"stop redis"`.
    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    pub async fn chain_epoch(&self) -> u64 {
        self.state.lock().await.chain_epoch
    }

    pub async fn stored(&self) -> Vec<ObservedEvent> {
        self.state.lock().await.store.clone()
    }

    /// Seeds the store with an event from an earlier run.
    pub async fn seed(&self, event: ObservedEvent) {
        let mut state = self.state.lock().await;
        state.store.push(event.clone());
        state.received.push(event);
    }

    /// Events for `wallet`, newest first, at most `limit`.
    pub async fn wallet_events(&self, wallet: &str, limit: usize) -> Vec<ObservedEvent> {
        self.state
            .lock()
            .await
            .store
            .iter()
            .rev()
            .filter(|e| e.from == wallet || e.to == wallet)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Raw received events, newest first.
    pub async fn last_received(&self) -> Vec<ObservedEvent> {
        self.state
            .lock()
            .await
            .received
            .iter()
            .rev()
            .cloned()
            .collect()
    }

    async fn stop(&self, service: &str) {
        let mut state = self.state.lock().await;
        state.calls.push(format!("stop {service}"));
        state.running.insert(service.to_owned(), false);
    }

    async fn start(&self, service: &str) {
        let mut state = self.state.lock().await;
        state.calls.push(format!("start {service}"));
        if service == CHAIN_SERVICE && state.faults.chain_stays_down {
            return;
        }
        let was_running = state.running.insert(service.to_owned(), true).unwrap_or(false);
        if was_running {
            return;
        }
        match service {
            CHAIN_SERVICE => state.chain_epoch += 1,
            BUS_SERVICE => {
                let pending = std::mem::take(&mut state.pending_bus);
                for event in pending {
                    persist(&mut state, event);
                }
            }
            API_SERVICE if state.faults.duplicate_on_api_restart => {
                let replay = state.store.clone();
                state.store.extend(replay);
            }
            _ => {}
        }
    }

    /// Runs a confirmed transfer through poller -> bus -> store.
    async fn ingest(&self, record: &TransactionRecord) {
        let mut state = self.state.lock().await;
        if state.chain_epoch > 0 && state.faults.lose_after_chain_reset {
            return;
        }
        let event_type = if state.faults.corrupt_event_type {
            "erc20_transfer"
        } else {
            record.expected_event_type()
        };
        let event = ObservedEvent {
            event_id: Some(format!("ethereum-{}", record.tx_id)),
            chain: record.chain.as_str().to_owned(),
            network: Some("anvil".to_owned()),
            tx_hash: record.tx_id.clone(),
            event_type: event_type.to_owned(),
            from: record.from.clone(),
            to: record.to.clone(),
            value: record.value.clone(),
            ..ObservedEvent::default()
        };

        let bus_up = state.running.get(BUS_SERVICE).copied().unwrap_or(false);
        if bus_up {
            persist(&mut state, event);
        } else if !state.faults.lose_during_bus_outage {
            state.pending_bus.push(event);
        }
    }

    async fn truncate(&self) -> bool {
        let mut state = self.state.lock().await;
        state.calls.push(format!("exec {STORE_SERVICE}"));
        if state.faults.failing_truncate {
            return false;
        }
        state.store.clear();
        state.received.clear();
        true
    }
}

fn persist(state: &mut State, event: ObservedEvent) {
    state.received.push(event.clone());
    state.store.push(event);
}

// ---------------------------------------------------------------------------
// Service runtime over the world
// ---------------------------------------------------------------------------

/// `ServiceRuntime` backed by [`World`].
pub struct FakeRuntime {
    world: World,
}

impl FakeRuntime {
    pub fn new(world: World) -> Self {
        Self { world }
    }
}

impl ServiceRuntime for FakeRuntime {
    async fn ping(&self) -> Result<(), ControlError> {
        Ok(())
    }

    async fn state(&self, service: &str) -> Result<LifecycleState, ControlError> {
        Ok(if self.world.is_running(service).await {
            LifecycleState::Running
        } else {
            LifecycleState::Stopped
        })
    }

    async fn stop(&self, service: &str) -> Result<(), ControlError> {
        self.world.stop(service).await;
        Ok(())
    }

    async fn start_existing(&self, service: &str) -> Result<(), ControlError> {
        self.world.start(service).await;
        Ok(())
    }

    async fn create_and_start(&self, service: &str) -> Result<(), ControlError> {
        self.world.start(service).await;
        Ok(())
    }

    async fn logs(&self, service: &str, _tail: usize) -> Result<String, ControlError> {
        if service == POLLER_SERVICE && self.world.is_running(service).await {
            Ok("INFO Starting ETH HTTP polling\nINFO Polling blocks 12..14\n".to_owned())
        } else {
            Ok(String::new())
        }
    }

    async fn exec(&self, service: &str, _cmd: &[String]) -> Result<ExecOutput, ControlError> {
        if service != STORE_SERVICE {
            return Err(ControlError::NotFound(service.to_owned()));
        }
        if self.world.truncate().await {
            Ok(ExecOutput {
                exit_code: 0,
                output: "TRUNCATE TABLE".to_owned(),
            })
        } else {
            Ok(ExecOutput {
                exit_code: 1,
                output: "ERROR: relation \"events\" does not exist".to_owned(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Chain driver over the world
// ---------------------------------------------------------------------------

/// `ChainDriver` backed by [`World`]. Transfers confirm instantly.
pub struct FakeDriver {
    world: World,
    connect_interval: Duration,
}

impl FakeDriver {
    pub fn new(world: World) -> Self {
        Self {
            world,
            connect_interval: Duration::from_millis(20),
        }
    }
}

impl ChainDriver for FakeDriver {
    fn chain(&self) -> Chain {
        Chain::Ethereum
    }

    fn endpoint(&self) -> &str {
        "fake://anvil"
    }

    fn transfer_amount(&self) -> u64 {
        1_000
    }

    async fn connect(&self, timeout: Duration) -> Result<(), ChainDriverError> {
        let started = Instant::now();
        loop {
            if self.world.is_running(CHAIN_SERVICE).await {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(ChainDriverError::Unreachable {
                    chain: Chain::Ethereum,
                    endpoint: self.endpoint().to_owned(),
                    after: started.elapsed(),
                    reason: "connection refused".to_owned(),
                });
            }
            tokio::time::sleep(self.connect_interval).await;
        }
    }

    async fn sender(&self) -> Result<String, ChainDriverError> {
        Ok(SENDER.to_owned())
    }

    async fn new_recipients(&self, count: usize) -> Result<Vec<String>, ChainDriverError> {
        let mut state = self.world.state.lock().await;
        Ok((0..count)
            .map(|_| {
                state.recipient_counter += 1;
                format!("0x{:040x}", 0xa000 + state.recipient_counter)
            })
            .collect())
    }

    async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<TransactionRecord, ChainDriverError> {
        if !self.world.is_running(CHAIN_SERVICE).await {
            return Err(ChainDriverError::Rejected {
                chain: Chain::Ethereum,
                reason: "connection refused".to_owned(),
            });
        }
        let tx_id = {
            let mut state = self.world.state.lock().await;
            state.tx_counter += 1;
            format!("0x{:064x}", state.tx_counter)
        };
        let record = TransactionRecord {
            chain: Chain::Ethereum,
            tx_id,
            from: from.to_owned(),
            to: to.to_owned(),
            value: amount.to_string(),
            token: None,
        };
        self.world.ingest(&record).await;
        Ok(record)
    }
}
