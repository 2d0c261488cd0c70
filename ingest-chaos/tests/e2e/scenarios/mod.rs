//! E2E test scenarios.
//!
//! One module per chaos scenario, plus the session fixture and the runner.

mod api_restart;
mod bus_downtime;
mod delivery_smoke;
mod rpc_disconnect;
mod session;
