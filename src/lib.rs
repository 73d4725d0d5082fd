//! Stateful stub orchestration for resource-lifecycle conformance tests.
//!
//! A test describes the calls it is about to make against each resource
//! (create, reads while creating and once active, update, delete, the
//! final not-found read) and the listings it will query. A
//! [`configurator::ScenarioConfigurator`] compiles those into stub rules
//! chained through one named scenario and uploads them to a stub server,
//! which then answers the real client's requests in exactly that order.
//!
//! ```text
//! Fixture ──▶ ResourceDescriptor ──▶ compiler::compile ──▶ StubRule ──┐
//! Listing ──────────────────────────────────────────────▶ StubRule ──┤
//!                                                                     ▼
//!        Scenario ─start_configuration─▶ ScenarioConfigurator ─finish─▶ control plane
//! ```

pub mod compiler;
pub mod configurator;
pub mod fixtures;
pub mod interchange;
pub mod lifecycle;
pub mod listing;
pub mod network_client;
pub mod params;
pub mod scenario;
pub mod shared_client;
pub mod stub;

cfg_if::cfg_if! {
    if #[cfg(feature = "client")] {
        pub mod client;
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "server")] {
        pub mod matcher;
        pub mod server;
    }
}
