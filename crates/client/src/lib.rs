//! Request interception for shellcache.
//!
//! This crate routes outbound requests to a caching strategy, runs the
//! install/activate lifecycle, and wires push notifications to the client
//! host. Storage lives in `shellcache-core`.

pub mod fetch;
pub mod gateway;
pub mod host;
pub mod lifecycle;
pub mod notify;
pub mod offline;
pub mod route;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use gateway::{Gateway, Interception};
pub use host::{ClientHost, ClientWindow, LocalHost};
pub use lifecycle::{ActivateReport, ControlMessage, InstallReport, LifecycleManager, WorkerPhase};
pub use notify::{ClickOutcome, Notification, NotificationDefaults, PushPayload, handle_click, receive_push};
pub use offline::offline_response;
pub use route::{Route, RouteClassifier, StoreKind, Strategy};
pub use strategy::{Served, Source, StrategyExecutor};
