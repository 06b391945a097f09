//! Orchestration for Beacon.
//!
//! Drives the poll → snapshot → diff → announce cycle for each watched
//! resource kind and executes chat commands against the same stores.
//!
//! ## Architectural Layer
//!
//! **Application services.** Depends only on the `watch` domain crate and its
//! port traits. Concrete adapters (AWS, Slack) are injected by the composition
//! root as `Arc<dyn Trait>`.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`cycle`] | `CycleRunner`: one poll cycle per call, overlap policy, fetch timeout |
//! | [`notifier`] | `Notifier`: delivery to the broadcast channel under a delivery mode |
//! | [`scheduler`] | `Scheduler`: one independent ticker per kind, graceful shutdown |
//! | [`handler`] | `CommandHandler`: chat commands, permission checks, replies |

pub mod cycle;
pub mod handler;
pub mod notifier;
pub mod scheduler;

#[cfg(test)]
mod test_support;

pub use cycle::{CycleOptions, CycleOutcome, CycleReport, CycleRunner, OverlapPolicy};
pub use handler::{CommandHandler, RECENT_BUILDS};
pub use notifier::{DeliveryMode, Notifier};
pub use scheduler::Scheduler;
