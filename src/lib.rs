//! # MTGN Telemetry Node
//!
//! An embedded-style telemetry node that fuses an environmental sensor with a
//! GNSS receiver and speaks a compact line protocol over a duplex serial link.
//!
//! ## Features
//!
//! - **Incremental GNSS decoding**: per-sentence fix-validity state machine
//!   that never reports stale coordinates
//! - **Field-level availability**: every wire field independently present or
//!   `NAN`, never zero-filled
//! - **Command protocol**: force-transmit and interval-change requests with
//!   silent rejection of malformed lines
//! - **Interval scheduling**: periodic transmission measured from the previous
//!   send, with forced sends resetting the window
//! - **Tri-color status indicator**: prioritized command/transmit/fix states
//!   with minimum-duration pulse holds
//! - **Embedded-friendly**: no heap allocations in the node path, bounded
//!   buffers throughout
//!
//! ## Quick Start
//!
//! ```rust
//! use mtgn::sim::{SimEnvSensor, SimIndicator, SimLink, SimNavReceiver};
//! use mtgn::TelemetryNode;
//!
//! let link = SimLink::default();
//! let mut node = TelemetryNode::new(
//!     SimEnvSensor::default(),
//!     SimNavReceiver::default(),
//!     link.clone(),
//!     SimIndicator::default(),
//!     0,
//! );
//!
//! // One pass of the scheduling loop, one second after boot.
//! if let Err(e) = node.tick(1_000) {
//!     eprintln!("node error: {e}");
//! }
//!
//! for line in link.take_sent() {
//!     print!("{line}");
//! }
//! ```
//!
//! ## Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`node`] - Main orchestrator and public API
//! - [`gnss`] - Incremental fix decoder and validity state machine
//! - [`env`] - Environmental sensor reader
//! - [`protocol`] - Wire format: encoder, command parsing, status lines
//! - [`scheduler`] - Transmission interval gating
//! - [`indicator`] - Status indicator state machine
//! - [`guard`] - Startup liveness guard and terminal conditions
//! - [`hw`] - Collaborator traits for the hardware seams
//! - [`sim`] - Simulated collaborators for hosts and tests

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod env;
pub mod gnss;
pub mod guard;
pub mod hw;
pub mod indicator;
pub mod node;
pub mod protocol;
pub mod scheduler;
pub mod sim;

// Re-export main public types for convenience
pub use env::EnvironmentalSample;
pub use gnss::GeodeticFix;
pub use node::{NodePhase, NodeState, TelemetryNode};
pub use protocol::{CommandRequest, Field};
