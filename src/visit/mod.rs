//! Visit simulation: synthetic identities browsing a target site.
//!
//! - `identity`: made-up visitor profiles
//! - `links`: same-origin link extraction
//! - `fetch`: `PageFetcher` capability and the reqwest implementation
//! - `simulator`: `Visitor` trait and `VisitSimulator`

pub mod fetch;
pub mod identity;
pub mod links;
pub mod simulator;

pub use fetch::{HttpFetcher, PageFetcher};
pub use identity::FakeIdentity;
pub use links::extract_links;
pub use simulator::{VisitReport, VisitSimulator, Visitor};
