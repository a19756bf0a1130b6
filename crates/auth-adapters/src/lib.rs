//! # auth-adapters
//!
//! Session handling for corkboard. Identity comes from an external passport
//! service; this crate only carries the resulting profile across requests
//! in a tamper-evident cookie. There are no local accounts and no
//! server-side session state.

pub mod session;

pub use session::{SessionCodec, SESSION_COOKIE};
