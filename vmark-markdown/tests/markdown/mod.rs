//! Markdown format tests
//!
//! Round trips, parser equivalence and escaping, through the public API.

mod equivalence;
mod escapes;
mod roundtrip;
mod scenarios;
