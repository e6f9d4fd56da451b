//! Pipeline context tests: cache behaviour and the offload adapter.

mod cache;
mod offload;
