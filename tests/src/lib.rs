//! # ODIM Test Suite
//!
//! Cross-crate tests that exercise the services the way they run.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── task_events.rs     # bus → subscription → dispatch queue → workers
//! │   └── request_flow.rs    # metadata → context → authorization → wire response
//! └── benches/
//!     └── pipeline_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p odim-tests integration::
//! cargo bench -p odim-tests
//! ```

pub mod integration;
