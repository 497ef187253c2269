//! # Busy Mode Application Entry Point
//!
//! Calls into the library's `run()` to open the window and run the startup
//! sequence under busy mode.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! BUSY_NOVIDEO=1 cargo run
//! ```

fn main() -> anyhow::Result<()> {
    busy_mode::run()
}
