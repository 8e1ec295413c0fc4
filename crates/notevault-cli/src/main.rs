//! # NoteVault CLI
//!
//! An operator tool for a notevault store: inspect it, add and remove notes,
//! and drive the backup machinery by hand. The binary is thin on purpose:
//! everything it does is a single call into the `notevault` library, and this
//! crate only owns argument parsing, logging setup and terminal output.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (src/cli/)                                       │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - one handler per subcommand (handlers.rs)                 │
//! │  - text / JSON rendering (render.rs)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  notevault::init::open -> NoteVault<FsMedium>               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
