// Server module entry point
// Listener setup, per-connection serving and the accept loop

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is exposed as server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use connection::ServerState;
pub use listener::create_reusable_listener;
pub use server_loop::run;
pub use signal::shutdown_signal;
