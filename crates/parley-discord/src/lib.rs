pub mod adapter;
pub mod commands;
pub mod error;
pub mod handler;
pub mod transport;

pub use adapter::DiscordAdapter;
pub use error::DiscordError;
pub use transport::InteractionTransport;
