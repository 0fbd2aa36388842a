//! Domain model for the World State context.

pub mod flags;
pub mod inventory;
pub mod merchant;
pub mod world;

pub use flags::FlagValue;
pub use inventory::Inventory;
pub use merchant::{Shop, TradeFailure};
pub use world::{TravelFailure, WorldState};
