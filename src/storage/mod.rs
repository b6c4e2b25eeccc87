// Storage - Ephemeral persistence layer (in-memory key/value)

pub mod db;

pub use db::*;
