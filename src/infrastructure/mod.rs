pub mod backend;
pub mod network;
pub mod observability;
pub mod persistence;
pub mod system;
