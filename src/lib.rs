pub mod backup;
pub mod calc;
pub mod db;
pub mod ipc;
pub mod roster;
pub mod seed;
pub mod store;
