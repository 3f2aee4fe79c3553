pub mod budget;
pub mod config;
pub mod errors;
pub mod keygen;
pub mod priority_fee;
pub mod report;
pub mod rpc;
pub mod transfer;
