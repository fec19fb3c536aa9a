// Core domain: models, errors, faults, key material, resilience

pub mod crypto;
pub mod errors;
pub mod fault;
pub mod models;
pub mod resilience;
