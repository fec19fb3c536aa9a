// Admin services: service descriptions, endpoints, clients

pub mod client_service;
pub mod endpoint_service;
pub mod service_description_service;
pub mod warnings;
