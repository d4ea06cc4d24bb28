// Device control API (request/response surface)

pub mod client;
pub mod models;
mod ports;
mod routes;
mod system;

pub use client::DeviceClient;
