//! Publishes DHT temperature and humidity readings from a Raspberry Pi over
//! OPC UA, with a remotely switchable diagnosis LED.

pub mod cache;
pub mod config;
pub mod diagnosis;
pub mod opcua_server;
pub mod sensor;
