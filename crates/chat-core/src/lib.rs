pub mod controller;
pub mod event_bus;
pub mod ports;
