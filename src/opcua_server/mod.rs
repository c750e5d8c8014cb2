pub mod data_source;
pub mod methods;
pub mod nodes;
pub mod server;

pub use data_source::{status_code, LedStateGetter, SensorValueGetter};
pub use methods::DropMessage;
pub use nodes::{populate, NodeLayout};
pub use server::{RunningServer, SensorServer};
