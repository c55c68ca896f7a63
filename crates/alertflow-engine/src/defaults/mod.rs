//! Default implementations of the engine's pluggable traits: the
//! Open-Meteo weather and flood adapters, logging stubs for the messaging
//! ports, and an in-memory workflow store for tests and embedding.

pub mod in_memory_store;
pub mod open_meteo;
pub mod stubs;

pub use in_memory_store::InMemoryStore;
pub use open_meteo::{OpenMeteoFlood, OpenMeteoWeather};
pub use stubs::{StubEmail, StubSms};
