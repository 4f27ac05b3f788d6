// skysync-api: Async clients for ACE FlightDeck (REST) and SkySpark (Haystack)

pub mod error;
pub mod flightdeck;
pub mod skyspark;
pub mod transport;

pub use error::Error;
pub use flightdeck::FlightDeckClient;
pub use skyspark::{CommitMode, SkysparkClient};
pub use transport::{TlsMode, TransportConfig};
