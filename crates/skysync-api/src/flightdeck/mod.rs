// FlightDeck (source) API surface.

pub mod client;
pub mod models;

pub use client::FlightDeckClient;
pub use models::{BacnetData, FdPoint, FdPointWrite, FdSample, FdSite, Paginated, SampleValue};
