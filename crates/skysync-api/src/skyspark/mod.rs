// SkySpark (sink) API surface: Haystack values, grids, and the op client.

pub mod client;
pub mod grid;
pub mod value;

pub use client::{CommitMode, SkysparkClient};
pub use grid::{Grid, Row};
pub use value::Value;
