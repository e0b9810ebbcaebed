// src/lib.rs
pub mod config;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod map;
pub mod province;

pub use config::{DomainRule, LoaderSettings, MapConfig, MeshSettings, Normalization, RefinementCriteria};
pub use error::{ConfigError, FeatureError, GeometryError, LoadError, MapError};
pub use geometry::{Coordinate, Ring};
pub use loader::{LoadReport, load_map, load_map_with};
pub use map::Map;
pub use province::Province;
pub use province::mesh::ProvinceMesh;
