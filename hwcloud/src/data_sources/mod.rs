//! Data source implementations

pub mod availability_zones;

pub use availability_zones::AvailabilityZonesDataSource;
