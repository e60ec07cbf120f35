//! Data source implementations

pub mod resource_group;

pub use resource_group::ResourceGroupDataSource;
