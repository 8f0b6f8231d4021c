//! Resource implementations

pub mod as_group;
pub mod cce_addon;
pub mod vpc;

pub use as_group::AsGroupResource;
pub use cce_addon::CceAddonResource;
pub use vpc::VpcResource;
