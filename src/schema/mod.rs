//! Location history input schemas
//!
//! Two export flavours are understood: the semantic timeline (visits and
//! activity segments) and the raw list of device fixes.

mod adapter;
mod location;
mod timeline;

pub use adapter::*;
pub use location::*;
pub use timeline::*;
