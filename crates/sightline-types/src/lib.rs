pub mod density;
pub mod selection;
pub mod visibility;

pub use density::*;
pub use selection::*;
pub use visibility::*;
