pub mod errors;
pub mod position;
pub mod result;
pub mod space;
pub mod task;

pub use errors::*;
pub use position::*;
pub use result::*;
pub use space::*;
pub use task::*;
