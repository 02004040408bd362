pub mod registry;
pub mod replay;
pub mod schema;
pub mod shared;
pub mod validate;
