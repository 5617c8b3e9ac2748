pub mod cargo_transfer;
pub mod errors;
pub mod game_context;
pub mod operations;
pub mod sage_model;
pub mod submission;

pub use cargo_transfer::*;
pub use errors::*;
pub use game_context::*;
pub use operations::*;
pub use sage_model::*;
pub use submission::*;
