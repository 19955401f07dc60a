pub mod constants;
pub mod error;
pub mod frame;
pub mod model_resolver;
pub mod region;
pub mod runtime;
