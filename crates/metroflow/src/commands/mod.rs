pub mod completion;
pub mod config;
pub mod paths;
pub mod record;
