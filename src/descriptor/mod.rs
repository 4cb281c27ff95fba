pub mod branch;
pub mod env;
pub mod model;
pub mod parser;

pub use branch::{BranchFilter, BranchPattern};
pub use env::JobEnv;
pub use model::{
    Addons, AllowFailure, AptAddon, BranchConfig, CacheConfig, EmailNotification,
    HomebrewAddon, JobsConfig, MatrixEntry, NotificationConfig, OneOrMany,
    PipelineDescriptor,
};
