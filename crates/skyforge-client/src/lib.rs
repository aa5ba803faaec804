pub mod replicate;

pub use replicate::{DEFAULT_BASE_URL, ReplicateProvider};
