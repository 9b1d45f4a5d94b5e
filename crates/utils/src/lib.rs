pub mod classifier;
pub mod classifiers;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod message;
pub mod mime;
pub mod pipeline;
pub mod provision;
pub mod router;
pub mod transformer;
pub mod transformers;
pub mod transports;

pub use classifier::*;
pub use classifiers::*;
pub use config::*;
pub use dispatch::*;
pub use logging::*;
pub use message::*;
pub use mime::*;
pub use pipeline::*;
pub use provision::*;
pub use router::*;
pub use transformer::*;
pub use transformers::*;
pub use transports::*;
