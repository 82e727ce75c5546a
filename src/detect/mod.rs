mod backend;
mod backends;
mod registry;

pub use backend::DetectorBackend;
pub use backends::{BlobBackend, StubBackend};
pub use registry::BackendRegistry;
