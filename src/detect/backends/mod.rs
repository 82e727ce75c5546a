mod blob;
mod stub;

pub use blob::BlobBackend;
pub use stub::StubBackend;
