mod registry;

pub use registry::LocationRegistry;
