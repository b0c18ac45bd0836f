pub mod extract;
pub mod fetch;
pub mod ingest;
pub mod model;
pub mod query;
pub mod summary;
