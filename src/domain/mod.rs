// Domain layer: records, schemas and the store port. Nothing here knows about
// concrete stores or the environment.

pub mod model;
pub mod ports;
pub mod schema;
