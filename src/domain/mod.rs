// Domain layer: models and ports (interfaces) of the posting pipeline.
// Nothing here talks to the network or the filesystem.

pub mod model;
pub mod ports;
