// Domain layer: the product row model and the ports the pipeline runs against.

pub mod model;
pub mod ports;
