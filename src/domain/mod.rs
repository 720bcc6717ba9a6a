pub mod errors;
pub mod market;
pub mod numeric;
pub mod ports;
pub mod record;
pub mod signal;
