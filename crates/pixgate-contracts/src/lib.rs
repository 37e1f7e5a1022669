pub mod envelope;
pub mod extract;
pub mod features;
pub mod form;
pub mod progress;
pub mod routes;
pub mod state;
pub mod validation;
