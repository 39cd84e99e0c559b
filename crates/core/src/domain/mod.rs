pub mod request;
pub mod variant;
