pub mod geo;
pub mod jwt;
pub mod qr;
