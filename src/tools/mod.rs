pub mod qr;
pub mod resolve;
pub mod serve;
pub mod share;
