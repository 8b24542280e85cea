pub mod crypto;
pub mod receive;
pub mod send;
pub mod state;
