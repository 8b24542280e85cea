//! Node-side Bluetooth Mesh stack. Messages travel through the Access, Upper Transport, Lower
//! Transport and Network layers (see [`stack::StackInternals`]) and a per-destination state
//! machine ([`stack::dispatcher::MeshDispatcher`]) ties sending and receiving together.
//Might re-enable clippy::restriction later.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::use_self,
    clippy::doc_markdown,
    clippy::module_name_repetitions
)]

pub mod random;
pub mod scheduler;
// Timestamp depends on std or some other provided clock.
pub mod timestamp;

pub mod access;
pub mod address;
pub mod bytes;
pub mod control;
pub mod crypto;
pub mod directory;
pub mod lower;
pub mod mesh;
pub mod models;
pub mod net;
pub mod reassembler;
pub mod replay;
pub mod segmenter;
pub mod stack;
pub mod upper;
