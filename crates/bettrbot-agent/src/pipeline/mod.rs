//! Conversation pipeline: the request path behind `POST /chat/`.
//!
//! `Coach::handle` records the human turn, answers it (canned reply or
//! provider call), records the reply and returns it.

pub mod process;

pub use process::{ChatReply, Coach, SEED_GREETING, TROUBLE_REPLY, UNCLEAR_REPLY};
