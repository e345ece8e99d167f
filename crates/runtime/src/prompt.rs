//! System prompt sent ahead of every transcript.
//!
//! Bump [`PROMPT_VERSION`] whenever [`SYSTEM_PROMPT`] changes so runs can be
//! tied back to the instructions they were given.

pub const PROMPT_VERSION: &str = "2025-01.1";

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant. \
Use the provided tools whenever a calculation is needed instead of computing it yourself. \
If a tool reports an error, read it and either correct the call or explain the problem. \
When you have the result, reply with the answer only.";
