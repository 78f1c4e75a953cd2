//! Wire format types for the `OpenAI` chat completion protocol
//!
//! Pure serde structs used at the boundary with clients and the backend.

pub mod openai;
