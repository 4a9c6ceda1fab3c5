//! Streaming completion providers for ShopChat.
//!
//! All providers implement the `shopchat_core::Provider` trait and hand back
//! responses as ordered `StreamEvent` channels.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
