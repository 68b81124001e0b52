//! Client for the Gemini `generateContent` REST endpoint, specialised for
//! pincode enumeration and CT-scan center lookup.
//!
//! Model output is free text that is *usually* JSON. [`parse`] holds the
//! tolerant readers that turn it into typed results.

pub mod client;
pub mod error;
pub mod parse;
pub mod prompts;
pub mod types;

pub use client::GeminiClient;
pub use error::GeminiError;
pub use parse::{parse_centers, parse_pincodes, strip_code_fence};
