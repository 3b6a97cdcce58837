//! IELTS Speaking evaluation over a streaming multimodal LLM.
//!
//! * [`config`]: TOML configuration and platform paths.
//! * [`llm`]: prompt assembly, stream decoding and aggregation, the evaluator.
//! * [`pipeline`]: multi-part sessions and their output files.
//! * [`scoring`]: secondary scoring against a human reference.

pub mod config;
pub mod llm;
pub mod pipeline;
pub mod scoring;
