//! xiaoqiao-core: assessment engine, data model, and advisor orchestration.
//!
//! Everything a kindergarten-to-primary transition assessment needs without
//! touching the network: score normalization, the rule-based assessment,
//! plan parsing, the knowledge base, and the offline Q&A table. Language
//! models plug in through [`traits::LlmProvider`].

pub mod advisor;
pub mod assessment;
pub mod error;
pub mod knowledge;
pub mod model;
pub mod parser;
pub mod plan;
pub mod qa;
pub mod report;
pub mod traits;
