pub mod analyzer;
pub mod cli;
pub mod config;
pub mod correction;
pub mod error;
pub mod feedback;
pub mod generator;
pub mod grammar;
pub mod session;

pub use analyzer::{AnalysisOptions, GermanAnalyzer};
pub use config::Config;
pub use correction::{assemble, CorrectedText};
pub use error::{Error, Result};
pub use feedback::{Bucket, LearningFeedback, Quality};
pub use generator::{
    Difficulty, GenerationOutcome, GenerationRequest, GenerationResult, TextGenerator,
};
pub use grammar::{Category, GrammarAnalysis, GrammarChecker, Span};
pub use session::{Capability, SessionState};
