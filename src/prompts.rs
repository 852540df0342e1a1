//! Run instructions sent with every assistant run.

/// Built-in instructions describing how answers should cite their sources.
pub const RUN_INSTRUCTIONS: &str = include_str!("prompts/run_instructions.txt");
