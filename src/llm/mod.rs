// LLM module
// The generative capability that writes the final answer

use anyhow::Result;

/// Sampling settings sent along with every prompt
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Trait implemented by concrete LLM backends.
pub trait Generator {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}
