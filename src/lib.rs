//! Water library exports for the binary and tests

use clap::ValueEnum;

pub mod core;
pub mod inference;
pub mod tui;

#[cfg(test)]
pub mod test_support;

#[derive(Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    #[default]
    Gemini,
    OpenRouter,
}

impl Provider {
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::OpenRouter => "OpenRouter",
        }
    }
}
