//! Environment preamble for outbound queries.

use hark_core::PromptBuilder;
use std::path::PathBuf;

pub struct EnvironmentPrompt {
    cwd: Option<PathBuf>,
}

impl EnvironmentPrompt {
    pub fn detect() -> Self {
        Self {
            cwd: std::env::current_dir().ok(),
        }
    }
}

impl PromptBuilder for EnvironmentPrompt {
    fn system_prompt(&self) -> String {
        let mut lines = vec![
            "You are hark, an assistant embedded in a text editor. Answer concisely.".to_string(),
            format!("Operating system: {} ({})", std::env::consts::OS, std::env::consts::ARCH),
        ];
        if let Some(cwd) = &self.cwd {
            lines.push(format!("Working directory: {}", cwd.display()));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_environment() {
        let prompt = EnvironmentPrompt {
            cwd: Some(PathBuf::from("/work/project")),
        }
        .system_prompt();
        assert!(prompt.contains(std::env::consts::OS));
        assert!(prompt.contains("/work/project"));
    }
}
