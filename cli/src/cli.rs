use clap::Parser;
use gemini_chat_core::GeminiConfig;
use std::path::PathBuf;

/// Terminal chat with Gemini, with follow-up suggestions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The prompt to send. Without it (or with -i) an interactive chat starts
    #[arg(index = 1)]
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Path to the config file (defaults to ~/.config/gemini-chat/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Gemini API key (overrides GEMINI_API_KEY)
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,

    /// Gemini model to use (overrides GEMINI_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System instruction sent with every message
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Print replies as they stream instead of rendering Markdown at the end
    #[arg(long, default_value_t = false)]
    pub no_markdown: bool,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Command-line values as a config overlay
    pub fn overlay(&self) -> GeminiConfig {
        let mut overlay = GeminiConfig::empty();
        overlay.api_key = self.api_key.clone();
        overlay.model_name = self.model.clone();
        overlay.system_prompt = self.system_prompt.clone();
        if self.no_markdown {
            overlay.render_markdown = Some(false);
        }
        if self.verbose {
            overlay.log_level = Some("debug".to_string());
        }
        overlay
    }

    pub fn interactive(&self) -> bool {
        self.interactive || self.prompt.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_only_sets_given_flags() {
        let args = Args::parse_from(["gemini-chat", "--model", "gemini-1.5-pro", "hello"]);
        let overlay = args.overlay();
        assert_eq!(overlay.model_name.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(overlay.api_key, None);
        assert_eq!(overlay.render_markdown, None);
        assert!(!args.interactive());
    }

    #[test]
    fn test_no_prompt_means_interactive() {
        let args = Args::parse_from(["gemini-chat", "--no-markdown", "-v"]);
        assert!(args.interactive());
        let overlay = args.overlay();
        assert_eq!(overlay.render_markdown, Some(false));
        assert_eq!(overlay.log_level.as_deref(), Some("debug"));
    }
}
