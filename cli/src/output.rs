use std::io::{self, Write};
use std::time::Duration;

use colored::*;
use gemini_chat_core::suggestions::partial_marker_len;
use gemini_chat_core::ChatView;
use indicatif::{ProgressBar, ProgressStyle};
use lazy_static::lazy_static;
use pulldown_cmark::{CodeBlockKind, Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME: Theme = {
        let mut themes = ThemeSet::load_defaults().themes;
        themes
            .remove("base16-ocean.dark")
            .unwrap_or_default()
    };
}

/// Chat view on stdout.
///
/// With markdown rendering on, a spinner runs while the reply streams in and
/// the finished reply is rendered once. Otherwise text is printed as it
/// arrives, only ever extending what is already on screen.
pub struct TerminalView {
    render_markdown: bool,
    spinner: Option<ProgressBar>,
    printed: String,
    last_typed: Option<String>,
}

impl TerminalView {
    pub fn new(render_markdown: bool) -> Self {
        Self {
            render_markdown,
            spinner: None,
            printed: String::new(),
            last_typed: None,
        }
    }

    /// Records a line the user typed, so it is not echoed back
    pub fn note_typed(&mut self, line: &str) {
        self.last_typed = Some(line.trim().to_string());
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Prints whatever `display_text` adds to the screen. Mid-stream, trailing
    /// whitespace and a tail that may still become a suggestion marker are
    /// held back, since printed text cannot be taken back.
    fn print_extension(&mut self, display_text: &str, complete: bool) {
        let shown = if complete {
            display_text
        } else {
            let stable = display_text.len() - partial_marker_len(display_text);
            display_text[..stable].trim_end()
        };
        if let Some(rest) = shown.strip_prefix(self.printed.as_str()) {
            if !rest.is_empty() {
                print!("{}", rest);
                let _ = io::stdout().flush();
                self.printed = shown.to_string();
            }
        }
    }
}

impl ChatView for TerminalView {
    fn show_user(&mut self, text: &str) {
        if self.last_typed.take().as_deref() != Some(text) {
            println!("{}: {}", "You".green().bold(), text);
        }
    }

    fn begin_assistant(&mut self) {
        self.printed.clear();
        if self.render_markdown {
            if let Some(spinner) = &self.spinner {
                spinner.set_message("Receiving answer...");
            }
        } else {
            self.stop_spinner();
            print!("{}: ", "Assistant".blue().bold());
            let _ = io::stdout().flush();
        }
    }

    fn update_assistant(&mut self, display_text: &str) {
        if self.render_markdown {
            if let Some(spinner) = &self.spinner {
                spinner.set_message(format!(
                    "Receiving answer... ({} chars)",
                    display_text.chars().count()
                ));
            }
        } else {
            self.print_extension(display_text, false);
        }
    }

    fn finish_assistant(&mut self, display_text: &str, suggestions: &[String]) {
        if self.render_markdown {
            self.stop_spinner();
            print_assistant_response(display_text);
        } else {
            self.print_extension(display_text, true);
            println!();
        }
        self.printed.clear();
        print_suggestions(suggestions);
    }

    fn discard_assistant(&mut self) {
        self.stop_spinner();
        if !self.render_markdown {
            println!(" {}", "[interrupted]".dimmed());
        }
        self.printed.clear();
    }

    fn show_error(&mut self, message: &str) {
        self.stop_spinner();
        println!("{}: {}", "Assistant".blue().bold(), message.red());
    }

    fn set_loading(&mut self, loading: bool) {
        if !loading {
            self.stop_spinner();
            return;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(120));
        self.spinner = Some(spinner);
    }

    // The input loop draws its own prompt once a turn is over
    fn set_input_enabled(&mut self, _enabled: bool) {}
}

/// Print a finished reply with its markdown rendered for the terminal
pub fn print_assistant_response(response: &str) {
    println!(
        "{}: {}",
        "Assistant".blue().bold(),
        render_markdown(response).trim_end()
    );
}

/// Numbered follow-up chips; `/N` picks one
pub fn print_suggestions(suggestions: &[String]) {
    if suggestions.is_empty() {
        return;
    }
    println!();
    println!("{}", "Suggestions:".cyan());
    for (i, suggestion) in suggestions.iter().enumerate() {
        println!("  {}  {}", format!("/{}", i + 1).yellow().bold(), suggestion);
    }
}

/// Commands understood by the interactive loop
pub fn print_help() {
    println!("{}", "Commands:".yellow().bold());
    println!("  {}    send the suggestion with that number", "/1, /2, ...".green());
    println!("  {}          show this help", "/help".green());
    println!("  {}  leave the chat", "exit, quit, /exit".green());
    println!();
}

/// Render markdown in the terminal with syntax highlighting
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut output = String::new();
    let mut bold = 0usize;
    let mut italic = 0usize;
    let mut code_block: Option<(String, String)> = None;
    // One entry per open list: the next number for ordered lists
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in MdParser::new_ext(markdown, options) {
        match event {
            MdEvent::Start(Tag::Heading(level, ..)) => {
                ensure_blank_line(&mut output);
                let marker = match level {
                    HeadingLevel::H1 => "#",
                    HeadingLevel::H2 => "##",
                    _ => "###",
                };
                output.push_str(&format!("{} ", marker.bright_cyan().bold()));
                bold += 1;
            }
            MdEvent::End(Tag::Heading(..)) => {
                bold = bold.saturating_sub(1);
                output.push('\n');
            }
            MdEvent::Start(Tag::Paragraph) => {
                if lists.is_empty() {
                    ensure_blank_line(&mut output);
                }
            }
            MdEvent::End(Tag::Paragraph) => {
                if lists.is_empty() {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::BlockQuote) => {
                ensure_blank_line(&mut output);
                output.push_str(&format!("{} ", "│".dimmed()));
                italic += 1;
            }
            MdEvent::End(Tag::BlockQuote) => {
                italic = italic.saturating_sub(1);
            }
            MdEvent::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code_block = Some((lang, String::new()));
            }
            MdEvent::End(Tag::CodeBlock(_)) => {
                if let Some((lang, code)) = code_block.take() {
                    ensure_blank_line(&mut output);
                    output.push_str(&highlight_code(&lang, &code));
                }
            }
            MdEvent::Start(Tag::List(start)) => {
                if lists.is_empty() {
                    ensure_blank_line(&mut output);
                } else if !output.ends_with('\n') {
                    output.push('\n');
                }
                lists.push(start);
            }
            MdEvent::End(Tag::List(_)) => {
                lists.pop();
            }
            MdEvent::Start(Tag::Item) => {
                let indent = "  ".repeat(lists.len().saturating_sub(1));
                let bullet = match lists.last_mut() {
                    Some(Some(n)) => {
                        let label = format!("{}.", n);
                        *n += 1;
                        label
                    }
                    _ => "•".to_string(),
                };
                output.push_str(&format!("{}{} ", indent, bullet.yellow()));
            }
            MdEvent::End(Tag::Item) => {
                if !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::Strong) => bold += 1,
            MdEvent::End(Tag::Strong) => bold = bold.saturating_sub(1),
            MdEvent::Start(Tag::Emphasis) => italic += 1,
            MdEvent::End(Tag::Emphasis) => italic = italic.saturating_sub(1),
            MdEvent::End(Tag::Link(_, url, _)) => {
                output.push_str(&format!(" ({})", url.as_ref().underline()));
            }
            MdEvent::TaskListMarker(done) => {
                output.push_str(if done { "[x] " } else { "[ ] " });
            }
            MdEvent::Text(text) => {
                if let Some((_, code)) = code_block.as_mut() {
                    code.push_str(&text);
                } else {
                    let mut styled = text.as_ref().normal();
                    if bold > 0 {
                        styled = styled.bold();
                    }
                    if italic > 0 {
                        styled = styled.italic();
                    }
                    output.push_str(&styled.to_string());
                }
            }
            MdEvent::Code(code) => {
                output.push_str(&code.as_ref().on_bright_black().white().to_string());
            }
            MdEvent::Html(html) => output.push_str(&html),
            MdEvent::SoftBreak => output.push(' '),
            MdEvent::HardBreak => output.push('\n'),
            MdEvent::Rule => {
                ensure_blank_line(&mut output);
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');
            }
            _ => {}
        }
    }

    output
}

fn ensure_blank_line(output: &mut String) {
    if output.is_empty() || output.ends_with("\n\n") {
        return;
    }
    if output.ends_with('\n') {
        output.push('\n');
    } else {
        output.push_str("\n\n");
    }
}

fn highlight_code(lang: &str, code: &str) -> String {
    let syntax = SYNTAX_SET
        .find_syntax_by_token(lang)
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, &THEME);

    let mut output = String::new();
    if !lang.is_empty() {
        output.push_str(&format!("{}\n", lang.cyan()));
    }
    for line in LinesWithEndings::from(code) {
        match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(ranges) => output.push_str(&as_24_bit_terminal_escaped(&ranges, false)),
            Err(_) => output.push_str(line),
        }
    }
    // Reset colours left open by the last highlighted span
    output.push_str("\x1b[0m");
    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemini_chat_core::StreamAccumulator;

    fn plain(markdown: &str) -> String {
        colored::control::set_override(false);
        render_markdown(markdown)
    }

    fn streamed(view: &mut TerminalView, deltas: &[&str]) -> StreamAccumulator {
        let mut acc = StreamAccumulator::new();
        view.begin_assistant();
        for delta in deltas {
            acc.append(delta).unwrap();
            view.update_assistant(&acc.display_text());
        }
        acc
    }

    #[test]
    fn test_split_marker_is_never_printed() {
        let mut view = TerminalView::new(false);
        let mut acc = StreamAccumulator::new();
        view.begin_assistant();

        acc.append("Olá!\n[").unwrap();
        view.update_assistant(&acc.display_text());
        assert_eq!(view.printed, "Olá!");

        acc.append("SUGG").unwrap();
        view.update_assistant(&acc.display_text());
        assert_eq!(view.printed, "Olá!");

        acc.append("ESTIONS]\n\"Q\"").unwrap();
        view.update_assistant(&acc.display_text());
        assert_eq!(view.printed, "Olá!");
    }

    #[test]
    fn test_bracket_that_is_not_a_marker_is_printed_later() {
        let mut view = TerminalView::new(false);
        let acc = streamed(&mut view, &["See [", "docs] ", "here"]);
        assert_eq!(view.printed, "See [docs] here");
        assert_eq!(acc.display_text(), "See [docs] here");
    }

    #[test]
    fn test_held_back_tail_is_printed_when_reply_ends() {
        let mut view = TerminalView::new(false);
        let acc = streamed(&mut view, &["Array index a[", "S"]);
        assert_eq!(view.printed, "Array index a");
        view.print_extension(&acc.display_text(), true);
        assert_eq!(view.printed, "Array index a[S");
    }

    #[test]
    fn test_renders_lists_with_numbers_and_bullets() {
        let rendered = plain("Steps:\n\n1. one\n2. two\n\n- a\n- b\n");
        assert!(rendered.contains("1. one"));
        assert!(rendered.contains("2. two"));
        assert!(rendered.contains("• a"));
        assert!(rendered.contains("• b"));
    }

    #[test]
    fn test_renders_headings_and_paragraphs() {
        let rendered = plain("# Title\n\nFirst paragraph.\n\nSecond **bold** one.");
        assert!(rendered.starts_with("# Title\n"));
        assert!(rendered.contains("\n\nFirst paragraph.\n"));
        assert!(rendered.contains("Second bold one."));
    }

    #[test]
    fn test_code_block_keeps_its_text() {
        let rendered = plain("```rust\nfn main() {}\n```\n");
        assert!(rendered.contains("rust"));
        assert!(rendered.contains("main"));
    }

    #[test]
    fn test_links_show_their_target() {
        let rendered = plain("See [docs](https://example.com).");
        assert!(rendered.contains("docs (https://example.com)."));
    }
}
