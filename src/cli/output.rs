//! CLI output formatting utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print an answer followed by its sources.
    ///
    /// Sources may be HTML anchors; the terminal shows them as `label (url)`.
    pub fn answer(answer: &str, sources: &[String]) {
        println!("\n{}\n", answer);
        if sources.is_empty() {
            return;
        }
        println!("{}", style("Sources:").bold());
        for source in sources {
            println!("  {} {}", style("-").dim(), plain_source(source));
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Render an anchor source as `label (href)`; plain labels pass through.
fn plain_source(source: &str) -> String {
    let anchor = Regex::new(r#"^<a href="([^"]*)"[^>]*>(.*)</a>$"#).expect("Invalid regex");
    match anchor.captures(source) {
        Some(caps) => format!("{} ({})", unescape(&caps[2]), unescape(&caps[1])),
        None => source.to_string(),
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
