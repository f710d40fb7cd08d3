//! Console output formatting
//!
//! Colored rendering for responses, citations, search results, and status
//! messages. `raw` mode bypasses coloring so output can be piped.

use std::io::Write;

use colored::Colorize;

use crate::remote::types::{Image, SearchResult, Usage};

pub fn print_header(text: &str) {
    println!("{}", text.cyan());
}

pub fn print_response(text: &str, raw: bool) {
    if raw {
        print!("{text}");
    } else {
        println!("{}", text.white());
    }
}

/// Incremental streamed text; no trailing newline, flushed immediately.
pub fn print_chunk(text: &str, raw: bool) {
    if raw {
        print!("{text}");
    } else {
        print!("{}", text.white());
    }
    std::io::stdout().flush().ok();
}

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {message}").green());
}

pub fn print_warning(message: &str) {
    println!("{}", message.yellow());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

pub fn print_hint(message: &str) {
    eprintln!("{}", message.yellow());
}

pub fn print_detail(message: &str) {
    eprintln!("{}", message.dimmed());
}

pub fn print_usage(usage: &Usage) {
    println!(
        "\n{} {}",
        "Tokens:".dimmed(),
        format!(
            "{} prompt + {} completion = {} total",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        )
        .yellow()
    );
}

pub fn print_related_questions(questions: &[String]) {
    if questions.is_empty() {
        return;
    }
    println!();
    println!("{}", "Related questions:".cyan());
    for q in questions {
        println!("{}", format!("  - {q}").dimmed());
    }
    println!("{}", "\nRun any with: plx \"your question\"".dimmed());
}

pub fn print_images(images: &[Image]) {
    if images.is_empty() {
        return;
    }
    println!();
    println!("{}", "Images:".cyan());
    for img in images {
        if let Some(title) = &img.title {
            println!("{}", format!("  {title}").dimmed());
        }
        if let Some(url) = &img.url {
            println!("  {}", url.blue());
        }
    }
}

/// Numbered source list. When search-result metadata matches a citation
/// URL, the title is shown above the link.
pub fn print_citations(citations: Option<&[String]>, results: Option<&[SearchResult]>) {
    let Some(citations) = citations else { return };
    if citations.is_empty() {
        return;
    }

    println!();
    println!("{}", "Sources:".cyan());

    for (i, url) in citations.iter().enumerate() {
        let num = format!("[{}]", i + 1).cyan();
        let title = results
            .and_then(|rs| rs.iter().find(|r| &r.url == url))
            .and_then(|r| r.title.as_deref());

        match title {
            Some(title) => {
                println!("  {num} {}", title.white());
                println!("      {}", url.blue());
            }
            None => println!("  {num} {}", url.blue()),
        }
    }
}

/// Highlight inline `[n]` citation markers.
pub fn colorize_inline_citations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if ch != '[' {
            out.push(ch);
            continue;
        }

        // Scan for [digits]
        let rest = &text[start + 1..];
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        let closes = rest[digits.len()..].starts_with(']');

        if digits.is_empty() || !closes {
            out.push(ch);
            continue;
        }

        out.push_str(&format!("[{digits}]").cyan().to_string());
        for _ in 0..digits.len() + 1 {
            chars.next();
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test: the color override is process-global, so splitting
    // these would race under parallel test execution.
    #[test]
    fn inline_citation_markers_are_found_and_colored() {
        colored::control::set_override(false);
        assert_eq!(colorize_inline_citations("answer [1] and [23]."), "answer [1] and [23].");
        assert_eq!(colorize_inline_citations("no markers"), "no markers");
        assert_eq!(colorize_inline_citations("[not a citation]"), "[not a citation]");
        assert_eq!(colorize_inline_citations("open [ bracket"), "open [ bracket");
        assert_eq!(colorize_inline_citations("trailing [12"), "trailing [12");

        colored::control::set_override(true);
        let out = colorize_inline_citations("see [1]");
        assert!(out.contains("[1]"));
        assert!(out.contains('\u{1b}'));

        colored::control::unset_override();
    }
}
