//! `plx query` command
//!
//! Sends one chat completion (streaming by default), renders the answer
//! with citations, and persists to history. With `--continue` or
//! `--thread` the exchange is appended to a conversation thread.
//!
//! # Usage
//! ```bash
//! plx query "What is Rust?"
//! plx "What is Rust?"                      # implicit query
//! plx query "..." --no-stream --related
//! plx query "..." --domain docs.rs --exclude-domain reddit.com
//! plx query "follow-up" --continue
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use futures::StreamExt;

use crate::output;
use crate::remote::types::{
    ChatRequest, ContextSize, Image, Message, Recency, ReasoningEffort, SearchMode, SearchResult,
    Usage, WebSearchOptions,
};
use crate::remote::Client;
use crate::store::{HistoryStore, ThreadStore};

use super::options::{tri, QueryOptions};
use super::utils::require_api_key;
use super::Context;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Be precise and concise.";

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// The question to ask
    pub question: String,

    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Stream the response in real time (default)
    #[arg(short, long, overrides_with = "no_stream")]
    pub stream: bool,

    /// Wait for the complete response instead of streaming
    #[arg(long, overrides_with = "stream")]
    pub no_stream: bool,

    /// Save the response to a file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Search mode
    #[arg(long, value_enum)]
    pub search_mode: Option<SearchMode>,

    /// Only use sources from this recency window
    #[arg(long, value_enum)]
    pub recency: Option<Recency>,

    /// Only results published after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub after: Option<String>,

    /// Only results published before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub before: Option<String>,

    /// Restrict search to these domains (repeatable)
    #[arg(long = "domain", value_name = "DOMAIN")]
    pub domains: Vec<String>,

    /// Exclude these domains (repeatable)
    #[arg(long = "exclude-domain", value_name = "DOMAIN")]
    pub exclude_domains: Vec<String>,

    /// Include images in the response
    #[arg(long)]
    pub images: bool,

    /// Show related questions
    #[arg(long)]
    pub related: bool,

    /// Reasoning effort
    #[arg(long, value_enum)]
    pub reasoning: Option<ReasoningEffort>,

    /// Search context size
    #[arg(long, value_enum)]
    pub context_size: Option<ContextSize>,

    /// Preferred response language (e.g. en)
    #[arg(long, value_name = "CODE")]
    pub language: Option<String>,

    /// Custom system prompt
    #[arg(long, value_name = "PROMPT")]
    pub system: Option<String>,

    /// Print the full API response as JSON (implies --no-stream)
    #[arg(long)]
    pub json: bool,

    /// Show citations (default)
    #[arg(long, overrides_with = "no_citations")]
    pub citations: bool,

    /// Hide citations
    #[arg(long, overrides_with = "citations")]
    pub no_citations: bool,

    /// Enable web search (default)
    #[arg(long, overrides_with = "no_search")]
    pub search: bool,

    /// Answer from model knowledge only, without web search
    #[arg(long, overrides_with = "search")]
    pub no_search: bool,

    /// Enable safe-search filtering
    #[arg(long, overrides_with = "no_safe_search")]
    pub safe_search: bool,

    /// Disable safe-search filtering
    #[arg(long, overrides_with = "safe_search")]
    pub no_safe_search: bool,

    /// Output raw text without formatting
    #[arg(long)]
    pub raw: bool,

    /// Continue the most recent conversation
    #[arg(short = 'c', long = "continue")]
    pub continue_last: bool,

    /// Continue a specific thread
    #[arg(short = 't', long, value_name = "ID")]
    pub thread: Option<String>,
}

impl QueryArgs {
    pub fn stream_flag(&self) -> Option<bool> {
        tri(self.stream, self.no_stream)
    }

    pub fn citations_flag(&self) -> Option<bool> {
        tri(self.citations, self.no_citations)
    }

    pub fn search_flag(&self) -> Option<bool> {
        tri(self.search, self.no_search)
    }

    pub fn safe_search_flag(&self) -> Option<bool> {
        tri(self.safe_search, self.no_safe_search)
    }
}

/// Everything collected from one completion, streamed or not.
struct Answer {
    text: String,
    citations: Option<Vec<String>>,
    search_results: Option<Vec<SearchResult>>,
    related_questions: Option<Vec<String>>,
    images: Option<Vec<Image>>,
    usage: Option<Usage>,
}

pub async fn run(args: QueryArgs, ctx: &Context) -> Result<()> {
    let api_key = require_api_key(ctx)?;
    let opts = QueryOptions::resolve(&args, &ctx.settings, &ctx.env);
    let client = Client::new(&api_key)?;

    let threads = ThreadStore::new(&ctx.paths);
    let history = HistoryStore::new(&ctx.paths);

    // Thread continuation: --continue picks the latest thread, --thread a
    // specific one. A missing thread just starts a fresh conversation.
    let mut thread_id = if args.continue_last {
        threads.latest()
    } else {
        args.thread.clone()
    };
    let prior: Vec<Message> = thread_id
        .as_deref()
        .and_then(|id| threads.get(id))
        .map(|t| t.messages)
        .unwrap_or_default();

    let system = opts
        .system
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    let mut messages = Vec::with_capacity(prior.len() + 2);
    messages.push(Message::system(system));
    messages.extend(prior.iter().cloned());
    messages.push(Message::user(&args.question));

    let request = build_request(&opts, messages);

    let answer = if opts.stream && !opts.json {
        fetch_streaming(&client, request, &opts).await?
    } else {
        fetch_blocking(&client, request, &opts).await?
    };

    if !opts.json {
        if opts.citations {
            output::print_citations(
                answer.citations.as_deref(),
                answer.search_results.as_deref(),
            );
        }

        if opts.related {
            if let Some(questions) = &answer.related_questions {
                output::print_related_questions(questions);
            }
        }

        if opts.images {
            if let Some(images) = &answer.images {
                output::print_images(images);
            }
        }

        if let Some(usage) = &answer.usage {
            if !opts.raw {
                output::print_usage(usage);
            }
        }
    }

    if let Some(path) = &opts.output {
        fs::write(path, &answer.text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        output::print_success(&format!("Response saved to {}", path.display()));
    }

    history.append(
        &args.question,
        &opts.model,
        Some(answer.text.as_str()),
        answer.citations.as_ref().map(Vec::len),
    )?;

    if thread_id.is_some() || args.continue_last {
        let id = match thread_id.take() {
            Some(id) => id,
            None => threads.create(&opts.model)?,
        };

        let mut all = prior;
        all.push(Message::user(&args.question));
        all.push(Message::assistant(&answer.text));
        threads.save(&id, &opts.model, &all)?;
    }

    Ok(())
}

/// Translate resolved options into the wire request.
fn build_request(opts: &QueryOptions, messages: Vec<Message>) -> ChatRequest {
    let mut request = ChatRequest::new(&opts.model, messages);

    request.search_mode = opts.search_mode;
    request.search_recency_filter = opts.recency;
    request.search_after_date_filter = opts.after.clone();
    request.search_before_date_filter = opts.before.clone();
    request.reasoning_effort = opts.reasoning;

    // Includes first, then exclusions with a `-` prefix
    let mut domain_filter: Vec<String> = opts.domains.clone();
    domain_filter.extend(opts.exclude_domains.iter().map(|d| format!("-{d}")));
    if !domain_filter.is_empty() {
        request.search_domain_filter = Some(domain_filter);
    }

    if let Some(language) = &opts.language {
        request.search_language_filter = Some(vec![language.clone()]);
    }

    if opts.images {
        request.return_images = Some(true);
    }
    if opts.related {
        request.return_related_questions = Some(true);
    }
    if !opts.search {
        request.disable_search = Some(true);
    }
    if opts.safe_search {
        request.safe_search = Some(true);
    }

    if let Some(size) = opts.context_size {
        request.web_search_options = Some(WebSearchOptions {
            search_context_size: size,
        });
    }

    request
}

async fn fetch_streaming(
    client: &Client,
    mut request: ChatRequest,
    opts: &QueryOptions,
) -> Result<Answer> {
    request.stream = Some(true);

    if !opts.raw {
        output::print_header("Streaming response:\n");
    }

    let mut stream = client.chat_stream(&request).await?;

    let mut answer = Answer {
        text: String::new(),
        citations: None,
        search_results: None,
        related_questions: None,
        images: None,
        usage: None,
    };

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;

        if let Some(content) = chunk.content() {
            let display = if opts.citations {
                output::colorize_inline_citations(content)
            } else {
                content.to_string()
            };
            output::print_chunk(&display, opts.raw);
            answer.text.push_str(content);
        }

        // Metadata rides along on late chunks
        if chunk.citations.is_some() {
            answer.citations = chunk.citations;
        }
        if chunk.search_results.is_some() {
            answer.search_results = chunk.search_results;
        }
        if chunk.related_questions.is_some() {
            answer.related_questions = chunk.related_questions;
        }
        if chunk.usage.is_some() {
            answer.usage = chunk.usage;
        }
    }

    println!();
    Ok(answer)
}

async fn fetch_blocking(
    client: &Client,
    mut request: ChatRequest,
    opts: &QueryOptions,
) -> Result<Answer> {
    request.stream = Some(false);

    if !opts.raw && !opts.json {
        eprintln!("⏳ Thinking...");
    }

    let response = client.chat(&request).await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        if !opts.raw {
            output::print_header("Response:\n");
        }
        let text = response.text();
        let display = if opts.citations {
            output::colorize_inline_citations(text)
        } else {
            text.to_string()
        };
        output::print_response(&display, opts.raw);
    }

    Ok(Answer {
        text: response.text().to_string(),
        citations: response.citations.clone(),
        search_results: response.search_results.clone(),
        related_questions: response.related_questions.clone(),
        images: response.images.clone(),
        usage: response.usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Env, Settings};
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: QueryArgs,
    }

    fn opts_for(argv: &[&str]) -> QueryOptions {
        let mut full = vec!["plx"];
        full.extend(argv);
        let args = TestCli::parse_from(full).args;
        QueryOptions::resolve(&args, &Settings::default(), &Env::default())
    }

    #[test]
    fn domain_filter_merges_includes_and_exclusions() {
        let opts = opts_for(&[
            "q",
            "--domain",
            "docs.rs",
            "--domain",
            "rust-lang.org",
            "--exclude-domain",
            "reddit.com",
        ]);
        let req = build_request(&opts, vec![Message::user("q")]);

        assert_eq!(
            req.search_domain_filter.unwrap(),
            vec!["docs.rs", "rust-lang.org", "-reddit.com"]
        );
    }

    #[test]
    fn exclusions_alone_still_build_a_filter() {
        let opts = opts_for(&["q", "--exclude-domain", "pinterest.com"]);
        let req = build_request(&opts, vec![Message::user("q")]);

        assert_eq!(req.search_domain_filter.unwrap(), vec!["-pinterest.com"]);
    }

    #[test]
    fn no_search_sets_disable_search() {
        let opts = opts_for(&["q", "--no-search"]);
        let req = build_request(&opts, vec![Message::user("q")]);
        assert_eq!(req.disable_search, Some(true));

        let opts = opts_for(&["q"]);
        let req = build_request(&opts, vec![Message::user("q")]);
        assert_eq!(req.disable_search, None);
    }

    #[test]
    fn context_size_and_language_map_to_wire_fields() {
        let opts = opts_for(&["q", "--context-size", "high", "--language", "en"]);
        let req = build_request(&opts, vec![Message::user("q")]);

        assert_eq!(
            req.web_search_options.unwrap().search_context_size,
            ContextSize::High
        );
        assert_eq!(req.search_language_filter.unwrap(), vec!["en"]);
    }
}
