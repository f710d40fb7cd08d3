//! `plx research` command
//!
//! Long-running deep-research jobs over the async submit/poll/fetch API.
//!
//! # Usage
//! ```bash
//! plx research start "history of the transistor"
//! plx research "topic"              # shorthand for start
//! plx research start "topic" --no-wait
//! plx research status <id>
//! plx research get <id> -o report.md
//! ```
//!
//! The poll loop is single-threaded and cooperative: it sleeps for the
//! poll interval between status checks. A timeout is an early return with
//! guidance, not a failure; the job keeps running remotely.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use chrono::{Local, TimeZone};
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::output;
use crate::remote::types::{AsyncJob, ChatRequest, JobStatus, Message};
use crate::remote::{Client, JobSource};

use super::options::ResearchOptions;
use super::utils::require_api_key;
use super::Context;

const RESEARCH_MODEL: &str = "sonar-deep-research";

#[derive(Args, Debug)]
pub struct ResearchArgs {
    #[command(subcommand)]
    pub command: ResearchCommands,
}

#[derive(Subcommand, Debug)]
pub enum ResearchCommands {
    /// Start a deep research task
    Start {
        /// Research topic
        topic: String,

        /// Polling interval in seconds
        #[arg(long, default_value_t = 10, value_name = "SECONDS")]
        poll_interval: u64,

        /// Max wait time in minutes
        #[arg(long, default_value_t = 30, value_name = "MINUTES")]
        timeout: u64,

        /// Submit and return the request id without waiting
        #[arg(long)]
        no_wait: bool,

        /// Save the report to a file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check status of a research request
    Status {
        /// Request id
        id: String,
    },

    /// Get the result of a completed research request
    Get {
        /// Request id
        id: String,

        /// Save the report to a file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(args: ResearchArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ResearchCommands::Start {
            topic,
            poll_interval,
            timeout,
            no_wait,
            output,
            json,
        } => {
            let opts = ResearchOptions {
                poll_interval: Duration::from_secs(poll_interval.max(1)),
                timeout: Duration::from_secs(timeout * 60),
                wait: !no_wait,
                output,
                json,
            };
            start(&topic, opts, ctx).await
        }
        ResearchCommands::Status { id } => status(&id, ctx).await,
        ResearchCommands::Get { id, output, json } => get(&id, output, json, ctx).await,
    }
}

async fn start(topic: &str, opts: ResearchOptions, ctx: &Context) -> Result<()> {
    let api_key = require_api_key(ctx)?;
    let client = Client::new(&api_key)?;

    eprintln!("⏳ Submitting research request...");
    let request = ChatRequest::new(RESEARCH_MODEL, vec![Message::user(topic)]);
    let job = client.submit_job(&request).await?;

    println!("{} {}", "Research ID:".cyan(), job.id.yellow());
    println!("{}", format!("Status: {}", job.status).dimmed());

    if !opts.wait {
        println!();
        println!(
            "{} plx research status {}",
            "Check status with:".dimmed(),
            job.id
        );
        println!(
            "{} plx research get {}",
            "Get result with:".dimmed(),
            job.id
        );
        return Ok(());
    }

    println!();
    match poll_job(&client, &job.id, opts.poll_interval, opts.timeout).await? {
        PollResult::Completed(job) => render_report(&job, opts.output.as_deref(), opts.json),
        PollResult::Failed { message } => {
            anyhow::bail!("Research failed: {message}")
        }
        PollResult::TimedOut { waited } => {
            output::print_warning(&format!(
                "Research timed out after {} minutes. The job may still complete.",
                waited.as_secs() / 60
            ));
            println!(
                "{} plx research status {}",
                "Check later with:".dimmed(),
                job.id
            );
            Ok(())
        }
    }
}

async fn status(id: &str, ctx: &Context) -> Result<()> {
    let api_key = require_api_key(ctx)?;
    let client = Client::new(&api_key)?;

    let job = client.job(id).await?;

    println!("{}", "Research Status:".cyan());
    println!("  {} {}", "ID:".white(), job.id);
    println!("  {} {}", "Status:".white(), job.status.to_string().yellow());

    if let Some(ts) = job.created_at {
        println!("  {} {}", "Created:".white(), format_epoch_secs(ts));
    }
    if let Some(ts) = job.completed_at {
        println!("  {} {}", "Completed:".white(), format_epoch_secs(ts));
    }

    Ok(())
}

async fn get(id: &str, output: Option<PathBuf>, json: bool, ctx: &Context) -> Result<()> {
    let api_key = require_api_key(ctx)?;
    let client = Client::new(&api_key)?;

    let job = client.job(id).await?;

    if job.status != JobStatus::Completed {
        output::print_warning(&format!(
            "Research is not yet complete. Status: {}",
            job.status
        ));
        return Ok(());
    }

    render_report(&job, output.as_deref(), json)
}

fn render_report(job: &AsyncJob, output: Option<&std::path::Path>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(job)?);
        return Ok(());
    }

    let Some(response) = &job.response else {
        output::print_warning("Research completed but no response was returned.");
        return Ok(());
    };

    let text = response.text();
    println!("{}", "Research Report:\n".cyan());
    println!("{}", text.white());

    output::print_citations(
        response.citations.as_deref(),
        response.search_results.as_deref(),
    );

    if let Some(path) = output {
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        output::print_success(&format!("Report saved to {}", path.display()));
    }

    Ok(())
}

fn format_epoch_secs(secs: i64) -> String {
    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}

// ---- Poll loop ----

/// Terminal outcome of polling a job.
#[derive(Debug)]
pub enum PollResult {
    Completed(Box<AsyncJob>),
    Failed { message: String },
    TimedOut { waited: Duration },
}

/// One step of the poll state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Running,
    Completed,
    Failed,
    TimedOut,
}

/// Decide the next transition. Terminal statuses win over the timeout:
/// a job that is already COMPLETED or FAILED is reported as such even if
/// the deadline passed during the last wait.
pub fn next_transition(status: JobStatus, elapsed: Duration, timeout: Duration) -> Transition {
    match status {
        JobStatus::Completed => Transition::Completed,
        JobStatus::Failed => Transition::Failed,
        _ if elapsed >= timeout => Transition::TimedOut,
        _ => Transition::Running,
    }
}

/// Poll until the job reaches a terminal state or the timeout elapses.
pub async fn poll_job<S: JobSource + Sync>(
    source: &S,
    id: &str,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<PollResult> {
    let start = Instant::now();

    loop {
        tokio::time::sleep(poll_interval).await;

        let job = source.job_status(id).await?;
        let elapsed = start.elapsed();
        tracing::debug!(%id, status = %job.status, elapsed_secs = elapsed.as_secs(), "poll");

        match next_transition(job.status, elapsed, timeout) {
            Transition::Completed => return Ok(PollResult::Completed(Box::new(job))),
            Transition::Failed => {
                let message = job
                    .error_message
                    .unwrap_or_else(|| "no failure reason given".to_string());
                return Ok(PollResult::Failed { message });
            }
            Transition::TimedOut => return Ok(PollResult::TimedOut { waited: elapsed }),
            Transition::Running => {
                eprintln!(
                    "⏳ Researching... ({}s elapsed)",
                    elapsed.as_secs()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ApiError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn terminal_statuses_beat_the_timeout() {
        let m = Duration::from_secs(60);

        assert_eq!(
            next_transition(JobStatus::Completed, m * 2, m),
            Transition::Completed
        );
        assert_eq!(
            next_transition(JobStatus::Failed, m * 2, m),
            Transition::Failed
        );
    }

    #[test]
    fn running_until_deadline_then_timed_out() {
        let m = Duration::from_secs(60);

        assert_eq!(
            next_transition(JobStatus::InProgress, Duration::from_secs(10), m),
            Transition::Running
        );
        assert_eq!(
            next_transition(JobStatus::Created, Duration::from_secs(10), m),
            Transition::Running
        );
        assert_eq!(
            next_transition(JobStatus::InProgress, m, m),
            Transition::TimedOut
        );
        assert_eq!(
            next_transition(JobStatus::Unknown, m * 3, m),
            Transition::TimedOut
        );
    }

    /// Scripted job source: returns statuses in order, repeating the last.
    struct Script {
        statuses: Mutex<Vec<JobStatus>>,
    }

    impl Script {
        fn new(statuses: &[JobStatus]) -> Self {
            let mut list: Vec<_> = statuses.to_vec();
            list.reverse();
            Self {
                statuses: Mutex::new(list),
            }
        }
    }

    #[async_trait]
    impl JobSource for Script {
        async fn job_status(&self, id: &str) -> Result<AsyncJob, ApiError> {
            let mut statuses = self.statuses.lock().unwrap();
            let status = if statuses.len() > 1 {
                statuses.pop().unwrap()
            } else {
                *statuses.last().unwrap()
            };

            Ok(AsyncJob {
                id: id.to_string(),
                status,
                created_at: None,
                completed_at: None,
                error_message: match status {
                    JobStatus::Failed => Some("model unavailable".to_string()),
                    _ => None,
                },
                response: None,
            })
        }
    }

    #[tokio::test]
    async fn polls_until_completed() {
        let source = Script::new(&[
            JobStatus::Created,
            JobStatus::InProgress,
            JobStatus::Completed,
        ]);

        let result = poll_job(
            &source,
            "job-1",
            Duration::from_millis(1),
            Duration::from_secs(60),
        )
        .await
        .unwrap();

        assert!(matches!(result, PollResult::Completed(_)));
    }

    #[tokio::test]
    async fn failed_job_reports_remote_reason() {
        let source = Script::new(&[JobStatus::InProgress, JobStatus::Failed]);

        let result = poll_job(
            &source,
            "job-2",
            Duration::from_millis(1),
            Duration::from_secs(60),
        )
        .await
        .unwrap();

        match result {
            PollResult::Failed { message } => assert_eq!(message, "model unavailable"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_job_times_out_without_erroring() {
        let source = Script::new(&[JobStatus::InProgress]);

        let result = poll_job(
            &source,
            "job-3",
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
        .await
        .unwrap();

        assert!(matches!(result, PollResult::TimedOut { .. }));
    }
}
