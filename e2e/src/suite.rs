//! Case registry plumbing and the sequential suite run

use colored::Colorize;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use crate::types::{Provider, SharedBackendState, TestResult};

type CaseFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A named e2e case
pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    pub run: Box<dyn Fn(TestContext) -> CaseFuture + Send + Sync>,
}

/// What a case gets: where the relay listens and the mock providers behind it
#[derive(Clone)]
pub struct TestContext {
    pub relay_addr: String,
    pub backend_state: SharedBackendState,
    pub http_client: reqwest::Client,
}

pub struct Suite {
    cases: Vec<TestCase>,
}

impl Suite {
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self { cases }
    }

    pub fn list(&self) {
        println!("\n{}", "Available tests:".bright_white().bold());
        for case in &self.cases {
            println!("  {} - {}", case.name.bright_cyan(), case.description);
        }
        println!();
    }

    /// Run matching cases one at a time against a fresh set of provider queues
    ///
    /// A case that leaves queued responses behind fails: the relay skipped a
    /// provider call the case expected it to make.
    pub async fn run(&self, ctx: &TestContext, filter: Option<&str>) -> Vec<TestResult> {
        let selected: Vec<&TestCase> = self
            .cases
            .iter()
            .filter(|c| filter.map_or(true, |f| c.name.contains(f)))
            .collect();

        print_header(ctx, selected.len());

        let mut results = Vec::with_capacity(selected.len());
        for case in selected {
            ctx.backend_state.lock().unwrap().reset();

            print!("  {} {} ... ", "▶".bright_blue(), case.name.bright_white());
            let start = Instant::now();
            let outcome = (case.run)(ctx.clone()).await;
            let elapsed = start.elapsed().as_millis();

            let (unused, provider_calls) = {
                let mut state = ctx.backend_state.lock().unwrap();
                (state.unused_responses(), state.request_counts())
            };

            let error = match outcome {
                Err(e) => Some(format!("{:#}", e)),
                Ok(()) if !unused.is_empty() => Some(format!("relay never consumed {}", describe_unused(&unused))),
                Ok(()) => None,
            };

            match &error {
                None => println!("{} ({elapsed}ms) {}", "PASS".bright_green().bold(), calls_note(&provider_calls)),
                Some(e) => {
                    println!("{} ({elapsed}ms)", "FAIL".bright_red().bold());
                    println!("    {} {}", "Error:".bright_red(), e);
                }
            }

            results.push(TestResult {
                name: case.name,
                error,
                provider_calls,
            });
        }

        print_summary(&results);
        results
    }
}

fn print_header(ctx: &TestContext, count: usize) {
    let rule = "═══════════════════════════════════════════════════".bright_blue();
    println!("\n{}", rule);
    println!("{}", "  chat-relay End-to-End Tests".bright_white().bold());
    println!("{}", rule);
    println!("  Relay:   {}", ctx.relay_addr.bright_cyan());
    for provider in Provider::ALL {
        println!("  Mock:    {:<10} {}", provider.label(), provider.route().dimmed());
    }
    println!("  Running: {} test(s)\n", count.to_string().bright_cyan());
}

fn print_summary(results: &[TestResult]) {
    let failed = results.iter().filter(|r| !r.passed()).count();
    let passed = results.len() - failed;

    let mut totals = [0usize; 3];
    for result in results {
        for (total, calls) in totals.iter_mut().zip(result.provider_calls) {
            *total += calls;
        }
    }

    println!("\n{}", "───────────────────────────────────────────────────".bright_blue());
    let summary = format!("  Results: {} passed, {} failed", passed, failed);
    if failed == 0 {
        println!("{}", summary.bright_green().bold());
    } else {
        println!("{}", summary.bright_red().bold());
        for result in results.iter().filter(|r| !r.passed()) {
            println!("    {} {}", "✗".bright_red(), result.name);
        }
    }
    println!("  Provider calls: {}", calls_note(&totals));
    println!("{}\n", "═══════════════════════════════════════════════════".bright_blue());
}

/// e.g. `completion=1 search=2`; providers that were not called are left out
fn calls_note(calls: &[usize; 3]) -> String {
    Provider::ALL
        .iter()
        .zip(calls)
        .filter(|(_, n)| **n > 0)
        .map(|(p, n)| format!("{}={}", p.label(), n))
        .collect::<Vec<_>>()
        .join(" ")
        .dimmed()
        .to_string()
}

fn describe_unused(unused: &[(Provider, usize)]) -> String {
    unused
        .iter()
        .map(|(p, n)| format!("{} queued {} response(s)", n, p.label()))
        .collect::<Vec<_>>()
        .join(", ")
}
