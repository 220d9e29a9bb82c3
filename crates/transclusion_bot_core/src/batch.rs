use std::thread::sleep;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::api::WikiSession;
use crate::auth::require_bot_rights;
use crate::discovery::discover;
use crate::error::BotResult;
use crate::submit::{EditOutcome, RewriteResult, SubmitOptions, submit};
use crate::template::TemplateName;
use crate::transform::TextTransformer;

/// Pause before every edit submission, including the first.
pub const EDIT_DELAY: Duration = Duration::from_millis(1_500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub force_bot_check: bool,
    pub mark_as_bot: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force_bot_check: false,
            mark_as_bot: true,
        }
    }
}

/// Suspension point used for edit pacing.
pub trait Pacer {
    fn pause(&mut self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleepPacer;

impl Pacer for ThreadSleepPacer {
    fn pause(&mut self, delay: Duration) {
        sleep(delay);
    }
}

/// Discover, rewrite and submit every page transcluding `template`, one at a
/// time. Per-page failures are collected; only the bot check and discovery
/// can end the run early.
pub fn run<S: WikiSession>(
    session: &S,
    template: &TemplateName,
    options: RunOptions,
) -> BotResult<Vec<EditOutcome>> {
    run_with_pacer(session, template, options, &mut ThreadSleepPacer)
}

pub fn run_with_pacer<S: WikiSession, P: Pacer>(
    session: &S,
    template: &TemplateName,
    options: RunOptions,
    pacer: &mut P,
) -> BotResult<Vec<EditOutcome>> {
    if options.force_bot_check {
        require_bot_rights(session)?;
    }

    let pages = discover(session, template)?;
    let transformer = TextTransformer::new(template);
    let submit_options = SubmitOptions {
        mark_as_bot: options.mark_as_bot,
    };

    let total = pages.len();
    info!("now editing {total} pages");
    let mut outcomes = Vec::with_capacity(total);
    for (index, page) in pages.into_iter().enumerate() {
        pacer.pause(EDIT_DELAY);
        let rewrite = RewriteResult::new(page, &transformer);
        let outcome = submit(session, &rewrite, submit_options);
        info!(
            "[{}/{total}] {} {}",
            index + 1,
            outcome.title,
            if outcome.succeeded { "ok" } else { "failed" }
        );
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub template: String,
    pub discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub request_count: usize,
    pub outcomes: Vec<EditOutcome>,
}

impl BatchReport {
    pub fn new(template: &TemplateName, outcomes: Vec<EditOutcome>, request_count: usize) -> Self {
        let succeeded = outcomes.iter().filter(|outcome| outcome.succeeded).count();
        Self {
            template: template.as_str().to_string(),
            discovered: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            request_count,
            outcomes,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &EditOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.succeeded)
    }
}
