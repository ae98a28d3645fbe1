//! `trialbench run`: drive a full screening session in the terminal.
//!
//! The terminal stands in for the subject-facing UI: choice trials are
//! answered by number, speech trials by a typed "transcript" line. Session
//! fetch failures offer an explicit retry that restarts the whole test, and
//! speech failures offer the manual override, matching the engine's
//! recovery model.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use console::{style, Term};
use tracing::warn;

use crate::cli::output::{format_evaluation, format_handwriting, format_scorecard};
use crate::domain::errors::SessionError;
use crate::domain::models::{Config, Phase, TestId, Trial};
use crate::infrastructure::speech::{SpeechCaptureAdapter, StdinSpeechBackend};
use crate::services::ScreeningRun;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to a config file (default: trialbench.yaml + TRIALBENCH_* env).
    /// Loaded by the entry point before logging is set up.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip the audio discrimination stage
    #[arg(long)]
    pub skip_audio: bool,

    /// Skip the reading-aloud stage
    #[arg(long)]
    pub skip_reading: bool,

    /// Handwriting sample image to analyze
    #[arg(long)]
    pub handwriting: Option<PathBuf>,
}

pub async fn execute(args: RunArgs, config: Config, json: bool) -> Result<()> {
    let run = ScreeningRun::new(config).context("Failed to initialize screening run")?;
    let term = Term::stdout();

    if !args.skip_reading {
        run_stage(&run, &term, TestId::Reading).await?;
    }
    if !args.skip_audio {
        run_stage(&run, &term, TestId::Audio).await?;
    }

    if let Some(path) = &args.handwriting {
        let image = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read handwriting sample {}", path.display()))?;
        let filename = path
            .file_name()
            .map_or_else(|| "sample.png".to_string(), |n| n.to_string_lossy().into_owned());
        let report = run
            .submit_handwriting(image, &filename)
            .await
            .context("Handwriting analysis failed")?;
        if !json {
            println!("{}", format_handwriting(&report));
        }
    }

    let result = run.evaluate().await.context("Final evaluation failed")?;
    let (audio, reading) = run.aggregator().snapshot().await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "run_id": run.aggregator().run_id(),
                "started_at": run.aggregator().started_at(),
                "audio": audio,
                "reading": reading,
                "handwriting": run.aggregator().handwriting().await,
                "evaluation": result,
            }))?
        );
    } else {
        println!("\n{}", format_scorecard(&audio, &reading));
        println!("{}", format_evaluation(&result));
    }

    Ok(())
}

/// Run one test stage to completion, restarting on fetch failure if the
/// operator asks for it.
async fn run_stage(run: &ScreeningRun, term: &Term, test: TestId) -> Result<()> {
    println!(
        "\n{} {}",
        style("Starting stage:").bold(),
        style(test.to_string()).cyan()
    );

    let mut session = loop {
        match run.begin_test(test).await {
            Ok(session) => break session,
            Err(err) => {
                if !offer_retry(term, &err)? {
                    warn!(test = %test, "stage skipped by operator");
                    return Ok(());
                }
            }
        }
    };

    let adapter = match test {
        TestId::Reading => Some(
            SpeechCaptureAdapter::new(
                Arc::new(StdinSpeechBackend::new()),
                &run.config().speech,
            )
            .context("Speech capture is unavailable; reading test cannot run")?,
        ),
        TestId::Audio => None,
    };

    while session.phase() != Phase::Finished {
        let current = session.current_trial().cloned();
        let result = match (&adapter, current) {
            (Some(adapter), Some(Trial::Speech(trial))) => {
                println!(
                    "Read aloud: {}  {}",
                    style(trial.display()).bold().underlined(),
                    style("(type what was heard, empty = no speech)").dim()
                );
                match adapter.listen_once().await {
                    Some(Ok(transcript)) => session.submit_transcript(&transcript).await,
                    Some(Err(kind)) => {
                        println!("Speech capture failed ({kind}).");
                        let verdict = prompt_yes_no(term, "Mark this trial correct?")?;
                        session.submit_manual(verdict).await
                    }
                    // Should not happen in this single-driver loop.
                    None => continue,
                }
            }
            (_, Some(Trial::Choice(trial))) => {
                println!("Which word was played for {}?", style(&trial.stimulus_key).dim());
                for (i, option) in trial.options.iter().enumerate() {
                    println!("  {}. {option}", i + 1);
                }
                let choice = prompt_index(term, trial.options.len())?;
                session.submit_choice(&trial.options[choice]).await
            }
            (_, None) => break,
            (None, Some(Trial::Speech(_))) => {
                anyhow::bail!("backend served a speech trial in the audio stage")
            }
        };

        match result {
            Ok(_) => {}
            Err(err @ SessionError::Network(_)) => {
                if offer_retry(term, &err)? {
                    session.restart().await.context("Session restart failed")?;
                } else {
                    warn!(test = %test, "stage abandoned after fetch failure");
                    return Ok(());
                }
            }
            Err(err) => return Err(err.into()),
        }
    }

    println!(
        "{} {} ({} trials)",
        style("Stage complete:").green(),
        test,
        session.completed_count()
    );
    Ok(())
}

fn offer_retry(term: &Term, err: &SessionError) -> Result<bool> {
    println!("{} {err}", style("stage error:").red());
    prompt_yes_no(term, "Retry this test from the beginning?")
}

fn prompt_yes_no(term: &Term, question: &str) -> Result<bool> {
    loop {
        println!("{question} [y/n]");
        let line = term.read_line().context("Failed to read input")?;
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("Please answer y or n."),
        }
    }
}

fn prompt_index(term: &Term, len: usize) -> Result<usize> {
    loop {
        println!("Answer [1-{len}]:");
        let line = term.read_line().context("Failed to read input")?;
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=len).contains(&n) => return Ok(n - 1),
            _ => println!("Please enter a number between 1 and {len}."),
        }
    }
}
