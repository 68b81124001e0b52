//! `ctscan scan`: drive a set of cities through the full discovery flow.

use std::sync::Arc;

use anyhow::Context;
use ctscan_core::{AppConfig, City};
use ctscan_discovery::{CancelFlag, CityProcess, DiscoveryCoordinator, ProcessStatus};
use ctscan_gemini::GeminiClient;
use futures::stream::{self, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::{broadcast, Mutex};

use crate::output;
use crate::ScanArgs;

/// How one city's run ended, as seen by the driver.
enum CityOutcome {
    Finished(CityProcess),
    Skipped,
    Err(anyhow::Error),
}

pub(crate) async fn run(config: &AppConfig, args: &ScanArgs) -> anyhow::Result<()> {
    let cities = ctscan_core::load_cities(&args.file)?;
    let selected = select_cities(cities, &args.cities, args.limit)?;
    if selected.is_empty() {
        anyhow::bail!("no cities selected");
    }

    let client = Arc::new(GeminiClient::from_config(config)?);
    let location = args.location.or_configured(config.location);
    let coordinator = Arc::new(DiscoveryCoordinator::new(
        client.clone(),
        client,
        location,
    ));
    coordinator.load(&selected);

    let interrupted = CancelFlag::new();
    let interrupt_watcher = tokio::spawn(watch_interrupts(
        Arc::clone(&coordinator),
        interrupted.clone(),
    ));
    let progress = (!args.json).then(|| tokio::spawn(report_progress(coordinator.subscribe())));

    let prompt_lock = Mutex::new(BufReader::new(tokio::io::stdin()));
    let max_concurrent = config.max_concurrent_cities.max(1);
    let auto_confirm = args.yes;

    let outcomes: Vec<(String, CityOutcome)> = stream::iter(coordinator.list())
        .map(|process| {
            let coordinator = Arc::clone(&coordinator);
            let interrupted = interrupted.clone();
            let prompt_lock = &prompt_lock;
            async move {
                let outcome = drive_city(
                    &coordinator,
                    &process.id,
                    auto_confirm,
                    &interrupted,
                    prompt_lock,
                )
                .await;
                (process.id, outcome)
            }
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    interrupt_watcher.abort();
    if let Some(progress) = progress {
        progress.abort();
    }

    let mut failed = 0usize;
    let mut skipped = 0usize;
    for (city, outcome) in &outcomes {
        match outcome {
            CityOutcome::Finished(process) if process.status == ProcessStatus::Error => {
                failed += 1;
            }
            CityOutcome::Finished(_) => {}
            CityOutcome::Skipped => skipped += 1,
            CityOutcome::Err(e) => {
                tracing::error!(city = %city, error = %e, "unexpected error scanning city");
                failed += 1;
            }
        }
    }

    let report = coordinator.list();
    let centers: usize = report.iter().map(|p| p.centers.len()).sum();
    tracing::info!(
        cities = report.len(),
        failed,
        skipped,
        centers,
        "scan finished"
    );

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize results")?
        );
    } else {
        output::print_report(&report);
    }
    Ok(())
}

/// Filter by name (case-insensitive, file order kept), then cap at `limit`.
pub(crate) fn select_cities(
    cities: Vec<City>,
    names: &[String],
    limit: Option<usize>,
) -> anyhow::Result<Vec<City>> {
    let mut selected = if names.is_empty() {
        cities
    } else {
        if let Some(missing) = names
            .iter()
            .find(|n| !cities.iter().any(|c| c.name.eq_ignore_ascii_case(n)))
        {
            anyhow::bail!("city '{missing}' is not in the file");
        }
        cities
            .into_iter()
            .filter(|c| names.iter().any(|n| c.name.eq_ignore_ascii_case(n)))
            .collect()
    };
    if let Some(limit) = limit {
        selected.truncate(limit);
    }
    Ok(selected)
}

/// `y`/`yes` in any case proceeds; everything else declines.
pub(crate) fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

async fn drive_city(
    coordinator: &DiscoveryCoordinator,
    id: &str,
    auto_confirm: bool,
    interrupted: &CancelFlag,
    prompt_lock: &Mutex<BufReader<Stdin>>,
) -> CityOutcome {
    if interrupted.is_cancelled() {
        return CityOutcome::Skipped;
    }
    if let Err(e) = coordinator.start(id) {
        return CityOutcome::Err(e.into());
    }
    let Some(found) = coordinator.join(id).await else {
        return CityOutcome::Skipped;
    };
    if found.status != ProcessStatus::AwaitingConfirmation {
        return CityOutcome::Finished(found);
    }

    let proceed = if interrupted.is_cancelled() {
        false
    } else if auto_confirm {
        true
    } else {
        match ask_to_proceed(&found, prompt_lock).await {
            Ok(answer) => answer && !interrupted.is_cancelled(),
            Err(e) => return CityOutcome::Err(e),
        }
    };

    let result = if proceed {
        coordinator.confirm(id).map(|_| ())
    } else {
        tracing::info!(city = %id, "center scan declined");
        coordinator.reject(id).map(|_| ())
    };
    if let Err(e) = result {
        return CityOutcome::Err(e.into());
    }

    match coordinator.join(id).await {
        Some(process) => CityOutcome::Finished(process),
        None => CityOutcome::Skipped,
    }
}

/// Prompts are serialized so concurrent cities never interleave questions.
async fn ask_to_proceed(
    process: &CityProcess,
    stdin: &Mutex<BufReader<Stdin>>,
) -> anyhow::Result<bool> {
    let mut stdin = stdin.lock().await;
    let mut stderr = tokio::io::stderr();
    stderr
        .write_all(
            format!(
                "{}: {}. Scan them for centers? [y/N] ",
                process.name,
                process.status_text()
            )
            .as_bytes(),
        )
        .await?;
    stderr.flush().await?;

    let mut line = String::new();
    stdin
        .read_line(&mut line)
        .await
        .context("failed to read answer from stdin")?;
    Ok(is_affirmative(&line))
}

/// First Ctrl-C stops every running city; a second one exits immediately.
async fn watch_interrupts(coordinator: Arc<DiscoveryCoordinator>, interrupted: CancelFlag) {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("could not listen for ctrl-c; interrupts will not stop the scan");
        return;
    }
    tracing::warn!("interrupt received; stopping all cities (press ctrl-c again to quit)");
    interrupted.cancel();
    coordinator.stop_all();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(130);
    }
}

async fn report_progress(mut events: broadcast::Receiver<CityProcess>) {
    let mut last: Option<(String, ProcessStatus)> = None;
    loop {
        match events.recv().await {
            Ok(update) => {
                let key = (update.id.clone(), update.status);
                if update.status == ProcessStatus::ScanningCenters || last.as_ref() != Some(&key) {
                    eprintln!(
                        "[{}] {} ({:.0}%)",
                        update.name,
                        update.status_text(),
                        update.progress() * 100.0
                    );
                }
                last = Some(key);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress reporter lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
