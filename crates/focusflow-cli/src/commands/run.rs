use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use focusflow_core::storage::Database;
use focusflow_core::timer::SpawnedEffects;
use focusflow_core::{Config, Event, TimerDriver, TimerEngine, TimerHandle, TokioClock};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::effects::TerminalEffects;

const REDRAW_PERIOD: Duration = Duration::from_millis(250);
const BAR_WIDTH: usize = 24;

#[derive(Args)]
pub struct RunArgs {
    /// Apply this preset before starting (e.g. "Deep Work")
    #[arg(long)]
    preset: Option<String>,
    /// Start the first interval immediately
    #[arg(long)]
    now: bool,
    /// Print events as JSON lines instead of a status line
    #[arg(long)]
    json: bool,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_async(args))
}

async fn run_async(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let preset = match &args.preset {
        Some(name) => Some(config.preset(name)?.clone()),
        None => None,
    };
    let db = Database::open()?;
    let effects = SpawnedEffects::new(Arc::new(TerminalEffects::new(
        config.notifications.clone(),
    )));

    let engine = TimerEngine::from_parts(
        Box::new(config),
        Arc::new(effects),
        Box::new(db),
        Arc::new(TokioClock::new()),
    );
    let (handle, join) = TimerDriver::spawn(engine);

    if let Some(preset) = preset {
        let event = handle.apply_preset(preset).await?;
        emit(&event, args.json)?;
    }
    let mut events = handle.subscribe();
    if args.now {
        handle.start().await?;
    }
    if !args.json {
        eprintln!("keys: s=start p=pause t=toggle r=reset q=quit (then Enter)");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut redraw = tokio::time::interval(REDRAW_PERIOD);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => emit(&event, args.json)?,
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !dispatch(&handle, line.trim()).await? {
                    break;
                }
            }
            _ = redraw.tick(), if !args.json => {
                draw_status(&handle.snapshot().await?)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown().await?;
    let engine = join.await?;
    info!(cycles = engine.cycles_completed(), "timer stopped");
    if args.json {
        emit(&engine.snapshot(), true)?;
    } else {
        println!();
    }
    Ok(())
}

/// Returns false on quit.
async fn dispatch(handle: &TimerHandle, key: &str) -> Result<bool, Box<dyn std::error::Error>> {
    match key {
        "s" | "start" => handle.start().await?,
        "p" | "pause" => handle.pause().await?,
        "t" | "toggle" | "" => handle.toggle().await?,
        "r" | "reset" => handle.reset().await?,
        "q" | "quit" => return Ok(false),
        other => eprintln!("unknown key: {other}"),
    }
    Ok(true)
}

fn emit(event: &Event, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        Event::TimerCompleted {
            mode,
            next_mode,
            auto_start_in_ms,
            ..
        } => {
            let then = if auto_start_in_ms.is_some() {
                "starting"
            } else {
                "ready"
            };
            println!("\n{} finished, {} {then}", mode.label(), next_mode.label());
        }
        Event::PresetApplied { preset, .. } => println!("preset: {preset}"),
        Event::AutoStartCancelled { .. } => println!("\nauto-start cancelled"),
        _ => {}
    }
    Ok(())
}

fn draw_status(snapshot: &Event) -> Result<(), Box<dyn std::error::Error>> {
    let Event::StateSnapshot {
        mode,
        is_active,
        cycles_completed,
        progress_smooth,
        display,
        ..
    } = snapshot
    else {
        return Ok(());
    };
    let filled = ((progress_smooth * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
    let icon = if *is_active { ">" } else { "||" };
    let mut out = std::io::stdout();
    write!(
        out,
        "\r{icon:>2} {:<11} {display} [{bar}] cycles: {cycles_completed}   ",
        mode.label()
    )?;
    out.flush()?;
    Ok(())
}
