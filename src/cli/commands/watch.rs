use crate::cli::commands::Runtime;
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::session::{LogSession, SaveIndicator};
use crate::core::sync::pump;
use crate::errors::AppResult;
use crate::store::{IssueStore, SlotStore};
use crate::ui::messages::{error, header, notice};
use chrono::Duration;
use std::thread;
use std::time::Instant;
use tracing::debug;

/// Follow one stream: drives rollover and autosave timers and polls the
/// change feed on every refresh. With `--at` the clock starts at that
/// instant and advances with real time.
pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let Commands::Watch {
        stream,
        interval,
        iterations,
    } = &cli.command
    else {
        return Ok(());
    };

    let rt = Runtime::new(cli, cfg)?;
    let stream = rt.check_stream(*stream)?;
    let every = interval.unwrap_or(cfg.refresh_interval_secs).max(1);
    let debounce = Duration::seconds(cfg.autosave_secs(stream.kind()) as i64);

    let mut session = LogSession::new(
        rt.open_store(cfg)?,
        rt.actor.clone(),
        stream,
        rt.ctx.tz,
        debounce,
    );

    let started = Instant::now();

    session.load(rt.now)?;
    header(
        format!("Watching {stream} {}", session.date()),
        &rt.local_now(),
    );
    print_hours(&session);

    let mut round = 0u32;
    while iterations.is_none_or(|max| round < max) {
        thread::sleep(std::time::Duration::from_secs(every));
        round += 1;
        let now = rt.now
            + Duration::from_std(started.elapsed()).unwrap_or_else(|_| Duration::zero());

        if let Err(e) = session.tick(now) {
            error(&e);
        }
        match pump(&mut session, now) {
            Ok(report) => debug!(
                received = report.received,
                ignored = report.ignored,
                "change feed polled"
            ),
            Err(e) => error(&e),
        }

        for n in session.take_notices() {
            notice(n);
        }
        if let SaveIndicator::Failed { message } = session.indicator() {
            error(message);
        }
        print_hours(&session);
    }
    Ok(())
}

fn print_hours<S: SlotStore + IssueStore>(session: &LogSession<S>) {
    let logged: Vec<String> = session
        .hours_with_data()
        .iter()
        .map(|h| format!("{h:02}"))
        .collect();
    println!(
        "{} current hour {:02}:00, logged [{}]",
        session.date(),
        session.current_hour(),
        logged.join(" ")
    );
}
