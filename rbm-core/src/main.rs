//! ``src/main.rs``
//! ============================================================================
//! # rbm
//!
//! Terminal front-end supervising restic backup and restore runs. Owns
//! the terminal, one state value and the action loop; everything that
//! blocks runs in tasks reporting back over the task channel.

use std::io::{self, Stdout};
use std::panic::PanicHookInfo;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::{Notify, mpsc};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use rbm_core::config::Config;
use rbm_core::controller::actions::Action;
use rbm_core::controller::dispatcher::ActionDispatcher;
use rbm_core::controller::event_loop::{EventLoop, TaskResult};
use rbm_core::logging::LoggerBuilder;
use rbm_core::model::app_state::AppState;
use rbm_core::tasks::query_task::version_probe_task;
use rbm_core::view::ui;

type AppTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<()> {
    setup_panic_handler();

    let app = App::new().await.context("failed to initialize")?;
    app.run().await.context("application runtime error")?;

    info!("exited cleanly");
    Ok(())
}

struct App {
    terminal: AppTerminal,
    event_loop: EventLoop,
    dispatcher: ActionDispatcher,
    state: AppState,
    shutdown: Arc<Notify>,
    /// Dropped last; buffered log records are lost without it.
    _log_guard: WorkerGuard,
}

impl App {
    async fn new() -> Result<Self> {
        // config and logging come up before the terminal switches modes,
        // so a rejected configuration prints like a normal CLI error
        let config = Config::load_or_default()
            .await
            .context("loading configuration")?;
        config.validate().context("configuration rejected")?;

        let log_dir = match &config.logging.dir {
            Some(dir) => dir.clone(),
            None => Config::default_log_dir().context("resolving log directory")?,
        };
        let log_guard = LoggerBuilder::new()
            .with_level(&config.logging.level)
            .with_log_dir(log_dir)
            .build()
            .context("installing the logger")?;
        info!(version = env!("CARGO_PKG_VERSION"), "starting rbm");

        let config_path = Config::config_path().context("resolving config path")?;
        let (task_tx, task_rx) = mpsc::unbounded_channel::<TaskResult>();

        let terminal = setup_terminal().context("terminal setup")?;

        version_probe_task(
            config.restic.program.clone(),
            config.restic.probe_timeout,
            task_tx.clone(),
        );

        Ok(Self {
            terminal,
            event_loop: EventLoop::new(task_rx),
            dispatcher: ActionDispatcher::new(task_tx, config_path),
            state: AppState::new(config),
            shutdown: Arc::new(Notify::new()),
            _log_guard: log_guard,
        })
    }

    async fn run(mut self) -> Result<()> {
        self.spawn_shutdown_handler();

        // first snapshot load for the repository active at startup
        self.dispatcher.handle(&mut self.state, Action::Refresh);

        loop {
            self.render()?;

            let action = tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("shutdown signal received");
                    Action::Quit
                }
                action = self.event_loop.next_action(&self.state) => action,
            };

            if !self.dispatcher.handle(&mut self.state, action) {
                break;
            }
        }

        info!("event loop terminated cleanly");
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        if self.state.take_dirty() {
            self.terminal
                .draw(|frame| ui::render(frame, &mut self.state))
                .context("failed to draw frame")?;
        }
        Ok(())
    }

    fn spawn_shutdown_handler(&self) {
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{SignalKind, signal};

                let mut sigterm =
                    signal(SignalKind::terminate()).expect("failed to create SIGTERM handler");

                tokio::select! {
                    _ = sigterm.recv() => info!("received SIGTERM"),
                    _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
                }
            }

            #[cfg(not(unix))]
            {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                info!("received Ctrl+C");
            }

            shutdown.notify_one();
        });
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Err(e) = cleanup_terminal(&mut self.terminal) {
            warn!("failed to clean up terminal: {e}");
        }
    }
}

fn setup_terminal() -> Result<AppTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("failed to create terminal")?;

    Ok(terminal)
}

fn cleanup_terminal(terminal: &mut AppTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    Ok(())
}

fn setup_panic_handler() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);

        error!("application panicked: {panic_info}");
        original_hook(panic_info);
    }));
}
