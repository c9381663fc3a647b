//! Event loop glue: owns the terminal adapter, the editor state and the
//! scheduler, and drives one scheduler tick per key event. The real
//! scripting interpreter is an external collaborator; until one is wired
//! in, [`NoopScriptHost`] lets every hook callback run to completion
//! immediately so the core can still be exercised end to end.
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use anyhow::{Context, Result};
use badred_bridge::{CallbackHandle, HookKind, OptionsPatch, RedCall, RedResponse, RedResult};
use badred_scheduler::{HookFired, ScriptHost, ScriptTask, Scheduler, TaskStep};
use badred_state::{EditorState, FiredHook, HookPayload};
use badred_terminal::{CrosstermBackend, NoopRenderSink, RenderSink, TerminalBackend};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "badred", version, about = "BadRed editor core")]
struct Args {
    /// Optional path to open at startup. If omitted, boot with an empty buffer.
    pub path: Option<PathBuf>,
    /// Optional configuration file path (overrides discovery of `badred.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("badred.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "badred.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

/// Every registered hook callback runs to completion on its first step.
/// Stands in for a real script runtime until one exists.
struct NoopScriptHost;

struct ImmediateTask;

impl ScriptTask for ImmediateTask {
    fn step(&mut self, _input: Option<RedResponse>) -> TaskStep {
        TaskStep::Done(Ok(()))
    }
}

impl ScriptHost for NoopScriptHost {
    fn spawn_callback(
        &mut self,
        _callback: CallbackHandle,
        _argument: Option<RedResponse>,
    ) -> Box<dyn ScriptTask> {
        Box::new(ImmediateTask)
    }

    fn spawn_script(&mut self, source: String) -> Box<dyn ScriptTask> {
        debug!(target: "runtime", source = %source, "running script (no-op host)");
        Box::new(ImmediateTask)
    }
}

fn hook_argument(payload: &HookPayload) -> Option<RedResponse> {
    match payload {
        HookPayload::KeyEvent { key } => Some(RedResponse::Text(key.clone())),
        HookPayload::BufferFileLinked { buffer_id, .. } => Some(RedResponse::BufferId(*buffer_id)),
        HookPayload::PaneClosed { pane_id } => Some(RedResponse::PaneId(*pane_id)),
        HookPayload::Error { message } | HookPayload::SecondaryError { message } => {
            Some(RedResponse::Text(message.clone()))
        }
    }
}

fn to_hook_fired(fired: Vec<FiredHook>) -> Vec<HookFired> {
    fired
        .into_iter()
        .map(|f| HookFired {
            kind: f.kind,
            callback: f.entry.callback,
            argument: hook_argument(&f.payload),
        })
        .collect()
}

/// Load the file at `path` into a freshly-opened buffer via the same
/// `FileOpen`/`BufferLinkFile` path a running script would use, so startup
/// exercises the same state machine as everything else.
fn open_path(state: &mut EditorState, path: &Path) -> RedResult<()> {
    let (buffer_id, _) = state.dispatch(RedCall::CurrentBufferId);
    let buffer_id = buffer_id?.buffer_id()?;
    let (file_id, _) = state.dispatch(RedCall::FileOpen(path.to_string_lossy().into_owned()));
    let file_id = file_id?.file_id()?;
    state.dispatch(RedCall::BufferLinkFile(buffer_id, file_id, true)).0?;
    Ok(())
}

fn run() -> Result<()> {
    install_panic_hook();
    let _log_guard = configure_logging();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = badred_config::load_from(args.config.clone()).context("loading config")?;

    let mut state = EditorState::new();
    state.dispatch(RedCall::UpdateOptions(OptionsPatch {
        tab_width: Some(config.editor_options().tab_width),
        expand_tabs: Some(config.editor_options().expand_tabs),
    }));

    if let Some(path) = args.path.as_ref() {
        if let Err(err) = open_path(&mut state, path) {
            error!(target: "runtime.startup", path = %path.display(), error = %err, "failed to open file");
        }
    }

    if let Ok(frame) = badred_terminal::root_frame() {
        state.panes_mut().set_root_frame(frame);
    }

    let mut backend = CrosstermBackend::new();
    let mut guard = backend.enter_guard().context("entering terminal")?;

    let mut scheduler = Scheduler::new();
    let mut host = NoopScriptHost;
    let mut render_sink = NoopRenderSink;

    info!(target: "runtime", "entering event loop");
    loop {
        let Some(key) = guard.poll_key(Duration::from_millis(100))? else {
            continue;
        };
        let Some(key_str) = badred_terminal::key_event_to_string(&key) else {
            continue;
        };
        if key_str == "C+q" {
            info!(target: "runtime", "quit requested");
            break;
        }

        for hook in to_hook_fired(state.fire_key_event(key_str)) {
            scheduler.queue_hook(hook);
        }

        let mut dispatch = |call: RedCall| -> (RedResult<RedResponse>, Vec<HookFired>) {
            let (result, fired) = state.dispatch(call);
            (result, to_hook_fired(fired))
        };
        let completions = scheduler.tick(&mut host, &mut dispatch);
        for completion in completions {
            if let Err(message) = completion.result {
                warn!(target: "runtime", task = %completion.task, error = %message, "task failed");
                let escalated = if completion.hook_kind == Some(HookKind::Error) {
                    state.fire_secondary_error(message)
                } else {
                    state.fire_error(message)
                };
                for hook in to_hook_fired(escalated) {
                    scheduler.queue_hook(hook);
                }
            }
        }

        if state.exit_requested() {
            info!(target: "runtime", "exit requested by script");
            break;
        }

        render_sink.redraw_requested();
    }

    info!(target: "runtime", "shutdown");
    Ok(())
}

fn main() -> Result<()> {
    run()
}
