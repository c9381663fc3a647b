//! Single-threaded cooperative task scheduler. Tasks are opaque resumable
//! computations owned exclusively by the scheduler; the actual script
//! runtime is a collaborator behind [`ScriptHost`], kept out of this crate
//! the same way the source keeps rendering and plugin discovery behind a
//! narrow trait rather than baking a concrete implementation in.
//!
//! This crate knows nothing about buffers, panes, or the editor's RedCall
//! dispatch table: it only knows how to park a task on a `RedCall`, resume
//! it with a `RedResponse`, and keep hook-spawned tasks in the right order
//! relative to whatever caused them.

use std::collections::{HashMap, VecDeque};

use badred_bridge::{CallbackHandle, HookKind, RedCall, RedError, RedResponse, RedResult};
use badred_ids::{IdGen, TaskId};
use tracing::{debug, trace};

/// What a task is doing right now.
#[derive(Debug, Clone)]
pub enum Slot {
    /// Parked on a `RedCall`, waiting for the scheduler to dispatch it.
    Pending(RedCall),
    /// Dispatch produced a response; the task is ready to be stepped again.
    Resume(RedResponse),
    /// The task finished, successfully or not.
    Done(Result<(), String>),
}

/// One step of a task's execution: either it yields a request or it is
/// finished. Implementors hide whatever interpreter state drives this
/// (bytecode, a Lua coroutine, a test fixture) behind a single method.
pub trait ScriptTask {
    fn step(&mut self, input: Option<RedResponse>) -> TaskStep;
}

#[derive(Debug)]
pub enum TaskStep {
    Yield(RedCall),
    Done(Result<(), String>),
}

/// Resolves an opaque script-side callback into a runnable task body. The
/// real implementation looks up a Lua function by handle; none of that
/// machinery is this crate's concern.
pub trait ScriptHost {
    fn spawn_callback(
        &mut self,
        callback: CallbackHandle,
        argument: Option<RedResponse>,
    ) -> Box<dyn ScriptTask>;

    /// Resolve a `run_script` call's source into a runnable task body. The
    /// real host parses and starts the script; a stand-in host can just
    /// run it to completion immediately.
    fn spawn_script(&mut self, source: String) -> Box<dyn ScriptTask>;
}

/// A hook that became eligible to fire, reported by the editor state layer
/// after a RedCall mutated something. Decoupled from that crate's own
/// hook-payload type so this crate never depends on it.
#[derive(Debug)]
pub struct HookFired {
    pub kind: HookKind,
    pub callback: CallbackHandle,
    pub argument: Option<RedResponse>,
}

/// What dispatching a `RedCall` against editor state produced: the
/// response (or error) the parked task should resume with, plus any hooks
/// that became eligible to fire as a side effect.
pub type DispatchFn<'a> = dyn FnMut(RedCall) -> (RedResult<RedResponse>, Vec<HookFired>) + 'a;

struct ScheduledTask {
    body: Box<dyn ScriptTask>,
    slot: Slot,
    /// The hook that caused this task to be spawned, if any. `None` for
    /// tasks spawned directly via `spawn` (run_script, top-level entry).
    hook_kind: Option<HookKind>,
}

/// Outcome of a completed task, surfaced so the caller can fire the
/// `error`/`script_return` hooks. `hook_kind` lets the caller tell a task
/// spawned by the `error` hook apart from any other failing task, so it
/// can escalate to `secondary_error` instead of firing `error` again.
#[derive(Debug)]
pub struct Completion {
    pub task: TaskId,
    pub result: Result<(), String>,
    pub hook_kind: Option<HookKind>,
}

#[derive(Default)]
pub struct Scheduler {
    ids: IdGen,
    tasks: HashMap<TaskId, ScheduledTask>,
    ready: VecDeque<TaskId>,
    hook_queue: VecDeque<HookFired>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty() && self.hook_queue.is_empty()
    }

    /// Queue a hook callback to be spawned as a task at the start of the
    /// next tick, in FIFO order relative to other queued hooks.
    pub fn queue_hook(&mut self, fired: HookFired) {
        self.hook_queue.push_back(fired);
    }

    /// Spawn a task body directly (used for top-level entrypoints rather
    /// than hook dispatch). A task yielding `RedCall::RunScript` spawns its
    /// target the same way, but through `settle`, since it has to resume
    /// the yielding task rather than hand a `TaskId` back to a caller.
    /// Runs its first step immediately, as hook spawns do.
    pub fn spawn(
        &mut self,
        body: Box<dyn ScriptTask>,
        argument: Option<RedResponse>,
        host: &mut dyn ScriptHost,
        dispatch: &mut DispatchFn<'_>,
    ) -> TaskId {
        let id = self.instantiate(body, argument, None, host, dispatch);
        self.ready.push_back(id);
        debug!(target: "badred_scheduler", task = %id, "spawned task");
        id
    }

    /// Turn a just-produced `TaskStep` into a `Slot`, dispatching
    /// immediately if the task yielded a `RedCall` and queueing any hooks
    /// that dispatch fired ahead of this task's own continuation so they
    /// preempt it, per the pane_closed ordering rule. A `run_script` call
    /// resolves to a `RedResponse::ScriptSource`, which is intercepted here
    /// rather than handed back to the yielding task: the source is resolved
    /// into a task body via the host and spawned, and the caller resumes
    /// with a plain acknowledgement.
    fn settle(
        &mut self,
        task: TaskId,
        step: TaskStep,
        host: &mut dyn ScriptHost,
        dispatch: &mut DispatchFn<'_>,
    ) -> Slot {
        match step {
            TaskStep::Done(result) => Slot::Done(result),
            TaskStep::Yield(call) => {
                trace!(target: "badred_scheduler", task = %task, ?call, "task yielded");
                let (response, fired) = dispatch(call);
                for hook in fired {
                    self.hook_queue.push_front(hook);
                }
                match response {
                    Ok(RedResponse::ScriptSource(source)) => {
                        let body = host.spawn_script(source);
                        let spawned = self.instantiate(body, None, None, host, dispatch);
                        self.ready.push_back(spawned);
                        debug!(target: "badred_scheduler", task = %spawned, "spawned run_script task");
                        Slot::Resume(RedResponse::Unit)
                    }
                    Ok(resp) => Slot::Resume(resp),
                    Err(err) => Slot::Resume(RedResponse::Text(format_red_error(&err))),
                }
            }
        }
    }

    /// Drain the hook queue, spawning one task per queued hook in FIFO
    /// order, and splice them into the *front* of the ready queue ahead of
    /// anything already parked there. This is what gives `pane_closed` (and
    /// every other hook kind) priority over the continuation of the task
    /// whose RedCall triggered it: that continuation was already sitting in
    /// the ready queue from a previous tick, so prepending the hook tasks
    /// guarantees they run first in this round.
    fn drain_hook_queue(&mut self, host: &mut dyn ScriptHost, dispatch: &mut DispatchFn<'_>) {
        let mut spawned = VecDeque::new();
        while let Some(hook) = self.hook_queue.pop_front() {
            let body = host.spawn_callback(hook.callback, hook.argument);
            let id = self.instantiate(body, None, Some(hook.kind), host, dispatch);
            spawned.push_back(id);
        }
        while let Some(id) = spawned.pop_back() {
            self.ready.push_front(id);
        }
    }

    /// Run a task body's first step and register it in the task table,
    /// without deciding where in the ready queue it belongs — callers
    /// choose front (hook preemption) or back (everything else).
    fn instantiate(
        &mut self,
        mut body: Box<dyn ScriptTask>,
        argument: Option<RedResponse>,
        hook_kind: Option<HookKind>,
        host: &mut dyn ScriptHost,
        dispatch: &mut DispatchFn<'_>,
    ) -> TaskId {
        let id = TaskId::new(self.ids.next_raw());
        let step = body.step(argument);
        let slot = self.settle(id, step, host, dispatch);
        self.tasks.insert(id, ScheduledTask { body, slot, hook_kind });
        id
    }

    /// Run one scheduler tick: drain the hook queue, then resume every
    /// task that was ready at the start of the tick exactly once. Returns
    /// the tasks that finished during this tick.
    pub fn tick(&mut self, host: &mut dyn ScriptHost, dispatch: &mut DispatchFn<'_>) -> Vec<Completion> {
        self.drain_hook_queue(host, dispatch);

        let mut completions = Vec::new();
        let round = self.ready.len();
        for _ in 0..round {
            let Some(id) = self.ready.pop_front() else {
                break;
            };
            let Some(scheduled) = self.tasks.get_mut(&id) else {
                continue;
            };
            let hook_kind = scheduled.hook_kind;

            let input = match std::mem::replace(&mut scheduled.slot, Slot::Done(Ok(()))) {
                Slot::Resume(resp) => Some(resp),
                Slot::Pending(call) => {
                    // Parked tasks that never got dispatched (shouldn't
                    // normally happen — dispatch runs at yield time) are
                    // re-dispatched defensively rather than dropped.
                    let (response, fired) = dispatch(call);
                    for hook in fired {
                        self.hook_queue.push_front(hook);
                    }
                    Some(response.unwrap_or_else(|err| RedResponse::Text(format_red_error(&err))))
                }
                Slot::Done(result) => {
                    self.tasks.remove(&id);
                    completions.push(Completion { task: id, result, hook_kind });
                    continue;
                }
            };

            let step = self.tasks.get_mut(&id).unwrap().body.step(input);
            let slot = self.settle(id, step, host, dispatch);

            match slot {
                Slot::Done(result) => {
                    self.tasks.remove(&id);
                    debug!(target: "badred_scheduler", task = %id, ok = result.is_ok(), "task finished");
                    completions.push(Completion { task: id, result, hook_kind });
                }
                other => {
                    self.tasks.get_mut(&id).unwrap().slot = other;
                    self.ready.push_back(id);
                }
            }
        }

        completions
    }
}

fn format_red_error(err: &RedError) -> String {
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct ScriptedTask {
        calls: Vec<RedCall>,
        cursor: usize,
    }

    impl ScriptedTask {
        fn new(calls: Vec<RedCall>) -> Self {
            Self { calls, cursor: 0 }
        }
    }

    impl ScriptTask for ScriptedTask {
        fn step(&mut self, _input: Option<RedResponse>) -> TaskStep {
            if self.cursor < self.calls.len() {
                let call = self.calls[self.cursor].clone();
                self.cursor += 1;
                TaskStep::Yield(call)
            } else {
                TaskStep::Done(Ok(()))
            }
        }
    }

    struct RecordingHost {
        spawned: Rc<RefCell<Vec<CallbackHandle>>>,
    }

    impl ScriptHost for RecordingHost {
        fn spawn_callback(
            &mut self,
            callback: CallbackHandle,
            _argument: Option<RedResponse>,
        ) -> Box<dyn ScriptTask> {
            self.spawned.borrow_mut().push(callback);
            Box::new(ScriptedTask::new(Vec::new()))
        }

        fn spawn_script(&mut self, _source: String) -> Box<dyn ScriptTask> {
            Box::new(ScriptedTask::new(Vec::new()))
        }
    }

    fn noop_dispatch() -> impl FnMut(RedCall) -> (RedResult<RedResponse>, Vec<HookFired>) {
        |_| (Ok(RedResponse::Unit), Vec::new())
    }

    #[test]
    fn task_completes_after_its_calls_are_exhausted() {
        let mut sched = Scheduler::new();
        let mut dispatch = noop_dispatch();
        let mut host = RecordingHost { spawned: Rc::new(RefCell::new(Vec::new())) };
        // Spawning already runs the first step (yielding and dispatching the
        // first call), so a two-call task needs exactly two more ticks: one
        // to process the second call, one to observe it has nothing left.
        let task = Box::new(ScriptedTask::new(vec![
            RedCall::CurrentBufferId,
            RedCall::EditorOptions,
        ]));
        sched.spawn(task, None, &mut host, &mut dispatch);
        assert_eq!(sched.task_count(), 1);

        let first = sched.tick(&mut host, &mut dispatch);
        assert!(first.is_empty());
        let second = sched.tick(&mut host, &mut dispatch);
        assert_eq!(second.len(), 1);
        assert!(second[0].result.is_ok());
        assert_eq!(sched.task_count(), 0);
    }

    #[test]
    fn queued_hooks_spawn_in_fifo_order() {
        let mut sched = Scheduler::new();
        let mut dispatch = noop_dispatch();
        sched.queue_hook(HookFired { kind: HookKind::KeyEvent, callback: CallbackHandle(1), argument: None });
        sched.queue_hook(HookFired { kind: HookKind::KeyEvent, callback: CallbackHandle(2), argument: None });

        let spawned = Rc::new(RefCell::new(Vec::new()));
        let mut host = RecordingHost { spawned: spawned.clone() };
        sched.tick(&mut host, &mut dispatch);

        assert_eq!(*spawned.borrow(), vec![CallbackHandle(1), CallbackHandle(2)]);
    }

    /// Logs `name` the first time it steps, then finishes immediately.
    struct LoggingTask {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        logged: bool,
    }

    impl ScriptTask for LoggingTask {
        fn step(&mut self, _input: Option<RedResponse>) -> TaskStep {
            if !self.logged {
                self.logged = true;
                self.log.borrow_mut().push(self.name);
            }
            TaskStep::Done(Ok(()))
        }
    }

    struct LoggingHost {
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl ScriptHost for LoggingHost {
        fn spawn_callback(
            &mut self,
            _callback: CallbackHandle,
            _argument: Option<RedResponse>,
        ) -> Box<dyn ScriptTask> {
            Box::new(LoggingTask {
                name: "hook",
                log: self.log.clone(),
                logged: false,
            })
        }

        fn spawn_script(&mut self, _source: String) -> Box<dyn ScriptTask> {
            Box::new(LoggingTask {
                name: "script",
                log: self.log.clone(),
                logged: false,
            })
        }
    }

    #[test]
    fn hooks_fired_by_a_dispatch_preempt_the_causing_task() {
        let mut sched = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut host = LoggingHost { log: log.clone() };

        // Dispatch fires a pane_closed-style hook the first time it's called.
        let mut fired_once = false;
        let mut dispatch = |_call: RedCall| {
            if !fired_once {
                fired_once = true;
                (
                    Ok(RedResponse::Unit),
                    vec![HookFired { kind: HookKind::PaneClosed, callback: CallbackHandle(99), argument: None }],
                )
            } else {
                (Ok(RedResponse::Unit), Vec::new())
            }
        };

        let causing_log = log.clone();
        let causing = Box::new(ScriptedWithLog {
            calls: vec![
                RedCall::PaneCloseChild(badred_ids::PaneId::new(0), false),
                RedCall::EditorOptions,
            ],
            cursor: 0,
            log: causing_log,
            logged_continuation: false,
        });
        sched.spawn(causing, None, &mut host, &mut dispatch);

        // The close call already fired the hook during spawn's initial step,
        // queueing it ahead of the causing task's own continuation.
        sched.tick(&mut host, &mut dispatch);
        sched.tick(&mut host, &mut dispatch);

        assert_eq!(*log.borrow(), vec!["hook", "continuation"]);
    }

    /// Like `ScriptedTask`, but logs "continuation" the first time it is
    /// resumed with an actual response (as opposed to its initial spawn
    /// step), so tests can observe ordering relative to other tasks.
    struct ScriptedWithLog {
        calls: Vec<RedCall>,
        cursor: usize,
        log: Rc<RefCell<Vec<&'static str>>>,
        logged_continuation: bool,
    }

    impl ScriptTask for ScriptedWithLog {
        fn step(&mut self, input: Option<RedResponse>) -> TaskStep {
            if input.is_some() && !self.logged_continuation {
                self.logged_continuation = true;
                self.log.borrow_mut().push("continuation");
            }
            if self.cursor < self.calls.len() {
                let call = self.calls[self.cursor].clone();
                self.cursor += 1;
                TaskStep::Yield(call)
            } else {
                TaskStep::Done(Ok(()))
            }
        }
    }

    struct ScriptSourceHost {
        spawned_sources: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptHost for ScriptSourceHost {
        fn spawn_callback(
            &mut self,
            _callback: CallbackHandle,
            _argument: Option<RedResponse>,
        ) -> Box<dyn ScriptTask> {
            Box::new(ScriptedTask::new(Vec::new()))
        }

        fn spawn_script(&mut self, source: String) -> Box<dyn ScriptTask> {
            self.spawned_sources.borrow_mut().push(source);
            Box::new(ScriptedTask::new(Vec::new()))
        }
    }

    #[test]
    fn run_script_yield_spawns_a_real_second_task() {
        let mut sched = Scheduler::new();
        let spawned_sources = Rc::new(RefCell::new(Vec::new()));
        let mut host = ScriptSourceHost { spawned_sources: spawned_sources.clone() };
        let mut dispatch = |call: RedCall| -> (RedResult<RedResponse>, Vec<HookFired>) {
            match call {
                RedCall::RunScript(src) => (Ok(RedResponse::ScriptSource(src)), Vec::new()),
                _ => (Ok(RedResponse::Unit), Vec::new()),
            }
        };

        let task = Box::new(ScriptedTask::new(vec![RedCall::RunScript("return 1".into())]));
        sched.spawn(task, None, &mut host, &mut dispatch);

        // The yielding task itself is still parked (resumed with Unit), and
        // a second, independent task now exists for the script it asked to
        // run — run_script is no longer a no-op.
        assert_eq!(sched.task_count(), 2);
        assert_eq!(*spawned_sources.borrow(), vec!["return 1".to_string()]);
    }

    struct FaultingTask;

    impl ScriptTask for FaultingTask {
        fn step(&mut self, _input: Option<RedResponse>) -> TaskStep {
            TaskStep::Done(Err("boom".into()))
        }
    }

    struct FaultingHost;

    impl ScriptHost for FaultingHost {
        fn spawn_callback(
            &mut self,
            _callback: CallbackHandle,
            _argument: Option<RedResponse>,
        ) -> Box<dyn ScriptTask> {
            Box::new(FaultingTask)
        }

        fn spawn_script(&mut self, _source: String) -> Box<dyn ScriptTask> {
            Box::new(FaultingTask)
        }
    }

    #[test]
    fn a_task_spawned_from_the_error_hook_carries_that_provenance_on_failure() {
        let mut sched = Scheduler::new();
        let mut host = FaultingHost;
        let mut dispatch = noop_dispatch();

        sched.queue_hook(HookFired { kind: HookKind::Error, callback: CallbackHandle(1), argument: None });
        let completions = sched.tick(&mut host, &mut dispatch);

        assert_eq!(completions.len(), 1);
        assert!(completions[0].result.is_err());
        assert_eq!(completions[0].hook_kind, Some(HookKind::Error));
    }
}
