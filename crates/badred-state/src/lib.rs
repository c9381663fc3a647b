//! Editor state: the buffer table, pane tree, file table, hook registry
//! and process-wide options, plus the `RedCall` dispatcher that is the
//! single mutation point for all of it.
//!
//! Scripts only ever hold opaque ids; this crate is the only thing that
//! resolves them against live objects, so every resolution failure becomes
//! a typed [`badred_bridge::RedError`] rather than a panic.

pub mod hooks;

use std::collections::HashMap;
use std::path::PathBuf;

use badred_bridge::{
    BufferTypeTag, CallbackHandle, EditorOptions, HookKind, OptionsPatch, PaneNodeType, RedCall,
    RedError, RedResponse, RedResult,
};
use badred_ids::{BufferId, FileId, IdGen, PaneId};
use badred_pane::PaneTree;
use badred_text::Buffer;
use hooks::{HookEntry, HookRegistry};
use tracing::{debug, warn};

/// A hook firing is reported back to the caller (the scheduler) rather than
/// acted on here: this crate owns state, not task spawning.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredHook {
    pub kind: HookKind,
    pub entry: HookEntry,
    pub payload: HookPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HookPayload {
    KeyEvent { key: String },
    BufferFileLinked { buffer_id: BufferId, file_id: FileId },
    PaneClosed { pane_id: PaneId },
    Error { message: String },
    SecondaryError { message: String },
}

pub struct EditorState {
    buffers: HashMap<BufferId, Buffer>,
    buffer_ids: IdGen,
    panes: PaneTree,
    files: HashMap<FileId, PathBuf>,
    file_ids: IdGen,
    hooks: HookRegistry,
    options: EditorOptions,
    exit_requested: bool,
}

impl EditorState {
    /// Seed state with a single empty buffer and a single leaf pane bound
    /// to it, matching how the source boots before any file is opened.
    pub fn new() -> Self {
        let mut buffer_ids = IdGen::new();
        let mut buffers = HashMap::new();
        let first_buffer = BufferId::new(buffer_ids.next_raw());
        buffers.insert(first_buffer, Buffer::new());

        Self {
            buffers,
            buffer_ids,
            panes: PaneTree::new(first_buffer),
            files: HashMap::new(),
            file_ids: IdGen::new(),
            hooks: HookRegistry::new(),
            options: EditorOptions::default(),
            exit_requested: false,
        }
    }

    pub fn options(&self) -> EditorOptions {
        self.options
    }

    /// True once a script (or the bridge caller on its behalf) has called
    /// `editor_exit()`. The event loop is responsible for observing this
    /// and actually stopping; this crate only records the request.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn panes(&self) -> &PaneTree {
        &self.panes
    }

    pub fn panes_mut(&mut self) -> &mut PaneTree {
        &mut self.panes
    }

    fn buffer(&self, id: BufferId) -> RedResult<&Buffer> {
        self.buffers.get(&id).ok_or(RedError::InvalidBuffer(id))
    }

    fn buffer_mut(&mut self, id: BufferId) -> RedResult<&mut Buffer> {
        self.buffers.get_mut(&id).ok_or(RedError::InvalidBuffer(id))
    }

    fn file_path(&self, id: FileId) -> RedResult<&PathBuf> {
        self.files.get(&id).ok_or(RedError::InvalidFile(id))
    }

    fn fire(&self, kind: HookKind, scope: Option<PaneId>, payload: HookPayload) -> Vec<FiredHook> {
        self.hooks
            .matching(kind, scope)
            .into_iter()
            .map(|entry| FiredHook {
                kind,
                entry,
                payload: payload.clone(),
            })
            .collect()
    }

    /// Process a single `RedCall`, mutating state as needed and reporting
    /// any hooks that became eligible to fire as a result. The scheduler
    /// turns each `FiredHook` into a spawned task; this crate never spawns
    /// tasks itself.
    pub fn dispatch(&mut self, call: RedCall) -> (RedResult<RedResponse>, Vec<FiredHook>) {
        match call {
            RedCall::CurrentBufferId => {
                let pane = self.panes.current();
                let result = self
                    .panes
                    .buffer_index(pane)
                    .map(RedResponse::BufferId)
                    .map_err(RedError::from);
                (result, Vec::new())
            }
            RedCall::ActivePaneIndex => (Ok(RedResponse::PaneId(self.panes.current())), Vec::new()),
            RedCall::RootPaneIndex => (Ok(RedResponse::PaneId(self.panes.root())), Vec::new()),
            RedCall::SetActivePane(id) => (
                self.panes.set_active(id).map(|_| RedResponse::Unit).map_err(RedError::from),
                Vec::new(),
            ),

            RedCall::BufferOpen => {
                let id = BufferId::new(self.buffer_ids.next_raw());
                self.buffers.insert(id, Buffer::new());
                debug!(target: "badred_state", buffer = %id, "opened buffer");
                (Ok(RedResponse::BufferId(id)), Vec::new())
            }
            RedCall::BufferClose(id) => {
                let result = if self.buffers.remove(&id).is_some() {
                    Ok(RedResponse::Unit)
                } else {
                    Err(RedError::InvalidBuffer(id))
                };
                (result, Vec::new())
            }
            RedCall::BufferInsert(id, text) => {
                let result = self.buffer_mut(id).map(|buf| {
                    buf.insert(&text);
                    RedResponse::Unit
                });
                (result, Vec::new())
            }
            RedCall::BufferDelete(id, count) => {
                let result = self.buffer_mut(id).map(|buf| RedResponse::Text(buf.delete(count)));
                (result, Vec::new())
            }
            RedCall::BufferCursor(id) => {
                (self.buffer(id).map(|b| RedResponse::U32(b.cursor_byte())), Vec::new())
            }
            RedCall::BufferCursorLine(id) => {
                (self.buffer(id).map(|b| RedResponse::U32(b.cursor_line())), Vec::new())
            }
            RedCall::BufferCursorMovedByChar(id, delta, skip_newlines) => (
                self.buffer(id).map(|b| {
                    RedResponse::U32(b.cursor_byte_moved(b.cursor_byte(), delta, skip_newlines))
                }),
                Vec::new(),
            ),
            RedCall::BufferIndexMovedByChar(id, index, delta, skip_newlines) => (
                self.buffer(id)
                    .map(|b| RedResponse::U32(b.index_moved(index, delta, skip_newlines))),
                Vec::new(),
            ),
            RedCall::BufferSetCursor(id, byte, keep_col) => {
                let result = self
                    .buffer_mut(id)
                    .and_then(|b| b.set_cursor(byte, keep_col).map_err(RedError::from))
                    .map(|_| RedResponse::Unit);
                (result, Vec::new())
            }
            RedCall::BufferSetCursorLine(id, line) => {
                let result = self.buffer_mut(id).map(|b| {
                    b.set_cursor_line(line);
                    RedResponse::Unit
                });
                (result, Vec::new())
            }
            RedCall::BufferLength(id) => {
                (self.buffer(id).map(|b| RedResponse::U32(b.length())), Vec::new())
            }
            RedCall::BufferLineCount(id) => {
                (self.buffer(id).map(|b| RedResponse::U32(b.line_count())), Vec::new())
            }
            RedCall::BufferContent(id) => {
                (self.buffer(id).map(|b| RedResponse::Text(b.content())), Vec::new())
            }
            RedCall::BufferContentAt(id, byte, count) => (
                self.buffer(id).map(|b| RedResponse::Text(b.content_at(byte, count))),
                Vec::new(),
            ),
            RedCall::BufferLineContent(id, line) => (
                self.buffer(id).map(|b| RedResponse::Text(b.line_content(line))),
                Vec::new(),
            ),
            RedCall::BufferLineContaining(id, byte) => (
                self.buffer(id).map(|b| RedResponse::U32(b.line_for_index(byte))),
                Vec::new(),
            ),
            RedCall::BufferLineLength(id, line) => (
                self.buffer(id).map(|b| RedResponse::U32(b.line_length(line))),
                Vec::new(),
            ),
            RedCall::BufferLineStart(id, line) => (
                self.buffer(id).map(|b| RedResponse::U32(b.line_start(line))),
                Vec::new(),
            ),
            RedCall::BufferLineEnd(id, line) => (
                self.buffer(id).map(|b| RedResponse::U32(b.line_end(line))),
                Vec::new(),
            ),
            RedCall::BufferLinkFile(buffer_id, file_id, overwrite) => {
                let (result, fired) = self.link_file(buffer_id, file_id, overwrite);
                (result, fired)
            }
            RedCall::BufferUnlinkFile(id) => {
                let result = self
                    .buffer_mut(id)
                    .and_then(|b| b.unlink_file().map_err(RedError::from))
                    .map(RedResponse::FileId);
                (result, Vec::new())
            }
            RedCall::BufferWriteToFile(id) => {
                let result = self.write_to_file(id);
                (result, Vec::new())
            }
            RedCall::BufferType(id) => (
                self.buffer(id)
                    .map(|b| RedResponse::BufferType(BufferTypeTag::from(b.backend()))),
                Vec::new(),
            ),
            RedCall::BufferSetType(id, kind) => {
                let result = self.buffer_mut(id).map(|b| {
                    b.set_backend(kind);
                    RedResponse::Unit
                });
                (result, Vec::new())
            }

            RedCall::PaneIsFirst(id) => (
                self.panes
                    .pane_is_first(id)
                    .map(RedResponse::OptionBool)
                    .map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneIndexUpFrom(id) => {
                let result = self.panes.pane_index_up_from(id).map_err(RedError::from);
                let response = result.map(|maybe| match maybe {
                    Some(p) => RedResponse::PaneId(p),
                    None => RedResponse::Unit,
                });
                (response, Vec::new())
            }
            RedCall::PaneIndexDownFrom(id, to_first) => (
                self.panes
                    .pane_index_down_from(id, to_first)
                    .map(RedResponse::PaneId)
                    .map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneType(id) => {
                let result = self.panes.pane_type(id).map_err(RedError::from).map(|tag| {
                    let mut node: PaneNodeType = tag.into();
                    if let Ok(split_type) = self.panes.split_type(id) {
                        node = match node {
                            PaneNodeType::VSplit(_) => PaneNodeType::VSplit(Some(split_type)),
                            PaneNodeType::HSplit(_) => PaneNodeType::HSplit(Some(split_type)),
                            leaf => leaf,
                        };
                    }
                    RedResponse::PaneType(node)
                });
                (result, Vec::new())
            }
            RedCall::PaneBufferIndex(id) => (
                self.panes.buffer_index(id).map(RedResponse::BufferId).map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneSetBuffer(id, buffer_id) => (
                self.panes
                    .set_buffer(id, buffer_id)
                    .map(|_| RedResponse::Unit)
                    .map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneVSplit(id) => (
                self.panes.v_split(id).map(RedResponse::PaneId).map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneHSplit(id) => (
                self.panes.h_split(id).map(RedResponse::PaneId).map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneCloseChild(id, first_child) => {
                let (result, fired) = self.close_child(id, first_child);
                (result, fired)
            }
            RedCall::PaneSetSplitPercent(id, percent, on_first) => (
                self.panes
                    .set_split_percent(id, percent, on_first)
                    .map(|_| RedResponse::Unit)
                    .map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneSetSplitFixed(id, size, on_first) => (
                self.panes
                    .set_split_fixed(id, size, on_first)
                    .map(|_| RedResponse::Unit)
                    .map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneTopLine(id) => (
                self.panes.top_line(id).map(RedResponse::U16).map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneSetTopLine(id, line) => (
                self.panes
                    .set_top_line(id, line)
                    .map(|_| RedResponse::Unit)
                    .map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneFrame(id) => (
                self.panes.frame(id).map(RedResponse::Frame).map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneWrap(id) => (
                self.panes.wrap(id).map(RedResponse::Bool).map_err(RedError::from),
                Vec::new(),
            ),
            RedCall::PaneSetWrap(id, value) => (
                self.panes
                    .set_wrap(id, value)
                    .map(|_| RedResponse::Unit)
                    .map_err(RedError::from),
                Vec::new(),
            ),

            RedCall::FileOpen(path) => {
                let id = FileId::new(self.file_ids.next_raw());
                self.files.insert(id, PathBuf::from(path));
                (Ok(RedResponse::FileId(id)), Vec::new())
            }
            RedCall::FileClose(id) => {
                let result = if self.files.remove(&id).is_some() {
                    Ok(RedResponse::Unit)
                } else {
                    Err(RedError::InvalidFile(id))
                };
                (result, Vec::new())
            }
            RedCall::BufferCurrentFile(id) => {
                let result = self.buffer(id).map(|b| match b.file_id() {
                    Some(file_id) => RedResponse::FileId(file_id),
                    None => RedResponse::Unit,
                });
                (result, Vec::new())
            }

            RedCall::SetHook(kind, callback, scope) => {
                self.hooks.register(kind, callback, scope);
                (Ok(RedResponse::Unit), Vec::new())
            }
            RedCall::RunScript(src) => {
                // This crate only resolves ids against state; spawning the
                // task is the scheduler's job, so the source travels back
                // out in the response for the caller driving it to act on.
                (Ok(RedResponse::ScriptSource(src)), Vec::new())
            }
            RedCall::SetTextStyle(_name, _bg, _fg) => (Ok(RedResponse::Unit), Vec::new()),
            RedCall::EditorExit => {
                self.exit_requested = true;
                (Ok(RedResponse::Unit), Vec::new())
            }
            RedCall::EditorOptions => (Ok(RedResponse::Options(self.options)), Vec::new()),
            RedCall::UpdateOptions(patch) => {
                self.apply_options(patch);
                (Ok(RedResponse::Options(self.options)), Vec::new())
            }
        }
    }

    fn apply_options(&mut self, patch: OptionsPatch) {
        self.options.apply(&patch);
    }

    fn link_file(
        &mut self,
        buffer_id: BufferId,
        file_id: FileId,
        overwrite: bool,
    ) -> (RedResult<RedResponse>, Vec<FiredHook>) {
        let path = match self.file_path(file_id) {
            Ok(path) => path.clone(),
            Err(err) => return (Err(err), Vec::new()),
        };
        let loaded = if overwrite {
            match std::fs::read(&path) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    warn!(target: "badred_state", path = %path.display(), error = %err, "failed to read linked file");
                    return (Err(RedError::IoFailure(err.to_string())), Vec::new());
                }
            }
        } else {
            None
        };

        let result = match self.buffer_mut(buffer_id) {
            Ok(buf) => buf.link_file(file_id, loaded).map_err(RedError::from),
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                let fired = self.fire(
                    HookKind::BufferFileLinked,
                    None,
                    HookPayload::BufferFileLinked { buffer_id, file_id },
                );
                (Ok(RedResponse::Unit), fired)
            }
            Err(err) => (Err(err), Vec::new()),
        }
    }

    fn write_to_file(&mut self, buffer_id: BufferId) -> RedResult<RedResponse> {
        let (file_id, bytes) = self.buffer_mut(buffer_id)?.write_to_file()?;
        let path = self.file_path(file_id)?.clone();
        std::fs::write(&path, &bytes).map_err(|err| RedError::IoFailure(err.to_string()))?;
        Ok(RedResponse::Unit)
    }

    /// Close a pane split, firing `pane_closed` for every invalidated pane
    /// id (deepest descendants first) and dropping their hook scopes so a
    /// stale scope can never match again.
    fn close_child(
        &mut self,
        id: PaneId,
        first_child: bool,
    ) -> (RedResult<RedResponse>, Vec<FiredHook>) {
        match self.panes.close_child(id, first_child) {
            Ok(invalidated) => {
                let mut fired = Vec::new();
                for pane_id in invalidated {
                    fired.extend(self.fire(
                        HookKind::PaneClosed,
                        Some(pane_id),
                        HookPayload::PaneClosed { pane_id },
                    ));
                    self.hooks.clear_scope(pane_id);
                }
                (Ok(RedResponse::Unit), fired)
            }
            Err(err) => (Err(RedError::from(err)), Vec::new()),
        }
    }

    /// The `error` hook fires with a stringified failure message; if that
    /// hook itself has no registered callback, `secondary_error` is left
    /// for the scheduler to raise once it observes the empty result.
    pub fn fire_error(&self, message: impl Into<String>) -> Vec<FiredHook> {
        let message = message.into();
        self.fire(HookKind::Error, None, HookPayload::Error { message })
    }

    pub fn fire_secondary_error(&self, message: impl Into<String>) -> Vec<FiredHook> {
        let message = message.into();
        self.fire(
            HookKind::SecondaryError,
            None,
            HookPayload::SecondaryError { message },
        )
    }

    pub fn fire_key_event(&self, key: impl Into<String>) -> Vec<FiredHook> {
        let key = key.into();
        self.fire(HookKind::KeyEvent, None, HookPayload::KeyEvent { key })
    }

    pub fn register_hook(&mut self, kind: HookKind, callback: CallbackHandle, scope: Option<PaneId>) {
        self.hooks.register(kind, callback, scope);
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}
