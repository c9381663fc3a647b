//! The typed wire between a running script task and the editor core:
//! `RedCall` requests, `RedResponse` replies, and the `RedError` taxonomy
//! both travel in. Nothing upstream of this crate needs to know whether a
//! call ever reached a real scripting host; the task scheduler only needs
//! a request/response pair to park and resume a task on.

use badred_ids::{BufferId, FileId, PaneId};
use badred_pane::{Frame, PaneTypeTag, SplitType};
use badred_text::BackendKind;

pub mod tagged;

pub use tagged::{BufferTypeTag, PaneNodeType};

/// Opaque reference to a script-side callback, allocated and interpreted
/// entirely by the scripting host. The core only ever stores and compares
/// these, never dereferences them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(pub u64);

/// Which event a hook fires on. Mirrors the hook registry's key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    KeyEvent,
    BufferFileLinked,
    PaneClosed,
    Error,
    SecondaryError,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedError {
    #[error("buffer {0} does not exist")]
    InvalidBuffer(BufferId),
    #[error("pane {0} does not exist")]
    InvalidPane(PaneId),
    #[error("file {0} does not exist")]
    InvalidFile(FileId),
    #[error("buffer already linked to a file")]
    AlreadyLinked,
    #[error("buffer is not linked to a file")]
    NotLinked,
    #[error("index {0} is out of bounds")]
    OutOfBounds(u32),
    #[error("byte index {0} does not fall on a codepoint boundary")]
    BoundaryViolation(u32),
    #[error("i/o failure: {0}")]
    IoFailure(String),
    #[error("script fault: {0}")]
    ScriptFault(String),
}

impl From<badred_text::BufferError> for RedError {
    fn from(err: badred_text::BufferError) -> Self {
        match err {
            badred_text::BufferError::AlreadyLinked => RedError::AlreadyLinked,
            badred_text::BufferError::NotLinked => RedError::NotLinked,
            badred_text::BufferError::OutOfBounds(n) => RedError::OutOfBounds(n),
            badred_text::BufferError::BoundaryViolation(n) => RedError::BoundaryViolation(n),
        }
    }
}

impl From<badred_pane::PaneError> for RedError {
    fn from(err: badred_pane::PaneError) -> Self {
        match err {
            badred_pane::PaneError::InvalidPane(id) => RedError::InvalidPane(id),
            badred_pane::PaneError::NotASplit(id) => RedError::InvalidPane(id),
        }
    }
}

pub type RedResult<T> = Result<T, RedError>;

/// A single closed, versioned enum carries every editor-facing operation a
/// script task can issue. Each variant's arguments are owned values so a
/// request can be queued past the lifetime of the stack frame that built
/// it.
#[derive(Debug, Clone, PartialEq)]
pub enum RedCall {
    CurrentBufferId,
    ActivePaneIndex,
    RootPaneIndex,
    SetActivePane(PaneId),

    BufferOpen,
    BufferClose(BufferId),
    BufferInsert(BufferId, String),
    BufferDelete(BufferId, u32),
    BufferCursor(BufferId),
    BufferCursorLine(BufferId),
    BufferCursorMovedByChar(BufferId, i64, bool),
    BufferIndexMovedByChar(BufferId, u32, i64, bool),
    BufferSetCursor(BufferId, u32, bool),
    BufferSetCursorLine(BufferId, u32),
    BufferLength(BufferId),
    BufferLineCount(BufferId),
    BufferContent(BufferId),
    BufferContentAt(BufferId, u32, u32),
    BufferLineContent(BufferId, u32),
    BufferLineContaining(BufferId, u32),
    BufferLineLength(BufferId, u32),
    BufferLineStart(BufferId, u32),
    BufferLineEnd(BufferId, u32),
    BufferLinkFile(BufferId, FileId, bool),
    BufferUnlinkFile(BufferId),
    BufferWriteToFile(BufferId),
    BufferType(BufferId),
    BufferSetType(BufferId, BackendKind),

    PaneIsFirst(PaneId),
    PaneIndexUpFrom(PaneId),
    PaneIndexDownFrom(PaneId, bool),
    PaneType(PaneId),
    PaneBufferIndex(PaneId),
    PaneSetBuffer(PaneId, BufferId),
    PaneVSplit(PaneId),
    PaneHSplit(PaneId),
    PaneCloseChild(PaneId, bool),
    PaneSetSplitPercent(PaneId, f32, bool),
    PaneSetSplitFixed(PaneId, u16, bool),
    PaneTopLine(PaneId),
    PaneSetTopLine(PaneId, u16),
    PaneFrame(PaneId),
    PaneWrap(PaneId),
    PaneSetWrap(PaneId, bool),

    FileOpen(String),
    FileClose(FileId),
    BufferCurrentFile(BufferId),

    SetHook(HookKind, CallbackHandle, Option<PaneId>),
    RunScript(String),
    SetTextStyle(String, String, String),
    EditorExit,
    EditorOptions,
    UpdateOptions(OptionsPatch),
}

/// Partial update for [`RedCall::UpdateOptions`]; unset fields are left
/// untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsPatch {
    pub tab_width: Option<u16>,
    pub expand_tabs: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EditorOptions {
    pub tab_width: u16,
    pub expand_tabs: bool,
}

impl EditorOptions {
    pub fn apply(&mut self, patch: &OptionsPatch) {
        if let Some(w) = patch.tab_width {
            self.tab_width = w;
        }
        if let Some(e) = patch.expand_tabs {
            self.expand_tabs = e;
        }
    }
}

/// The reply matching a `RedCall` variant one-to-one. A task never sees a
/// mismatched response kind: the scheduler constructs `RedResponse` from
/// the same match arm that consumed the `RedCall`.
#[derive(Debug, Clone, PartialEq)]
pub enum RedResponse {
    BufferId(BufferId),
    PaneId(PaneId),
    FileId(FileId),
    Unit,
    Text(String),
    U32(u32),
    U16(u16),
    Bool(bool),
    OptionBool(Option<bool>),
    BufferType(BufferTypeTag),
    PaneType(PaneNodeType),
    SplitType(SplitType),
    Frame(Frame),
    Options(EditorOptions),
    /// Carries a `run_script` call's source back out to the caller driving
    /// the scheduler, which resolves it into a task and spawns it. The
    /// state layer never executes scripts itself.
    ScriptSource(String),
}

impl RedResponse {
    pub fn buffer_id(self) -> RedResult<BufferId> {
        match self {
            RedResponse::BufferId(id) => Ok(id),
            other => Err(unexpected("BufferId", &other)),
        }
    }

    pub fn pane_id(self) -> RedResult<PaneId> {
        match self {
            RedResponse::PaneId(id) => Ok(id),
            other => Err(unexpected("PaneId", &other)),
        }
    }

    pub fn file_id(self) -> RedResult<FileId> {
        match self {
            RedResponse::FileId(id) => Ok(id),
            other => Err(unexpected("FileId", &other)),
        }
    }

    pub fn text(self) -> RedResult<String> {
        match self {
            RedResponse::Text(s) => Ok(s),
            other => Err(unexpected("Text", &other)),
        }
    }

    pub fn u32(self) -> RedResult<u32> {
        match self {
            RedResponse::U32(n) => Ok(n),
            other => Err(unexpected("U32", &other)),
        }
    }

    pub fn unit(self) -> RedResult<()> {
        match self {
            RedResponse::Unit => Ok(()),
            other => Err(unexpected("Unit", &other)),
        }
    }

    pub fn script_source(self) -> RedResult<String> {
        match self {
            RedResponse::ScriptSource(s) => Ok(s),
            other => Err(unexpected("ScriptSource", &other)),
        }
    }
}

fn unexpected(wanted: &str, got: &RedResponse) -> RedError {
    RedError::ScriptFault(format!("expected {wanted} response, got {got:?}"))
}

impl From<PaneTypeTag> for PaneNodeType {
    fn from(tag: PaneTypeTag) -> Self {
        match tag {
            PaneTypeTag::Leaf => PaneNodeType::Leaf,
            PaneTypeTag::HSplit => PaneNodeType::HSplit(None),
            PaneTypeTag::VSplit => PaneNodeType::VSplit(None),
        }
    }
}
