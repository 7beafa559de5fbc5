use std::fmt;

use thiserror::Error;

use crate::change::{ChangeError, ChangeSet};
use crate::direction::Direction;

/// Lifecycle hooks a step may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    PreUp,
    Up,
    PostUp,
    PreDown,
    Down,
    PostDown,
    /// Single bidirectional hook, called with the direction being walked.
    Migrate,
}

impl HookKind {
    pub const ALL: [HookKind; 7] = [
        HookKind::PreUp,
        HookKind::Up,
        HookKind::PostUp,
        HookKind::PreDown,
        HookKind::Down,
        HookKind::PostDown,
        HookKind::Migrate,
    ];

    pub fn pre(direction: Direction) -> Self {
        match direction {
            Direction::Up => HookKind::PreUp,
            Direction::Down => HookKind::PreDown,
        }
    }

    pub fn main(direction: Direction) -> Self {
        match direction {
            Direction::Up => HookKind::Up,
            Direction::Down => HookKind::Down,
        }
    }

    pub fn post(direction: Direction) -> Self {
        match direction {
            Direction::Up => HookKind::PostUp,
            Direction::Down => HookKind::PostDown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::PreUp => "pre-up",
            HookKind::Up => "up",
            HookKind::PostUp => "post-up",
            HookKind::PreDown => "pre-down",
            HookKind::Down => "down",
            HookKind::PostDown => "post-down",
            HookKind::Migrate => "migrate",
        }
    }

    fn bit(self) -> u8 {
        match self {
            HookKind::PreUp => 1 << 0,
            HookKind::Up => 1 << 1,
            HookKind::PostUp => 1 << 2,
            HookKind::PreDown => 1 << 3,
            HookKind::Down => 1 << 4,
            HookKind::PostDown => 1 << 5,
            HookKind::Migrate => 1 << 6,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The hooks a step declares. Captured once when the step is registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookSet(u8);

impl HookSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn with(mut self, kind: HookKind) -> Self {
        self.insert(kind);
        self
    }

    pub fn insert(&mut self, kind: HookKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(self, kind: HookKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = HookKind> {
        HookKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }

    pub fn pre_hook(self, direction: Direction) -> Option<HookKind> {
        let kind = HookKind::pre(direction);
        self.contains(kind).then_some(kind)
    }

    pub fn post_hook(self, direction: Direction) -> Option<HookKind> {
        let kind = HookKind::post(direction);
        self.contains(kind).then_some(kind)
    }

    /// Hook that produces the step's changes for `direction`: the
    /// direction-specific one when declared, otherwise the bidirectional one.
    pub fn main_hook(self, direction: Direction) -> Option<HookKind> {
        let kind = HookKind::main(direction);
        if self.contains(kind) {
            Some(kind)
        } else if self.contains(HookKind::Migrate) {
            Some(HookKind::Migrate)
        } else {
            None
        }
    }
}

impl FromIterator<HookKind> for HookSet {
    fn from_iter<I: IntoIterator<Item = HookKind>>(iter: I) -> Self {
        iter.into_iter().fold(HookSet::empty(), HookSet::with)
    }
}

impl fmt::Display for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(HookKind::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Change(#[from] ChangeError),
    #[error("hook '{0}' is not implemented")]
    MissingHook(HookKind),
    #[error("{0}")]
    Failed(String),
}

/// A versioned unit of schema change.
///
/// Hooks record the changes they want applied into `changes`; the engine
/// dispatches them after the hook returns.
pub trait Step: Send + Sync {
    /// Hooks this step implements.
    fn hooks(&self) -> HookSet;

    /// Run one hook. `direction` is the direction being walked, which only
    /// matters to [`HookKind::Migrate`].
    fn run(
        &self,
        hook: HookKind,
        direction: Direction,
        changes: &mut ChangeSet,
    ) -> Result<(), StepError>;
}
