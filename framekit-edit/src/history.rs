//! Undo/redo command stack
//!
//! Commands are recorded after the edit already happened: [`UndoHistory::push`]
//! stores the command without applying it. [`UndoHistory::undo`] and
//! [`UndoHistory::redo`] apply the command with the history borrow released,
//! so side effects may query the history. Pushes coming from those side
//! effects are refused.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use framekit_core::{Error, FlagGuard, Result};

/// One reversible edit
pub trait UndoCommand: Any {
    fn undo(&mut self);
    fn redo(&mut self);

    /// Text shown in undo/redo menus
    fn text(&self) -> &str;

    /// Commands with equal ids are offered to [`UndoCommand::merge_with`];
    /// `None` never merges
    fn id(&self) -> Option<u32> {
        None
    }

    /// Absorb `other`, which is newer than `self`. Returns false when the two
    /// must stay separate.
    fn merge_with(&mut self, _other: &dyn UndoCommand) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// Size limit of an [`UndoHistory`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of commands kept; the oldest are dropped first.
    /// `None` keeps everything.
    pub limit: Option<usize>,
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.limit == Some(0) {
            return Err(Error::InvalidConfig(
                "history limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

type CommandCell = Rc<RefCell<Box<dyn UndoCommand>>>;

struct HistoryState {
    commands: RefCell<Vec<CommandCell>>,
    /// Number of commands currently applied
    index: Cell<usize>,
    config: Cell<HistoryConfig>,
    applying: Cell<bool>,
}

/// Shared undo stack
///
/// Cloning yields another handle to the same stack.
#[derive(Clone)]
pub struct UndoHistory {
    state: Rc<HistoryState>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            state: Rc::new(HistoryState {
                commands: RefCell::new(Vec::new()),
                index: Cell::new(0),
                config: Cell::new(config),
                applying: Cell::new(false),
            }),
        }
    }

    pub fn config(&self) -> HistoryConfig {
        self.state.config.get()
    }

    /// Change the limit, dropping the oldest commands if needed
    pub fn set_config(&self, config: HistoryConfig) -> Result<()> {
        config.validate()?;
        self.state.config.set(config);
        self.enforce_limit();
        Ok(())
    }

    /// Record a command that has already been applied
    ///
    /// Redo entries are discarded. If the top command shares the new
    /// command's id and accepts the merge, no new entry is created.
    /// Returns false when the push was refused because a command is being
    /// applied.
    pub fn push(&self, command: Box<dyn UndoCommand>) -> bool {
        if self.state.applying.get() {
            log::trace!("Ignoring '{}' pushed while applying history", command.text());
            return false;
        }

        let index = self.state.index.get();
        {
            let mut commands = self.state.commands.borrow_mut();
            commands.truncate(index);

            if let (Some(top), Some(id)) = (commands.last(), command.id()) {
                let mut top = top.borrow_mut();
                if top.id() == Some(id) && top.merge_with(command.as_ref()) {
                    log::trace!("Merged '{}' into previous command", command.text());
                    return true;
                }
            }

            log::debug!("Recorded '{}'", command.text());
            commands.push(Rc::new(RefCell::new(command)));
        }
        self.state.index.set(index + 1);
        self.enforce_limit();
        true
    }

    /// Revert the most recent applied command
    pub fn undo(&self) -> bool {
        if self.state.applying.get() {
            return false;
        }
        let index = self.state.index.get();
        let Some(command) = self.command_at(index.wrapping_sub(1)) else {
            return false;
        };
        self.state.index.set(index - 1);
        self.apply(&command, |command| {
            log::debug!("Undo '{}'", command.text());
            command.undo();
        });
        true
    }

    /// Re-apply the most recent undone command
    pub fn redo(&self) -> bool {
        if self.state.applying.get() {
            return false;
        }
        let index = self.state.index.get();
        let Some(command) = self.command_at(index) else {
            return false;
        };
        self.state.index.set(index + 1);
        self.apply(&command, |command| {
            log::debug!("Redo '{}'", command.text());
            command.redo();
        });
        true
    }

    pub fn can_undo(&self) -> bool {
        self.state.index.get() > 0
    }

    pub fn can_redo(&self) -> bool {
        self.state.index.get() < self.len()
    }

    /// Number of commands, applied or undone
    pub fn len(&self) -> usize {
        self.state.commands.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of applied commands
    pub fn index(&self) -> usize {
        self.state.index.get()
    }

    pub fn undo_text(&self) -> Option<String> {
        let index = self.state.index.get();
        self.command_at(index.wrapping_sub(1))
            .map(|command| command.borrow().text().to_string())
    }

    pub fn redo_text(&self) -> Option<String> {
        self.command_at(self.state.index.get())
            .map(|command| command.borrow().text().to_string())
    }

    pub fn clear(&self) {
        self.state.commands.borrow_mut().clear();
        self.state.index.set(0);
    }

    /// True while a command's undo or redo is running
    pub fn is_applying(&self) -> bool {
        self.state.applying.get()
    }

    fn command_at(&self, index: usize) -> Option<CommandCell> {
        self.state.commands.borrow().get(index).cloned()
    }

    fn apply(&self, command: &CommandCell, run: impl FnOnce(&mut Box<dyn UndoCommand>)) {
        let _applying = FlagGuard::set(&self.state.applying);
        let mut command = command.borrow_mut();
        run(&mut command);
    }

    fn enforce_limit(&self) {
        let Some(limit) = self.state.config.get().limit else {
            return;
        };
        let mut commands = self.state.commands.borrow_mut();
        if commands.len() <= limit {
            return;
        }
        let excess = commands.len() - limit;
        commands.drain(..excess);
        let index = self.state.index.get().saturating_sub(excess);
        self.state.index.set(index);
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UndoHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoHistory")
            .field("len", &self.len())
            .field("index", &self.index())
            .field("applying", &self.is_applying())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        value: Rc<Cell<i32>>,
        delta: i32,
        text: String,
        mergeable: bool,
    }

    impl Counter {
        fn boxed(value: &Rc<Cell<i32>>, delta: i32, mergeable: bool) -> Box<dyn UndoCommand> {
            value.set(value.get() + delta);
            Box::new(Self {
                value: value.clone(),
                delta,
                text: format!("Add {}", delta),
                mergeable,
            })
        }
    }

    impl UndoCommand for Counter {
        fn undo(&mut self) {
            self.value.set(self.value.get() - self.delta);
        }

        fn redo(&mut self) {
            self.value.set(self.value.get() + self.delta);
        }

        fn text(&self) -> &str {
            &self.text
        }

        fn id(&self) -> Option<u32> {
            self.mergeable.then_some(7)
        }

        fn merge_with(&mut self, other: &dyn UndoCommand) -> bool {
            let Some(other) = other.as_any().downcast_ref::<Counter>() else {
                return false;
            };
            self.delta += other.delta;
            true
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_undo_redo_walks_the_stack() {
        let value = Rc::new(Cell::new(0));
        let history = UndoHistory::new();
        history.push(Counter::boxed(&value, 1, false));
        history.push(Counter::boxed(&value, 10, false));
        assert_eq!(value.get(), 11);
        assert_eq!(history.undo_text().as_deref(), Some("Add 10"));

        assert!(history.undo());
        assert_eq!(value.get(), 1);
        assert!(history.can_redo());
        assert_eq!(history.redo_text().as_deref(), Some("Add 10"));

        assert!(history.undo());
        assert_eq!(value.get(), 0);
        assert!(!history.undo());

        assert!(history.redo());
        assert_eq!(value.get(), 1);
        assert_eq!(history.index(), 1);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_push_discards_redo_entries() {
        let value = Rc::new(Cell::new(0));
        let history = UndoHistory::new();
        history.push(Counter::boxed(&value, 1, false));
        history.push(Counter::boxed(&value, 2, false));
        history.undo();
        history.push(Counter::boxed(&value, 5, false));

        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(value.get(), 6);
    }

    #[test]
    fn test_matching_ids_merge() {
        let value = Rc::new(Cell::new(0));
        let history = UndoHistory::new();
        history.push(Counter::boxed(&value, 1, true));
        history.push(Counter::boxed(&value, 2, true));
        history.push(Counter::boxed(&value, 4, false));
        assert_eq!(history.len(), 2);

        history.undo();
        history.undo();
        assert_eq!(value.get(), 0);
    }

    #[test]
    fn test_merge_does_not_reach_past_undone_commands() {
        let value = Rc::new(Cell::new(0));
        let history = UndoHistory::new();
        history.push(Counter::boxed(&value, 1, true));
        history.undo();
        history.push(Counter::boxed(&value, 2, true));
        assert_eq!(history.len(), 1);
        history.undo();
        assert_eq!(value.get(), 0);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let value = Rc::new(Cell::new(0));
        let history = UndoHistory::with_config(HistoryConfig { limit: Some(2) });
        for delta in [1, 2, 3] {
            history.push(Counter::boxed(&value, delta, false));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.index(), 2);
        while history.undo() {}
        assert_eq!(value.get(), 1);
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        assert!(HistoryConfig { limit: Some(0) }.validate().is_err());
        assert!(UndoHistory::new()
            .set_config(HistoryConfig { limit: Some(0) })
            .is_err());
    }

    #[test]
    fn test_push_while_applying_is_refused() {
        struct Nested {
            history: UndoHistory,
            refused: Rc<Cell<bool>>,
        }

        impl UndoCommand for Nested {
            fn undo(&mut self) {
                let value = Rc::new(Cell::new(0));
                assert!(self.history.is_applying());
                self.refused
                    .set(!self.history.push(Counter::boxed(&value, 1, false)));
            }

            fn redo(&mut self) {}

            fn text(&self) -> &str {
                "nested"
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let history = UndoHistory::new();
        let refused = Rc::new(Cell::new(false));
        history.push(Box::new(Nested {
            history: history.clone(),
            refused: refused.clone(),
        }));
        assert!(history.undo());
        assert!(refused.get());
        assert_eq!(history.len(), 1);
        assert!(!history.is_applying());
    }

    #[test]
    fn test_clear() {
        let value = Rc::new(Cell::new(0));
        let history = UndoHistory::new();
        history.push(Counter::boxed(&value, 1, false));
        history.clear();
        assert!(history.is_empty());
        assert!(!history.can_undo());
        assert_eq!(history.undo_text(), None);
    }
}
