//! Action log with grouped undo/redo
//!
//! Operations are grouped into Actions, one per user gesture. An Action
//! remembers the handles it created and the records of the operations it
//! removed, so reverting it is: capture and remove the created handles, then
//! re-issue the removed records. Undo and redo are both that same revert; the
//! reverted Action's inverse goes onto the opposite stack.
//!
//! Re-issued records come back under new handles. Every reference to the old
//! handle in either stack is remapped so later reverts target live handles.

use pdfedit_ops::{EditOperation, OpId};

use crate::engine::{fetch_record, issue, DocumentEngine};
use crate::error::{Result, SessionError};

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub label: String,
    /// Live handles created by this action
    pub handles: Vec<OpId>,
    /// Records of operations this action removed
    pub displaced: Vec<EditOperation>,
}

impl Action {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            handles: Vec::new(),
            displaced: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty() && self.displaced.is_empty()
    }

    fn remap(&mut self, old: OpId, new: OpId) {
        for handle in self.handles.iter_mut().filter(|h| **h == old) {
            *handle = new;
        }
    }
}

/// A record re-issued during a revert
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    /// Handle the record lived under before it was removed
    pub previous: OpId,
    pub handle: OpId,
    /// The record, carrying its new handle as id
    pub record: EditOperation,
}

/// Effect of an undo, redo or abort on the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reverted {
    pub label: String,
    pub removed: Vec<OpId>,
    pub restored: Vec<Restored>,
}

#[derive(Debug, Default)]
pub struct ActionLog {
    open: Option<Action>,
    undo_stack: Vec<Action>,
    redo_stack: Vec<Action>,
    dirty: bool,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new empty action. Only one action may be open at a time.
    pub fn begin_action(&mut self, label: &str) -> Result<()> {
        if let Some(open) = &self.open {
            return Err(SessionError::sequencing(format!(
                "begin_action({}) while '{}' is still open",
                label, open.label
            )));
        }
        tracing::debug!(label, "action opened");
        self.open = Some(Action::new(label));
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Append a freshly created handle to the open action
    pub fn record(&mut self, handle: OpId) -> Result<()> {
        let open = self.open_mut("record")?;
        open.handles.push(handle);
        Ok(())
    }

    /// Remove `handle` from the engine as part of the open action, keeping
    /// its record so the removal can be reverted.
    pub fn displace<E: DocumentEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        handle: OpId,
    ) -> Result<EditOperation> {
        self.open_mut("displace")?;
        let record = fetch_record(engine, handle)?;
        engine.remove_operation(handle)?;

        let open = self.open_mut("displace")?;
        if let Some(pos) = open.handles.iter().position(|h| *h == handle) {
            // Created and removed within the same gesture: nothing to restore
            open.handles.remove(pos);
        } else {
            open.displaced.push(record.clone());
        }
        Ok(record)
    }

    /// Close the open action and push it onto the undo stack. Clears the redo
    /// stack. An empty action is dropped and leaves both stacks untouched.
    pub fn commit_action(&mut self) -> Result<Option<Action>> {
        let action = self
            .open
            .take()
            .ok_or_else(|| SessionError::sequencing("commit_action without an open action"))?;
        if action.is_empty() {
            tracing::debug!(label = %action.label, "empty action dropped");
            return Ok(None);
        }

        tracing::info!(
            label = %action.label,
            handles = ?action.handles,
            displaced = action.displaced.len(),
            "action committed"
        );
        self.redo_stack.clear();
        self.undo_stack.push(action.clone());
        self.dirty = true;
        Ok(Some(action))
    }

    /// Discard the open action, undoing whatever it already did to the engine.
    ///
    /// If the engine refuses the revert, the action is committed as it stands
    /// instead of being dropped: its displaced records stay on the undo stack,
    /// and undoing it restores them and remaps any older action still
    /// pointing at their old handles.
    pub fn abort_action<E: DocumentEngine + ?Sized>(&mut self, engine: &mut E) -> Result<Reverted> {
        let mut action = self
            .open
            .take()
            .ok_or_else(|| SessionError::sequencing("abort_action without an open action"))?;
        tracing::debug!(label = %action.label, "action aborted");
        match self.revert(engine, &mut action) {
            Ok((reverted, _)) => Ok(reverted),
            Err(err) => {
                if !action.is_empty() {
                    tracing::warn!(
                        label = %action.label,
                        handles = ?action.handles,
                        displaced = action.displaced.len(),
                        error = %err,
                        "abort could not be reverted, kept on the undo stack"
                    );
                    self.redo_stack.clear();
                    self.undo_stack.push(action);
                    self.dirty = true;
                }
                Err(err)
            }
        }
    }

    /// Revert the most recent committed action. `None` when there is nothing
    /// to undo.
    pub fn undo<E: DocumentEngine + ?Sized>(&mut self, engine: &mut E) -> Result<Option<Reverted>> {
        self.step(engine, Direction::Undo)
    }

    /// Re-apply the most recently undone action. `None` when there is nothing
    /// to redo.
    pub fn redo<E: DocumentEngine + ?Sized>(&mut self, engine: &mut E) -> Result<Option<Reverted>> {
        self.step(engine, Direction::Redo)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn has_changes(&self) -> bool {
        self.can_undo()
    }

    /// True when the log changed since the last `mark_saved`
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn undo_stack(&self) -> &[Action] {
        &self.undo_stack
    }

    pub fn redo_stack(&self) -> &[Action] {
        &self.redo_stack
    }

    fn open_mut(&mut self, call: &str) -> Result<&mut Action> {
        self.open
            .as_mut()
            .ok_or_else(|| SessionError::sequencing(format!("{} without an open action", call)))
    }

    fn step<E: DocumentEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        direction: Direction,
    ) -> Result<Option<Reverted>> {
        if self.open.is_some() {
            return Err(SessionError::sequencing(format!(
                "{:?} while an action is open",
                direction
            )));
        }
        let source = match direction {
            Direction::Undo => &mut self.undo_stack,
            Direction::Redo => &mut self.redo_stack,
        };
        let Some(mut action) = source.pop() else {
            return Ok(None);
        };

        match self.revert(engine, &mut action) {
            Ok((reverted, inverse)) => {
                tracing::info!(
                    label = %reverted.label,
                    removed = ?reverted.removed,
                    restored = reverted.restored.len(),
                    "{:?} applied",
                    direction
                );
                match direction {
                    Direction::Undo => self.redo_stack.push(inverse),
                    Direction::Redo => self.undo_stack.push(inverse),
                }
                self.dirty = true;
                Ok(Some(reverted))
            }
            Err(err) => {
                tracing::warn!(label = %action.label, error = %err, "{:?} failed", direction);
                match direction {
                    Direction::Undo => self.undo_stack.push(action),
                    Direction::Redo => self.redo_stack.push(action),
                }
                Err(err)
            }
        }
    }

    /// Apply the inverse of `action` to the engine. On failure the engine is
    /// rolled back and `action` is remapped to whatever handles now hold its
    /// operations.
    fn revert<E: DocumentEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        action: &mut Action,
    ) -> Result<(Reverted, Action)> {
        // Capture everything before touching the engine
        let records = action
            .handles
            .iter()
            .map(|&handle| fetch_record(engine, handle))
            .collect::<Result<Vec<_>>>()?;

        let mut removed: Vec<EditOperation> = Vec::with_capacity(records.len());
        for record in records {
            if let Err(err) = engine.remove_operation(record.id()) {
                self.rollback(engine, action, &removed, &[]);
                return Err(err.into());
            }
            removed.push(record);
        }

        let mut restored = Vec::with_capacity(action.displaced.len());
        for record in &action.displaced {
            match issue(engine, record) {
                Ok(handle) => {
                    let mut record = record.clone();
                    let previous = record.id();
                    record.set_id(handle);
                    restored.push(Restored {
                        previous,
                        handle,
                        record,
                    });
                }
                Err(err) => {
                    self.rollback(engine, action, &removed, &restored);
                    return Err(err.into());
                }
            }
        }

        for entry in &restored {
            self.remap(entry.previous, entry.handle);
        }

        let inverse = Action {
            label: action.label.clone(),
            handles: restored.iter().map(|r| r.handle).collect(),
            displaced: removed.clone(),
        };
        let reverted = Reverted {
            label: action.label.clone(),
            removed: removed.iter().map(EditOperation::id).collect(),
            restored,
        };
        Ok((reverted, inverse))
    }

    fn rollback<E: DocumentEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        action: &mut Action,
        removed: &[EditOperation],
        restored: &[Restored],
    ) {
        for entry in restored {
            if let Err(err) = engine.remove_operation(entry.handle) {
                tracing::error!(handle = entry.handle, error = %err, "rollback could not remove re-issued operation");
            }
        }
        for record in removed {
            match issue(engine, record) {
                Ok(handle) => {
                    action.remap(record.id(), handle);
                    self.remap(record.id(), handle);
                }
                Err(err) => {
                    tracing::error!(handle = record.id(), error = %err, "rollback could not restore operation");
                }
            }
        }
    }

    fn remap(&mut self, old: OpId, new: OpId) {
        if old == new {
            return;
        }
        for action in self
            .undo_stack
            .iter_mut()
            .chain(self.redo_stack.iter_mut())
            .chain(self.open.iter_mut())
        {
            action.remap(old, new);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}
