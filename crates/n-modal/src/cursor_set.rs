//! The session's cursors: one, or a group created with `Ctrl-L`.
//!
//! Motions fan out to every cursor in creation order. Edits run from the
//! bottom of the buffer up so an earlier cursor's edit never shifts text a
//! later cursor has yet to touch; the buffer's slot remapping keeps the
//! already-edited cursors in place either way.

use crate::buffer::Buffer;
use crate::command::Extend;
use crate::cursor::Cursor;
use crate::error::{EditError, EditResult};
use crate::position::Position;

/// One cursor, or several acting together.
#[derive(Debug)]
pub enum CursorSet {
    Single(Cursor),
    /// Always two or more, in creation order.
    Group(Vec<Cursor>),
}

impl CursorSet {
    /// A single cursor at `pos`.
    pub fn new(buf: &mut Buffer, pos: Position) -> Self {
        Self::Single(Cursor::new(buf, pos, false))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Cursor] {
        match self {
            Self::Single(cursor) => std::slice::from_ref(cursor),
            Self::Group(cursors) => cursors,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [Cursor] {
        match self {
            Self::Single(cursor) => std::slice::from_mut(cursor),
            Self::Group(cursors) => cursors,
        }
    }

    /// The primary cursor: the only one, or the first of a group.
    #[must_use]
    pub fn first(&self) -> &Cursor {
        &self.as_slice()[0]
    }

    pub fn first_mut(&mut self) -> &mut Cursor {
        &mut self.as_mut_slice()[0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Always false; a set holds at least one cursor.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn positions(&self, buf: &Buffer) -> Vec<Position> {
        self.as_slice().iter().map(|c| c.position(buf)).collect()
    }

    pub fn set_past_end(&self, buf: &mut Buffer, past_end: bool) {
        for cursor in self.as_slice() {
            cursor.set_past_end(buf, past_end);
        }
    }

    // -- Fan-out ------------------------------------------------------------

    /// Apply `f` to every cursor in creation order.
    ///
    /// # Errors
    ///
    /// The first cursor's error, but only when every cursor failed.
    pub fn each<T>(
        &mut self,
        buf: &mut Buffer,
        mut f: impl FnMut(&mut Cursor, &mut Buffer) -> EditResult<T>,
    ) -> EditResult<Vec<T>> {
        let results: Vec<EditResult<T>> = self
            .as_mut_slice()
            .iter_mut()
            .map(|cursor| f(cursor, buf))
            .collect();
        gather(results)
    }

    /// Apply `f` to every cursor, bottom of the buffer first. Results come
    /// back in document order.
    ///
    /// # Errors
    ///
    /// As [`each`](Self::each).
    pub fn each_reverse<T>(
        &mut self,
        buf: &mut Buffer,
        mut f: impl FnMut(&mut Cursor, &mut Buffer) -> EditResult<T>,
    ) -> EditResult<Vec<T>> {
        let cursors = self.as_mut_slice();
        let mut order: Vec<usize> = (0..cursors.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(cursors[i].position(buf)));
        let mut results: Vec<EditResult<T>> =
            order.into_iter().map(|i| f(&mut cursors[i], buf)).collect();
        results.reverse();
        gather(results)
    }

    // -- Growth -------------------------------------------------------------

    fn push(&mut self, cursor: Cursor) {
        match self {
            Self::Group(cursors) => cursors.push(cursor),
            Self::Single(_) => {
                let Self::Single(first) = std::mem::replace(self, Self::Group(Vec::new())) else {
                    return;
                };
                *self = Self::Group(vec![first, cursor]);
            }
        }
    }

    /// `Ctrl-L` sub-commands: add a cursor below, above or at the next
    /// matching selection, or drop the newest.
    ///
    /// # Errors
    ///
    /// [`EditError::NoTarget`] when there is no line or selection to add a
    /// cursor at, or nothing to pop.
    pub fn extend(&mut self, buf: &mut Buffer, how: Extend, count: usize) -> EditResult<()> {
        let step = count.max(1);
        let cursors = self.as_slice();
        let top = cursors.iter().map(|c| c.position(buf).line).min().unwrap_or(1);
        let bottom = cursors.iter().map(|c| c.position(buf).line).max().unwrap_or(1);
        let added = match how {
            Extend::Down => cursors[cursors.len() - 1].sibling(buf, bottom + 1),
            Extend::DownSkip => cursors[cursors.len() - 1].sibling(buf, bottom + step),
            Extend::Up => top.checked_sub(1).and_then(|line| cursors[0].sibling(buf, line)),
            Extend::UpSkip => top.checked_sub(step).and_then(|line| cursors[0].sibling(buf, line)),
            Extend::NextSelection => {
                let last = self.is_group().then(|| cursors[cursors.len() - 1].position(buf));
                cursors[0].next_selection(buf, last)
            }
            Extend::Pop => {
                return if self.pop(buf) {
                    Ok(())
                } else {
                    Err(EditError::NoTarget)
                };
            }
        };
        let cursor = added.ok_or(EditError::NoTarget)?;
        tracing::debug!(cursors = self.len() + 1, at = %cursor.position(buf), "cursor added");
        self.push(cursor);
        Ok(())
    }

    /// Drop the newest cursor of a group.
    pub fn pop(&mut self, buf: &mut Buffer) -> bool {
        let Self::Group(cursors) = self else {
            return false;
        };
        if let Some(last) = cursors.pop() {
            last.dispose(buf);
        }
        if cursors.len() == 1 {
            if let Some(only) = cursors.pop() {
                *self = Self::Single(only);
            }
        }
        true
    }

    /// Back to the primary cursor alone; the others are released.
    pub fn collapse(&mut self, buf: &mut Buffer) {
        if let Self::Group(cursors) = self {
            let mut drained = cursors.drain(..);
            let Some(first) = drained.next() else {
                return;
            };
            for extra in drained {
                extra.dispose(buf);
            }
            *self = Self::Single(first);
        }
    }

    /// Replace the set with plain cursors at `positions`, reusing the
    /// primary cursor for the first one. Empty `positions` only collapses.
    pub fn reset(&mut self, buf: &mut Buffer, positions: &[Position], past_end: bool) {
        self.collapse(buf);
        let Some((&head, tail)) = positions.split_first() else {
            return;
        };
        let first = self.first_mut();
        first.clear_visual();
        first.set_past_end(buf, past_end);
        first.move_to(buf, head);
        for &pos in tail {
            self.push(Cursor::new(buf, pos, past_end));
        }
    }

    /// Release every slot.
    pub fn dispose(self, buf: &mut Buffer) {
        match self {
            Self::Single(cursor) => cursor.dispose(buf),
            Self::Group(cursors) => cursors.into_iter().for_each(|c| c.dispose(buf)),
        }
    }
}

fn gather<T>(results: Vec<EditResult<T>>) -> EditResult<Vec<T>> {
    let mut first_error = None;
    let mut values = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) if values.is_empty() => Err(err),
        _ => Ok(values),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::VisualKind;
    use crate::motion::{Motion, ObjectKind, Operand};
    use crate::position::Range;
    use pretty_assertions::assert_eq;

    fn p(line: usize, column: usize) -> Position {
        Position::new(line, column)
    }

    // -- Growth -------------------------------------------------------------

    #[test]
    fn extend_down_up_and_pop() {
        let mut buf = Buffer::from_text("aaa\nbbb\nccc\nddd\neee");
        let mut set = CursorSet::new(&mut buf, p(2, 2));
        set.extend(&mut buf, Extend::Down, 0).unwrap();
        set.extend(&mut buf, Extend::Up, 0).unwrap();
        assert_eq!(set.positions(&buf), vec![p(2, 2), p(3, 2), p(1, 2)]);
        assert_eq!(set.extend(&mut buf, Extend::Up, 0), Err(EditError::NoTarget));
        set.extend(&mut buf, Extend::DownSkip, 2).unwrap();
        assert_eq!(set.positions(&buf)[3], p(5, 2));

        set.extend(&mut buf, Extend::Pop, 0).unwrap();
        assert_eq!(set.len(), 3);
        set.collapse(&mut buf);
        assert!(!set.is_group());
        assert_eq!(buf.cursor_count(), 1);
        assert_eq!(set.extend(&mut buf, Extend::Pop, 0), Err(EditError::NoTarget));
    }

    #[test]
    fn pop_to_one_becomes_single() {
        let mut buf = Buffer::from_text("a\nb");
        let mut set = CursorSet::new(&mut buf, p(1, 1));
        set.extend(&mut buf, Extend::Down, 0).unwrap();
        assert!(set.pop(&mut buf));
        assert!(matches!(set, CursorSet::Single(_)));
        assert_eq!(buf.cursor_count(), 1);
    }

    #[test]
    fn next_selection_follows_matches() {
        let mut buf = Buffer::from_text("ab x ab y ab");
        let mut set = CursorSet::new(&mut buf, p(1, 1));
        let first = set.first_mut();
        first.start_visual(&buf, VisualKind::Char);
        first
            .set_visual_operand(&mut buf, &Operand::motion(Motion::Right, 0))
            .unwrap();
        set.extend(&mut buf, Extend::NextSelection, 0).unwrap();
        set.extend(&mut buf, Extend::NextSelection, 0).unwrap();
        assert_eq!(set.positions(&buf), vec![p(1, 2), p(1, 7), p(1, 12)]);
        assert_eq!(
            set.extend(&mut buf, Extend::NextSelection, 0),
            Err(EditError::NoTarget)
        );
    }

    #[test]
    fn reset_rebuilds_the_group() {
        let mut buf = Buffer::from_text("abc\nabc\nabc");
        let mut set = CursorSet::new(&mut buf, p(1, 1));
        set.extend(&mut buf, Extend::Down, 0).unwrap();
        set.reset(&mut buf, &[p(1, 4), p(2, 4), p(3, 4)], true);
        assert_eq!(set.positions(&buf), vec![p(1, 4), p(2, 4), p(3, 4)]);
        assert_eq!(buf.cursor_count(), 3);

        set.reset(&mut buf, &[p(2, 2)], false);
        assert!(!set.is_group());
        assert_eq!(set.positions(&buf), vec![p(2, 2)]);
        assert_eq!(buf.cursor_count(), 1);
    }

    // -- Fan-out ------------------------------------------------------------

    #[test]
    fn edits_run_bottom_up_and_report_in_order() {
        let mut buf = Buffer::from_text("one two\nthree four\nfive six");
        let mut set = CursorSet::new(&mut buf, p(1, 1));
        set.extend(&mut buf, Extend::Down, 0).unwrap();
        set.extend(&mut buf, Extend::Down, 0).unwrap();
        let deleted = set
            .each_reverse(&mut buf, |cursor, buf| {
                let range = cursor.operand_range(buf, &Operand::motion(Motion::Word, 0))?;
                Ok(crate::cell::line_to_string(&cursor.delete_range(buf, &range).text()[0]))
            })
            .unwrap();
        assert_eq!(deleted, vec!["one ", "three ", "five "]);
        assert_eq!(buf.contents(), "two\nfour\nsix");
        assert_eq!(set.positions(&buf), vec![p(1, 1), p(2, 1), p(3, 1)]);
    }

    #[test]
    fn line_deletes_keep_every_cursor_on_its_text() {
        let mut buf = Buffer::from_text("a\nb\nc\nd");
        let mut set = CursorSet::new(&mut buf, p(1, 1));
        set.extend(&mut buf, Extend::DownSkip, 2).unwrap();
        set.each_reverse(&mut buf, |cursor, buf| {
            let range = cursor.operand_range(buf, &Operand::object(ObjectKind::Line, false, 0))?;
            Ok(cursor.delete_range(buf, &range))
        })
        .unwrap();
        assert_eq!(buf.contents(), "b\nd");
        assert_eq!(set.positions(&buf), vec![p(1, 1), p(2, 1)]);
    }

    #[test]
    fn motions_fan_out_and_fail_only_when_every_cursor_fails() {
        let mut buf = Buffer::from_text("abc\nx");
        let mut set = CursorSet::new(&mut buf, p(1, 1));
        set.extend(&mut buf, Extend::Down, 0).unwrap();
        let moved = set.each(&mut buf, |cursor, buf| {
            cursor.move_operand(buf, &Operand::motion(Motion::Right, 2))
        });
        assert_eq!(moved, Ok(vec![p(1, 3), p(2, 1)]));

        let failed = set.each(&mut buf, |cursor, buf| {
            cursor.operand_range(buf, &Operand::motion(Motion::Up, 5)).map(|r: Range| r.end)
        });
        assert_eq!(failed, Ok(vec![p(1, 1)]));

        set.each(&mut buf, |cursor, buf| {
            cursor.move_operand(buf, &Operand::motion(Motion::StartLine, 0))
        })
        .unwrap();
        let none = set.each(&mut buf, |cursor, buf| {
            cursor.operand_range(buf, &Operand::motion(Motion::Left, 0)).map(|r: Range| r.end)
        });
        assert_eq!(none, Err(EditError::NoTarget));
    }
}
