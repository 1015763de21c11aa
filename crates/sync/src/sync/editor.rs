//! Narrow contract with the text-editor widget, plus an in-memory editor used
//! by the headless harness.

use serde::{Deserialize, Serialize};
use shared::{SourcePosition, SourceRange};

/// 1-based line/column as the editor widget reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EditorPosition {
    pub line: u32,
    pub column: u32,
}

impl EditorPosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Parser coordinates are 0-based
    pub fn to_source(self) -> SourcePosition {
        SourcePosition::new(self.line.saturating_sub(1), self.column.saturating_sub(1))
    }

    pub fn from_source(pos: SourcePosition) -> Self {
        Self::new(pos.line + 1, pos.column + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorRange {
    pub start: EditorPosition,
    pub end: EditorPosition,
}

impl EditorRange {
    pub fn new(start: EditorPosition, end: EditorPosition) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn from_source(range: &SourceRange) -> Self {
        Self::new(
            EditorPosition::from_source(range.start()),
            EditorPosition::from_source(range.end()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One cursor: `anchor == active` when collapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorSelection {
    pub anchor: EditorPosition,
    pub active: EditorPosition,
}

impl EditorSelection {
    pub fn cursor(pos: EditorPosition) -> Self {
        Self {
            anchor: pos,
            active: pos,
        }
    }

    pub fn range(range: EditorRange) -> Self {
        Self {
            anchor: range.start,
            active: range.end,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.active
    }

    pub fn as_range(&self) -> EditorRange {
        EditorRange::new(self.anchor, self.active)
    }
}

/// Replacement of a range of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: EditorRange,
    pub text: String,
}

/// What the core drives on the text editor
pub trait TextEditor {
    /// Full buffer contents
    fn text(&self) -> String;

    /// Replace the whole buffer (drops the widget's own undo stack)
    fn set_text(&mut self, text: &str);

    /// All cursors/selections, primary first
    fn selections(&self) -> Vec<EditorSelection>;

    fn cursor_position(&self) -> Option<EditorPosition> {
        self.selections().first().map(|s| s.active)
    }

    /// Set the primary selection (collapses secondary cursors)
    fn set_selection(&mut self, range: EditorRange);

    fn reveal_line_in_center(&mut self, line: u32);

    /// Replace the sync decoration collection
    fn set_decorations(&mut self, ranges: &[EditorRange]);

    fn clear_decorations(&mut self);

    /// Position → character offset into `text()`
    fn offset_at(&self, pos: EditorPosition) -> usize;

    /// Character offset → position
    fn position_at(&self, offset: usize) -> EditorPosition;

    /// Cursor/selection notifications produced by programmatic updates, for
    /// widgets that queue them instead of calling back synchronously.
    fn drain_selection_events(&mut self) -> usize {
        0
    }
}

/// Apply several edits as one buffer replacement.
/// Edits must not overlap; they are applied back to front.
pub fn apply_edits(editor: &mut impl TextEditor, edits: &[TextEdit]) {
    if edits.is_empty() {
        return;
    }
    let text = editor.text();
    let mut chars: Vec<char> = text.chars().collect();

    let mut spans: Vec<(usize, usize, &str)> = edits
        .iter()
        .map(|e| {
            let start = editor.offset_at(e.range.start).min(chars.len());
            let end = editor.offset_at(e.range.end).clamp(start, chars.len());
            (start, end, e.text.as_str())
        })
        .collect();
    spans.sort_by(|a, b| b.0.cmp(&a.0));

    for (start, end, replacement) in spans {
        chars.splice(start..end, replacement.chars());
    }
    let next: String = chars.into_iter().collect();
    editor.set_text(&next);
}

/// In-memory editor: plain text, selections and a decoration list
#[derive(Debug, Clone, Default)]
pub struct BufferEditor {
    text: String,
    selections: Vec<EditorSelection>,
    decorations: Vec<EditorRange>,
    revealed_line: Option<u32>,
    /// Number of `set_selection` calls (programmatic updates)
    selection_updates: usize,
    pending_events: usize,
}

impl BufferEditor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            selections: vec![EditorSelection::cursor(EditorPosition::new(1, 1))],
            ..Self::default()
        }
    }

    /// User moves the cursor(s); returns nothing, the host forwards the event
    pub fn set_selections(&mut self, selections: Vec<EditorSelection>) {
        self.selections = selections;
    }

    pub fn decorations(&self) -> &[EditorRange] {
        &self.decorations
    }

    pub fn revealed_line(&self) -> Option<u32> {
        self.revealed_line
    }

    pub fn selection_updates(&self) -> usize {
        self.selection_updates
    }

    fn line_starts(&self) -> Vec<usize> {
        let mut starts = vec![0];
        for (i, c) in self.text.chars().enumerate() {
            if c == '\n' {
                starts.push(i + 1);
            }
        }
        starts
    }
}

impl TextEditor for BufferEditor {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.selections = vec![EditorSelection::cursor(EditorPosition::new(1, 1))];
        self.decorations.clear();
        self.pending_events += 1;
    }

    fn selections(&self) -> Vec<EditorSelection> {
        self.selections.clone()
    }

    fn set_selection(&mut self, range: EditorRange) {
        self.selections = vec![EditorSelection::range(range)];
        self.selection_updates += 1;
        self.pending_events += 1;
    }

    fn reveal_line_in_center(&mut self, line: u32) {
        self.revealed_line = Some(line);
    }

    fn set_decorations(&mut self, ranges: &[EditorRange]) {
        self.decorations = ranges.to_vec();
    }

    fn clear_decorations(&mut self) {
        self.decorations.clear();
    }

    fn offset_at(&self, pos: EditorPosition) -> usize {
        let starts = self.line_starts();
        let total = self.text.chars().count();
        let line_idx = (pos.line.max(1) as usize - 1).min(starts.len() - 1);
        let line_start = starts[line_idx];
        let line_end = starts
            .get(line_idx + 1)
            .map(|next| next - 1)
            .unwrap_or(total);
        (line_start + pos.column.max(1) as usize - 1).min(line_end)
    }

    fn position_at(&self, offset: usize) -> EditorPosition {
        let starts = self.line_starts();
        let total = self.text.chars().count();
        let offset = offset.min(total);
        let line_idx = match starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        EditorPosition::new(line_idx as u32 + 1, (offset - starts[line_idx]) as u32 + 1)
    }

    fn drain_selection_events(&mut self) -> usize {
        std::mem::take(&mut self.pending_events)
    }
}
