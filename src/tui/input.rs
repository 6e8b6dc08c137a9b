//! Single-line text entry for board prompts.

/// A text input field with a cursor, counted in characters.
#[derive(Clone, Default)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input field with initial text value.
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// Insert a character at the current cursor position.
    pub fn handle_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_index(self.cursor - 1);
            self.value.remove(at);
            self.cursor -= 1;
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_at_cursor_with_multibyte_text() {
        let mut f = InputField::with_value("café");
        f.move_cursor_left();
        f.handle_char('x');
        assert_eq!(f.value, "cafxé");
        f.move_cursor_right();
        f.handle_backspace();
        assert_eq!(f.value, "cafx");
        assert_eq!(f.cursor, 4);
    }
}
