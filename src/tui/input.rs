//! Input field handling for the terminal user interface.

/// A single-line text input. `cursor` counts characters, not bytes, so
/// editing works for any UTF-8 input.
#[derive(Clone, Debug, Default)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
    pub active: bool,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input field with initial text, cursor at the end.
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
            active: false,
        }
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn len(&self) -> usize {
        self.value.chars().count()
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

    /// Delete the character at the cursor position.
    pub fn handle_delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.len() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    /// Replace the whole value and put the cursor at the end.
    pub fn set(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = self.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_in_the_middle() {
        let mut f = InputField::with_value("wrk");
        f.move_cursor_left();
        f.move_cursor_left();
        f.handle_char('o');
        assert_eq!(f.value, "work");
        f.handle_backspace();
        assert_eq!(f.value, "wrk");
        f.handle_delete();
        assert_eq!(f.value, "wk");
    }

    #[test]
    fn multibyte_characters_are_safe() {
        let mut f = InputField::with_value("café");
        assert_eq!(f.cursor, 4);
        f.handle_backspace();
        assert_eq!(f.value, "caf");
        f.move_home();
        f.handle_char('é');
        assert_eq!(f.value, "écaf");
        f.move_end();
        f.move_cursor_right();
        assert_eq!(f.cursor, 4);
    }
}
