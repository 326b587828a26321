//! The command line being typed, between Enter presses.

/// Characters accumulated since the last submit. Editing is append and
/// trailing delete only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    chars: Vec<char>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, c: char) {
        self.chars.push(c);
    }

    /// Remove the last character. Returns `false` on an empty buffer.
    pub fn backspace(&mut self) -> bool {
        self.chars.pop().is_some()
    }

    /// Take the whole line, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        let line: String = self.chars.iter().collect();
        self.chars.clear();
        line
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backspace_on_empty_is_noop() {
        let mut buf = LineBuffer::new();
        assert!(!buf.backspace());
        assert!(buf.is_empty());
    }

    #[test]
    fn backspace_removes_whole_char() {
        let mut buf = LineBuffer::new();
        for c in "héé".chars() {
            buf.push(c);
        }
        assert!(buf.backspace());
        assert_eq!(buf.as_string(), "hé");
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn take_empties() {
        let mut buf = LineBuffer::new();
        buf.push('l');
        buf.push('s');
        assert_eq!(buf.take(), "ls");
        assert!(buf.is_empty());
        assert_eq!(buf.take(), "");
    }
}
