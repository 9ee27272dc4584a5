//! Line-oriented source writer.

/// Indentation used by generated files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentStyle {
    Tabs,
    Spaces(u8),
}

impl Default for IndentStyle {
    fn default() -> Self {
        IndentStyle::Spaces(2)
    }
}

/// Accumulates generated text one line at a time.
///
/// Lines always end in `\n` and never carry trailing whitespace, so two
/// writers fed the same calls produce identical bytes.
#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    depth: usize,
    style: IndentStyle,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(style: IndentStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    /// Write one line at the current depth. Continuation lines after an
    /// embedded newline are written verbatim.
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref().trim_end();
        if !text.is_empty() {
            self.indent();
            self.out.push_str(text);
        }
        self.out.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
        self
    }

    /// Write `text` and indent what follows.
    pub fn open(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(text);
        self.depth += 1;
        self
    }

    /// Dedent and write `text`.
    pub fn close(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.line(text)
    }

    /// Append pre-formatted text verbatim.
    pub fn raw(&mut self, text: &str) -> &mut Self {
        self.out.push_str(text);
        if !text.ends_with('\n') {
            self.out.push('\n');
        }
        self
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            match self.style {
                IndentStyle::Tabs => self.out.push('\t'),
                IndentStyle::Spaces(width) => {
                    for _ in 0..width {
                        self.out.push(' ');
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_blocks() {
        let mut w = CodeWriter::new();
        w.open("const a = {").line("b: 1,").close("};");
        assert_eq!(w.finish(), "const a = {\n  b: 1,\n};\n");
    }

    #[test]
    fn test_continuation_lines_are_verbatim() {
        let mut w = CodeWriter::with_indent(IndentStyle::Tabs);
        w.open("{").line("x(`a\n  b`)  ").close("}");
        assert_eq!(w.finish(), "{\n\tx(`a\n  b`)\n}\n");
    }

    #[test]
    fn test_blank_does_not_stack() {
        let mut w = CodeWriter::new();
        w.line("a").blank().blank().line("b");
        assert_eq!(w.finish(), "a\n\nb\n");
    }
}
