//! Diagnostic rendering for the command line.

use crate::diagnostic::Diagnostic;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// error[E302]: the files lib/b.sti and lib/c.sti make inconsistent assumptions over interface A
///   --> lib/c.sti
///    = help: recompile the older of the two files
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint_header(&self, diag: &Diagnostic) -> String {
        let header = format!("{}[{}]", diag.severity, diag.code);
        if !self.color {
            return header;
        }
        let ansi = if diag.severity.is_error() { "31" } else { "33" };
        format!("\x1b[1;{ansi}m{header}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!("{}: {}\n", self.paint_header(diag), diag.message);

        if let Some(file) = &diag.file {
            out.push_str(&format!("  --> {}\n", file.display()));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    #[test]
    fn render_error_with_file() {
        let code = DiagnosticCode::new(Category::Error, 301);
        let diag = Diagnostic::error(code, "wrong file naming").with_file("lib/foo.sti");
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("error[E301]: wrong file naming"));
        assert!(output.contains("--> lib/foo.sti"));
    }

    #[test]
    fn render_warning_with_notes() {
        let code = DiagnosticCode::new(Category::Warning, 301);
        let diag = Diagnostic::warning(code, "no interface file found for Foo")
            .with_note("Foo uses recursive types")
            .with_help("add the directory containing foo.sti to the search path");
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("warning[W301]: no interface file found for Foo"));
        assert!(output.contains("= note: Foo uses recursive types"));
        assert!(output.contains("= help: add the directory"));
        assert!(!output.contains("-->"));
    }

    #[test]
    fn color_wraps_header() {
        let code = DiagnosticCode::new(Category::Error, 401);
        let diag = Diagnostic::error(code, "forward reference");
        let output = TerminalRenderer::new(true).render(&diag);
        assert!(output.starts_with("\x1b[1;31merror[E401]\x1b[0m"));
    }
}
