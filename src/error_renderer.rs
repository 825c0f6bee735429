//! Error rendering using ariadne
//!
//! Compile diagnostics and runtime failures are rendered with source
//! snippets and labels pointing at the offending span.

use std::io::Write;
use std::ops::Range;

use ariadne::{ColorGenerator, Config, IndexType, Label, Report, ReportKind, Source};

use crate::{Diagnostic, Error, Severity};

const SOURCE_ID: &str = "<expr>";

/// Render an error with source annotations to stderr.
///
/// # Example
/// ```no_run
/// use kestrel::render_error;
///
/// let source = "1 + * 2";
/// if let Err(e) = kestrel::compile(source, &Default::default()) {
///     render_error(&e, source);
/// }
/// ```
pub fn render_error(error: &Error, source: &str) {
    render_error_to_writer(error, source, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer.
pub fn render_error_to(error: &Error, source: &str, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, source, writer, true)
}

/// Render an error to a String.
pub fn render_error_to_string(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).into_owned()
}

/// Render an error to a String without ANSI color codes.
pub fn render_error_to_string_no_color(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).into_owned()
}

fn render_error_to_writer(
    error: &Error,
    source: &str,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Compilation { diagnostics } => {
            render_diagnostics(source, diagnostics, writer, use_color)
        }
        Error::PropertyAccess(err) => match &err.span {
            Some(span) => render_spanned(source, span.0.clone(), &err.to_string(), writer, use_color),
            None => writeln!(writer, "{}", error),
        },
        Error::Runtime { message, span: Some(span) } => {
            render_spanned(source, span.0.clone(), message, writer, use_color)
        }
        Error::Runtime { span: None, .. } | Error::ResourceExceeded(_) => {
            writeln!(writer, "{}", error)
        }
    }
}

/// Clamps a span to the source so ariadne never indexes past the end.
fn clamp(source: &str, span: Range<usize>) -> Range<usize> {
    let len = source.len();
    let start = span.start.min(len);
    start..span.end.clamp(start, len)
}

/// Spans are byte offsets into the source.
fn config(use_color: bool) -> Config {
    Config::default()
        .with_color(use_color)
        .with_index_type(IndexType::Byte)
}

fn render_spanned(
    source: &str,
    span: Range<usize>,
    message: &str,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let span = clamp(source, span);
    let mut colors = ColorGenerator::new();
    colors.next();

    Report::build(ReportKind::Error, (SOURCE_ID, span.clone()))
        .with_message(message)
        .with_config(config(use_color))
        .with_label(
            Label::new((SOURCE_ID, span))
                .with_message(message)
                .with_color(colors.next()),
        )
        .finish()
        .write((SOURCE_ID, Source::from(source)), &mut *writer)
}

fn render_diagnostics(
    source: &str,
    diagnostics: &[Diagnostic],
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    for diag in diagnostics {
        let mut colors = ColorGenerator::new();
        colors.next(); // Skip the first color.

        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Info => ReportKind::Advice,
        };

        let span = clamp(source, diag.span.0.clone());
        let mut report = Report::build(kind, (SOURCE_ID, span.clone()))
            .with_message(&diag.message)
            .with_config(config(use_color));

        if let Some(code) = &diag.code {
            report = report.with_code(code);
        }

        report = report.with_label(
            Label::new((SOURCE_ID, span))
                .with_message(&diag.message)
                .with_color(colors.next()),
        );

        for related in &diag.related {
            report = report.with_label(
                Label::new((SOURCE_ID, clamp(source, related.span.0.clone())))
                    .with_message(&related.message)
                    .with_color(colors.next()),
            );
        }

        if let Some(help) = &diag.help {
            report = report.with_help(help);
        }

        report
            .finish()
            .write((SOURCE_ID, Source::from(source)), &mut *writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Engine, MapVariableResolverFactory, Value};

    #[test]
    fn test_render_parse_error() {
        let source = "1 + * 2";
        let err = crate::compile(source, &Default::default()).unwrap_err();
        let output = render_error_to_string_no_color(&err, source);

        assert!(output.contains("Error"), "{}", output);
        assert!(output.contains("1 + * 2"), "{}", output);
        assert!(output.lines().count() > 1);
    }

    #[test]
    fn test_render_includes_diagnostic_code() {
        let source = "x = (1 + 2";
        let err = crate::compile(source, &Default::default()).unwrap_err();
        let Error::Compilation { diagnostics } = &err else {
            panic!("expected compilation error, got {:?}", err);
        };
        let code = diagnostics[0].code.clone().expect("diagnostic code");
        let output = render_error_to_string_no_color(&err, source);
        assert!(output.contains(&code), "{}", output);
    }

    #[test]
    fn test_render_runtime_error_with_span() {
        let source = "10 / x";
        let engine = Engine::default();
        let expr = engine.compile(source).unwrap().unwrap();
        let vars = MapVariableResolverFactory::with_variables([("x", Value::Int(0))]);
        let err = expr.evaluate(&Value::Null, &vars).unwrap_err();
        let output = render_error_to_string_no_color(&err, source);
        assert!(output.contains("division by zero"), "{}", output);
        assert!(output.contains("10 / x"), "{}", output);
    }

    #[test]
    fn test_render_without_span_is_single_line() {
        let err = Error::ResourceExceeded("stack depth 65 exceeds 64".into());
        let output = render_error_to_string_no_color(&err, "");
        assert_eq!(output, "Resource limit exceeded: stack depth 65 exceeds 64\n");
    }
}
