use crate::diagnostics::DiagnosticReport;

/// Join per-tool reports under one header for the edited file.
///
/// Returns `None` for an empty slice so a clean file produces no message at
/// all. Report bodies are kept verbatim, multi-line structure included.
pub fn aggregate(file_name: &str, reports: &[DiagnosticReport]) -> Option<String> {
    if reports.is_empty() {
        return None;
    }

    let mut message = format!("Code quality for {file_name}:");
    for report in reports {
        message.push_str("\n- ");
        message.push_str(&report.rendered_summary);
    }
    Some(message)
}
