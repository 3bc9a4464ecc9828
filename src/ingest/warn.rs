use crate::error::ErrorCode;

#[derive(Debug, Clone, Copy)]
pub struct WarnEvent<'a> {
    pub code: ErrorCode,
    pub stage: &'a str,
    pub archive: &'a str,
    pub member: &'a str,
    pub reason: &'a str,
}

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if !ch.is_control() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn format_event(event: &WarnEvent<'_>) -> String {
    format!(
        "RIG_WARN code={} stage={} archive={} member={} reason={}",
        event.code.as_str(),
        sanitize_value(event.stage),
        sanitize_value(event.archive),
        sanitize_value(event.member),
        sanitize_value(event.reason),
    )
}

pub fn emit(event: WarnEvent<'_>) {
    eprintln!("{}", format_event(&event));
}
