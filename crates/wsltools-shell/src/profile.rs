use regex::{NoExpand, Regex};

fn export_line(variable: &str) -> Regex {
    Regex::new(&format!(
        r"(?m)^\s*export\s+{}\s*=.*$",
        regex::escape(variable)
    ))
    .expect("export line pattern")
}

/// Insert or replace an `export VARIABLE=value` line in profile content.
///
/// When no matching line exists the export is appended on its own newline
/// terminated line, after making sure the existing content ends with a
/// newline. When one exists, only the first matching line is rewritten and
/// every other byte is untouched. Applying the same edit twice yields
/// content identical to applying it once.
pub fn set_export(profile: &str, variable: &str, value: &str) -> String {
    let line = format!("export {variable}={value}");
    let pattern = export_line(variable);
    if pattern.is_match(profile) {
        pattern.replace(profile, NoExpand(&line)).into_owned()
    } else {
        let mut updated = profile.to_string();
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(&line);
        updated.push('\n');
        updated
    }
}

/// Delete the first `export VARIABLE=...` line, newline included. Content
/// without such a line passes through unchanged.
pub fn remove_export(profile: &str, variable: &str) -> String {
    let pattern = Regex::new(&format!(
        r"(?m)^\s*export\s+{}\s*=.*\n?",
        regex::escape(variable)
    ))
    .expect("export line pattern");
    pattern.replace(profile, "").into_owned()
}

/// Value of the first `export VARIABLE=...` line, surrounding quotes
/// stripped.
pub fn get_export(profile: &str, variable: &str) -> Option<String> {
    let matched = export_line(variable).find(profile)?;
    let (_, value) = matched.as_str().split_once('=')?;
    Some(
        value
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string(),
    )
}

/// Append `stanza` on its own line unless `marker` already occurs somewhere
/// in the content.
pub fn append_stanza(profile: &str, marker: &str, stanza: &str) -> String {
    if profile.contains(marker) {
        profile.to_string()
    } else {
        format!("{profile}\n{stanza}\n")
    }
}
