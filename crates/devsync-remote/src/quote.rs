//! POSIX shell quoting for arguments interpolated into remote commands

/// Quote `arg` for a POSIX shell.
///
/// Plain words pass through untouched. A leading `~/` stays unquoted so the
/// remote shell still expands it to the home directory.
pub fn quote(arg: &str) -> String {
    if arg == "~" {
        return arg.to_string();
    }
    if let Some(rest) = arg.strip_prefix("~/") {
        if rest.is_empty() {
            return arg.to_string();
        }
        return format!("~/{}", quote(rest));
    }
    if !arg.is_empty() && arg.bytes().all(is_plain) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Quote each argument and join with spaces.
pub fn quote_all<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|arg| quote(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_plain(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'/' | b':' | b'=' | b'@' | b'%' | b'+' | b',')
}
