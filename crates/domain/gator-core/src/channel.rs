/// Platform subdirectories a channel URL may end with.
pub const PKG_SUBDIRS: &[&str] = &[
    "linux-64",
    "linux-32",
    "linux-ppc64le",
    "linux-armv6l",
    "linux-armv7l",
    "linux-aarch64",
    "win-64",
    "win-32",
    "osx-64",
    "zos-z",
    "noarch",
];

const SCHEMES: &[&str] = &["http:", "https:", "file:"];

/// Shorten a channel URL to `<first>[/...]/<last>` for display.
///
/// The scheme and the empty segments of `//` are dropped, trailing platform
/// subdirectories are skipped to find the last real path component, and
/// `/...` marks that the last component is not the first one. The last
/// component is always appended, so a host-only URL reads `<host>/<host>`.
/// Channel strings with fewer than three `/`-separated segments are kept
/// verbatim.
pub fn simplify_channel(channel: &str) -> String {
    let segments: Vec<&str> = channel.split('/').collect();
    if segments.len() <= 2 {
        return channel.to_string();
    }

    let mut first = usize::from(SCHEMES.contains(&segments[0]));
    while first < segments.len() && segments[first].is_empty() {
        first += 1;
    }
    let Some(head) = segments.get(first) else {
        return channel.to_string();
    };

    let mut last = segments.len() - 1;
    while last > first && PKG_SUBDIRS.contains(&segments[last]) {
        last -= 1;
    }

    let elided = if last > first { "/..." } else { "" };
    format!("{head}{elided}/{}", segments[last])
}
