use std::cmp::Ordering;
use std::fmt;

/// One element of a split version string. Numeric runs compare by magnitude,
/// string runs lexicographically, and numbers outrank strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Num(u64),
    Str(String),
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Component::Num(a), Component::Num(b)) => a.cmp(b),
            (Component::Str(a), Component::Str(b)) => a.cmp(b),
            (Component::Num(_), Component::Str(_)) => Ordering::Greater,
            (Component::Str(_), Component::Num(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Split a version string into components. Dots and dashes are equivalent
/// separators; within a segment, each digit run becomes a numeric component
/// and every other run a string component.
pub fn components(version: &str) -> Vec<Component> {
    if version.is_empty() {
        return vec![Component::Str(String::new())];
    }
    let mut out = Vec::new();
    for segment in version.split(['.', '-']) {
        if segment.is_empty() {
            out.push(Component::Str(String::new()));
            continue;
        }
        let bytes = segment.as_bytes();
        let mut start = 0;
        while start < bytes.len() {
            let digits = bytes[start].is_ascii_digit();
            let mut end = start + 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() == digits {
                end += 1;
            }
            let run = &segment[start..end];
            match run.parse::<u64>() {
                Ok(n) if digits => out.push(Component::Num(n)),
                _ => out.push(Component::Str(run.to_string())),
            }
            start = end;
        }
    }
    out
}

// JDK 1.8 and 8 are the same release, so a leading 1 is dropped; GraalVM
// versioning genuinely starts at 1 and is exempt.
fn normalized(version: &str, vendor: &str) -> Vec<Component> {
    let mut comps = components(version);
    if !vendor.to_lowercase().contains("graalvm")
        && comps.len() > 1
        && comps[0] == Component::Num(1)
    {
        comps.remove(0);
    }
    comps
}

pub fn compare(a: &str, b: &str, vendor: &str) -> Ordering {
    normalized(a, vendor).cmp(&normalized(b, vendor))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionExpr {
    Any,
    Exact(String),
    AtLeast(String),
}

impl VersionExpr {
    /// Parse a user-facing version expression. A trailing `+` requests "this
    /// version or newer"; the empty expression matches everything.
    pub fn parse(expr: &str) -> VersionExpr {
        let expr = expr.trim();
        if expr.is_empty() {
            return VersionExpr::Any;
        }
        match expr.strip_suffix('+') {
            Some("") | Some("0") => VersionExpr::Any,
            Some(base) => VersionExpr::AtLeast(base.to_string()),
            None => VersionExpr::Exact(expr.to_string()),
        }
    }

    pub fn matches(&self, candidate: &str, vendor: &str) -> bool {
        match self {
            VersionExpr::Any => true,
            VersionExpr::Exact(want) => {
                let want = normalized(want, vendor);
                let cand = normalized(candidate, vendor);
                cand.len() >= want.len() && cand[..want.len()] == want[..]
            }
            VersionExpr::AtLeast(bound) => compare(candidate, bound, vendor) != Ordering::Less,
        }
    }
}

impl fmt::Display for VersionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionExpr::Any => Ok(()),
            VersionExpr::Exact(v) => write!(f, "{v}"),
            VersionExpr::AtLeast(v) => write!(f, "{v}+"),
        }
    }
}
