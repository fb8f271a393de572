//! Operation-name transform.
//!
//! `GetUserInfo` becomes `get/user/info`: initialisms are folded to title case,
//! a `/` goes in at every case boundary, the result is lower-cased and the
//! reserved tokens are rewritten into path parameters.

use std::fmt;

/// Initialisms folded to title case before the boundary walk (`ID` -> `Id`)
///
/// At each position the first entry in this order that matches wins, so
/// `HTTPS` folds as `Http` + `S`.
pub const COMMON_INITIALISMS: [&str; 33] = [
    "API", "ASCII", "CPU", "CSS", "DNS", "EOF", "GUID", "HTML", "HTTP", "HTTPS", "ID", "IP",
    "JSON", "LHS", "QPS", "RAM", "RHS", "RPC", "SLA", "SMTP", "SSH", "TLS", "TTL", "UID", "UI",
    "UUID", "URI", "URL", "UTF8", "VM", "XML", "XSRF", "XSS",
];

/// Reserved tokens rewritten after lower-casing, matched in this order
const RESERVED_TOKENS: [(&str, &str); 3] =
    [("_", "/:"), ("params", ":param?"), ("param", ":param")];

/// Verb classes an operation name can start with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutoVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    All,
}

impl AutoVerb {
    /// Classification order
    pub const ORDER: [AutoVerb; 7] = [
        AutoVerb::Get,
        AutoVerb::Post,
        AutoVerb::Put,
        AutoVerb::Delete,
        AutoVerb::Patch,
        AutoVerb::Head,
        AutoVerb::All,
    ];

    /// Leading token in a transformed name
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            AutoVerb::Get => "get",
            AutoVerb::Post => "post",
            AutoVerb::Put => "put",
            AutoVerb::Delete => "delete",
            AutoVerb::Patch => "patch",
            AutoVerb::Head => "head",
            AutoVerb::All => "all",
        }
    }

    /// Registration verb for the route table
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AutoVerb::Get => "GET",
            AutoVerb::Post => "POST",
            AutoVerb::Put => "PUT",
            AutoVerb::Delete => "DELETE",
            AutoVerb::Patch => "PATCH",
            AutoVerb::Head => "HEAD",
            AutoVerb::All => "ALL",
        }
    }
}

impl fmt::Display for AutoVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Left-to-right, non-overlapping multi-pattern replace
///
/// At each position the first pair whose pattern matches is applied.
fn replace_each<'a, I>(input: &str, pairs: I) -> String
where
    I: Iterator<Item = (&'a str, String)> + Clone,
{
    let mut out = String::with_capacity(input.len() + 8);
    let mut rest = input;
    'scan: while !rest.is_empty() {
        for (pattern, replacement) in pairs.clone() {
            if let Some(tail) = rest.strip_prefix(pattern) {
                out.push_str(&replacement);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

fn title_case(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn fold_initialisms(name: &str) -> String {
    replace_each(
        name,
        COMMON_INITIALISMS.iter().map(|word| (*word, title_case(word))),
    )
}

/// Insert `/` at case boundaries
///
/// A run of capitals stays together while the next character continues the run
/// (another capital or a digit); a lone trailing capital is split off.
fn split_case_boundaries(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(n * 2);
    let Some(&last_char) = chars.last() else {
        return out;
    };

    let mut last_upper = false;
    let mut curr_upper = false;
    for i in 0..n - 1 {
        let v = chars[i];
        let next = chars[i + 1];
        let next_upper = next.is_ascii_uppercase();
        let next_digit = next.is_ascii_digit();

        if i == 0 {
            curr_upper = true;
            out.push(v);
        } else if curr_upper {
            if !(last_upper && (next_upper || next_digit)) && chars[i - 1] != '/' && next != '/' {
                out.push('/');
            }
            out.push(v);
        } else {
            out.push(v);
            if i == n - 2 && next_upper && !next_digit {
                out.push('/');
            }
        }
        last_upper = curr_upper;
        curr_upper = next_upper;
    }
    out.push(last_char);
    out
}

/// Transform an operation name into its slash-delimited route form
///
/// # Example
///
/// ```
/// use chainrouter::reflect::to_namer;
///
/// assert_eq!(to_namer("GetUserInfo"), "get/user/info");
/// assert_eq!(to_namer("GetUser_id"), "get/user/:id");
/// assert_eq!(to_namer("PutParams"), "put/:param?");
/// ```
#[must_use]
pub fn to_namer(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let folded = fold_initialisms(name);
    let lowered = split_case_boundaries(&folded).to_lowercase();
    replace_each(
        &lowered,
        RESERVED_TOKENS.iter().map(|(p, r)| (*p, (*r).to_string())),
    )
}

/// Verb class of a transformed name, `None` when it starts with no verb token
#[must_use]
pub fn classify(transformed: &str) -> Option<AutoVerb> {
    AutoVerb::ORDER
        .into_iter()
        .find(|verb| transformed.starts_with(verb.token()))
}

/// Route path for a transformed name: prefix joined with the name minus its verb
#[must_use]
pub fn fix_uri(prefix: &str, transformed: &str, verb: AutoVerb) -> String {
    let rest = transformed.strip_prefix(verb.token()).unwrap_or(transformed);
    join_path(prefix, rest)
}

/// Join two path fragments into a clean absolute path
///
/// Duplicate slashes collapse, `.` segments drop, `..` pops a segment and the
/// result always starts with `/` and never ends with one (except the root).
#[must_use]
pub fn join_path(prefix: &str, rest: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in prefix.split('/').chain(rest.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let mut path = String::with_capacity(prefix.len() + rest.len() + 1);
    for segment in &segments {
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}
