// Name allocation.
//
// The backend's namespace is constrained (letters, digits, hyphen,
// underscore; leading letter) and names must be unique per region. The
// candidate sequence is an explicit iterator so it can be tested without
// a network; the caller lists existing firewalls once and scans in
// memory. The list-then-allocate window is racy by nature -- a concurrent
// create can win the same candidate, and the backend's duplicate-name
// rejection is the only safety net.

use crate::error::Error;

/// Candidate cycles after the bare base name. Running past this is taken
/// as evidence of a broken listing, not of 26^10 genuine collisions.
const MAX_BASE_EXTENSIONS: u32 = 10;

/// Reduce a display name to the backend-legal character set.
///
/// A leading digit gains an `e-` prefix, anything outside
/// letter/digit/`-`/`_` is dropped, and the result may be empty (the
/// allocator substitutes `new-group` in that case).
pub fn sanitize(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if i == 0 && c.is_numeric() {
            out.push_str("e-");
            out.push(c);
        } else if i == 0 && c.is_alphabetic() {
            out.push(c);
        } else if c.is_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        }
    }
    out
}

/// The exact candidate-name sequence for one sanitized base.
///
/// Yields the base itself, then `base-a` … `base-z`; each time `z` is
/// exhausted the base extends by an `a` segment (hyphenated the first
/// time, bare afterwards) and the letters restart: `base-aa` … `base-az`,
/// `base-aaa` …, for at most [`MAX_BASE_EXTENSIONS`] cycles.
#[derive(Debug)]
pub struct Candidates {
    base: String,
    cycle: u32,
    letter: u8,
}

impl Candidates {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            cycle: 0,
            letter: 0,
        }
    }
}

impl Iterator for Candidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.cycle == 0 {
            self.cycle = 1;
            return Some(self.base.clone());
        }
        if self.cycle > MAX_BASE_EXTENSIONS {
            return None;
        }

        let c = char::from(b'a' + self.letter);
        let candidate = if self.cycle == 1 {
            format!("{}-{}", self.base, c)
        } else {
            format!("{}{}", self.base, c)
        };

        self.letter += 1;
        if self.letter == 26 {
            if self.cycle == 1 {
                self.base.push_str("-a");
            } else {
                self.base.push('a');
            }
            self.letter = 0;
            self.cycle += 1;
        }

        Some(candidate)
    }
}

/// Allocate a backend-legal name for `requested` that `is_taken` does not
/// already claim.
///
/// `is_taken` is expected to close over a snapshot of the existing
/// firewall list; this function never touches the network itself.
pub fn unique_name(requested: &str, is_taken: impl Fn(&str) -> bool) -> Result<String, Error> {
    let base = sanitize(requested);
    if base.is_empty() {
        return Ok("new-group".to_string());
    }

    for candidate in Candidates::new(base.clone()) {
        if !is_taken(&candidate) {
            return Ok(candidate);
        }
    }
    Err(Error::NameExhausted { base })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::{Candidates, sanitize, unique_name};
    use crate::error::Error;

    #[test]
    fn leading_digit_gains_prefix() {
        assert_eq!(sanitize("123abc"), "e-123abc");
        assert_eq!(sanitize("123-test"), "e-123-test");
    }

    #[test]
    fn illegal_characters_are_dropped() {
        assert_eq!(sanitize("my group!"), "mygroup");
        assert_eq!(sanitize("a.b.c"), "abc");
        assert_eq!(sanitize("under_score-ok"), "under_score-ok");
    }

    #[test]
    fn unsanitizable_names_fall_back() {
        assert_eq!(sanitize("!!!"), "");
        assert_eq!(unique_name("!!!", |_| false).unwrap(), "new-group");
    }

    #[test]
    fn candidate_sequence_is_exact() {
        let names: Vec<String> = Candidates::new("web").take(30).collect();
        assert_eq!(names[0], "web");
        assert_eq!(names[1], "web-a");
        assert_eq!(names[2], "web-b");
        assert_eq!(names[26], "web-z");
        // First extension: the base becomes `web-a` and letters append
        // bare from then on.
        assert_eq!(names[27], "web-aa");
        assert_eq!(names[28], "web-ab");
    }

    #[test]
    fn later_extensions_append_bare_segments() {
        let names: Vec<String> = Candidates::new("web").collect();
        // 1 bare candidate + 26 per cycle, 10 cycles.
        assert_eq!(names.len(), 1 + 26 * 10);
        assert_eq!(names[27 + 25], "web-az");
        assert_eq!(names[27 + 26], "web-aaa");
        assert_eq!(names.last().unwrap(), "web-aaaaaaaaaz");
    }

    #[test]
    fn first_free_candidate_wins() {
        let taken: HashSet<&str> = ["e-123abc", "e-123abc-a", "e-123abc-b"].into();
        let name = unique_name("123abc", |c| taken.contains(c)).unwrap();
        assert_eq!(name, "e-123abc-c");
    }

    #[test]
    fn no_collision_returns_the_base() {
        assert_eq!(unique_name("web", |_| false).unwrap(), "web");
    }

    #[test]
    fn full_collision_exhausts_allocation() {
        let err = unique_name("web", |_| true).unwrap_err();
        assert!(matches!(err, Error::NameExhausted { base } if base == "web"));
    }
}
