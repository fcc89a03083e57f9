//! Mapping repair guard
//!
//! Best-effort recovery of structurally broken mapping JSON before
//! synthesis: strip trailing separators, force-close open containers, and
//! drop dangling partial elements from the tail. Repairs are reported so
//! the synthesizer can prepend a warning block; input broken beyond these
//! tactics stays a hard error.

/// Result of a successful repair
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    /// The repaired JSON text
    pub repaired: String,

    /// One human-readable note per repair applied
    pub notes: Vec<String>,
}

#[derive(Debug)]
struct OpenContainer {
    closer: char,

    /// Byte index just past the opening bracket
    after_open: usize,

    /// Byte index of the last comma between this container's direct
    /// children
    last_child_comma: Option<usize>,
}

#[derive(Debug)]
struct ScanState {
    /// Containers still open at end of input, outermost first
    open: Vec<OpenContainer>,

    /// Input ended inside a string literal
    in_string: bool,

    /// Byte index of the last comma outside strings, any depth
    last_comma: Option<usize>,
}

impl ScanState {
    /// Candidate truncation points, latest first: element boundaries of
    /// every open container plus the global last comma, so a dangling
    /// partial element can be cut away whole (or its container emptied)
    fn cut_points(&self) -> Vec<usize> {
        let mut points: Vec<usize> = Vec::new();
        for container in &self.open {
            points.push(container.after_open);
            if let Some(idx) = container.last_child_comma {
                points.push(idx);
            }
        }
        if let Some(idx) = self.last_comma {
            points.push(idx);
        }
        points.sort_unstable_by(|a, b| b.cmp(a));
        points.dedup();
        points
    }
}

/// String-aware structural scan, single pass
fn scan(s: &str) -> ScanState {
    let mut open: Vec<OpenContainer> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut last_comma = None;

    for (i, ch) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => open.push(OpenContainer {
                closer: if ch == '{' { '}' } else { ']' },
                after_open: i + 1,
                last_child_comma: None,
            }),
            '}' | ']' => {
                open.pop();
            }
            ',' => {
                last_comma = Some(i);
                if let Some(container) = open.last_mut() {
                    container.last_child_comma = Some(i);
                }
            }
            _ => {}
        }
    }

    ScanState {
        open,
        in_string,
        last_comma,
    }
}

/// Whether the text from a cut point on holds no element content
fn only_closers(tail: &str) -> bool {
    tail.chars()
        .all(|c| c.is_whitespace() || c == '}' || c == ']' || c == ',')
}

/// Close whatever `candidate` leaves open, appending a note when anything
/// was closed
fn close_open(candidate: &mut String, notes: &mut Vec<String>) {
    let state = scan(candidate);
    if !state.open.is_empty() {
        notes.push(format!(
            "force-closed {} open container(s)",
            state.open.len()
        ));
        for container in state.open.iter().rev() {
            candidate.push(container.closer);
        }
    }
}

/// Repair until `is_valid` accepts the candidate
///
/// Each round tries closing the input as-is, then truncating at each
/// element boundary from the tail inward, validating every candidate.
/// Returns None when the input is already valid or cannot be repaired
/// within a bounded number of rounds.
pub fn repair_with<F>(input: &str, is_valid: F) -> Option<RepairOutcome>
where
    F: Fn(&str) -> bool,
{
    if is_valid(input) {
        return None;
    }

    let mut text = input.trim_end().to_string();
    let mut notes: Vec<String> = Vec::new();

    for _ in 0..8 {
        let state = scan(&text);

        if state.in_string {
            // Truncated mid-string: cut back to the last element boundary.
            let cut = state.cut_points().into_iter().next()?;
            text.truncate(cut);
            notes.push("dropped dangling partial element".to_string());
            continue;
        }

        // Candidate cuts: no cut first, then boundaries from the tail in.
        let mut cuts: Vec<Option<usize>> = vec![None];
        cuts.extend(state.cut_points().into_iter().map(Some));

        for cut in cuts {
            let mut round_notes = notes.clone();
            let mut candidate = match cut {
                None => text.clone(),
                Some(idx) => {
                    if only_closers(&text[idx..]) {
                        round_notes.push("stripped trailing separator".to_string());
                    } else {
                        round_notes.push("dropped dangling partial element".to_string());
                    }
                    text[..idx].to_string()
                }
            };

            let trimmed = candidate.trim_end().len();
            candidate.truncate(trimmed);
            if candidate.ends_with(',') {
                candidate.pop();
                round_notes.push("stripped trailing separator".to_string());
            }
            close_open(&mut candidate, &mut round_notes);

            if is_valid(&candidate) {
                if round_notes.is_empty() {
                    return None;
                }
                return Some(RepairOutcome {
                    repaired: candidate,
                    notes: round_notes,
                });
            }
        }

        // No candidate validated: commit the latest cut and retry with
        // whatever boundaries the shorter text exposes.
        let cut = state.cut_points().into_iter().next()?;
        text.truncate(cut);
        notes.push("dropped dangling partial element".to_string());
    }

    None
}

/// Repair against plain JSON validity
pub fn repair_json(input: &str) -> Option<RepairOutcome> {
    repair_with(input, |s| {
        serde_json::from_str::<serde_json::Value>(s).is_ok()
    })
}
