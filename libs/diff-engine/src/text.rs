use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Added,
    Removed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    #[serde(rename = "type")]
    pub kind: LineKind,
    pub content: String,
    /// 1-based; absent on added lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_line: Option<usize>,
    /// 1-based; absent on removed lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextDiff {
    pub hunks: Vec<Hunk>,
    pub has_changes: bool,
}

/// Full-context line diff. Every line of both inputs appears exactly once
/// in the single hunk; two empty inputs produce no hunk.
pub fn text_diff(old: &str, new: &str) -> TextDiff {
    let a = split_lines(old);
    let b = split_lines(new);
    if a.is_empty() && b.is_empty() {
        return TextDiff {
            hunks: Vec::new(),
            has_changes: false,
        };
    }

    let mut lines = Vec::with_capacity(a.len().max(b.len()));
    for edit in shortest_edit(&a, &b) {
        lines.push(match edit {
            Edit::Keep(i, j) => DiffLine {
                kind: LineKind::Unchanged,
                content: a[i].to_string(),
                old_line: Some(i + 1),
                new_line: Some(j + 1),
            },
            Edit::Delete(i) => DiffLine {
                kind: LineKind::Removed,
                content: a[i].to_string(),
                old_line: Some(i + 1),
                new_line: None,
            },
            Edit::Insert(j) => DiffLine {
                kind: LineKind::Added,
                content: b[j].to_string(),
                old_line: None,
                new_line: Some(j + 1),
            },
        });
    }

    let has_changes = lines.iter().any(|l| l.kind != LineKind::Unchanged);
    TextDiff {
        hunks: vec![Hunk {
            old_start: usize::from(!a.is_empty()),
            old_lines: a.len(),
            new_start: usize::from(!b.is_empty()),
            new_lines: b.len(),
            lines,
        }],
        has_changes,
    }
}

/// Split on `\n`, ignoring one trailing newline. `""` has no lines.
fn split_lines(text: &str) -> Vec<&str> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    if text.is_empty() {
        return Vec::new();
    }
    body.split('\n').collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Keep(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Myers shortest edit script in linear space: the middle snake of each
/// region splits it in two and both halves are solved recursively. Only the
/// two diagonal frontiers are kept, so memory is O(N + M). Within a changed
/// run deletions come before insertions.
fn shortest_edit(a: &[&str], b: &[&str]) -> Vec<Edit> {
    let max_d = (a.len() + b.len() + 1) / 2 + 1;
    let mut myers = Myers {
        a,
        b,
        offset: max_d as isize,
        forward: vec![0; 2 * max_d + 2],
        backward: vec![0; 2 * max_d + 2],
        edits: Vec::with_capacity(a.len() + b.len()),
    };
    myers.conquer(0, a.len(), 0, b.len());
    deletions_first(myers.edits)
}

struct Myers<'a> {
    a: &'a [&'a str],
    b: &'a [&'a str],
    offset: isize,
    /// Furthest x reached on each diagonal `k = x - y`, from the start.
    forward: Vec<usize>,
    /// Same, measured back from the end of the region.
    backward: Vec<usize>,
    edits: Vec<Edit>,
}

impl Myers<'_> {
    fn at(&self, k: isize) -> usize {
        (k + self.offset) as usize
    }

    fn conquer(&mut self, mut a0: usize, mut a1: usize, mut b0: usize, mut b1: usize) {
        let prefix = self.common_prefix(a0, a1, b0, b1);
        self.edits.extend((0..prefix).map(|i| Edit::Keep(a0 + i, b0 + i)));
        a0 += prefix;
        b0 += prefix;

        let suffix = self.common_suffix(a0, a1, b0, b1);
        a1 -= suffix;
        b1 -= suffix;

        if a0 == a1 {
            self.edits.extend((b0..b1).map(Edit::Insert));
        } else if b0 == b1 {
            self.edits.extend((a0..a1).map(Edit::Delete));
        } else {
            let (x, y) = self.middle_snake(a0, a1, b0, b1);
            self.conquer(a0, x, b0, y);
            self.conquer(x, a1, y, b1);
        }

        self.edits.extend((0..suffix).map(|i| Edit::Keep(a1 + i, b1 + i)));
    }

    /// Splitting point of `a[a0..a1]` against `b[b0..b1]`, both non-empty and
    /// with no common prefix or suffix. Both halves are strictly smaller.
    fn middle_snake(&mut self, a0: usize, a1: usize, b0: usize, b1: usize) -> (usize, usize) {
        let n = (a1 - a0) as isize;
        let m = (b1 - b0) as isize;
        let delta = n - m;
        let odd = delta % 2 != 0;
        let max_d = (n + m + 1) / 2 + 1;

        let one = self.at(1);
        self.forward[one] = 0;
        self.backward[one] = 0;

        for d in 0..max_d {
            for k in (-d..=d).rev().step_by(2) {
                let (x0, y0, x) = {
                    let v = &self.forward;
                    let x = if k == -d || (k != d && v[self.at(k - 1)] < v[self.at(k + 1)]) {
                        v[self.at(k + 1)] as isize
                    } else {
                        v[self.at(k - 1)] as isize + 1
                    };
                    let y = x - k;
                    let mut end = x;
                    if x < n && y < m {
                        end += self.common_prefix(a0 + x as usize, a1, b0 + y as usize, b1) as isize;
                    }
                    (x, y, end)
                };
                let slot = self.at(k);
                self.forward[slot] = x as usize;

                if odd && (k - delta).abs() <= d - 1 {
                    let back = self.backward[self.at(delta - k)] as isize;
                    if x + back >= n {
                        return (a0 + x0 as usize, b0 + y0 as usize);
                    }
                }
            }

            for k in (-d..=d).rev().step_by(2) {
                let v = &self.backward;
                let mut x = if k == -d || (k != d && v[self.at(k - 1)] < v[self.at(k + 1)]) {
                    v[self.at(k + 1)] as isize
                } else {
                    v[self.at(k - 1)] as isize + 1
                };
                let mut y = x - k;
                if x < n && y < m {
                    let run = self.common_suffix(a0, a1 - x as usize, b0, b1 - y as usize) as isize;
                    x += run;
                    y += run;
                }
                let slot = self.at(k);
                self.backward[slot] = x as usize;

                if !odd && (k - delta).abs() <= d {
                    let front = self.forward[self.at(delta - k)] as isize;
                    if x + front >= n {
                        return (a1 - x as usize, b1 - y as usize);
                    }
                }
            }
        }

        // The frontiers meet before `max_d`; delete-then-insert if they ever do not.
        (a1, b0)
    }

    fn common_prefix(&self, a0: usize, a1: usize, b0: usize, b1: usize) -> usize {
        self.a[a0..a1]
            .iter()
            .zip(&self.b[b0..b1])
            .take_while(|(x, y)| x == y)
            .count()
    }

    fn common_suffix(&self, a0: usize, a1: usize, b0: usize, b1: usize) -> usize {
        self.a[a0..a1]
            .iter()
            .rev()
            .zip(self.b[b0..b1].iter().rev())
            .take_while(|(x, y)| x == y)
            .count()
    }
}

/// Reorder each run of changes so its deletions precede its insertions.
fn deletions_first(edits: Vec<Edit>) -> Vec<Edit> {
    let mut out = Vec::with_capacity(edits.len());
    let mut inserts = Vec::new();
    for edit in edits {
        match edit {
            Edit::Keep(..) => {
                out.append(&mut inserts);
                out.push(edit);
            }
            Edit::Delete(_) => out.push(edit),
            Edit::Insert(_) => inserts.push(edit),
        }
    }
    out.append(&mut inserts);
    out
}
