//! Value-type stacks used by the bracket- and environment-tracking segmenters.

/// Stack of open nested regions (bracket chars, environment names, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestingStack<T> {
    open: Vec<T>,
}

impl<T: PartialEq> NestingStack<T> {
    pub fn new() -> Self {
        Self { open: Vec::new() }
    }

    pub fn push(&mut self, region: T) {
        self.open.push(region);
    }

    /// Close the innermost region equal to `region`, discarding anything
    /// opened after it. Returns false when no such region is open.
    pub fn close(&mut self, region: &T) -> bool {
        match self.open.iter().rposition(|r| r == region) {
            Some(pos) => {
                self.open.truncate(pos);
                true
            }
            None => false,
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        self.open.pop()
    }

    pub fn top(&self) -> Option<&T> {
        self.open.last()
    }

    pub fn contains(&self, region: &T) -> bool {
        self.open.contains(region)
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.open.iter()
    }
}

/// Running ancestor-heading path.
///
/// On each boundary, entries at or below the new level are discarded before
/// the new heading is appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionPath {
    entries: Vec<(usize, String)>,
}

impl SectionPath {
    pub const SEPARATOR: &'static str = " > ";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, level: usize, heading: impl Into<String>) {
        self.entries.retain(|(l, _)| *l < level);
        self.entries.push((level, heading.into()));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn joined(&self) -> String {
        self.entries
            .iter()
            .map(|(_, h)| h.as_str())
            .collect::<Vec<_>>()
            .join(Self::SEPARATOR)
    }
}
