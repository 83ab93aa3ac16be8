//! Crawl frontier
//!
//! A FIFO double-ended queue of `(url, depth)` entries plus:
//! - The visited set, the single at-most-once gate for fetching
//! - A queued set so the same URL is never waiting twice
//! - The priority scent: URLs seen in dense link areas, eligible to be
//!   moved to the front of the queue
//!
//! The queue is bounded. Pushes past the ceiling are dropped and counted.

use std::collections::{HashSet, VecDeque};

/// A URL waiting to be fetched and the depth it was discovered at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: u32,
}

/// What happened to a pushed URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Added to the queue
    Queued,
    /// Already waiting; moved to the front
    Moved,
    /// Fetched (or being fetched) already
    AlreadyVisited,
    /// Already waiting; left where it was
    AlreadyQueued,
    /// Queue ceiling reached; dropped
    Overflow,
}

impl PushOutcome {
    pub fn is_queued(self) -> bool {
        matches!(self, Self::Queued | Self::Moved)
    }
}

/// The mutable crawl queue of one session
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    scent: Vec<String>,
    scent_set: HashSet<String>,
    capacity: usize,
    dropped: usize,
}

impl Frontier {
    /// Creates an empty frontier holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            scent: Vec::new(),
            scent_set: HashSet::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Appends `url` at the back of the queue
    pub fn push(&mut self, url: impl Into<String>, depth: u32) -> PushOutcome {
        let url = url.into();
        if let Some(outcome) = self.reject(&url) {
            return outcome;
        }

        self.queued.insert(url.clone());
        self.queue.push_back(FrontierEntry { url, depth });
        PushOutcome::Queued
    }

    /// Places `url` at the front of the queue
    ///
    /// A URL that is already waiting is moved to the front, keeping the depth
    /// it was first queued with.
    pub fn push_priority(&mut self, url: impl Into<String>, depth: u32) -> PushOutcome {
        let url = url.into();

        if self.queued.contains(&url) {
            if let Some(pos) = self.queue.iter().position(|e| e.url == url) {
                if let Some(entry) = self.queue.remove(pos) {
                    self.queue.push_front(entry);
                    return PushOutcome::Moved;
                }
            }
        }

        if let Some(outcome) = self.reject(&url) {
            return outcome;
        }

        self.queued.insert(url.clone());
        self.queue.push_front(FrontierEntry { url, depth });
        PushOutcome::Queued
    }

    fn reject(&mut self, url: &str) -> Option<PushOutcome> {
        if self.visited.contains(url) {
            return Some(PushOutcome::AlreadyVisited);
        }
        if self.queued.contains(url) {
            return Some(PushOutcome::AlreadyQueued);
        }
        if self.queue.len() >= self.capacity {
            self.dropped += 1;
            return Some(PushOutcome::Overflow);
        }
        None
    }

    /// Removes and returns the next entry
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        let entry = self.queue.pop_front()?;
        self.queued.remove(&entry.url);
        Some(entry)
    }

    /// Marks `url` visited; false if it already was
    pub fn mark_visited(&mut self, url: &str) -> bool {
        if self.visited.contains(url) {
            return false;
        }
        if self.queued.remove(url) {
            self.queue.retain(|e| e.url != url);
        }
        self.visited.insert(url.to_string());
        true
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Flags `url` as found in a dense link area
    pub fn add_scent(&mut self, url: impl Into<String>) {
        let url = url.into();
        if self.scent_set.insert(url.clone()) {
            self.scent.push(url);
        }
    }

    pub fn scent_len(&self) -> usize {
        self.scent.len()
    }

    /// Moves up to `limit` scented URLs to the front, then clears the scent
    ///
    /// Scented URLs already queued keep their depth; scented URLs not yet
    /// queued (and not visited) are queued at `depth`. Returns how many
    /// entries ended up at the front. The first promoted URL ends up first
    /// in the queue.
    pub fn promote_scent(&mut self, limit: usize, depth: u32) -> usize {
        let candidates: Vec<String> = self
            .scent
            .iter()
            .filter(|url| !self.visited.contains(*url))
            .take(limit)
            .cloned()
            .collect();

        let mut promoted = 0;
        for url in candidates.into_iter().rev() {
            if self.push_priority(url, depth).is_queued() {
                promoted += 1;
            }
        }

        self.clear_scent();
        promoted
    }

    pub fn clear_scent(&mut self) {
        self.scent.clear();
        self.scent_set.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pushes discarded because the queue was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// URLs still waiting, front first
    pub fn pending(&self) -> impl Iterator<Item = &FrontierEntry> {
        self.queue.iter()
    }
}
