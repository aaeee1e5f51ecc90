//! Bidirectional preload scheduling
//!
//! Pages are decoded one at a time in a queue built once per session: a run of
//! `forward_buffer` pages ahead of the starting page, then one page behind it,
//! repeating until the forward side is exhausted, then the rest of the pages
//! behind. The scheduler itself performs no I/O; like the render state it
//! returns effects for the controller to carry out.

use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::error::{Result, ViewerError};
use crate::pages::{PageLookup, PageSize, PageSource, PageStore};
use crate::platform::{DecodeOutcome, RequestId};

/// Forward loads issued per backward load
pub const DEFAULT_FORWARD_BUFFER: i32 = 3;

/// Build the load queue for a session starting at `start`.
///
/// Every index in `[0, page_count)` appears exactly once. A non-positive
/// `forward_buffer` is treated as 1.
#[must_use]
pub fn build_load_queue(start: usize, page_count: usize, forward_buffer: i32) -> Vec<usize> {
    if page_count == 0 {
        return Vec::new();
    }
    let forward_buffer = forward_buffer.max(1) as usize;
    let start = start.min(page_count - 1);

    let mut queue = Vec::with_capacity(page_count);
    let mut forward = start;
    // one past the next backward index, so 0 means exhausted
    let mut backward = start;
    let mut count = 1;

    while forward < page_count {
        if count > forward_buffer && backward > 0 {
            backward -= 1;
            queue.push(backward);
            count = 0;
        } else {
            queue.push(forward);
            forward += 1;
        }
        count += 1;
    }

    while backward > 0 {
        backward -= 1;
        queue.push(backward);
    }

    queue
}

/// Loaded/total counters for progress display
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub loaded: usize,
    pub total: usize,
}

impl Progress {
    /// Completion ratio in `[0, 1]`; an empty book counts as complete
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.loaded as f64 / self.total as f64
        }
    }

    pub fn percent(&self) -> u16 {
        (self.ratio() * 100.0).floor() as u16
    }
}

/// Effects produced by scheduler state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreloadEffect {
    /// Show the loading overlay
    ShowLoading,
    /// Hide the loading overlay
    HideLoading,
    /// Start decoding a page
    Decode {
        id: RequestId,
        index: usize,
        source: PageSource,
    },
    /// Loaded count changed
    Progress(Progress),
    /// Make this page the pointer and draw it
    Reveal(usize),
    /// Queue exhausted
    Complete,
}

/// Result of asking for a page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    Ready(PageSize),
    Pending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Session {
    Idle,
    Running,
    Complete,
}

#[derive(Debug)]
pub struct PreloadScheduler {
    pages: PageStore,
    forward_buffer: i32,
    queue: VecDeque<usize>,
    in_flight: Option<(RequestId, usize)>,
    next_request_id: u64,
    session: Session,
    rendered: bool,
    requested_page: Option<usize>,
    detached: bool,
}

impl PreloadScheduler {
    #[must_use]
    pub fn new(pages: PageStore, forward_buffer: i32) -> Self {
        Self {
            pages,
            forward_buffer,
            queue: VecDeque::new(),
            in_flight: None,
            next_request_id: 1,
            session: Session::Idle,
            rendered: false,
            requested_page: None,
            detached: false,
        }
    }

    pub fn pages(&self) -> &PageStore {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_started(&self) -> bool {
        self.session != Session::Idle
    }

    pub fn is_complete(&self) -> bool {
        self.session == Session::Complete
    }

    pub fn requested_page(&self) -> Option<usize> {
        self.requested_page
    }

    pub fn in_flight(&self) -> Option<(RequestId, usize)> {
        self.in_flight
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            loaded: self.pages.loaded_count(),
            total: self.pages.len(),
        }
    }

    /// Start the preload session at `pointer` unless one already ran
    #[must_use]
    pub fn ensure(&mut self, pointer: usize) -> Vec<PreloadEffect> {
        if self.session != Session::Idle || self.pages.is_empty() || self.detached {
            return vec![];
        }

        self.queue = build_load_queue(pointer, self.pages.len(), self.forward_buffer).into();
        self.session = Session::Running;
        info!(
            "Starting preload of {} pages from page {}",
            self.queue.len(),
            pointer
        );

        let mut effects = vec![PreloadEffect::ShowLoading];
        effects.extend(self.dispatch_next());
        effects
    }

    /// Ask for a page. Pending pages become the outstanding request that the
    /// session reveals as soon as it is decoded.
    pub fn request(&mut self, index: usize) -> Result<Availability> {
        match self.pages.lookup(index) {
            PageLookup::Ready(size) => Ok(Availability::Ready(size)),
            PageLookup::Pending => {
                debug!("Page {index} requested before decode");
                self.requested_page = Some(index);
                Ok(Availability::Pending)
            }
            PageLookup::Failed(reason) => Err(ViewerError::DecodeFailed {
                index,
                reason: reason.to_string(),
            }),
            PageLookup::NotFound => Err(ViewerError::invalid_page(index, self.pages.len())),
        }
    }

    /// Handle a decode completion reported by the platform
    #[must_use]
    pub fn complete(
        &mut self,
        id: RequestId,
        outcome: DecodeOutcome,
        pointer: usize,
    ) -> Vec<PreloadEffect> {
        if self.detached {
            debug!("Ignoring completion {id:?} after detach");
            return vec![];
        }
        let index = match self.in_flight {
            Some((expected, index)) if expected == id => index,
            _ => {
                debug!("Ignoring stale completion {id:?}");
                return vec![];
            }
        };
        self.in_flight = None;

        if let DecodeOutcome::Failed { reason } = &outcome {
            warn!("Page {index} failed to decode: {reason}");
        }
        self.pages.record(index, &outcome);

        let mut effects = vec![PreloadEffect::Progress(self.progress())];

        let requested_loaded = self
            .requested_page
            .is_some_and(|page| self.pages.is_loaded(page));
        if (!self.rendered && self.pages.is_loaded(pointer)) || requested_loaded {
            let page = self.requested_page.take().unwrap_or(pointer);
            effects.push(PreloadEffect::Reveal(page));
            effects.push(PreloadEffect::HideLoading);
            self.rendered = true;
        }

        effects.extend(self.dispatch_next());
        effects
    }

    /// Stop observing completions; in-flight decodes are ignored when they land
    pub fn detach(&mut self) {
        self.detached = true;
        self.queue.clear();
        self.in_flight = None;
        self.requested_page = None;
    }

    fn dispatch_next(&mut self) -> Option<PreloadEffect> {
        let Some(index) = self.queue.pop_front() else {
            self.session = Session::Complete;
            info!("Preload finished: {} pages", self.pages.loaded_count());
            return Some(PreloadEffect::Complete);
        };

        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        self.in_flight = Some((id, index));
        self.pages.mark_loading(index);

        let source = self.pages.source(index)?.clone();
        debug!("Decoding page {index} ({source}) as {id:?}");
        Some(PreloadEffect::Decode { id, index, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(n: usize, forward_buffer: i32) -> PreloadScheduler {
        let sources = (0..n).map(|i| PageSource(format!("p{i}.jpg"))).collect();
        PreloadScheduler::new(PageStore::new(sources), forward_buffer)
    }

    fn decode_of(effects: &[PreloadEffect]) -> Option<(RequestId, usize)> {
        effects.iter().find_map(|e| match e {
            PreloadEffect::Decode { id, index, .. } => Some((*id, *index)),
            _ => None,
        })
    }

    #[test]
    fn queue_interleaves_forward_and_backward() {
        assert_eq!(build_load_queue(2, 5, 3), vec![2, 3, 4, 1, 0]);
        assert_eq!(build_load_queue(0, 4, 3), vec![0, 1, 2, 3]);
        assert_eq!(build_load_queue(2, 5, 1), vec![2, 1, 3, 0, 4]);
        assert_eq!(
            build_load_queue(5, 12, 3),
            vec![5, 6, 7, 4, 8, 9, 10, 3, 11, 2, 1, 0]
        );
    }

    #[test]
    fn queue_contains_every_index_once() {
        for page_count in 1..30 {
            for forward_buffer in 1..6 {
                for start in 0..page_count {
                    let mut queue = build_load_queue(start, page_count, forward_buffer);
                    assert_eq!(queue[0], start);
                    queue.sort_unstable();
                    assert_eq!(queue, (0..page_count).collect::<Vec<_>>());
                }
            }
        }
    }

    #[test]
    fn non_positive_forward_buffer_is_clamped() {
        assert_eq!(build_load_queue(2, 5, 0), build_load_queue(2, 5, 1));
        assert_eq!(build_load_queue(2, 5, -4), build_load_queue(2, 5, 1));
    }

    #[test]
    fn start_beyond_end_is_clamped() {
        assert_eq!(build_load_queue(10, 3, 3), vec![2, 1, 0]);
        assert!(build_load_queue(0, 0, 3).is_empty());
    }

    #[test]
    fn empty_book_never_shows_loading() {
        let mut sched = scheduler(0, 3);
        assert!(sched.ensure(0).is_empty());
        assert!(!sched.is_started());
    }

    #[test]
    fn ensure_starts_once() {
        let mut sched = scheduler(3, 3);
        let effects = sched.ensure(0);
        assert_eq!(effects[0], PreloadEffect::ShowLoading);
        assert_eq!(decode_of(&effects), Some((RequestId(1), 0)));
        assert!(sched.ensure(0).is_empty());
    }

    #[test]
    fn decodes_are_serial_and_reveal_pointer_once() {
        let mut sched = scheduler(3, 3);
        let (id, index) = decode_of(&sched.ensure(0)).unwrap();
        assert_eq!(sched.in_flight(), Some((id, index)));

        let effects = sched.complete(id, DecodeOutcome::decoded(10, 20), 0);
        assert_eq!(
            effects[0],
            PreloadEffect::Progress(Progress { loaded: 1, total: 3 })
        );
        assert_eq!(effects[1], PreloadEffect::Reveal(0));
        assert_eq!(effects[2], PreloadEffect::HideLoading);
        let (id, index) = decode_of(&effects).unwrap();
        assert_eq!(index, 1);

        let effects = sched.complete(id, DecodeOutcome::decoded(10, 20), 0);
        assert!(!effects.iter().any(|e| matches!(e, PreloadEffect::Reveal(_))));
        let (id, _) = decode_of(&effects).unwrap();

        let effects = sched.complete(id, DecodeOutcome::decoded(10, 20), 0);
        assert_eq!(effects.last(), Some(&PreloadEffect::Complete));
        assert!(sched.is_complete());
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut sched = scheduler(2, 3);
        let _ = sched.ensure(0);
        assert!(
            sched
                .complete(RequestId(99), DecodeOutcome::decoded(1, 1), 0)
                .is_empty()
        );
        assert_eq!(sched.progress().loaded, 0);
    }

    #[test]
    fn failure_is_recorded_and_skipped() {
        let mut sched = scheduler(2, 3);
        let (id, _) = decode_of(&sched.ensure(1)).unwrap();
        let effects = sched.complete(id, DecodeOutcome::failed("404"), 1);

        assert!(effects.contains(&PreloadEffect::Reveal(1)));
        assert_eq!(decode_of(&effects).map(|(_, i)| i), Some(0));
        assert!(matches!(
            sched.request(1),
            Err(ViewerError::DecodeFailed { index: 1, .. })
        ));
    }

    #[test]
    fn requested_page_is_revealed_when_loaded() {
        let mut sched = scheduler(4, 3);
        let (id, _) = decode_of(&sched.ensure(0)).unwrap();
        let effects = sched.complete(id, DecodeOutcome::decoded(5, 5), 0);
        assert!(effects.contains(&PreloadEffect::Reveal(0)));
        let (id, _) = decode_of(&effects).unwrap();

        assert_eq!(sched.request(2), Ok(Availability::Pending));
        assert_eq!(sched.requested_page(), Some(2));

        // page 1 lands, still waiting for 2
        let effects = sched.complete(id, DecodeOutcome::decoded(5, 5), 0);
        assert!(!effects.iter().any(|e| matches!(e, PreloadEffect::Reveal(_))));
        let (id, _) = decode_of(&effects).unwrap();

        let effects = sched.complete(id, DecodeOutcome::decoded(5, 5), 0);
        assert!(effects.contains(&PreloadEffect::Reveal(2)));
        assert_eq!(sched.requested_page(), None);
    }

    #[test]
    fn request_out_of_range_fails_fast() {
        let mut sched = scheduler(2, 3);
        assert_eq!(sched.request(2), Err(ViewerError::invalid_page(2, 2)));
    }

    #[test]
    fn detached_scheduler_ignores_completions() {
        let mut sched = scheduler(2, 3);
        let (id, _) = decode_of(&sched.ensure(0)).unwrap();
        sched.detach();
        assert!(sched.complete(id, DecodeOutcome::decoded(1, 1), 0).is_empty());
        assert_eq!(sched.progress().loaded, 0);
    }

    #[test]
    fn progress_ratio() {
        let progress = Progress { loaded: 1, total: 4 };
        assert_eq!(progress.percent(), 25);
        assert_eq!(Progress::default().ratio(), 1.0);
    }
}
