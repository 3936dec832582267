//! Visibility tracking for the continuous-scroll mode.
//!
//! Every rendered page element is observed under an [`ElementId`] stamped
//! with the generation of the subscription that created it. Re-subscribing
//! (chapter change, entering Vertical mode) bumps the generation, so reports
//! about elements of an older subscription are discarded.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId {
    pub generation: u64,
    pub index: usize,
}

/// One crossing reported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEntry {
    pub element: ElementId,
    pub intersecting: bool,
    pub ratio: f32,
}

/// Rendering-side capability that watches page elements.
pub trait VisibilityObserver {
    fn observe(&mut self, element: ElementId);
    fn unobserve(&mut self, element: ElementId);
}

/// Observer for shells without a real viewport.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl VisibilityObserver for NoopObserver {
    fn observe(&mut self, _element: ElementId) {}
    fn unobserve(&mut self, _element: ElementId) {}
}

#[derive(Debug, Clone, Copy)]
struct Subscription {
    generation: u64,
    pages: usize,
}

/// Owns the observation of page elements; everything it observed is released
/// on `unsubscribe`, on re-subscription and on drop.
pub struct ViewportTracker {
    observer: Box<dyn VisibilityObserver>,
    threshold: f32,
    generation: u64,
    active: Option<Subscription>,
}

impl ViewportTracker {
    pub fn new(observer: Box<dyn VisibilityObserver>, threshold: f32) -> Self {
        Self {
            observer,
            threshold: threshold.clamp(0.0, 1.0),
            generation: 0,
            active: None,
        }
    }

    /// Observe `pages` fresh elements, releasing any previous subscription.
    /// Returns the new generation.
    pub fn subscribe(&mut self, pages: usize) -> u64 {
        self.unsubscribe();
        self.generation += 1;
        let generation = self.generation;
        if pages == 0 {
            debug!(generation, "No page elements to observe");
            return generation;
        }
        for index in 0..pages {
            self.observer.observe(ElementId { generation, index });
        }
        self.active = Some(Subscription { generation, pages });
        debug!(generation, pages, "Subscribed to page visibility");
        generation
    }

    pub fn unsubscribe(&mut self) {
        let Some(subscription) = self.active.take() else {
            return;
        };
        for index in 0..subscription.pages {
            self.observer.unobserve(ElementId {
                generation: subscription.generation,
                index,
            });
        }
        debug!(
            generation = subscription.generation,
            pages = subscription.pages,
            "Released page visibility subscription"
        );
    }

    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }

    /// Generation of the live subscription, if any.
    pub fn generation(&self) -> Option<u64> {
        self.active.map(|subscription| subscription.generation)
    }

    /// Pick the page a batch of crossings points at.
    ///
    /// Only intersecting entries of the live subscription at or above the
    /// threshold qualify. The highest ratio wins; on a tie the later entry
    /// wins, matching in-order application of the batch.
    pub fn select(&self, entries: &[VisibilityEntry]) -> Option<usize> {
        let subscription = self.active?;
        let mut best: Option<&VisibilityEntry> = None;
        for entry in entries {
            if entry.element.generation != subscription.generation
                || entry.element.index >= subscription.pages
            {
                continue;
            }
            if !entry.intersecting || entry.ratio < self.threshold {
                continue;
            }
            match best {
                Some(current) if current.ratio > entry.ratio => {}
                _ => best = Some(entry),
            }
        }
        best.map(|entry| entry.element.index)
    }
}

impl Drop for ViewportTracker {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for ViewportTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportTracker")
            .field("threshold", &self.threshold)
            .field("generation", &self.generation)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
