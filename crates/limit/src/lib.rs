//! A simple named counter bounded from above, used anywhere a pass needs to
//! bail out with `RecursionDetected`/a `Bug` rather than loop or recurse
//! forever: the lifetime solver's fixpoint (spec §4.6.3, capped at 1000
//! iterations) and resolver/EAT recursion-guard depth both go through a
//! `Limit`.

#[derive(Debug)]
pub struct Limit {
    upper_bound: usize,
    #[cfg(feature = "tracking")]
    max: std::sync::atomic::AtomicUsize,
}

impl Limit {
    #[cfg(not(feature = "tracking"))]
    pub const fn new(upper_bound: usize) -> Self {
        Self { upper_bound }
    }

    #[cfg(feature = "tracking")]
    pub const fn new(upper_bound: usize) -> Self {
        Self { upper_bound, max: std::sync::atomic::AtomicUsize::new(0) }
    }

    #[cfg(not(feature = "tracking"))]
    pub const fn new_tracking(upper_bound: usize) -> Self {
        Self { upper_bound }
    }

    #[cfg(feature = "tracking")]
    pub const fn new_tracking(upper_bound: usize) -> Self {
        Self { upper_bound, max: std::sync::atomic::AtomicUsize::new(0) }
    }

    pub const fn inner(&self) -> usize {
        self.upper_bound
    }

    #[inline]
    pub fn check(&self, other: usize) -> Result<(), ()> {
        if other > self.upper_bound {
            Err(())
        } else {
            #[cfg(feature = "tracking")]
            self.track(other);
            Ok(())
        }
    }

    #[cfg(feature = "tracking")]
    fn track(&self, other: usize) {
        use std::sync::atomic::Ordering;
        let mut current_max = self.max.load(Ordering::Relaxed);
        while current_max < other {
            let res = self.max.compare_exchange_weak(
                current_max,
                other,
                Ordering::Relaxed,
                Ordering::Relaxed,
            );
            match res {
                Ok(_) => break,
                Err(new_current_max) => current_max = new_current_max,
            }
        }
    }
}
