//! Progress reporting and cooperative cancellation.
//!
//! Long running operations report their progress as a fraction in `[0, 1]` with a message.
//! The callback returns `false` to abort the operation, which then fails as a whole.

/// A progress callback: `(fraction, message) -> continue`.
pub type ProgressCallback<'a> = dyn FnMut(f64, &str) -> bool + 'a;

/// A progress reporter, optionally mapping progress into a sub-range of a parent reporter.
pub struct Progress<'a> {
    callback: Option<&'a mut ProgressCallback<'a>>,
    start: f64,
    end: f64,
}

impl std::fmt::Debug for Progress<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("callback", &self.callback.is_some())
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

impl Default for Progress<'_> {
    fn default() -> Self {
        Self::none()
    }
}

impl<'a> Progress<'a> {
    /// Create a progress reporter calling `callback`.
    pub fn new(callback: &'a mut ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
            start: 0.0,
            end: 1.0,
        }
    }

    /// Create a progress reporter that reports nowhere and never aborts.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            callback: None,
            start: 0.0,
            end: 1.0,
        }
    }

    /// Report progress `fraction` of this reporter's range.
    ///
    /// Returns false if the operation should abort.
    pub fn report(&mut self, fraction: f64, message: &str) -> bool {
        let fraction = self.start + fraction.clamp(0.0, 1.0) * (self.end - self.start);
        match &mut self.callback {
            Some(callback) => callback(fraction, message),
            None => true,
        }
    }

    /// Create a reporter for the sub-range `[start, end]` of this reporter's range.
    pub fn scaled(&mut self, start: f64, end: f64) -> Progress<'_> {
        let span = self.end - self.start;
        let start = self.start + start.clamp(0.0, 1.0) * span;
        let end = self.start + end.clamp(0.0, 1.0) * span;
        Progress {
            callback: self
                .callback
                .as_mut()
                .map(|callback| &mut **callback as &mut ProgressCallback<'_>),
            start,
            end: end.max(start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_scaled() {
        let mut reported = Vec::new();
        let mut callback = |fraction: f64, _: &str| {
            reported.push(fraction);
            fraction < 0.9
        };
        let mut progress = Progress::new(&mut callback);
        assert!(progress.report(0.25, "quarter"));
        {
            let mut sub = progress.scaled(0.5, 0.7);
            assert!(sub.report(0.0, ""));
            assert!(sub.report(0.5, ""));
            let mut sub_sub = sub.scaled(0.5, 1.0);
            assert!(sub_sub.report(1.0, ""));
        }
        assert!(!progress.report(1.0, "done"));
        drop(progress);
        assert_eq!(reported.len(), 5);
        let expected = [0.25, 0.5, 0.6, 0.7, 1.0];
        for (got, expected) in reported.iter().zip(expected) {
            assert!((got - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn progress_none() {
        let mut progress = Progress::none();
        assert!(progress.report(0.5, ""));
        assert!(progress.scaled(0.0, 0.5).report(1.0, ""));
    }
}
