//=========================================================================
// Loading Projection
//=========================================================================
//
// Placeholder that stands in for a state while it is loading.
//
// The manager calls the projection instead of the real state for as
// long as the current state's loading flag is set, so the update/draw
// loop never sees a half-initialized state.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

//=== LoadingProjection ===================================================

/// Drawable stand-in shown while the awaited state is loading.
pub trait LoadingProjection<T>: Send {
    /// Advances the animation. `awaiting` names the state being loaded.
    fn update(&mut self, dt: Duration, awaiting: &str);

    fn draw(&mut self, target: &mut T);
}

//=== Canvas ==============================================================

/// Minimal drawing surface the default [`Spinner`] renders onto.
///
/// Implemented by the application's draw target.
pub trait Canvas {
    /// Center of the drawable area.
    fn center(&self) -> (f32, f32);

    /// Draws `text` centered on `at`.
    fn draw_label(&mut self, text: &str, at: (f32, f32));

    /// Draws an arc around `center` from `start` to `end` degrees.
    fn draw_arc(&mut self, center: (f32, f32), radius: f32, start: f32, end: f32);
}

//=== Spinner =============================================================

/// Default projection: a shrinking arc under a "Loading..." label.
#[derive(Debug, Clone)]
pub struct Spinner {
    sweep: f32,
    label: String,
}

impl Spinner {
    /// Sweep the arc starts at and resets to.
    pub const FULL_SWEEP: f32 = 320.0;
    /// Sweep at or below which the arc resets.
    pub const MIN_SWEEP: f32 = 10.0;

    const RADIUS: f32 = 50.0;
    const OFFSET_Y: f32 = 100.0;

    pub fn new() -> Self {
        Self {
            sweep: Self::FULL_SWEEP,
            label: "Loading...".to_owned(),
        }
    }

    /// Replaces the status label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Current arc sweep in degrees.
    pub fn sweep(&self) -> f32 {
        self.sweep
    }
}

impl Default for Spinner {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Canvas> LoadingProjection<T> for Spinner {
    fn update(&mut self, dt: Duration, _awaiting: &str) {
        // One degree per whole 10 ms.
        self.sweep -= (dt.as_millis() / 10) as f32;
        if self.sweep <= Self::MIN_SWEEP {
            self.sweep = Self::FULL_SWEEP;
        }
    }

    fn draw(&mut self, target: &mut T) {
        let (cx, cy) = target.center();
        let anchor = (cx, cy - Self::OFFSET_Y);
        target.draw_label(&self.label, anchor);
        target.draw_arc(anchor, Self::RADIUS, 0.0, self.sweep);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        labels: Vec<(String, (f32, f32))>,
        arcs: Vec<(f32, f32)>,
    }

    impl Canvas for Recorder {
        fn center(&self) -> (f32, f32) {
            (600.0, 500.0)
        }

        fn draw_label(&mut self, text: &str, at: (f32, f32)) {
            self.labels.push((text.to_owned(), at));
        }

        fn draw_arc(&mut self, _center: (f32, f32), _radius: f32, start: f32, end: f32) {
            self.arcs.push((start, end));
        }
    }

    fn step(spinner: &mut Spinner, ms: u64) {
        LoadingProjection::<Recorder>::update(spinner, Duration::from_millis(ms), "play");
    }

    #[test]
    fn sweep_shrinks_by_whole_tens_of_millis() {
        let mut spinner = Spinner::new();
        step(&mut spinner, 16);
        assert_eq!(spinner.sweep(), 319.0);
        step(&mut spinner, 9);
        assert_eq!(spinner.sweep(), 319.0);
    }

    #[test]
    fn sweep_wraps_at_lower_bound() {
        let mut spinner = Spinner::new();
        step(&mut spinner, 3090);
        assert_eq!(spinner.sweep(), 11.0);
        step(&mut spinner, 10);
        assert_eq!(spinner.sweep(), Spinner::FULL_SWEEP);
    }

    #[test]
    fn draws_label_and_arc_above_center() {
        let mut spinner = Spinner::new().with_label("Preparing board");
        let mut canvas = Recorder::default();
        spinner.draw(&mut canvas);

        assert_eq!(canvas.labels, vec![("Preparing board".to_owned(), (600.0, 400.0))]);
        assert_eq!(canvas.arcs, vec![(0.0, 320.0)]);
    }
}
