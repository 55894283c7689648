//! # Brush Module
//!
//! Brush strokes describe one sculpting edit: a centre, a radius of influence,
//! a strength, a falloff exponent and a direction. The same stroke is handed to
//! every chunk it overlaps, and each chunk applies it to its own samples in world
//! space, so the result does not depend on where chunk boundaries fall.
//!
//! This module also turns the per-frame pointer state supplied by the host's
//! input/raycast system into button transitions, so the engine can sculpt either
//! continuously while the button is held or once per press.

use cgmath::Point3;

use super::{config::BrushSettings, voxels::bounds::Aabb};

/// Whether a stroke raises or lowers density.
///
/// Density is negative inside solid terrain and positive in air, so an additive
/// stroke carves material away and a subtractive stroke fills it in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrushMode {
    /// Adds the falloff-weighted strength to density.
    Additive,
    /// Subtracts the falloff-weighted strength from density.
    Subtractive,
}

impl BrushMode {
    /// Maps the host's `additive` flag to a mode.
    pub fn from_additive(additive: bool) -> Self {
        if additive {
            BrushMode::Additive
        } else {
            BrushMode::Subtractive
        }
    }

    fn sign(self) -> f32 {
        match self {
            BrushMode::Additive => 1.0,
            BrushMode::Subtractive => -1.0,
        }
    }
}

/// A single spherical deformation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushStroke {
    /// World-space centre of the brush.
    pub center: Point3<f32>,
    /// Radius of influence in world units.
    pub radius: f32,
    /// Density change at the centre.
    pub strength: f32,
    /// Exponent `p` of the `1 - (d / r)^p` falloff.
    pub falloff_power: f32,
    /// Direction of the change.
    pub mode: BrushMode,
}

impl BrushStroke {
    /// Creates a stroke with the default quadratic falloff.
    pub fn new(center: Point3<f32>, radius: f32, strength: f32, mode: BrushMode) -> Self {
        BrushStroke {
            center,
            radius,
            strength,
            falloff_power: BrushSettings::default().falloff_power,
            mode,
        }
    }

    /// Creates a stroke at `center` using the configured brush.
    pub fn from_settings(center: Point3<f32>, settings: &BrushSettings, mode: BrushMode) -> Self {
        BrushStroke {
            center,
            radius: settings.radius,
            strength: settings.strength,
            falloff_power: settings.falloff_power,
            mode,
        }
    }

    /// Replaces the falloff exponent.
    pub fn with_falloff(mut self, falloff_power: f32) -> Self {
        self.falloff_power = falloff_power;
        self
    }

    /// A stroke with no positive radius or strength changes nothing.
    pub fn is_degenerate(&self) -> bool {
        !(self.radius.is_finite() && self.radius > 0.0)
            || !(self.strength.is_finite() && self.strength > 0.0)
            || !(self.falloff_power.is_finite() && self.falloff_power > 0.0)
            || !(self.center.x.is_finite()
                && self.center.y.is_finite()
                && self.center.z.is_finite())
    }

    /// World-space box enclosing the sphere of influence.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.center, self.radius)
    }

    /// Signed density change for a sample `distance` away from the centre.
    ///
    /// Zero at and beyond the radius.
    pub fn delta_at(&self, distance: f32) -> f32 {
        if distance > self.radius {
            return 0.0;
        }
        let weight = 1.0 - (distance / self.radius).powf(self.falloff_power);
        self.mode.sign() * self.strength * weight
    }
}

/// Pointer state delivered by the host once per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushInput {
    /// World-space point the pointer ray hit.
    pub point: Point3<f32>,
    /// Whether the sculpt button is down.
    pub active: bool,
    /// Whether the stroke should add density (see [`BrushMode`]).
    pub additive: bool,
}

/// Represents the state of the sculpt button across two frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    /// Button is not pressed
    #[default]
    NotPressed,
    /// Button was just pressed this frame
    Pressed,
    /// Button has been held down for multiple frames
    Held,
    /// Button was just released this frame
    Released,
}

impl ButtonState {
    /// Determines if the button is actively down (either pressed or held)
    pub fn is_active(&self) -> bool {
        matches!(self, ButtonState::Pressed | ButtonState::Held)
    }

    /// Determines if the button was just pressed this frame
    pub fn is_just_pressed(&self) -> bool {
        matches!(self, ButtonState::Pressed)
    }

    /// Derives the transition from the previous and current raw button states
    pub fn from_raw_states(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => ButtonState::Pressed,
            (true, true) => ButtonState::Held,
            (true, false) => ButtonState::Released,
            (false, false) => ButtonState::NotPressed,
        }
    }
}

/// Remembers last frame's button so each new [`BrushInput`] can be classified.
#[derive(Debug, Default)]
pub struct BrushInputTracker {
    was_active: bool,
}

impl BrushInputTracker {
    /// Records this frame's input and returns the resulting transition.
    pub fn update(&mut self, input: &BrushInput) -> ButtonState {
        let state = ButtonState::from_raw_states(self.was_active, input.active);
        self.was_active = input.active;
        state
    }

    /// Whether the configured brush should be applied for this transition.
    pub fn should_apply(state: ButtonState, settings: &BrushSettings) -> bool {
        if settings.edge_triggered {
            state.is_just_pressed()
        } else {
            state.is_active()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn origin() -> Point3<f32> {
        Point3::new(0.0, 0.0, 0.0)
    }

    #[test]
    fn falloff_is_full_at_centre_and_zero_at_radius() {
        let stroke = BrushStroke::new(origin(), 4.0, 0.8, BrushMode::Additive);
        assert_abs_diff_eq!(stroke.delta_at(0.0), 0.8);
        assert_abs_diff_eq!(stroke.delta_at(4.0), 0.0);
        assert_abs_diff_eq!(stroke.delta_at(2.0), 0.8 * 0.75, epsilon = 1e-6);
        assert_eq!(stroke.delta_at(4.01), 0.0);
    }

    #[test]
    fn subtractive_strokes_are_negative() {
        let stroke = BrushStroke::new(origin(), 2.0, 1.0, BrushMode::Subtractive).with_falloff(1.0);
        assert_abs_diff_eq!(stroke.delta_at(1.0), -0.5, epsilon = 1e-6);
    }

    #[test]
    fn non_positive_radius_or_strength_is_degenerate() {
        assert!(BrushStroke::new(origin(), 0.0, 1.0, BrushMode::Additive).is_degenerate());
        assert!(BrushStroke::new(origin(), -1.0, 1.0, BrushMode::Additive).is_degenerate());
        assert!(BrushStroke::new(origin(), 1.0, 0.0, BrushMode::Additive).is_degenerate());
        assert!(BrushStroke::new(origin(), 1.0, -0.5, BrushMode::Additive).is_degenerate());
        assert!(!BrushStroke::new(origin(), 1.0, 0.5, BrushMode::Additive).is_degenerate());
    }

    #[test]
    fn tracker_reports_press_hold_release() {
        let mut tracker = BrushInputTracker::default();
        let mut input = BrushInput {
            point: origin(),
            active: false,
            additive: true,
        };
        assert_eq!(tracker.update(&input), ButtonState::NotPressed);
        input.active = true;
        assert_eq!(tracker.update(&input), ButtonState::Pressed);
        assert_eq!(tracker.update(&input), ButtonState::Held);
        input.active = false;
        assert_eq!(tracker.update(&input), ButtonState::Released);
    }

    #[test]
    fn edge_triggered_brush_only_applies_on_press() {
        let continuous = BrushSettings::default();
        let edge = BrushSettings {
            edge_triggered: true,
            ..Default::default()
        };
        assert!(BrushInputTracker::should_apply(ButtonState::Held, &continuous));
        assert!(!BrushInputTracker::should_apply(ButtonState::Held, &edge));
        assert!(BrushInputTracker::should_apply(ButtonState::Pressed, &edge));
        assert!(!BrushInputTracker::should_apply(ButtonState::Released, &continuous));
    }
}
