use bevy::math::Vec2;

use crate::{config::FadeOptions, surface::Surface};

/// Opacity closer than this to a bound counts as having reached it.
const OPACITY_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitValue {
    Zero,
    One,
}

impl BitValue {
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            BitValue::Zero => BitValue::One,
            BitValue::One => BitValue::Zero,
        }
    }

    #[inline]
    pub fn as_char(self) -> char {
        match self {
            BitValue::Zero => '0',
            BitValue::One => '1',
        }
    }
}

/// Where a bit is in its fade cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FadeState {
    /// resting at the minimum opacity
    #[default]
    IdleMin,
    /// resting at the maximum opacity
    IdleMax,
    FadingIn,
    FadingOut,
}

/// A single character of the matrix together with its fade animation.
#[derive(Debug, Clone)]
pub struct Bit {
    value: BitValue,
    position: Vec2,
    state: FadeState,
    opacity: f32,
    min_opacity: f32,
    max_opacity: f32,
    fade_delta: f32,
    /// set when the value switched, cleared when a new fade starts
    switched: bool,
    current_fade_in_prob: f32,
    fade_in_prob: f32,
    fade_in_prob_increment: f32,
    current_fade_out_prob: f32,
    fade_out_prob: f32,
    fade_out_prob_increment: f32,
}

impl Bit {
    pub fn new(value: BitValue, position: Vec2, fade: &FadeOptions) -> Self {
        Self {
            value,
            position,
            state: FadeState::IdleMin,
            opacity: fade.min_bit_opacity,
            min_opacity: fade.min_bit_opacity,
            max_opacity: fade.max_bit_opacity,
            fade_delta: fade.bit_fade_delta,
            switched: false,
            current_fade_in_prob: 0.0,
            fade_in_prob: fade.fade_in_prob,
            fade_in_prob_increment: fade.fade_in_prob_increment,
            current_fade_out_prob: 0.0,
            fade_out_prob: fade.fade_out_prob,
            fade_out_prob_increment: fade.fade_out_prob_increment,
        }
    }

    #[inline]
    pub fn value(&self) -> BitValue {
        self.value
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    #[inline]
    pub fn state(&self) -> FadeState {
        self.state
    }

    #[inline]
    pub fn is_animating(&self) -> bool {
        matches!(self.state, FadeState::FadingIn | FadeState::FadingOut)
    }

    #[inline]
    pub fn fading_in(&self) -> bool {
        self.state == FadeState::FadingIn
    }

    #[inline]
    pub fn fading_out(&self) -> bool {
        self.state == FadeState::FadingOut
    }

    #[inline]
    pub fn switched(&self) -> bool {
        self.switched
    }

    #[inline]
    pub fn is_at_min_opacity(&self) -> bool {
        self.state == FadeState::IdleMin
    }

    #[inline]
    pub fn is_at_max_opacity(&self) -> bool {
        self.state == FadeState::IdleMax
    }

    #[inline]
    pub fn current_fade_in_prob(&self) -> f32 {
        self.current_fade_in_prob
    }

    #[inline]
    pub fn current_fade_out_prob(&self) -> f32 {
        self.current_fade_out_prob
    }

    /// Starts fading towards the opposite bound. Does nothing while already fading.
    pub fn trigger_animation(&mut self) {
        self.state = match self.state {
            FadeState::IdleMin => FadeState::FadingIn,
            FadeState::IdleMax => FadeState::FadingOut,
            FadeState::FadingIn | FadeState::FadingOut => return,
        };
        self.switched = false;
    }

    /// Toggles the displayed digit.
    pub fn switch_value(&mut self) {
        self.value = self.value.flipped();
        self.switched = true;
    }

    /// Moves the opacity one step along the current fade, settling at the bound it reaches.
    pub fn advance_fade(&mut self) {
        match self.state {
            FadeState::FadingIn => {
                self.opacity += self.fade_delta;
                if self.opacity >= self.max_opacity - OPACITY_EPSILON {
                    self.opacity = self.max_opacity;
                    self.state = FadeState::IdleMax;
                }
            }
            FadeState::FadingOut => {
                self.opacity -= self.fade_delta;
                if self.opacity <= self.min_opacity + OPACITY_EPSILON {
                    self.opacity = self.min_opacity;
                    self.state = FadeState::IdleMin;
                }
            }
            FadeState::IdleMin | FadeState::IdleMax => (),
        }
    }

    /// Raises both trigger probabilities by their increments, never past their ceilings.
    pub fn increment_fade_probs(&mut self) {
        if self.current_fade_in_prob < self.fade_in_prob {
            self.current_fade_in_prob =
                (self.current_fade_in_prob + self.fade_in_prob_increment).min(self.fade_in_prob);
        }
        if self.current_fade_out_prob < self.fade_out_prob {
            self.current_fade_out_prob =
                (self.current_fade_out_prob + self.fade_out_prob_increment).min(self.fade_out_prob);
        }
    }

    /// Runs one frame of the bit: maybe start a fade, step it, draw, then escalate the
    /// trigger probabilities.
    pub fn update_and_draw<S: Surface + ?Sized>(&mut self, surface: &mut S, rng: &mut fastrand::Rng) {
        let trigger_prob = match self.state {
            FadeState::IdleMin => Some(self.current_fade_in_prob),
            FadeState::IdleMax => Some(self.current_fade_out_prob),
            FadeState::FadingIn | FadeState::FadingOut => None,
        };
        if trigger_prob.is_some_and(|prob| rng.f32() < prob) {
            self.trigger_animation();
        }

        self.advance_fade();
        surface.set_alpha(self.opacity);
        surface.draw_text(self.value.as_char(), self.position);

        self.increment_fade_probs();
    }
}
