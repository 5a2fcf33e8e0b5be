//! Parameterized visualization models and derivation playback.
//!
//! Each model is a pure `y(x, params)` function selected by the visual
//! spec's model id; the presentation layer samples it over the viewport.

use std::collections::HashMap;

use crate::model::VisualSpec;

/// Rendering function selected by a visual spec's model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphModel {
    Linear,
    Quadratic,
    Cubic,
    Exponential,
    Logarithm,
    Sine,
    Normal,
    Regression,
    Bayes,
}

impl GraphModel {
    /// Unknown ids fall back to the linear model.
    pub fn for_id(model_id: &str) -> Self {
        match model_id {
            "quadratic" => GraphModel::Quadratic,
            "cubic" => GraphModel::Cubic,
            "exponential" => GraphModel::Exponential,
            "logarithm" => GraphModel::Logarithm,
            "sine" => GraphModel::Sine,
            "normal" => GraphModel::Normal,
            "regression" => GraphModel::Regression,
            "bayes" => GraphModel::Bayes,
            _ => GraphModel::Linear,
        }
    }

    /// Evaluates the model at `x`. Returns `None` outside the model's
    /// domain (e.g. a logarithm of a non-positive argument).
    pub fn y(self, x: f64, params: &HashMap<String, f64>) -> Option<f64> {
        let p = |name: &str, default: f64| params.get(name).copied().unwrap_or(default);

        match self {
            GraphModel::Linear => Some(p("a", 1.0) * x + p("b", 0.0)),
            GraphModel::Quadratic => {
                Some(p("a", 1.0) * x * x + p("b", 0.0) * x + p("c", 0.0))
            }
            GraphModel::Cubic => Some(
                p("a", 1.0) * x * x * x + p("b", 0.0) * x * x + p("c", 0.0) * x + p("d", 0.0),
            ),
            GraphModel::Exponential => Some(p("a", 1.0) * (p("b", 1.0) * x).exp()),
            GraphModel::Logarithm => {
                let shifted = x + p("b", 1.0);
                (shifted > 0.0).then(|| p("a", 1.0) * shifted.ln())
            }
            GraphModel::Sine => {
                Some(p("a", 1.0) * (p("b", 1.0) * x + p("c", 0.0)).sin() + p("d", 0.0))
            }
            GraphModel::Normal => {
                let mu = p("mu", 0.0);
                let sigma = p("sigma", 1.0).max(1e-4);
                let coefficient = 1.0 / (sigma * (2.0 * std::f64::consts::PI).sqrt());
                let exponent = -(x - mu).powi(2) / (2.0 * sigma.powi(2));
                Some(coefficient * exponent.exp())
            }
            GraphModel::Regression => Some(p("m", 1.0) * x + p("b", 0.0)),
            GraphModel::Bayes => {
                let prior = x.clamp(1e-4, 0.9999);
                let sensitivity = p("sensitivity", 0.9).clamp(1e-4, 0.9999);
                let false_positive = p("falsePositive", 0.1).clamp(1e-4, 0.9999);
                let denominator = sensitivity * prior + false_positive * (1.0 - prior);
                if denominator > 0.0 {
                    Some(sensitivity * prior / denominator)
                } else {
                    Some(0.0)
                }
            }
        }
    }
}

/// Axis-aligned plotting bounds from a visual spec's metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Viewport {
    /// Reads `xMin`/`xMax`/`yMin`/`yMax`, defaulting each side to ±10.
    pub fn for_spec(spec: &VisualSpec) -> Self {
        let bound = |key: &str, default: f64| {
            spec.metadata
                .get(key)
                .and_then(|value| value.parse().ok())
                .unwrap_or(default)
        };
        Self {
            x_min: bound("xMin", -10.0),
            x_max: bound("xMax", 10.0),
            y_min: bound("yMin", -10.0),
            y_max: bound("yMax", 10.0),
        }
    }
}

/// Default parameter values keyed by parameter id.
pub fn default_parameters(spec: &VisualSpec) -> HashMap<String, f64> {
    spec.parameters
        .iter()
        .map(|parameter| (parameter.id.clone(), parameter.default_value))
        .collect()
}

/// Step-through playback state for a derivation.
#[derive(Debug)]
pub struct PlaybackController {
    current_step: usize,
    playing: bool,
    step_count: usize,
}

impl PlaybackController {
    pub fn new(step_count: usize) -> Self {
        Self {
            current_step: 0,
            playing: false,
            step_count: step_count.max(1),
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn reset(&mut self) {
        self.current_step = 0;
        self.playing = false;
    }

    /// Advances one step while playing; stops at the last step.
    pub fn tick(&mut self) {
        if !self.playing {
            return;
        }
        if self.current_step + 1 < self.step_count {
            self.current_step += 1;
        } else {
            self.playing = false;
        }
    }
}
