//! Rule cascades mapping band powers to cognitive-state labels.
//!
//! Both cascades are evaluated top to bottom and the first matching rule
//! wins, so reordering the checks changes results.
use std::fmt;
use serde::{Deserialize, Serialize};
use crate::drivers::fft::{BandPowers, BandRatios};
use crate::drivers::NeuroStateError;
/// Discrete labels produced by the primary cascade, plus the `Error`
/// sentinel used when the source drops out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CognitiveState {
    Drowsy,
    Microsleep,
    HighlyAlert,
    Alert,
    Relaxed,
    Normal,
    Error,
}
impl CognitiveState {
    pub fn alert_level(self) -> AlertLevel {
        match self {
            CognitiveState::Drowsy | CognitiveState::Microsleep | CognitiveState::Error => {
                AlertLevel::Concerning
            }
            CognitiveState::HighlyAlert | CognitiveState::Alert => AlertLevel::Favorable,
            CognitiveState::Relaxed | CognitiveState::Normal => AlertLevel::Neutral,
        }
    }
    pub fn label(self) -> &'static str {
        match self {
            CognitiveState::Drowsy => "DROWSY",
            CognitiveState::Microsleep => "MICROSLEEP",
            CognitiveState::HighlyAlert => "HIGHLY_ALERT",
            CognitiveState::Alert => "ALERT",
            CognitiveState::Relaxed => "RELAXED",
            CognitiveState::Normal => "NORMAL",
            CognitiveState::Error => "ERROR",
        }
    }
}
impl fmt::Display for CognitiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
/// Ordinal severity: 1 concerning, 2 neutral, 3 favorable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
    Concerning = 1,
    Neutral = 2,
    Favorable = 3,
}
impl AlertLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}
/// Values the primary cascade looked at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub theta_beta_ratio: f64,
    pub alpha_beta_ratio: f64,
    pub ratios: BandRatios,
    pub band_powers: BandPowers,
    pub relative_powers: BandPowers,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub state: CognitiveState,
    pub alert_level: AlertLevel,
    pub details: Diagnostics,
}
impl ClassificationResult {
    /// Sentinel emitted when the sample source fails.
    pub fn error() -> Self {
        Self {
            state: CognitiveState::Error,
            alert_level: AlertLevel::Concerning,
            details: Diagnostics::default(),
        }
    }
    /// Same diagnostics, different label; the alert level follows the label.
    pub fn relabel(mut self, state: CognitiveState) -> Self {
        self.state = state;
        self.alert_level = state.alert_level();
        self
    }
}
/// Thresholds of the primary cascade.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    /// Theta/Beta above this is `DROWSY`.
    pub drowsy_theta_beta: f64,
    /// Relative delta above this is `MICROSLEEP`.
    pub microsleep_delta: f64,
    pub highly_alert_beta: f64,
    pub highly_alert_gamma: f64,
    pub alert_beta: f64,
    /// Open interval of Alpha/Beta that counts as `RELAXED`.
    pub relaxed_alpha_beta_min: f64,
    pub relaxed_alpha_beta_max: f64,
}
impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            drowsy_theta_beta: 2.5,
            microsleep_delta: 0.4,
            highly_alert_beta: 0.3,
            highly_alert_gamma: 0.15,
            alert_beta: 0.25,
            relaxed_alpha_beta_min: 0.6,
            relaxed_alpha_beta_max: 1.5,
        }
    }
}
impl ClassifierThresholds {
    pub fn validate(&self) -> Result<(), NeuroStateError> {
        let values = [
            self.drowsy_theta_beta,
            self.microsleep_delta,
            self.highly_alert_beta,
            self.highly_alert_gamma,
            self.alert_beta,
            self.relaxed_alpha_beta_min,
            self.relaxed_alpha_beta_max,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(NeuroStateError::InvalidConfig(
                "classifier thresholds must be finite and non-negative".into(),
            ));
        }
        if self.relaxed_alpha_beta_min >= self.relaxed_alpha_beta_max {
            return Err(NeuroStateError::InvalidConfig(format!(
                "relaxed alpha/beta range is empty: ({}, {})",
                self.relaxed_alpha_beta_min, self.relaxed_alpha_beta_max
            )));
        }
        Ok(())
    }
}
#[derive(Clone, Debug, Default)]
pub struct StateClassifier {
    thresholds: ClassifierThresholds,
}
impl StateClassifier {
    pub fn new(thresholds: ClassifierThresholds) -> Self {
        Self { thresholds }
    }
    pub fn classify(&self, powers: &BandPowers, ratios: &BandRatios) -> ClassificationResult {
        let t = &self.thresholds;
        let relative = powers.relative();
        let state = if ratios.theta_beta > t.drowsy_theta_beta {
            CognitiveState::Drowsy
        } else if relative.delta > t.microsleep_delta {
            CognitiveState::Microsleep
        } else if relative.beta > t.highly_alert_beta && relative.gamma > t.highly_alert_gamma {
            CognitiveState::HighlyAlert
        } else if relative.beta > t.alert_beta {
            CognitiveState::Alert
        } else if ratios.alpha_beta > t.relaxed_alpha_beta_min
            && ratios.alpha_beta < t.relaxed_alpha_beta_max
        {
            CognitiveState::Relaxed
        } else {
            CognitiveState::Normal
        };
        ClassificationResult {
            state,
            alert_level: state.alert_level(),
            details: Diagnostics {
                theta_beta_ratio: ratios.theta_beta,
                alpha_beta_ratio: ratios.alpha_beta,
                ratios: *ratios,
                band_powers: *powers,
                relative_powers: relative,
            },
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alertness {
    Relaxed,
    ModeratelyAlert,
    HighlyAlert,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stress {
    Low,
    Moderate,
    High,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fatigue {
    Awake,
    Tired,
    Sleepy,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Focus {
    HighlyFocused,
    ModeratelyFocused,
    Distracted,
}
/// Advisory four-way judgement from averaged frontal ratios. Does not feed
/// the primary state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainState {
    pub alertness: Alertness,
    pub stress: Stress,
    pub fatigue: Fatigue,
    pub focus: Focus,
}
impl BrainState {
    pub fn assess(ratios: &BandRatios) -> Self {
        let alertness = if ratios.alpha_theta < 1.5 {
            Alertness::Relaxed
        } else if ratios.alpha_theta <= 2.5 {
            Alertness::ModeratelyAlert
        } else {
            Alertness::HighlyAlert
        };
        let stress = if ratios.alpha_beta > 0.3 {
            Stress::Low
        } else if ratios.alpha_beta >= 0.1 {
            Stress::Moderate
        } else {
            Stress::High
        };
        let fatigue = if ratios.delta_theta > 10.0 {
            Fatigue::Sleepy
        } else if ratios.delta_theta >= 4.0 {
            Fatigue::Tired
        } else {
            Fatigue::Awake
        };
        let focus = if ratios.theta_beta > 2.0 {
            Focus::Distracted
        } else if ratios.theta_beta >= 1.0 {
            Focus::ModeratelyFocused
        } else {
            Focus::HighlyFocused
        };
        Self {
            alertness,
            stress,
            fatigue,
            focus,
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn classify(powers: BandPowers) -> ClassificationResult {
        StateClassifier::default().classify(&powers, &powers.ratios())
    }
    /// Band powers whose relative values equal the given fractions of 100.
    fn relative(delta: f64, theta: f64, alpha: f64, beta: f64, gamma: f64) -> BandPowers {
        BandPowers {
            delta: delta * 100.0,
            theta: theta * 100.0,
            alpha: alpha * 100.0,
            beta: beta * 100.0,
            gamma: gamma * 100.0,
        }
    }
    #[test]
    fn high_theta_beta_is_drowsy_regardless_of_rest() {
        let result = classify(BandPowers {
            theta: 10.0,
            beta: 2.0,
            delta: 1.0,
            alpha: 3.0,
            gamma: 0.1,
        });
        assert_eq!(result.state, CognitiveState::Drowsy);
        assert_eq!(result.alert_level.as_u8(), 1);
        assert_eq!(result.details.theta_beta_ratio, 5.0);
        // Drowsy wins even when delta would also match.
        let result = classify(relative(0.6, 0.3, 0.0, 0.1, 0.0));
        assert_eq!(result.state, CognitiveState::Drowsy);
    }
    #[test]
    fn dominant_delta_is_microsleep() {
        let result = classify(relative(0.5, 0.1, 0.1, 0.2, 0.1));
        assert_eq!(result.state, CognitiveState::Microsleep);
        assert_eq!(result.alert_level, AlertLevel::Concerning);
    }
    #[test]
    fn beta_and_gamma_is_highly_alert() {
        let result = classify(relative(0.1, 0.15, 0.2, 0.35, 0.2));
        assert_eq!(result.state, CognitiveState::HighlyAlert);
        assert_eq!(result.alert_level.as_u8(), 3);
    }
    #[test]
    fn beta_without_gamma_is_alert() {
        let result = classify(relative(0.2, 0.2, 0.22, 0.28, 0.1));
        assert_eq!(result.state, CognitiveState::Alert);
        assert_eq!(result.alert_level, AlertLevel::Favorable);
    }
    #[test]
    fn balanced_alpha_beta_is_relaxed() {
        let result = classify(relative(0.3, 0.25, 0.2, 0.2, 0.05));
        assert_eq!(result.state, CognitiveState::Relaxed);
        assert_eq!(result.alert_level, AlertLevel::Neutral);
    }
    #[test]
    fn fallthrough_is_normal() {
        let result = classify(relative(0.3, 0.2, 0.35, 0.1, 0.05));
        assert_eq!(result.state, CognitiveState::Normal);
        assert_eq!(result.alert_level.as_u8(), 2);
        let silent = classify(BandPowers::default());
        assert_eq!(silent.state, CognitiveState::Normal);
        assert_eq!(silent.details.relative_powers, BandPowers::default());
    }
    #[test]
    fn relaxed_interval_is_open() {
        // alpha/beta exactly 1.5 is not relaxed
        let result = classify(relative(0.3, 0.2, 0.3, 0.2, 0.0));
        assert_eq!(result.details.alpha_beta_ratio, 1.5);
        assert_eq!(result.state, CognitiveState::Normal);
    }
    #[test]
    fn relabel_keeps_level_consistent() {
        let result = classify(relative(0.5, 0.1, 0.1, 0.2, 0.1)).relabel(CognitiveState::Alert);
        assert_eq!(result.alert_level, AlertLevel::Favorable);
        assert_eq!(ClassificationResult::error().alert_level.as_u8(), 1);
    }
    #[test]
    fn thresholds_validate() {
        assert!(ClassifierThresholds::default().validate().is_ok());
        let inverted = ClassifierThresholds {
            relaxed_alpha_beta_min: 2.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }
    #[test]
    fn brain_state_boundaries() {
        let ratios = BandRatios {
            alpha_theta: 1.5,
            alpha_beta: 0.1,
            delta_theta: 4.0,
            theta_beta: 1.0,
            gamma_alpha: 0.0,
        };
        let state = BrainState::assess(&ratios);
        assert_eq!(state.alertness, Alertness::ModeratelyAlert);
        assert_eq!(state.stress, Stress::Moderate);
        assert_eq!(state.fatigue, Fatigue::Tired);
        assert_eq!(state.focus, Focus::ModeratelyFocused);
        let ratios = BandRatios {
            alpha_theta: 3.0,
            alpha_beta: 0.05,
            delta_theta: 12.0,
            theta_beta: 2.5,
            gamma_alpha: 0.0,
        };
        let state = BrainState::assess(&ratios);
        assert_eq!(state.alertness, Alertness::HighlyAlert);
        assert_eq!(state.stress, Stress::High);
        assert_eq!(state.fatigue, Fatigue::Sleepy);
        assert_eq!(state.focus, Focus::Distracted);
        let state = BrainState::assess(&BandRatios {
            alpha_beta: 0.5,
            ..Default::default()
        });
        assert_eq!(state.alertness, Alertness::Relaxed);
        assert_eq!(state.stress, Stress::Low);
        assert_eq!(state.fatigue, Fatigue::Awake);
        assert_eq!(state.focus, Focus::HighlyFocused);
    }
}
