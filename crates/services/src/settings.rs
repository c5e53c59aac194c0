use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::{ListenOptions, SpeechOptions};
use crate::error::SettingsError;

/// Tunables of the practice engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Upper bound on a single listen before it is treated as cancelled.
    pub listen_timeout_secs: u64,
    /// Ask the recognizer for interim transcripts (display only).
    pub interim_results: bool,
    pub speech: SpeechOptions,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            listen_timeout_secs: 15,
            interim_results: true,
            speech: SpeechOptions::default(),
        }
    }
}

impl EngineSettings {
    /// Check ranges and normalize the language tag.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` for an out-of-range timeout or voice parameter,
    /// or an empty language.
    pub fn validate(mut self) -> Result<Self, SettingsError> {
        if !(1..=300).contains(&self.listen_timeout_secs) {
            return Err(SettingsError::InvalidListenTimeout(self.listen_timeout_secs));
        }
        let speech = &self.speech;
        if !speech.rate.is_finite() || speech.rate <= 0.0 || speech.rate > 10.0 {
            return Err(SettingsError::InvalidRate);
        }
        if !speech.pitch.is_finite() || !(0.0..=2.0).contains(&speech.pitch) {
            return Err(SettingsError::InvalidPitch);
        }
        if !speech.volume.is_finite() || !(0.0..=1.0).contains(&speech.volume) {
            return Err(SettingsError::InvalidVolume);
        }
        let language = self.speech.language.trim();
        if language.is_empty() {
            return Err(SettingsError::EmptyLanguage);
        }
        self.speech.language = language.to_owned();
        Ok(self)
    }

    #[must_use]
    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }

    #[must_use]
    pub fn listen_options(&self) -> ListenOptions {
        ListenOptions {
            language: self.speech.language.clone(),
            interim_results: self.interim_results,
            continuous: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = EngineSettings::default().validate().unwrap();
        assert_eq!(settings.listen_timeout(), Duration::from_secs(15));
        assert!((settings.speech.rate - 0.9).abs() < f32::EPSILON);
        assert!(!settings.listen_options().continuous);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let settings = EngineSettings {
            listen_timeout_secs: 0,
            ..EngineSettings::default()
        };
        assert_eq!(
            settings.validate().unwrap_err(),
            SettingsError::InvalidListenTimeout(0)
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{ "listen_timeout_secs": 30, "speech": { "language": " en-GB " } }"#;
        let settings: EngineSettings = serde_json::from_str(json).unwrap();
        let settings = settings.validate().unwrap();
        assert_eq!(settings.listen_timeout_secs, 30);
        assert_eq!(settings.speech.language, "en-GB");
        assert!((settings.speech.pitch - 1.0).abs() < f32::EPSILON);
        assert!(settings.interim_results);
    }

    #[test]
    fn loud_volume_is_rejected() {
        let mut settings = EngineSettings::default();
        settings.speech.volume = 1.5;
        assert_eq!(settings.validate().unwrap_err(), SettingsError::InvalidVolume);
    }
}
