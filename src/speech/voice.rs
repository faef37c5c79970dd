//! Voice profiles and SSML rendering

use crate::commentary::CommentaryStyle;
use crate::config::{VoiceSettings, VoicesConfig};
use serde::Serialize;
use std::ops::RangeInclusive;

pub const RATE_RANGE: RangeInclusive<f64> = 0.5..=2.0;
pub const PITCH_RANGE: RangeInclusive<f64> = -12.0..=12.0;

/// Synthesis parameters for one commentary style
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceProfile {
    pub voice_name: String,
    pub style: CommentaryStyle,
    /// Speaking rate multiplier, within [`RATE_RANGE`]
    pub rate: f64,
    /// Pitch shift in semitones, within [`PITCH_RANGE`]
    pub pitch: f64,
}

impl VoiceProfile {
    /// Build a profile, clamping rate and pitch into range
    pub fn new(voice_name: impl Into<String>, style: CommentaryStyle, rate: f64, pitch: f64) -> Self {
        Self {
            voice_name: voice_name.into(),
            style,
            rate: clamp_rate(rate),
            pitch: clamp_pitch(pitch),
        }
    }

    pub fn from_settings(style: CommentaryStyle, settings: &VoiceSettings) -> Self {
        Self::new(settings.voice_name.clone(), style, settings.rate, settings.pitch)
    }

    /// Wrap text in an SSML envelope carrying this profile
    pub fn to_ssml(&self, text: &str) -> String {
        format!(
            concat!(
                r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis""#,
                r#" xmlns:mstts="http://www.w3.org/2001/mstts" xml:lang="en-US">"#,
                r#"<voice name="{voice}">"#,
                r#"<prosody rate="{rate}" pitch="{pitch:+.0}st">"#,
                r#"<mstts:express-as style="{style}">{text}</mstts:express-as>"#,
                r#"</prosody></voice></speak>"#
            ),
            voice = escape_xml(&self.voice_name),
            rate = self.rate,
            pitch = self.pitch,
            style = self.style,
            text = escape_xml(text),
        )
    }
}

/// Partial change to a voice profile; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceUpdate {
    pub voice_name: Option<String>,
    pub rate: Option<f64>,
    pub pitch: Option<f64>,
}

/// One profile per style
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceProfiles {
    excited: VoiceProfile,
    neutral: VoiceProfile,
    analytical: VoiceProfile,
}

impl Default for VoiceProfiles {
    fn default() -> Self {
        Self::from_config(&VoicesConfig::default())
    }
}

impl VoiceProfiles {
    pub fn from_config(config: &VoicesConfig) -> Self {
        Self {
            excited: VoiceProfile::from_settings(CommentaryStyle::Excited, &config.excited),
            neutral: VoiceProfile::from_settings(CommentaryStyle::Neutral, &config.neutral),
            analytical: VoiceProfile::from_settings(CommentaryStyle::Analytical, &config.analytical),
        }
    }

    pub fn get(&self, style: CommentaryStyle) -> &VoiceProfile {
        match style {
            CommentaryStyle::Excited => &self.excited,
            CommentaryStyle::Neutral => &self.neutral,
            CommentaryStyle::Analytical => &self.analytical,
        }
    }

    /// Apply an update; rate and pitch are clamped, a blank voice name is ignored
    pub fn update(&mut self, style: CommentaryStyle, update: VoiceUpdate) -> &VoiceProfile {
        let profile = match style {
            CommentaryStyle::Excited => &mut self.excited,
            CommentaryStyle::Neutral => &mut self.neutral,
            CommentaryStyle::Analytical => &mut self.analytical,
        };

        if let Some(name) = update.voice_name.filter(|n| !n.trim().is_empty()) {
            profile.voice_name = name;
        }
        if let Some(rate) = update.rate {
            profile.rate = clamp_rate(rate);
        }
        if let Some(pitch) = update.pitch {
            profile.pitch = clamp_pitch(pitch);
        }

        profile
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        1.0
    } else {
        rate.clamp(*RATE_RANGE.start(), *RATE_RANGE.end())
    }
}

fn clamp_pitch(pitch: f64) -> f64 {
    if pitch.is_nan() {
        0.0
    } else {
        pitch.clamp(*PITCH_RANGE.start(), *PITCH_RANGE.end())
    }
}

/// Escape the five XML special characters
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
