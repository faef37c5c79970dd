//! Speech synthesis of commentary

pub mod synthesizer;
pub mod voice;

pub use synthesizer::{
    wav_duration, AzureSpeechClient, SpeechBackend, SpeechService, SynthesisStats,
    SynthesizedAudio, VoiceInfo,
};
pub use voice::{VoiceProfile, VoiceProfiles, VoiceUpdate};
