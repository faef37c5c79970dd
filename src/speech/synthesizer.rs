//! Speech synthesis: Azure REST backend and per-game speech service

use super::voice::{VoiceProfile, VoiceProfiles, VoiceUpdate};
use crate::commentary::CommentaryStyle;
use crate::config::SpeechConfig;
use crate::error::CollaboratorError;
use crate::metrics::METRICS;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};

pub const OUTPUT_FORMAT: &str = "riff-24khz-16bit-mono-pcm";

/// Bytes per second of 24 kHz 16-bit mono PCM
const PCM_BYTE_RATE: u32 = 24_000 * 2;

/// Text-to-speech backend
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Render an SSML document to WAV bytes
    async fn synthesize_ssml(&self, ssml: &str) -> Result<Bytes, CollaboratorError>;

    /// Voices offered by the service
    async fn list_voices(&self) -> Result<Vec<VoiceInfo>, CollaboratorError>;
}

/// Entry of the service voice list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceInfo {
    #[serde(rename(deserialize = "ShortName"))]
    pub name: String,
    #[serde(rename(deserialize = "Locale"))]
    pub locale: String,
    #[serde(rename(deserialize = "Gender"))]
    pub gender: String,
    #[serde(rename(deserialize = "StyleList"), default)]
    pub styles: Vec<String>,
}

/// Azure Cognitive Services text-to-speech over REST
pub struct AzureSpeechClient {
    http: Client,
    base_url: String,
    subscription_key: SecretString,
}

impl AzureSpeechClient {
    pub fn new(config: &SpeechConfig) -> Result<Self, CollaboratorError> {
        let subscription_key = config
            .subscription_key
            .clone()
            .ok_or(CollaboratorError::Disabled)?;

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("live-commentary/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        let base_url = match &config.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}.tts.speech.microsoft.com",
                config.region.to_lowercase()
            ),
        };

        Ok(Self {
            http,
            base_url,
            subscription_key,
        })
    }

    async fn check(
        endpoint: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CollaboratorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        METRICS.record_call("speech", endpoint, "error");
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(CollaboratorError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SpeechBackend for AzureSpeechClient {
    async fn synthesize_ssml(&self, ssml: &str) -> Result<Bytes, CollaboratorError> {
        let url = format!("{}/cognitiveservices/v1", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", self.subscription_key.expose_secret())
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .body(ssml.to_string())
            .send()
            .await
            .map_err(|e| {
                METRICS.record_call("speech", "synthesize", "error");
                CollaboratorError::from(e)
            })?;

        let audio = Self::check("synthesize", response)
            .await?
            .bytes()
            .await
            .map_err(CollaboratorError::from)?;

        if audio.is_empty() {
            METRICS.record_call("speech", "synthesize", "empty");
            return Err(CollaboratorError::InvalidResponse("empty audio".to_string()));
        }

        METRICS.record_call("speech", "synthesize", "success");
        Ok(audio)
    }

    async fn list_voices(&self) -> Result<Vec<VoiceInfo>, CollaboratorError> {
        let url = format!("{}/cognitiveservices/voices/list", self.base_url);

        let response = self
            .http
            .get(&url)
            .header("Ocp-Apim-Subscription-Key", self.subscription_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                METRICS.record_call("speech", "voices", "error");
                CollaboratorError::from(e)
            })?;

        let voices = Self::check("voices", response)
            .await?
            .json::<Vec<VoiceInfo>>()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;

        METRICS.record_call("speech", "voices", "success");
        Ok(voices)
    }
}

/// Running synthesis counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SynthesisStats {
    /// Attempts, successful or not
    pub total_synthesized: u64,
    pub errors: u64,
    /// Mean clip length in seconds over successful clips
    pub average_duration: f64,
}

impl SynthesisStats {
    pub fn successes(&self) -> u64 {
        self.total_synthesized - self.errors
    }

    fn record_success(&mut self, duration: Duration) {
        self.total_synthesized += 1;
        let n = self.successes() as f64;
        self.average_duration += (duration.as_secs_f64() - self.average_duration) / n;
    }

    fn record_error(&mut self) {
        self.total_synthesized += 1;
        self.errors += 1;
    }
}

/// A clip written to disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedAudio {
    pub path: PathBuf,
    pub duration: Duration,
    pub style: CommentaryStyle,
}

/// Speech synthesis for one narrated game
///
/// Owns its voice profiles and counters; the backend may be shared.
pub struct SpeechService {
    backend: Arc<dyn SpeechBackend>,
    profiles: VoiceProfiles,
    output_dir: PathBuf,
    stats: Mutex<SynthesisStats>,
}

impl SpeechService {
    pub fn new(
        backend: Arc<dyn SpeechBackend>,
        profiles: VoiceProfiles,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            profiles,
            output_dir: output_dir.into(),
            stats: Mutex::new(SynthesisStats::default()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn profile(&self, style: CommentaryStyle) -> &VoiceProfile {
        self.profiles.get(style)
    }

    pub fn stats(&self) -> SynthesisStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update_voice_profile(&mut self, style: CommentaryStyle, update: VoiceUpdate) -> &VoiceProfile {
        let profile = self.profiles.update(style, update);
        info!(
            style = %style,
            voice = %profile.voice_name,
            rate = profile.rate,
            pitch = profile.pitch,
            "Updated voice profile"
        );
        profile
    }

    /// Synthesize text with the style's voice and write it under the output directory
    pub async fn synthesize(
        &self,
        text: &str,
        style: CommentaryStyle,
        game_id: &str,
        sequence: u64,
    ) -> Result<SynthesizedAudio, CollaboratorError> {
        match self.try_synthesize(text, style, game_id, sequence).await {
            Ok(audio) => {
                self.stats
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record_success(audio.duration);
                METRICS
                    .audio_duration
                    .with_label_values(&[style.as_str()])
                    .observe(audio.duration.as_secs_f64());
                info!(
                    path = %audio.path.display(),
                    duration_ms = audio.duration.as_millis() as u64,
                    "Speech synthesis completed"
                );
                Ok(audio)
            }
            Err(e) => {
                self.stats
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record_error();
                error!("Speech synthesis failed: {}", e);
                Err(e)
            }
        }
    }

    async fn try_synthesize(
        &self,
        text: &str,
        style: CommentaryStyle,
        game_id: &str,
        sequence: u64,
    ) -> Result<SynthesizedAudio, CollaboratorError> {
        let ssml = self.profiles.get(style).to_ssml(text);
        let audio = self.backend.synthesize_ssml(&ssml).await?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(format!(
            "commentary_{}_{}.wav",
            sanitize_file_component(game_id),
            sequence
        ));
        tokio::fs::write(&path, &audio).await?;

        Ok(SynthesizedAudio {
            path,
            duration: wav_duration(&audio),
            style,
        })
    }

    /// Available voices; empty when the service cannot be reached
    pub async fn available_voices(&self) -> Vec<VoiceInfo> {
        self.backend.list_voices().await.unwrap_or_else(|e| {
            error!("Error retrieving voices: {}", e);
            Vec::new()
        })
    }

    /// Delete clips older than `max_age`; returns how many were removed
    pub fn cleanup_old_files(&self, max_age: Duration) -> std::io::Result<usize> {
        let dir = self.output_dir.to_string_lossy();
        let pattern = format!("{}/commentary_*.wav", glob::Pattern::escape(&dir));

        let entries = glob::glob(&pattern)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let now = SystemTime::now();
        let mut removed = 0;
        for path in entries.flatten() {
            let modified = std::fs::metadata(&path)?.modified()?;
            let age = now.duration_since(modified).unwrap_or_default();
            if age > max_age {
                std::fs::remove_file(&path)?;
                debug!("Cleaned up old file: {}", path.display());
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Cleaned up old audio files");
        }
        Ok(removed)
    }
}

fn sanitize_file_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Playback length of a WAV buffer
///
/// Reads the `fmt ` byte rate and `data` size when the RIFF header is
/// present, otherwise treats the buffer as raw 24 kHz 16-bit mono PCM.
pub fn wav_duration(audio: &[u8]) -> Duration {
    let (byte_rate, data_len) = parse_riff(audio).unwrap_or((PCM_BYTE_RATE, audio.len() as u32));
    if byte_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(f64::from(data_len) / f64::from(byte_rate))
}

fn parse_riff(audio: &[u8]) -> Option<(u32, u32)> {
    if audio.len() < 12 || &audio[0..4] != b"RIFF" || &audio[8..12] != b"WAVE" {
        return None;
    }

    let mut byte_rate = None;
    let mut offset = 12;
    while offset + 8 <= audio.len() {
        let id = &audio[offset..offset + 4];
        let size = u32::from_le_bytes(audio[offset + 4..offset + 8].try_into().ok()?);
        let body = offset + 8;

        match id {
            b"fmt " if body + 12 <= audio.len() => {
                byte_rate = Some(u32::from_le_bytes(audio[body + 8..body + 12].try_into().ok()?));
            }
            b"data" => {
                // Streamed output may carry a placeholder size
                let available = (audio.len() - body) as u32;
                return Some((byte_rate.unwrap_or(PCM_BYTE_RATE), size.min(available)));
            }
            _ => {}
        }

        // Chunks are padded to even sizes
        offset = body.checked_add(size as usize + (size as usize & 1))?;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Minimal RIFF/WAVE buffer with `data_len` bytes of silence
    fn wav_bytes(data_len: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&24_000u32.to_le_bytes());
        out.extend_from_slice(&PCM_BYTE_RATE.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }

    struct FakeBackend {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpeechBackend for FakeBackend {
        async fn synthesize_ssml(&self, ssml: &str) -> Result<Bytes, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(ssml.contains("<speak"));
            if self.fail {
                Err(CollaboratorError::Timeout("slow".into()))
            } else {
                Ok(Bytes::from(wav_bytes(PCM_BYTE_RATE * 2)))
            }
        }

        async fn list_voices(&self) -> Result<Vec<VoiceInfo>, CollaboratorError> {
            Err(CollaboratorError::Network("offline".into()))
        }
    }

    fn service(dir: &TempDir, fail: bool) -> SpeechService {
        let backend = Arc::new(FakeBackend {
            fail,
            calls: AtomicUsize::new(0),
        });
        SpeechService::new(backend, VoiceProfiles::default(), dir.path().join("audio"))
    }

    #[test]
    fn test_wav_duration_from_header() {
        assert_eq!(wav_duration(&wav_bytes(PCM_BYTE_RATE * 3)), Duration::from_secs(3));
    }

    #[test]
    fn test_wav_duration_raw_pcm() {
        let raw = vec![0u8; (PCM_BYTE_RATE / 2) as usize];
        assert_eq!(wav_duration(&raw), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_synthesize_writes_file() {
        let dir = TempDir::new().unwrap();
        let speech = service(&dir, false);

        let audio = speech
            .synthesize("Hawks score!", CommentaryStyle::Excited, "g/1", 4)
            .await
            .unwrap();

        assert_eq!(audio.path, dir.path().join("audio").join("commentary_g_1_4.wav"));
        assert!(audio.path.exists());
        assert_eq!(audio.duration, Duration::from_secs(2));

        let stats = speech.stats();
        assert_eq!(stats.total_synthesized, 1);
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.average_duration, 2.0);
    }

    #[tokio::test]
    async fn test_failed_synthesis_counts_error() {
        let dir = TempDir::new().unwrap();
        let speech = service(&dir, true);

        let err = speech
            .synthesize("Hawks score!", CommentaryStyle::Neutral, "g-1", 1)
            .await
            .unwrap_err();

        assert!(err.is_transient());
        let stats = speech.stats();
        assert_eq!(stats.total_synthesized, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.average_duration, 0.0);
    }

    #[test]
    fn test_average_ignores_failures() {
        let mut stats = SynthesisStats::default();
        stats.record_success(Duration::from_secs(2));
        stats.record_error();
        stats.record_success(Duration::from_secs(4));

        assert_eq!(stats.total_synthesized, 3);
        assert_eq!(stats.successes(), 2);
        assert_eq!(stats.average_duration, 3.0);
    }

    #[tokio::test]
    async fn test_available_voices_degrades() {
        let dir = TempDir::new().unwrap();
        assert!(service(&dir, false).available_voices().await.is_empty());
    }

    #[test]
    fn test_cleanup_only_touches_old_commentary() {
        let dir = TempDir::new().unwrap();
        let speech = SpeechService::new(
            Arc::new(FakeBackend {
                fail: false,
                calls: AtomicUsize::new(0),
            }),
            VoiceProfiles::default(),
            dir.path(),
        );

        std::fs::write(dir.path().join("commentary_g_1.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.wav"), b"x").unwrap();

        assert_eq!(speech.cleanup_old_files(Duration::from_secs(3600)).unwrap(), 0);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(speech.cleanup_old_files(Duration::from_millis(1)).unwrap(), 1);
        assert!(!dir.path().join("commentary_g_1.wav").exists());
        assert!(dir.path().join("notes.wav").exists());
    }

    #[tokio::test]
    async fn test_azure_client_posts_ssml() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/cognitiveservices/v1")
            .match_header("ocp-apim-subscription-key", "s".repeat(32).as_str())
            .match_header("x-microsoft-outputformat", OUTPUT_FORMAT)
            .match_header("content-type", "application/ssml+xml")
            .with_status(200)
            .with_body(wav_bytes(100))
            .create_async()
            .await;

        let config = SpeechConfig {
            subscription_key: Some(SecretString::new("s".repeat(32))),
            endpoint: Some(server.url()),
            ..SpeechConfig::default()
        };
        let client = AzureSpeechClient::new(&config).unwrap();
        let ssml = VoiceProfiles::default()
            .get(CommentaryStyle::Neutral)
            .to_ssml("hello");

        let audio = client.synthesize_ssml(&ssml).await.unwrap();
        mock.assert_async().await;
        assert_eq!(audio.len(), 144);
    }

    #[tokio::test]
    async fn test_azure_voice_list() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/cognitiveservices/voices/list")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"ShortName": "en-US-GuyNeural", "Locale": "en-US", "Gender": "Male", "StyleList": ["newscast"]},
                    {"ShortName": "en-GB-RyanNeural", "Locale": "en-GB", "Gender": "Male"}]"#,
            )
            .create_async()
            .await;

        let config = SpeechConfig {
            subscription_key: Some(SecretString::new("s".repeat(32))),
            endpoint: Some(server.url()),
            ..SpeechConfig::default()
        };
        let voices = AzureSpeechClient::new(&config).unwrap().list_voices().await.unwrap();

        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].styles, vec!["newscast".to_string()]);
        assert!(voices[1].styles.is_empty());
    }

    #[test]
    fn test_client_requires_key() {
        assert!(matches!(
            AzureSpeechClient::new(&SpeechConfig::default()),
            Err(CollaboratorError::Disabled)
        ));
    }
}
