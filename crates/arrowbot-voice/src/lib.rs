//! Arrowbot Voice crate - speech-to-text and text-to-speech.
//!
//! Both directions sit behind async traits so the [`AudioTranscoder`] can run
//! with either, both, or neither backend. A missing backend is reported as an
//! absent result, never as an error to the caller.

pub mod stt;
pub mod transcoder;
pub mod tts;
pub mod wav;

pub use stt::{SpeechToText, WhisperConfig, WhisperTranscriber};
pub use transcoder::{AudioInfo, AudioTranscoder};
pub use tts::{default_voice_names, ElevenLabsClient, TextToSpeech, DEFAULT_VOICES};
pub use wav::{decode_wav, resample, PcmAudio};
