//! Azure Speech over its REST endpoints.

use super::device::AudioDevice;
use crate::audio_utils::{self, RECOGNITION_SAMPLE_RATE, SYNTHESIS_SAMPLE_RATE};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument};
use vox_core::{
    Credentials,
    speech::{RecognitionStatus, SpeechCapability, SynthesisStatus},
};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";
const OUTPUT_FORMAT: &str = "raw-16khz-16bit-mono-pcm";
const WAV_CONTENT_TYPE: &str = "audio/wav; codecs=audio/pcm; samplerate=16000";

pub fn recognition_url(region: &str) -> String {
    format!(
        "https://{region}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1"
    )
}

pub fn synthesis_url(region: &str) -> String {
    format!("https://{region}.tts.speech.microsoft.com/cognitiveservices/v1")
}

/// Escapes the five XML special characters.
pub fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Builds the SSML document that speaks `text` with `voice_name`.
pub fn ssml(text: &str, voice_name: &str, language: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='{}'><voice name='{}'>{}</voice></speak>",
        xml_escape(language),
        xml_escape(voice_name),
        xml_escape(text)
    )
}

/// Body of a `format=simple` recognition response.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct RecognitionResponse {
    pub recognition_status: String,
    #[serde(default)]
    pub display_text: String,
}

impl RecognitionResponse {
    pub fn into_status(self) -> RecognitionStatus {
        if self.recognition_status == "Success" && !self.display_text.trim().is_empty() {
            RecognitionStatus::Recognized(self.display_text)
        } else {
            RecognitionStatus::NoMatch(self.recognition_status)
        }
    }
}

/// Records from the local microphone and plays through the local speakers,
/// using Azure for the speech work in between.
pub struct AzureSpeech {
    client: reqwest::Client,
    device: Arc<dyn AudioDevice>,
    language: String,
    record_duration: Duration,
}

impl AzureSpeech {
    pub fn new(
        device: Arc<dyn AudioDevice>,
        language: impl Into<String>,
        record_duration: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            device,
            language: language.into(),
            record_duration,
        }
    }

    async fn capture_wav(&self) -> anyhow::Result<Vec<u8>> {
        let device = self.device.clone();
        let duration = self.record_duration;
        let captured = tokio::task::spawn_blocking(move || device.capture(duration))
            .await
            .context("Audio capture task failed")??;
        debug!(
            samples = captured.samples.len(),
            sample_rate = captured.sample_rate,
            "Audio captured"
        );

        let mono = audio_utils::resample(
            &captured.samples,
            captured.sample_rate,
            RECOGNITION_SAMPLE_RATE,
        )?;
        audio_utils::encode_wav(&mono, RECOGNITION_SAMPLE_RATE)
    }
}

#[async_trait]
impl SpeechCapability for AzureSpeech {
    #[instrument(skip_all, fields(region = %credentials.region))]
    async fn recognize_once(&self, credentials: &Credentials) -> anyhow::Result<RecognitionStatus> {
        let wav = self.capture_wav().await?;

        let response = self
            .client
            .post(recognition_url(&credentials.region))
            .query(&[("language", self.language.as_str()), ("format", "simple")])
            .header(SUBSCRIPTION_KEY_HEADER, &credentials.key)
            .header(CONTENT_TYPE, WAV_CONTENT_TYPE)
            .header(ACCEPT, "application/json")
            .body(wav)
            .send()
            .await
            .context("Recognition request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Recognition request rejected with {status}: {body}");
        }

        let body: RecognitionResponse = response
            .json()
            .await
            .context("Failed to decode recognition response")?;
        debug!(status = %body.recognition_status, "Recognition response received");
        Ok(body.into_status())
    }

    #[instrument(skip_all, fields(region = %credentials.region, voice = %voice_name))]
    async fn synthesize(
        &self,
        credentials: &Credentials,
        text: &str,
        voice_name: &str,
    ) -> anyhow::Result<SynthesisStatus> {
        let response = self
            .client
            .post(synthesis_url(&credentials.region))
            .header(SUBSCRIPTION_KEY_HEADER, &credentials.key)
            .header(CONTENT_TYPE, "application/ssml+xml")
            .header(OUTPUT_FORMAT_HEADER, OUTPUT_FORMAT)
            .header(USER_AGENT, env!("CARGO_PKG_NAME"))
            .body(ssml(text, voice_name, &self.language))
            .send()
            .await
            .context("Synthesis request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(SynthesisStatus::Canceled(format!("{status}: {body}")));
        }

        let pcm = response
            .bytes()
            .await
            .context("Failed to read synthesized audio")?;
        let samples = audio_utils::convert_i16_to_f32(&audio_utils::decode_pcm16_le(&pcm));
        debug!(samples = samples.len(), "Playing synthesized audio");

        let device = self.device.clone();
        tokio::task::spawn_blocking(move || device.play(&samples, SYNTHESIS_SAMPLE_RATE))
            .await
            .context("Audio playback task failed")??;
        Ok(SynthesisStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::device::NoAudio;

    #[test]
    fn test_endpoints() {
        assert_eq!(
            recognition_url("japaneast"),
            "https://japaneast.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1"
        );
        assert_eq!(
            synthesis_url("westeurope"),
            "https://westeurope.tts.speech.microsoft.com/cognitiveservices/v1"
        );
    }

    #[test]
    fn test_ssml_escapes_text_and_voice() {
        let doc = ssml("Tom & Jerry say <hi> 'yo'", "en-GB-RyanNeural", "en-US");
        assert_eq!(
            doc,
            "<speak version='1.0' xml:lang='en-US'><voice name='en-GB-RyanNeural'>\
             Tom &amp; Jerry say &lt;hi&gt; &apos;yo&apos;</voice></speak>"
        );
        assert_eq!(xml_escape(r#"a"b"#), "a&quot;b");
    }

    #[test]
    fn test_recognition_response_status() {
        let ok: RecognitionResponse = serde_json::from_str(
            r#"{"RecognitionStatus":"Success","DisplayText":"What time is it?","Offset":0,"Duration":1}"#,
        )
        .unwrap();
        assert_eq!(
            ok.into_status(),
            RecognitionStatus::Recognized("What time is it?".into())
        );

        let silent: RecognitionResponse =
            serde_json::from_str(r#"{"RecognitionStatus":"InitialSilenceTimeout"}"#).unwrap();
        assert_eq!(
            silent.into_status(),
            RecognitionStatus::NoMatch("InitialSilenceTimeout".into())
        );

        let empty: RecognitionResponse =
            serde_json::from_str(r#"{"RecognitionStatus":"Success","DisplayText":""}"#).unwrap();
        assert_eq!(empty.into_status(), RecognitionStatus::NoMatch("Success".into()));
    }

    #[tokio::test]
    async fn test_recognize_without_audio_device_fails_before_network() {
        let speech = AzureSpeech::new(Arc::new(NoAudio), "en-US", Duration::from_secs(1));
        let err = speech
            .recognize_once(&Credentials::new("k", "nowhere"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No audio input device"));
    }
}
