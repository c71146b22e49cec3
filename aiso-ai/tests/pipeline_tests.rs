//! Import and batch pipeline tests against real WAV files

mod helpers;

use aiso_ai::config::ServiceSettings;
use aiso_ai::db::{MemorySampleStore, SampleStore};
use aiso_ai::models::{BatchItem, BatchOptions, BatchProgress, ProviderKind, SampleUpdate};
use aiso_ai::services::{AiService, PipelineError, ProviderSet};
use helpers::audio_generator::{corrupt_wav_in, wav_in};
use helpers::backends::{FailingBackend, ScriptedBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn service(providers: ProviderSet) -> AiService {
    AiService::new(Arc::new(MemorySampleStore::new()), ServiceSettings::default())
        .with_providers(providers)
}

#[tokio::test]
async fn without_providers_the_filename_fallback_is_stored() {
    let dir = TempDir::new().unwrap();
    let path = wav_in(dir.path(), "deep_kick_01.wav");
    let ai = service(ProviderSet::empty());

    let sample = ai.process_audio_file(&path).await.unwrap();

    assert_eq!(sample.name, "deep_kick_01.wav");
    assert_eq!(sample.category.as_deref(), Some("kick"));
    assert_eq!(sample.confidence, Some(0.3));
    assert_eq!(sample.tags, vec!["kick"]);
    assert_eq!(sample.sample_rate, Some(44100));
    assert_eq!(sample.channels, Some(2));
    assert_eq!(sample.analysis["sources"][0], "fallback");
    assert!(sample.analysis["processed_at"].is_string());
}

#[tokio::test]
async fn provider_answer_is_stored_with_heuristics() {
    let dir = TempDir::new().unwrap();
    let path = wav_in(dir.path(), "sub_808_140bpm_F#m.wav");
    let anthropic = Arc::new(ScriptedBackend::new(ProviderKind::Anthropic));
    let ai = service(ProviderSet::empty().with(anthropic.clone()));

    let sample = ai.process_audio_file(&path).await.unwrap();

    assert_eq!(anthropic.calls(), 2);
    assert_eq!(sample.category.as_deref(), Some("bass"));
    assert_eq!(sample.subcategory.as_deref(), Some("808"));
    assert_eq!(sample.confidence, Some(0.9));
    assert_eq!(sample.tags, vec!["808", "sub"]);
    assert_eq!(sample.mood.as_deref(), Some("dark"));
    assert_eq!(sample.characteristics, vec!["boomy"]);
    assert_eq!(sample.bpm, Some(140.0));
    assert_eq!(sample.analysis["heuristics"]["bpm"], 140);
    assert_eq!(sample.analysis["use_case"], "drops");

    let stored = ai.store().get_sample(sample.id).await.unwrap().unwrap();
    assert_eq!(stored, sample);
}

#[tokio::test]
async fn failing_providers_fall_back_without_error() {
    let dir = TempDir::new().unwrap();
    let path = wav_in(dir.path(), "airy_pad.wav");
    let providers = ProviderSet::empty()
        .with(Arc::new(FailingBackend(ProviderKind::Anthropic)))
        .with(Arc::new(FailingBackend(ProviderKind::OpenAi)));
    let ai = service(providers);

    let sample = ai.process_audio_file(&path).await.unwrap();

    assert_eq!(sample.category.as_deref(), Some("pad"));
    assert_eq!(sample.confidence, Some(0.3));
    let outcomes = sample.analysis["providers"].as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o["outcome"] == "failure" && o["kind"] == "timeout"));
}

#[tokio::test]
async fn reimport_keeps_identity() {
    let dir = TempDir::new().unwrap();
    let path = wav_in(dir.path(), "snare_tight.wav");
    let ai = service(ProviderSet::empty());

    let first = ai.process_audio_file(&path).await.unwrap();
    ai.store().record_play(first.id).await.unwrap();
    let second = ai.process_audio_file(&path).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.play_count, 1);
    assert_eq!(ai.store().list_samples().await.unwrap().len(), 1);
}

#[tokio::test]
async fn import_stores_minimal_record_for_unparseable_audio() {
    let dir = TempDir::new().unwrap();
    let good = wav_in(dir.path(), "hat_open.wav");
    let corrupt = corrupt_wav_in(dir.path(), "broken.wav");
    let missing = dir.path().join("missing.wav");
    let text = dir.path().join("notes.txt");
    std::fs::write(&text, "hello").unwrap();
    let ai = service(ProviderSet::empty());

    let items = ai
        .import_files(&[good, corrupt, missing.clone(), text])
        .await;

    assert_eq!(items.len(), 4);
    assert!(!items[0].is_failed());

    match &items[1] {
        BatchItem::Processed(sample) => {
            assert_eq!(sample.name, "broken.wav");
            assert_eq!(sample.category.as_deref(), Some("unknown"));
            assert_eq!(sample.mood.as_deref(), Some("neutral"));
            assert!(sample.size.unwrap() > 0);
        }
        other => panic!("expected minimal record, got {:?}", other),
    }

    assert!(items[2].is_failed());
    assert_eq!(items[2].path(), missing.to_string_lossy());
    assert!(items[3].is_failed());
    assert_eq!(ai.store().list_samples().await.unwrap().len(), 2);
}

#[tokio::test]
async fn all_failing_batch_reports_every_file() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = (0..3).map(|i| dir.path().join(format!("gone_{}.wav", i))).collect();
    let ai = service(ProviderSet::empty());

    let mut reports: Vec<BatchProgress> = Vec::new();
    let report = ai
        .run_batch(&paths, BatchOptions::default(), &CancellationToken::new(), |p| {
            reports.push(p)
        })
        .await
        .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.failed_count(), 3);
    assert!(!report.cancelled);

    let currents: Vec<usize> = reports.iter().map(|p| p.current).collect();
    assert_eq!(currents, vec![1, 2, 3]);
    assert_eq!(reports.last().unwrap().percentage, 100);
    for (progress, path) in reports.iter().zip(&paths) {
        assert_eq!(progress.current_file, path.to_string_lossy());
        assert_eq!(progress.result.path(), path.to_string_lossy());
        assert!(progress.result.error().is_some());
    }
    assert!(!ai.status().processing);
}

#[tokio::test]
async fn batch_mixes_successes_and_failures_in_order() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        wav_in(dir.path(), "kick_a.wav"),
        dir.path().join("missing.wav"),
        wav_in(dir.path(), "vocal_chop.wav"),
    ];
    let ai = service(ProviderSet::empty());

    let report = ai
        .run_batch(&paths, BatchOptions::default(), &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    let failed: Vec<bool> = report.results.iter().map(|i| i.is_failed()).collect();
    assert_eq!(failed, vec![false, true, false]);
    assert_eq!(ai.store().list_samples().await.unwrap().len(), 2);
}

#[tokio::test]
async fn cancellation_stops_between_files() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = ["a_kick.wav", "b_kick.wav", "c_kick.wav"]
        .iter()
        .map(|name| wav_in(dir.path(), name))
        .collect();
    let ai = service(ProviderSet::empty());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let report = ai
        .run_batch(&paths, BatchOptions::default(), &cancel, |p| {
            if p.current == 1 {
                trigger.cancel();
            }
        })
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.total, 3);
    assert_eq!(ai.store().list_samples().await.unwrap().len(), 1);
}

#[tokio::test]
async fn require_ai_without_providers_fails_up_front() {
    let dir = TempDir::new().unwrap();
    let paths = vec![wav_in(dir.path(), "kick.wav")];
    let ai = service(ProviderSet::empty());
    let mut called = false;

    let result = ai
        .run_batch(
            &paths,
            BatchOptions { require_ai: true },
            &CancellationToken::new(),
            |_| called = true,
        )
        .await;

    assert!(matches!(result, Err(PipelineError::AiUnavailable)));
    assert!(!called);
    assert!(ai.store().list_samples().await.unwrap().is_empty());
}

#[tokio::test]
async fn ai_search_prefers_provider_and_falls_back_to_text() {
    let dir = TempDir::new().unwrap();
    let ai = service(ProviderSet::empty());
    for name in ["kick_hard.wav", "pad_soft.wav", "bass_low.wav"] {
        ai.process_audio_file(&wav_in(dir.path(), name)).await.unwrap();
    }
    let samples = ai.store().list_samples().await.unwrap();

    let text = ai.search_samples("pad", samples.clone()).await;
    assert_eq!(text.len(), 1);
    assert_eq!(text[0].name, "pad_soft.wav");

    let pad_index = samples.iter().position(|s| s.name == "pad_soft.wav").unwrap();
    let bass_index = samples.iter().position(|s| s.name == "bass_low.wav").unwrap();
    let openai = ScriptedBackend::new(ProviderKind::OpenAi)
        .with_search(&format!(r#"{{"matches": [{}, {}, 99]}}"#, bass_index, pad_index));
    ai.set_providers(ProviderSet::empty().with(Arc::new(openai)));

    let ranked: Vec<String> = ai
        .search_samples("something warm", samples)
        .await
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(ranked, vec!["bass_low.wav", "pad_soft.wav"]);
}

#[tokio::test]
async fn describe_stores_generated_text() {
    let dir = TempDir::new().unwrap();
    let ai = service(ProviderSet::empty());
    let sample = ai
        .process_audio_file(&wav_in(dir.path(), "bass_808.wav"))
        .await
        .unwrap();

    assert!(matches!(
        ai.describe_sample(sample.id).await,
        Err(PipelineError::AiUnavailable)
    ));

    ai.set_providers(
        ProviderSet::empty().with(Arc::new(ScriptedBackend::new(ProviderKind::Anthropic))),
    );
    let described = ai.describe_sample(sample.id).await.unwrap();
    assert_eq!(described.description.as_deref(), Some("A deep 808 with a long tail."));
    assert!(matches!(
        ai.describe_sample(uuid::Uuid::new_v4()).await,
        Err(PipelineError::NotFound(_))
    ));
}

#[tokio::test]
async fn failed_describe_keeps_existing_description() {
    let dir = TempDir::new().unwrap();
    let ai = service(ProviderSet::empty());
    let sample = ai
        .process_audio_file(&wav_in(dir.path(), "lead_pluck.wav"))
        .await
        .unwrap();
    ai.store()
        .update_sample(
            sample.id,
            SampleUpdate {
                description: Some("hand-written notes".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    ai.set_providers(
        ProviderSet::empty().with(Arc::new(FailingBackend(ProviderKind::Anthropic))),
    );
    let result = ai.describe_sample(sample.id).await;

    assert!(matches!(result, Err(PipelineError::Provider(_))));
    let stored = ai.store().get_sample(sample.id).await.unwrap().unwrap();
    assert_eq!(stored.description.as_deref(), Some("hand-written notes"));
}
