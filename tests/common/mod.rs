//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use facekit::events::FixedClock;
use facekit::{Engine, EngineConfig, SessionId};

/// Per-environment HMAC key used by every suite.
pub const KEY: &[u8] = b"facekit-test-signing-key";

/// Sealed demo artifact (the balanced fixture).
pub fn sealed_demo() -> serde_json::Value {
    let mut artifact = facekit::authoring::demo_bank();
    facekit::authoring::seal(&mut artifact, KEY, "test-signer").unwrap();
    artifact
}

/// A variant of the demo bank where every option B is Broken, so an all-B
/// run gives BROKEN ≥ CLEAN on every face.
pub fn broken_heavy_artifact() -> serde_json::Value {
    let mut artifact = facekit::authoring::demo_bank();
    let questions = artifact["questions"].as_object_mut().unwrap();
    for (_family, authored) in questions.iter_mut() {
        for question in authored.as_array_mut().unwrap() {
            question["options"][1]["line_cof"] = "F".into();
        }
    }
    facekit::authoring::seal(&mut artifact, KEY, "test-signer").unwrap();
    artifact
}

/// Engine with a frozen clock (events get stable timestamps).
pub fn engine() -> Engine {
    Engine::new(EngineConfig::new(KEY)).with_clock(Arc::new(FixedClock(1_700_000_000_000)))
}

/// Register `artifact` and return its hash.
pub fn register(engine: &Engine, artifact: &serde_json::Value) -> String {
    engine
        .register_bank_value(artifact)
        .unwrap()
        .hash()
        .to_string()
}

/// Answer every remaining question with `key`; returns the served views.
pub fn answer_all(
    engine: &Engine,
    session_id: &SessionId,
    key: &str,
) -> Vec<facekit::QuestionView> {
    let mut views = Vec::new();
    loop {
        match engine.next_question(session_id) {
            Ok(view) => {
                engine.submit_answer(session_id, &view.qid, key).unwrap();
                views.push(view);
            }
            Err(e) => {
                assert_eq!(e.code(), "E_QUIZ_COMPLETE");
                return views;
            }
        }
    }
}
