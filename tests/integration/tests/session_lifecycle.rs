//! Multi-turn conversation and session lifecycle scenarios.

use shopchat_core::{EngineConfig, Role, SessionId};
use shopchat_engine::{Orchestrator, TurnParameters};
use shopchat_index::{CatalogRecord, FileVectorIndex, MemoryVectorIndex, VectorIndex};
use shopchat_integration_tests::{init_tracing, ScriptedChat, TableEmbeddings};
use shopchat_session::{FileSessionStore, SessionStore};
use std::sync::Arc;
use std::time::Duration;

fn file_engine(
    dir: &std::path::Path,
    chat: Arc<ScriptedChat>,
) -> (Orchestrator, Arc<FileSessionStore>) {
    init_tracing();
    let index = Arc::new(FileVectorIndex::new(dir.join("catalog.json"), 2).unwrap());
    let sessions = Arc::new(FileSessionStore::new(dir.join("sessions")).unwrap());
    let engine = Orchestrator::new(
        EngineConfig::default(),
        Arc::new(TableEmbeddings::new(2, vec![1.0, 0.0])),
        chat,
        index,
        sessions.clone(),
    );
    (engine, sessions)
}

#[tokio::test]
async fn second_turn_sees_first_turn_as_history() {
    // Scenario C: the generation call for turn 2 receives turn 1's
    // user/assistant pair as history.
    let dir = tempfile::tempdir().unwrap();
    let chat = Arc::new(ScriptedChat::new("Your name is Alex."));
    let (engine, _) = file_engine(dir.path(), chat.clone());

    let reply = engine
        .handle_turn(None, "My name is Alex", TurnParameters::default())
        .await
        .unwrap();
    let session_id = reply.session_id.clone();

    engine
        .handle_turn(
            Some(session_id),
            "What is my name?",
            TurnParameters::default(),
        )
        .await
        .unwrap();

    let answers = chat.answer_requests().await;
    assert_eq!(answers.len(), 2);

    // Second answer request: two history messages plus the new question.
    let second = &answers[1];
    assert_eq!(second.messages.len(), 3);
    assert_eq!(second.messages[0].role, Role::User);
    assert_eq!(second.messages[0].content, "My name is Alex");
    assert_eq!(second.messages[1].role, Role::Assistant);
    assert_eq!(second.messages[2].content, "What is my name?");
}

#[tokio::test]
async fn follow_up_is_reformulated_before_retrieval() {
    // The embedding provider must see the standalone rewrite, not the bare
    // follow-up.
    init_tracing();
    let index = Arc::new(MemoryVectorIndex::new(2));
    index
        .insert(
            CatalogRecord::new(1, "Widget", "widget details").with_embedding(vec![1.0, 0.0]),
        )
        .await
        .unwrap();

    let embeddings = Arc::new(
        TableEmbeddings::new(2, vec![0.0, 1.0])
            .with_text("tell me more about the Widget", vec![1.0, 0.0]),
    );
    let chat = Arc::new(ScriptedChat::new("More about that.").with_condensed(
        "tell me more about the Widget",
    ));
    let sessions = Arc::new(shopchat_session::MemorySessionStore::new());
    let engine = Orchestrator::new(
        EngineConfig::default(),
        embeddings.clone(),
        chat,
        index,
        sessions,
    );

    let id = SessionId::new("follow-up");
    engine
        .handle_turn(Some(id.clone()), "Show me widgets", TurnParameters::default())
        .await
        .unwrap();
    let reply = engine
        .handle_turn(Some(id), "tell me more", TurnParameters::default())
        .await
        .unwrap();

    // The rewrite resolved the referent, so retrieval found the record.
    assert_eq!(reply.sources.len(), 1);
    let calls = embeddings.calls.lock().await;
    assert!(calls.contains(&"tell me more about the Widget".to_string()));
    assert!(!calls.contains(&"tell me more".to_string()));
}

#[tokio::test]
async fn history_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let session_id;

    {
        let chat = Arc::new(ScriptedChat::new("first answer"));
        let (engine, _) = file_engine(dir.path(), chat);
        let reply = engine
            .handle_turn(None, "remember this", TurnParameters::default())
            .await
            .unwrap();
        session_id = reply.session_id;
    }

    // Fresh engine over the same directories.
    let chat = Arc::new(ScriptedChat::new("second answer"));
    let (engine, sessions) = file_engine(dir.path(), chat.clone());
    engine
        .handle_turn(
            Some(session_id.clone()),
            "did you remember?",
            TurnParameters::default(),
        )
        .await
        .unwrap();

    let session = sessions.load(&session_id).await.unwrap();
    assert_eq!(session.message_count(), 4);
    assert_eq!(session.messages[0].content, "remember this");

    // The restarted engine saw the persisted turn as history.
    let answers = chat.answer_requests().await;
    assert_eq!(answers[0].messages.len(), 3);
}

#[tokio::test]
async fn reset_empties_history_but_keeps_the_session_usable() {
    let dir = tempfile::tempdir().unwrap();
    let chat = Arc::new(ScriptedChat::new("answer"));
    let (engine, sessions) = file_engine(dir.path(), chat);

    let id = SessionId::new("resettable");
    engine
        .handle_turn(Some(id.clone()), "hello", TurnParameters::default())
        .await
        .unwrap();
    assert_eq!(sessions.load(&id).await.unwrap().message_count(), 2);

    engine.reset_session(&id).await.unwrap();
    assert!(sessions.load(&id).await.unwrap().is_empty());

    engine
        .handle_turn(Some(id.clone()), "hello again", TurnParameters::default())
        .await
        .unwrap();
    let session = sessions.load(&id).await.unwrap();
    assert_eq!(session.message_count(), 2);
    assert_eq!(session.messages[0].content, "hello again");
}

#[tokio::test]
async fn sweep_removes_only_expired_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let chat = Arc::new(ScriptedChat::new("answer"));
    let (engine, sessions) = file_engine(dir.path(), chat);

    engine
        .handle_turn(
            Some(SessionId::new("stale")),
            "old turn",
            TurnParameters::default(),
        )
        .await
        .unwrap();
    engine
        .handle_turn(
            Some(SessionId::new("live")),
            "new turn",
            TurnParameters::default(),
        )
        .await
        .unwrap();

    // Backdate "stale" beyond the TTL.
    let path = dir.path().join("sessions").join("stale.json");
    let mut session: shopchat_session::Session =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    session.updated_at =
        chrono_now_minus(Duration::from_secs(EngineConfig::default().session_ttl_secs + 60));
    std::fs::write(&path, serde_json::to_string(&session).unwrap()).unwrap();

    assert_eq!(engine.sweep_sessions().await.unwrap(), 1);
    assert!(sessions.load(&SessionId::new("stale")).await.unwrap().is_empty());
    assert_eq!(
        sessions.load(&SessionId::new("live")).await.unwrap().message_count(),
        2
    );
}

fn chrono_now_minus(age: Duration) -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now() - chrono::Duration::from_std(age).unwrap()
}

#[tokio::test]
async fn concurrent_sessions_do_not_block_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let chat = Arc::new(ScriptedChat::new("answer"));
    let (engine, sessions) = file_engine(dir.path(), chat);
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for i in 0..10 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .handle_turn(
                    Some(SessionId::new(format!("parallel-{i}"))),
                    "hello",
                    TurnParameters::default(),
                )
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for i in 0..10 {
        let session = sessions
            .load(&SessionId::new(format!("parallel-{i}")))
            .await
            .unwrap();
        assert_eq!(session.message_count(), 2);
    }
}

#[tokio::test]
async fn health_check_reflects_collaborator_reachability() {
    let dir = tempfile::tempdir().unwrap();
    let chat = Arc::new(ScriptedChat::new("answer"));
    let (engine, _) = file_engine(dir.path(), chat);

    let health = engine.health_check().await;
    assert!(health.ready);

    std::fs::remove_dir_all(dir.path().join("sessions")).unwrap();
    let health = engine.health_check().await;
    assert!(!health.store_ok);
    assert!(!health.ready);
}
