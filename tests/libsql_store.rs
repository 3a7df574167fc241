//! libSQL state store against a real database file.

use std::sync::Arc;

use site_wizard::bot::SiteBot;
use site_wizard::cards::AdaptiveCardRenderer;
use site_wizard::channels::IncomingMessage;
use site_wizard::config::WizardConfig;
use site_wizard::dialog::{DialogId, DialogStack, FlowFrame, FrameOptions, SiteRequest, TurnPayload};
use site_wizard::services::{AuthToken, InMemoryDirectory, RecordingProvisioner, StaticAuthProvider};
use site_wizard::store::{LibSqlStore, StateStore, UserState};

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("wizard.db");

    let mut stack = DialogStack::new();
    stack.push(FlowFrame::new(
        DialogId::Site,
        FrameOptions::Site(SiteRequest {
            title: Some("Engineering Hub".into()),
            ..Default::default()
        }),
    ));
    let user = UserState {
        requests_submitted: 3,
        last_submitted_at: Some(chrono::Utc::now()),
    };

    {
        let store = LibSqlStore::new_local(&path).await.unwrap();
        store.save_stack("c1", &stack).await.unwrap();
        store.save_user_state("u1", &user).await.unwrap();
    }

    let store = LibSqlStore::new_local(&path).await.unwrap();
    assert_eq!(store.load_stack("c1").await.unwrap(), Some(stack));
    assert_eq!(store.load_user_state("u1").await.unwrap(), user);
}

/// A conversation started in one process carries on in the next.
#[tokio::test]
async fn conversation_resumes_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wizard.db");

    let bot_at = |store: Arc<LibSqlStore>| {
        SiteBot::new(
            WizardConfig::default(),
            Arc::new(StaticAuthProvider::signed_in(AuthToken::new("t"))),
            Arc::new(InMemoryDirectory::new()),
            store,
            Arc::new(RecordingProvisioner::new()),
            Arc::new(AdaptiveCardRenderer::new()),
        )
    };
    let say = |text: &str| IncomingMessage::text("test", "c1", "u1", text);

    {
        let bot = bot_at(Arc::new(LibSqlStore::new_local(&path).await.unwrap()));
        bot.on_turn(&say("hi")).await;
        bot.on_turn(&say("TeamSite")).await;
    }

    let bot = bot_at(Arc::new(LibSqlStore::new_local(&path).await.unwrap()));
    let out = bot.on_turn(&say("Engineering Hub")).await;
    assert_eq!(
        out[0].plain_text(),
        "Provide a description for your TeamSite site"
    );
}

/// A sign-in token is used for the turn but never lands in the database.
#[tokio::test]
async fn sign_in_token_is_not_written_to_disk() {
    let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
    let bot = SiteBot::new(
        WizardConfig::default(),
        Arc::new(StaticAuthProvider::signed_out()),
        Arc::new(InMemoryDirectory::new().with_user("Adele Vance", "adele@contoso.com")),
        store.clone(),
        Arc::new(RecordingProvisioner::new()),
        Arc::new(AdaptiveCardRenderer::new()),
    );
    for text in ["hi", "TeamSite", "Engineering Hub", "All things engineering"] {
        bot.on_turn(&IncomingMessage::text("test", "c1", "u1", text)).await;
    }

    let token = IncomingMessage::new("test", "c1", "u1", TurnPayload::token("SECRET-BEARER-XYZ"));
    let out = bot.on_turn(&token).await;
    assert_eq!(out[0].plain_text(), "Who will own your TeamSite site?");

    let raw = store.raw_stack("c1").await.unwrap().unwrap();
    assert!(raw.contains("owner_resolver"));
    assert!(!raw.contains("SECRET-BEARER-XYZ"));

    // The next answer still validates against the directory.
    let out = bot.on_turn(&IncomingMessage::text("test", "c1", "u1", "Adele")).await;
    assert_eq!(out[0].plain_text(), "Provide an alias for your TeamSite site");
}
