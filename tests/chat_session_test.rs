//! Integration tests for a chat session talking to a mocked Gemini API

mod test_utils;

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use mockito::Matcher;
    use serde_json::json;

    use gemchat::chat::{ChatState, SendError, SendRejected};
    use gemchat::gemini::GeminiError;
    use gemchat::storage::load_chat_history;

    use crate::test_utils::{TEST_API_KEY, drain, reply_body, test_session};

    fn generate_path(model: &str) -> String {
        format!("/v1beta/models/{}:generateContent", model)
    }

    #[tokio::test]
    async fn it_sends_a_message_and_stores_the_reply() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", generate_path("gemini-1.5-flash").as_str())
            .match_query(Matcher::UrlEncoded("key".into(), TEST_API_KEY.into()))
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"parts": [{"text": "What is Rust?"}]}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply_body("A programming language."))
            .create_async()
            .await;

        let (mut session, _rx, store) = test_session(&server.url(), Some(TEST_API_KEY)).await;
        let reply = session.submit("What is Rust?").await?;

        mock.assert_async().await;
        assert_eq!(reply.text(), "A programming language.");
        assert_eq!(reply.model(), Some("gemini-1.5-flash"));
        assert!(!reply.is_user());
        assert_eq!(session.state(), ChatState::Idle);

        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_user());
        assert_eq!(messages[0].text(), "What is Rust?");
        let ids: Vec<i64> = messages.iter().map(|m| m.id().parse().unwrap()).collect();
        assert!(ids[0] < ids[1]);

        let persisted = load_chat_history(&store).await;
        assert_eq!(&persisted, session.transcript());
        Ok(())
    }

    #[tokio::test]
    async fn it_only_sends_the_latest_message() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", generate_path("gemini-1.5-flash").as_str())
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"parts": [{"text": "one"}]}]
            })))
            .with_status(200)
            .with_body(reply_body("first reply"))
            .create_async()
            .await;
        let second = server
            .mock("POST", generate_path("gemini-1.5-flash").as_str())
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(json!({
                "contents": [{"parts": [{"text": "two"}]}],
                "generationConfig": {
                    "temperature": 0.7,
                    "topK": 40,
                    "topP": 0.95,
                    "maxOutputTokens": 2048
                },
                "safetySettings": [
                    {"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE"},
                    {"category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_MEDIUM_AND_ABOVE"},
                    {"category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_MEDIUM_AND_ABOVE"},
                    {"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE"}
                ]
            })))
            .with_status(200)
            .with_body(reply_body("second reply"))
            .create_async()
            .await;

        let (mut session, _rx, _store) = test_session(&server.url(), Some(TEST_API_KEY)).await;
        session.submit("one").await?;
        session.submit("two").await?;

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(session.transcript().len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn it_keeps_the_user_message_when_rate_limited() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", generate_path("gemini-1.5-flash").as_str())
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}}"#)
            .create_async()
            .await;

        let (mut session, mut rx, store) = test_session(&server.url(), Some(TEST_API_KEY)).await;
        let result = session.submit("hello").await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(SendError::Failed(GeminiError::Status(429)))
        ));
        assert_eq!(session.state(), ChatState::Idle);
        assert_eq!(session.transcript().len(), 1);
        assert!(session.transcript().iter().all(|m| m.is_user()));
        assert_eq!(load_chat_history(&store).await.len(), 1);

        let notices = drain(&mut rx);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].destructive);
        assert_eq!(notices[0].title, "Error");
        Ok(())
    }

    #[tokio::test]
    async fn it_reports_an_empty_reply() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", generate_path("gemini-1.5-flash").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let (mut session, mut rx, _store) = test_session(&server.url(), Some(TEST_API_KEY)).await;
        let result = session.submit("hello").await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(SendError::Failed(GeminiError::NoValidResponse))
        ));
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(drain(&mut rx).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_never_calls_the_api_without_a_key() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (mut session, mut rx, store) = test_session(&server.url(), None).await;
        session.dismiss_credential_entry();
        assert_eq!(session.state(), ChatState::Idle);

        let result = session.submit("hello").await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(SendError::Rejected(SendRejected::MissingCredential))
        ));
        assert_eq!(session.state(), ChatState::AwaitingCredential);
        assert!(session.transcript().is_empty());
        assert!(load_chat_history(&store).await.is_empty());

        let notices = drain(&mut rx);
        assert_eq!(notices[0].title, "API Key Required");
        Ok(())
    }

    #[tokio::test]
    async fn it_refreshes_models_when_the_key_is_set() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1beta/models")
            .match_query(Matcher::UrlEncoded("key".into(), "new-key".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "models": [
                        {"name": "models/gemini-2.0-flash", "supportedGenerationMethods": ["generateContent"]},
                        {"name": "models/gemini-1.5-flash", "supportedGenerationMethods": ["generateContent"]},
                        {"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let (mut session, mut rx, _store) = test_session(&server.url(), None).await;
        assert_eq!(session.state(), ChatState::AwaitingCredential);

        assert!(session.submit_api_key("  new-key ").await);

        mock.assert_async().await;
        assert_eq!(session.state(), ChatState::Idle);
        assert_eq!(session.api_key(), Some("new-key"));
        assert_eq!(
            session.available_models(),
            &["gemini-1.5-flash".to_string(), "gemini-2.0-flash".to_string()]
        );
        assert!(session.is_selected_model_available());
        assert_eq!(drain(&mut rx)[0].title, "API Key Set");
        Ok(())
    }

    #[tokio::test]
    async fn it_falls_back_to_default_models_on_lookup_failure() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1beta/models")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": {"message": "API key not valid"}}"#)
            .create_async()
            .await;

        let (mut session, _rx, _store) = test_session(&server.url(), Some("bad-key")).await;
        let models = session.refresh_models().await.to_vec();

        mock.assert_async().await;
        assert_eq!(models.len(), 5);
        assert_eq!(models[0], "gemini-1.5-flash");
        Ok(())
    }

    #[tokio::test]
    async fn it_clears_history_in_any_state() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", generate_path("gemini-1.5-flash").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(reply_body("hi"))
            .create_async()
            .await;

        let (mut session, mut rx, store) = test_session(&server.url(), Some(TEST_API_KEY)).await;
        session.submit("hello").await?;
        assert_eq!(load_chat_history(&store).await.len(), 2);

        session.open_credential_entry();
        session.clear_history().await;

        assert!(session.transcript().is_empty());
        assert!(load_chat_history(&store).await.is_empty());
        assert_eq!(session.state(), ChatState::AwaitingCredential);
        assert!(drain(&mut rx).iter().any(|n| n.title == "Chat Cleared"));
        Ok(())
    }

    #[tokio::test]
    async fn it_tags_replies_with_the_selected_model() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", generate_path("gemini-1.5-pro").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(reply_body("from pro"))
            .create_async()
            .await;

        let (mut session, _rx, _store) = test_session(&server.url(), Some(TEST_API_KEY)).await;
        session.select_model("gemini-1.5-pro");
        let reply = session.submit("hello").await?;

        mock.assert_async().await;
        assert_eq!(reply.model(), Some("gemini-1.5-pro"));
        Ok(())
    }
}
