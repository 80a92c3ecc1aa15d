use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio::time::Duration;

use super::Controller;
use super::IMAGE_APOLOGY;
use super::SEND_APOLOGY;
use crate::configuration::Settings;
use crate::domain::models::Event;
use crate::domain::models::Role;
use crate::domain::models::DEFAULT_TITLE;
use crate::domain::services::store::SessionStore;
use crate::infrastructure::gateway::Gateway;
use crate::infrastructure::gateway::GatewayError;
use crate::infrastructure::gateway::TextRequest;
use crate::infrastructure::gateway::TEXT_FALLBACK;
use crate::infrastructure::storage::MemoryStorage;

struct TestGateway {
    text_results: StdMutex<VecDeque<Result<String, GatewayError>>>,
    image_results: StdMutex<VecDeque<Result<String, GatewayError>>>,
    text_requests: StdMutex<Vec<TextRequest>>,
    image_prompts: StdMutex<Vec<String>>,
}

impl TestGateway {
    fn new(
        text_results: Vec<Result<String, GatewayError>>,
        image_results: Vec<Result<String, GatewayError>>,
    ) -> Arc<TestGateway> {
        return Arc::new(TestGateway {
            text_results: StdMutex::new(VecDeque::from(text_results)),
            image_results: StdMutex::new(VecDeque::from(image_results)),
            text_requests: StdMutex::new(vec![]),
            image_prompts: StdMutex::new(vec![]),
        });
    }

    fn text_requests(&self) -> Vec<TextRequest> {
        return self.text_requests.lock().unwrap().to_vec();
    }
}

#[async_trait]
impl Gateway for TestGateway {
    async fn generate_text(&self, request: TextRequest) -> Result<String, GatewayError> {
        self.text_requests.lock().unwrap().push(request);
        return self
            .text_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok("unscripted reply".to_string()));
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, GatewayError> {
        self.image_prompts.lock().unwrap().push(prompt.to_string());
        return self
            .image_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GatewayError::MalformedResponse("image_url")));
    }
}

/// Signals when a text request arrives and holds the reply back until the
/// test releases it, so completion order is controlled from the outside.
struct GatedGateway {
    entered_tx: mpsc::UnboundedSender<()>,
    releases: StdMutex<VecDeque<oneshot::Receiver<String>>>,
}

impl GatedGateway {
    fn new(
        gate_count: usize,
    ) -> (
        Arc<GatedGateway>,
        mpsc::UnboundedReceiver<()>,
        Vec<oneshot::Sender<String>>,
    ) {
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();
        let mut senders = vec![];
        let mut receivers = VecDeque::new();
        for _ in 0..gate_count {
            let (tx, rx) = oneshot::channel();
            senders.push(tx);
            receivers.push_back(rx);
        }

        let gateway = Arc::new(GatedGateway {
            entered_tx,
            releases: StdMutex::new(receivers),
        });

        return (gateway, entered_rx, senders);
    }
}

#[async_trait]
impl Gateway for GatedGateway {
    async fn generate_text(&self, _request: TextRequest) -> Result<String, GatewayError> {
        let release = self.releases.lock().unwrap().pop_front();
        let release = match release {
            Some(release) => release,
            // Ungated call, e.g. a background title request the test does
            // not care about.
            None => return Ok("".to_string()),
        };

        let _ = self.entered_tx.send(());
        let reply = release.await.unwrap_or_else(|_| return "".to_string());
        return Ok(reply);
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String, GatewayError> {
        return Err(GatewayError::MalformedResponse("image_url"));
    }
}

fn fixture(
    gateway: Arc<dyn Gateway>,
) -> (
    Controller,
    Arc<Mutex<SessionStore>>,
    mpsc::UnboundedReceiver<Event>,
) {
    let store = Arc::new(Mutex::new(SessionStore::hydrate(Box::new(
        MemoryStorage::default(),
    ))));
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let controller = Controller::new(store.clone(), Arc::new(Settings::default()), gateway, tx);

    return (controller, store, rx);
}

async fn chat_contents(store: &Arc<Mutex<SessionStore>>, id: &str) -> Vec<String> {
    return store
        .lock()
        .await
        .chat(id)
        .unwrap()
        .messages
        .iter()
        .map(|message| return message.content.to_string())
        .collect();
}

async fn chat_title(store: &Arc<Mutex<SessionStore>>, id: &str) -> String {
    return store.lock().await.chat(id).unwrap().title.to_string();
}

async fn wait_for_title(store: &Arc<Mutex<SessionStore>>, id: &str, expected: &str) {
    for _ in 0..100 {
        if chat_title(store, id).await == expected {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("chat {id} never got the title {expected:?}");
}

fn drain_notices(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<String> {
    let mut notices = vec![];
    while let Ok(event) = rx.try_recv() {
        if let Event::Notice(text) = event {
            notices.push(text);
        }
    }

    return notices;
}

#[tokio::test]
async fn it_ignores_blank_input() {
    let gateway = TestGateway::new(vec![], vec![]);
    let (controller, store, _rx) = fixture(gateway.clone());
    let id = store.lock().await.create_chat();

    controller.send("   ").await.unwrap();

    assert!(chat_contents(&store, &id).await.is_empty());
    assert!(gateway.text_requests().is_empty());
}

#[tokio::test]
async fn it_appends_exchange_and_titles_once() {
    let gateway = TestGateway::new(
        vec![
            Ok("Foxes are small omnivorous canids.".to_string()),
            Ok("\"Fox Facts\"".to_string()),
        ],
        vec![],
    );
    let (controller, store, _rx) = fixture(gateway.clone());
    let id = store.lock().await.create_chat();

    controller.send("Tell me about foxes").await.unwrap();

    assert_eq!(
        chat_contents(&store, &id).await,
        vec![
            "Tell me about foxes",
            "Foxes are small omnivorous canids."
        ]
    );

    let requests = gateway.text_requests();
    assert_eq!(requests[0].prompt, "Tell me about foxes");
    assert_eq!(requests[0].model, "openai");
    assert_eq!(requests[0].max_tokens, 1000);
    assert_eq!(requests[0].temperature, 0.7);
    assert!(requests[0]
        .system_instructions
        .starts_with("You are OpenAI GPT-4.1-nano"));

    wait_for_title(&store, &id, "Fox Facts").await;

    let requests = gateway.text_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].max_tokens, 20);
    assert_eq!(requests[1].temperature, 0.7);
    assert!(requests[1].prompt.contains("User: \"Tell me about foxes\""));
}

#[tokio::test]
async fn it_does_not_retitle_on_later_exchanges() {
    let gateway = TestGateway::new(
        vec![
            Ok("First reply".to_string()),
            Ok("Fox Facts".to_string()),
            Ok("Second reply".to_string()),
        ],
        vec![],
    );
    let (controller, store, _rx) = fixture(gateway.clone());
    let id = store.lock().await.create_chat();

    controller.send("Hello").await.unwrap();
    wait_for_title(&store, &id, "Fox Facts").await;

    controller.send("And another thing").await.unwrap();
    sleep(Duration::from_millis(50)).await;

    assert_eq!(chat_title(&store, &id).await, "Fox Facts");
    // Two sends plus exactly one title request.
    assert_eq!(gateway.text_requests().len(), 3);
}

#[tokio::test]
async fn it_skips_titling_when_title_already_changed() {
    let gateway = TestGateway::new(vec![Ok("A reply".to_string())], vec![]);
    let (controller, store, _rx) = fixture(gateway.clone());
    let id = store.lock().await.create_chat();
    store.lock().await.rename_chat(&id, "Custom Title").unwrap();

    controller.send("Hello").await.unwrap();
    sleep(Duration::from_millis(50)).await;

    assert_eq!(chat_title(&store, &id).await, "Custom Title");
    assert_eq!(gateway.text_requests().len(), 1);
}

#[tokio::test]
async fn it_keeps_the_default_title_on_contentless_title_response() {
    let gateway = TestGateway::new(
        vec![Ok("A reply".to_string()), Ok(TEXT_FALLBACK.to_string())],
        vec![],
    );
    let (controller, store, _rx) = fixture(gateway.clone());
    let id = store.lock().await.create_chat();

    controller.send("Hello").await.unwrap();
    sleep(Duration::from_millis(50)).await;

    // The send plus one title attempt, but the fallback sentence never
    // becomes the title.
    assert_eq!(gateway.text_requests().len(), 2);
    assert_eq!(chat_title(&store, &id).await, DEFAULT_TITLE);
}

#[tokio::test]
async fn it_appends_apology_on_failed_send() {
    let gateway = TestGateway::new(vec![Err(GatewayError::MalformedResponse("choices"))], vec![]);
    let (controller, store, _rx) = fixture(gateway.clone());
    let id = store.lock().await.create_chat();

    controller.send("Hello").await.unwrap();
    sleep(Duration::from_millis(50)).await;

    assert_eq!(
        chat_contents(&store, &id).await,
        vec!["Hello", SEND_APOLOGY]
    );
    assert_eq!(chat_title(&store, &id).await, DEFAULT_TITLE);
    // No retry, no title generation.
    assert_eq!(gateway.text_requests().len(), 1);
}

#[tokio::test]
async fn it_reports_unknown_commands() {
    let gateway = TestGateway::new(vec![], vec![]);
    let (controller, store, mut rx) = fixture(gateway.clone());
    let id = store.lock().await.create_chat();

    controller.send("/wat").await.unwrap();

    let notices = drain_notices(&mut rx);
    assert_eq!(
        notices,
        vec!["Unknown command: /wat. Available commands: /clear, /title, /image <prompt>"]
    );
    assert!(chat_contents(&store, &id).await.is_empty());
    assert!(gateway.text_requests().is_empty());
}

#[tokio::test]
async fn it_reports_missing_image_prompt() {
    let gateway = TestGateway::new(vec![], vec![]);
    let (controller, store, mut rx) = fixture(gateway.clone());
    let id = store.lock().await.create_chat();

    controller.send("/image   ").await.unwrap();

    let notices = drain_notices(&mut rx);
    assert_eq!(
        notices,
        vec!["Please provide a prompt for the image generation."]
    );
    assert!(chat_contents(&store, &id).await.is_empty());
    assert!(gateway.image_prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn it_persists_image_exchange_as_a_pair() {
    let gateway = TestGateway::new(
        vec![],
        vec![Ok("https://cdn.example.com/fox.png".to_string())],
    );
    let (controller, store, _rx) = fixture(gateway.clone());
    let id = store.lock().await.create_chat();

    controller.send("/image a red fox").await.unwrap();

    assert_eq!(
        chat_contents(&store, &id).await,
        vec![
            "/image a red fox",
            "![a red fox](https://cdn.example.com/fox.png)"
        ]
    );
    let store_guard = store.lock().await;
    let chat = store_guard.chat(&id).unwrap();
    assert_eq!(chat.messages[0].role, Role::User);
    assert_eq!(chat.messages[1].role, Role::Assistant);
    assert_eq!(*gateway.image_prompts.lock().unwrap(), vec!["a red fox"]);
}

#[tokio::test]
async fn it_persists_nothing_on_failed_image_generation() {
    let gateway = TestGateway::new(vec![], vec![Err(GatewayError::MalformedResponse("image_url"))]);
    let (controller, store, mut rx) = fixture(gateway.clone());
    let id = store.lock().await.create_chat();

    controller.send("/image a red fox").await.unwrap();

    assert!(chat_contents(&store, &id).await.is_empty());
    let notices = drain_notices(&mut rx);
    assert_eq!(notices, vec![IMAGE_APOLOGY]);
}

#[tokio::test]
async fn it_clears_to_a_fresh_chat() {
    let gateway = TestGateway::new(vec![], vec![]);
    let (controller, store, _rx) = fixture(gateway.clone());
    let first = store.lock().await.create_chat();

    controller.send("/clear").await.unwrap();

    let store_guard = store.lock().await;
    let active = store_guard.active_id().unwrap().to_string();
    assert_ne!(active, first);
    assert_eq!(store_guard.list_chats().len(), 2);
}

#[tokio::test]
async fn it_requires_history_to_regenerate_a_title() {
    let gateway = TestGateway::new(vec![], vec![]);
    let (controller, store, mut rx) = fixture(gateway.clone());
    store.lock().await.create_chat();

    controller.send("/title").await.unwrap();

    let notices = drain_notices(&mut rx);
    assert_eq!(notices, vec!["Need at least one exchange to generate a title."]);
    assert!(gateway.text_requests().is_empty());
}

#[tokio::test]
async fn it_regenerates_a_title_on_command() {
    let gateway = TestGateway::new(vec![Ok("\"Better Title\"".to_string())], vec![]);
    let (controller, store, mut rx) = fixture(gateway.clone());
    let id = store.lock().await.create_chat();
    {
        let mut store_guard = store.lock().await;
        store_guard.append_message(&id, Role::User, "Hello").unwrap();
        store_guard
            .append_message(&id, Role::Assistant, "Hi there")
            .unwrap();
        store_guard.rename_chat(&id, "Stale Title").unwrap();
    }

    controller.send("/title").await.unwrap();

    let notices = drain_notices(&mut rx);
    assert_eq!(notices, vec!["Chat title has been regenerated."]);
    wait_for_title(&store, &id, "Better Title").await;
}

#[tokio::test]
async fn it_appends_response_to_the_chat_that_sent_it() {
    let (gateway, mut entered_rx, mut releases) = GatedGateway::new(1);
    let (controller, store, _rx) = fixture(gateway);
    let first = store.lock().await.create_chat();

    let send_controller = controller.clone();
    let handle = tokio::spawn(async move {
        return send_controller.send("Hello from the first chat").await;
    });
    entered_rx.recv().await.unwrap();

    // Switch away while the request is in flight. There is no cancellation,
    // the response must land in the chat that issued the send.
    let second = store.lock().await.create_chat();
    releases
        .remove(0)
        .send("A late reply".to_string())
        .unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(
        chat_contents(&store, &first).await,
        vec!["Hello from the first chat", "A late reply"]
    );
    assert!(chat_contents(&store, &second).await.is_empty());
    assert_eq!(store.lock().await.active_id(), Some(second.as_str()));
}

#[tokio::test]
async fn it_appends_racing_sends_in_completion_order() {
    let (gateway, mut entered_rx, mut releases) = GatedGateway::new(2);
    let (controller, store, _rx) = fixture(gateway);
    let id = store.lock().await.create_chat();

    let first_controller = controller.clone();
    let first_handle = tokio::spawn(async move {
        return first_controller.send("first question").await;
    });
    entered_rx.recv().await.unwrap();

    let second_controller = controller.clone();
    let second_handle = tokio::spawn(async move {
        return second_controller.send("second question").await;
    });
    entered_rx.recv().await.unwrap();

    // Resolve the second request before the first one.
    let first_release = releases.remove(0);
    let second_release = releases.remove(0);
    second_release.send("second reply".to_string()).unwrap();
    second_handle.await.unwrap().unwrap();
    first_release.send("first reply".to_string()).unwrap();
    first_handle.await.unwrap().unwrap();

    assert_eq!(
        chat_contents(&store, &id).await,
        vec![
            "first question",
            "second question",
            "second reply",
            "first reply"
        ]
    );
}
