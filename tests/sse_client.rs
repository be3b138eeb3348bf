// tests/sse_client.rs
//
// Stream Reader against a real local HTTP server (axum on 127.0.0.1:0).
//
// Covered:
// - data-line decoding, non-data lines ignored, malformed lines skipped
// - multi-key lines, CRLF framing, unterminated final line
// - deadline: endless feed, stalled body, server that never answers
// - failure paths: refused connection, non-2xx status, over-long line
// - consumer hang-up closes the reader

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header, StatusCode},
    routing::get,
    Router,
};
use futures::StreamExt;
use tokio::sync::mpsc;

use post_stream_analyzer::config::feed::FeedConfig;
use post_stream_analyzer::ingest::{Post, PostStream, StreamNotice, StreamObserver};
use post_stream_analyzer::SseClient;

const SLACK: Duration = Duration::from_millis(1500);

/// Observer that records a short tag per notice.
#[derive(Default)]
struct Recorder {
    notes: Mutex<Vec<String>>,
}

impl StreamObserver for Recorder {
    fn notify(&self, notice: StreamNotice<'_>) {
        let tag = match notice {
            StreamNotice::Connected { .. } => "connected".to_string(),
            StreamNotice::ConnectFailed { .. } => "connect_failed".to_string(),
            StreamNotice::BadStatus { status, .. } => format!("status:{}", status.as_u16()),
            StreamNotice::ReadFailed { .. } => "read_failed".to_string(),
            StreamNotice::LineTooLong { limit } => format!("too_long:{limit}"),
            StreamNotice::MalformedLine { .. } => "malformed".to_string(),
            StreamNotice::Closed {
                reason,
                posts,
                malformed,
            } => format!("closed:{}:{posts}:{malformed}", reason.as_str()),
        };
        self.notes.lock().unwrap().push(tag);
    }
}

impl Recorder {
    fn notes(&self) -> Vec<String> {
        self.notes.lock().unwrap().clone()
    }

    /// The close notice is sent just after the channel closes; wait for it.
    async fn closed(&self) -> String {
        for _ in 0..100 {
            if let Some(c) = self.notes().into_iter().find(|n| n.starts_with("closed:")) {
                return c;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no close notice; got {:?}", self.notes());
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test feed");
    });
    format!("http://{addr}/stream")
}

fn fixed_feed(body: &'static str) -> Router {
    Router::new().route(
        "/stream",
        get(move || async move { ([(header::CONTENT_TYPE, "text/event-stream")], body) }),
    )
}

fn chunked_feed(chunks: Vec<&'static str>, then_hang: bool) -> Router {
    Router::new().route(
        "/stream",
        get(move || {
            let chunks = chunks.clone();
            async move {
                let head = futures::stream::iter(chunks).map(Ok::<_, std::io::Error>);
                let body = if then_hang {
                    Body::from_stream(head.chain(futures::stream::pending()))
                } else {
                    Body::from_stream(head)
                };
                ([(header::CONTENT_TYPE, "text/event-stream")], body)
            }
        }),
    )
}

/// One tweet every 20ms, forever.
fn endless_feed() -> Router {
    Router::new().route(
        "/stream",
        get(|| async {
            let stream = futures::stream::unfold(0u64, |i| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let line = format!("data: {{\"tweet\":{{\"timestamp\":{i},\"retweets\":1}}}}\n\n");
                Some((Ok::<_, std::io::Error>(line), i + 1))
            });
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(stream),
            )
        }),
    )
}

fn client(url: &str, rec: &Arc<Recorder>) -> SseClient {
    SseClient::new(url).with_observer(rec.clone())
}

async fn collect(mut rx: mpsc::Receiver<Post>) -> Vec<Post> {
    let mut out = Vec::new();
    while let Some(p) = rx.recv().await {
        out.push(p);
    }
    out
}

#[tokio::test]
async fn valid_data_line_yields_one_post() {
    let url = serve(fixed_feed(
        "data: {\"post\":{\"timestamp\":1234567890,\"likes\":10}}\n\n",
    ))
    .await;
    let rec = Arc::new(Recorder::default());

    let posts = collect(client(&url, &rec).read_stream(Duration::from_secs(5))).await;

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].kind, "post");
    assert_eq!(posts[0].data.timestamp, 1234567890);
    assert_eq!(posts[0].data.likes, 10);
    assert_eq!(rec.closed().await, "closed:eof:1:0");
}

#[tokio::test]
async fn non_data_lines_are_ignored() {
    let url = serve(fixed_feed(
        "invalid data\n\nevent: post\nid: 17\n: keep-alive\nretry: 100\n\n",
    ))
    .await;
    let rec = Arc::new(Recorder::default());

    let posts = collect(client(&url, &rec).read_stream(Duration::from_secs(5))).await;

    assert!(posts.is_empty());
    assert_eq!(rec.closed().await, "closed:eof:0:0");
}

#[tokio::test]
async fn malformed_line_is_skipped_and_stream_continues() {
    let url = serve(fixed_feed(concat!(
        "data: {\"a\":{\"timestamp\":1,\"likes\":5}}\n\n",
        "data: {not json\n\n",
        "data: {\"a\":{\"timestamp\":2,\"likes\":10}}\n\n",
    )))
    .await;
    let rec = Arc::new(Recorder::default());

    let posts = collect(client(&url, &rec).read_stream(Duration::from_secs(5))).await;

    let ts: Vec<i64> = posts.iter().map(|p| p.data.timestamp).collect();
    assert_eq!(ts, vec![1, 2]);
    assert!(rec.notes().contains(&"malformed".to_string()));
    assert_eq!(rec.closed().await, "closed:eof:2:1");
}

#[tokio::test]
async fn multi_key_line_emits_every_key() {
    let url = serve(fixed_feed(concat!(
        "data: {\"youtube_video\":{\"timestamp\":9},",
        "\"article\":{\"timestamp\":8,\"comments\":3}}\n\n",
    )))
    .await;
    let rec = Arc::new(Recorder::default());

    let posts = collect(client(&url, &rec).read_stream(Duration::from_secs(5))).await;

    let kinds: Vec<&str> = posts.iter().map(|p| p.kind.as_str()).collect();
    assert_eq!(kinds, vec!["article", "youtube_video"]);
    assert_eq!(posts[0].data.comments, 3);
}

#[tokio::test]
async fn lines_split_across_chunks_with_crlf_and_unterminated_tail() {
    let url = serve(chunked_feed(
        vec![
            "data: {\"pin\":{\"timest",
            "amp\":1,\"favorites\":4}}\r\n\r\n",
            "data: {\"pin\":{\"timestamp\":2}}",
        ],
        false,
    ))
    .await;
    let rec = Arc::new(Recorder::default());

    let posts = collect(client(&url, &rec).read_stream(Duration::from_secs(5))).await;

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].data.favorites, 4);
    assert_eq!(posts[1].data.timestamp, 2);
}

#[tokio::test]
async fn endless_feed_is_cut_at_the_deadline() {
    let url = serve(endless_feed()).await;
    let rec = Arc::new(Recorder::default());
    let window = Duration::from_millis(400);

    let started = Instant::now();
    let posts = collect(client(&url, &rec).read_stream(window)).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= window, "closed early after {elapsed:?}");
    assert!(elapsed < window + SLACK, "took {elapsed:?}");
    assert!(!posts.is_empty());
    // Arrival order is wire order.
    assert!(posts.windows(2).all(|w| w[0].data.timestamp < w[1].data.timestamp));
    assert!(rec.closed().await.starts_with("closed:deadline:"));
}

#[tokio::test]
async fn stalled_body_keeps_decoded_posts_and_closes_at_deadline() {
    let url = serve(chunked_feed(
        vec!["data: {\"a\":{\"timestamp\":5,\"likes\":1}}\n\n"],
        true,
    ))
    .await;
    let rec = Arc::new(Recorder::default());
    let window = Duration::from_millis(300);

    let started = Instant::now();
    let posts = collect(client(&url, &rec).read_stream(window)).await;

    assert_eq!(posts.len(), 1);
    assert!(started.elapsed() < window + SLACK);
    assert_eq!(rec.closed().await, "closed:deadline:1:0");
}

#[tokio::test]
async fn silent_server_is_cut_during_connect() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });
    let rec = Arc::new(Recorder::default());
    let window = Duration::from_millis(300);

    let started = Instant::now();
    let posts = collect(client(&format!("http://{addr}/stream"), &rec).read_stream(window)).await;

    assert!(posts.is_empty());
    assert!(started.elapsed() < window + SLACK);
    assert_eq!(rec.closed().await, "closed:deadline:0:0");
}

#[tokio::test]
async fn refused_connection_is_an_empty_sequence() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let rec = Arc::new(Recorder::default());

    let url = format!("http://{addr}/stream");
    let posts = collect(client(&url, &rec).read_stream(Duration::from_secs(5))).await;

    assert!(posts.is_empty());
    assert_eq!(rec.notes()[0], "connect_failed");
    assert_eq!(rec.closed().await, "closed:error:0:0");
}

#[tokio::test]
async fn non_success_status_is_an_empty_sequence() {
    let app = Router::new().route(
        "/stream",
        get(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "data: {\"a\":{\"timestamp\":1}}\n\n",
            )
        }),
    );
    let url = serve(app).await;
    let rec = Arc::new(Recorder::default());

    let posts = collect(client(&url, &rec).read_stream(Duration::from_secs(5))).await;

    assert!(posts.is_empty());
    assert_eq!(rec.notes()[0], "status:503");
}

#[tokio::test]
async fn over_long_line_ends_stream_after_earlier_posts() {
    let long = format!("data: {}\n\n", "x".repeat(4096));
    let first = "data: {\"a\":{\"timestamp\":1}}\n\n";
    let last = "data: {\"a\":{\"timestamp\":2}}\n\n";
    let body: &'static str = Box::leak(format!("{first}{long}{last}").into_boxed_str());
    let url = serve(fixed_feed(body)).await;
    let rec = Arc::new(Recorder::default());
    let cfg = FeedConfig {
        url,
        max_line_bytes: 1024,
        ..FeedConfig::default()
    };

    let posts = collect(
        SseClient::from_config(&cfg)
            .with_observer(rec.clone())
            .read_stream(Duration::from_secs(5)),
    )
    .await;

    assert_eq!(posts.len(), 1);
    assert!(rec.notes().contains(&"too_long:1024".to_string()));
    assert_eq!(rec.closed().await, "closed:error:1:0");
}

#[tokio::test]
async fn dropped_receiver_stops_the_reader() {
    let url = serve(endless_feed()).await;
    let rec = Arc::new(Recorder::default());

    let mut rx = client(&url, &rec).read_stream(Duration::from_secs(30));
    assert!(rx.recv().await.is_some());
    drop(rx);

    assert!(rec.closed().await.starts_with("closed:consumer_gone:"));
}
