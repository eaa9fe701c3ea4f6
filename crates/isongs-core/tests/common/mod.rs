//! A local stand-in for a station web player.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct FakePlayer {
    response: Arc<Mutex<(StatusCode, String)>>,
    pub url: String,
}

impl FakePlayer {
    pub async fn start() -> Self {
        let response = Arc::new(Mutex::new((StatusCode::OK, playlist(None))));
        let app = Router::new()
            .route("/playlist.json", get(serve))
            .with_state(response.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake player");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            response,
            url: format!("http://{}/playlist.json", addr),
        }
    }

    pub fn playing(&self, now: Option<(&str, &str)>) {
        *self.response.lock().unwrap() = (StatusCode::OK, playlist(now));
    }

    pub fn respond(&self, status: StatusCode, body: &str) {
        *self.response.lock().unwrap() = (status, body.to_string());
    }
}

async fn serve(State(response): State<Arc<Mutex<(StatusCode, String)>>>) -> (StatusCode, String) {
    response.lock().unwrap().clone()
}

/// A playlist document with one past entry and, if given, the
/// `(title, artist)` currently on air.
pub fn playlist(now: Option<(&str, &str)>) -> String {
    let mut data = vec![serde_json::json!({
        "stationId": "s1", "id": "1", "artist": "Earlier Artist", "title": "Earlier Song",
        "type": "music", "duration": 200, "playingMode": 2, "starttime": 1700000000
    })];
    if let Some((title, artist)) = now {
        data.push(serde_json::json!({
            "stationId": "s1", "id": "2", "artist": artist, "title": title,
            "type": "music", "duration": 240, "playingMode": 1, "starttime": 1700000200,
            "url": { "href": "https://radio.example/track/2" }
        }));
    }
    serde_json::json!({
        "audioplayer": { "name": "Radio", "mediaId": "r1", "sources": [] },
        "playlist": { "feedUrl": "https://radio.example/feed", "label": "Playlist", "data": data },
        "links": [], "tabs": []
    })
    .to_string()
}
