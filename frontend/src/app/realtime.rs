use futures::{select, SinkExt, StreamExt};
use gloo_console::{error, log};
use gloo_net::websocket::futures::WebSocket;
use gloo_net::websocket::Message;
use gloo_timers::future::{IntervalStream, TimeoutFuture};
use shared::realtime::{
    classify, heartbeat_frame, join_frame, websocket_url, RefCounter, Signal, HEARTBEAT_INTERVAL_MS,
};
use shared::rest::SupabaseConfig;
use yew::Callback;

const RECONNECT_DELAY_MS: u32 = 5_000;

/// Keeps a subscription to vote inserts open and calls `on_vote` for each one.
pub async fn subscribe_votes(config: SupabaseConfig, on_vote: Callback<()>) {
    loop {
        if let Err(err) = listen(&config, &on_vote).await {
            error!(format!("realtime connection lost: {err}"));
        }
        TimeoutFuture::new(RECONNECT_DELAY_MS).await;
    }
}

async fn listen(config: &SupabaseConfig, on_vote: &Callback<()>) -> Result<(), String> {
    let socket = WebSocket::open(&websocket_url(config)).map_err(|e| e.to_string())?;
    let (mut sink, stream) = socket.split();
    let mut stream = stream.fuse();
    let mut heartbeat = IntervalStream::new(HEARTBEAT_INTERVAL_MS).fuse();
    let mut refs = RefCounter::default();

    sink.send(Message::Text(join_frame(refs.next()).to_text()))
        .await
        .map_err(|e| e.to_string())?;

    loop {
        select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => match classify(&text) {
                    Signal::VoteInserted => on_vote.emit(()),
                    Signal::Joined => log!("subscribed to vote inserts"),
                    Signal::Rejected(reason) => return Err(reason),
                    Signal::Ignored => {}
                },
                Some(Ok(Message::Bytes(_))) => {}
                Some(Err(err)) => return Err(err.to_string()),
                None => return Err("socket closed".to_string()),
            },
            _ = heartbeat.next() => {
                sink.send(Message::Text(heartbeat_frame(refs.next()).to_text()))
                    .await
                    .map_err(|e| e.to_string())?;
            }
        }
    }
}
