mod common;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use common::*;

const ROOM: &str = "!lounge:example.org";

/// One writer session: open, write, close.
async fn write_pipe(pipe: PathBuf, bytes: &'static [u8]) {
    tokio::task::spawn_blocking(move || {
        let mut f = std::fs::OpenOptions::new().write(true).open(pipe).unwrap();
        f.write_all(bytes).unwrap();
    })
    .await
    .unwrap();
}

async fn wait_for_sends(h: &Harness, n: usize) -> Vec<(String, String, String)> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let sent = h.homeserver.sent();
            if sent.len() >= n {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("messages were not sent in time")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn text_written_to_the_pipe_is_sent() {
    let h = Harness::new().await;
    h.homeserver
        .push_batch(batch("s1", vec![(ROOM, vec![], vec![])]));
    h.engine.sync_once().await.unwrap();

    let pipe = h.room_dir(ROOM).join("in");
    write_pipe(pipe.clone(), b"hello there\n").await;
    let sent = wait_for_sends(&h, 1).await;
    assert_eq!(sent[0].0, ROOM);
    assert_eq!(sent[0].2, "hello there");

    write_pipe(pipe, b"second").await;
    let sent = wait_for_sends(&h, 2).await;
    assert_eq!(sent[1].2, "second");

    let txn = |i: usize| -> u64 { sent[i].1.trim_start_matches("mm").parse().unwrap() };
    assert!(txn(1) > txn(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_writes_are_not_sent() {
    let h = Harness::new().await;
    h.homeserver
        .push_batch(batch("s1", vec![(ROOM, vec![], vec![])]));
    h.engine.sync_once().await.unwrap();

    let pipe = h.room_dir(ROOM).join("in");
    write_pipe(pipe.clone(), b"\n").await;
    // let the watcher see EOF before the next writer shows up
    tokio::time::sleep(Duration::from_millis(200)).await;
    write_pipe(pipe, b"after").await;

    let sent = wait_for_sends(&h, 1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].2, "after");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resumed_room_accepts_messages() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("example.org").join(USER).join(ROOM)).unwrap();

    let h = Harness::in_dir(tmp).await;
    h.engine.resume().await.unwrap();
    assert_eq!(h.engine.watcher_count(), 1);

    write_pipe(h.room_dir(ROOM).join("in"), b"back again\n").await;
    let sent = wait_for_sends(&h, 1).await;
    assert_eq!(sent[0].2, "back again");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_send_does_not_stop_the_watcher() {
    let h = Harness::new().await;
    h.homeserver
        .push_batch(batch("s1", vec![(ROOM, vec![], vec![])]));
    h.engine.sync_once().await.unwrap();
    h.homeserver.fail_next_sends(1);

    let pipe = h.room_dir(ROOM).join("in");
    write_pipe(pipe.clone(), b"dropped\n").await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.homeserver.send_attempts() < 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("send was not attempted in time");

    write_pipe(pipe, b"delivered\n").await;
    let sent = wait_for_sends(&h, 1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].2, "delivered");
    assert_eq!(h.homeserver.send_attempts(), 2);
}
