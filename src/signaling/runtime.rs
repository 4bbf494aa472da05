use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};

use crate::log::LogSink;
use crate::signaling::protocol::Msg;
use crate::signaling::router::Router;
use crate::signaling::server_event::ServerEvent;
use crate::signaling::types::ConnId;
use crate::{sink_debug, sink_info, sink_warn};

/// Central server loop: owns the Router and the per-connection writer senders.
///
/// Runs until every `Sender<ServerEvent>` is dropped.
pub fn run_server_loop(mut router: Router, log: Arc<dyn LogSink>, rx: Receiver<ServerEvent>) {
    let mut clients: HashMap<ConnId, Sender<Msg>> = HashMap::new();

    while let Ok(ev) = rx.recv() {
        match ev {
            ServerEvent::RegisterClient { conn, to_client } => {
                clients.insert(conn, to_client);
                router.register_client(conn);
                sink_debug!(log, "registered conn {} ({} live)", conn, clients.len());
            }

            ServerEvent::MsgFromClient { conn, msg } => {
                sink_debug!(log, "{} from conn {}", msg.name(), conn);
                router.handle_from_client(conn, msg);
            }

            ServerEvent::Disconnected { conn } => {
                // Reader and writer may both report the same close.
                if clients.remove(&conn).is_some() {
                    router.unregister_client(conn);
                }
            }
        }

        for (target, out_msg) in router.drain_all_outgoing() {
            match clients.get(&target) {
                Some(tx) => {
                    if tx.send(out_msg).is_err() {
                        sink_warn!(log, "writer for conn {} is gone; message dropped", target);
                    }
                }
                None => sink_warn!(log, "no conn {} to deliver {}", target, out_msg.name()),
            }
        }
    }

    sink_info!(
        log,
        "server event channel closed; loop exiting ({} conns left)",
        clients.len()
    );
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use crate::log::NoopLogSink;
    use crate::signaling::identity::IdentityGenerator;
    use crate::signaling::protocol::SignalPayload;
    use crate::signaling::server::Server;

    #[test]
    fn loop_assigns_ids_and_relays_invite() {
        let (ev_tx, ev_rx) = mpsc::channel::<ServerEvent>();
        let log: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        let loop_log = log.clone();
        let worker = thread::spawn(move || {
            let router = Router::with_server(Server::with_generator(
                log,
                IdentityGenerator::scripted(vec!["abc123", "xyz789"]),
            ));
            run_server_loop(router, loop_log, ev_rx);
        });

        let (a_tx, a_rx) = mpsc::channel::<Msg>();
        let (b_tx, b_rx) = mpsc::channel::<Msg>();
        ev_tx
            .send(ServerEvent::RegisterClient {
                conn: 1,
                to_client: a_tx,
            })
            .unwrap();
        ev_tx
            .send(ServerEvent::RegisterClient {
                conn: 2,
                to_client: b_tx,
            })
            .unwrap();

        let wait = Duration::from_millis(500);
        assert_eq!(
            a_rx.recv_timeout(wait).unwrap(),
            Msg::IdentityAssigned {
                client_id: "abc123".into()
            }
        );
        assert_eq!(
            b_rx.recv_timeout(wait).unwrap(),
            Msg::IdentityAssigned {
                client_id: "xyz789".into()
            }
        );

        ev_tx
            .send(ServerEvent::MsgFromClient {
                conn: 1,
                msg: Msg::Invite {
                    user_to_call: "xyz789".into(),
                    signal_data: SignalPayload::new(b"offer".to_vec()),
                    from: "abc123".into(),
                    name: "Ana".into(),
                },
            })
            .unwrap();

        match b_rx.recv_timeout(wait).unwrap() {
            Msg::IncomingInvite { from, .. } => assert_eq!(from.as_str(), "abc123"),
            other => panic!("expected IncomingInvite, got {other:?}"),
        }

        ev_tx.send(ServerEvent::Disconnected { conn: 1 }).unwrap();
        ev_tx.send(ServerEvent::Disconnected { conn: 1 }).unwrap();
        drop(ev_tx);
        worker.join().unwrap();
    }
}
