//! Full Bluetooth Mesh Stack. Runs a [`MeshDispatcher`] inside one tokio task: frames come in on a
//! `Stream`, outgoing messages on a channel and timers are slept on until their deadline.
use crate::directory::NodeDirectory;
use crate::stack::bearer::{ChannelBearer, OutgoingFrame};
use crate::stack::dispatcher::MeshDispatcher;
use crate::stack::events::StatusEvent;
use crate::stack::messages::OutgoingMessage;
use crate::stack::StackConfig;
use futures_core::Stream;
use futures_util::StreamExt;
use slog::{debug, warn, Logger};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Application side of a running `FullStack`. Dropping `outgoing` stops the stack.
pub struct FullStackHandle {
    pub outgoing: mpsc::UnboundedSender<OutgoingMessage>,
    /// Frames for the outgoing bearer.
    pub frames: mpsc::UnboundedReceiver<OutgoingFrame>,
    pub events: mpsc::UnboundedReceiver<StatusEvent>,
}
pub struct FullStack<D: NodeDirectory> {
    dispatcher: MeshDispatcher<D, ChannelBearer>,
    outgoing: mpsc::UnboundedReceiver<OutgoingMessage>,
    events: mpsc::UnboundedSender<StatusEvent>,
    logger: Logger,
}
fn now() -> std::time::Instant {
    Instant::now().into_std()
}
impl<D: NodeDirectory> FullStack<D> {
    pub fn new(directory: D, config: StackConfig, logger: Logger) -> (Self, FullStackHandle) {
        let (tx_outgoing, rx_outgoing) = mpsc::unbounded_channel();
        let (tx_frames, rx_frames) = mpsc::unbounded_channel();
        let (tx_events, rx_events) = mpsc::unbounded_channel();
        let dispatcher = MeshDispatcher::new(directory, ChannelBearer::new(tx_frames), config)
            .with_logger(logger.new(slog::o!("component" => "dispatcher")));
        (
            Self {
                dispatcher,
                outgoing: rx_outgoing,
                events: tx_events,
                logger,
            },
            FullStackHandle {
                outgoing: tx_outgoing,
                frames: rx_frames,
                events: rx_events,
            },
        )
    }
    /// Processes frames, send requests and timers until every `OutgoingMessage` sender is
    /// dropped. Returns the directory so advanced sequence numbers can be persisted.
    pub async fn run<S: Stream<Item = Vec<u8>>>(self, incoming: S) -> D {
        let FullStack {
            mut dispatcher,
            mut outgoing,
            events,
            logger,
        } = self;
        futures_util::pin_mut!(incoming);
        let mut incoming_open = true;
        loop {
            let deadline = dispatcher.next_deadline();
            let sleep = sleep_until(deadline.map_or_else(Instant::now, Instant::from_std));
            tokio::select! {
                frame = incoming.next(), if incoming_open => match frame {
                    Some(frame) => {
                        if let Err(e) = dispatcher.receive(&frame, now()) {
                            debug!(logger, "frame dropped"; "error" => %e);
                        }
                    }
                    None => {
                        debug!(logger, "incoming bearer closed");
                        incoming_open = false;
                    }
                },
                message = outgoing.recv() => match message {
                    Some(message) => {
                        if let Err(e) = dispatcher.send(&message, now()) {
                            warn!(logger, "send failed"; "dst" => message.dst.value(), "error" => %e);
                        }
                    }
                    None => break,
                },
                _ = sleep, if deadline.is_some() => dispatcher.poll_timers(now()),
            }
            for event in dispatcher.drain_events() {
                if let Err(mpsc::error::SendError(event)) = events.send(event) {
                    debug!(logger, "status event dropped"; "event" => ?event);
                }
            }
        }
        dispatcher.into_directory()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Opcode;
    use crate::address::{Address, UnicastAddress};
    use crate::crypto::key::{AppKey, DevKey, NetKey};
    use crate::directory::{MeshNetwork, ProvisionedNode};
    use crate::mesh::{AppKeyIndex, CompanyID, IVIndex, NetKeyIndex};
    use crate::stack::bearer::RecordingBearer;
    use core::time::Duration;

    fn network(local: u16, peer: u16) -> MeshNetwork {
        let mut network = MeshNetwork::new(
            ProvisionedNode::new(UnicastAddress::new(local), 1, DevKey::new_bytes([1; 16])),
            NetKey::from_hex("7dd7364cd842ad18c17c2b820c84c3d6").unwrap(),
            IVIndex(0),
        );
        network.add_app_key(
            AppKeyIndex(0),
            AppKey::from_hex("63964771734fbd76e3b40519d1d94a48").unwrap(),
            NetKeyIndex(0),
        );
        network.add_node(ProvisionedNode::new(
            UnicastAddress::new(peer),
            1,
            DevKey::new_bytes([2; 16]),
        ));
        network
    }
    fn segmented_message() -> OutgoingMessage {
        OutgoingMessage::vendor(
            Address::from(0x0001),
            AppKeyIndex(0),
            Opcode::vendor(0x05, CompanyID(0x0059)),
            vec![0x11; 13],
            true,
        )
    }
    fn discard() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }
    async fn next_failure(events: &mut mpsc::UnboundedReceiver<StatusEvent>) -> StatusEvent {
        loop {
            match events.recv().await {
                Some(event @ StatusEvent::TransactionFailed { .. }) => return event,
                Some(_) => continue,
                None => panic!("stack stopped"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reassembly_times_out() {
        let mut sender = MeshDispatcher::new(
            network(0x0003, 0x0001),
            RecordingBearer::new(),
            StackConfig::default(),
        );
        sender.send(&segmented_message(), now()).unwrap();
        let frames = sender.bearer_mut().take_frames();
        assert_eq!(frames.len(), 2);

        let (stack, mut handle) =
            FullStack::new(network(0x0001, 0x0003), StackConfig::default(), discard());
        let (tx_in, rx_in) = mpsc::unbounded_channel::<Vec<u8>>();
        let incoming = futures_util::stream::unfold(rx_in, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        });
        let task = tokio::spawn(stack.run(incoming));
        let start = Instant::now();
        tx_in.send(frames[0].frame.clone()).unwrap();

        // Partial block ack once the ack timer (150 + 50 * 5 ms) runs out.
        let ack = handle.frames.recv().await.unwrap();
        assert_eq!(ack.dst, Address::from(0x0003));
        assert!(start.elapsed() >= Duration::from_millis(400));

        assert_eq!(
            next_failure(&mut handle.events).await,
            StatusEvent::TransactionFailed {
                address: Address::from(0x0003),
                incomplete_timer_expired: true
            }
        );
        assert!(start.elapsed() >= Duration::from_secs(10));

        drop(handle.outgoing);
        let directory = task.await.unwrap();
        assert!(directory
            .replay_cache()
            .get_entry(UnicastAddress::new(0x0003))
            .is_some());
        assert_eq!(
            directory
                .provisioned_node(UnicastAddress::new(0x0003))
                .unwrap()
                .sequence_number()
                .value(),
            0
        );
    }
    #[tokio::test(start_paused = true)]
    async fn test_unacknowledged_send_fails() {
        let (stack, mut handle) =
            FullStack::new(network(0x0003, 0x0001), StackConfig::default(), discard());
        let task = tokio::spawn(stack.run(futures_util::stream::pending::<Vec<u8>>()));
        handle.outgoing.send(segmented_message()).unwrap();
        let first = handle.frames.recv().await.unwrap();
        let second = handle.frames.recv().await.unwrap();
        assert_eq!(first.dst, Address::from(0x0001));
        assert_ne!(first.frame, second.frame);

        assert_eq!(
            next_failure(&mut handle.events).await,
            StatusEvent::TransactionFailed {
                address: Address::from(0x0001),
                incomplete_timer_expired: true
            }
        );
        drop(handle.outgoing);
        let directory = task.await.unwrap();
        assert_eq!(directory.provisioner().sequence_number().value(), 2);
    }
    #[tokio::test(start_paused = true)]
    async fn test_runs_without_event_listener() {
        let (stack, handle) =
            FullStack::new(network(0x0003, 0x0001), StackConfig::default(), discard());
        let FullStackHandle {
            outgoing,
            mut frames,
            events,
        } = handle;
        drop(events);
        let task = tokio::spawn(stack.run(futures_util::stream::pending::<Vec<u8>>()));
        outgoing.send(segmented_message()).unwrap();
        outgoing.send(segmented_message()).unwrap();
        for _ in 0..4 {
            assert_eq!(frames.recv().await.unwrap().dst, Address::from(0x0001));
        }
        drop(outgoing);
        let directory = task.await.unwrap();
        assert_eq!(directory.provisioner().sequence_number().value(), 4);
    }
}
