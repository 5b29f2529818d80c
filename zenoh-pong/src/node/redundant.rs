//! Repeated transmission of control frames on an unacknowledged bus

use crate::config::Redundancy;
use crate::network::Transport;
use crate::protocol::Frame;

#[derive(Debug, Clone)]
struct Pending {
    frame: Frame,
    remaining: u8,
    due_tick: u64,
}

/// Sends each queued frame `copies` times, `spacing_ticks` apart
///
/// The first copy goes out on the next flush. Copies are fire-and-forget:
/// a refused send still counts as one copy.
#[derive(Debug, Clone)]
pub struct RedundantSender {
    redundancy: Redundancy,
    pending: Vec<Pending>,
}

impl RedundantSender {
    pub fn new(redundancy: Redundancy) -> Self {
        Self {
            redundancy,
            pending: Vec::new(),
        }
    }

    pub fn enqueue(&mut self, frame: Frame) {
        self.pending.push(Pending {
            frame,
            remaining: self.redundancy.copies.max(1),
            due_tick: 0,
        });
    }

    /// Send every copy due at `tick`; returns the number of copies sent
    pub fn flush<T: Transport + ?Sized>(&mut self, tick: u64, transport: &mut T) -> usize {
        let spacing = u64::from(self.redundancy.spacing_ticks);
        let mut sent = 0;

        for pending in &mut self.pending {
            while pending.remaining > 0 && pending.due_tick <= tick {
                if !transport.send(&pending.frame) {
                    tracing::debug!("Copy of {:?} refused by the bus", pending.frame);
                }
                pending.remaining -= 1;
                sent += 1;
                if spacing > 0 {
                    pending.due_tick = tick + spacing;
                }
            }
        }
        self.pending.retain(|pending| pending.remaining > 0);
        sent
    }

    /// No copies left to send
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every copy not sent yet
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<Frame>,
    }

    impl Transport for Recorder {
        fn send(&mut self, frame: &Frame) -> bool {
            self.sent.push(*frame);
            true
        }

        fn try_receive(&mut self) -> Option<Frame> {
            None
        }
    }

    fn frame(id: u16) -> Frame {
        Frame::new(id, &[1]).unwrap()
    }

    #[test]
    fn test_copies_are_spaced() {
        let mut sender = RedundantSender::new(Redundancy {
            copies: 3,
            spacing_ticks: 2,
        });
        let mut bus = Recorder::default();
        sender.enqueue(frame(58));

        let sent: Vec<usize> = (10..16).map(|tick| sender.flush(tick, &mut bus)).collect();
        assert_eq!(sent, vec![1, 0, 1, 0, 1, 0]);
        assert_eq!(bus.sent, vec![frame(58); 3]);
        assert!(sender.is_idle());
    }

    #[test]
    fn test_zero_spacing_sends_all_at_once() {
        let mut sender = RedundantSender::new(Redundancy {
            copies: 3,
            spacing_ticks: 0,
        });
        let mut bus = Recorder::default();
        sender.enqueue(frame(16));
        sender.enqueue(frame(58));

        assert_eq!(sender.flush(1, &mut bus), 6);
        assert_eq!(sender.flush(2, &mut bus), 0);
    }

    #[test]
    fn test_clear_drops_pending_copies() {
        let mut sender = RedundantSender::new(Redundancy::default());
        let mut bus = Recorder::default();
        sender.enqueue(frame(16));
        sender.flush(1, &mut bus);
        sender.clear();
        assert_eq!(sender.flush(2, &mut bus), 0);
        assert_eq!(bus.sent.len(), 1);
    }
}
