// Communication channels lock-free

use crate::messaging::command::ScheduledClick;
use crate::messaging::notification::Notification;
use ringbuf::{HeapRb, traits::Split};

pub type ClickProducer = ringbuf::HeapProd<ScheduledClick>;
pub type ClickConsumer = ringbuf::HeapCons<ScheduledClick>;

pub fn create_click_channel(capacity: usize) -> (ClickProducer, ClickConsumer) {
    let rb = HeapRb::<ScheduledClick>::new(capacity);
    rb.split()
}

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::timeline::Accent;
    use ringbuf::traits::{Consumer, Producer};

    #[test]
    fn test_click_channel_preserves_order() {
        let (mut tx, mut rx) = create_click_channel(4);
        for (i, accent) in [Accent::Bar, Accent::Beat, Accent::SubStep].iter().enumerate() {
            let click = ScheduledClick {
                at_sample: i as u64 * 100,
                accent: *accent,
            };
            assert!(tx.try_push(click).is_ok());
        }

        assert_eq!(rx.try_pop().map(|c| c.accent), Some(Accent::Bar));
        assert_eq!(rx.try_pop().map(|c| c.at_sample), Some(100));
        assert_eq!(rx.try_pop().map(|c| c.accent), Some(Accent::SubStep));
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_click_channel_rejects_when_full() {
        let (mut tx, _rx) = create_click_channel(1);
        let click = ScheduledClick {
            at_sample: 0,
            accent: Accent::Bar,
        };
        assert!(tx.try_push(click).is_ok());
        assert!(tx.try_push(click).is_err());
    }
}
