use std::sync::mpsc::{self, Receiver, Sender};

/// Typed fan-out over `mpsc` channels. Every subscriber receives its own copy
/// of each published value, in publish order. Subscribers whose receiver has
/// been dropped are pruned on the next publish.
#[derive(Debug)]
pub struct Publisher<T> {
    subscribers: Vec<Sender<T>>,
}

impl<T> Default for Publisher<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> Publisher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, value: T) {
        self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_subscriber_receives_in_order() {
        let mut publisher = Publisher::new();
        let a = publisher.subscribe();
        let b = publisher.subscribe();

        publisher.publish(1);
        publisher.publish(2);

        assert_eq!(a.try_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(b.try_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut publisher = Publisher::new();
        let keep = publisher.subscribe();
        drop(publisher.subscribe());

        publisher.publish("x");

        assert_eq!(publisher.subscriber_count(), 1);
        assert_eq!(keep.recv().unwrap(), "x");
    }
}
