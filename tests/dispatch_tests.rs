//! Dispatcher routing and RoomCache tests

#[cfg(test)]
mod tests {
    use piano_world::{
        Client, Dispatcher, Event, EventHandler, EventQueue, InboundEvent, Key, KeyEvent,
        MoveEvent, PauseFlag, RoomCache, SessionOptions, TcpTransport, UserId, Vec3,
    };
    use std::thread;

    const ME: UserId = UserId(1);
    const THEM: UserId = UserId(2);

    #[derive(Debug, PartialEq)]
    enum Seen {
        Join(UserId),
        Disconnect(UserId),
        Move(UserId),
        Key(UserId, u16),
        Pause,
        Resume,
    }

    #[derive(Default)]
    struct Recorder(Vec<Seen>);

    impl EventHandler for Recorder {
        fn on_join(&mut self, sender: UserId) {
            self.0.push(Seen::Join(sender));
        }
        fn on_disconnect(&mut self, sender: UserId) {
            self.0.push(Seen::Disconnect(sender));
        }
        fn on_move(&mut self, _event: &MoveEvent, sender: UserId) {
            self.0.push(Seen::Move(sender));
        }
        fn on_key(&mut self, event: &KeyEvent, sender: UserId) {
            self.0.push(Seen::Key(sender, event.key().note()));
        }
        fn on_pause(&mut self) {
            self.0.push(Seen::Pause);
        }
        fn on_resume(&mut self) {
            self.0.push(Seen::Resume);
        }
    }

    fn setup() -> (EventQueue, PauseFlag, Dispatcher) {
        let queue = EventQueue::new();
        let pause = PauseFlag::new();
        let dispatcher = Dispatcher::new(queue.clone(), pause.clone());
        (queue, pause, dispatcher)
    }

    fn key(sender: UserId, note: u16) -> InboundEvent {
        InboundEvent::new(sender, Event::Key(KeyEvent::from_raw(note, 80).unwrap()))
    }

    fn moved(sender: UserId) -> InboundEvent {
        InboundEvent::new(
            sender,
            Event::Move(MoveEvent::new(Vec3::new(0.5, 1.7, 2.0), Vec3::zero())),
        )
    }

    // -----------------------------------------------------------------------
    // Queue
    // -----------------------------------------------------------------------

    #[test]
    fn fifo_holds_under_concurrent_enqueue() {
        let queue = EventQueue::new();
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..1000u32 {
                    queue.enqueue(InboundEvent::new(UserId(i), Event::Join));
                }
            })
        };

        let mut seen = Vec::new();
        while seen.len() < 1000 {
            seen.extend(queue.drain_all().into_iter().map(|e| e.sender.0));
            thread::yield_now();
        }
        producer.join().unwrap();

        assert_eq!(seen, (0..1000).collect::<Vec<u32>>());
        assert!(queue.is_empty());
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    #[test]
    fn paused_drops_key_but_delivers_disconnect() {
        let (queue, pause, dispatcher) = setup();
        pause.set(true);
        queue.enqueue(InboundEvent::new(
            THEM,
            Event::Key(KeyEvent::from_raw(60, 100).unwrap()),
        ));
        queue.enqueue(moved(THEM));
        queue.enqueue(InboundEvent::new(THEM, Event::Disconnect));
        queue.enqueue(InboundEvent::new(UserId(3), Event::Join));

        let mut rec = Recorder::default();
        let stats = dispatcher.tick(Some(ME), &mut rec);

        assert_eq!(rec.0, vec![Seen::Disconnect(THEM), Seen::Join(UserId(3))]);
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.dropped_paused, 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn own_move_dropped_own_key_delivered() {
        let (queue, _pause, dispatcher) = setup();
        queue.enqueue(moved(ME));
        queue.enqueue(key(ME, 60));
        queue.enqueue(moved(THEM));

        let mut rec = Recorder::default();
        let stats = dispatcher.tick(Some(ME), &mut rec);

        assert_eq!(rec.0, vec![Seen::Key(ME, 60), Seen::Move(THEM)]);
        assert_eq!(stats.dropped_self, 1);
    }

    #[test]
    fn own_join_and_disconnect_are_forwarded() {
        let (queue, _pause, dispatcher) = setup();
        queue.enqueue(InboundEvent::new(ME, Event::Join));
        queue.enqueue(InboundEvent::new(ME, Event::Disconnect));

        let mut rec = Recorder::default();
        dispatcher.tick(Some(ME), &mut rec);
        assert_eq!(rec.0, vec![Seen::Join(ME), Seen::Disconnect(ME)]);
    }

    #[test]
    fn events_enqueued_while_paused_are_gone_after_resume() {
        let (queue, pause, dispatcher) = setup();
        pause.set(true);
        queue.enqueue(key(THEM, 10));
        let mut rec = Recorder::default();
        dispatcher.tick(Some(ME), &mut rec);

        pause.set(false);
        queue.enqueue(key(THEM, 11));
        dispatcher.tick(Some(ME), &mut rec);
        assert_eq!(rec.0, vec![Seen::Key(THEM, 11)]);
    }

    // -----------------------------------------------------------------------
    // Client + cache
    // -----------------------------------------------------------------------

    #[test]
    fn client_pause_notifies_handler() {
        let client = Client::new(TcpTransport::new("127.0.0.1", 1), SessionOptions::default());
        let mut rec = Recorder::default();

        client.pause(&mut rec);
        assert!(client.is_paused());
        client.resume(&mut rec);
        assert!(!client.is_paused());
        assert_eq!(rec.0, vec![Seen::Pause, Seen::Resume]);
    }

    #[test]
    fn room_cache_follows_the_room() {
        let (queue, pause, dispatcher) = setup();
        let mut room = RoomCache::new();

        queue.enqueue(InboundEvent::new(THEM, Event::Join));
        queue.enqueue(moved(THEM));
        queue.enqueue(key(THEM, 69));
        queue.enqueue(key(ME, 69));
        dispatcher.tick(Some(ME), &mut room);

        let a4 = Key::new(69).unwrap();
        assert_eq!(room.player_count(), 1);
        assert_eq!(room.sounding(a4), vec![(ME, 80), (THEM, 80)]);

        pause.set(true);
        room.on_pause();
        assert_eq!(room.sounding_count(), 0);

        queue.enqueue(InboundEvent::new(THEM, Event::Disconnect));
        dispatcher.tick(Some(ME), &mut room);
        assert_eq!(room.player_count(), 0);
    }
}
